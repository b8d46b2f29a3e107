use std::time::Duration;

use crate::{TokenRetrieverError, authenticator::TokenRetrievalResponse};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

pub type AccessToken = String;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum TokenType {
    Bearer,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Token {
    expires_at: DateTime<Utc>,
    access_token: AccessToken,
}

/// Payload handed to callers of the token endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AccessGrant {
    pub access_token: AccessToken,
    /// Seconds until the access token expires.
    pub expires_in: u64,
}

impl TryFrom<&str> for TokenType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Bearer" | "bearer" => Ok(TokenType::Bearer),
            _ => Err(format!("Invalid token type: {value}")),
        }
    }
}

impl Token {
    pub fn new(access_token: AccessToken, expires_at: DateTime<Utc>) -> Self {
        Token {
            access_token,
            expires_at,
        }
    }

    /// Returns true while the token stays usable for longer than `buffer`.
    pub fn is_valid_for(&self, buffer: TimeDelta) -> bool {
        self.expires_at > Utc::now() + buffer
    }

    /// Whole seconds left before expiration, rounded down and never negative.
    pub fn remaining_secs(&self) -> u64 {
        let remaining = (self.expires_at - Utc::now()).num_seconds();
        u64::try_from(remaining).unwrap_or_default()
    }
}

impl From<&Token> for AccessGrant {
    fn from(token: &Token) -> Self {
        AccessGrant {
            access_token: token.access_token.to_owned(),
            expires_in: token.remaining_secs(),
        }
    }
}

impl TryFrom<&TokenRetrievalResponse> for Token {
    type Error = TokenRetrieverError;

    fn try_from(response: &TokenRetrievalResponse) -> Result<Self, Self::Error> {
        // Only bearer tokens can be handed out as is.
        TokenType::try_from(response.token_type.as_str())
            .map_err(TokenRetrieverError::TokenRetrieverError)?;

        // `expires_in` is expressed in seconds by the identity provider
        let time_delta = TimeDelta::from_std(Duration::from_secs(response.expires_in))
            .map_err(|e| TokenRetrieverError::TokenRetrieverError(e.to_string()))?;

        let expires_at = Utc::now().checked_add_signed(time_delta).ok_or_else(|| {
            TokenRetrieverError::TokenRetrieverError(
                "Failed to calculate expiration time".to_string(),
            )
        })?;

        Ok(Token::new(response.access_token.to_owned(), expires_at))
    }
}
