use crate::authenticator::{Authenticator, GrantType, TokenRetrievalRequest};
use crate::credentials::ClientCredentials;
use crate::environment::DEFAULT_SCOPE;
use crate::token::{AccessGrant, Token};
use crate::{TokenRetriever, TokenRetrieverError};

use async_trait::async_trait;
use chrono::TimeDelta;
use tracing::{debug, warn};

pub use cache::TokenCache;

mod cache;

/// A cached token is refreshed once it gets this close to its expiration.
pub const REFRESH_BUFFER: TimeDelta = TimeDelta::minutes(5);

#[derive(Debug)]
pub struct TokenRetrieverWithCache<A>
where
    A: Authenticator,
{
    credentials: ClientCredentials,
    scope: String,
    cache: TokenCache,
    authenticator: A,
}

#[async_trait]
impl<A> TokenRetriever for TokenRetrieverWithCache<A>
where
    A: Authenticator,
{
    async fn retrieve(&self) -> Result<AccessGrant, TokenRetrieverError> {
        if let Some(token) = self.cache.valid_token(REFRESH_BUFFER)? {
            debug!("serving cached authorization token");
            return Ok(AccessGrant::from(&token));
        }

        // No retries: a failed refresh is reported and the caller is expected to try again.
        match self.refresh_token().await {
            Ok((token, grant)) => {
                self.cache.store(token)?;
                debug!(expires_in = grant.expires_in, "authorization token refreshed");
                Ok(grant)
            }
            Err(e) => {
                warn!("error refreshing token: {e}");
                Err(e)
            }
        }
    }
}

impl<A> TokenRetrieverWithCache<A>
where
    A: Authenticator,
{
    /// Creates a new `TokenRetrieverWithCache` authenticating with a client id and secret,
    /// starting from an empty cache.
    pub fn new(credentials: ClientCredentials, authenticator: A) -> Self {
        Self {
            credentials,
            scope: DEFAULT_SCOPE.to_string(),
            cache: TokenCache::new(),
            authenticator,
        }
    }

    pub fn with_scope(self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..self
        }
    }

    pub fn with_cache(self, cache: TokenCache) -> Self {
        Self { cache, ..self }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    async fn refresh_token(&self) -> Result<(Token, AccessGrant), TokenRetrieverError> {
        let request = TokenRetrievalRequest {
            credentials: self.credentials.to_owned(),
            grant_type: GrantType::ClientCredentials,
            scope: self.scope.to_owned(),
        };

        let response = self.authenticator.authenticate(request).await?;

        let token = Token::try_from(&response)?;
        let grant = AccessGrant {
            access_token: response.access_token,
            expires_in: response.expires_in,
        };
        Ok((token, grant))
    }
}
