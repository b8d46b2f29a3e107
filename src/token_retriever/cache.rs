use std::sync::Mutex;

use chrono::TimeDelta;

use crate::TokenRetrieverError;
use crate::token::Token;

/// Owned holder for the last issued token.
///
/// The lock is only held to read or overwrite the entry, so concurrent refreshes can both
/// reach the identity provider and the last one to store wins.
#[derive(Debug, Default)]
pub struct TokenCache {
    entry: Mutex<Option<Token>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache already holding `token`.
    pub fn with_token(token: Token) -> Self {
        Self {
            entry: Mutex::new(Some(token)),
        }
    }

    /// Returns the cached token if it stays valid for longer than `buffer`.
    pub fn valid_token(&self, buffer: TimeDelta) -> Result<Option<Token>, TokenRetrieverError> {
        let entry = self
            .entry
            .lock()
            .map_err(|_| TokenRetrieverError::PoisonError)?;

        Ok(entry.as_ref().filter(|t| t.is_valid_for(buffer)).cloned())
    }

    /// Replaces the whole entry.
    pub fn store(&self, token: Token) -> Result<(), TokenRetrieverError> {
        let mut entry = self
            .entry
            .lock()
            .map_err(|_| TokenRetrieverError::PoisonError)?;
        *entry = Some(token);
        Ok(())
    }

    /// Current entry regardless of its expiration.
    pub fn snapshot(&self) -> Result<Option<Token>, TokenRetrieverError> {
        self.entry
            .lock()
            .map(|entry| entry.clone())
            .map_err(|_| TokenRetrieverError::PoisonError)
    }
}
