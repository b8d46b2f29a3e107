pub mod authenticator;
pub mod commands;
pub mod credentials;
pub mod environment;
pub mod http;
pub mod http_client;
pub mod parameters;
pub mod server;
pub mod token;
pub mod token_retriever;
pub mod viewer;

use crate::token::AccessGrant;
use async_trait::async_trait;
use thiserror::Error;

pub type ClientID = String;

#[derive(Error, Debug)]
pub enum TokenRetrieverError {
    #[error("retrieving token: `{0}`")]
    TokenRetrieverError(String),
    #[error("fetching access token: `{0}`")]
    AuthenticatorError(#[from] authenticator::AuthenticateError),
    #[error("acquiring cache mutex lock")]
    PoisonError,
}

/// The TokenRetriever will be the responsible to hand out a usable authorization token
#[async_trait]
pub trait TokenRetriever: Send + Sync {
    async fn retrieve(&self) -> Result<AccessGrant, TokenRetrieverError>;
}
