use crate::authenticator::Authenticator;
use crate::credentials::ClientCredentials;
use crate::token::AccessGrant;
use crate::token_retriever::TokenRetrieverWithCache;
use crate::{TokenRetriever, TokenRetrieverError};

pub struct RetrieveTokenCommand<A>
where
    A: Authenticator,
{
    authenticator: A,
}

impl<A> RetrieveTokenCommand<A>
where
    A: Authenticator,
{
    pub fn new(authenticator: A) -> Self {
        Self { authenticator }
    }

    pub async fn retrieve_token(
        self,
        credentials: ClientCredentials,
        scope: &str,
    ) -> Result<AccessGrant, TokenRetrieverError> {
        let retriever =
            TokenRetrieverWithCache::new(credentials, self.authenticator).with_scope(scope);

        retriever.retrieve().await
    }
}
