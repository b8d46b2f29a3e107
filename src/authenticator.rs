use async_trait::async_trait;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Uri};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credentials::ClientCredentials;
use crate::http_client::{HttpClient, HttpClientError};
use crate::token::AccessToken;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Error, Debug)]
pub enum AuthenticateError {
    #[error("unable to serialize request: `{0}`")]
    SerializeError(String),
    #[error("unable to deserialize token: `{0}`")]
    DeserializeError(String),
    #[error("identity server error: Status code: `{0}`, Reason: `{1}`")]
    HttpResponseError(u16, String),
    #[error("http transport error: `{0}`")]
    HttpTransportError(String),
}

impl From<HttpClientError> for AuthenticateError {
    fn from(value: HttpClientError) -> Self {
        match value {
            HttpClientError::TransportError(e) | HttpClientError::InvalidResponse(e) => {
                AuthenticateError::HttpTransportError(e)
            }
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        req: TokenRetrievalRequest,
    ) -> Result<TokenRetrievalResponse, AuthenticateError>;
}

/// The Authenticator is responsible for obtaining an access token from the APS identity API.
pub struct HttpAuthenticator<C> {
    /// HTTP client
    http_client: C,
    /// Token endpoint URL
    url: Uri,
}

impl<C> HttpAuthenticator<C> {
    pub fn new(http_client: C, url: Uri) -> Self {
        Self { http_client, url }
    }
}

#[async_trait]
impl<C> Authenticator for HttpAuthenticator<C>
where
    C: HttpClient,
{
    /// Executes a form-encoded POST request against the token endpoint, authenticating the
    /// client through HTTP Basic, and decodes the `TokenRetrievalResponse`.
    async fn authenticate(
        &self,
        req: TokenRetrievalRequest,
    ) -> Result<TokenRetrievalResponse, AuthenticateError> {
        let request = build_request(&self.url, &req)?;

        let response = self.http_client.send(request).await?;

        if !response.status().is_success() {
            return Err(AuthenticateError::HttpResponseError(
                response.status().as_u16(),
                String::from_utf8_lossy(response.body()).into_owned(),
            ));
        }

        serde_json::from_slice(response.body())
            .map_err(|e| AuthenticateError::DeserializeError(e.to_string()))
    }
}

fn build_request(
    uri: &Uri,
    req: &TokenRetrievalRequest,
) -> Result<http::Request<Vec<u8>>, AuthenticateError> {
    let form = serde_urlencoded::to_string(TokenRequestForm {
        grant_type: &req.grant_type,
        scope: &req.scope,
    })
    .map_err(|e| AuthenticateError::SerializeError(e.to_string()))?;

    http::Request::builder()
        .uri(uri)
        .method(Method::POST)
        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
        .header(ACCEPT, "application/json")
        .header(AUTHORIZATION, req.credentials.basic_authorization())
        .body(form.into_bytes())
        .map_err(|e| AuthenticateError::SerializeError(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    ClientCredentials,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenRetrievalRequest {
    pub credentials: ClientCredentials,
    pub grant_type: GrantType,
    /// Space separated list of requested scopes.
    pub scope: String,
}

#[derive(Serialize)]
struct TokenRequestForm<'a> {
    grant_type: &'a GrantType,
    scope: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TokenRetrievalResponse {
    pub access_token: AccessToken,
    /// The lifetime in seconds of the access token.
    pub expires_in: u64,
    pub token_type: String,
}
