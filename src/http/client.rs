use crate::http::config::HttpConfig;
use crate::http_client::{HttpClient as OauthHttpClient, HttpClientError as OauthHttpClientError};
use async_trait::async_trait;
use http::{Request, Response};
use reqwest::{Client, Proxy, Response as ReqwestResponse};

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self, HttpBuildError> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .tls_built_in_native_certs(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(conn_timeout) = config.conn_timeout {
            builder = builder.connect_timeout(conn_timeout);
        }

        builder = match config.proxy.url() {
            Some(url) => builder.proxy(
                Proxy::all(url.as_str())
                    .map_err(|err| HttpBuildError::ClientBuilder(err.to_string()))?,
            ),
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|err| HttpBuildError::ClientBuilder(err.to_string()))?;

        Ok(Self { client })
    }

    async fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpResponseError> {
        let req = self
            .client
            .request(request.method().clone(), request.uri().to_string().as_str())
            .headers(request.headers().clone())
            .body(request.body().to_vec());

        let res = req
            .send()
            .await
            .map_err(|err| HttpResponseError::TransportError(err.to_string()))?;

        try_build_response(res).await
    }
}

async fn try_build_response(res: ReqwestResponse) -> Result<Response<Vec<u8>>, HttpResponseError> {
    let status = res.status();
    let version = res.version();

    let body: Vec<u8> = res
        .bytes()
        .await
        .map_err(|err| HttpResponseError::ReadingResponse(err.to_string()))?
        .into();

    http::Response::builder()
        .status(status)
        .version(version)
        .body(body)
        .map_err(|err| HttpResponseError::BuildingResponse(err.to_string()))
}

#[async_trait]
impl OauthHttpClient for HttpClient {
    async fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, OauthHttpClientError> {
        let response = HttpClient::send(self, req).await?;

        Ok(response)
    }
}

impl From<HttpResponseError> for OauthHttpClientError {
    fn from(err: HttpResponseError) -> Self {
        match err {
            HttpResponseError::TransportError(msg) => OauthHttpClientError::TransportError(msg),
            HttpResponseError::BuildingResponse(msg) | HttpResponseError::ReadingResponse(msg) => {
                OauthHttpClientError::InvalidResponse(msg)
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HttpBuildError {
    #[error("could not build the http client: {0}")]
    ClientBuilder(String),
}

#[derive(thiserror::Error, Debug)]
enum HttpResponseError {
    #[error("could read response body: {0}")]
    ReadingResponse(String),
    #[error("could build response: {0}")]
    BuildingResponse(String),
    #[error("http transport error: `{0}`")]
    TransportError(String),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use http::{Method, header::CONTENT_TYPE};
    use httpmock::{Method::POST, MockServer};

    use super::*;
    use crate::http::config::ProxyConfig;

    #[tokio::test]
    async fn forwards_method_headers_and_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/token")
                    .header("content-type", "application/x-www-form-urlencoded");
                then.status(201).body("created");
            })
            .await;

        let client = HttpClient::new(HttpConfig::default()).unwrap();
        let request = Request::builder()
            .method(Method::POST)
            .uri(server.url("/token"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(b"grant_type=client_credentials".to_vec())
            .unwrap();

        let response = OauthHttpClient::send(&client, request).await.unwrap();

        assert_eq!(response.status().as_u16(), 201);
        assert_eq!(response.body(), b"created");
        mock.assert_async().await
    }

    #[tokio::test]
    async fn request_timeout_is_a_transport_error() {
        let timeout = Duration::from_millis(10);

        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200)
                    .delay(timeout.saturating_add(Duration::from_millis(50)));
            })
            .await;

        let client =
            HttpClient::new(HttpConfig::new(Some(timeout), None, ProxyConfig::default())).unwrap();
        let request = Request::builder()
            .method(Method::POST)
            .uri(server.url("/token"))
            .body(Vec::new())
            .unwrap();

        let error = client.send(request).await.unwrap_err();

        assert_matches!(error, HttpResponseError::TransportError(_));
        mock.assert_async().await
    }
}
