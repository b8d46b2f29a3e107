use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::TokenRetrieverError;
use crate::authenticator::AuthenticateError;
use crate::viewer::ViewerError;

const TOKEN_ERROR: &str = "Failed to get token";
const VIEWER_ERROR: &str = "Failed to render viewer";

/// Errors reaching the HTTP boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("token retrieval failed: {0}")]
    TokenRetrieval(#[from] TokenRetrieverError),
    #[error("viewer rendering failed: {0}")]
    ViewerRender(#[from] ViewerError),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Value,
}

impl ApiError {
    /// Identity provider response body when there is one, the error message otherwise.
    fn details(&self) -> Value {
        match self {
            ApiError::TokenRetrieval(TokenRetrieverError::AuthenticatorError(
                AuthenticateError::HttpResponseError(_, body),
            )) => serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_owned())),
            ApiError::TokenRetrieval(err) => Value::String(err.to_string()),
            ApiError::ViewerRender(err) => Value::String(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = match &self {
            ApiError::TokenRetrieval(_) => TOKEN_ERROR,
            ApiError::ViewerRender(_) => VIEWER_ERROR,
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details: self.details(),
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
