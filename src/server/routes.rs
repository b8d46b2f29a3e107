use axum::{
    Json,
    extract::{RawQuery, State},
    response::Html,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::AppState;
use super::error::ApiError;
use crate::token::AccessGrant;
use crate::viewer::{DeepLink, FragmentSurface, ViewerEmbed};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Liveness only, the token cache is not consulted.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Token proxy is running".to_string(),
        timestamp: Utc::now(),
    })
}

/// Hands out a client-credentials access token, cached while it stays far from expiring.
pub async fn access_token(State(state): State<AppState>) -> Result<Json<AccessGrant>, ApiError> {
    let grant = state.token_retriever.retrieve().await.map_err(|err| {
        warn!("serving token request failed: {err}");
        err
    })?;

    Ok(Json(grant))
}

/// Viewer page for the configured facility and the request's deep-link parameters.
pub async fn viewer_page(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Html<String>, ApiError> {
    let deep_link = query.as_deref().map(DeepLink::from_query).unwrap_or_default();
    let surface = Arc::new(FragmentSurface::new());
    let mut viewer = ViewerEmbed::new(state.viewer_config.as_ref().clone(), deep_link, surface);

    viewer.reload();
    let page = viewer.render(&state.viewer_templates);
    viewer.teardown();

    Ok(Html(page?))
}
