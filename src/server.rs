//! HTTP surface: token proxy, health and viewer page.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::TokenRetriever;
use crate::viewer::{ViewerConfig, ViewerTemplates};

pub mod error;
pub mod routes;

pub const HEALTH_PATH: &str = "/health";
pub const TOKEN_PATH: &str = "/api/auth/token";
pub const VIEWER_PATH: &str = "/viewer";

#[derive(Clone)]
pub struct AppState {
    pub token_retriever: Arc<dyn TokenRetriever>,
    pub viewer_config: Arc<ViewerConfig>,
    pub viewer_templates: Arc<ViewerTemplates>,
}

impl AppState {
    pub fn new(
        token_retriever: Arc<dyn TokenRetriever>,
        viewer_config: ViewerConfig,
        viewer_templates: ViewerTemplates,
    ) -> Self {
        Self {
            token_retriever,
            viewer_config: Arc::new(viewer_config),
            viewer_templates: Arc::new(viewer_templates),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(routes::health_check))
        .route(TOKEN_PATH, get(routes::access_token))
        .route(VIEWER_PATH, get(routes::viewer_page))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
