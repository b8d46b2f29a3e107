use std::future::Future;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::authenticator::HttpAuthenticator;
use crate::http::client::{HttpBuildError, HttpClient};
use crate::parameters::ServeSettings;
use crate::server::{AppState, router};
use crate::token_retriever::TokenRetrieverWithCache;
use crate::viewer::{ViewerError, ViewerTemplates};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("building http client: `{0}`")]
    HttpClient(#[from] HttpBuildError),
    #[error("loading viewer templates: `{0}`")]
    Viewer(#[from] ViewerError),
    #[error("serving http: `{0}`")]
    Io(#[from] std::io::Error),
}

pub struct ServeCommand {
    settings: ServeSettings,
}

impl ServeCommand {
    pub fn new(settings: ServeSettings) -> Self {
        Self { settings }
    }

    /// Wires the upstream client, the token cache and the viewer into the router.
    pub fn app(&self) -> Result<Router, ServeError> {
        let upstream = &self.settings.upstream;
        let http_client = HttpClient::new(upstream.http_config.clone())?;
        let authenticator =
            HttpAuthenticator::new(http_client, upstream.environment.token_endpoint());
        let token_retriever =
            TokenRetrieverWithCache::new(upstream.credentials.clone(), authenticator)
                .with_scope(upstream.scope.as_str());

        let state = AppState::new(
            Arc::new(token_retriever),
            self.settings.viewer.clone(),
            ViewerTemplates::new()?,
        );

        Ok(router(state))
    }

    /// Binds the configured address and serves until ctrl-c or SIGTERM.
    pub async fn run(self) -> Result<(), ServeError> {
        let listener = TcpListener::bind(self.settings.listen_addr).await?;
        self.run_with_listener(listener, shutdown_signal()).await
    }

    pub async fn run_with_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.app()?;

        info!(
            address = %listener.local_addr()?,
            token_endpoint = %self.settings.upstream.environment.token_endpoint(),
            "token proxy listening"
        );
        if self.settings.viewer.default_facility_urn.is_none() {
            warn!("no default facility urn configured, the viewer page will not load a facility");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("token proxy stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received ctrl-c, shutting down"),
            Err(err) => {
                warn!("unable to listen for ctrl-c: {err}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("unable to listen for terminate signal: {err}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
