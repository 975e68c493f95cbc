//! HTTP server wiring: routes, CORS, request tracing and graceful shutdown.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::docs::{self, OPENAPI_PATH};
use super::handler::{self, AppState};
use crate::ai::{LlmClient, Summarizer};
use crate::core::config::AppConfig;
use crate::errors::SummaryError;

pub struct SummaryServer {
    config: AppConfig,
    summarizer: Arc<dyn Summarizer>,
}

impl SummaryServer {
    /// Creates the server with the OpenAI-backed summarizer.
    ///
    /// # Errors
    ///
    /// Returns an error if the LLM client cannot be constructed.
    pub fn new(config: AppConfig) -> Result<Self, SummaryError> {
        info!("Initializing SummaryServer");

        let client = LlmClient::from_config(&config).inspect_err(|e| {
            error!(error = %e, "Failed to initialize the summary agent");
        })?;

        Ok(Self::with_summarizer(config, Arc::new(client)))
    }

    /// Creates the server around a pre-built summarizer.
    pub fn with_summarizer(config: AppConfig, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { config, summarizer }
    }

    /// Builds the Axum router
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState::new(
            Arc::clone(&self.summarizer),
            self.config.openai_model.clone(),
        ));

        // Any origin, method and header; credentials allowed, so each is mirrored
        // from the request rather than answered with `*`.
        let cors = CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true);

        Router::new()
            .route("/health", get(handler::health_handler))
            .route("/docs", get(docs::swagger_ui_handler))
            .route(OPENAPI_PATH, get(docs::openapi_handler))
            .route("/v1/summarize", post(handler::summarize_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Binds the configured address and serves until a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the server fails.
    pub async fn serve(self) -> Result<(), SummaryError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            error!(addr = %addr, error = %e, "Failed to bind listener");
            SummaryError::ServerError(format!("Failed to bind {addr}: {e}"))
        })?;

        self.serve_with_listener(listener).await
    }

    /// Serves on an already-bound listener until a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails.
    pub async fn serve_with_listener(self, listener: TcpListener) -> Result<(), SummaryError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| SummaryError::ServerError(format!("Listener has no address: {e}")))?;

        info!(
            project = %self.config.project_name,
            addr = %local_addr,
            "Application startup"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| SummaryError::ServerError(format!("Server error: {e}")))?;

        info!("Application shutdown");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
