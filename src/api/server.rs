//! API server setup.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::models::DownloadRequest;
use crate::api::routes;
use crate::config::{AppConfig, ConfigError};
use crate::downloader::{
    DetailsFetcher, DownloadError, Downloader, Extractor, HttpProbe, OutputClaims, SourceProbe,
    YtDlpCommand, YtDlpExtractor,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub extractor: Arc<dyn Extractor>,
    pub probe: Arc<dyn SourceProbe>,
    /// Output paths in flight across all requests
    pub claims: OutputClaims,
    /// Cancelled on shutdown; requests derive child tokens from it
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        extractor: Arc<dyn Extractor>,
        probe: Arc<dyn SourceProbe>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            extractor,
            probe,
            claims: OutputClaims::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// State backed by yt-dlp and an HTTP probe
    pub fn from_config(config: AppConfig) -> Result<Self, DownloadError> {
        let command = YtDlpCommand::detect(config.extractor_mode, config.ytdlp_path.as_deref())?;
        let extractor = YtDlpExtractor::new(command, config.network.clone());
        let probe = HttpProbe::new(&config.network)?;
        Ok(Self::new(config, Arc::new(extractor), Arc::new(probe)))
    }

    /// Downloader for one request, sharing extractor, probe and output claims
    pub fn downloader(&self, request: &DownloadRequest) -> Downloader {
        let options = self
            .config
            .download_options()
            .with_resume(request.resume)
            .with_audio_only(request.audio_only);

        Downloader::new(self.extractor.clone(), self.probe.clone(), options)
            .with_claims(self.claims.clone())
    }

    pub fn details(&self) -> DetailsFetcher {
        DetailsFetcher::new(self.extractor.clone())
    }
}

/// API server.
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        routes::create_router(self.state.clone())
            .layer(cors)
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|req: &Request| {
                        if req.uri().path() == "/health" {
                            Span::none()
                        } else {
                            tracing::info_span!("request", method = %req.method(), path = %req.uri().path())
                        }
                    })
                    .on_response(
                        |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                            if span.is_disabled() {
                                return;
                            }
                            tracing::info!(
                                status = res.status().as_u16(),
                                latency_ms = latency.as_millis() as u64,
                                "request finished"
                            );
                        },
                    ),
            )
    }

    /// Start the server and serve until the cancel token fires.
    pub async fn run(&self) -> Result<(), ServerError> {
        let config = &self.state.config;
        let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
            .parse()
            .map_err(|e| ServerError::Address(format!("{}", e)))?;

        let router = self.build_router();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(
            output_dir = %config.output_dir.display(),
            "API server listening on http://{}",
            addr
        );

        let cancel_token = self.state.shutdown.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await?;

        Ok(())
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        self.state.shutdown.cancel();
    }
}
