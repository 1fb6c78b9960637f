use crate::config::Config;
use crate::conversion::{ConversionSupervisor, FfmpegTranscoder};
use crate::library::Sandbox;
use crate::probe::{AudioCodecProbe, AudioProber};
use crate::streaming;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use stromboli_av::{resolve_tool, TranscodeSettings};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod routes_api;
pub mod routes_library;

/// Browser UI served at `/`.
const INDEX_HTML: &str = include_str!("index.html");

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    /// Served directory; every client path is resolved through it
    pub sandbox: Arc<Sandbox>,
    /// Audio codec inspection for native-container files
    pub prober: Arc<dyn AudioProber>,
    /// Owner of the single conversion slot
    pub supervisor: Arc<ConversionSupervisor>,
}

impl AppContext {
    pub fn new(
        sandbox: Sandbox,
        prober: Arc<dyn AudioProber>,
        supervisor: Arc<ConversionSupervisor>,
    ) -> Self {
        Self {
            sandbox: Arc::new(sandbox),
            prober,
            supervisor,
        }
    }

    /// Build the production context: ffprobe and ffmpeg as configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let sandbox = Sandbox::new(&config.server.root)
            .with_context(|| format!("Invalid media root: {:?}", config.server.root))?;

        let ffprobe = resolve_tool("ffprobe", config.tools.ffprobe.as_deref());
        let ffmpeg = resolve_tool("ffmpeg", config.tools.ffmpeg.as_deref());

        let prober = AudioCodecProbe::new(ffprobe)
            .with_timeout(Duration::from_secs(config.probe.timeout_secs));
        let transcoder = FfmpegTranscoder::new(ffmpeg, TranscodeSettings::from(&config.transcode));

        Ok(Self::new(
            sandbox,
            Arc::new(prober),
            Arc::new(ConversionSupervisor::new(Arc::new(transcoder))),
        ))
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers([header::CONTENT_TYPE, header::RANGE]);

    Router::new()
        .route("/", get(index))
        // Health check
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn api_routes() -> Router<AppContext> {
    routes_api::api_routes()
        .merge(routes_library::library_routes())
        .merge(streaming::streaming_router())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::from_config(&config)?;
    let supervisor = ctx.supervisor.clone();

    tracing::info!("Serving {:?}", ctx.sandbox.root());

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Open conversion streams never finish on their own, so stop the encoder
    // before waiting on connections to drain.
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            supervisor.shutdown().await;
        })
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
