use crate::clip::{eviction, ClipService};
use crate::config::Config;
use crate::plex::{PlexServer, PlexTv};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod auth;
pub mod error;
pub mod routes_clip;
pub mod routes_sessions;

/// How often the output directory is swept for stale clips.
const EVICTION_INTERVAL_SECS: u64 = 60;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Catalog, session and playback client for the paired server.
    pub plex: Arc<PlexServer>,
    /// plex.tv client used for PIN login and access checks.
    pub plex_tv: Arc<PlexTv>,
    /// Clip extraction and preview pipeline.
    pub clips: Arc<ClipService>,
    /// Machine identifier of the paired server, fetched at startup.
    pub machine_id: String,
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = Router::new()
        // Health check
        .route("/health", get(health_check))
        // API routes (with optional auth)
        .nest("/api", api_routes(&ctx));

    let mut app = app
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Serve static files if directory is provided
    // Uses SPA fallback: serves index.html for any route that doesn't match a file
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        }
    }

    app
}

fn api_routes(ctx: &AppContext) -> Router<AppContext> {
    // Auth routes (always available, even when auth is disabled)
    let auth_routes = Router::new()
        .route("/auth/pin", post(auth::create_pin))
        .route("/auth/pin/:id", get(auth::poll_pin))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/status", get(auth::auth_status));

    // Protected routes
    let protected_routes = routes_sessions::session_routes().merge(routes_clip::clip_routes());

    // Apply auth middleware to protected routes only if enabled
    let protected_routes = if ctx.config.server.auth.enabled {
        protected_routes.layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::require_user,
        ))
    } else {
        protected_routes
    };

    auth_routes.merge(protected_routes)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Build the shared context, verifying the paired server is reachable.
pub async fn build_context(config: Config) -> Result<AppContext> {
    let plex = Arc::new(PlexServer::new(&config.plex));
    let machine_id = plex
        .identity()
        .await
        .context("Cannot reach the configured Plex server")?;
    tracing::info!(machine_id = %machine_id, "Paired with Plex server");

    let plex_tv = Arc::new(PlexTv::new(config.plex.client_identifier.clone()));
    let clips = Arc::new(ClipService::new(plex.clone(), &config));

    Ok(AppContext {
        config: Arc::new(config),
        plex,
        plex_tv,
        clips,
        machine_id,
    })
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let static_dir = config.server.static_dir.clone();
    let output_dir = config.transcode.output_dir.clone();
    let keep_for = Duration::from_secs(config.transcode.keep_for_secs);

    let ctx = build_context(config).await?;

    eviction::start_eviction_task(output_dir, keep_for, EVICTION_INTERVAL_SECS);

    let app = create_router(ctx, static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
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
