//! HTTP adapter for the triage inference service.
//!
//! Binds first, then loads the bundle on a blocking task. Requests arriving
//! before the load settles get `503`; a failed load shuts the server down.

pub mod routes;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use triage_ai::{Bundle, CategoryPolicy, InferenceService};

pub use state::{AppState, Readiness};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub bundle_dir: PathBuf,
    pub policy: CategoryPolicy,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/ml/classify", post(routes::classify))
        .route("/api/ml/health", get(routes::health))
        .route("/api/ml/metadata", get(routes::metadata))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C, or until the bundle fails to load (returns `Err`).
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(addr = %listener.local_addr()?, "listening");

    let state = AppState::loading();
    let load_failed = Arc::new(Notify::new());
    tokio::spawn(load_bundle(config.clone(), state.clone(), load_failed.clone()));

    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
            _ = load_failed.notified() => {}
        }
    };
    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    if let Some(message) = state.fatal_error() {
        anyhow::bail!("model bundle failed to load: {message}");
    }
    Ok(())
}

async fn load_bundle(config: ServerConfig, state: AppState, load_failed: Arc<Notify>) {
    let dir = config.bundle_dir.clone();
    let outcome = match tokio::task::spawn_blocking(move || Bundle::load(&dir)).await {
        Ok(Ok(bundle)) => {
            Ok(InferenceService::new(Arc::new(bundle)).with_policy(config.policy))
        }
        Ok(Err(err)) => Err(err.to_string()),
        Err(join) => Err(format!("loader task failed: {join}")),
    };

    match &outcome {
        Ok(_) => info!(dir = %config.bundle_dir.display(), policy = ?config.policy, "ready"),
        Err(message) => error!(dir = %config.bundle_dir.display(), error = %message, "bundle load failed"),
    }
    let failed = outcome.is_err();
    state.settle(outcome);
    if failed {
        load_failed.notify_one();
    }
}
