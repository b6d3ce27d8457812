//! HTTP overlay server
//!
//! Exposes the character's presence so a browser overlay can animate the
//! mouth and show subtitles. Read-only: nothing here feeds back into the
//! reaction loop.

pub mod health;
pub mod presence;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::reaction::{CycleState, Presence};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Video whose chat is being followed
    pub video_id: String,
    /// Speaking state published by the playback controller
    pub presence: watch::Receiver<Presence>,
    /// Reaction cycle phase
    pub cycle_state: watch::Receiver<CycleState>,
}

/// Overlay server
pub struct OverlayServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl OverlayServer {
    #[must_use]
    pub fn new(state: ApiState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
            static_dir: None,
        }
    }

    /// Serve overlay assets from `dir` for unmatched paths
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(health::router(Arc::clone(&self.state)))
            .merge(presence::router(Arc::clone(&self.state)));

        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving overlay files");
        }

        // Overlays are often loaded from a different origin (OBS browser source)
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` flips
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind overlay server: {e}")))?;

        tracing::info!(port = self.port, "overlay server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await?;

        Ok(())
    }

    /// Run the server in a background task
    #[must_use]
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
