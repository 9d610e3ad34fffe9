pub mod handlers;
pub mod state;
pub mod templates;
pub mod ws;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::screen::Screen;
use crate::shutdown_signal;
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/meta", get(handlers::meta))
        .route("/latest.png", get(handlers::latest_png))
        .route("/image", post(handlers::image))
        .route("/button/:id", post(handlers::button))
        .route("/cmd/:cmd", post(handlers::command))
        .route("/health", get(handlers::health))
        .route("/ws", get(ws::ws))
        .with_state(state)
        // Allow reasonably large images (25 MiB)
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
}

pub fn run_server(config: ServerConfig) -> Result<()> {
    let screen = Arc::new(Screen::new(config.transform)?);
    let state = AppState {
        host: config.addr.ip().to_string(),
        port: config.addr.port(),
        screen,
    };
    let app = router(state);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    info!(
        width = config.transform.width,
        height = config.transform.height,
        threshold = config.transform.threshold,
        invert = config.transform.invert,
        "Screen"
    );

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(config.addr).await?;
        if let Ok(l) = listener.local_addr() {
            info!(address = %format!("http://{l}"), "Listening");
        }
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Stopped");
        Ok(())
    })
}
