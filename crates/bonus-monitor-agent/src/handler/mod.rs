//! Liveness endpoint
//!
//! A single route that confirms the process is up. It does not read the
//! monitor state.

use axum::{response::Html, routing::get, Router};
use chrono::Local;
use tower_http::trace::TraceLayer;

/// Create the router
pub fn create_router() -> Router {
    Router::new()
        .route("/", get(liveness))
        .layer(TraceLayer::new_for_http())
}

/// Static confirmation plus the current wall-clock time
async fn liveness() -> Html<String> {
    Html(format!(
        "<h3>Monitor active ✅</h3><p>Current time: {}</p>",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ))
}
