use crate::server::{handlers, types::AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::render_metrics))
        .route("/classify/", post(handlers::classify_image))
        .route("/classify", post(handlers::classify_image))
        .route("/predict-diabetes/", post(handlers::predict_diabetes))
        .route("/predict-diabetes", post(handlers::predict_diabetes))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
