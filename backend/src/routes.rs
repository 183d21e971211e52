use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{download_result, health_check, transfer_style, upload_images};
use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_images))
        .route("/transfer", post(transfer_style))
        .route("/download/{result_id}", get(download_result))
        .route("/health", get(health_check))
}
