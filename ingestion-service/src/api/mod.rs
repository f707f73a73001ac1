//! HTTP surface: file ingestion under `/file`, searches under `/data`.

mod data;
mod error;
mod file;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::stores::Store;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self { store: Arc::new(store) }
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/file", post(file::upload))
        .route("/file/validate", post(file::validate))
        .route("/data", get(data::all))
        .route("/data/mpan/:mpan", get(data::by_mpan))
        .route("/data/serial/:serial", get(data::by_serial))
        .route("/data/installdate/:install_date", get(data::by_install_date))
        .route("/data/address/:address", get(data::by_address))
        .route("/data/postcode/:postcode", get(data::by_postcode))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
