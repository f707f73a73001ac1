use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use meter_client::domain::MeterRecord;

use super::{ApiError, AppState};
use crate::{stores::MeterStore, transform::parse_install_date};

/// 404 for an empty search, the matches otherwise.
fn matches(route: &'static str, records: Vec<MeterRecord>) -> Response {
    metrics::counter!("http_requests_total", "route" => route).increment(1);
    if records.is_empty() {
        StatusCode::NOT_FOUND.into_response()
    } else {
        Json(records).into_response()
    }
}

pub(super) async fn all(State(state): State<AppState>) -> Result<Json<Vec<MeterRecord>>, ApiError> {
    metrics::counter!("http_requests_total", "route" => "/data").increment(1);
    Ok(Json(state.store.get_all().await?))
}

pub(super) async fn by_mpan(
    State(state): State<AppState>,
    Path(mpan): Path<String>,
) -> Result<Response, ApiError> {
    Ok(matches("/data/mpan", state.store.get_by_mpan(&mpan).await?))
}

pub(super) async fn by_serial(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> Result<Response, ApiError> {
    Ok(matches("/data/serial", state.store.get_by_serial(&serial).await?))
}

pub(super) async fn by_install_date(
    State(state): State<AppState>,
    Path(install_date): Path<String>,
) -> Result<Response, ApiError> {
    let date = parse_install_date(&install_date).map_err(|_| {
        ApiError::BadRequest("Invalid date format. Expected format is YYYYMMDD.".to_string())
    })?;
    Ok(matches("/data/installdate", state.store.get_by_date(date).await?))
}

pub(super) async fn by_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Response, ApiError> {
    Ok(matches("/data/address", state.store.get_by_address(&address).await?))
}

pub(super) async fn by_postcode(
    State(state): State<AppState>,
    Path(postcode): Path<String>,
) -> Result<Response, ApiError> {
    Ok(matches("/data/postcode", state.store.get_by_postcode(&postcode).await?))
}
