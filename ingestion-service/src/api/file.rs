use std::io::Cursor;

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    Json,
};

use super::{ApiError, AppState};
use crate::{
    pipeline::{self, IngestReport, IngestionError},
    sources::check_upload,
    transform::RowParser,
};

struct Upload {
    file_name: String,
    contents: Bytes,
}

/// Pull the `file` part out of a multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let contents = field.bytes().await?;
        check_upload(&file_name, contents.len())?;
        return Ok(Upload { file_name, contents });
    }
    Err(IngestionError::NoFile.into())
}

#[tracing::instrument(skip_all)]
pub(super) async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<IngestReport>, ApiError> {
    metrics::counter!("http_requests_total", "route" => "/file").increment(1);

    let upload = read_upload(multipart).await?;
    let report = pipeline::upload_file(
        &upload.file_name,
        Cursor::new(upload.contents),
        &RowParser::for_today(),
        state.store.as_ref(),
    )
    .await?;

    Ok(Json(report))
}

#[tracing::instrument(skip_all)]
pub(super) async fn validate(multipart: Multipart) -> Result<Json<IngestReport>, ApiError> {
    metrics::counter!("http_requests_total", "route" => "/file/validate").increment(1);

    let upload = read_upload(multipart).await?;
    let report = pipeline::validate_file(
        &upload.file_name,
        Cursor::new(upload.contents),
        &RowParser::for_today(),
    )?;

    Ok(Json(report))
}
