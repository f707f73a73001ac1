//! Whole-file ingestion: header check, per-line parsing, and (for uploads)
//! one batch into the store.

use std::io::BufRead;

use meter_client::domain::{FailureRecord, MeterRecord, REQUIRED_HEADERS};
use serde::Serialize;

use crate::{
    sources::PipeDelimitedLines,
    stores::{MeterStore, StoreError},
    transform::{ParsedRow, RowParser},
};

/// Failures that abandon a whole file. Nothing is stored when one occurs.
#[derive(thiserror::Error, Debug)]
pub enum IngestionError {
    #[error("No file uploaded.")]
    NoFile,
    #[error("Invalid file type. Only .txt files are allowed.")]
    InvalidFileType,
    #[error("File must contain headers")]
    EmptyFile,
    #[error("Mismatch between required headers and file headers. Required headers are: {}", REQUIRED_HEADERS.join(", "))]
    HeaderMismatch,
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Parse and report only.
    Validate,
    /// Parse, then store every accepted record.
    Upload,
}

/// Summary returned to whoever submitted the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub message: String,
    pub success_count: usize,
    pub failure_count: usize,
    /// Rows that failed validation, in file order. Validate mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_rows: Option<Vec<FailureRecord>>,
    /// Valid rows the store refused as duplicates. Upload mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_records: Option<Vec<MeterRecord>>,
}

/// Every data line of a file, split by outcome and kept in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partitioned {
    pub accepted: Vec<MeterRecord>,
    pub failed: Vec<FailureRecord>,
}

/// Parse an entire file. Fails without partial results on a bad header or
/// a read error.
pub fn partition<R: BufRead>(reader: R, parser: &RowParser) -> Result<Partitioned, IngestionError> {
    let mut out = Partitioned::default();
    for line in PipeDelimitedLines::open(reader)? {
        match parser.parse(&line?) {
            ParsedRow::Valid(record) => out.accepted.push(record),
            ParsedRow::Invalid(failure) => out.failed.push(failure),
        }
    }

    metrics::counter!("ingest_rows_accepted_total").increment(out.accepted.len() as u64);
    metrics::counter!("ingest_rows_rejected_total").increment(out.failed.len() as u64);
    Ok(out)
}

impl Partitioned {
    pub fn into_validation_report(self, file_name: &str) -> IngestReport {
        tracing::info!(
            file = file_name,
            accepted = self.accepted.len(),
            failed = self.failed.len(),
            "validated file"
        );
        IngestReport {
            message: format!("Performed validation on \"{file_name}\"."),
            success_count: self.accepted.len(),
            failure_count: self.failed.len(),
            failed_rows: Some(self.failed),
            rejected_records: None,
        }
    }

    /// Submit every accepted record as one best-effort batch.
    pub async fn store<S>(self, file_name: &str, store: &S) -> Result<IngestReport, IngestionError>
    where
        S: MeterStore + ?Sized,
    {
        let success_count = self.accepted.len();
        let failure_count = self.failed.len();

        let outcome = store.try_add_many(self.accepted).await?;
        if !outcome.is_complete() {
            metrics::counter!("store_duplicate_records_total").increment(outcome.rejected.len() as u64);
            tracing::warn!(
                file = file_name,
                duplicates = outcome.rejected.len(),
                "some records were already stored"
            );
        }
        tracing::info!(
            file = file_name,
            inserted = outcome.inserted,
            failed = failure_count,
            "uploaded file"
        );

        Ok(IngestReport {
            message: format!("\"{file_name}\" uploaded successfully."),
            success_count,
            failure_count,
            failed_rows: None,
            rejected_records: Some(outcome.rejected),
        })
    }
}

pub fn validate_file<R: BufRead>(
    file_name: &str,
    reader: R,
    parser: &RowParser,
) -> Result<IngestReport, IngestionError> {
    Ok(partition(reader, parser)?.into_validation_report(file_name))
}

pub async fn upload_file<R, S>(
    file_name: &str,
    reader: R,
    parser: &RowParser,
    store: &S,
) -> Result<IngestReport, IngestionError>
where
    R: BufRead,
    S: MeterStore + ?Sized,
{
    let partitioned = partition(reader, parser)?;
    partitioned.store(file_name, store).await
}

pub async fn ingest<R, S>(
    mode: IngestMode,
    file_name: &str,
    reader: R,
    parser: &RowParser,
    store: &S,
) -> Result<IngestReport, IngestionError>
where
    R: BufRead,
    S: MeterStore + ?Sized,
{
    match mode {
        IngestMode::Validate => validate_file(file_name, reader, parser),
        IngestMode::Upload => upload_file(file_name, reader, parser, store).await,
    }
}
