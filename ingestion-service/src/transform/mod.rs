pub mod fields;

use meter_client::domain::{FailedFields, FailureRecord, MeterRecord};
use time::{Date, OffsetDateTime};

pub use fields::{parse_install_date, FieldError};
use fields::{
    validate_address_line1, validate_date_of_installation, validate_meter_serial, validate_mpan,
    validate_postcode,
};

/// Outcome of parsing one data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRow {
    Valid(MeterRecord),
    Invalid(FailureRecord),
}

/// Turns single upload lines into records.
///
/// The only state is the date install dates are checked against, so one
/// parser can be shared freely across lines.
#[derive(Debug, Clone, Copy)]
pub struct RowParser {
    today: Date,
}

impl RowParser {
    pub fn new(today: Date) -> Self {
        Self { today }
    }

    /// Parser pinned to the current UTC calendar date.
    pub fn for_today() -> Self {
        Self::new(OffsetDateTime::now_utc().date())
    }

    pub fn today(&self) -> Date {
        self.today
    }

    /// Parse a `|`-separated line. Missing trailing columns count as empty,
    /// columns past the fifth are ignored, and every column is checked even
    /// after an earlier one fails.
    pub fn parse(&self, line: &str) -> ParsedRow {
        let mut columns = line.split('|').map(str::trim);
        let mut next = || columns.next().unwrap_or("");
        let (mpan, serial, date, address, postcode) = (next(), next(), next(), next(), next());

        let mut failed = FailedFields::empty();
        let mpan_value = note(validate_mpan(mpan), &mut failed);
        let serial_value = note(validate_meter_serial(serial), &mut failed);
        let date_value = note(validate_date_of_installation(date, self.today), &mut failed);
        let address_value = note(validate_address_line1(address), &mut failed);
        let postcode_value = note(validate_postcode(postcode), &mut failed);

        match (mpan_value, serial_value, date_value, address_value, postcode_value) {
            (Some(mpan), Some(meter_serial), Some(date_of_installation), Some(address_line1), Some(postcode)) => {
                ParsedRow::Valid(MeterRecord {
                    mpan,
                    meter_serial,
                    date_of_installation,
                    address_line1,
                    postcode,
                })
            }
            _ => ParsedRow::Invalid(FailureRecord {
                mpan: mpan.to_string(),
                meter_serial: serial.to_string(),
                date_of_installation: date.to_string(),
                address_line1: address.to_string(),
                postcode: postcode.to_string(),
                failed_fields: failed,
            }),
        }
    }
}

fn note<T>(outcome: Result<T, FieldError>, failed: &mut FailedFields) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            let field = e.field();
            tracing::debug!(field = %field, error = %e, "field failed validation");
            metrics::counter!("validation_failed_fields_total", "field" => field.column()).increment(1);
            failed.insert(field);
            None
        }
    }
}
