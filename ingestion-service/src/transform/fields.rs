//! Per-column rules for registry uploads.
//!
//! Every function here takes the already-trimmed raw column and either
//! returns the typed value or the reason it was refused. They are
//! independent of one another so a row can be checked in full.

use meter_client::domain::FieldFlag;
use once_cell::sync::Lazy;
use regex::Regex;
use time::{Date, Month};

pub const MPAN_DIGITS: usize = 13;
pub const MAX_SERIAL_BYTES: usize = 10;
pub const MAX_ADDRESS_BYTES: usize = 40;
pub const MAX_POSTCODE_BYTES: usize = 10;

// Two-letter area, district digit with an optional sub-district character,
// then the inward code.
static POSTCODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}[0-9][A-Z0-9]? [0-9][A-Z]{2}$").expect("postcode pattern is valid"));

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("MPAN must be exactly 13 ASCII digits")]
    MpanFormat,
    #[error("meter serial must be between 1 and 10 bytes")]
    MeterSerialLength,
    #[error("install date must be a calendar date formatted YYYYMMDD")]
    DateFormat,
    #[error("install date {0} is not before {1}")]
    DateNotPast(Date, Date),
    #[error("address line must be at most 40 bytes")]
    AddressLength,
    #[error("postcode must be at most 10 bytes")]
    PostcodeLength,
    #[error("postcode does not match the expected format")]
    PostcodeFormat,
}

impl FieldError {
    /// The column this error belongs to.
    pub fn field(&self) -> FieldFlag {
        match self {
            FieldError::MpanFormat => FieldFlag::Mpan,
            FieldError::MeterSerialLength => FieldFlag::MeterSerial,
            FieldError::DateFormat | FieldError::DateNotPast(..) => FieldFlag::DateOfInstallation,
            FieldError::AddressLength => FieldFlag::AddressLine1,
            FieldError::PostcodeLength | FieldError::PostcodeFormat => FieldFlag::Postcode,
        }
    }
}

fn all_ascii_digits(raw: &str) -> bool {
    raw.bytes().all(|b| b.is_ascii_digit())
}

pub fn validate_mpan(raw: &str) -> Result<u64, FieldError> {
    if raw.len() != MPAN_DIGITS || !all_ascii_digits(raw) {
        return Err(FieldError::MpanFormat);
    }
    raw.parse().map_err(|_| FieldError::MpanFormat)
}

/// Length is measured in UTF-8 bytes, not characters.
pub fn validate_meter_serial(raw: &str) -> Result<String, FieldError> {
    if raw.is_empty() || raw.len() > MAX_SERIAL_BYTES {
        return Err(FieldError::MeterSerialLength);
    }
    Ok(raw.to_string())
}

/// Parse an exact `YYYYMMDD` date without any check against the clock.
pub fn parse_install_date(raw: &str) -> Result<Date, FieldError> {
    if raw.len() != 8 || !all_ascii_digits(raw) {
        return Err(FieldError::DateFormat);
    }

    let year: i32 = raw[0..4].parse().map_err(|_| FieldError::DateFormat)?;
    let month: u8 = raw[4..6].parse().map_err(|_| FieldError::DateFormat)?;
    let day: u8 = raw[6..8].parse().map_err(|_| FieldError::DateFormat)?;
    let month = Month::try_from(month).map_err(|_| FieldError::DateFormat)?;

    Date::from_calendar_date(year, month, day).map_err(|_| FieldError::DateFormat)
}

/// An install date must parse and be strictly earlier than `today`.
pub fn validate_date_of_installation(raw: &str, today: Date) -> Result<Date, FieldError> {
    let date = parse_install_date(raw)?;
    if date >= today {
        return Err(FieldError::DateNotPast(date, today));
    }
    Ok(date)
}

/// Optional; an empty column means no address.
pub fn validate_address_line1(raw: &str) -> Result<Option<String>, FieldError> {
    if raw.len() > MAX_ADDRESS_BYTES {
        return Err(FieldError::AddressLength);
    }
    Ok((!raw.is_empty()).then(|| raw.to_string()))
}

/// Optional; an empty column means no postcode, anything else must match
/// the postcode grammar exactly.
pub fn validate_postcode(raw: &str) -> Result<Option<String>, FieldError> {
    if raw.len() > MAX_POSTCODE_BYTES {
        return Err(FieldError::PostcodeLength);
    }
    if raw.is_empty() {
        return Ok(None);
    }
    if !POSTCODE.is_match(raw) {
        return Err(FieldError::PostcodeFormat);
    }
    Ok(Some(raw.to_string()))
}
