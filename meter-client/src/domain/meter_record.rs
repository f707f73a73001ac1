use time::Date;

/// Column names a registry upload must start with, in order.
pub const REQUIRED_HEADERS: [&str; 5] = [
    "MPAN",
    "MeterSerial",
    "DateOfInstallation",
    "AddressLine1",
    "PostCode",
];

/// A validated meter installation.
///
/// Only the row parser builds these; once built they are never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MeterRecord {
    pub mpan: u64,
    pub meter_serial: String,
    pub date_of_installation: Date,
    pub address_line1: Option<String>,
    pub postcode: Option<String>,
}

/// Identity of a stored record: (MPAN, install date, serial).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NaturalKey {
    pub mpan: u64,
    pub date_of_installation: Date,
    pub meter_serial: String,
}

impl MeterRecord {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            mpan: self.mpan,
            date_of_installation: self.date_of_installation,
            meter_serial: self.meter_serial.clone(),
        }
    }
}
