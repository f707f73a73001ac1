use std::fmt;

/// One of the five upload columns, carrying its wire flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldFlag {
    Mpan = 1,
    MeterSerial = 2,
    DateOfInstallation = 4,
    AddressLine1 = 8,
    Postcode = 16,
}

impl FieldFlag {
    pub const ALL: [FieldFlag; 5] = [
        FieldFlag::Mpan,
        FieldFlag::MeterSerial,
        FieldFlag::DateOfInstallation,
        FieldFlag::AddressLine1,
        FieldFlag::Postcode,
    ];

    pub fn bit(self) -> u8 {
        self as u8
    }

    /// Column name as it appears in the upload header.
    pub fn column(self) -> &'static str {
        match self {
            FieldFlag::Mpan => "MPAN",
            FieldFlag::MeterSerial => "MeterSerial",
            FieldFlag::DateOfInstallation => "DateOfInstallation",
            FieldFlag::AddressLine1 => "AddressLine1",
            FieldFlag::Postcode => "PostCode",
        }
    }
}

impl fmt::Display for FieldFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Set of fields that failed validation on a row.
///
/// Serializes as the integer bitmask consumers already understand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FailedFields(u8);

impl FailedFields {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, flag: FieldFlag) {
        self.0 |= flag.bit();
    }

    pub fn contains(self, flag: FieldFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn iter(self) -> impl Iterator<Item = FieldFlag> {
        FieldFlag::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<FieldFlag> for FailedFields {
    fn from_iter<I: IntoIterator<Item = FieldFlag>>(iter: I) -> Self {
        let mut set = FailedFields::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

/// A row that did not validate: the trimmed raw fields as uploaded plus
/// which of them failed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FailureRecord {
    pub mpan: String,
    pub meter_serial: String,
    pub date_of_installation: String,
    pub address_line1: String,
    pub postcode: String,
    #[cfg_attr(feature = "serde", serde(rename = "failedField"))]
    pub failed_fields: FailedFields,
}
