mod failure_record;
mod meter_record;

pub use failure_record::{FailedFields, FailureRecord, FieldFlag};
pub use meter_record::{MeterRecord, NaturalKey, REQUIRED_HEADERS};
