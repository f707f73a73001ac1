pub mod meter_record_queries;

pub use meter_record_queries::MeterRecordRow;
