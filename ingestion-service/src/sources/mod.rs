pub mod pipe_delimited;

pub use pipe_delimited::{check_upload, PipeDelimitedLines};
