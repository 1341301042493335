pub mod readings_csv;

pub use readings_csv::{read_meter_readings, ReadingsCsvFileSource};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(String),
    #[error("csv error: {0}")]
    Csv(String),
}
