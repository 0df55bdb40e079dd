pub mod csv;
pub mod schema;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] ::csv::Error),
    #[error("Parsing error: {0}")]
    ParsingError(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] duckdb::Error),
}
