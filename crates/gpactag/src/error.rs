use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GpacError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Mapping table '{table}' is missing required column '{column}'")]
    MalformedMapping { table: String, column: String },

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid keyword phrase '{phrase}': {message}")]
    InvalidPattern { phrase: String, message: String },
}

pub type Result<T> = std::result::Result<T, GpacError>;
