use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data loading error: {0}")]
    DataLoadError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    CsvError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BacktestError>;
