use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Cannot convert {column} value {value:?} at row {row} to {target}")]
    Coercion {
        column: String,
        row: usize,
        value: String,
        target: &'static str,
    },

    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Source {0} contains no header row")]
    EmptyInput(String),
}

impl CleanerError {
    pub fn is_coercion(&self) -> bool {
        matches!(self, CleanerError::Coercion { .. })
    }
}

pub type Result<T> = std::result::Result<T, CleanerError>;
