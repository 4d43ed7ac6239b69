use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Any non-success response from the index or directory API.
    #[error("{status} {code}: {message}")]
    Service {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("Schema registration failed ({code}): {message}")]
    SchemaRegistration { code: String, message: String },

    #[error("Schema registration did not finish after {attempts} status checks")]
    SchemaTimeout { attempts: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Watermark error: {0}")]
    Watermark(String),
}

impl AppError {
    /// True for a remote 404, which deletes treat as already done.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Service { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AppError::Service { status, .. } => Some(*status),
            AppError::Reqwest(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
