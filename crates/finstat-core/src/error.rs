use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinStatError {
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Structure error: {0}")]
    Structure(String),

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Calculation error: {0}")]
    Calculation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for FinStatError {
    fn from(e: serde_json::Error) -> Self {
        FinStatError::SerializationError(e.to_string())
    }
}

/// Machine-readable error category carried by an [`crate::ErrorDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    JsonParseError,
    UnsupportedFormat,
    EmptyData,
    StructureError,
    CalculationError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JsonParseError => "JSON_PARSE_ERROR",
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::EmptyData => "EMPTY_DATA",
            Self::StructureError => "STRUCTURE_ERROR",
            Self::CalculationError => "CALCULATION_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FinStatError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::JsonParse(_) => ErrorCode::JsonParseError,
            Self::EmptyInput(_) => ErrorCode::EmptyData,
            Self::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
            Self::Structure(_) => ErrorCode::StructureError,
            Self::InvalidInput { .. }
            | Self::DivisionByZero { .. }
            | Self::Calculation(_)
            | Self::SerializationError(_) => ErrorCode::CalculationError,
        }
    }

    /// Parse and empty-input failures end the request. Everything else
    /// still yields a best-effort report.
    pub fn is_request_failure(&self) -> bool {
        matches!(self.code(), ErrorCode::JsonParseError | ErrorCode::EmptyData)
    }
}
