use thiserror::Error;

use shared::grid::ParseCellIdError;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("request rejected by service: {0}")]
    Rejected(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidCell(#[from] ParseCellIdError),
}

impl PlannerError {
    pub(crate) fn rejected(message: Option<String>, fallback: &str) -> Self {
        Self::Rejected(message.unwrap_or_else(|| fallback.to_string()))
    }
}
