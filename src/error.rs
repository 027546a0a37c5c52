use thiserror::Error;

use crate::model::date::DateParseError;

/// Errors surfaced by the timeline core and its host.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("item {id}: invalid {field} date")]
    Date {
        id: String,
        field: &'static str,
        #[source]
        source: DateParseError,
    },

    #[error("duplicate item id {0}")]
    DuplicateId(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TimelineError>;
