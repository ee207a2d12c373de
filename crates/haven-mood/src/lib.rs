mod aggregator;
mod json_ledger;
mod ledger;
mod models;
mod policy;
mod service;
mod timezone;

pub use aggregator::MoodAggregator;
pub use json_ledger::JsonFileMoodLedger;
pub use ledger::{InMemoryMoodLedger, MoodLedger};
pub use models::{MoodEntry, MoodSummary, Rating};
pub use policy::MoodTemporalPolicy;
pub use service::MoodService;
pub use timezone::TimezonePolicy;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoodError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },
    #[error("mood already recorded for {user} on {day}")]
    Conflict { user: String, day: NaiveDate },
    #[error("mood entry not found: {id}")]
    NotFound { id: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl MoodError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type MoodResult<T> = Result<T, MoodError>;
