//! Homework status types.
//!
//! Submission records stay as raw JSON: the loop compares whole records
//! to decide whether anything changed, and extra fields the API adds
//! must take part in that comparison.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Text sent once when the first cycle finds no homework updates.
pub const BOT_STARTED_MESSAGE: &str = "Бот запущен и отслеживает статус домашней работы";

/// Prefix of every error notification.
pub const FAILURE_PREFIX: &str = "Сбой в работе программы";

/// Review status of a homework submission.
///
/// These are the only documented values; anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeworkStatus {
    /// Accepted by the reviewer
    Approved,
    /// Picked up for review
    Reviewing,
    /// Returned with remarks
    Rejected,
}

impl HomeworkStatus {
    pub const ALL: [Self; 3] = [Self::Approved, Self::Reviewing, Self::Rejected];

    /// Wire value used by the API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Reviewing => "reviewing",
            Self::Rejected => "rejected",
        }
    }

    /// Human-readable verdict for this status.
    pub fn verdict(self) -> &'static str {
        match self {
            Self::Approved => "Работа проверена: ревьюеру всё понравилось. Ура!",
            Self::Reviewing => "Работа взята на проверку ревьюером.",
            Self::Rejected => "Работа проверена: у ревьюера есть замечания.",
        }
    }
}

impl fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned for a status string outside the documented set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl FromStr for HomeworkStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// API response that passed shape validation.
///
/// `homeworks` is never empty; newest record first.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedResponse {
    pub homeworks: Vec<serde_json::Value>,
    pub current_date: i64,
}

impl CheckedResponse {
    /// The most recent submission.
    pub fn newest(&self) -> Option<&serde_json::Value> {
        self.homeworks.first()
    }
}
