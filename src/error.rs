use crate::calc::MonthKey;
use chrono::NaiveDate;
use thiserror::Error;

/// Fallback shown when a backend failure carries no usable message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Local failures of the planner. None of these ever reach the backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("percentage '{value}' is out of range (must be a whole number from 1 to 100)")]
    OutOfRange { value: String },
    #[error("missing value: {0}")]
    MissingValue(String),
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("year {0} is outside the supported range 1-9999")]
    UnsupportedYear(i32),
    #[error("{0} is a past month and cannot be edited")]
    LockedMonth(MonthKey),
    #[error("{0} is not part of the current date range")]
    UnknownMonth(MonthKey),
    #[error("invalid month key '{0}' (expected YYYY-MM)")]
    InvalidMonthKey(String),
    #[error("a change is already waiting for confirmation")]
    ChangePending,
    #[error("form is not open for editing")]
    NotEditing,
}

impl PlanError {
    /// Convenience for the per-month completeness check on submit.
    pub fn missing_months(labels: &[String]) -> Self {
        PlanError::MissingValue(format!("no percentage for {}", labels.join(", ")))
    }
}

/// Failures reported by the allocation backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ApiError {
    /// Best-effort message for an alert. Never returns an empty string.
    pub fn user_message(&self) -> String {
        let msg = match self {
            ApiError::Storage(err) => err.root_cause().to_string(),
            other => other.to_string(),
        };
        if msg.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            msg
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message_names_value() {
        let err = PlanError::OutOfRange {
            value: "140".to_string(),
        };
        assert!(err.to_string().contains("140"));
    }

    #[test]
    fn test_missing_months_lists_labels() {
        let err = PlanError::missing_months(&["Mar 2025".to_string(), "Apr 2025".to_string()]);
        assert_eq!(err.to_string(), "missing value: no percentage for Mar 2025, Apr 2025");
    }

    #[test]
    fn test_user_message_for_rejection() {
        let err = ApiError::Rejected("over-allocated".to_string());
        assert_eq!(err.user_message(), "over-allocated");
    }

    #[test]
    fn test_user_message_falls_back_when_blank() {
        let err = ApiError::Rejected("   ".to_string());
        assert_eq!(err.user_message(), UNKNOWN_ERROR);
    }

    #[test]
    fn test_user_message_uses_root_cause_for_storage() {
        let inner = anyhow::anyhow!("disk full").context("failed to write allocations.json");
        let err = ApiError::Storage(inner);
        assert_eq!(err.user_message(), "disk full");
    }

    #[test]
    fn test_not_found_message() {
        let err = ApiError::NotFound { kind: "allocation", id: 7 };
        assert_eq!(err.user_message(), "allocation 7 not found");
    }
}
