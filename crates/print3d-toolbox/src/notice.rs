//! User-facing operator messages.

use serde::Serialize;
use std::fmt;

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message an operator reports back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Info => "INFO",
            NoticeLevel::Warning => "WARNING",
            NoticeLevel::Error => "ERROR",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

/// Whether an operator changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorStatus {
    Finished,
    /// Nothing was modified.
    Cancelled,
}

/// Outcome of an operator: status plus the messages it reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorResult {
    pub status: OperatorStatus,
    pub notices: Vec<Notice>,
}

impl OperatorResult {
    pub fn finished(notices: Vec<Notice>) -> Self {
        Self {
            status: OperatorStatus::Finished,
            notices,
        }
    }

    pub fn cancelled(notice: Notice) -> Self {
        Self {
            status: OperatorStatus::Cancelled,
            notices: vec![notice],
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == OperatorStatus::Finished
    }

    /// Messages at `level` or above.
    pub fn messages(&self, level: NoticeLevel) -> impl Iterator<Item = &str> {
        self.notices
            .iter()
            .filter(move |n| n.level >= level)
            .map(|n| n.message.as_str())
    }
}
