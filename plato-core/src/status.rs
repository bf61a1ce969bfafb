//! Record lifecycle status and the shared soft-delete read filter.
//!
//! Deleted records stay in the metadata index. Every read path above the
//! index goes through [`visible`] or [`retain_visible`], so a record with
//! [`RecordStatus::Deleted`] is indistinguishable from a missing one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status shared by projects, prompts and branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RecordStatus {
    #[default]
    Active,
    Deleted,
}

impl RecordStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "Active",
            RecordStatus::Deleted => "Deleted",
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, RecordStatus::Deleted)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(RecordStatus::Active),
            "deleted" => Ok(RecordStatus::Deleted),
            _ => Err(format!("Invalid RecordStatus: {}", s)),
        }
    }
}

/// A record that is soft-deleted rather than removed.
pub trait SoftDeletable {
    fn status(&self) -> RecordStatus;

    fn set_status(&mut self, status: RecordStatus);

    fn is_deleted(&self) -> bool {
        self.status().is_deleted()
    }

    fn mark_deleted(&mut self) {
        self.set_status(RecordStatus::Deleted);
    }
}

/// Translate a deleted record into "not found".
pub fn visible<T: SoftDeletable>(record: Option<T>) -> Option<T> {
    record.filter(|r| !r.is_deleted())
}

/// Drop deleted records from a list result, preserving order.
pub fn retain_visible<T: SoftDeletable>(mut records: Vec<T>) -> Vec<T> {
    records.retain(|r| !r.is_deleted());
    records
}
