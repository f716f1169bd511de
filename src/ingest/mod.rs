//! Ingest phase: ensure the day's record, then fill it from the connectors.

pub mod ensure;
pub mod orchestrator;
pub mod store;
pub mod summary;

use chrono::NaiveDate;

use crate::dates;

pub use ensure::ensure_page;
pub use orchestrator::{IngestResult, Ingestor, StructuredPayload, merge_sections};
pub use store::{DailyLogRecord, DailyLogStore, WorkerStore};

/// Title of the daily-log record for `target_date`.
pub fn daily_log_title(target_date: NaiveDate) -> String {
    format!("Daily Log｜{}", dates::format_date(target_date))
}
