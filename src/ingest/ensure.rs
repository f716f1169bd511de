//! Page ensurer: guarantees a daily-log record exists before ingest writes to it.

use chrono::NaiveDate;
use tracing::info;

use crate::dates;
use crate::error::EnsureError;
use crate::ingest::daily_log_title;
use crate::ingest::store::{DailyLogStore, EnsureRequest};

/// Ensure the record for `target_date` and return its `record_id`.
///
/// Idempotency is the store's guarantee; this only issues the request and
/// checks that a non-empty `page_id` came back.
pub async fn ensure_page(
    store: &dyn DailyLogStore,
    target_date: NaiveDate,
    source_label: &str,
    run_id: &str,
) -> Result<String, EnsureError> {
    let date = dates::format_date(target_date);
    let request = EnsureRequest {
        target_date: date.clone(),
        title: daily_log_title(target_date),
        source: source_label.to_string(),
        mail_id: run_id.to_string(),
    };

    let response = store
        .ensure(&request)
        .await
        .map_err(|source| EnsureError::Request {
            target_date: date.clone(),
            source,
        })?;

    let record_id = response
        .page_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(EnsureError::MissingPageId { target_date: date })?;

    info!(target_date = %target_date, record_id = %record_id, "Daily log ensured");
    Ok(record_id)
}
