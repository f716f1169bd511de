//! Daily-log persistence contract and its HTTP implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dates;
use crate::error::HttpError;
use crate::http::WorkerClient;

// ── Wire types ──────────────────────────────────────────────────────

/// Body of `POST {ensure_url}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnsureRequest {
    pub target_date: String,
    pub title: String,
    pub source: String,
    pub mail_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnsureResponse {
    #[serde(default)]
    pub page_id: Option<String>,
}

/// Body of `POST {upsert_url}`. Replaces the stored content wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertRequest {
    pub target_date: String,
    pub title: String,
    pub summary_text: String,
    pub summary_html: String,
    pub mail_id: String,
    pub source: String,
    pub page_id: String,
    /// Structured payload, serialized as a JSON string.
    pub data_json: String,
}

/// A persisted daily log as returned by the read endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyLogRecord {
    pub target_date: NaiveDate,
    pub record_id: String,
    pub title: String,
    pub summary_text: String,
    pub summary_html: String,
    pub run_id: String,
    pub source_label: String,
    pub structured_payload: Option<Value>,
    pub diary: Option<String>,
    pub expenses_total: Option<f64>,
    pub location_summary: Option<String>,
    pub mood: Option<String>,
    pub weight: Option<f64>,
}

/// Raw read response. Fields are kept as loose JSON so that wrong-typed
/// values degrade to "absent" instead of failing the whole read.
#[derive(Debug, Default, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    found: Option<bool>,
    #[serde(default)]
    target_date: Value,
    #[serde(default)]
    page_id: Value,
    #[serde(default)]
    title: Value,
    #[serde(default)]
    summary_text: Value,
    #[serde(default)]
    summary_html: Value,
    #[serde(default)]
    run_id: Value,
    #[serde(default)]
    mail_id: Value,
    #[serde(default)]
    source: Value,
    #[serde(default)]
    data_json: Value,
    #[serde(default)]
    diary: Value,
    #[serde(default)]
    expenses_total: Value,
    #[serde(default)]
    location_summary: Value,
    #[serde(default)]
    mood: Value,
    #[serde(default)]
    weight: Value,
}

fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Only JSON numbers count; booleans and strings are treated as absent.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// `data_json` is stored as a string but some deployments return it decoded.
fn structured(value: &Value) -> Option<Value> {
    match value {
        Value::String(raw) => serde_json::from_str(raw).ok(),
        Value::Object(_) => Some(value.clone()),
        _ => None,
    }
}

impl ReadResponse {
    fn into_record(self, requested: NaiveDate) -> Option<DailyLogRecord> {
        if self.found != Some(true) {
            return None;
        }
        let target_date = self
            .target_date
            .as_str()
            .and_then(dates::parse_date)
            .unwrap_or(requested);
        let run_id = text(&self.run_id).or_else(|| text(&self.mail_id));

        Some(DailyLogRecord {
            target_date,
            record_id: text(&self.page_id).unwrap_or_default(),
            title: text(&self.title).unwrap_or_default(),
            summary_text: text(&self.summary_text).unwrap_or_default(),
            summary_html: text(&self.summary_html).unwrap_or_default(),
            run_id: run_id.unwrap_or_default(),
            source_label: text(&self.source).unwrap_or_default(),
            structured_payload: structured(&self.data_json),
            diary: text(&self.diary),
            expenses_total: number(&self.expenses_total),
            location_summary: text(&self.location_summary),
            mood: text(&self.mood),
            weight: number(&self.weight),
        })
    }
}

// ── Store contract ──────────────────────────────────────────────────

/// Ensure/upsert/read against the remote daily-log store.
#[async_trait]
pub trait DailyLogStore: Send + Sync {
    /// Create the record for a date if needed; same date → same `page_id`.
    async fn ensure(&self, request: &EnsureRequest) -> Result<EnsureResponse, HttpError>;

    /// Replace the record's content.
    async fn upsert(&self, request: &UpsertRequest) -> Result<(), HttpError>;

    /// Fetch the record for a date, `None` unless the store reports it found.
    async fn read(&self, target_date: NaiveDate) -> Result<Option<DailyLogRecord>, HttpError>;
}

/// `DailyLogStore` backed by the Workers HTTP API.
pub struct WorkerStore {
    client: WorkerClient,
    ensure_url: String,
    upsert_url: String,
    read_url: String,
}

impl WorkerStore {
    pub fn new(
        client: WorkerClient,
        ensure_url: impl Into<String>,
        upsert_url: impl Into<String>,
        read_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            ensure_url: ensure_url.into(),
            upsert_url: upsert_url.into(),
            read_url: read_url.into(),
        }
    }
}

#[async_trait]
impl DailyLogStore for WorkerStore {
    async fn ensure(&self, request: &EnsureRequest) -> Result<EnsureResponse, HttpError> {
        self.client.post_json(&self.ensure_url, request).await
    }

    async fn upsert(&self, request: &UpsertRequest) -> Result<(), HttpError> {
        let _echo: Value = self.client.post_json(&self.upsert_url, request).await?;
        Ok(())
    }

    async fn read(&self, target_date: NaiveDate) -> Result<Option<DailyLogRecord>, HttpError> {
        let date = dates::format_date(target_date);
        let response: ReadResponse = self
            .client
            .get_json(&self.read_url, &[("date", date.as_str())])
            .await?;
        Ok(response.into_record(target_date))
    }
}

// ── In-memory store (tests) ─────────────────────────────────────────

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    /// Store double with the remote store's idempotency guarantees.
    #[derive(Default)]
    pub struct MemoryStore {
        pub pages: Mutex<BTreeMap<String, String>>,
        pub upserts: Mutex<Vec<UpsertRequest>>,
        pub records: Mutex<BTreeMap<NaiveDate, DailyLogRecord>>,
    }

    impl MemoryStore {
        pub fn upsert_count(&self) -> usize {
            self.upserts.lock().unwrap().len()
        }

        pub fn last_upsert(&self) -> Option<UpsertRequest> {
            self.upserts.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl DailyLogStore for MemoryStore {
        async fn ensure(&self, request: &EnsureRequest) -> Result<EnsureResponse, HttpError> {
            let mut pages = self.pages.lock().unwrap();
            let next = format!("page-{}", pages.len() + 1);
            let id = pages.entry(request.target_date.clone()).or_insert(next);
            Ok(EnsureResponse {
                page_id: Some(id.clone()),
            })
        }

        async fn upsert(&self, request: &UpsertRequest) -> Result<(), HttpError> {
            self.upserts.lock().unwrap().push(request.clone());
            Ok(())
        }

        async fn read(&self, target_date: NaiveDate) -> Result<Option<DailyLogRecord>, HttpError> {
            Ok(self.records.lock().unwrap().get(&target_date).cloned())
        }
    }
}
