//! Closed-tasks connector: what was finished or dropped on the target day.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SummaryConfig;
use crate::connectors::{RenderedSection, SourceConnector, SummaryBlocks, keys};
use crate::dates::{self, ClosingWindow};
use crate::error::ConnectorError;
use crate::http::WorkerClient;

/// Which way a task was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClosedCategory {
    Done,
    Drop,
}

impl ClosedCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Done => "Done",
            Self::Drop => "Drop",
        }
    }
}

/// A closed task as reported by the task store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    #[serde(rename = "page_id")]
    pub id: Option<String>,
    pub title: String,
    pub priority: Option<String>,
    pub status: ClosedCategory,
    /// Raw closing timestamp (`done_date` / `drop_date`).
    pub closed_on: Option<String>,
}

impl TaskRecord {
    /// Identity used to collapse duplicates within one category.
    pub fn dedup_key(&self) -> String {
        match self.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => format!("{}-{}", self.title, self.priority_or_dash()),
        }
    }

    pub fn priority_or_dash(&self) -> &str {
        self.priority.as_deref().filter(|p| !p.is_empty()).unwrap_or("-")
    }

    /// `"{title} (Priority: {priority})"`.
    pub fn summary_line(&self) -> String {
        format!("{} (Priority: {})", self.title, self.priority_or_dash())
    }
}

/// Done and dropped tasks for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosedTaskSet {
    pub reference_date: Option<NaiveDate>,
    pub done: Vec<TaskRecord>,
    pub drop: Vec<TaskRecord>,
}

impl ClosedTaskSet {
    pub fn empty(reference_date: NaiveDate) -> Self {
        Self {
            reference_date: Some(reference_date),
            ..Self::default()
        }
    }
}

/// Upstream wire shape of `GET /api/tasks/closed`.
#[derive(Debug, Deserialize)]
struct ClosedTasksResponse {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    done: Vec<ClosedTaskWire>,
    #[serde(default)]
    drop: Vec<ClosedTaskWire>,
}

#[derive(Debug, Deserialize)]
struct ClosedTaskWire {
    #[serde(default)]
    page_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    done_date: Option<String>,
    #[serde(default)]
    drop_date: Option<String>,
}

impl ClosedTaskWire {
    fn into_record(self, status: ClosedCategory) -> TaskRecord {
        let closed_on = match status {
            ClosedCategory::Done => self.done_date,
            ClosedCategory::Drop => self.drop_date,
        };
        TaskRecord {
            id: self.page_id.filter(|id| !id.is_empty()),
            title: self.title.unwrap_or_default(),
            priority: self.priority,
            status,
            closed_on,
        }
    }
}

/// Keep the first occurrence of every dedup key, preserving order.
pub fn dedupe(records: Vec<TaskRecord>) -> Vec<TaskRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.dedup_key()))
        .collect()
}

/// Keep records whose closing timestamp falls inside `window`.
///
/// Records without a parseable closing timestamp are dropped regardless of status.
pub fn filter_closed_within(records: Vec<TaskRecord>, window: &ClosingWindow) -> Vec<TaskRecord> {
    records
        .into_iter()
        .filter(|record| {
            let keep = window.contains_raw(record.closed_on.as_deref());
            if !keep {
                debug!(
                    title = %record.title,
                    status = record.status.label(),
                    closed_on = ?record.closed_on,
                    "Closed task outside window, skipping"
                );
            }
            keep
        })
        .collect()
}

/// Fetches done/dropped tasks from the Workers `tasks/closed` endpoint.
pub struct TasksConnector {
    client: WorkerClient,
    closed_tasks_url: String,
    summary: SummaryConfig,
}

impl TasksConnector {
    pub const ID: &'static str = "tasks";

    pub fn new(client: WorkerClient, closed_tasks_url: impl Into<String>, summary: SummaryConfig) -> Self {
        Self {
            client,
            closed_tasks_url: closed_tasks_url.into(),
            summary,
        }
    }

    /// Fetch, window-filter and dedupe the closed tasks of `target_date`.
    pub async fn fetch(&self, target_date: NaiveDate) -> Result<ClosedTaskSet, ConnectorError> {
        let date = dates::format_date(target_date);
        let response: ClosedTasksResponse = self
            .client
            .get_json(&self.closed_tasks_url, &[("date", date.as_str())])
            .await
            .map_err(|e| ConnectorError::fetch(Self::ID, e))?;

        let window = ClosingWindow::for_day(target_date);
        let into_records = |items: Vec<ClosedTaskWire>, status| {
            let records = items.into_iter().map(|item| item.into_record(status)).collect();
            dedupe(filter_closed_within(records, &window))
        };

        let set = ClosedTaskSet {
            reference_date: response
                .date
                .as_deref()
                .and_then(dates::parse_date)
                .or(Some(target_date)),
            done: into_records(response.done, ClosedCategory::Done),
            drop: into_records(response.drop, ClosedCategory::Drop),
        };

        info!(
            target_date = %date,
            window_start = %window.start_rfc3339(),
            window_end = %window.end_rfc3339(),
            done = set.done.len(),
            drop = set.drop.len(),
            "Fetched closed tasks"
        );
        Ok(set)
    }

    /// Pure rendering of a closed-task set into summary blocks.
    pub fn render(&self, set: &ClosedTaskSet) -> RenderedSection {
        render_closed_tasks(set, &self.summary)
    }
}

/// Summary blocks and raw echo for a closed-task set.
pub fn render_closed_tasks(set: &ClosedTaskSet, summary: &SummaryConfig) -> RenderedSection {
    let done_items: Vec<String> = set.done.iter().map(TaskRecord::summary_line).collect();
    let drop_items: Vec<String> = set.drop.iter().map(TaskRecord::summary_line).collect();
    let progress_line = progress_line(&summary.progress_prefix, done_items.len(), drop_items.len());

    let raw_payload = serde_json::json!({
        "date": set.reference_date.map(dates::format_date),
        "done": set.done,
        "drop": set.drop,
    });

    RenderedSection {
        blocks: SummaryBlocks::new()
            .with_lines(keys::DONE_ITEMS, done_items)
            .with_lines(keys::DROP_ITEMS, drop_items)
            .with_text(keys::PROGRESS_LINE, progress_line),
        raw_payload,
    }
}

/// `"{prefix}Done {n}件 / Drop {m}件"`.
pub fn progress_line(prefix: &str, done: usize, drop: usize) -> String {
    format!("{prefix}Done {done}件 / Drop {drop}件")
}

#[async_trait]
impl SourceConnector for TasksConnector {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn collect(&self, target_date: NaiveDate) -> Result<RenderedSection, ConnectorError> {
        let set = self.fetch(target_date).await?;
        Ok(self.render(&set))
    }

    /// Losing yesterday's closed tasks is tolerable; render an empty set.
    fn fallback(&self, target_date: NaiveDate) -> Option<RenderedSection> {
        Some(self.render(&ClosedTaskSet::empty(target_date)))
    }
}
