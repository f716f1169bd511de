//! Activity connector: open tasks and inbox as of the run day.
//!
//! Reports the tasks currently in the "Do" status (longest-running first),
//! the inbox, and on Mondays the "Someday" list with promote links.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SummaryConfig;
use crate::connectors::{RenderedSection, SourceConnector, SummaryBlocks, keys};
use crate::dates;
use crate::error::ConnectorError;
use crate::http::WorkerClient;

/// An open task from `GET /api/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub since_do: Option<String>,
    #[serde(default)]
    pub confirm_promote_url: Option<String>,
}

/// An inbox entry from `GET /api/inbox`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxItem {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct ItemsResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Everything the activity connector fetched for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySnapshot {
    /// Day the snapshot describes (the day after the target date).
    pub run_day: NaiveDate,
    pub tasks: Vec<OpenTask>,
    pub inbox: Vec<InboxItem>,
}

pub struct ActivityConnector {
    client: WorkerClient,
    tasks_url: String,
    inbox_url: String,
    summary: SummaryConfig,
}

impl ActivityConnector {
    pub const ID: &'static str = "activity";

    pub fn new(
        client: WorkerClient,
        tasks_url: impl Into<String>,
        inbox_url: impl Into<String>,
        summary: SummaryConfig,
    ) -> Self {
        Self {
            client,
            tasks_url: tasks_url.into(),
            inbox_url: inbox_url.into(),
            summary,
        }
    }

    pub async fn fetch(&self, target_date: NaiveDate) -> Result<ActivitySnapshot, ConnectorError> {
        let tasks: ItemsResponse<OpenTask> = self
            .client
            .get_json(&self.tasks_url, &[])
            .await
            .map_err(|e| ConnectorError::fetch(Self::ID, e))?;
        let inbox: ItemsResponse<InboxItem> = self
            .client
            .get_json(&self.inbox_url, &[])
            .await
            .map_err(|e| ConnectorError::fetch(Self::ID, e))?;

        info!(
            tasks = tasks.items.len(),
            inbox = inbox.items.len(),
            "Fetched activity snapshot"
        );

        Ok(ActivitySnapshot {
            run_day: target_date + Duration::days(1),
            tasks: tasks.items,
            inbox: inbox.items,
        })
    }

    pub fn render(&self, snapshot: &ActivitySnapshot) -> RenderedSection {
        render_activity(snapshot, &self.summary)
    }
}

/// Open "Do" tasks, those with a `since_do` date first, original order otherwise.
fn do_tasks<'a>(tasks: &'a [OpenTask], summary: &SummaryConfig) -> Vec<&'a OpenTask> {
    let (mut dated, undated): (Vec<&OpenTask>, Vec<&OpenTask>) = tasks
        .iter()
        .filter(|t| t.status.as_deref() == Some(summary.status_do.as_str()))
        .partition(|t| t.since_do.as_deref().is_some_and(|s| !s.is_empty()));
    dated.extend(undated);
    dated
}

fn open_task_line(task: &OpenTask, run_day: NaiveDate) -> String {
    let elapsed = task
        .since_do
        .as_deref()
        .and_then(|since| dates::days_since(since, run_day))
        .map(|days| format!("{days} days"))
        .unwrap_or_else(|| "-".to_string());
    let priority = task.priority.as_deref().filter(|p| !p.is_empty()).unwrap_or("-");
    format!("{} (Priority: {priority}, Since Do: {elapsed})", task.title)
}

pub fn render_activity(snapshot: &ActivitySnapshot, summary: &SummaryConfig) -> RenderedSection {
    let open_items: Vec<String> = do_tasks(&snapshot.tasks, summary)
        .into_iter()
        .map(|task| open_task_line(task, snapshot.run_day))
        .collect();
    let inbox_items: Vec<String> = snapshot.inbox.iter().map(|i| i.title.clone()).collect();

    let mut blocks = SummaryBlocks::new()
        .with_lines(keys::OPEN_TASK_ITEMS, open_items)
        .with_lines(keys::INBOX_ITEMS, inbox_items);

    if dates::is_monday(snapshot.run_day) {
        let someday: Vec<String> = snapshot
            .tasks
            .iter()
            .filter(|t| t.status.as_deref() == Some(summary.status_someday.as_str()))
            .map(|t| {
                let link = t
                    .confirm_promote_url
                    .as_deref()
                    .unwrap_or("Confirm URL unavailable");
                format!("{} (Promote: {link})", t.title)
            })
            .collect();
        blocks = blocks.with_lines(keys::SOMEDAY_ITEMS, someday);
    }

    RenderedSection {
        blocks,
        raw_payload: serde_json::json!({
            "run_day": dates::format_date(snapshot.run_day),
            "tasks": snapshot.tasks,
            "inbox": snapshot.inbox,
        }),
    }
}

#[async_trait]
impl SourceConnector for ActivityConnector {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn collect(&self, target_date: NaiveDate) -> Result<RenderedSection, ConnectorError> {
        let snapshot = self.fetch(target_date).await?;
        Ok(self.render(&snapshot))
    }
}
