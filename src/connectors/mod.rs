//! Source connectors: one per upstream data category.
//!
//! A connector fetches its category for a target date, normalizes it into
//! typed records and renders a `RenderedSection`: summary blocks plus a raw
//! payload echo for persistence. The ingest orchestrator runs connectors in a
//! fixed order and merges their sections.

pub mod activity;
pub mod tasks;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::ConnectorError;

pub use activity::ActivityConnector;
pub use tasks::TasksConnector;

/// Well-known summary block keys.
pub mod keys {
    pub const DONE_ITEMS: &str = "done_items";
    pub const DROP_ITEMS: &str = "drop_items";
    pub const PROGRESS_LINE: &str = "progress_line";
    pub const OPEN_TASK_ITEMS: &str = "open_task_items";
    pub const INBOX_ITEMS: &str = "inbox_items";
    pub const SOMEDAY_ITEMS: &str = "someday_items";
}

/// One rendered block of the daily summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SummaryBlock {
    Lines(Vec<String>),
    Text(String),
}

impl SummaryBlock {
    pub fn as_lines(&self) -> Option<&[String]> {
        match self {
            Self::Lines(lines) => Some(lines),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Lines(_) => None,
        }
    }
}

/// Ordered key → block mapping.
///
/// Inserting an existing key replaces the value in place; a new key is
/// appended. Merging one mapping into another therefore lets the later
/// writer win while keeping first-seen key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryBlocks {
    entries: Vec<(String, SummaryBlock)>,
}

impl SummaryBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, block: SummaryBlock) {
        let key = key.into();
        match self.entries.iter().position(|(k, _)| *k == key) {
            Some(pos) => self.entries[pos].1 = block,
            None => self.entries.push((key, block)),
        }
    }

    pub fn with_lines(mut self, key: &str, lines: Vec<String>) -> Self {
        self.insert(key, SummaryBlock::Lines(lines));
        self
    }

    pub fn with_text(mut self, key: &str, text: impl Into<String>) -> Self {
        self.insert(key, SummaryBlock::Text(text.into()));
        self
    }

    /// Merge `other` into `self`; `other` wins on key collision.
    pub fn merge(&mut self, other: SummaryBlocks) {
        for (key, block) in other.entries {
            self.insert(key, block);
        }
    }

    pub fn get(&self, key: &str) -> Option<&SummaryBlock> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, b)| b)
    }

    /// Lines stored under `key`, or an empty slice.
    pub fn lines(&self, key: &str) -> &[String] {
        self.get(key).and_then(SummaryBlock::as_lines).unwrap_or(&[])
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(SummaryBlock::as_text)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for SummaryBlocks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, block) in &self.entries {
            map.serialize_entry(key, block)?;
        }
        map.end()
    }
}

/// What a connector contributes to one ingest run.
#[derive(Debug, Clone)]
pub struct RenderedSection {
    pub blocks: SummaryBlocks,
    /// Normalized echo of the fetched data, stored under `raw.{connector_id}`.
    pub raw_payload: serde_json::Value,
}

/// A source of upstream data for the daily log.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Stable identifier, used as the key of this connector's raw payload.
    fn id(&self) -> &str;

    /// Fetch and render this connector's data for `target_date`.
    async fn collect(&self, target_date: NaiveDate) -> Result<RenderedSection, ConnectorError>;

    /// Section to use when `collect` fails.
    ///
    /// `None` (the default) makes a failure abort the whole ingest.
    fn fallback(&self, _target_date: NaiveDate) -> Option<RenderedSection> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut blocks = SummaryBlocks::new()
            .with_text("a", "first")
            .with_text("b", "second");
        blocks.insert("a", SummaryBlock::Text("replaced".into()));

        assert_eq!(blocks.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(blocks.text("a"), Some("replaced"));
    }

    #[test]
    fn merge_is_last_writer_wins() {
        let mut merged = SummaryBlocks::new()
            .with_lines("done_items", vec!["x".into()])
            .with_text("progress_line", "one");
        merged.merge(
            SummaryBlocks::new()
                .with_text("progress_line", "two")
                .with_lines("inbox_items", vec![]),
        );

        assert_eq!(merged.len(), 3);
        assert_eq!(merged.text("progress_line"), Some("two"));
        assert_eq!(
            merged.keys().collect::<Vec<_>>(),
            vec!["done_items", "progress_line", "inbox_items"]
        );
    }

    #[test]
    fn lines_of_missing_or_text_block_is_empty() {
        let blocks = SummaryBlocks::new().with_text("progress_line", "p");
        assert!(blocks.lines("done_items").is_empty());
        assert!(blocks.lines("progress_line").is_empty());
    }

    #[test]
    fn serializes_as_ordered_json_object() {
        let blocks = SummaryBlocks::new()
            .with_lines("done_items", vec!["a (Priority: -)".into()])
            .with_text("progress_line", "p");
        let json = serde_json::to_string(&blocks).unwrap();
        assert_eq!(json, r#"{"done_items":["a (Priority: -)"],"progress_line":"p"}"#);
    }
}
