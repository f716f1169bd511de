//! Reads the closed-task blocks back out of a stored summary text.
//!
//! A line starting with the done marker opens the done block, the drop marker
//! opens the drop block, and `-` lines inside an open block are entries. Any
//! other non-blank line closes the current block so later sections are never
//! attributed to it.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::SummaryConfig;

static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<title>.*?)(?:\s*\(Priority:\s*(?P<priority>[^)]+)\))?$")
        .expect("entry regex is valid")
});

/// One closed task as shown in the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    pub title: String,
    pub priority: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSummary {
    pub done: Vec<TaskEntry>,
    pub drop: Vec<TaskEntry>,
}

#[derive(Clone, Copy)]
enum Block {
    Done,
    Drop,
}

/// Parse `"{title} (Priority: {priority})"`, filling in `(No title)` and `-`.
pub fn parse_entry(text: &str) -> TaskEntry {
    let (title, priority) = match ENTRY_RE.captures(text) {
        Some(caps) => (
            caps.name("title").map_or("", |m| m.as_str()).trim(),
            caps.name("priority").map_or("", |m| m.as_str()).trim(),
        ),
        None => (text.trim(), ""),
    };
    TaskEntry {
        title: if title.is_empty() { "(No title)" } else { title }.to_string(),
        priority: if priority.is_empty() { "-" } else { priority }.to_string(),
    }
}

pub fn parse_summary(summary_text: &str, config: &SummaryConfig) -> ParsedSummary {
    let mut parsed = ParsedSummary::default();
    let mut current: Option<Block> = None;

    for raw in summary_text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with(config.done_marker.as_str()) {
            current = Some(Block::Done);
            continue;
        }
        if line.starts_with(config.drop_marker.as_str()) {
            current = Some(Block::Drop);
            continue;
        }
        let Some(item) = line.strip_prefix('-') else {
            current = None;
            continue;
        };
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        match current {
            Some(Block::Done) => parsed.done.push(parse_entry(item)),
            Some(Block::Drop) => parsed.drop.push(parse_entry(item)),
            None => {}
        }
    }
    parsed
}
