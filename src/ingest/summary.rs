//! Canonical summary text and HTML built from merged summary blocks.
//!
//! The text form is what the publish phase parses back, so its layout is a
//! contract: a marker heading opens each closed-task block, entries are
//! `- ` lines, and an empty block is written as `(none)`.

use chrono::NaiveDate;

use crate::config::SummaryConfig;
use crate::connectors::{SummaryBlock, SummaryBlocks, keys};
use crate::connectors::tasks::progress_line;
use crate::dates;
use crate::publish::render::escape_html;

const EMPTY_BLOCK: &str = "(none)";

/// A titled list section in the summary.
struct Section<'a> {
    heading: String,
    block: &'a SummaryBlock,
}

fn list_heading(marker: &str, heading: &str, label: &str, count: usize) -> String {
    format!("{marker} {heading}（{label}: {count}）")
}

/// Sections after the progress line, known keys first then any extras in merge order.
fn trailing_sections<'a>(blocks: &'a SummaryBlocks, config: &SummaryConfig) -> Vec<Section<'a>> {
    let fixed = [
        keys::DONE_ITEMS,
        keys::DROP_ITEMS,
        keys::PROGRESS_LINE,
    ];
    let known = [
        (keys::OPEN_TASK_ITEMS, format!("Tasks (Status: {})", config.status_do)),
        (keys::INBOX_ITEMS, "Inbox".to_string()),
        (keys::SOMEDAY_ITEMS, format!("Someday (Status: {})", config.status_someday)),
    ];

    let mut sections: Vec<Section<'a>> = known
        .iter()
        .filter_map(|(key, heading)| {
            blocks.get(key).map(|block| Section {
                heading: heading.clone(),
                block,
            })
        })
        .collect();

    for key in blocks.keys() {
        if fixed.contains(&key) || known.iter().any(|(k, _)| *k == key) {
            continue;
        }
        if let Some(block) = blocks.get(key) {
            sections.push(Section {
                heading: key.to_string(),
                block,
            });
        }
    }
    sections
}

fn progress(blocks: &SummaryBlocks, config: &SummaryConfig) -> String {
    blocks
        .text(keys::PROGRESS_LINE)
        .map(str::to_string)
        .unwrap_or_else(|| {
            progress_line(
                &config.progress_prefix,
                blocks.lines(keys::DONE_ITEMS).len(),
                blocks.lines(keys::DROP_ITEMS).len(),
            )
        })
}

fn push_items(out: &mut Vec<String>, items: &[String]) {
    if items.is_empty() {
        out.push(EMPTY_BLOCK.to_string());
    } else {
        out.extend(items.iter().map(|item| format!("- {item}")));
    }
}

/// Plain-text summary stored as `summary_text`.
pub fn build_summary_text(
    target_date: NaiveDate,
    run_id: &str,
    blocks: &SummaryBlocks,
    config: &SummaryConfig,
) -> String {
    let done = blocks.lines(keys::DONE_ITEMS);
    let drop = blocks.lines(keys::DROP_ITEMS);

    let mut lines = vec![
        format!("{} Daily Summary", dates::format_date(target_date)),
        format!("Run ID: {run_id}"),
        String::new(),
        list_heading(&config.done_marker, &config.done_heading, "Done", done.len()),
    ];
    push_items(&mut lines, done);
    lines.push(String::new());
    lines.push(list_heading(&config.drop_marker, &config.drop_heading, "Drop", drop.len()));
    push_items(&mut lines, drop);
    lines.push(String::new());
    lines.push(progress(blocks, config));

    for section in trailing_sections(blocks, config) {
        lines.push(String::new());
        lines.push(section.heading);
        match section.block {
            SummaryBlock::Lines(items) => push_items(&mut lines, items),
            SummaryBlock::Text(text) => lines.push(text.clone()),
        }
    }

    let mut text = lines.join("\n").trim().to_string();
    text.push('\n');
    text
}

fn html_list(items: &[String]) -> String {
    if items.is_empty() {
        return format!(r#"<li style="margin: 0 0 6px 0;">{EMPTY_BLOCK}</li>"#);
    }
    items
        .iter()
        .map(|item| format!(r#"<li style="margin: 0 0 6px 0;">{}</li>"#, escape_html(item)))
        .collect()
}

fn html_card(heading: &str, body: &str) -> String {
    format!(
        r#"<div style="background-color: #ffffff; border: 1px solid #e5e7eb; border-radius: 12px; padding: 16px; margin: 0 0 16px 0;">
<h3 style="margin: 0 0 12px 0; font-size: 16px;">{}</h3>
{body}
</div>"#,
        escape_html(heading)
    )
}

fn html_block(block: &SummaryBlock) -> String {
    match block {
        SummaryBlock::Lines(items) => {
            format!(r#"<ul style="padding-left: 20px; margin: 0;">{}</ul>"#, html_list(items))
        }
        SummaryBlock::Text(text) => format!(
            r#"<div style="white-space: pre-wrap; font-size: 14px; line-height: 1.6;">{}</div>"#,
            escape_html(text)
        ),
    }
}

/// HTML summary stored as `summary_html`.
pub fn build_summary_html(
    target_date: NaiveDate,
    run_id: &str,
    blocks: &SummaryBlocks,
    config: &SummaryConfig,
) -> String {
    let date = escape_html(&dates::format_date(target_date));
    let done = blocks.lines(keys::DONE_ITEMS);
    let drop = blocks.lines(keys::DROP_ITEMS);

    let mut cards = vec![
        html_card(
            &list_heading(&config.done_marker, &config.done_heading, "Done", done.len()),
            &html_block(&SummaryBlock::Lines(done.to_vec())),
        ),
        html_card(
            &list_heading(&config.drop_marker, &config.drop_heading, "Drop", drop.len()),
            &html_block(&SummaryBlock::Lines(drop.to_vec())),
        ),
        format!(
            r#"<p style="margin: 0 0 16px 0; font-weight: 600;">{}</p>"#,
            escape_html(&progress(blocks, config))
        ),
    ];
    cards.extend(
        trailing_sections(blocks, config)
            .into_iter()
            .map(|section| html_card(&section.heading, &html_block(section.block))),
    );

    format!(
        r#"<!DOCTYPE html>
<html lang="ja">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{date} Daily Summary</title>
  </head>
  <body style="margin: 0; padding: 0; background-color: #f5f7fb; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; color: #222;">
    <div style="max-width: 720px; margin: 0 auto; padding: 24px 16px;">
      <div style="padding: 12px 0 20px 0;">
        <h2 style="margin: 0 0 8px 0; font-size: 22px; line-height: 1.3;">{date} Daily Summary</h2>
        <p style="margin: 0; font-size: 13px; color: #6b7280;">Run ID: {run_id}</p>
      </div>
{cards}
    </div>
  </body>
</html>
"#,
        run_id = escape_html(run_id),
        cards = cards.join("\n"),
    )
}
