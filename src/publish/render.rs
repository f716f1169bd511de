//! Turns a persisted daily log into the mail's subject, text and HTML bodies.

use crate::config::SummaryConfig;
use crate::dates;
use crate::ingest::DailyLogRecord;
use crate::publish::parser::{TaskEntry, parse_summary};

/// Placeholder for blank or missing values.
const PLACEHOLDER: &str = "—";

/// Ready-to-send mail content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSummary {
    pub subject: String,
    pub plain_text: String,
    pub html_body: String,
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn display_text(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(PLACEHOLDER)
        .to_string()
}

/// Shortest form of a number: `62.5`, `1200`.
fn display_number(value: Option<f64>) -> String {
    match value {
        Some(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => format!("{n:.0}"),
        Some(n) if n.is_finite() => n.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

/// The first `max` entries and how many were cut.
fn visible(entries: &[TaskEntry], max: usize) -> (&[TaskEntry], usize) {
    if entries.len() <= max {
        (entries, 0)
    } else {
        (&entries[..max], entries.len() - max)
    }
}

fn badge_colors(priority: &str) -> (&'static str, &'static str) {
    match priority.trim().to_lowercase().as_str() {
        "high" => ("#fee2e2", "#991b1b"),
        "mid" | "medium" => ("#fef3c7", "#92400e"),
        "low" => ("#d1fae5", "#065f46"),
        _ => ("#e5e7eb", "#374151"),
    }
}

fn priority_badge(priority: &str) -> String {
    let (background, color) = badge_colors(priority);
    let label = if priority.is_empty() { "-" } else { priority };
    format!(
        r#"<span style="display: inline-block; padding: 2px 8px; border-radius: 999px; font-size: 12px; background: {background}; color: {color}; font-weight: 600; white-space: nowrap;">{}</span>"#,
        escape_html(label)
    )
}

fn task_rows(entries: &[TaskEntry], hidden: usize) -> String {
    let mut rows = String::new();
    if entries.is_empty() {
        rows.push_str(&format!(
            r#"<tr><td style="padding: 8px 0; color: #9ca3af; font-size: 14px;">{PLACEHOLDER}</td><td style="padding: 8px 0;"></td></tr>"#
        ));
    }
    for entry in entries {
        rows.push_str(&format!(
            r#"<tr><td style="padding: 8px 0; font-size: 14px; color: #111827;">{}</td><td align="right" style="padding: 8px 0;">{}</td></tr>"#,
            escape_html(&entry.title),
            priority_badge(&entry.priority)
        ));
    }
    if hidden > 0 {
        rows.push_str(&format!(
            r#"<tr><td colspan="2" style="padding: 8px 0; font-size: 13px; color: #6b7280;">...and {hidden} more</td></tr>"#
        ));
    }
    rows
}

fn text_items(out: &mut Vec<String>, entries: &[TaskEntry], hidden: usize) {
    if entries.is_empty() {
        out.push(format!("- {PLACEHOLDER}"));
    }
    out.extend(
        entries
            .iter()
            .map(|e| format!("- {} (Priority: {})", e.title, e.priority)),
    );
    if hidden > 0 {
        out.push(format!("...and {hidden} more"));
    }
}

/// Summary fields shared by the text and HTML bodies.
struct Details {
    diary: String,
    expenses_total: String,
    location_summary: String,
    mood: String,
    weight: String,
}

impl Details {
    fn from_record(record: &DailyLogRecord) -> Self {
        Self {
            diary: display_text(record.diary.as_deref()),
            expenses_total: display_number(record.expenses_total),
            location_summary: display_text(record.location_summary.as_deref()),
            mood: display_text(record.mood.as_deref()),
            weight: display_number(record.weight),
        }
    }
}

fn section_table(heading: &str, rows: &str) -> String {
    format!(
        r#"            <tr>
              <td style="padding: 0 24px 16px 24px;">
                <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="border: 1px solid #e5e7eb; border-radius: 12px; padding: 16px;">
                  <tr>
                    <td>
                      <h2 style="margin: 0 0 8px 0; font-size: 16px;">{}</h2>
                      <table role="presentation" width="100%" cellspacing="0" cellpadding="0">{rows}</table>
                    </td>
                  </tr>
                </table>
              </td>
            </tr>"#,
        escape_html(heading)
    )
}

fn detail_row(label: &str, value_html: &str) -> String {
    format!(
        r#"<tr><td style="padding: 6px 0; font-size: 13px; color: #6b7280; width: 160px;">{label}</td><td style="padding: 6px 0; font-size: 14px; color: #111827;">{value_html}</td></tr>"#
    )
}

fn multiline_html(text: &str) -> String {
    escape_html(text).replace('\n', "<br />")
}

pub fn render(record: &DailyLogRecord, config: &SummaryConfig) -> RenderedSummary {
    let date = dates::format_date(record.target_date);
    let parsed = parse_summary(&record.summary_text, config);
    let (done, done_hidden) = visible(&parsed.done, config.max_visible_items);
    let (drop, drop_hidden) = visible(&parsed.drop, config.max_visible_items);
    let details = Details::from_record(record);

    let done_heading = format!(
        "{} {}（Done: {}）",
        config.done_marker,
        config.done_heading,
        parsed.done.len()
    );
    let drop_heading = format!(
        "{} {}（Drop: {}）",
        config.drop_marker,
        config.drop_heading,
        parsed.drop.len()
    );

    // ── Plain text ──
    let mut lines = vec![
        format!("Daily Log | {date}"),
        format!("Run ID: {}", record.run_id),
        String::new(),
        done_heading.clone(),
    ];
    text_items(&mut lines, done, done_hidden);
    lines.push(String::new());
    lines.push(drop_heading.clone());
    text_items(&mut lines, drop, drop_hidden);
    lines.extend([
        String::new(),
        "Summary".to_string(),
        format!("- Diary: {}", details.diary),
        format!("- Expenses total: {}", details.expenses_total),
        format!("- Location summary: {}", details.location_summary),
        format!("- Mood: {}", details.mood),
        format!("- Weight: {}", details.weight),
    ]);
    let mut plain_text = lines.join("\n").trim().to_string();
    plain_text.push('\n');

    // ── HTML ──
    let detail_rows = [
        detail_row("Diary", &multiline_html(&details.diary)),
        detail_row("Expenses total", &escape_html(&details.expenses_total)),
        detail_row("Location summary", &multiline_html(&details.location_summary)),
        detail_row("Mood", &escape_html(&details.mood)),
        detail_row("Weight", &escape_html(&details.weight)),
    ]
    .concat();
    let sections = [
        section_table(&done_heading, &task_rows(done, done_hidden)),
        section_table(&drop_heading, &task_rows(drop, drop_hidden)),
        section_table("Summary", &detail_rows),
    ]
    .join("\n");

    let html_body = format!(
        r#"<!DOCTYPE html>
<html lang="ja">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Daily Log | {date}</title>
  </head>
  <body style="margin: 0; padding: 0; background-color: #f6f7f9; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; color: #111827;">
    <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="background-color: #f6f7f9; padding: 24px 0;">
      <tr>
        <td align="center" style="padding: 0 12px;">
          <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 640px; background-color: #ffffff; border-radius: 16px; border: 1px solid #e5e7eb; overflow: hidden;">
            <tr>
              <td style="padding: 24px 24px 16px 24px;">
                <h1 style="margin: 0 0 8px 0; font-size: 22px; line-height: 1.3;">Daily Log | {date}</h1>
                <p style="margin: 0; font-size: 13px; color: #6b7280;">Run ID: {run_id}</p>
              </td>
            </tr>
{sections}
          </table>
        </td>
      </tr>
    </table>
  </body>
</html>
"#,
        date = escape_html(&date),
        run_id = escape_html(&record.run_id),
    );

    RenderedSummary {
        subject: format!("Daily Log | {date}"),
        plain_text,
        html_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(summary_text: &str) -> DailyLogRecord {
        DailyLogRecord {
            target_date: dates::parse_date("2026-01-22").unwrap(),
            record_id: "p-1".into(),
            title: "Daily Log｜2026-01-22".into(),
            summary_text: summary_text.into(),
            summary_html: String::new(),
            run_id: "run-1".into(),
            source_label: "automation".into(),
            structured_payload: None,
            diary: None,
            expenses_total: None,
            location_summary: None,
            mood: None,
            weight: None,
        }
    }

    fn done_text(n: usize) -> String {
        let mut text = format!("🎉 昨日完了したこと（Done: {n}）\n");
        for i in 1..=n {
            text.push_str(&format!("- Task {i} (Priority: Low)\n"));
        }
        text
    }

    #[test]
    fn subject_and_text_layout() {
        let mut rec = record(
            "🎉 昨日完了したこと（Done: 2）\n- Write report (Priority: High)\n- Fix bug\n\n🧹 昨日手放したこと（Drop: 0）\n(none)\n",
        );
        rec.diary = Some("  ".into());
        rec.expenses_total = Some(1200.0);
        rec.weight = Some(62.5);
        rec.mood = Some("calm".into());

        let rendered = render(&rec, &SummaryConfig::default());
        assert_eq!(rendered.subject, "Daily Log | 2026-01-22");
        assert_eq!(
            rendered.plain_text,
            "Daily Log | 2026-01-22\n\
Run ID: run-1\n\
\n\
🎉 昨日完了したこと（Done: 2）\n\
- Write report (Priority: High)\n\
- Fix bug (Priority: -)\n\
\n\
🧹 昨日手放したこと（Drop: 0）\n\
- —\n\
\n\
Summary\n\
- Diary: —\n\
- Expenses total: 1200\n\
- Location summary: —\n\
- Mood: calm\n\
- Weight: 62.5\n"
        );
    }

    #[test]
    fn long_blocks_are_truncated() {
        let rendered = render(&record(&done_text(35)), &SummaryConfig::default());

        assert!(rendered.plain_text.contains("（Done: 35）"));
        assert!(rendered.plain_text.contains("- Task 30 (Priority: Low)"));
        assert!(!rendered.plain_text.contains("- Task 31 "));
        assert!(rendered.plain_text.contains("...and 5 more"));
        assert!(rendered.html_body.contains("...and 5 more"));
    }

    #[test]
    fn exactly_the_limit_is_not_truncated() {
        let rendered = render(&record(&done_text(30)), &SummaryConfig::default());
        assert!(!rendered.plain_text.contains("more"));
    }

    #[test]
    fn numbers_use_shortest_form() {
        assert_eq!(display_number(Some(62.5)), "62.5");
        assert_eq!(display_number(Some(1200.0)), "1200");
        assert_eq!(display_number(Some(-3.0)), "-3");
        assert_eq!(display_number(None), "—");
    }

    #[test]
    fn html_escapes_and_breaks_lines() {
        let mut rec = record("🎉 x\n- <script> (Priority: High)\n");
        rec.diary = Some("line one\nline <two>".into());

        let html = render(&rec, &SummaryConfig::default()).html_body;
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("line one<br />line &lt;two&gt;"));
        assert!(html.contains("background: #fee2e2; color: #991b1b;"));
    }

    #[test]
    fn badge_colours_by_priority() {
        assert_eq!(badge_colors("High"), ("#fee2e2", "#991b1b"));
        assert_eq!(badge_colors("medium"), ("#fef3c7", "#92400e"));
        assert_eq!(badge_colors("Mid"), ("#fef3c7", "#92400e"));
        assert_eq!(badge_colors(" low "), ("#d1fae5", "#065f46"));
        assert_eq!(badge_colors("-"), ("#e5e7eb", "#374151"));
        assert_eq!(badge_colors("Urgent"), ("#e5e7eb", "#374151"));
    }

    #[test]
    fn escape_covers_quotes() {
        assert_eq!(escape_html(r#"a "b" & 'c'"#), "a &quot;b&quot; &amp; &#x27;c&#x27;");
    }
}
