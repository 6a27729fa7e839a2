use serde_json::Value;

use crate::shared::payload::record_id;
use crate::shared::search::SearchOutcome;
use crate::shared::timestamps::{convert_timestamps, created_epoch};

const WRAP_WIDTH: usize = 100;
const SHORT_ID_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
    Raw,
}

impl OutputMode {
    pub fn from_flags(json: bool, raw: bool) -> Self {
        if raw {
            OutputMode::Raw
        } else if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    pub key: &'static str,
}

pub const fn col(header: &'static str, key: &'static str) -> Column {
    Column { header, key }
}

pub fn stringify(value: &Value, mode: OutputMode) -> String {
    match mode {
        OutputMode::Raw => value.to_string(),
        OutputMode::Json | OutputMode::Table => {
            serde_json::to_string_pretty(&convert_timestamps(value)).unwrap_or_default()
        }
    }
}

/// Render a record list for the chosen mode. `payload` is only used by raw mode.
pub fn render_list(payload: &Value, records: &[Value], columns: &[Column], mode: OutputMode) -> String {
    match mode {
        OutputMode::Raw => payload.to_string(),
        OutputMode::Json => stringify(&Value::Array(records.to_vec()), mode),
        OutputMode::Table => {
            let converted: Vec<Value> = records.iter().map(convert_timestamps).collect();
            render_table(&converted, columns)
        }
    }
}

pub fn render_table(records: &[Value], columns: &[Column]) -> String {
    if records.is_empty() {
        return "(no results)".to_string();
    }

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| columns.iter().map(|c| cell(record, c.key)).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.header.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(join_row(columns.iter().map(|c| c.header.to_string()), &widths));
    lines.push(join_row(widths.iter().map(|w| "-".repeat(*w)), &widths));
    for row in rows {
        lines.push(join_row(row.into_iter(), &widths));
    }
    lines.join("\n")
}

fn join_row(cells: impl Iterator<Item = String>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(text, width)| {
            let pad = width.saturating_sub(text.chars().count());
            format!("{text}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn cell(record: &Value, key: &str) -> String {
    match record.pointer(&format!("/{}", key.replace('.', "/"))) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn render_search(outcome: &SearchOutcome, columns: &[Column], mode: OutputMode) -> String {
    let summary = serde_json::json!({
        "matches": outcome.matches,
        "scanned": outcome.scanned,
        "matched": outcome.matched,
        "has_more_scanned": outcome.has_more_scanned,
    });
    match mode {
        OutputMode::Raw | OutputMode::Json => stringify(&summary, mode),
        OutputMode::Table => {
            let converted: Vec<Value> = outcome.matches.iter().map(convert_timestamps).collect();
            let mut out = render_table(&converted, columns);
            out.push_str(&format!(
                "\n\nScanned {} records, matched {}.",
                outcome.scanned, outcome.matched
            ));
            if outcome.has_more_scanned {
                out.push_str(" More records exist beyond the scan bounds.");
            }
            out
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptOptions {
    pub show_ids: bool,
    pub show_citations: bool,
    pub max_body: Option<usize>,
    pub no_wrap: bool,
}

/// Pretty transcript of a thread and its messages, oldest first.
pub fn render_transcript(
    thread_id: &str,
    thread: &Value,
    messages: &[Value],
    options: &TranscriptOptions,
) -> String {
    let thread = convert_timestamps(thread);
    let mut messages: Vec<Value> = messages.iter().map(convert_timestamps).collect();
    messages.sort_by_key(created_epoch);

    let count = messages.len();
    let mut out = vec![format!(
        "Thread {} — {} message{}",
        record_id(&thread).unwrap_or(thread_id.into()),
        count,
        if count == 1 { "" } else { "s" }
    )];

    for message in &messages {
        let ts = message
            .get("created_at")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let role = message
            .get("role")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        let mut extras = Vec::new();
        if let Some(run_id) = message.get("run_id").and_then(Value::as_str) {
            extras.push(format!("run: {}", shorten(run_id)));
        }
        if options.show_ids {
            if let Some(id) = record_id(message) {
                extras.push(format!("id: {}", shorten(&id)));
            }
        }
        let mut header = format!("{ts} {role}");
        if !extras.is_empty() {
            header.push_str(&format!(" ({})", extras.join(", ")));
        }
        out.push(format!("{header}:"));

        let mut body = extract_text(message).join("\n\n");
        if let Some(max) = options.max_body {
            if body.chars().count() > max {
                body = body.chars().take(max).collect::<String>() + " … [truncated]";
            }
        }
        if !options.no_wrap {
            body = soft_wrap(&body, WRAP_WIDTH);
        }
        for line in body.split('\n') {
            out.push(format!("  {line}"));
        }

        let citations = list_citations(message);
        let attachments = message
            .get("attachments")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let mut indicators = Vec::new();
        if !citations.is_empty() {
            indicators.push(plural(citations.len(), "citation"));
        }
        if attachments > 0 {
            indicators.push(plural(attachments, "attachment"));
        }
        if !indicators.is_empty() {
            out.push(format!("  [{}]", indicators.join(", ")));
        }
        if options.show_citations {
            for citation in &citations {
                out.push(format!("    - {citation}"));
            }
        }
        out.push(String::new());
    }

    out.join("\n")
}

fn plural(count: usize, noun: &str) -> String {
    format!("{count} {noun}{}", if count == 1 { "" } else { "s" })
}

pub fn extract_text(message: &Value) -> Vec<String> {
    let texts: Vec<String> = content_items(message)
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|item| item.pointer("/text/value").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .collect();
    if texts.is_empty() {
        vec![String::new()]
    } else {
        texts
    }
}

pub fn list_citations(message: &Value) -> Vec<String> {
    content_items(message)
        .filter_map(|item| item.pointer("/text/annotations").and_then(Value::as_array))
        .flatten()
        .map(|annotation| {
            let target = [
                "/file_citation/file_id",
                "/file_path/file_id",
                "/url_citation/url",
            ]
            .iter()
            .find_map(|p| annotation.pointer(p).and_then(Value::as_str))
            .unwrap_or("ref");
            let kind = annotation
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("annotation");
            let range = match (
                annotation.get("start_index").and_then(Value::as_i64),
                annotation.get("end_index").and_then(Value::as_i64),
            ) {
                (Some(start), Some(end)) => format!("[{start}-{end}]"),
                _ => String::new(),
            };
            format!("{kind} {range} -> {target}")
        })
        .collect()
}

fn content_items(message: &Value) -> impl Iterator<Item = &Value> {
    message
        .get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Greedy word wrap; paragraphs (blank-line separated) stay separated.
pub fn soft_wrap(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    for paragraph in split_paragraphs(text) {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
            } else if line.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut line));
                line.push_str(word);
            } else {
                line.push(' ');
                line.push_str(word);
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
        lines.push(String::new());
    }
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines.join("\n")
}

fn split_paragraphs(text: &str) -> Vec<&str> {
    let mut paragraphs = Vec::new();
    let mut start = 0;
    let mut rest = text;
    while let Some(pos) = rest.find("\n\n") {
        let end = start + pos;
        paragraphs.push(&text[start..end]);
        let skip = rest[pos..].chars().take_while(|c| *c == '\n').count();
        start = end + skip;
        rest = &text[start..];
    }
    paragraphs.push(&text[start..]);
    paragraphs
}

pub fn shorten(id: &str) -> String {
    if id.chars().count() > SHORT_ID_LEN {
        format!("{}…", id.chars().take(SHORT_ID_LEN).collect::<String>())
    } else {
        id.to_string()
    }
}
