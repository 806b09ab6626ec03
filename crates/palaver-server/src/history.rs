//! Rendering of message history for the wire.
//!
//! One line per message, `[YYYY-MM-DD HH:MM:SS] sender: body`. The
//! rendered block must fit the fixed content field; when it would
//! overflow, it is cut at a line boundary and ends with `...`.

use chrono::DateTime;

use palaver_proto::CONTENT_CAP;

/// Slack kept below the content capacity so the block plus its
/// terminating NUL always fits the field.
const SAFETY_MARGIN: usize = 16;

const ELLIPSIS: &str = "...\n";

/// Render an iterator of `(timestamp, sender, body)` rows.
pub fn render<'a, I>(rows: I) -> String
where
    I: IntoIterator<Item = (i64, &'a str, &'a str)>,
{
    let cap = CONTENT_CAP - SAFETY_MARGIN;
    let mut out = String::new();
    for (timestamp, sender, body) in rows {
        let line = format!("[{}] {}: {}\n", format_timestamp(timestamp), sender, body);
        if out.len() + line.len() > cap - ELLIPSIS.len() {
            out.push_str(ELLIPSIS);
            return out;
        }
        out.push_str(&line);
    }
    out
}

fn format_timestamp(secs: i64) -> String {
    match DateTime::from_timestamp(secs, 0) {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => secs.to_string(),
    }
}
