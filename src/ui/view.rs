// ui/view.rs — Display ordering and the derived overdue flag.
//
// Ordering policy: incomplete tasks before completed ones; within each group,
// ascending by effective timestamp (deadline if present, else creation time).
// Overdue is recomputed on every render and never persisted.

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use crate::storage::TaskRow;

/// Deadline if present, else creation time. `None` when the stored
/// timestamp does not parse.
pub fn effective_timestamp(task: &TaskRow) -> Option<DateTime<Utc>> {
    let raw = task.deadline.as_deref().unwrap_or(&task.created_at);
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn sort_key(task: &TaskRow) -> i64 {
    effective_timestamp(task)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

/// Stable sort into display order.
pub fn sort_for_display(tasks: &mut [TaskRow]) {
    tasks.sort_by(|a, b| {
        a.completed
            .cmp(&b.completed)
            .then_with(|| sort_key(a).cmp(&sort_key(b)))
    });
}

/// A task is overdue iff it is not completed and its effective timestamp is
/// strictly before `now`.
pub fn is_overdue(task: &TaskRow, now: DateTime<Utc>) -> bool {
    !task.completed && matches!(effective_timestamp(task), Some(ts) if ts < now)
}

/// Effective timestamp formatted for display, in local time.
pub fn format_timestamp(task: &TaskRow) -> String {
    match effective_timestamp(task) {
        Some(ts) => ts
            .with_timezone(&Local)
            .format("%b %-d, %Y %H:%M")
            .to_string(),
        None => "no date".to_string(),
    }
}

/// Parse user deadline input: RFC 3339, or a local "YYYY-MM-DD HH:MM"
/// (a literal `T` separator and trailing seconds also work).
pub fn parse_deadline_input(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            if let Some(local) = Local.from_local_datetime(&naive).single() {
                return Ok(local.with_timezone(&Utc));
            }
        }
    }
    anyhow::bail!("could not parse deadline '{raw}' — use RFC 3339 or YYYY-MM-DD HH:MM")
}
