use chrono::{DateTime, Utc};
use std::borrow::Cow;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string in terminal columns, Unicode-aware (CJK and
/// emoji take two columns, combining marks take none).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncate a string to fit within `max_width` terminal columns, appending
/// "..." when anything was cut. Returns `Cow::Borrowed` when the string
/// already fits, so the common render path allocates nothing.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 {
        return Cow::Borrowed("");
    }
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    // Room for content once the ellipsis is accounted for; extremely narrow
    // columns get plain truncation without the ellipsis.
    let budget = max_width.saturating_sub(ELLIPSIS_WIDTH);
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    if max_width > ELLIPSIS_WIDTH {
        out.push_str(ELLIPSIS);
    }
    Cow::Owned(out)
}

/// Strip control characters (except newline and tab) before rendering.
/// Topic content arrives from arbitrary users; escape sequences must never
/// reach the terminal.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if s.chars().all(|c| !is_forbidden_control(c)) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|&c| !is_forbidden_control(c)).collect())
}

fn is_forbidden_control(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}

/// Render an epoch-milliseconds timestamp relative to `now`, in the style of
/// the usual feed UIs: "just now", "5m ago", "3h ago", then a plain date.
pub fn format_relative_time(epoch_ms: i64, now: DateTime<Utc>) -> String {
    let Some(then) = DateTime::<Utc>::from_timestamp_millis(epoch_ms) else {
        return "unknown".to_string();
    };

    let secs = (now - then).num_seconds();
    match secs {
        i64::MIN..=-1 => "just now".to_string(), // clock skew: treat future as now
        0..=44 => "just now".to_string(),
        45..=3_599 => format!("{}m ago", (secs / 60).max(1)),
        3_600..=86_399 => format!("{}h ago", secs / 3600),
        86_400..=604_799 => format!("{}d ago", secs / 86_400),
        _ => then.format("%Y-%m-%d").to_string(),
    }
}
