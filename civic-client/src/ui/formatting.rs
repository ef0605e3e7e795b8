use chrono::{DateTime, Local, Utc};

/// Column width post and bio text is wrapped to
pub const CONTENT_WIDTH: usize = 76;
/// Leading spaces in front of wrapped content
pub const CONTENT_INDENT: &str = "  ";

/// Format timestamp for display in the local time zone
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// "1 vote", "0 votes", "12 votes"
pub fn format_vote_count(total: u32) -> String {
    if total == 1 {
        "1 vote".to_string()
    } else {
        format!("{} votes", total)
    }
}

/// Whole percentages print without a decimal, others keep one place
pub fn format_percentage(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}%", rounded)
    } else {
        format!("{:.1}%", rounded)
    }
}

/// Wrap multi-line content to `max_width`, indenting every line.
///
/// Blank lines in the source are kept so paragraphs stay apart.
pub fn wrap_content(content: &str, max_width: usize) -> Vec<String> {
    let wrap_width = max_width.saturating_sub(CONTENT_INDENT.len()).max(1);
    let mut lines = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        for wrapped in textwrap::wrap(line, wrap_width) {
            lines.push(format!("{}{}", CONTENT_INDENT, wrapped));
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
