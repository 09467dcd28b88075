//! Commit message candidate type and formatting

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One candidate commit message returned by a backend
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq, Eq)]
pub struct CommitOption {
    /// Short style tag such as "concise", "conventional" or "detailed"
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable one-line summary of the option
    #[serde(default)]
    pub description: String,
    /// The commit message text, possibly multi-line
    pub message: String,
}

impl CommitOption {
    pub fn new(kind: &str, description: &str, message: &str) -> Self {
        Self {
            kind: kind.to_string(),
            description: description.to_string(),
            message: message.to_string(),
        }
    }

    /// First line of the message
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// Formats an option's message for display: the subject line as-is, the body
/// wrapped at 72 columns. Lines that look pre-formatted are kept intact, and
/// long words such as URLs are never split.
pub fn format_commit_message(option: &CommitOption) -> String {
    let mut message = String::new();
    let mut lines = option.message.trim().lines();

    if let Some(subject) = lines.next() {
        message.push_str(subject.trim_end());
        message.push('\n');
    }

    for line in lines {
        let keep = line.is_empty()
            || line.starts_with(' ')
            || line.starts_with('-')
            || line.starts_with('*')
            || (line.contains(": ") && line.len() <= 72);
        if keep {
            let _ = writeln!(message, "{}", line.trim_end());
        } else {
            for wrapped in textwrap::wrap(line, textwrap::Options::new(72).break_words(false)) {
                let _ = writeln!(message, "{wrapped}");
            }
        }
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_field_rename() {
        let option: CommitOption =
            serde_json::from_str(r#"{"type":"concise","message":"fix: typo"}"#).expect("parse");
        assert_eq!(option.kind, "concise");
        assert_eq!(option.description, "");

        let json = serde_json::to_string(&option).expect("serialize");
        assert!(json.contains(r#""type":"concise""#));
    }

    #[test]
    fn test_format_wraps_body_only() {
        let long = "word ".repeat(30);
        let option = CommitOption::new("detailed", "", &format!("feat: add thing\n\n{long}\n- item"));
        let formatted = format_commit_message(&option);
        let lines: Vec<&str> = formatted.lines().collect();

        assert_eq!(lines[0], "feat: add thing");
        assert_eq!(lines[1], "");
        assert!(lines.iter().all(|l| l.len() <= 72));
        assert_eq!(lines.last().copied(), Some("- item"));
    }

    #[test]
    fn test_format_keeps_long_words_whole() {
        let url = format!("https://example.com/{}", "segment/".repeat(12));
        let option = CommitOption::new("detailed", "", &format!("docs: fix link\n\nSee {url} for details"));
        let formatted = format_commit_message(&option);
        assert!(formatted.lines().any(|l| l == url));
    }
}
