//! Response Parser Service
//!
//! Turns one backend's free-form text into validated `CommitOption`s. The
//! parser never fails: the worst outcome is an empty report in `Failed` mode.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::types::CommitOption;

/// Log target for responses that arrived but could not be parsed
pub const PARSE_LOG_TARGET: &str = "git_quill::parse";

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([\]}])").expect("trailing comma regex should compile"));

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*```[A-Za-z0-9_-]*\s*$").expect("fence regex should compile"));

/// How the options in a report were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// The outermost array or object parsed as a whole
    Direct,
    /// Whole-document parsing failed; options came from individual fragments
    Salvaged,
    /// Nothing usable was found
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReport {
    pub options: Vec<CommitOption>,
    pub mode: ParseMode,
    /// Elements that were found but failed validation
    pub discarded: usize,
}

impl ParseReport {
    fn failed(discarded: usize) -> Self {
        Self {
            options: Vec::new(),
            mode: ParseMode::Failed,
            discarded,
        }
    }
}

/// Response parser for backend text with a salvage fallback
#[derive(Clone, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses `response`, logging under `PARSE_LOG_TARGET` when nothing usable is found
    pub fn parse(&self, backend_id: &str, response: &str) -> ParseReport {
        crate::log_debug!(
            "🔍 Parser: {} responded with {} chars",
            backend_id,
            response.len()
        );

        let unfenced = strip_fences(response);
        let mut discarded = 0;

        match parse_document(&unfenced) {
            Some(values) => {
                let (options, rejected) = validate_all(values);
                if !options.is_empty() {
                    return ParseReport {
                        options,
                        mode: ParseMode::Direct,
                        discarded: rejected,
                    };
                }
                discarded = rejected;
                crate::log_debug!("❌ Parser: document parsed but held no valid options");
            }
            None => crate::log_debug!("❌ Parser: document parse failed, trying salvage"),
        }

        let (options, rejected) = salvage(&unfenced);
        if options.is_empty() {
            crate::log_warn!(
                target: PARSE_LOG_TARGET,
                "Backend {} returned an unusable response ({} chars, {} invalid options): {}",
                backend_id,
                response.len(),
                discarded.max(rejected),
                response.chars().take(200).collect::<String>()
            );
            return ParseReport::failed(discarded.max(rejected));
        }

        crate::log_warn!(
            target: PARSE_LOG_TARGET,
            "Backend {} returned malformed JSON; salvaged {} option(s), dropped {}",
            backend_id,
            options.len(),
            rejected
        );
        ParseReport {
            options,
            mode: ParseMode::Salvaged,
            discarded: rejected,
        }
    }
}

/// Parses the outermost `[...]`, or a lone `{...}` promoted to one element.
///
/// Trailing commas are only stripped when the text does not parse as is,
/// so string contents of valid JSON are never altered.
fn parse_document(text: &str) -> Option<Vec<Value>> {
    parse_outermost(text).or_else(|| {
        let stripped = strip_trailing_commas(text);
        if stripped == text {
            None
        } else {
            parse_outermost(&stripped)
        }
    })
}

/// Collects every individually well-formed object in the text.
///
/// Each `{` is a candidate start. A parsed object is skipped past whole
/// unless it is an invalid wrapper around nested objects.
fn salvage(text: &str) -> (Vec<CommitOption>, usize) {
    let mut options = Vec::new();
    let mut rejected = 0;
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find('{') {
        let start = cursor + found;
        cursor = start + 1;

        let Some(len) = balanced_object_len(&text[start..]) else {
            continue;
        };
        let candidate = &text[start..start + len];
        let Some(value) = parse_fragment(candidate) else {
            continue;
        };

        match validate(&value) {
            Some(option) => {
                options.push(option);
                cursor = start + len;
            }
            // Wrapper objects may hold options further in
            None if value.as_object().is_some_and(has_nested_object) => {}
            None => {
                rejected += 1;
                cursor = start + len;
            }
        }
    }

    (options, rejected)
}

/// Removes Markdown fence lines
fn strip_fences(response: &str) -> String {
    CODE_FENCE.replace_all(response.trim(), "").into_owned()
}

fn strip_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

fn parse_outermost(text: &str) -> Option<Vec<Value>> {
    if let Some(array) = outermost(text, '[', ']') {
        match serde_json::from_str::<Value>(array) {
            Ok(Value::Array(items)) => return Some(items),
            Ok(_) => return None,
            Err(e) => {
                crate::log_debug!("❌ Parser: array parse failed: {}", e);
            }
        }
    }

    let object = outermost(text, '{', '}')?;
    match serde_json::from_str::<Value>(object) {
        Ok(value @ Value::Object(_)) => Some(vec![value]),
        _ => None,
    }
}

fn parse_fragment(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .or_else(|| serde_json::from_str::<Value>(&strip_trailing_commas(candidate)).ok())
        .filter(Value::is_object)
}

fn has_nested_object(object: &serde_json::Map<String, Value>) -> bool {
    object.values().any(|v| match v {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(Value::is_object),
        _ => false,
    })
}

/// Byte length of the `{...}` object at the start of `text`, honouring
/// string literals and escapes. `None` when the braces never balance.
fn balanced_object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn outermost(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

fn validate_all(values: Vec<Value>) -> (Vec<CommitOption>, usize) {
    let total = values.len();
    let options: Vec<CommitOption> = values.iter().filter_map(validate).collect();
    let rejected = total - options.len();
    (options, rejected)
}

/// Accepts an object with non-empty string `type` and `message`
fn validate(value: &Value) -> Option<CommitOption> {
    let object = value.as_object()?;
    let non_empty = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let kind = non_empty("type")?;
    let message = non_empty("message")?;
    let description = object
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim();

    Some(CommitOption::new(kind, description, message))
}
