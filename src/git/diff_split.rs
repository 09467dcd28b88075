//! Splits a bulk unified diff into per-file fragments.
//!
//! The splitter is a two-state machine. Only a `diff --git ` header line moves
//! it between states; every other line is either ignored (outside a file) or
//! appended to the current fragment.

use std::collections::HashMap;

const HEADER_PREFIX: &str = "diff --git ";

/// A single file's slice of a bulk diff, header line included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFragment {
    /// Destination path parsed from the header
    pub path: String,
    pub text: String,
}

#[derive(Debug)]
enum SplitState {
    OutsideFile,
    InFile { path: String, text: String },
}

/// Splits `diff` into fragments in the order they appear
pub fn split_diff(diff: &str) -> Vec<DiffFragment> {
    let mut fragments = Vec::new();
    let mut state = SplitState::OutsideFile;

    for line in diff.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if let Some(rest) = bare.strip_prefix(HEADER_PREFIX) {
            if let SplitState::InFile { path, text } = state {
                fragments.push(DiffFragment { path, text });
            }
            state = match parse_header_destination(rest) {
                Some(path) => SplitState::InFile {
                    path,
                    text: line.to_string(),
                },
                None => {
                    crate::log_warn!("Unparseable diff header: {}", bare);
                    SplitState::OutsideFile
                }
            };
            continue;
        }

        if let SplitState::InFile { text, .. } = &mut state {
            text.push_str(line);
        }
    }

    if let SplitState::InFile { path, text } = state {
        fragments.push(DiffFragment { path, text });
    }

    fragments
}

/// Splits `diff` and indexes fragments by destination path.
///
/// A path that appears twice keeps its first fragment.
pub fn index_fragments(diff: &str) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for fragment in split_diff(diff) {
        index.entry(fragment.path).or_insert(fragment.text);
    }
    index
}

/// Extracts the destination path from the text after `diff --git `.
///
/// Handles three shapes:
/// - `a/X b/X` where both sides are equal, which is unambiguous even when `X`
///   contains spaces
/// - C-quoted sides (`"a/caf\303\251" "b/caf\303\251"`)
/// - renames `a/OLD b/NEW`, split at the last ` b/`
pub fn parse_header_destination(rest: &str) -> Option<String> {
    if rest.starts_with('"') || rest.ends_with('"') {
        return parse_quoted_header(rest);
    }

    // Symmetric form: "a/" + X + " b/" + X
    if rest.len() % 2 == 1 {
        let half = rest.len() / 2;
        if rest.is_char_boundary(half) && rest.is_char_boundary(half + 1) {
            let (left, right) = (&rest[..half], &rest[half + 1..]);
            if let (Some(a), Some(b)) = (left.strip_prefix("a/"), right.strip_prefix("b/"))
                && a == b
            {
                return Some(b.to_string());
            }
        }
    }

    rest.rfind(" b/")
        .map(|idx| rest[idx + 3..].to_string())
        .filter(|path| !path.is_empty())
}

fn parse_quoted_header(rest: &str) -> Option<String> {
    // The destination is the last token; it is quoted if it ends with '"'.
    let destination = if rest.ends_with('"') {
        let open = find_last_quoted_token_start(rest)?;
        unquote_c_style(&rest[open..])?
    } else {
        let idx = rest.rfind(" b/")?;
        rest[idx + 1..].to_string()
    };
    destination.strip_prefix("b/").map(str::to_string)
}

fn find_last_quoted_token_start(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut idx = bytes.len().checked_sub(2)?;
    loop {
        if bytes.get(idx) == Some(&b'"') {
            let mut backslashes = 0;
            while idx > backslashes && bytes.get(idx - backslashes - 1) == Some(&b'\\') {
                backslashes += 1;
            }
            if backslashes % 2 == 0 {
                return Some(idx);
            }
        }
        idx = idx.checked_sub(1)?;
    }
}

/// Decodes a git C-style quoted string, octal escapes included
pub fn unquote_c_style(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut out: Vec<u8> = Vec::with_capacity(inner.len());
    let mut bytes = inner.bytes().peekable();

    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next()? {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'"' => out.push(b'"'),
            b'\\' => out.push(b'\\'),
            d @ b'0'..=b'7' => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match bytes.peek() {
                        Some(next @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(next - b'0');
                            bytes.next();
                        }
                        _ => break,
                    }
                }
                out.push(u8::try_from(value).ok()?);
            }
            other => out.push(other),
        }
    }

    Some(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FILES: &str = "diff --git a/src/a.ts b/src/a.ts\n\
index 1111111..2222222 100644\n\
--- a/src/a.ts\n\
+++ b/src/a.ts\n\
@@ -1 +1 @@\n\
-old\n\
+new\n\
diff --git a/b.txt b/b.txt\n\
new file mode 100644\n\
--- /dev/null\n\
+++ b/b.txt\n\
@@ -0,0 +1 @@\n\
+hello\n";

    #[test]
    fn test_split_two_files() {
        let fragments = split_diff(TWO_FILES);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].path, "src/a.ts");
        assert!(fragments[0].text.starts_with("diff --git a/src/a.ts"));
        assert!(fragments[0].text.ends_with("+new\n"));
        assert_eq!(fragments[1].path, "b.txt");
        assert!(fragments[1].text.contains("+hello"));
    }

    #[test]
    fn test_lines_before_first_header_are_ignored() {
        let diff = format!("warning: something\n{TWO_FILES}");
        let fragments = split_diff(&diff);
        assert_eq!(fragments.len(), 2);
        assert!(!fragments[0].text.contains("warning"));
    }

    #[test]
    fn test_diff_lines_that_look_like_headers_do_not_split() {
        let diff = "diff --git a/x.md b/x.md\n\
--- a/x.md\n\
+++ b/x.md\n\
@@ -1 +1 @@\n\
- diff --git a/y b/y\n\
+diff --git is mentioned here\n";
        let fragments = split_diff(diff);
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].text.contains("+diff --git is mentioned here"));
    }

    #[test]
    fn test_empty_diff() {
        assert!(split_diff("").is_empty());
    }

    #[test]
    fn test_header_with_spaces_in_path() {
        assert_eq!(
            parse_header_destination("a/docs/my notes.md b/docs/my notes.md").as_deref(),
            Some("docs/my notes.md")
        );
        // A path that itself contains " b/" is still recovered by symmetry
        assert_eq!(
            parse_header_destination("a/x b/y.txt b/x b/y.txt").as_deref(),
            Some("x b/y.txt")
        );
    }

    #[test]
    fn test_header_rename_takes_destination() {
        assert_eq!(
            parse_header_destination("a/old/name.rs b/new/name.rs").as_deref(),
            Some("new/name.rs")
        );
    }

    #[test]
    fn test_header_with_non_ascii_path() {
        assert_eq!(
            parse_header_destination("a/café.txt b/café.txt").as_deref(),
            Some("café.txt")
        );
        assert_eq!(
            parse_header_destination("\"a/caf\\303\\251.txt\" \"b/caf\\303\\251.txt\"").as_deref(),
            Some("café.txt")
        );
    }

    #[test]
    fn test_header_with_quoted_escapes() {
        assert_eq!(
            parse_header_destination("\"a/tab\\there\" \"b/tab\\there\"").as_deref(),
            Some("tab\there")
        );
        assert_eq!(
            parse_header_destination("\"a/say \\\"hi\\\"\" \"b/say \\\"hi\\\"\"").as_deref(),
            Some("say \"hi\"")
        );
    }

    #[test]
    fn test_index_keeps_first_fragment_per_path() {
        let index = index_fragments(TWO_FILES);
        assert_eq!(index.len(), 2);
        assert!(index.contains_key("src/a.ts"));
        assert!(index.contains_key("b.txt"));
    }
}
