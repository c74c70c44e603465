use sha1::{Digest, Sha1};

use crate::models::{FileDiff, FileOperation, FileStats, ProcessedDiff};

const FILE_HEADER: &str = "diff --git ";

/// Anchor id for a file, stable for a given path.
pub fn file_id(path: &str) -> String {
    let digest = format!("{:x}", Sha1::digest(path.as_bytes()));
    format!("C--{}", &digest[..12])
}

/// Yields the text of each file section, headers included.
struct FileChunks<'a> {
    text: &'a str,
    lines: std::iter::Peekable<std::str::SplitInclusive<'a, char>>,
    pos: usize,
}

impl<'a> FileChunks<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            lines: text.split_inclusive('\n').peekable(),
            pos: 0,
        }
    }
}

impl<'a> Iterator for FileChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        // anything before the first file header is not part of a file
        loop {
            let line = self.lines.peek()?;
            if line.starts_with(FILE_HEADER) {
                break;
            }
            self.pos += line.len();
            self.lines.next();
        }

        let start = self.pos;
        while let Some(line) = self.lines.next() {
            self.pos += line.len();
            if self.lines.peek().is_some_and(|next| next.starts_with(FILE_HEADER)) {
                break;
            }
        }
        Some(&self.text[start..self.pos])
    }
}

/// Splits diff text into files, stopping once `limit` bytes would be exceeded.
///
/// The file that crosses the limit is dropped and `truncated` is set; files
/// before it are kept whole. `None` disables the limit.
pub fn process_diff(text: &str, limit: Option<usize>) -> ProcessedDiff {
    let mut files = Vec::new();
    let mut size = 0usize;
    let mut truncated = false;

    for chunk in FileChunks::new(text) {
        size += chunk.len();
        if let Some(limit) = limit.filter(|&limit| size > limit) {
            log::info!(
                "diff exceeds {} bytes, truncated after {} files",
                limit,
                files.len()
            );
            truncated = true;
            break;
        }
        files.push(parse_file(chunk));
    }

    ProcessedDiff { files, truncated }
}

/// Decodes a C-quoted path such as `"na\303\257ve.txt"`; unquoted paths pass through.
fn unquote(path: &str) -> String {
    let Some(inner) = path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) else {
        return path.to_string();
    };

    let raw = inner.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 == raw.len() {
            bytes.push(raw[i]);
            i += 1;
            continue;
        }
        let escaped = raw[i + 1];
        i += 2;
        match escaped {
            b'0'..=b'7' => {
                let mut value = u32::from(escaped - b'0');
                let mut digits = 1;
                while digits < 3 && i < raw.len() && matches!(raw[i], b'0'..=b'7') {
                    value = value * 8 + u32::from(raw[i] - b'0');
                    i += 1;
                    digits += 1;
                }
                bytes.push((value & 0xff) as u8);
            }
            b'a' => bytes.push(0x07),
            b'b' => bytes.push(0x08),
            b't' => bytes.push(b'\t'),
            b'n' => bytes.push(b'\n'),
            b'v' => bytes.push(0x0b),
            b'f' => bytes.push(0x0c),
            b'r' => bytes.push(b'\r'),
            other => bytes.push(other),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Strips the `a/` / `b/` prefix (and quoting) from a `---`/`+++` path.
fn strip_side(path: &str) -> Option<String> {
    let path = path.trim_end_matches(['\n', '\r']);
    let path = path.split('\t').next().unwrap_or(path);
    if path == "/dev/null" {
        return None;
    }
    let path = unquote(path);
    let path = path
        .strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path.as_str());
    Some(path.to_string())
}

/// Splits a leading quoted token off `s`, honouring backslash escapes.
fn split_quoted(s: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some((&s[..=i], &s[i + 1..])),
            _ => escaped = false,
        }
    }
    None
}

/// Best-effort paths from `diff --git a/x b/y`, used when no other header names them.
///
/// Either half may be C-quoted.
fn header_paths(line: &str) -> (Option<String>, Option<String>) {
    let rest = line[FILE_HEADER.len()..].trim_end_matches(['\n', '\r']);
    let halves = if rest.starts_with('"') {
        split_quoted(rest).map(|(old, new)| (old, new.trim_start()))
    } else {
        rest.find(" \"b/")
            .or_else(|| rest.find(" b/"))
            .map(|at| (&rest[..at], &rest[at + 1..]))
    };
    match halves {
        Some((old, new)) => (strip_side(old), strip_side(new)),
        None => (None, None),
    }
}

fn parse_file(chunk: &str) -> FileDiff {
    let mut lines = chunk.split_inclusive('\n');
    let (header_old, header_new) = lines.next().map(header_paths).unwrap_or((None, None));

    let mut operation = FileOperation::Modified;
    let mut old_path: Option<String> = None;
    let mut new_path: Option<String> = None;
    let mut binary = false;
    let mut in_hunk = false;
    let mut added = 0u32;
    let mut deleted = 0u32;

    for line in lines {
        if in_hunk {
            if line.starts_with('+') {
                added += 1;
            } else if line.starts_with('-') {
                deleted += 1;
            }
            continue;
        }

        let content = line.trim_end_matches(['\n', '\r']);
        if line.starts_with("@@") {
            in_hunk = true;
        } else if content.starts_with("new file mode") {
            operation = FileOperation::Added;
        } else if content.starts_with("deleted file mode") {
            operation = FileOperation::Deleted;
        } else if let Some(path) = content.strip_prefix("rename from ") {
            operation = FileOperation::Renamed;
            old_path = Some(unquote(path));
        } else if let Some(path) = content.strip_prefix("rename to ") {
            operation = FileOperation::Renamed;
            new_path = Some(unquote(path));
        } else if let Some(path) = content.strip_prefix("copy from ") {
            operation = FileOperation::Copied;
            old_path = Some(unquote(path));
        } else if let Some(path) = content.strip_prefix("copy to ") {
            operation = FileOperation::Copied;
            new_path = Some(unquote(path));
        } else if let Some(path) = content.strip_prefix("--- ") {
            old_path = old_path.or_else(|| strip_side(path));
        } else if let Some(path) = content.strip_prefix("+++ ") {
            new_path = new_path.or_else(|| strip_side(path));
        } else if content.starts_with("Binary files")
            || (content.starts_with("Binary file ") && content.ends_with("has changed"))
            || content == "GIT binary patch"
        {
            binary = true;
        }
    }

    let old_path = old_path.or(header_old);
    let new_path = new_path.or(header_new);
    let path = match operation {
        FileOperation::Deleted => old_path.clone().or(new_path),
        _ => new_path.or_else(|| old_path.clone()),
    }
    .unwrap_or_default();
    let old_path = match operation {
        FileOperation::Renamed | FileOperation::Copied => old_path,
        _ => None,
    };

    let stats = if binary {
        FileStats {
            added: 0,
            deleted: 0,
            binary: true,
        }
    } else {
        FileStats {
            added,
            deleted,
            binary: false,
        }
    };

    FileDiff {
        id: file_id(&path),
        operation,
        old_path,
        path,
        stats,
        diff: chunk.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODIFIED: &str = "diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,3 @@
 fn a() {}
-fn b() {}
+fn c() {}
 fn d() {}
";

    const ADDED: &str = "diff --git a/new.txt b/new.txt
new file mode 100644
index 0000000..3333333
--- /dev/null
+++ b/new.txt
@@ -0,0 +1,2 @@
+one
+two
";

    const DELETED: &str = "diff --git a/gone.txt b/gone.txt
deleted file mode 100644
index 4444444..0000000
--- a/gone.txt
+++ /dev/null
@@ -1 +0,0 @@
-bye
\\ No newline at end of file
";

    const RENAMED: &str = "diff --git a/old name.txt b/new name.txt
similarity index 100%
rename from old name.txt
rename to new name.txt
";

    const BINARY_GIT: &str = "diff --git a/logo.png b/logo.png
index 5555555..6666666 100644
Binary files a/logo.png and b/logo.png differ
";

    const BINARY_HG: &str = "diff --git a/data.bin b/data.bin
Binary file data.bin has changed
";

    #[test]
    fn parses_operations_and_paths() {
        let text = [MODIFIED, ADDED, DELETED, RENAMED].concat();
        let result = process_diff(&text, None);

        assert!(!result.truncated);
        let files = result.files;
        assert_eq!(files.len(), 4);

        assert_eq!(files[0].operation, FileOperation::Modified);
        assert_eq!(files[0].path, "src/lib.rs");
        assert_eq!(files[0].old_path, None);
        assert_eq!((files[0].stats.added, files[0].stats.deleted), (1, 1));
        assert_eq!(files[0].diff, MODIFIED);

        assert_eq!(files[1].operation, FileOperation::Added);
        assert_eq!(files[1].path, "new.txt");
        assert_eq!((files[1].stats.added, files[1].stats.deleted), (2, 0));

        assert_eq!(files[2].operation, FileOperation::Deleted);
        assert_eq!(files[2].path, "gone.txt");
        assert_eq!((files[2].stats.added, files[2].stats.deleted), (0, 1));

        assert_eq!(files[3].operation, FileOperation::Renamed);
        assert_eq!(files[3].old_path.as_deref(), Some("old name.txt"));
        assert_eq!(files[3].path, "new name.txt");
        assert_eq!((files[3].stats.added, files[3].stats.deleted), (0, 0));
    }

    #[test]
    fn hunk_lines_resembling_headers_are_counted() {
        let text = "diff --git a/a.md b/a.md
--- a/a.md
+++ b/a.md
@@ -1,2 +1,2 @@
---- old rule
++++ new rule
 text
";
        let files = process_diff(text, None).files;
        assert_eq!(files[0].path, "a.md");
        assert_eq!((files[0].stats.added, files[0].stats.deleted), (1, 1));
    }

    #[test]
    fn binary_files_have_no_line_counts() {
        let text = [BINARY_GIT, BINARY_HG].concat();
        let files = process_diff(&text, None).files;

        assert_eq!(files.len(), 2);
        for file in &files {
            assert!(file.stats.binary);
            assert_eq!(file.stats.added, 0);
            assert_eq!(file.stats.deleted, 0);
        }
        assert_eq!(files[1].path, "data.bin");
    }

    #[test]
    fn preamble_is_ignored() {
        let text = format!("some banner\n{MODIFIED}");
        let files = process_diff(&text, None).files;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].diff, MODIFIED);
    }

    #[test]
    fn empty_diff() {
        let result = process_diff("", Some(10));
        assert!(result.files.is_empty());
        assert!(!result.truncated);
    }

    #[test]
    fn truncates_at_limit() {
        let limit = MODIFIED.len() + ADDED.len();
        let text = [MODIFIED, ADDED, DELETED].concat();

        let result = process_diff(&text, Some(limit));
        assert!(result.truncated);
        assert_eq!(result.files.len(), 2);

        let result = process_diff(&text, Some(limit - 1));
        assert!(result.truncated);
        assert_eq!(result.files.len(), 1);

        let result = process_diff(&text, None);
        assert!(!result.truncated);
        assert_eq!(result.files.len(), 3);
    }

    #[test]
    fn large_diff_is_bounded() {
        let mut text = String::new();
        for i in 0..500 {
            text.push_str(&format!(
                "diff --git a/f{i}.txt b/f{i}.txt\n--- a/f{i}.txt\n+++ b/f{i}.txt\n@@ -1,100 +1,100 @@\n"
            ));
            for j in 0..100 {
                text.push_str(&format!("-old line {j}\n+new line {j}\n"));
            }
        }

        let limited = process_diff(&text, Some(10_000));
        assert!(limited.truncated);
        let kept: usize = limited.files.iter().map(|f| f.diff.len()).sum();
        assert!(kept <= 10_000);

        let full = process_diff(&text, None);
        assert!(!full.truncated);
        assert_eq!(full.files.len(), 500);
    }

    const QUOTED_TEXT: &str = r#"diff --git "a/na\303\257ve.txt" "b/na\303\257ve.txt"
new file mode 100644
index 0000000..7777777
--- /dev/null
+++ "b/na\303\257ve.txt"
@@ -0,0 +1 @@
+hello
"#;

    const QUOTED_BINARY: &str = r#"diff --git "a/bild-\303\274.bin" "b/bild-\303\274.bin"
new file mode 100644
index 0000000..8888888
Binary files /dev/null and "b/bild-\303\274.bin" differ
"#;

    const QUOTED_BINARY_2: &str = r#"diff --git "a/m\303\274ll.bin" "b/m\303\274ll.bin"
new file mode 100644
index 0000000..9999999
Binary files /dev/null and "b/m\303\274ll.bin" differ
"#;

    #[test]
    fn unquote_decodes_escapes() {
        assert_eq!(unquote(r#""na\303\257ve.txt""#), "naïve.txt");
        assert_eq!(unquote(r#""tab\there \"q\" back\\slash""#), "tab\there \"q\" back\\slash");
        assert_eq!(unquote("plain name.txt"), "plain name.txt");
    }

    #[test]
    fn quoted_text_header() {
        let files = process_diff(QUOTED_TEXT, None).files;

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].operation, FileOperation::Added);
        assert_eq!(files[0].path, "naïve.txt");
        assert_eq!(files[0].id, file_id("naïve.txt"));
        assert_eq!(files[0].stats.added, 1);
    }

    #[test]
    fn quoted_binary_header() {
        let files = process_diff(QUOTED_BINARY, None).files;

        assert_eq!(files.len(), 1);
        assert!(files[0].stats.binary);
        assert_eq!(files[0].path, "bild-ü.bin");
        assert_eq!(files[0].id, file_id("bild-ü.bin"));
    }

    #[test]
    fn quoted_binaries_get_distinct_ids() {
        let text = [QUOTED_BINARY, QUOTED_BINARY_2].concat();
        let files = process_diff(&text, None).files;

        assert_eq!(files.len(), 2);
        assert_eq!(files[1].path, "müll.bin");
        assert_ne!(files[0].id, files[1].id);
        assert_ne!(files[0].id, file_id(""));
    }

    #[test]
    fn rename_to_quoted_path() {
        let text = r#"diff --git a/plain.txt "b/na\303\257ve.txt"
similarity index 100%
rename from plain.txt
rename to "na\303\257ve.txt"
"#;
        let files = process_diff(text, None).files;

        assert_eq!(files[0].operation, FileOperation::Renamed);
        assert_eq!(files[0].old_path.as_deref(), Some("plain.txt"));
        assert_eq!(files[0].path, "naïve.txt");
        assert_eq!(
            header_paths(text.lines().next().unwrap()),
            (Some("plain.txt".to_string()), Some("naïve.txt".to_string()))
        );
    }

    #[test]
    fn file_ids_are_stable() {
        let id = file_id("src/lib.rs");
        assert!(id.starts_with("C--"));
        assert_eq!(id.len(), 15);
        assert_eq!(id, file_id("src/lib.rs"));
        assert_ne!(id, file_id("src/main.rs"));
        // sha1("") = da39a3ee5e6b4b0d3255bfef95601890afd80709
        assert_eq!(file_id(""), "C--da39a3ee5e6b");
    }
}
