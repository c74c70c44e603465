use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperation {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub added: u32,
    pub deleted: u32,
    /// Binary files always report zero added/deleted lines.
    pub binary: bool,
}

/// One file's section of a parsed diff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    /// Stable identifier derived from the path, usable as an anchor.
    pub id: String,
    pub operation: FileOperation,
    /// Source path for renames and copies
    pub old_path: Option<String>,
    /// Path on the new side, or the removed path for deletions
    pub path: String,
    pub stats: FileStats,
    /// Raw git-style diff text for this file, headers included
    pub diff: String,
}

/// Files parsed from a diff, possibly cut short by the size limit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDiff {
    pub files: Vec<FileDiff>,
    pub truncated: bool,
}

/// A file diff rendered for display.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedFile {
    pub id: String,
    pub path: String,
    pub binary: bool,
    pub hunks: Vec<DiffHunk>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub header: String,
    pub lines: Vec<DiffLine>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    pub line_type: DiffLineType,
    pub old_lineno: Option<u32>,
    pub new_lineno: Option<u32>,
    pub tokens: Vec<HighlightToken>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightToken {
    /// The text content of this token
    pub content: String,
    /// CSS hex color (e.g., "#cf222e"), None for default foreground
    pub color: Option<String>,
    /// True if this token is part of a word-level change
    pub changed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineType {
    Context,
    Addition,
    Deletion,
    AddEofnl,
    DelEofnl,
}
