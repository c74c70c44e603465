use two_face::re_exports::syntect::parsing::SyntaxReference;

use crate::models::{DiffHunk, DiffLine, DiffLineType, FileDiff, HighlightToken, RenderedFile};
use crate::services::highlight::{self, HighlightService};
use crate::services::word_diff::{Block, ByteRange, SideLine, compute_word_diff};

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

#[derive(Debug)]
struct RawLine<'a> {
    line_type: DiffLineType,
    old_lineno: Option<u32>,
    new_lineno: Option<u32>,
    /// Text after the origin character, newline included
    content: &'a str,
}

#[derive(Debug)]
struct RawHunk<'a> {
    old_start: u32,
    old_lines: u32,
    new_start: u32,
    new_lines: u32,
    header: &'a str,
    lines: Vec<RawLine<'a>>,
}

impl RawHunk<'_> {
    fn blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut block = Block::default();

        for line in &self.lines {
            match (line.line_type, line.old_lineno, line.new_lineno) {
                (DiffLineType::Context, _, _) => {
                    if !block.is_empty() {
                        blocks.push(std::mem::take(&mut block));
                    }
                }
                (DiffLineType::Deletion, Some(lineno), _) => block.old_lines.push(SideLine {
                    lineno,
                    content: line.content.to_string(),
                }),
                (DiffLineType::Addition, _, Some(lineno)) => block.new_lines.push(SideLine {
                    lineno,
                    content: line.content.to_string(),
                }),
                _ => {}
            }
        }

        if !block.is_empty() {
            blocks.push(block);
        }
        blocks
    }
}

/// Parses `-a,b` / `+c,d`; a missing count means one line.
fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Parses `@@ -a,b +c,d @@ section`.
fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let rest = line.strip_prefix("@@ ")?;
    let (ranges, _section) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(' ')?;
    let (old_start, old_lines) = parse_range(old.strip_prefix('-')?)?;
    let (new_start, new_lines) = parse_range(new.strip_prefix('+')?)?;
    Some((old_start, old_lines, new_start, new_lines))
}

fn parse_hunks(diff: &str) -> Vec<RawHunk<'_>> {
    let mut hunks: Vec<RawHunk> = Vec::new();
    let mut old_lineno = 0u32;
    let mut new_lineno = 0u32;

    for line in diff.split_inclusive('\n') {
        if line.starts_with("@@") {
            let Some((old_start, old_lines, new_start, new_lines)) = parse_hunk_header(line)
            else {
                log::warn!("Skipping malformed hunk header: {}", line.trim_end());
                continue;
            };
            old_lineno = old_start;
            new_lineno = new_start;
            hunks.push(RawHunk {
                old_start,
                old_lines,
                new_start,
                new_lines,
                header: line.trim_end_matches(['\n', '\r']),
                lines: Vec::new(),
            });
            continue;
        }

        // file headers before the first hunk
        let Some(hunk) = hunks.last_mut() else {
            continue;
        };

        let raw = match line.chars().next() {
            Some(' ') => {
                let raw = RawLine {
                    line_type: DiffLineType::Context,
                    old_lineno: Some(old_lineno),
                    new_lineno: Some(new_lineno),
                    content: &line[1..],
                };
                old_lineno += 1;
                new_lineno += 1;
                raw
            }
            Some('-') => {
                let raw = RawLine {
                    line_type: DiffLineType::Deletion,
                    old_lineno: Some(old_lineno),
                    new_lineno: None,
                    content: &line[1..],
                };
                old_lineno += 1;
                raw
            }
            Some('+') => {
                let raw = RawLine {
                    line_type: DiffLineType::Addition,
                    old_lineno: None,
                    new_lineno: Some(new_lineno),
                    content: &line[1..],
                };
                new_lineno += 1;
                raw
            }
            Some('\\') => {
                let line_type = match hunk.lines.last().map(|l| l.line_type) {
                    Some(DiffLineType::Addition) => DiffLineType::AddEofnl,
                    Some(DiffLineType::Deletion) => DiffLineType::DelEofnl,
                    _ => continue,
                };
                RawLine {
                    line_type,
                    old_lineno: None,
                    new_lineno: None,
                    content: NO_NEWLINE_MARKER,
                }
            }
            _ => continue,
        };
        hunk.lines.push(raw);
    }

    hunks
}

fn render_hunk(hunk: &RawHunk, syntax: &SyntaxReference) -> DiffHunk {
    let word_diff = compute_word_diff(&hunk.blocks());

    let highlight_service = HighlightService::global();
    let mut old_state = highlight_service.parse_and_highlight(syntax);
    let mut new_state = highlight_service.parse_and_highlight(syntax);

    let mut lines = Vec::with_capacity(hunk.lines.len());

    for line in &hunk.lines {
        let rendered = match line.line_type {
            DiffLineType::Context => {
                let _ = old_state.highlight_line(line.content);
                let tokens = new_state.highlight_line(line.content);
                DiffLine {
                    line_type: DiffLineType::Context,
                    old_lineno: line.old_lineno,
                    new_lineno: line.new_lineno,
                    tokens: merge_same_color_tokens(apply_change_ranges_to_tokens(tokens, None)),
                }
            }
            DiffLineType::Deletion => {
                let tokens = old_state.highlight_line(line.content);
                let info = line.old_lineno.and_then(|n| word_diff.deletions.get(&n));
                let ranges = info.map(|(_paired, ranges)| ranges.as_slice());
                DiffLine {
                    line_type: DiffLineType::Deletion,
                    old_lineno: line.old_lineno,
                    new_lineno: info.map(|(paired, _)| *paired),
                    tokens: merge_same_color_tokens(apply_change_ranges_to_tokens(tokens, ranges)),
                }
            }
            DiffLineType::Addition => {
                let tokens = new_state.highlight_line(line.content);
                let info = line.new_lineno.and_then(|n| word_diff.insertions.get(&n));
                let ranges = info.map(|(_paired, ranges)| ranges.as_slice());
                DiffLine {
                    line_type: DiffLineType::Addition,
                    old_lineno: info.map(|(paired, _)| *paired),
                    new_lineno: line.new_lineno,
                    tokens: merge_same_color_tokens(apply_change_ranges_to_tokens(tokens, ranges)),
                }
            }
            DiffLineType::AddEofnl | DiffLineType::DelEofnl => DiffLine {
                line_type: line.line_type,
                old_lineno: None,
                new_lineno: None,
                tokens: vec![HighlightToken {
                    content: line.content.to_string(),
                    color: None,
                    changed: false,
                }],
            },
        };
        lines.push(rendered);
    }

    DiffHunk {
        old_start: hunk.old_start,
        old_lines: hunk.old_lines,
        new_start: hunk.new_start,
        new_lines: hunk.new_lines,
        header: hunk.header.to_string(),
        lines,
    }
}

/// Renders one file's diff into highlighted hunks.
///
/// Binary files render with no hunks.
pub fn render_file(file: &FileDiff) -> RenderedFile {
    let hunks = if file.stats.binary {
        Vec::new()
    } else {
        let highlight_service = HighlightService::global();
        let syntax = highlight_service
            .detect_syntax(&file.path)
            .or_else(|| {
                file.old_path
                    .as_deref()
                    .and_then(|path| highlight_service.detect_syntax(path))
            })
            .unwrap_or_else(|| highlight_service.default_syntax());

        parse_hunks(&file.diff)
            .iter()
            .map(|hunk| render_hunk(hunk, syntax))
            .collect()
    };

    RenderedFile {
        id: file.id.clone(),
        path: file.path.clone(),
        binary: file.stats.binary,
        hunks,
    }
}

fn merge_same_color_tokens(tokens: Vec<HighlightToken>) -> Vec<HighlightToken> {
    let mut merged: Vec<HighlightToken> = Vec::new();

    for token in tokens {
        if let Some(last) = merged.last_mut() {
            if last.color == token.color && last.changed == token.changed {
                last.content.push_str(&token.content);
                continue;
            }
        }
        merged.push(token);
    }

    merged
}

/// Splits highlight tokens at change-range boundaries and flags the changed parts.
fn apply_change_ranges_to_tokens(
    tokens: Vec<highlight::Token>,
    change_ranges: Option<&[ByteRange]>,
) -> Vec<HighlightToken> {
    let Some(ranges) = change_ranges.filter(|ranges| !ranges.is_empty()) else {
        return tokens
            .into_iter()
            .map(|t| HighlightToken {
                content: t.content,
                color: t.color,
                changed: false,
            })
            .collect();
    };

    let mut result = Vec::with_capacity(tokens.len());
    let mut pos = 0usize;

    for token in tokens {
        let token_start = pos;
        let token_end = pos + token.content.len();
        let mut current = token_start;

        while current < token_end {
            let next = next_boundary(current, token_end, ranges);
            let slice = &token.content[current - token_start..next - token_start];
            if !slice.is_empty() {
                result.push(HighlightToken {
                    content: slice.to_string(),
                    color: token.color.clone(),
                    changed: ranges.iter().any(|&(s, e)| current >= s && current < e),
                });
            }
            current = next;
        }

        pos = token_end;
    }

    result
}

/// First range start or end after `pos`, capped at `limit`.
fn next_boundary(pos: usize, limit: usize, ranges: &[ByteRange]) -> usize {
    ranges
        .iter()
        .flat_map(|&(start, end)| [start, end])
        .filter(|&b| b > pos && b < limit)
        .min()
        .unwrap_or(limit)
}
