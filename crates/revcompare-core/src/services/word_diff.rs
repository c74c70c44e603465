//! Word-level change ranges between paired deleted and added lines.

use std::collections::BTreeMap;

use similar::{ChangeTag, TextDiff};

/// Byte range `[start, end)` within a line.
pub type ByteRange = (usize, usize);

pub struct SideLine {
    pub lineno: u32,
    pub content: String,
}

/// A run of deletions followed by additions, between two context lines.
#[derive(Default)]
pub struct Block {
    pub old_lines: Vec<SideLine>,
    pub new_lines: Vec<SideLine>,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.old_lines.is_empty() && self.new_lines.is_empty()
    }
}

/// Changed ranges keyed by line number, with the line each was paired with.
#[derive(Debug, Clone, Default)]
pub struct WordDiffResult {
    /// old line number → (paired new line number, deleted ranges)
    pub deletions: BTreeMap<u32, (u32, Vec<ByteRange>)>,
    /// new line number → (paired old line number, inserted ranges)
    pub insertions: BTreeMap<u32, (u32, Vec<ByteRange>)>,
}

/// Splits on whitespace boundaries; quotes, `:` and parentheses stand alone
/// so the text around them can still match.
fn tokenize_words(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space = false;
    for (i, c) in s.char_indices() {
        if matches!(c, '"' | '\'' | '`' | ':' | '(' | ')') {
            if i > start {
                tokens.push(&s[start..i]);
            }
            tokens.push(&s[i..i + 1]);
            start = i + 1;
            in_space = false;
            continue;
        }
        let space = c.is_whitespace();
        if i > start && space != in_space {
            tokens.push(&s[start..i]);
            start = i;
        }
        in_space = space;
    }
    if start < s.len() {
        tokens.push(&s[start..]);
    }
    tokens
}

/// Returns (deleted ranges in `old`, inserted ranges in `new`).
fn inline_ranges(old: &str, new: &str) -> (Vec<ByteRange>, Vec<ByteRange>) {
    let old_tokens = tokenize_words(old);
    let new_tokens = tokenize_words(new);
    let diff = TextDiff::from_slices(&old_tokens, &new_tokens);

    let mut deleted = Vec::new();
    let mut inserted = Vec::new();
    let (mut old_pos, mut new_pos) = (0usize, 0usize);

    for change in diff.iter_all_changes() {
        let len = change.value().len();
        match change.tag() {
            ChangeTag::Delete => {
                deleted.push((old_pos, old_pos + len));
                old_pos += len;
            }
            ChangeTag::Insert => {
                inserted.push((new_pos, new_pos + len));
                new_pos += len;
            }
            ChangeTag::Equal => {
                old_pos += len;
                new_pos += len;
            }
        }
    }

    (deleted, inserted)
}

/// Pairs the i-th deleted line with the i-th added line of each block.
/// Unpaired lines get no ranges.
pub fn compute_word_diff(blocks: &[Block]) -> WordDiffResult {
    let mut result = WordDiffResult::default();

    for block in blocks {
        for (old, new) in block.old_lines.iter().zip(&block.new_lines) {
            let (deleted, inserted) = inline_ranges(&old.content, &new.content);
            if !deleted.is_empty() {
                result.deletions.insert(old.lineno, (new.lineno, deleted));
            }
            if !inserted.is_empty() {
                result.insertions.insert(new.lineno, (old.lineno, inserted));
            }
        }
    }

    result
}
