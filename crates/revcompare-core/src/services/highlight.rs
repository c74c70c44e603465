use std::sync::OnceLock;

use two_face::re_exports::syntect::highlighting::{
    Color, HighlightIterator, HighlightState, Highlighter, Theme,
};
use two_face::re_exports::syntect::parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet};

/// A run of text sharing one foreground color.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub content: String,
    /// CSS hex color, None when the line could not be highlighted
    pub color: Option<String>,
}

pub struct HighlightService {
    syntax_set: SyntaxSet,
    theme: Theme,
}

static HIGHLIGHT_SERVICE: OnceLock<HighlightService> = OnceLock::new();

impl HighlightService {
    fn new() -> Self {
        let syntax_set = two_face::syntax::extra_newlines();
        let theme_set = two_face::theme::extra();

        // Use a theme that works well on colored backgrounds
        let theme = theme_set[two_face::theme::EmbeddedThemeName::Base16OceanDark].clone();

        Self { syntax_set, theme }
    }

    /// Shared instance; loading syntaxes and themes is slow.
    pub fn global() -> &'static HighlightService {
        HIGHLIGHT_SERVICE.get_or_init(Self::new)
    }

    /// Detects the syntax for a file path using Syntect's built-in detection.
    /// Returns None if the language is not recognized.
    pub fn detect_syntax(&self, file_path: &str) -> Option<&SyntaxReference> {
        self.syntax_set
            .find_syntax_for_file(file_path)
            .unwrap_or(None)
    }

    pub fn default_syntax(&self) -> &SyntaxReference {
        self.syntax_set.find_syntax_plain_text()
    }

    /// Starts highlighting a sequence of consecutive lines.
    pub fn parse_and_highlight<'a>(&'a self, syntax: &SyntaxReference) -> LineHighlighter<'a> {
        let highlighter = Highlighter::new(&self.theme);
        let highlight_state = HighlightState::new(&highlighter, ScopeStack::new());
        LineHighlighter {
            syntax_set: &self.syntax_set,
            highlighter,
            parse_state: ParseState::new(syntax),
            highlight_state,
        }
    }
}

/// Parser state carried from one line to the next.
pub struct LineHighlighter<'a> {
    syntax_set: &'a SyntaxSet,
    highlighter: Highlighter<'a>,
    parse_state: ParseState,
    highlight_state: HighlightState,
}

impl LineHighlighter<'_> {
    /// Highlights one line (trailing newline included, if any).
    pub fn highlight_line(&mut self, line: &str) -> Vec<Token> {
        let ops = match self.parse_state.parse_line(line, self.syntax_set) {
            Ok(ops) => ops,
            Err(e) => {
                log::warn!("failed to parse line for highlighting: {}", e);
                return vec![Token {
                    content: line.to_string(),
                    color: None,
                }];
            }
        };

        HighlightIterator::new(&mut self.highlight_state, &ops, line, &self.highlighter)
            .map(|(style, text)| Token {
                content: text.to_string(),
                color: Some(color_to_hex(style.foreground)),
            })
            .collect()
    }
}

/// Converts syntect's Color to a CSS hex color string.
fn color_to_hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}
