//! Lightweight per-language parsing of code blocks.
//!
//! Each language module turns the text of one block into an [`Analysis`]:
//! an optional syntax issue plus the symbols the block declares, binds and
//! references. Lines are 1-based and relative to the block content.

pub mod delimited;
pub mod rust;
pub mod structured;

use std::collections::BTreeSet;

pub use delimited::Dialect;

/// A parse failure inside one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    /// 1-based line within the block content
    pub line: usize,
    /// 1-based column, when the parser reports one
    pub column: Option<usize>,
    pub message: String,
}

/// A named symbol at a line within the block content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSite {
    pub name: String,
    pub line: usize,
}

impl SymbolSite {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
        }
    }
}

/// Symbols seen in one block.
///
/// Declarations take part in duplicate detection. Bindings (locals,
/// parameters, imports, generics) only satisfy references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbols {
    pub declarations: Vec<SymbolSite>,
    pub bindings: BTreeSet<String>,
    pub references: Vec<SymbolSite>,
}

/// Result of analysing one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    pub issue: Option<SyntaxIssue>,
    pub symbols: Symbols,
}

impl Analysis {
    pub fn ok(symbols: Symbols) -> Self {
        Self {
            issue: None,
            symbols,
        }
    }

    /// A failed parse contributes no symbols.
    pub fn failed(issue: SyntaxIssue) -> Self {
        Self {
            issue: Some(issue),
            symbols: Symbols::default(),
        }
    }
}

/// Converts a byte offset in `text` to a 1-based (line, column) pair.
pub(crate) fn line_col_of(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = text.get(..offset).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

/// Number of lines in `text`, at least 1.
pub(crate) fn last_line(text: &str) -> usize {
    text.trim_end_matches('\n').lines().count().max(1)
}
