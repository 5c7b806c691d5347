//! snippet-check library
//!
//! Lints the fenced code blocks of Markdown documents. Each block is parsed
//! according to its language tag, and the symbols the blocks declare and use
//! are cross-checked within each document, so that a reader copying the
//! snippets in order ends up with code that hangs together.
//!
//! ## Public API
//!
//! - [`check_paths`] - Check files and directory trees and build a [`Report`]
//! - [`Checker`] - Run every check against a single document
//! - [`SnippetCheckPreprocessor`] - The same checks as an mdBook preprocessor
//! - [`CheckConfig`] - Configuration from `snippet-check.toml` or `book.toml`

mod allowlist;
mod checker;
mod config;
mod discovery;
mod document;
mod extractor;
mod finding;
mod language;
mod preprocessor;
mod reporting;
mod syntax;
mod validator;
mod xref;

pub use allowlist::AllowList;
pub use checker::{check_paths, check_sources, Checker, DocumentOutcome};
pub use config::{CheckConfig, LanguageConfig, LOCAL_CONFIG_FILE};
pub use discovery::discover_documents;
pub use document::Document;
pub use extractor::{extract_code_blocks, CodeBlock, Extraction, MalformedFence};
pub use finding::{Finding, FindingKind, Severity};
pub use language::{get_default_fence_markers, Syntax, BUILTIN_LANGUAGES};
pub use preprocessor::SnippetCheckPreprocessor;
pub use reporting::Report;
