use crate::extractor::CodeBlock;
use crate::finding::{Finding, FindingKind};
use crate::language::{ConfiguredLanguage, LanguageRegistry};
use crate::syntax::Analysis;
use std::path::PathBuf;
use std::sync::Arc;

/// Maximum size of a single code block in bytes (1MB)
pub const MAX_CODE_BLOCK_SIZE: usize = 1_000_000;

/// What the validator did with one block.
#[derive(Debug)]
pub enum Validation {
    /// Flagged `ignore`/`compile_fail`, or too large to check.
    Skipped,
    /// No enabled language claims the fence marker.
    UnknownLanguage,
    Checked {
        language: ConfiguredLanguage,
        analysis: Analysis,
        /// The `SyntaxError` finding, when the parse failed
        finding: Option<Finding>,
    },
}

/// Dispatches each block to the parser of its language.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxValidator<'a> {
    registry: &'a LanguageRegistry,
}

impl<'a> SyntaxValidator<'a> {
    pub fn new(registry: &'a LanguageRegistry) -> Self {
        Self { registry }
    }

    /// Parses one block, remapping any error to its absolute document line.
    ///
    /// Unknown languages are skipped so prose-only fences never produce
    /// false positives.
    pub fn validate(&self, path: &Arc<PathBuf>, index: usize, block: &CodeBlock) -> Validation {
        if block.skipped() {
            log::debug!("Skipping flagged block #{} in {}", index, path.display());
            return Validation::Skipped;
        }

        let Some(language) = self.registry.find_by_fence(&block.language) else {
            return Validation::UnknownLanguage;
        };

        if block.code.len() > MAX_CODE_BLOCK_SIZE {
            log::warn!(
                "Code block #{} in {} exceeds size limit of {} bytes ({} bytes), skipping",
                index,
                path.display(),
                MAX_CODE_BLOCK_SIZE,
                block.code.len()
            );
            return Validation::Skipped;
        }

        log::debug!("Checking {} block #{} in {}", language, index, path.display());
        let analysis = language.syntax().analyze(&block.code);

        let finding = analysis.issue.as_ref().map(|issue| {
            let location = match issue.column {
                Some(column) => format!(" (column {})", column),
                None => String::new(),
            };
            Finding::new(
                FindingKind::SyntaxError,
                Arc::clone(path),
                block.document_line(issue.line),
                Some(index),
                format!("{} block: {}{}", language, issue.message, location),
            )
        });

        Validation::Checked {
            language: language.clone(),
            analysis,
            finding,
        }
    }
}
