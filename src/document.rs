use crate::extractor::{extract_code_blocks, CodeBlock};
use crate::finding::{Finding, FindingKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A markdown document and its code blocks, in source order.
///
/// Immutable once parsed. The path is shared with every finding raised
/// against the document.
#[derive(Debug, Clone)]
pub struct Document {
    path: Arc<PathBuf>,
    blocks: Vec<CodeBlock>,
}

impl Document {
    /// Extracts the blocks of `source`.
    ///
    /// Returns the document together with one `MalformedBlock` finding per
    /// fence that could not be extracted.
    pub fn parse(path: impl Into<PathBuf>, source: &str) -> (Self, Vec<Finding>) {
        let path = Arc::new(path.into());
        let extraction = extract_code_blocks(source);

        let findings = extraction
            .malformed
            .into_iter()
            .map(|fence| {
                Finding::new(
                    FindingKind::MalformedBlock,
                    Arc::clone(&path),
                    fence.line,
                    None,
                    fence.reason,
                )
            })
            .collect();

        let document = Self {
            path,
            blocks: extraction.blocks,
        };
        (document, findings)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn shared_path(&self) -> &Arc<PathBuf> {
        &self.path
    }

    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }
}
