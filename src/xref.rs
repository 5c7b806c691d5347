use crate::allowlist::AllowList;
use crate::extractor::CodeBlock;
use crate::finding::{Finding, FindingKind};
use crate::language::Syntax;
use crate::syntax::Symbols;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

/// A block that parsed, with the symbols it contributes.
#[derive(Debug)]
pub struct AnalyzedBlock<'a> {
    /// Index of the block within its document
    pub index: usize,
    pub block: &'a CodeBlock,
    pub syntax: Syntax,
    pub symbols: Symbols,
}

struct Declaration {
    block: usize,
    line: usize,
}

/// Checks symbol declarations and uses across all blocks of one document.
///
/// Symbols are keyed by syntax, so a Rust `Config` and a C# `Config` are
/// different names. The first declaration wins; later ones are reported as
/// duplicates. A reference is undefined when no block of the document
/// declares or binds it and the allow-list does not permit it, regardless
/// of block order.
pub fn check_references(
    path: &Arc<PathBuf>,
    blocks: &[AnalyzedBlock<'_>],
    allow: &AllowList,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut declared: BTreeMap<(Syntax, &str), Declaration> = BTreeMap::new();
    let mut bound: BTreeSet<(Syntax, &str)> = BTreeSet::new();

    for analyzed in blocks {
        for site in &analyzed.symbols.declarations {
            let line = analyzed.block.document_line(site.line);
            match declared.get(&(analyzed.syntax, site.name.as_str())) {
                Some(first) => findings.push(Finding::new(
                    FindingKind::DuplicateSymbol,
                    Arc::clone(path),
                    line,
                    Some(analyzed.index),
                    format!(
                        "`{}` is already declared at line {} (block #{})",
                        site.name, first.line, first.block
                    ),
                )),
                None => {
                    declared.insert(
                        (analyzed.syntax, site.name.as_str()),
                        Declaration {
                            block: analyzed.index,
                            line,
                        },
                    );
                }
            }
        }

        for name in &analyzed.symbols.bindings {
            bound.insert((analyzed.syntax, name.as_str()));
        }
    }

    for analyzed in blocks {
        let mut reported: BTreeSet<(&str, usize)> = BTreeSet::new();

        for site in &analyzed.symbols.references {
            let key = (analyzed.syntax, site.name.as_str());
            if declared.contains_key(&key)
                || bound.contains(&key)
                || allow.permits(analyzed.syntax, &site.name)
            {
                continue;
            }

            let line = analyzed.block.document_line(site.line);
            if !reported.insert((site.name.as_str(), line)) {
                continue;
            }

            log::debug!("Undefined reference `{}` at line {}", site.name, line);
            findings.push(Finding::new(
                FindingKind::UndefinedReference,
                Arc::clone(path),
                line,
                Some(analyzed.index),
                format!("`{}` is not defined in this document", site.name),
            ));
        }
    }

    findings
}
