use crate::allowlist::AllowList;
use crate::config::CheckConfig;
use crate::discovery::discover_documents;
use crate::document::Document;
use crate::finding::Finding;
use crate::language::LanguageRegistry;
use crate::reporting::Report;
use crate::validator::{SyntaxValidator, Validation};
use crate::xref::{check_references, AnalyzedBlock};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of checking one document.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    pub findings: Vec<Finding>,
    /// Number of blocks extracted from the document
    pub blocks: usize,
    /// Blocks that were parsed, per language name
    pub checked: BTreeMap<String, usize>,
    pub duration: Duration,
}

/// Runs every check against one document at a time.
///
/// A checker holds no per-document state, so one instance can be shared
/// across worker threads.
#[derive(Debug, Clone)]
pub struct Checker {
    config: CheckConfig,
    registry: LanguageRegistry,
    allow: AllowList,
}

impl Checker {
    /// Builds the language registry and loads the allow-list.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is inconsistent or the
    /// allow-list file cannot be read.
    pub fn new(config: CheckConfig) -> Result<Self> {
        let registry = LanguageRegistry::from_config(&config)?;
        let allow = AllowList::from_config(&config)?;
        Ok(Self {
            config,
            registry,
            allow,
        })
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Extracts, validates and cross-references the blocks of `source`.
    pub fn check_source(&self, path: impl Into<PathBuf>, source: &str) -> DocumentOutcome {
        let start = Instant::now();
        let (document, mut findings) = Document::parse(path, source);
        log::info!(
            "Checking {} ({} code block(s))",
            document.path().display(),
            document.blocks().len()
        );

        let validator = SyntaxValidator::new(&self.registry);
        let mut analyzed = Vec::new();
        let mut checked: BTreeMap<String, usize> = BTreeMap::new();

        for (index, block) in document.blocks().iter().enumerate() {
            match validator.validate(document.shared_path(), index, block) {
                Validation::Skipped | Validation::UnknownLanguage => {}
                Validation::Checked {
                    language,
                    analysis,
                    finding,
                } => {
                    *checked.entry(language.name().to_string()).or_insert(0) += 1;
                    match finding {
                        Some(finding) => findings.push(finding),
                        None => analyzed.push(AnalyzedBlock {
                            index,
                            block,
                            syntax: language.syntax(),
                            symbols: analysis.symbols,
                        }),
                    }
                }
            }
        }

        findings.extend(check_references(
            document.shared_path(),
            &analyzed,
            &self.allow,
        ));

        let findings = findings
            .into_iter()
            .map(|finding| {
                let severity = self.config.severity_for(finding.kind());
                finding.with_severity(severity)
            })
            .collect();

        DocumentOutcome {
            path: document.path().to_path_buf(),
            findings,
            blocks: document.blocks().len(),
            checked,
            duration: start.elapsed(),
        }
    }
}

/// Checks documents on the blocking pool, at most one per CPU at a time.
///
/// Outcomes come back in completion order; the report sorts them.
pub async fn check_sources(
    checker: Arc<Checker>,
    sources: Vec<(PathBuf, String)>,
) -> Result<Vec<DocumentOutcome>> {
    let jobs = sources.into_iter().map(|(path, source)| {
        let checker = Arc::clone(&checker);
        tokio::task::spawn_blocking(move || checker.check_source(path, &source))
    });

    let results: Vec<_> = stream::iter(jobs)
        .buffer_unordered(num_cpus::get().max(1))
        .collect()
        .await;

    results
        .into_iter()
        .map(|result| result.context("Document check task failed"))
        .collect()
}

/// Checks every markdown document under `paths` and builds the report.
///
/// All files are read before any checking starts, so an unreadable input
/// aborts the run without a partial report.
///
/// # Errors
///
/// Returns an error if an input path is missing or unreadable, or if the
/// configuration is invalid.
pub async fn check_paths(paths: &[PathBuf], config: CheckConfig) -> Result<Report> {
    let start = Instant::now();
    let checker = Arc::new(Checker::new(config)?);
    let files = discover_documents(paths, &checker.config().extensions)?;

    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        let source = tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        sources.push((file, source));
    }

    let outcomes = check_sources(checker, sources).await?;
    Ok(Report::new(outcomes, start.elapsed()))
}
