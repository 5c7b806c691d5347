use crate::checker::{check_sources, Checker};
use crate::config::CheckConfig;
use crate::reporting::Report;
use anyhow::{Context, Result};
use mdbook::book::{Book, BookItem};
use mdbook::preprocess::{Preprocessor, PreprocessorContext};
use std::sync::Arc;
use std::time::Instant;

/// An mdBook preprocessor that checks the code blocks of every chapter.
///
/// The book is returned unchanged. The build fails when any chapter has an
/// error finding.
///
/// # Configuration
///
/// Options are read from `[preprocessor.snippet-check]` in `book.toml` and
/// use the same keys as `snippet-check.toml`.
///
/// ```toml
/// [preprocessor.snippet-check]
/// allow = ["HttpClient"]
///
/// [preprocessor.snippet-check.languages.go]
/// enabled = false
/// ```
pub struct SnippetCheckPreprocessor;

impl SnippetCheckPreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Reads `[preprocessor.snippet-check]` and builds the checker.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or the allow-list
    /// file cannot be read.
    pub fn load_checker(ctx: &PreprocessorContext) -> Result<Arc<Checker>> {
        let config = CheckConfig::from_preprocessor_context(ctx)?;
        Ok(Arc::new(Checker::new(config)?))
    }

    /// Checks every chapter of `book` and returns it untouched.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or any finding is
    /// an error.
    pub async fn run_async(&self, ctx: &PreprocessorContext, book: Book) -> Result<Book> {
        let checker = Self::load_checker(ctx)?;
        self.check_book(checker, ctx, book).await
    }

    /// Checks every chapter of `book` with an already loaded checker.
    ///
    /// # Errors
    ///
    /// Returns an error when any finding is an error.
    pub async fn check_book(
        &self,
        checker: Arc<Checker>,
        ctx: &PreprocessorContext,
        book: Book,
    ) -> Result<Book> {
        let start = Instant::now();
        let src_dir = ctx.root.join(&ctx.config.book.src);
        let mut sources = Vec::new();
        for item in book.iter() {
            if let BookItem::Chapter(chapter) = item {
                if let Some(chapter_path) = &chapter.path {
                    log::info!("Checking chapter: {}", chapter.name);
                    sources.push((src_dir.join(chapter_path), chapter.content.clone()));
                }
            }
        }

        let outcomes = check_sources(checker, sources).await?;
        let report = Report::new(outcomes, start.elapsed());

        report.print_findings();
        report.print_statistics();

        if report.has_errors() {
            anyhow::bail!(
                "Code block check failed with {} error(s)",
                report.error_count()
            );
        }

        Ok(book)
    }
}

impl Default for SnippetCheckPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor for SnippetCheckPreprocessor {
    fn name(&self) -> &str {
        "snippet-check"
    }

    fn run(&self, ctx: &PreprocessorContext, book: Book) -> Result<Book> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .context("Failed to start async runtime")?;
        runtime.block_on(self.run_async(ctx, book))
    }

    /// Checking never alters the book, so every renderer is supported.
    fn supports_renderer(&self, _renderer: &str) -> bool {
        true
    }
}
