//! Common test utilities for integration tests
//!
//! Shared fixtures and helpers used across integration tests. These
//! utilities are not compiled into the library.

use anyhow::Result;
use mdbook::book::Book;
use mdbook::preprocess::CmdPreprocessor;
use mdbook::MDBook;
use snippet_check::SnippetCheckPreprocessor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated test fixture with automatic cleanup
///
/// Creates a temporary copy of a fixture directory, so tests can run in
/// parallel and may edit their copy freely.
pub struct TestFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl TestFixture {
    pub fn new(source: impl AsRef<Path>) -> Result<Self> {
        let dir = TempDir::new()?;
        copy_dir_all(source.as_ref(), dir.path())?;

        Ok(Self {
            path: dir.path().to_path_buf(),
            _dir: dir,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.path.join(relative)
    }
}

/// Runs the preprocessor the way mdBook would invoke it
pub struct PreprocessorTest {
    book: MDBook,
}

impl PreprocessorTest {
    pub fn from_fixture(fixture: &TestFixture) -> Result<Self> {
        let book = MDBook::load(fixture.path())?;
        Ok(Self { book })
    }

    pub async fn run(&self) -> Result<Book> {
        // Create JSON input like mdbook would send
        let input_json = serde_json::json!([
            {
                "root": self.book.root,
                "config": self.book.config,
                "renderer": "html",
                "mdbook_version": mdbook::MDBOOK_VERSION,
            },
            self.book.book
        ]);

        let input_str = serde_json::to_string(&input_json)?;
        let (ctx, book) = CmdPreprocessor::parse_input(input_str.as_bytes())?;

        SnippetCheckPreprocessor::new().run_async(&ctx, book).await
    }
}

/// Recursively copy all files and directories from src to dst
fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    std::fs::create_dir_all(&dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        if ty.is_dir() {
            copy_dir_all(entry.path(), dst.as_ref().join(entry.file_name()))?;
        } else {
            std::fs::copy(entry.path(), dst.as_ref().join(entry.file_name()))?;
        }
    }
    Ok(())
}
