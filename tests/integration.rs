//! Integration tests for snippet-check
//!
//! These tests run the checker end to end against fixtures copied into
//! isolated temporary directories.
//!
//! ## Test Architecture
//!
//! - `tests/fixtures/docs` is a tree of loose Markdown documents
//! - `tests/fixtures/valid_book` and `tests/fixtures/error_book` are mdBooks
//!   for the preprocessor mode
//!
//! ## Adding New Tests
//!
//! 1. Create a new fixture in tests/fixtures/ if needed
//! 2. Use `TestFixture::new("tests/fixtures/<name>")`
//! 3. Use `#[tokio::test]` for async tests

mod common;

use anyhow::Result;
use common::{PreprocessorTest, TestFixture};
use mdbook::preprocess::Preprocessor;
use snippet_check::{check_paths, CheckConfig, FindingKind, Severity, SnippetCheckPreprocessor};
use std::io::Write;
use std::process::{Command, Stdio};

// ===== Directory mode =====

#[tokio::test]
async fn integration_findings_across_documents() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/docs")?;

    let report = check_paths(&[fixture.path().to_path_buf()], CheckConfig::default()).await?;

    let summary: Vec<_> = report
        .findings()
        .iter()
        .map(|f| {
            let name = f.path().strip_prefix(fixture.path()).unwrap().to_path_buf();
            (name.display().to_string(), f.kind())
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("duplicate.md".to_string(), FindingKind::DuplicateSymbol),
            ("malformed.md".to_string(), FindingKind::SyntaxError),
            ("malformed.md".to_string(), FindingKind::MalformedBlock),
            ("undefined.md".to_string(), FindingKind::UndefinedReference),
        ]
    );

    assert_eq!(report.documents(), 5);
    assert_eq!(report.blocks().get("rust"), Some(&4));
    assert_eq!(report.blocks().get("csharp"), Some(&2));
    assert_eq!(report.blocks().get("toml"), Some(&1));
    assert_eq!(report.error_count(), 3);
    assert_eq!(report.warning_count(), 1);
    assert_eq!(report.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn integration_undefined_reference_line() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/docs")?;

    let report = check_paths(&[fixture.join("undefined.md")], CheckConfig::default()).await?;

    assert_eq!(report.findings().len(), 1);
    let finding = &report.findings()[0];
    assert_eq!(finding.kind(), FindingKind::UndefinedReference);
    assert_eq!(finding.line(), 12);
    assert_eq!(finding.block(), Some(1));
    assert!(finding.message().contains("RetryPolicy"));
    Ok(())
}

#[tokio::test]
async fn integration_duplicate_symbol_passes() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/docs")?;

    let report = check_paths(&[fixture.join("duplicate.md")], CheckConfig::default()).await?;

    assert_eq!(report.findings().len(), 1);
    assert_eq!(report.findings()[0].severity(), Severity::Warning);
    assert_eq!(report.findings()[0].line(), 8);
    assert_eq!(report.exit_code(), 0);
    Ok(())
}

#[tokio::test]
async fn integration_malformed_fence_reported_once() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/docs")?;

    let report = check_paths(&[fixture.join("malformed.md")], CheckConfig::default()).await?;

    let malformed: Vec<_> = report
        .findings()
        .iter()
        .filter(|f| f.kind() == FindingKind::MalformedBlock)
        .collect();
    assert_eq!(malformed.len(), 1);
    assert_eq!(malformed[0].line(), 7);
    Ok(())
}

#[tokio::test]
async fn integration_allow_list_file() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/docs")?;
    std::fs::write(fixture.join("symbols.txt"), "# vendor types\nRetryPolicy\n")?;

    let config = CheckConfig {
        allow_list: Some(fixture.join("symbols.txt")),
        ..CheckConfig::default()
    };
    let report = check_paths(&[fixture.join("undefined.md")], config).await?;

    assert!(report.findings().is_empty());
    Ok(())
}

#[tokio::test]
async fn integration_reruns_are_identical() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/docs")?;
    let paths = [fixture.path().to_path_buf()];

    let first = check_paths(&paths, CheckConfig::default()).await?;
    let second = check_paths(&paths, CheckConfig::default()).await?;

    assert_eq!(first.render_text(), second.render_text());
    assert_eq!(first.render_json()?, second.render_json()?);
    Ok(())
}

#[tokio::test]
async fn integration_missing_path_is_fatal() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/docs")?;

    let result = check_paths(&[fixture.join("missing")], CheckConfig::default()).await;

    let err = result.expect_err("missing input should abort the run");
    assert!(format!("{:#}", err).contains("Failed to access input path"));
    Ok(())
}

// ===== Command line =====

fn snippet_check(fixture: &TestFixture) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_snippet-check"));
    cmd.current_dir(fixture.path())
        .env("XDG_CONFIG_HOME", fixture.join("no-user-config"));
    cmd
}

#[test]
fn integration_cli_exit_codes() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/docs")?;

    let valid = snippet_check(&fixture).arg("valid.md").output()?;
    assert_eq!(valid.status.code(), Some(0));
    assert!(valid.stdout.is_empty());

    let undefined = snippet_check(&fixture).args(["check", "undefined.md"]).output()?;
    assert_eq!(undefined.status.code(), Some(1));
    let stdout = String::from_utf8(undefined.stdout)?;
    assert!(
        stdout.starts_with("undefined.md:12:error:undefined-reference:"),
        "{}",
        stdout
    );

    let missing = snippet_check(&fixture).arg("missing.md").output()?;
    assert_eq!(missing.status.code(), Some(2));
    assert!(String::from_utf8(missing.stderr)?.contains("Error:"));
    Ok(())
}

#[test]
fn integration_cli_json_and_local_config() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/docs")?;
    std::fs::write(
        fixture.join("snippet-check.toml"),
        "allow = [\"RetryPolicy\"]\n\n[severity]\nduplicate-symbol = \"error\"\n",
    )?;

    let output = snippet_check(&fixture)
        .args(["--format", "json", "undefined.md", "duplicate.md"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["documents"], 2);
    assert_eq!(report["errors"], 1);
    assert_eq!(report["findings"][0]["kind"], "duplicate-symbol");
    assert_eq!(report["findings"][0]["severity"], "error");
    Ok(())
}

#[test]
fn integration_cli_invalid_config_is_fatal() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/docs")?;
    std::fs::write(fixture.join("broken.toml"), "[languages.cobol]\n")?;

    let output = snippet_check(&fixture)
        .args(["--config", "broken.toml", "valid.md"])
        .output()?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8(output.stderr)?.contains("Unknown language 'cobol'"));
    Ok(())
}

// ===== mdBook preprocessor =====

#[tokio::test]
async fn integration_valid_book_passes() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/valid_book")?;
    let test = PreprocessorTest::from_fixture(&fixture)?;

    let result = test.run().await;

    assert!(result.is_ok(), "Valid book should pass: {:?}", result.err());
    Ok(())
}

#[tokio::test]
async fn integration_book_is_returned_unchanged() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/valid_book")?;
    let test = PreprocessorTest::from_fixture(&fixture)?;

    let before = serde_json::to_value(&mdbook::MDBook::load(fixture.path())?.book)?;
    let after = serde_json::to_value(&test.run().await?)?;

    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn integration_book_with_undefined_reference_fails() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/error_book")?;
    let test = PreprocessorTest::from_fixture(&fixture)?;

    let result = test.run().await;

    let err = result.expect_err("undefined reference should fail the build");
    assert!(
        err.to_string().contains("Code block check failed"),
        "Unexpected error: {:#}",
        err
    );
    Ok(())
}

#[tokio::test]
async fn integration_book_allow_list_from_config() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/error_book")?;
    std::fs::write(fixture.join("symbols.txt"), "HttpClient\n")?;
    let book_toml = std::fs::read_to_string(fixture.join("book.toml"))?;
    std::fs::write(
        fixture.join("book.toml"),
        format!("{}\n[preprocessor.snippet-check]\nallow_list = \"symbols.txt\"\n", book_toml),
    )?;

    let test = PreprocessorTest::from_fixture(&fixture)?;
    let result = test.run().await;

    assert!(result.is_ok(), "Allow-listed symbol failed: {:?}", result.err());
    Ok(())
}

#[tokio::test]
async fn integration_book_config_errors() -> Result<()> {
    let fixture = TestFixture::new("tests/fixtures/valid_book")?;
    let book_toml = std::fs::read_to_string(fixture.join("book.toml"))?;
    std::fs::write(
        fixture.join("book.toml"),
        format!("{}\n[preprocessor.snippet-check.languages.cobol]\nenabled = true\n", book_toml),
    )?;

    let test = PreprocessorTest::from_fixture(&fixture)?;
    let result = test.run().await;

    let err = result.expect_err("unknown language should be rejected");
    assert!(format!("{:#}", err).contains("Unknown language"));
    Ok(())
}

/// Feeds a book to `snippet-check mdbook` as mdBook would and returns the exit code
fn run_mdbook_mode(fixture: &TestFixture) -> Result<Option<i32>> {
    let book = mdbook::MDBook::load(fixture.path())?;
    let input = serde_json::to_vec(&serde_json::json!([
        {
            "root": book.root,
            "config": book.config,
            "renderer": "html",
            "mdbook_version": mdbook::MDBOOK_VERSION,
        },
        book.book
    ]))?;

    let mut child = snippet_check(fixture)
        .arg("mdbook")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(&input)?;
    }
    Ok(child.wait()?.code())
}

#[test]
fn integration_mdbook_mode_exit_codes() -> Result<()> {
    let valid = TestFixture::new("tests/fixtures/valid_book")?;
    assert_eq!(run_mdbook_mode(&valid)?, Some(0));

    let failing = TestFixture::new("tests/fixtures/error_book")?;
    assert_eq!(run_mdbook_mode(&failing)?, Some(1));

    let misconfigured = TestFixture::new("tests/fixtures/error_book")?;
    let book_toml = std::fs::read_to_string(misconfigured.join("book.toml"))?;
    std::fs::write(
        misconfigured.join("book.toml"),
        format!("{}\n[preprocessor.snippet-check]\nallow_list = \"missing.txt\"\n", book_toml),
    )?;
    assert_eq!(run_mdbook_mode(&misconfigured)?, Some(2));
    Ok(())
}

#[test]
fn integration_supports_every_renderer() {
    let preprocessor = SnippetCheckPreprocessor::new();
    assert_eq!(preprocessor.name(), "snippet-check");
    assert!(preprocessor.supports_renderer("html"));
    assert!(preprocessor.supports_renderer("markdown"));
}
