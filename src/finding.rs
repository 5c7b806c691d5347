use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// How serious a finding is. Only `Error` makes a run fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// The kinds of issue the checker reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// A fence that is never closed, or that is interrupted by another opening fence.
    MalformedBlock,
    /// The block content failed to parse as its declared language.
    SyntaxError,
    /// A name is used but never defined in the document and is not allow-listed.
    UndefinedReference,
    /// A name is declared again after its first declaration in the document.
    DuplicateSymbol,
}

impl FindingKind {
    pub const ALL: [FindingKind; 4] = [
        FindingKind::MalformedBlock,
        FindingKind::SyntaxError,
        FindingKind::UndefinedReference,
        FindingKind::DuplicateSymbol,
    ];

    /// Severity used when the configuration does not override it.
    pub fn default_severity(self) -> Severity {
        match self {
            FindingKind::DuplicateSymbol => Severity::Warning,
            FindingKind::MalformedBlock
            | FindingKind::SyntaxError
            | FindingKind::UndefinedReference => Severity::Error,
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FindingKind::MalformedBlock => "malformed-block",
            FindingKind::SyntaxError => "syntax-error",
            FindingKind::UndefinedReference => "undefined-reference",
            FindingKind::DuplicateSymbol => "duplicate-symbol",
        };
        f.write_str(s)
    }
}

impl FromStr for FindingKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FindingKind::ALL
            .into_iter()
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown finding kind '{}'", s))
    }
}

/// A single reportable issue, attached to an absolute line of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    kind: FindingKind,
    severity: Severity,
    #[serde(serialize_with = "serialize_path")]
    path: Arc<PathBuf>,
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    block: Option<usize>,
    message: String,
}

fn serialize_path<S: serde::Serializer>(path: &Arc<PathBuf>, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&path.display())
}

impl Finding {
    /// Creates a finding with the kind's default severity.
    ///
    /// Newlines in `message` are collapsed so every finding renders on one line.
    pub fn new(
        kind: FindingKind,
        path: Arc<PathBuf>,
        line: usize,
        block: Option<usize>,
        message: impl Into<String>,
    ) -> Self {
        let message: String = message.into();
        let message = message.split_whitespace().collect::<Vec<_>>().join(" ");
        Self {
            kind,
            severity: kind.default_severity(),
            path,
            line,
            block,
            message,
        }
    }

    /// Returns the finding with its severity replaced.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn kind(&self) -> FindingKind {
        self.kind
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Index of the originating block within its document, if the finding has one.
    pub fn block(&self) -> Option<usize> {
        self.block
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}: {}",
            self.path.display(),
            self.line,
            self.severity,
            self.kind,
            self.message
        )
    }
}
