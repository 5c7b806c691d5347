use crate::config::CheckConfig;
use crate::language::Syntax;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// External symbols that never count as undefined references.
///
/// Combines the user's symbols (from `allow` and the allow-list file) with
/// the fixed built-in list of each language.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    symbols: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds the allow-list from `allow` and the optional allow-list file.
    ///
    /// # Errors
    ///
    /// Returns an error if the allow-list file cannot be read.
    pub fn from_config(config: &CheckConfig) -> Result<Self> {
        let mut list = Self::new(config.allow.iter().cloned());
        if let Some(path) = &config.allow_list {
            list.extend_from_file(path)?;
        }
        Ok(list)
    }

    /// Adds every symbol listed in `path`.
    pub fn extend_from_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read allow-list {}", path.display()))?;
        let before = self.symbols.len();
        self.symbols
            .extend(parse_allow_list(&content).map(str::to_string));
        log::debug!(
            "Loaded {} symbol(s) from {}",
            self.symbols.len() - before,
            path.display()
        );
        Ok(())
    }

    /// Whether `name` is external for blocks parsed as `syntax`.
    pub fn permits(&self, syntax: Syntax, name: &str) -> bool {
        self.symbols.contains(name) || syntax.builtin_symbols().contains(&name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// One symbol per line; `#` starts a comment.
fn parse_allow_list(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
}
