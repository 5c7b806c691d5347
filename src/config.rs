use crate::finding::{FindingKind, Severity};
use crate::language::BUILTIN_LANGUAGES;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when no config is given.
pub const LOCAL_CONFIG_FILE: &str = "snippet-check.toml";

/// Configuration for the snippet checker.
///
/// Read from `snippet-check.toml`, from the user config directory, or from
/// the `[preprocessor.snippet-check]` section of `book.toml` in mdBook mode.
///
/// # Example
///
/// ```toml
/// extensions = ["md", "markdown"]
/// allow = ["HttpClient", "WebApplication"]
/// allow_list = "${HOME}/.config/symbols.txt"
///
/// [languages.csharp]
/// enabled = true
/// fence_markers = ["csharp", "cs"]
///
/// [severity]
/// duplicate-symbol = "error"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// File extensions picked up when walking directories
    pub extensions: Vec<String>,

    /// External symbols that never count as undefined
    pub allow: Vec<String>,

    /// Optional file with one external symbol per line (supports ${VAR} expansion)
    pub allow_list: Option<PathBuf>,

    /// Language-specific overrides indexed by language name
    pub languages: HashMap<String, LanguageConfig>,

    /// Severity overrides indexed by finding kind (e.g. "duplicate-symbol")
    pub severity: BTreeMap<String, Severity>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string(), "markdown".to_string()],
            allow: Vec::new(),
            allow_list: None,
            languages: HashMap::new(),
            severity: BTreeMap::new(),
        }
    }
}

/// Overrides for one built-in language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Whether this language is enabled for checking
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fence markers that identify this language in markdown, replacing the defaults
    #[serde(default)]
    pub fence_markers: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl LanguageConfig {
    /// Validate the configuration for correctness
    pub fn validate(&self) -> Result<()> {
        if let Some(markers) = &self.fence_markers {
            if markers.is_empty() {
                anyhow::bail!("Language configuration must have at least one fence marker");
            }
            for marker in markers {
                if marker.is_empty() || marker.contains(|c: char| c == ',' || c.is_whitespace())
                {
                    anyhow::bail!("Invalid fence marker '{}'", marker);
                }
            }
        }

        Ok(())
    }
}

impl CheckConfig {
    /// Loads configuration from an explicit file, the working directory, or
    /// the user config directory, in that order. Falls back to defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let local = Path::new(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(local);
        }

        if let Some(user) = user_config_path().filter(|p| p.is_file()) {
            return Self::from_file(&user);
        }

        log::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Parses a TOML configuration file. Relative paths inside it resolve
    /// against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: CheckConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        log::info!("Using configuration from {}", path.display());
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.finalize(base_dir)
    }

    /// Parse configuration from mdbook PreprocessorContext and expand environment variables
    pub fn from_preprocessor_context(
        ctx: &mdbook::preprocess::PreprocessorContext,
    ) -> Result<Self> {
        let config: CheckConfig =
            if let Some(config_value) = ctx.config.get("preprocessor.snippet-check") {
                config_value
                    .clone()
                    .try_into()
                    .context("Invalid [preprocessor.snippet-check] configuration")?
            } else {
                Self::default()
            };

        config.finalize(&ctx.root)
    }

    fn finalize(mut self, base_dir: &Path) -> Result<Self> {
        if let Some(allow_list) = self.allow_list.take() {
            let expanded = PathBuf::from(expand_env_vars(&allow_list.to_string_lossy()));
            self.allow_list = Some(if expanded.is_relative() {
                base_dir.join(expanded)
            } else {
                expanded
            });
        }

        self.validate()?;
        Ok(self)
    }

    /// Rejects unknown languages, bad fence markers and unknown finding kinds.
    pub fn validate(&self) -> Result<()> {
        for (name, lang_config) in &self.languages {
            if !BUILTIN_LANGUAGES.contains(&name.as_str()) {
                anyhow::bail!(
                    "Unknown language '{}' (supported: {})",
                    name,
                    BUILTIN_LANGUAGES.join(", ")
                );
            }
            lang_config
                .validate()
                .with_context(|| format!("Invalid configuration for language '{}'", name))?;
        }

        for kind in self.severity.keys() {
            kind.parse::<FindingKind>()
                .context("Invalid [severity] configuration")?;
        }

        Ok(())
    }

    /// Get all configured languages
    pub fn languages(&self) -> &HashMap<String, LanguageConfig> {
        &self.languages
    }

    /// Severity for `kind`, honouring overrides.
    pub fn severity_for(&self, kind: FindingKind) -> Severity {
        self.severity
            .get(&kind.to_string())
            .copied()
            .unwrap_or_else(|| kind.default_severity())
    }
}

/// Location of the per-user configuration file.
fn user_config_path() -> Option<PathBuf> {
    // Check for XDG_CONFIG_HOME environment variable first (respects XDG standard on all platforms)
    if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("snippet-check")
                .join("config.toml"),
        );
    }

    // Fall back to platform-specific defaults via directories crate
    ProjectDirs::from("", "", "snippet-check").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Expand environment variables in a string
/// Supports ${VAR_NAME} syntax
/// This function processes the string in a single pass to avoid re-processing expanded values
fn expand_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_name = String::new();
            let mut found_close = false;

            for ch in chars.by_ref() {
                if ch == '}' {
                    found_close = true;
                    break;
                }
                var_name.push(ch);
            }

            if found_close {
                match env::var(&var_name) {
                    Ok(value) => result.push_str(&value),
                    Err(_) => {
                        log::warn!(
                            "Environment variable '{}' not found, leaving unexpanded",
                            var_name
                        );
                        result.push_str("${");
                        result.push_str(&var_name);
                        result.push('}');
                    }
                }
            } else {
                // No closing brace found, treat as literal
                result.push_str("${");
                result.push_str(&var_name);
            }
        } else {
            result.push(ch);
        }
    }

    result
}
