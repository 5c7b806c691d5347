use crate::config::CheckConfig;
use crate::syntax::{self, Analysis, Dialect};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;

/// How a language's blocks are parsed.
///
/// This is the tag the validator dispatches on. Every variant knows how to
/// attempt a lightweight parse and which names it treats as external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Syntax {
    Rust,
    Json,
    Toml,
    Yaml,
    Delimited(Dialect),
}

impl Syntax {
    /// Parses `code` and collects the symbols it declares and uses.
    pub fn analyze(self, code: &str) -> Analysis {
        match self {
            Syntax::Rust => syntax::rust::analyze(code),
            Syntax::Json => syntax::structured::analyze_json(code),
            Syntax::Toml => syntax::structured::analyze_toml(code),
            Syntax::Yaml => syntax::structured::analyze_yaml(code),
            Syntax::Delimited(dialect) => syntax::delimited::analyze(dialect, code),
        }
    }

    /// Names that are always in scope for this language.
    pub fn builtin_symbols(self) -> &'static [&'static str] {
        match self {
            Syntax::Rust => syntax::rust::BUILTIN_SYMBOLS,
            Syntax::Delimited(dialect) => dialect.builtin_symbols(),
            Syntax::Json | Syntax::Toml | Syntax::Yaml => &[],
        }
    }
}

/// Languages the checker knows how to validate, by configuration name.
pub const BUILTIN_LANGUAGES: &[&str] = &[
    "c",
    "cpp",
    "csharp",
    "go",
    "java",
    "javascript",
    "json",
    "rust",
    "toml",
    "typescript",
    "yaml",
];

/// Get default fence markers for a language based on highlight.js language definitions.
///
/// Returns the canonical language name plus the common aliases highlight.js
/// recognizes. Returns `None` for languages the checker cannot validate.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(get_default_fence_markers("c"), Some(vec!["c", "h"]));
/// assert_eq!(get_default_fence_markers("unknown"), None);
/// ```
///
/// # Reference
///
/// Language aliases are based on highlight.js SUPPORTED_LANGUAGES.md:
/// https://github.com/highlightjs/highlight.js/blob/main/SUPPORTED_LANGUAGES.md
pub fn get_default_fence_markers(lang_name: &str) -> Option<Vec<String>> {
    let markers: &[&str] = match lang_name {
        "c" => &["c", "h"],
        "cpp" => &["cpp", "hpp", "cc", "hh", "c++", "h++", "cxx", "hxx"],
        "csharp" => &["csharp", "cs", "c#"],
        "go" => &["go", "golang"],
        "java" => &["java", "jsp"],
        "javascript" => &["javascript", "js", "jsx", "mjs", "cjs"],
        "json" => &["json"],
        "rust" => &["rust", "rs"],
        "toml" => &["toml"],
        "typescript" => &["typescript", "ts", "tsx", "mts", "cts"],
        "yaml" => &["yaml", "yml"],
        _ => return None,
    };
    Some(markers.iter().map(|s| s.to_string()).collect())
}

fn syntax_for(lang_name: &str) -> Option<Syntax> {
    let syntax = match lang_name {
        "rust" => Syntax::Rust,
        "json" => Syntax::Json,
        "toml" => Syntax::Toml,
        "yaml" => Syntax::Yaml,
        "c" => Syntax::Delimited(Dialect::C),
        "cpp" => Syntax::Delimited(Dialect::Cpp),
        "csharp" => Syntax::Delimited(Dialect::CSharp),
        "go" => Syntax::Delimited(Dialect::Go),
        "java" => Syntax::Delimited(Dialect::Java),
        "javascript" => Syntax::Delimited(Dialect::JavaScript),
        "typescript" => Syntax::Delimited(Dialect::TypeScript),
        _ => return None,
    };
    Some(syntax)
}

/// A language resolved from configuration.
///
/// The language can be formatted for display using the `Display` trait,
/// which prints its configuration name (e.g. "rust", "csharp").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredLanguage {
    name: String,
    syntax: Syntax,
}

impl fmt::Display for ConfiguredLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl ConfiguredLanguage {
    pub fn new(name: impl Into<String>, syntax: Syntax) -> Self {
        Self {
            name: name.into(),
            syntax,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }
}

/// Registry of available languages for code validation.
///
/// The registry is built from the configuration and provides lookup
/// functionality to find languages by their fence markers.
///
/// # Example
///
/// ```ignore
/// let registry = LanguageRegistry::from_config(&config)?;
///
/// if let Some(lang) = registry.find_by_fence("rs") {
///     let analysis = lang.syntax().analyze(code);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    by_fence: BTreeMap<String, ConfiguredLanguage>,
}

impl LanguageRegistry {
    /// Creates a new language registry from configuration.
    ///
    /// Every built-in language is enabled with its default fence markers
    /// unless the configuration disables it or replaces the markers.
    ///
    /// # Errors
    ///
    /// Returns an error if two enabled languages claim the same fence marker.
    pub fn from_config(config: &CheckConfig) -> Result<Self> {
        let mut by_fence: BTreeMap<String, ConfiguredLanguage> = BTreeMap::new();

        for &name in BUILTIN_LANGUAGES {
            let lang_config = config.languages().get(name);
            if lang_config.is_some_and(|c| !c.enabled) {
                log::debug!("Language {} disabled by configuration", name);
                continue;
            }

            let Some(syntax) = syntax_for(name) else {
                continue;
            };
            let fence_markers = match lang_config.and_then(|c| c.fence_markers.clone()) {
                Some(markers) => markers,
                None => get_default_fence_markers(name).unwrap_or_default(),
            };

            for marker in fence_markers {
                let marker = marker.to_lowercase();
                if let Some(existing) = by_fence.get(&marker) {
                    anyhow::bail!(
                        "Fence marker '{}' is claimed by both '{}' and '{}'",
                        marker,
                        existing,
                        name
                    );
                }
                by_fence.insert(marker, ConfiguredLanguage::new(name, syntax));
            }
        }

        Ok(Self { by_fence })
    }

    /// Finds a language by its fence marker, ignoring case.
    ///
    /// Returns `None` for unknown or disabled languages; such blocks are
    /// skipped rather than reported.
    pub fn find_by_fence(&self, fence: &str) -> Option<&ConfiguredLanguage> {
        if fence.is_empty() {
            return None;
        }
        self.by_fence.get(&fence.to_lowercase())
    }
}
