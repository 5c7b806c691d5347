//! Brace-family languages: C, C++, C#, Go, Java, JavaScript and TypeScript.
//!
//! The parse is a lexer pass that skips strings and comments and checks that
//! `()`, `[]` and `{}` balance. Symbols are picked out of the comment-free
//! text with regular expressions: type declarations, `new Type` uses and
//! imports.

use super::{Analysis, SymbolSite, Symbols, SyntaxIssue};
use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dialect {
    C,
    Cpp,
    CSharp,
    Go,
    Java,
    JavaScript,
    TypeScript,
}

impl Dialect {
    pub fn builtin_symbols(self) -> &'static [&'static str] {
        match self {
            Dialect::CSharp => &[
                "System",
                "Object",
                "String",
                "Exception",
                "ArgumentException",
                "ArgumentNullException",
                "ArgumentOutOfRangeException",
                "InvalidOperationException",
                "NotImplementedException",
                "NotSupportedException",
                "KeyNotFoundException",
                "List",
                "Dictionary",
                "HashSet",
                "Queue",
                "Stack",
                "StringBuilder",
                "DateTime",
                "DateTimeOffset",
                "TimeSpan",
                "Guid",
                "Uri",
                "Random",
                "Task",
                "TaskCompletionSource",
                "CancellationTokenSource",
                "Lazy",
                "Stopwatch",
                "Version",
                "Tuple",
                "MemoryStream",
                "StreamReader",
                "StreamWriter",
            ],
            Dialect::Java => &[
                "Object",
                "String",
                "StringBuilder",
                "Exception",
                "RuntimeException",
                "IllegalArgumentException",
                "IllegalStateException",
                "UnsupportedOperationException",
                "NullPointerException",
                "ArrayList",
                "LinkedList",
                "HashMap",
                "TreeMap",
                "HashSet",
                "TreeSet",
                "Thread",
                "Integer",
                "Long",
                "Double",
                "Boolean",
                "Random",
                "Date",
                "Scanner",
            ],
            Dialect::JavaScript | Dialect::TypeScript => &[
                "Array",
                "ArrayBuffer",
                "Date",
                "Error",
                "TypeError",
                "RangeError",
                "SyntaxError",
                "Map",
                "Set",
                "WeakMap",
                "WeakSet",
                "Promise",
                "Proxy",
                "RegExp",
                "URL",
                "URLSearchParams",
                "Intl",
                "Function",
                "Object",
                "Uint8Array",
                "TextEncoder",
                "TextDecoder",
                "AbortController",
                "Headers",
                "Request",
                "Response",
                "FormData",
                "Blob",
                "Event",
                "EventTarget",
                "Worker",
                "WebSocket",
                "XMLHttpRequest",
            ],
            Dialect::C | Dialect::Cpp | Dialect::Go => &[],
        }
    }

    fn has_template_literals(self) -> bool {
        matches!(self, Dialect::JavaScript | Dialect::TypeScript)
    }

    fn has_raw_backtick_strings(self) -> bool {
        self == Dialect::Go
    }

    fn has_verbatim_strings(self) -> bool {
        self == Dialect::CSharp
    }

    fn constructs_with_new(self) -> bool {
        !matches!(self, Dialect::C | Dialect::Go)
    }
}

pub fn analyze(dialect: Dialect, code: &str) -> Analysis {
    match mask(dialect, code) {
        Ok(masked) => match check_balance(&masked) {
            Some(issue) => Analysis::failed(issue),
            None => Analysis::ok(collect_symbols(dialect, &masked)),
        },
        Err(issue) => Analysis::failed(issue),
    }
}

/// Returns `code` with string and comment contents blanked out.
///
/// Newlines are kept so line numbers stay valid. Delimiter characters of
/// strings are kept so `"x"` still reads as a value.
fn mask(dialect: Dialect, code: &str) -> Result<String, SyntaxIssue> {
    let chars: Vec<char> = code.chars().collect();
    let mut out = String::with_capacity(code.len());
    let mut line = 1;
    let mut i = 0;

    let blank = |c: char| if c == '\n' { '\n' } else { ' ' };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(' ');
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                let start_line = line;
                out.push_str("  ");
                i += 2;
                loop {
                    if i >= chars.len() {
                        return Err(SyntaxIssue {
                            line: start_line,
                            column: None,
                            message: "unterminated block comment".to_string(),
                        });
                    }
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        out.push_str("  ");
                        i += 2;
                        break;
                    }
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    out.push(blank(chars[i]));
                    i += 1;
                }
            }
            '@' if dialect.has_verbatim_strings() && next == Some('"') => {
                let start_line = line;
                out.push_str("@\"");
                i += 2;
                loop {
                    if i >= chars.len() {
                        return Err(unterminated_string(start_line));
                    }
                    if chars[i] == '"' {
                        if chars.get(i + 1) == Some(&'"') {
                            out.push_str("  ");
                            i += 2;
                            continue;
                        }
                        out.push('"');
                        i += 1;
                        break;
                    }
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    out.push(blank(chars[i]));
                    i += 1;
                }
            }
            '`' if dialect.has_template_literals() || dialect.has_raw_backtick_strings() => {
                let start_line = line;
                let escapes = dialect.has_template_literals();
                out.push('`');
                i += 1;
                loop {
                    if i >= chars.len() {
                        return Err(unterminated_string(start_line));
                    }
                    if escapes && chars[i] == '\\' && i + 1 < chars.len() {
                        if chars[i + 1] == '\n' {
                            line += 1;
                        }
                        out.push(' ');
                        out.push(blank(chars[i + 1]));
                        i += 2;
                        continue;
                    }
                    if chars[i] == '`' {
                        out.push('`');
                        i += 1;
                        break;
                    }
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    out.push(blank(chars[i]));
                    i += 1;
                }
            }
            '"' | '\'' => {
                let quote = c;
                out.push(quote);
                i += 1;
                loop {
                    if i >= chars.len() || chars[i] == '\n' {
                        return Err(unterminated_string(line));
                    }
                    if chars[i] == '\\' && i + 1 < chars.len() && chars[i + 1] != '\n' {
                        out.push_str("  ");
                        i += 2;
                        continue;
                    }
                    if chars[i] == quote {
                        out.push(quote);
                        i += 1;
                        break;
                    }
                    out.push(' ');
                    i += 1;
                }
            }
            _ => {
                if c == '\n' {
                    line += 1;
                }
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(out)
}

fn unterminated_string(line: usize) -> SyntaxIssue {
    SyntaxIssue {
        line,
        column: None,
        message: "unterminated string literal".to_string(),
    }
}

fn check_balance(masked: &str) -> Option<SyntaxIssue> {
    let mut stack: Vec<(char, usize, usize)> = Vec::new();

    for (line_idx, text) in masked.lines().enumerate() {
        let line = line_idx + 1;
        for (col_idx, c) in text.chars().enumerate() {
            let column = col_idx + 1;
            match c {
                '(' | '[' | '{' => stack.push((c, line, column)),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((open, _, _)) if open == expected => {}
                        Some((open, open_line, _)) => {
                            return Some(SyntaxIssue {
                                line,
                                column: Some(column),
                                message: format!(
                                    "mismatched `{}`: expected `{}` to close `{}` from line {}",
                                    c,
                                    closer_of(open),
                                    open,
                                    open_line
                                ),
                            });
                        }
                        None => {
                            return Some(SyntaxIssue {
                                line,
                                column: Some(column),
                                message: format!("unexpected closing `{}`", c),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
    }

    stack.pop().map(|(open, line, column)| SyntaxIssue {
        line,
        column: Some(column),
        message: format!("unclosed `{}`", open),
    })
}

fn closer_of(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

static TYPE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:(partial)\s+)?(?:enum\s+(?:class|struct)|record\s+(?:class|struct)|class|struct|interface|enum|record)\s+([A-Za-z_][A-Za-z0-9_]*)(\s*<[^<>{};]*>)?")
        .expect("valid regex")
});

static C_TYPE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:struct|enum|union)\s+([A-Za-z_][A-Za-z0-9_]*)\s*\{").expect("valid regex")
});

static GO_TYPE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\btype\s+([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex")
});

static NEW_EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnew\s+([A-Z][A-Za-z0-9_]*)").expect("valid regex"));

static OPEN_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:using\s+(?:static\s+)?[A-Za-z_][\w.]*\s*;|using\s+namespace\b|#\s*include\b|import\s+(?:static\s+)?[\w.]+\.\*\s*;)")
        .expect("valid regex")
});

static NAMED_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:using\s+([A-Za-z_]\w*)\s*=|import\s+(?:static\s+)?[\w.]*\.([A-Za-z_]\w*)\s*;|import\s+(?:type\s+)?([A-Za-z_$][\w$]*)\s*(?:,|\s+from\b)|import\s+\*\s+as\s+([A-Za-z_$][\w$]*))")
        .expect("valid regex")
});

static BRACED_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bimport\s+(?:type\s+)?(?:[A-Za-z_$][\w$]*\s*,\s*)?\{([^}]*)\}").expect("valid regex")
});

static FUNCTION_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfunction(?:\s*\*\s*|\s+)([A-Za-z_$][\w$]*)\s*(<[^<>(){};=]*>)?\s*\(").expect("valid regex")
});

static VARIABLE_BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:const|let|var)\s+(?:([A-Za-z_$][\w$]*)|\{([^{}]*)\}|\[([^\[\]]*)\])")
        .expect("valid regex")
});

/// `Name<T, U>(` in a method or function definition; `new Type<T>(` is skipped.
static GENERIC_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\bnew\s+)?\b[A-Za-z_]\w*\s*<([^<>(){};=]*)>\s*\(").expect("valid regex")
});

static TEMPLATE_PARAMETERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\btemplate\s*<([^<>]*)>").expect("valid regex"));

/// Words the declaration patterns can capture that never name a type.
const KEYWORDS: &[&str] = &[
    "class",
    "struct",
    "interface",
    "enum",
    "record",
    "union",
    "in",
    "of",
    "is",
    "as",
    "extends",
    "implements",
    "where",
    "new",
];

fn is_identifier(s: &str) -> bool {
    s.chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Binds the last identifier of each comma-separated item, after dropping
/// defaults (`T = int`) and renames on the left of a colon (`a: b`).
fn bind_list(symbols: &mut Symbols, list: &str) {
    for item in list.split(',') {
        let item = item.split('=').next().unwrap_or_default();
        let item = item.rsplit(':').next().unwrap_or_default();
        let Some(ident) = item.split_whitespace().last() else {
            continue;
        };
        let ident = ident.trim_start_matches("...");
        if is_identifier(ident) && !KEYWORDS.contains(&ident) {
            symbols.bindings.insert(ident.to_string());
        }
    }
}

fn collect_symbols(dialect: Dialect, masked: &str) -> Symbols {
    let mut symbols = Symbols::default();
    let line_at = |offset: usize| masked[..offset].matches('\n').count() + 1;

    let declaration_re: &Regex = match dialect {
        Dialect::C => &C_TYPE_DECLARATION,
        Dialect::Go => &GO_TYPE_DECLARATION,
        _ => &TYPE_DECLARATION,
    };

    for caps in declaration_re.captures_iter(masked) {
        let (partial, name) = match dialect {
            Dialect::C | Dialect::Go => (false, caps.get(1)),
            _ => (caps.get(1).is_some(), caps.get(2)),
        };
        let Some(name) = name else { continue };
        if KEYWORDS.contains(&name.as_str()) {
            continue;
        }

        if partial {
            symbols.bindings.insert(name.as_str().to_string());
        } else {
            symbols
                .declarations
                .push(SymbolSite::new(name.as_str(), line_at(name.start())));
        }

        if let Some(generics) = caps.get(3) {
            bind_list(
                &mut symbols,
                generics.as_str().trim_matches(|c: char| c == '<' || c == '>'),
            );
        }
    }

    if matches!(dialect, Dialect::JavaScript | Dialect::TypeScript) {
        for caps in FUNCTION_DECLARATION.captures_iter(masked) {
            if let Some(name) = caps.get(1) {
                symbols
                    .declarations
                    .push(SymbolSite::new(name.as_str(), line_at(name.start())));
            }
            if let Some(generics) = caps.get(2) {
                bind_list(
                    &mut symbols,
                    generics.as_str().trim_matches(|c: char| c == '<' || c == '>'),
                );
            }
        }
    }

    for caps in VARIABLE_BINDING.captures_iter(masked) {
        if let Some(name) = caps.get(1) {
            if !KEYWORDS.contains(&name.as_str()) {
                symbols.bindings.insert(name.as_str().to_string());
            }
        }
        if let Some(list) = caps.get(2).or_else(|| caps.get(3)) {
            bind_list(&mut symbols, list.as_str());
        }
    }

    for caps in GENERIC_METHOD.captures_iter(masked) {
        if caps.get(1).is_none() {
            bind_list(&mut symbols, &caps[2]);
        }
    }

    for caps in TEMPLATE_PARAMETERS.captures_iter(masked) {
        bind_list(&mut symbols, &caps[1]);
    }

    for caps in NAMED_IMPORT.captures_iter(masked) {
        if let Some(name) = caps.iter().skip(1).flatten().next() {
            symbols.bindings.insert(name.as_str().to_string());
        }
    }

    for caps in BRACED_IMPORT.captures_iter(masked) {
        for item in caps[1].split(',') {
            let item = item.trim().trim_start_matches("type ").trim();
            let local = item.rsplit(" as ").next().unwrap_or(item).trim();
            if !local.is_empty() {
                symbols.bindings.insert(local.to_string());
            }
        }
    }

    let opaque = OPEN_IMPORT.is_match(masked);
    if dialect.constructs_with_new() && !opaque {
        for caps in NEW_EXPRESSION.captures_iter(masked) {
            if let Some(name) = caps.get(1) {
                symbols
                    .references
                    .push(SymbolSite::new(name.as_str(), line_at(name.start())));
            }
        }
    }

    symbols
}
