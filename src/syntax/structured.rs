//! Data formats: JSON, TOML and YAML. These never declare or use symbols.

use super::{last_line, line_col_of, Analysis, Symbols, SyntaxIssue};
use serde::Deserialize;

pub fn analyze_json(code: &str) -> Analysis {
    match serde_json::from_str::<serde_json::Value>(code) {
        Ok(_) => Analysis::ok(Symbols::default()),
        Err(e) => {
            let message = strip_location(&e.to_string(), e.line(), e.column());
            Analysis::failed(SyntaxIssue {
                line: e.line().max(1),
                column: (e.column() > 0).then_some(e.column()),
                message,
            })
        }
    }
}

pub fn analyze_toml(code: &str) -> Analysis {
    match code.parse::<toml::Table>() {
        Ok(_) => Analysis::ok(Symbols::default()),
        Err(e) => {
            let (line, column) = match e.span() {
                Some(span) => {
                    let (line, column) = line_col_of(code, span.start);
                    (line, Some(column))
                }
                None => (last_line(code), None),
            };
            Analysis::failed(SyntaxIssue {
                line,
                column,
                message: e.message().trim().to_string(),
            })
        }
    }
}

/// Every document of a multi-document stream must parse.
pub fn analyze_yaml(code: &str) -> Analysis {
    for document in serde_yaml::Deserializer::from_str(code) {
        if let Err(e) = serde_yaml::Value::deserialize(document) {
            let (line, column) = match e.location() {
                Some(loc) => (loc.line(), Some(loc.column())),
                None => (last_line(code), None),
            };
            let message = match column {
                Some(column) => strip_location(&e.to_string(), line, column),
                None => e.to_string(),
            };
            return Analysis::failed(SyntaxIssue {
                line: line.max(1),
                column,
                message,
            });
        }
    }
    Analysis::ok(Symbols::default())
}

/// Parsers append "at line X column Y"; the report carries the line itself.
fn strip_location(message: &str, line: usize, column: usize) -> String {
    let suffix = format!(" at line {} column {}", line, column);
    message
        .find(&suffix)
        .map_or(message, |i| &message[..i])
        .to_string()
}
