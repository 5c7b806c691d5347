//! Rust blocks, parsed with `syn`.
//!
//! A block is tried first as a whole source file, then as the body of a
//! function, since documentation snippets are often bare statements. Lines
//! hidden with mdBook's `# ` prefix take part in the parse.

use super::{last_line, Analysis, SymbolSite, Symbols, SyntaxIssue};
use proc_macro2::Span;
use syn::ext::IdentExt;
use syn::visit::{self, Visit};
use syn::{Ident, Item, Path, Stmt, UseTree};

/// Prelude names, primitive types and the standard crates.
pub const BUILTIN_SYMBOLS: &[&str] = &[
    "bool", "char", "str", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32", "i64",
    "i128", "isize", "f32", "f64", "Option", "Some", "None", "Result", "Ok", "Err", "Vec",
    "String", "Box", "ToString", "ToOwned", "Clone", "Copy", "Send", "Sync", "Sized", "Unpin",
    "Drop", "Fn", "FnMut", "FnOnce", "Default", "Eq", "PartialEq", "Ord", "PartialOrd",
    "Iterator", "IntoIterator", "Extend", "DoubleEndedIterator", "ExactSizeIterator", "AsRef",
    "AsMut", "Into", "From", "TryFrom", "TryInto", "FromIterator", "drop", "std", "core", "alloc",
];

/// Names that are never references to a document symbol.
const PATH_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

enum Snippet {
    File(syn::File),
    Statements(Vec<Stmt>),
}

pub fn analyze(code: &str) -> Analysis {
    let source = unhide_lines(code);
    match parse(&source) {
        Ok((snippet, line_offset)) => Analysis::ok(collect_symbols(&snippet, line_offset)),
        Err(issue) => Analysis::failed(issue),
    }
}

/// Restores lines hidden with mdBook's `# ` prefix. `##` escapes a literal `#`.
fn unhide_lines(code: &str) -> String {
    code.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed == "#" {
                ""
            } else if let Some(rest) = trimmed.strip_prefix("# ") {
                rest
            } else if trimmed.starts_with("##") {
                &trimmed[1..]
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses the snippet and returns it with the number of lines the wrapper added.
///
/// When both attempts fail, the error that got further into the source is
/// reported.
fn parse(source: &str) -> Result<(Snippet, usize), SyntaxIssue> {
    let file_err = match syn::parse_file(source) {
        Ok(file) => return Ok((Snippet::File(file), 0)),
        Err(e) => e,
    };

    let wrapped = format!("{{\n{}\n}}", source);
    let block_err = match syn::parse_str::<syn::Block>(&wrapped) {
        Ok(block) => return Ok((Snippet::Statements(block.stmts), 1)),
        Err(e) => e,
    };

    let file_issue = to_issue(&file_err, source, 0);
    let block_issue = to_issue(&block_err, source, 1);
    let progress = |issue: &SyntaxIssue| (issue.line, issue.column.unwrap_or(0));

    if progress(&block_issue) > progress(&file_issue) {
        Err(block_issue)
    } else {
        Err(file_issue)
    }
}

fn to_issue(err: &syn::Error, source: &str, line_offset: usize) -> SyntaxIssue {
    let message = err.to_string();
    let start = err.span().start();

    if message.contains("end of input") || start.line <= line_offset {
        return SyntaxIssue {
            line: last_line(source),
            column: None,
            message,
        };
    }

    SyntaxIssue {
        line: (start.line - line_offset).min(last_line(source)),
        column: Some(start.column + 1),
        message,
    }
}

fn item_ident(item: &Item) -> Option<&Ident> {
    match item {
        Item::Const(i) => Some(&i.ident),
        Item::Enum(i) => Some(&i.ident),
        Item::Fn(i) => Some(&i.sig.ident),
        Item::Macro(i) => i.ident.as_ref(),
        Item::Mod(i) => Some(&i.ident),
        Item::Static(i) => Some(&i.ident),
        Item::Struct(i) => Some(&i.ident),
        Item::Trait(i) => Some(&i.ident),
        Item::TraitAlias(i) => Some(&i.ident),
        Item::Type(i) => Some(&i.ident),
        Item::Union(i) => Some(&i.ident),
        _ => None,
    }
}

fn collect_symbols(snippet: &Snippet, line_offset: usize) -> Symbols {
    let mut collector = SymbolCollector {
        line_offset,
        symbols: Symbols::default(),
        glob_import: false,
    };

    let items: Vec<&Item> = match snippet {
        Snippet::File(file) => file.items.iter().collect(),
        Snippet::Statements(stmts) => stmts
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Item(item) => Some(item),
                _ => None,
            })
            .collect(),
    };

    for ident in items.into_iter().filter_map(item_ident) {
        let name = ident.unraw().to_string();
        // Every example may carry its own `main`.
        if name == "_" || name == "main" {
            continue;
        }
        let line = collector.line_of(ident.span());
        collector
            .symbols
            .declarations
            .push(SymbolSite::new(name, line));
    }

    match snippet {
        Snippet::File(file) => collector.visit_file(file),
        Snippet::Statements(stmts) => {
            for stmt in stmts {
                collector.visit_stmt(stmt);
            }
        }
    }

    let mut symbols = collector.symbols;
    if collector.glob_import {
        symbols.references.clear();
    }
    symbols
}

struct SymbolCollector {
    line_offset: usize,
    symbols: Symbols,
    glob_import: bool,
}

impl SymbolCollector {
    fn line_of(&self, span: Span) -> usize {
        span.start().line.saturating_sub(self.line_offset).max(1)
    }

    fn bind(&mut self, ident: &Ident) {
        self.symbols.bindings.insert(ident.unraw().to_string());
    }

    fn bind_use_tree(&mut self, tree: &UseTree, parent: Option<&Ident>) {
        match tree {
            UseTree::Path(p) => self.bind_use_tree(&p.tree, Some(&p.ident)),
            UseTree::Name(n) if n.ident == "self" => {
                if let Some(parent) = parent {
                    self.bind(parent);
                }
            }
            UseTree::Name(n) => self.bind(&n.ident),
            UseTree::Rename(r) => self.bind(&r.rename),
            UseTree::Glob(_) => self.glob_import = true,
            UseTree::Group(g) => {
                for tree in &g.items {
                    self.bind_use_tree(tree, parent);
                }
            }
        }
    }

    /// Records the leading segment of `path` as a use-site.
    ///
    /// Multi-segment paths that start lowercase name modules of other crates.
    fn reference(&mut self, path: &Path) {
        if path.leading_colon.is_some() {
            return;
        }
        let Some(first) = path.segments.first() else {
            return;
        };
        let name = first.ident.unraw().to_string();
        if PATH_KEYWORDS.contains(&name.as_str()) {
            return;
        }
        if path.segments.len() > 1 && name.starts_with(|c: char| c.is_lowercase()) {
            return;
        }
        let line = self.line_of(first.ident.span());
        self.symbols.references.push(SymbolSite::new(name, line));
    }
}

impl<'ast> Visit<'ast> for SymbolCollector {
    fn visit_item(&mut self, item: &'ast Item) {
        if let Some(ident) = item_ident(item) {
            self.bind(ident);
        }
        match item {
            Item::ExternCrate(i) => match &i.rename {
                Some((_, rename)) => self.bind(rename),
                None => self.bind(&i.ident),
            },
            Item::Use(u) => self.bind_use_tree(&u.tree, None),
            Item::Impl(i) => {
                if let Some((_, path, _)) = &i.trait_ {
                    self.reference(path);
                }
            }
            _ => {}
        }
        visit::visit_item(self, item);
    }

    fn visit_signature(&mut self, sig: &'ast syn::Signature) {
        self.bind(&sig.ident);
        visit::visit_signature(self, sig);
    }

    fn visit_variant(&mut self, variant: &'ast syn::Variant) {
        self.bind(&variant.ident);
        visit::visit_variant(self, variant);
    }

    fn visit_trait_item(&mut self, item: &'ast syn::TraitItem) {
        match item {
            syn::TraitItem::Const(c) => self.bind(&c.ident),
            syn::TraitItem::Type(t) => self.bind(&t.ident),
            _ => {}
        }
        visit::visit_trait_item(self, item);
    }

    fn visit_impl_item(&mut self, item: &'ast syn::ImplItem) {
        match item {
            syn::ImplItem::Const(c) => self.bind(&c.ident),
            syn::ImplItem::Type(t) => self.bind(&t.ident),
            _ => {}
        }
        visit::visit_impl_item(self, item);
    }

    fn visit_type_param(&mut self, param: &'ast syn::TypeParam) {
        self.bind(&param.ident);
        visit::visit_type_param(self, param);
    }

    fn visit_const_param(&mut self, param: &'ast syn::ConstParam) {
        self.bind(&param.ident);
        visit::visit_const_param(self, param);
    }

    fn visit_pat_ident(&mut self, pat: &'ast syn::PatIdent) {
        self.bind(&pat.ident);
        visit::visit_pat_ident(self, pat);
    }

    fn visit_expr_path(&mut self, expr: &'ast syn::ExprPath) {
        if expr.qself.is_none() {
            self.reference(&expr.path);
        }
        visit::visit_expr_path(self, expr);
    }

    fn visit_type_path(&mut self, ty: &'ast syn::TypePath) {
        if ty.qself.is_none() {
            self.reference(&ty.path);
        }
        visit::visit_type_path(self, ty);
    }

    fn visit_expr_struct(&mut self, expr: &'ast syn::ExprStruct) {
        if expr.qself.is_none() {
            self.reference(&expr.path);
        }
        visit::visit_expr_struct(self, expr);
    }

    fn visit_pat_struct(&mut self, pat: &'ast syn::PatStruct) {
        if pat.qself.is_none() {
            self.reference(&pat.path);
        }
        visit::visit_pat_struct(self, pat);
    }

    fn visit_pat_tuple_struct(&mut self, pat: &'ast syn::PatTupleStruct) {
        if pat.qself.is_none() {
            self.reference(&pat.path);
        }
        visit::visit_pat_tuple_struct(self, pat);
    }

    fn visit_trait_bound(&mut self, bound: &'ast syn::TraitBound) {
        self.reference(&bound.path);
        visit::visit_trait_bound(self, bound);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(sites: &[SymbolSite]) -> Vec<&str> {
        sites.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_valid_file() {
        let analysis = analyze(
            "struct Point { x: i32, y: i32 }\n\nfn origin() -> Point {\n    Point { x: 0, y: 0 }\n}\n",
        );
        assert!(analysis.issue.is_none(), "{:?}", analysis.issue);
        assert_eq!(names(&analysis.symbols.declarations), vec!["Point", "origin"]);
        assert_eq!(analysis.symbols.declarations[1].line, 3);
        assert!(names(&analysis.symbols.references).contains(&"Point"));
    }

    #[test]
    fn test_statements_snippet() {
        let analysis = analyze("let v = vec![1, 2, 3];\nlet total: i32 = v.iter().sum();\n");
        assert!(analysis.issue.is_none(), "{:?}", analysis.issue);
        assert!(analysis.symbols.bindings.contains("v"));
        assert!(analysis.symbols.bindings.contains("total"));
        assert!(analysis.symbols.declarations.is_empty());
    }

    #[test]
    fn test_statement_lines_are_not_shifted() {
        let analysis = analyze("let a = 1;\nlet b = missing(a);\n");
        let missing = analysis
            .symbols
            .references
            .iter()
            .find(|s| s.name == "missing")
            .unwrap();
        assert_eq!(missing.line, 2);
    }

    #[test]
    fn test_syntax_error_line() {
        let issue = analyze("fn main() {\n    let x = ;\n}\n").issue.unwrap();
        assert_eq!(issue.line, 2);
        assert!(issue.column.is_some());
    }

    #[test]
    fn test_unclosed_item_is_reported() {
        let issue = analyze("fn main() {\n    println!(\"hi\");\n").issue.unwrap();
        assert!((1..=2).contains(&issue.line), "line {}", issue.line);
    }

    #[test]
    fn test_hidden_lines_are_parsed() {
        let analysis = analyze("# use std::collections::HashMap;\n# fn main() {\nlet m: HashMap<u8, u8> = HashMap::new();\n# }\n");
        assert!(analysis.issue.is_none(), "{:?}", analysis.issue);
        assert!(analysis.symbols.bindings.contains("HashMap"));
    }

    #[test]
    fn test_unhide_lines() {
        assert_eq!(unhide_lines("# let x = 1;\n#\n##[derive]\nfoo"), "let x = 1;\n\n#[derive]\nfoo");
        assert_eq!(unhide_lines("#[derive(Debug)]"), "#[derive(Debug)]");
    }

    #[test]
    fn test_main_is_not_a_declaration() {
        let analysis = analyze("fn main() {}\n");
        assert!(analysis.symbols.declarations.is_empty());
    }

    #[test]
    fn test_module_paths_are_not_references() {
        let analysis = analyze("fn f() { let s = serde_json::to_string(&1); Config::load(); }\n");
        let refs = names(&analysis.symbols.references);
        assert!(!refs.contains(&"serde_json"));
        assert!(refs.contains(&"Config"));
    }

    #[test]
    fn test_glob_import_drops_references() {
        let analysis = analyze("use crate::prelude::*;\nfn f() -> Widget { Widget::new() }\n");
        assert!(analysis.issue.is_none());
        assert!(analysis.symbols.references.is_empty());
    }

    #[test]
    fn test_use_self_binds_parent() {
        let analysis = analyze("use std::io::{self, Write};\nfn f() -> io::Result<()> { Ok(()) }\n");
        assert!(analysis.symbols.bindings.contains("io"));
        assert!(analysis.symbols.bindings.contains("Write"));
    }

    #[test]
    fn test_generics_and_trait_bounds() {
        let analysis = analyze("fn show<T: Render>(item: T) -> T { item }\n");
        assert!(analysis.symbols.bindings.contains("T"));
        assert!(analysis.symbols.bindings.contains("item"));
        assert!(names(&analysis.symbols.references).contains(&"Render"));
    }
}
