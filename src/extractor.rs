use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use std::ops::Range;

/// Fence flags that exclude a block from every check.
const SKIP_FLAGS: &[&str] = &["ignore", "compile_fail"];

/// A fenced code block extracted from markdown with its metadata.
///
/// Code blocks are identified by fenced code syntax in markdown:
///
/// ````markdown
/// ```rust
/// fn main() {}
/// ```
/// ````
///
/// # Attributes
///
/// The fence info string may carry comma or whitespace separated flags after
/// the language tag:
///
/// - `ignore` - Skip every check for this block
/// - `compile_fail` - Same as `ignore`; the block is meant to be broken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// The language tag from the fence info string, empty when the fence has none
    pub language: String,
    /// Remaining tokens of the fence info string
    pub flags: Vec<String>,
    /// The code content, without the fences
    pub code: String,
    /// 1-based line of the opening fence
    pub start_line: usize,
    /// 1-based line of the closing fence
    pub end_line: usize,
}

impl CodeBlock {
    /// Whether the block is flagged to be left alone.
    pub fn skipped(&self) -> bool {
        self.flags.iter().any(|f| SKIP_FLAGS.contains(&f.as_str()))
    }

    /// Maps a 1-based line inside `code` to the document line it came from.
    pub fn document_line(&self, code_line: usize) -> usize {
        self.start_line + code_line.max(1)
    }
}

/// A fence that could not be turned into a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedFence {
    /// 1-based line of the offending opening fence
    pub line: usize,
    pub reason: String,
}

/// Everything the extractor found in one document, in source order.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub blocks: Vec<CodeBlock>,
    pub malformed: Vec<MalformedFence>,
}

struct OpenBlock {
    language: String,
    flags: Vec<String>,
    code: String,
    range: Range<usize>,
}

enum FenceShape {
    Closed,
    Unterminated,
    /// Another fence opens inside the block at `offset` (absolute bytes).
    /// `fence` is the character and run length of the outer opening fence.
    Nested { offset: usize, fence: (char, usize) },
}

/// Extracts fenced code blocks from markdown content using pulldown-cmark.
///
/// Malformed fences never produce a block. An unterminated fence is recorded
/// once. A fence whose content contains another opening fence is recorded
/// once and scanning restarts at that inner fence, so the next well-formed
/// block is still extracted. The outer fence's own closer, left behind
/// after the inner block, is consumed rather than opening a new block.
///
/// # Example
///
/// ```ignore
/// let markdown = "```rust\nfn main() {}\n```\n";
/// let extraction = extract_code_blocks(markdown);
/// assert_eq!(extraction.blocks.len(), 1);
/// assert_eq!(extraction.blocks[0].language, "rust");
/// ```
pub fn extract_code_blocks(content: &str) -> Extraction {
    let lines = LineIndex::new(content);
    let mut extraction = Extraction::default();
    let mut cursor = 0;
    let mut orphan: Option<(char, usize)> = None;

    'scan: while cursor < content.len() {
        let source = &content[cursor..];
        let mut current: Option<OpenBlock> = None;

        for (event, range) in Parser::new(source).into_offset_iter() {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    let (language, flags) = parse_fence_info(&info);
                    current = Some(OpenBlock {
                        language,
                        flags,
                        code: String::new(),
                        range: (cursor + range.start)..(cursor + range.end),
                    });
                }

                Event::Text(text) => {
                    if let Some(open) = current.as_mut() {
                        open.code.push_str(&text);
                    }
                }

                Event::End(TagEnd::CodeBlock) => {
                    let Some(open) = current.take() else {
                        continue;
                    };
                    let start_line = lines.line_of(open.range.start);
                    let end = open.range.end;

                    match inspect_fence(content, open.range.clone()) {
                        FenceShape::Closed => {
                            extraction.blocks.push(CodeBlock {
                                language: open.language,
                                flags: open.flags,
                                code: open.code,
                                start_line,
                                end_line: lines.line_of(end.saturating_sub(1)),
                            });
                            if let Some((fence_char, fence_len)) = orphan.take() {
                                if let Some(next) =
                                    orphaned_closer(content, end, fence_char, fence_len)
                                {
                                    log::debug!(
                                        "Skipping leftover closing fence at line {}",
                                        lines.line_of(next.saturating_sub(1))
                                    );
                                    cursor = next;
                                    continue 'scan;
                                }
                            }
                        }
                        FenceShape::Unterminated => {
                            orphan = None;
                            log::debug!("Unterminated fence at line {}", start_line);
                            extraction.malformed.push(MalformedFence {
                                line: start_line,
                                reason: "code fence is never closed".to_string(),
                            });
                        }
                        FenceShape::Nested { offset, fence } => {
                            let nested_line = lines.line_of(offset);
                            log::debug!(
                                "Fence at line {} interrupted by fence at line {}",
                                start_line,
                                nested_line
                            );
                            extraction.malformed.push(MalformedFence {
                                line: start_line,
                                reason: format!(
                                    "code fence is not closed before another fence opens at line {}",
                                    nested_line
                                ),
                            });
                            orphan = Some(fence);
                            cursor = offset;
                            continue 'scan;
                        }
                    }
                }

                _ => {}
            }
        }

        break;
    }

    extraction
}

/// Parse fence info string into language and flags
/// Examples:
/// - "rust" -> ("rust", [])
/// - "rust,ignore" -> ("rust", ["ignore"])
/// - "rust no_run" -> ("rust", ["no_run"])
fn parse_fence_info(info: &str) -> (String, Vec<String>) {
    let mut parts = info
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty());

    let language = parts.next().unwrap_or_default().to_string();
    let flags = parts.map(str::to_string).collect();

    (language, flags)
}

fn inspect_fence(content: &str, range: Range<usize>) -> FenceShape {
    let raw = &content[range.clone()];
    let lines: Vec<(usize, &str)> = line_spans(raw).collect();

    let Some(&(_, opening)) = lines.first() else {
        return FenceShape::Unterminated;
    };
    let Some((fence_char, fence_len)) = fence_marker(opening) else {
        return FenceShape::Closed;
    };

    let body = &lines[1..];
    let closed = body
        .last()
        .is_some_and(|&(_, line)| is_closing_fence(line, fence_char, fence_len));
    let inner = if closed { &body[..body.len() - 1] } else { body };

    if let Some(&(offset, _)) = inner
        .iter()
        .find(|&&(_, line)| is_opening_fence(line, fence_char, fence_len))
    {
        return FenceShape::Nested {
            offset: range.start + offset,
            fence: (fence_char, fence_len),
        };
    }

    if closed {
        FenceShape::Closed
    } else {
        FenceShape::Unterminated
    }
}

/// Offset just past a bare closing fence that follows `from`, with only
/// blank lines in between.
fn orphaned_closer(content: &str, from: usize, fence_char: char, fence_len: usize) -> Option<usize> {
    let rest = content.get(from..)?;
    let (offset, line) = line_spans(rest).find(|(_, line)| !line.trim().is_empty())?;
    if !is_closing_fence(line, fence_char, fence_len) {
        return None;
    }
    let line_end = rest[offset..].find('\n').map_or(rest.len(), |i| offset + i + 1);
    Some(from + line_end)
}

/// Lines of `text` with their byte offsets, line terminators stripped.
fn line_spans(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_inclusive('\n').scan(0, |offset, line| {
        let start = *offset;
        *offset += line.len();
        Some((start, line.trim_end_matches(['\n', '\r'])))
    })
}

/// Strips indentation and block quote markers.
fn strip_container(line: &str) -> &str {
    line.trim_start_matches([' ', '\t', '>'])
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let start = line.find(['`', '~'])?;
    let fence_char = line[start..].chars().next()?;
    let len = line[start..].chars().take_while(|&c| c == fence_char).count();
    (len >= 3).then_some((fence_char, len))
}

fn is_closing_fence(line: &str, fence_char: char, fence_len: usize) -> bool {
    let trimmed = strip_container(line).trim_end();
    trimmed.chars().count() >= fence_len && trimmed.chars().all(|c| c == fence_char)
}

fn is_opening_fence(line: &str, fence_char: char, fence_len: usize) -> bool {
    let trimmed = strip_container(line);
    let run = trimmed.chars().take_while(|&c| c == fence_char).count();
    if run < fence_len {
        return false;
    }
    let info = trimmed[run * fence_char.len_utf8()..].trim();
    info.chars().next().is_some_and(char::is_alphanumeric)
        && !(fence_char == '`' && info.contains('`'))
}

/// Maps byte offsets to 1-based line numbers.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_code_block() {
        let markdown = r#"
# Test

```rust
fn main() {
    println!("hi");
}
```
"#;

        let extraction = extract_code_blocks(markdown);
        assert_eq!(extraction.blocks.len(), 1);
        assert!(extraction.malformed.is_empty());

        let block = &extraction.blocks[0];
        assert_eq!(block.language, "rust");
        assert!(block.flags.is_empty());
        assert!(!block.skipped());
        assert!(block.code.contains("fn main()"));
        assert_eq!(block.start_line, 4);
        assert_eq!(block.end_line, 8);
        assert_eq!(block.document_line(1), 5);
    }

    #[test]
    fn test_blocks_are_in_document_order() {
        let markdown = "```json\n{}\n```\n\ntext\n\n~~~toml\na = 1\n~~~\n\n```\nplain\n```\n";

        let extraction = extract_code_blocks(markdown);
        let languages: Vec<_> = extraction
            .blocks
            .iter()
            .map(|b| b.language.as_str())
            .collect();
        assert_eq!(languages, vec!["json", "toml", ""]);
        assert_eq!(extraction.blocks[1].start_line, 7);
        assert!(extraction.malformed.is_empty());
    }

    #[test]
    fn test_extract_with_ignore_flag() {
        let markdown = r#"
```rust,ignore
This is ignored
```

```rust compile_fail
let x: u8 = "nope";
```
"#;

        let extraction = extract_code_blocks(markdown);
        assert_eq!(extraction.blocks.len(), 2);
        assert!(extraction.blocks.iter().all(CodeBlock::skipped));
    }

    #[test]
    fn test_indented_code_is_not_extracted() {
        let markdown = "Paragraph\n\n    let x = 1;\n\nMore\n";
        let extraction = extract_code_blocks(markdown);
        assert!(extraction.blocks.is_empty());
        assert!(extraction.malformed.is_empty());
    }

    #[test]
    fn test_unterminated_fence_at_end() {
        let markdown = "# Title\n\n```rust\nfn main() {}\n";
        let extraction = extract_code_blocks(markdown);
        assert!(extraction.blocks.is_empty());
        assert_eq!(extraction.malformed.len(), 1);
        assert_eq!(extraction.malformed[0].line, 3);
    }

    #[test]
    fn test_unterminated_fence_resumes_at_next_fence() {
        let markdown = r#"```rust
fn broken() {

Some prose that was meant to follow the block.

```json
{"ok": true}
```

```toml
a = 1
```
"#;

        let extraction = extract_code_blocks(markdown);
        assert_eq!(extraction.malformed.len(), 1);
        assert_eq!(extraction.malformed[0].line, 1);

        let languages: Vec<_> = extraction
            .blocks
            .iter()
            .map(|b| b.language.as_str())
            .collect();
        assert_eq!(languages, vec!["json", "toml"]);
        assert_eq!(extraction.blocks[0].start_line, 6);
        assert_eq!(extraction.blocks[0].code, "{\"ok\": true}\n");
    }

    #[test]
    fn test_same_length_inner_fence_is_reported_once() {
        let markdown = "Intro\n\n```markdown\n```rust\nfn main() {}\n```\n```\n\nMore\n\n```json\n{}\n```\n";

        let extraction = extract_code_blocks(markdown);
        assert_eq!(extraction.malformed.len(), 1);
        assert_eq!(extraction.malformed[0].line, 3);
        assert!(extraction.malformed[0].reason.contains("line 4"));

        let blocks: Vec<_> = extraction
            .blocks
            .iter()
            .map(|b| (b.language.as_str(), b.start_line))
            .collect();
        assert_eq!(blocks, vec![("rust", 4), ("json", 11)]);
    }

    #[test]
    fn test_longer_outer_fence_may_contain_shorter_fences() {
        let markdown = "````markdown\n```rust\nfn main() {}\n```\n````\n";
        let extraction = extract_code_blocks(markdown);
        assert!(extraction.malformed.is_empty());
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].language, "markdown");
        assert!(extraction.blocks[0].code.contains("```rust"));
    }

    #[test]
    fn test_block_inside_blockquote() {
        let markdown = "> ```json\n> [1, 2]\n> ```\n";
        let extraction = extract_code_blocks(markdown);
        assert!(extraction.malformed.is_empty());
        assert_eq!(extraction.blocks.len(), 1);
        assert_eq!(extraction.blocks[0].code, "[1, 2]\n");
    }

    #[test]
    fn test_parse_fence_info() {
        let (lang, flags) = parse_fence_info("rust");
        assert_eq!(lang, "rust");
        assert!(flags.is_empty());

        let (lang, flags) = parse_fence_info("typescript,ignore");
        assert_eq!(lang, "typescript");
        assert_eq!(flags, vec!["ignore"]);

        let (lang, flags) = parse_fence_info("rust  no_run, edition2021");
        assert_eq!(lang, "rust");
        assert_eq!(flags, vec!["no_run", "edition2021"]);

        let (lang, flags) = parse_fence_info("");
        assert_eq!(lang, "");
        assert!(flags.is_empty());
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("a\nbc\n\nd");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(1), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.line_of(6), 4);
    }
}
