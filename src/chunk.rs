//! Segmentation of a document into the code regions that get evaluated.
//!
//! Two kinds of region exist. Inline chunks are enclosed in a pair of backticks on a
//! single line; the chunk covers only the text between the fences. Block chunks are
//! maximal runs of consecutive lines indented by four spaces or a tab; the chunk
//! covers the whole run, indentation and trailing newline included.
//!
//! Extraction is pure: calling [`extract`] twice on the same text yields the same
//! chunks, always ordered by their start offset.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::error::{PierreError, Result};

lazy_static! {
    static ref RE_INLINE: Regex = Regex::new(r"`([^`\n]+)`").unwrap();
    static ref RE_INDENTED: Regex = Regex::new(r"^(?: {4}| *\t)").unwrap();
}

pub const FENCE: char = '`';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Inline,
    Block,
}

// ------------- Chunk -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<'t> {
    kind: ChunkKind,
    span: Range<usize>,
    source: &'t str,
    line: usize,
}
impl<'t> Chunk<'t> {
    pub fn kind(&self) -> ChunkKind {
        self.kind
    }
    /// Byte offsets into the original text.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }
    pub fn source(&self) -> &'t str {
        self.source
    }
    /// 1-based line the chunk starts on.
    pub fn line(&self) -> usize {
        self.line
    }
}

/// Splits `text` into inline and block chunks, sorted by ascending start offset.
///
/// A fenced span that sits on an indented line is rejected, as is a fence without a
/// partner on the same line.
pub fn extract(text: &str) -> Result<Vec<Chunk<'_>>> {
    let mut chunks = blocks(text);
    let block_spans: Vec<Range<usize>> = chunks.iter().map(Chunk::span).collect();
    let inside_block = |offset: usize| block_spans.iter().any(|b| b.contains(&offset));

    let mut fences = Vec::new();
    for captures in RE_INLINE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if inside_block(whole.start()) {
            let (line, col) = line_col(text, whole.start());
            return Err(PierreError::Parse {
                message: format!("inline code `{}` inside an indented block", inner.as_str()),
                line: Some(line),
                col: Some(col),
            });
        }
        fences.push(whole.start());
        fences.push(whole.end() - 1);
        chunks.push(Chunk {
            kind: ChunkKind::Inline,
            span: inner.range(),
            source: inner.as_str(),
            line: line_col(text, inner.start()).0,
        });
    }

    for (offset, _) in text.match_indices(FENCE) {
        if !inside_block(offset) && !fences.contains(&offset) {
            let (line, col) = line_col(text, offset);
            return Err(PierreError::Parse {
                message: "unmatched '`' fence".into(),
                line: Some(line),
                col: Some(col),
            });
        }
    }

    chunks.sort_by_key(|c| c.span.start);
    debug!(chunks = chunks.len(), blocks = block_spans.len(), "extracted chunks");
    Ok(chunks)
}

fn blocks(text: &str) -> Vec<Chunk<'_>> {
    let mut blocks = Vec::new();
    let mut run: Option<(usize, usize)> = None; // (start offset, start line)
    let mut offset = 0;
    for (index, line) in text.split_inclusive('\n').enumerate() {
        if is_indented(line) {
            run.get_or_insert((offset, index + 1));
        } else if let Some((start, first_line)) = run.take() {
            blocks.push(block(text, start..offset, first_line));
        }
        offset += line.len();
    }
    if let Some((start, first_line)) = run {
        blocks.push(block(text, start..offset, first_line));
    }
    blocks
}

fn block(text: &str, span: Range<usize>, line: usize) -> Chunk<'_> {
    Chunk {
        kind: ChunkKind::Block,
        source: &text[span.clone()],
        span,
        line,
    }
}

pub fn is_indented(line: &str) -> bool {
    RE_INDENTED.is_match(line)
}

/// 1-based line and column (in characters) of a byte offset.
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count() + 1)
}

/// Removes the whitespace prefix common to every non-blank line.
/// Whitespace-only lines come out empty.
pub fn dedent(text: &str) -> String {
    let mut margin: Option<&str> = None;
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let indent = &line[..line.len() - line.trim_start().len()];
        margin = Some(match margin {
            None => indent,
            Some(m) => {
                let common = m
                    .char_indices()
                    .zip(indent.chars())
                    .find(|((_, a), b)| a != b)
                    .map_or(m.len().min(indent.len()), |((i, _), _)| i);
                &m[..common]
            }
        });
    }
    let margin = margin.unwrap_or("");
    text.split_inclusive('\n')
        .map(|line| {
            if line.trim().is_empty() {
                if line.ends_with('\n') { "\n" } else { "" }
            } else {
                line.strip_prefix(margin).unwrap_or(line)
            }
        })
        .collect()
}

/// Prefixes every non-blank line with `width` spaces.
pub fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.split_inclusive('\n')
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect()
}

/// Re-indents a dedented block by `width` spaces. Whitespace-only lines get the bare
/// indentation so they keep the run together when the text is read again.
pub fn indent_block(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.split_inclusive('\n')
        .map(|line| {
            let newline = if line.ends_with('\n') { "\n" } else { "" };
            if line.trim().is_empty() {
                format!("{pad}{newline}")
            } else {
                format!("{pad}{line}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_and_block_chunks_come_out_in_document_order() {
        let text = "Let `x = 1` be.\n\n    @priors\n    A: 1\n\nThen `x`.\n";
        let chunks = extract(text).unwrap();
        let kinds: Vec<ChunkKind> = chunks.iter().map(Chunk::kind).collect();
        assert_eq!(kinds, vec![ChunkKind::Inline, ChunkKind::Block, ChunkKind::Inline]);
        assert_eq!(chunks[0].source(), "x = 1");
        assert_eq!(chunks[1].source(), "    @priors\n    A: 1\n");
        assert_eq!(chunks[1].line(), 3);
        assert_eq!(chunks[2].source(), "x");
    }

    #[test]
    fn tab_indented_lines_form_a_block() {
        let chunks = extract("intro\n\t@priors\n  \tA: 1\nend").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source(), "\t@priors\n  \tA: 1\n");
    }

    #[test]
    fn block_at_end_without_newline() {
        let chunks = extract("text\n    @priors\n    A: 1").unwrap();
        assert_eq!(chunks[0].source(), "    @priors\n    A: 1");
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "`a = 2` and `a * 3`\n    @priors\n    H: a\n";
        assert_eq!(extract(text).unwrap(), extract(text).unwrap());
    }

    #[test]
    fn unmatched_fence_is_rejected() {
        let err = extract("one `two\nthree` four").unwrap_err();
        assert!(matches!(err, PierreError::Parse { line: Some(1), col: Some(5), .. }));
    }

    #[test]
    fn inline_span_inside_block_is_rejected() {
        let err = extract("text\n    @priors\n    A: `1`\n").unwrap_err();
        assert!(matches!(err, PierreError::Parse { line: Some(3), .. }));
    }

    #[test]
    fn dedent_keeps_relative_indentation() {
        assert_eq!(dedent("    a\n        b\n    \n"), "a\n    b\n\n");
        assert_eq!(dedent("\ta\n\tb"), "a\nb");
    }

    #[test]
    fn indent_skips_blank_lines() {
        assert_eq!(indent("a\n\nb\n", 4), "    a\n\n    b\n");
    }

    #[test]
    fn reindented_blocks_stay_one_run() {
        let block = indent_block(&dedent("    @priors\n    A: 1\n    \n    B: 1\n"), 4);
        assert_eq!(block, "    @priors\n    A: 1\n    \n    B: 1\n");
        let chunks = extract(&block).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source(), block);
    }
}
