//! Evaluation of a whole document.
//!
//! Chunks are evaluated strictly in document order against one [`Environment`] and
//! one [`HypothesisTable`]. Each evaluated chunk yields an edit (original span plus
//! replacement text); the edits are applied in one pass at the end, last span first,
//! so no offset ever has to be corrected for earlier replacements.

use std::ops::Range;

use tracing::{debug, info};

use crate::annotation;
use crate::bayes;
use crate::chunk::{self, Chunk, ChunkKind};
use crate::error::{PierreError, Result};
use crate::expression::{self, Environment};
use crate::hypothesis::HypothesisTable;

/// Knobs of the evaluation engine. The defaults are what documents are written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    /// Decimal places probabilities are rounded to.
    pub precision: usize,
    /// Spaces evaluated blocks are re-indented with.
    pub block_indent: usize,
}
impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            precision: 6,
            block_indent: 4,
        }
    }
}

#[derive(Debug)]
struct Edit {
    span: Range<usize>,
    replacement: String,
}

// ------------- Document -------------
/// State of a single evaluation run. A `Document` is consumed by
/// [`Document::evaluate`], so every run starts from empty bindings and hypotheses.
#[derive(Debug, Default)]
pub struct Document {
    environment: Environment,
    hypotheses: HypothesisTable,
    options: EvalOptions,
}
impl Document {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_options(options: EvalOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }
    /// Evaluates every chunk of `text` and returns the annotated text together with
    /// the final hypothesis table. The first failing chunk aborts the run.
    ///
    /// Annotations already present are not removed; run [`clean`] first.
    pub fn evaluate(mut self, text: &str) -> Result<(String, HypothesisTable)> {
        let chunks = chunk::extract(text)?;
        let mut edits = Vec::new();
        for chunk in &chunks {
            if let Some(replacement) = self.evaluate_chunk(chunk)? {
                edits.push(Edit {
                    span: chunk.span(),
                    replacement,
                });
            }
        }
        let annotated = apply(text, edits)?;
        info!(
            chunks = chunks.len(),
            bindings = self.environment.len(),
            hypotheses = self.hypotheses.len(),
            updates = self.hypotheses.depth().unwrap_or(0).saturating_sub(1),
            "document evaluated"
        );
        Ok((annotated, self.hypotheses))
    }

    fn evaluate_chunk(&mut self, chunk: &Chunk) -> Result<Option<String>> {
        match chunk.kind() {
            ChunkKind::Inline => {
                let source = chunk.source();
                let outcome = expression::evaluate(source, &mut self.environment)
                    .map_err(|e| e.at_line(chunk.line()))?;
                debug!(line = chunk.line(), source, value = outcome.value, "inline chunk");
                if outcome.literal {
                    return Ok(None);
                }
                Ok(Some(annotation::annotate(source, &annotation::value(outcome.value))))
            }
            ChunkKind::Block => {
                let dedented = chunk::dedent(chunk.source());
                // whitespace-only lines can open a run; they are kept as they are
                let lead: usize = dedented
                    .split_inclusive('\n')
                    .take_while(|l| l.trim().is_empty())
                    .map(str::len)
                    .sum();
                let (blank, block) = dedented.split_at(lead);
                if block.is_empty() {
                    return Ok(None);
                }
                let first_line = chunk.line() + blank.matches('\n').count();
                if !block.trim_start().starts_with('@') {
                    return Err(PierreError::parse(
                        "indented block must start with '@priors' or '@evidence'",
                    )
                    .at_line(first_line));
                }
                let evaluated = bayes::evaluate_block(
                    block,
                    first_line,
                    &self.environment,
                    &mut self.hypotheses,
                    self.options.precision,
                )?;
                Ok(Some(chunk::indent_block(
                    &format!("{blank}{evaluated}"),
                    self.options.block_indent,
                )))
            }
        }
    }
}

/// Evaluates `text` with default options.
pub fn evaluate(text: &str) -> Result<(String, HypothesisTable)> {
    Document::new().evaluate(text)
}

/// Strips every annotation from `text`, restoring the form it had before evaluation.
pub fn clean(text: &str) -> String {
    annotation::strip(text)
}

// edits arrive in ascending span order
fn apply(text: &str, edits: Vec<Edit>) -> Result<String> {
    if let Some(pair) = edits.windows(2).find(|w| w[0].span.end > w[1].span.start) {
        return Err(PierreError::Invariant(format!(
            "overlapping edits at {:?} and {:?}",
            pair[0].span, pair[1].span
        )));
    }
    let mut out = text.to_string();
    for edit in edits.into_iter().rev() {
        out.replace_range(edit.span, &edit.replacement);
    }
    Ok(out)
}
