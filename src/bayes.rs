//! `@priors` and `@evidence` blocks.
//!
//! Both kinds are a header line followed by `name: expression` lines. The handlers
//! are stateless; everything they change lives in the [`HypothesisTable`] shared by
//! the whole document run.
//!
//! ```text
//! @priors
//! fair: 0.9
//! loaded: 1 - 0.9
//!
//! @evidence: six
//! fair: 1/6
//! loaded: 1/2
//! ```

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use crate::annotation::{self, EvidenceAnnotation};
use crate::error::{PierreError, Result};
use crate::expression::{self, Environment};
use crate::hypothesis::HypothesisTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Priors,
    Evidence,
}
impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BlockKind::Priors => write!(f, "@priors"),
            BlockKind::Evidence => write!(f, "@evidence"),
        }
    }
}

// ------------- BlockHeader -------------
/// `@kind` optionally followed by `: label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    kind: BlockKind,
    label: Option<String>,
}
impl BlockHeader {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (keyword, label) = match line.split_once(':') {
            Some((keyword, label)) => (keyword.trim(), Some(label.trim())),
            None => (line, None),
        };
        let keyword = keyword.split_whitespace().next().unwrap_or(keyword);
        let kind = match keyword {
            "@priors" => BlockKind::Priors,
            "@evidence" => BlockKind::Evidence,
            other => {
                return Err(PierreError::UnknownBlock(
                    other.trim_start_matches('@').to_string(),
                ));
            }
        };
        Ok(Self {
            kind,
            label: label.filter(|l| !l.is_empty()).map(str::to_string),
        })
    }
    pub fn kind(&self) -> BlockKind {
        self.kind
    }
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
    /// The label split into its subject and whether it is phrased as `not <subject>`.
    pub fn subject(&self) -> Option<(&str, bool)> {
        let label = self.label.as_deref()?;
        Some(match label.strip_prefix("not ") {
            Some(subject) => (subject.trim(), true),
            None => (label, false),
        })
    }
}

/// Splits a `name: expression` line.
pub fn split_line(line: &str) -> Result<(&str, &str)> {
    let (name, expression) = line
        .split_once(':')
        .ok_or_else(|| PierreError::parse(format!("expected 'name: expression', found '{}'", line.trim())))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(PierreError::parse(format!("missing hypothesis name in '{}'", line.trim())));
    }
    Ok((name, expression))
}

struct Entry<'b> {
    index: usize, // position among the block's body lines
    line: &'b str,
    name: &'b str,
    expression: &'b str,
    value: f64,
}

/// Evaluates one dedented block and returns it with every line annotated.
///
/// `first_line` is the document line of the header, used to locate errors.
pub fn evaluate_block(
    block: &str,
    first_line: usize,
    environment: &Environment,
    hypotheses: &mut HypothesisTable,
    precision: usize,
) -> Result<String> {
    let (body, newline) = match block.strip_suffix('\n') {
        Some(body) => (body, "\n"),
        None => (block, ""),
    };
    let mut lines = body.split('\n');
    let header_line = lines.next().unwrap_or_default();
    let header = BlockHeader::parse(header_line).map_err(|e| e.at_line(first_line))?;
    let body: Vec<&str> = lines.collect();

    let mut entries = Vec::new();
    for (index, &line) in body.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let at = |e: PierreError| e.at_line(first_line + 1 + index);
        let (name, expression) = split_line(line).map_err(at)?;
        let value = expression::evaluate_expression(expression, environment).map_err(at)?;
        entries.push(Entry {
            index,
            line,
            name,
            expression,
            value: expression::round(value, precision),
        });
    }
    if entries.is_empty() {
        return Err(PierreError::parse(format!("{} block has no entries", header.kind())).at_line(first_line));
    }

    let annotated = match header.kind() {
        BlockKind::Priors => priors(&entries, hypotheses, precision),
        BlockKind::Evidence => evidence(&entries, hypotheses, precision),
    }
    .map_err(|(index, e)| e.at_line(first_line + 1 + index))?;
    debug!(kind = %header.kind(), label = ?header.label(), entries = entries.len(), "evaluated block");

    let mut lines: Vec<String> = body.iter().map(|l| l.to_string()).collect();
    for (index, text) in annotated {
        lines[index] = text;
    }
    let mut out = String::from(header_line);
    for line in &lines {
        out.push('\n');
        out.push_str(line);
    }
    out.push_str(newline);
    Ok(out)
}

// errors carry the body line index they belong to
type Annotated = std::result::Result<Vec<(usize, String)>, (usize, PierreError)>;

fn priors(entries: &[Entry], hypotheses: &mut HypothesisTable, precision: usize) -> Annotated {
    let mut seen = HashSet::new();
    for entry in entries {
        if hypotheses.contains(entry.name) || !seen.insert(entry.name) {
            return Err((entry.index, PierreError::DuplicateHypothesis(entry.name.to_string())));
        }
    }
    if !hypotheses.is_empty() && hypotheses.depth() != Some(1) {
        return Err((entries[0].index, PierreError::LatePrior(entries[0].name.to_string())));
    }
    for entry in entries {
        hypotheses
            .declare(entry.name, entry.value)
            .map_err(|e| (entry.index, e))?;
    }
    hypotheses.normalize(None).map_err(|e| (entries[0].index, e))?;

    let mut annotated = Vec::new();
    for entry in entries {
        let prior = hypotheses.latest(entry.name).map_err(|e| (entry.index, e))?;
        let prior = expression::round(prior, precision);
        // a literal that survived normalization unchanged already shows its value
        if expression::is_literal(entry.expression) && prior == entry.value {
            annotated.push((entry.index, entry.line.to_string()));
        } else {
            annotated.push((entry.index, annotation::annotate(entry.line, &annotation::value(prior))));
        }
    }
    Ok(annotated)
}

fn evidence(entries: &[Entry], hypotheses: &mut HypothesisTable, precision: usize) -> Annotated {
    // validate everything before the table is touched
    let mut seen = HashSet::new();
    for entry in entries {
        if !hypotheses.contains(entry.name) {
            return Err((entry.index, PierreError::UnknownHypothesis(entry.name.to_string())));
        }
        if !seen.insert(entry.name) {
            return Err((entry.index, PierreError::DuplicateHypothesis(entry.name.to_string())));
        }
    }
    if let Some(missing) = hypotheses.names().find(|n| !seen.contains(n)) {
        let index = entries[entries.len() - 1].index;
        return Err((index, PierreError::MissingLikelihood(missing.to_string())));
    }

    let mut updates = Vec::new();
    for entry in entries {
        let prior = hypotheses.latest(entry.name).map_err(|e| (entry.index, e))?;
        let posterior = prior * entry.value;
        hypotheses
            .append(entry.name, posterior)
            .map_err(|e| (entry.index, e))?;
        updates.push((prior, posterior));
    }
    let total = hypotheses.normalize(None).map_err(|e| (entries[0].index, e))?;

    let annotated = entries
        .iter()
        .zip(updates)
        .map(|(entry, (prior, posterior))| {
            let shown = EvidenceAnnotation {
                prior: expression::round(prior, precision),
                likelihood: entry.value,
                posterior: expression::round(posterior / total, precision),
            };
            (entry.index, annotation::annotate(entry.line, &shown.to_string()))
        })
        .collect();
    Ok(annotated)
}
