//! The two annotation grammars written back into documents.
//!
//! * `[value]` follows an inline expression or a prior.
//! * `[prior ==likelihood==> posterior]` follows an evidence line.
//!
//! The renderer parses these byte for byte, so formatting and parsing live together
//! here. Numbers use the shortest round-trip `f64` display, which never switches to
//! exponent notation, so everything written here is also matched by [`strip`].

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // a single leading space belongs to the annotation, so stripping leaves no residue
    static ref RE_STRIP_VALUE: Regex = Regex::new(r" ?\[[-+]?\d+\.?\d*\]").unwrap();
    static ref RE_STRIP_EVIDENCE: Regex =
        Regex::new(r" ?\[[-+]?\d+\.?\d* ==[-+]?\d+\.?\d*==> [-+]?\d+\.?\d*\]").unwrap();
    static ref RE_VALUE: Regex = Regex::new(r"\[([-+]?\d+\.?\d*)\]").unwrap();
    static ref RE_EVIDENCE: Regex =
        Regex::new(r"\[([-+]?\d+\.?\d*) ==([-+]?\d+\.?\d*)==> ([-+]?\d+\.?\d*)\]").unwrap();
    static ref RE_TRAILING: Regex = Regex::new(r"[ =]").unwrap();
}

// ------------- Evidence -------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvidenceAnnotation {
    pub prior: f64,
    pub likelihood: f64,
    pub posterior: f64,
}
impl fmt::Display for EvidenceAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{} =={}==> {}]", self.prior, self.likelihood, self.posterior)
    }
}

/// `[value]`
pub fn value(value: f64) -> String {
    format!("[{value}]")
}

/// Appends an annotation to a line or inline expression.
pub fn annotate(text: &str, annotation: &str) -> String {
    format!("{text} {annotation}")
}

/// Removes every annotation from `text`.
pub fn strip(text: &str) -> String {
    let text = RE_STRIP_EVIDENCE.replace_all(text, "");
    RE_STRIP_VALUE.replace_all(&text, "").into_owned()
}

/// Reads the value shown by an inline expression or prior line.
///
/// Unannotated text is a bare literal, possibly behind `name =` or `name:`, so the
/// last word is taken instead.
pub fn parse_value(text: &str) -> Option<f64> {
    match RE_VALUE.captures(text) {
        Some(captures) => captures.get(1)?.as_str().parse().ok(),
        None => RE_TRAILING.split(text.trim()).last()?.parse().ok(),
    }
}

pub fn parse_evidence(text: &str) -> Option<EvidenceAnnotation> {
    let captures = RE_EVIDENCE.captures(text)?;
    let number = |i: usize| captures.get(i)?.as_str().parse::<f64>().ok();
    Some(EvidenceAnnotation {
        prior: number(1)?,
        likelihood: number(2)?,
        posterior: number(3)?,
    })
}
