//! Pierre – evaluate and document hypotheses and evidence using Bayes' rule.
//!
//! A Pierre document is plain text (usually Markdown) mixing prose with two kinds of
//! embedded code:
//! * Inline expressions between backticks, e.g. `` `p = 0.5 * 0.2` ``. They are plain
//!   arithmetic and may bind a name that later chunks can use.
//! * Indented blocks starting with `@priors` or `@evidence`, one `name: expression`
//!   line per hypothesis.
//!
//! Evaluation rewrites the document in place, appending the computed values as
//! annotations (`[value]` after expressions and priors,
//! `[prior ==likelihood==> posterior]` after evidence lines), and returns the
//! probability history of every hypothesis.
//!
//! ## Modules
//! * [`chunk`] – Finds the inline and block chunks of a document.
//! * [`expression`] – The arithmetic language and its [`expression::Environment`].
//! * [`hypothesis`] – The [`hypothesis::HypothesisTable`] and normalization.
//! * [`bayes`] – The `@priors` and `@evidence` block handlers.
//! * [`document`] – Runs a whole document and applies the resulting edits.
//! * [`annotation`] – Writes, strips and parses the annotation grammars.
//! * [`export`] – JSON / YAML export of hypothesis histories.
//! * [`render`] – HTML, TeX and PDF presentation of evaluated documents.
//! * [`settings`] – Configuration through the `config` crate.
//!
//! ## Re-running
//! The evaluator does not remove annotations it finds. To evaluate an already
//! evaluated document again, [`clean`] it first; `clean(evaluate(clean(d)))` gives
//! back `clean(d)`.
//!
//! ## Quick Start
//! ```
//! use pierre::{clean, evaluate};
//! let text = "Odds are `x = 2+2` to one.\n\n    @priors\n    fair: 0.6\n    loaded: 0.4\n\n    @evidence: six\n    fair: 0.3\n    loaded: 0.6\n";
//! let (annotated, hypotheses) = evaluate(&clean(text)).unwrap();
//! assert!(annotated.contains("`x = 2+2 [4]`"));
//! assert!(annotated.contains("fair: 0.3 [0.6 ==0.3==> 0.428571]"));
//! assert_eq!(hypotheses.get("loaded").unwrap().history().len(), 2);
//! assert_eq!(clean(&annotated), text);
//! ```

pub mod annotation;
pub mod bayes;
pub mod chunk;
pub mod document;
pub mod error;
pub mod export;
pub mod expression;
pub mod hypothesis;
pub mod render;
pub mod settings;

pub use document::{clean, evaluate, Document, EvalOptions};
pub use error::{PierreError, Result};
pub use hypothesis::HypothesisTable;
