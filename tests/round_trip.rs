use pierre::{clean, evaluate};
use pretty_assertions::assert_eq;

const DOCUMENT: &str = "# Is the die loaded?

A fair die shows a six with probability `p = 1/6`, a loaded one `q = 0.5`.

    @priors
    fair: 9
    loaded: 1

---

We roll once.

    @evidence: six
    fair: p
    loaded: q

And once more, with `p * q` as a sanity check.

\t@evidence: not six
\tfair: 1 - p
\tloaded: 1 - q
";

#[test]
fn clean_undoes_evaluate() {
    let (annotated, _) = evaluate(&clean(DOCUMENT)).expect("evaluates");
    assert_ne!(annotated, DOCUMENT);
    let (again, _) = evaluate(&clean(&annotated)).expect("evaluates again");
    assert_eq!(again, annotated);
    assert_eq!(clean(&again), clean(&annotated));
}

#[test]
fn clean_of_plain_text_is_identity() {
    let text = "No code here, only [a link](x.md) and [brackets].\n";
    assert_eq!(clean(text), text);
}

#[test]
fn already_annotated_input_is_cleaned_back() {
    let annotated = "`x = 1/4 [0.25]`\n\n    @priors\n    A: 1 [0.5]\n    B: 1 [0.5]\n\n    @evidence\n    A: x [0.5 ==0.25==> 0.25]\n    B: 0.75 [0.5 ==0.75==> 0.75]\n";
    let plain = "`x = 1/4`\n\n    @priors\n    A: 1\n    B: 1\n\n    @evidence\n    A: x\n    B: 0.75\n";
    assert_eq!(clean(annotated), plain);
    let (evaluated, _) = evaluate(plain).expect("evaluates");
    assert_eq!(evaluated, annotated);
}

#[test]
fn evaluating_without_cleaning_keeps_old_annotations_in_text() {
    let (once, _) = evaluate("`1 + 1`").expect("evaluates");
    assert_eq!(once, "`1 + 1 [2]`");
    assert!(evaluate(&once).is_err());
}

#[test]
fn whitespace_only_line_inside_a_block_survives_a_rerun() {
    let text = "    @priors\n    A: 1\n    \n    B: 1\n\n    @evidence\n    A: 0.2\n    \n    B: 0.6\n";
    let (once, first) = evaluate(&clean(text)).expect("evaluates");
    let (twice, second) = evaluate(&clean(&once)).expect("evaluates again");
    assert_eq!(twice, once);
    assert_eq!(second, first);
    assert_eq!(second.names().collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(clean(&once), text);
}
