use pierre::evaluate;
use pierre::export::{export, ExportFormat};
use pierre::render::{render, OutputFormat, RenderStyle};
use pretty_assertions::assert_eq;

const COIN: &str = "# Coin

Rolling `x = 2 * 3`.

    @priors
    A: 0.6
    B: 0.4

    @evidence: six
    A: 0.3
    B: 0.6
";

fn annotated() -> (String, pierre::HypothesisTable) {
    evaluate(COIN).expect("evaluates")
}

#[test]
fn json_export_lists_histories_in_declaration_order() {
    let (_, hypotheses) = annotated();
    let json = export(&hypotheses, ExportFormat::Json).expect("exports");
    assert!(json.ends_with('\n'));
    assert!(json.find("\"A\"").unwrap() < json.find("\"B\"").unwrap());

    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let a: Vec<f64> = serde_json::from_value(value["A"].clone()).unwrap();
    let b: Vec<f64> = serde_json::from_value(value["B"].clone()).unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(a[0], 0.6);
    assert_eq!(b[0], 0.4);
    assert!((a[1] - 0.428571).abs() < 1e-6);
    assert!((b[1] - 0.571429).abs() < 1e-6);
}

#[test]
fn yaml_export_has_the_same_content() {
    let (_, hypotheses) = annotated();
    let yaml = export(&hypotheses, ExportFormat::Yaml).expect("exports");
    let parsed: std::collections::BTreeMap<String, Vec<f64>> =
        serde_yaml::from_str(&yaml).expect("valid yaml");
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed["A"][0], 0.6);
    assert!((parsed["B"][1] - 0.571429).abs() < 1e-6);
}

#[test]
fn empty_table_exports_an_empty_map() {
    let (_, hypotheses) = evaluate("nothing to see").expect("evaluates");
    assert_eq!(export(&hypotheses, ExportFormat::Json).unwrap(), "{}\n");
}

#[test]
fn html_shows_tables_and_rounded_values() {
    let (text, _) = annotated();
    let html = render(&text, OutputFormat::Html, RenderStyle::default(), Some("body { margin: 0 }")).unwrap();
    assert!(html.contains("<title>Coin</title>"));
    assert!(html.contains("<style>body { margin: 0 }</style>"));
    assert!(html.contains("MathJax"));
    assert!(html.contains("<p>Rolling 6.</p>"));
    assert!(html.contains("<tr><td>A</td><td>60.0%</td></tr>"));
    assert!(html.contains("<strong>Evidence: six</strong>"));
    assert!(html.contains("<th>Likelihood of being six</th>"));
    assert!(html.contains("<tr><td>A</td><td>60.0%</td><td>30.0%</td><td>42.9%</td></tr>"));
    assert!(html.contains("<tr><td>B</td><td>40.0%</td><td>60.0%</td><td>57.1%</td></tr>"));
}

#[test]
fn tex_escapes_percent_signs() {
    let (text, _) = annotated();
    let tex = render(&text, OutputFormat::Tex, RenderStyle::default(), None).unwrap();
    assert!(tex.starts_with("\\documentclass{article}"));
    assert!(tex.contains("\\title{Coin}"));
    assert!(tex.contains("A & 60.0\\%"));
    assert!(tex.contains("B & 40.0\\% & 60.0\\% & 57.1\\%"));
    assert!(tex.contains("\\textbf{Evidence: six}"));
    assert!(tex.trim_end().ends_with("\\end{document}"));
}

#[test]
fn negated_labels_change_the_likelihood_heading() {
    let text = "    @priors\n    A: 1 [0.5]\n    B: 1 [0.5]\n\n    @evidence: not wet\n    A: 0.5 [0.5 ==0.5==> 0.5]\n    B: 0.5 [0.5 ==0.5==> 0.5]\n";
    let html = render(text, OutputFormat::Html, RenderStyle::default(), None).unwrap();
    assert!(html.contains("<th>Likelihood of not being wet</th>"));
}

#[test]
fn plain_indented_text_is_verbatim() {
    let html = render("Code:\n\n    a < b\n", OutputFormat::Html, RenderStyle::default(), None).unwrap();
    assert!(html.contains("<pre><code>a &lt; b</code></pre>"));
}

#[test]
fn custom_digits() {
    let (text, _) = annotated();
    let style = RenderStyle { percent_digits: 0, value_digits: 1 };
    let html = render(&text, OutputFormat::Html, style, None).unwrap();
    assert!(html.contains("<td>43%</td>"));
}
