//! Presentation of an evaluated document as HTML, TeX or PDF.
//!
//! The renderer reads only annotated text: computed values are recovered from the
//! annotation grammars, never recomputed. The document subset understood here is
//! what the evaluator works with: `#` headings, paragraphs, `---` rules, inline code
//! spans and indented blocks. `@priors` and `@evidence` blocks become tables; any
//! other indented text is shown verbatim.
//!
//! Both output formats share the segmentation and annotation parsing below and only
//! differ in their [`Renderer`] strategy. PDF is the TeX output run through `pdflatex`.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use clap::ValueEnum;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::annotation::{self, EvidenceAnnotation};
use crate::bayes::{self, BlockHeader, BlockKind};
use crate::chunk;
use crate::error::{PierreError, Result};
use crate::expression;

lazy_static! {
    static ref RE_CODE_SPAN: Regex = Regex::new(r"`([^`\n]+)`").unwrap();
    static ref RE_HEADING: Regex = Regex::new(r"^(#{1,6})\s*(.+?)\s*#*\s*$").unwrap();
    static ref RE_RULE: Regex = Regex::new(r"^\s*(?:-{3,}|\*{3,}|_{3,})\s*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Tex,
    /// TeX typeset with `pdflatex`; needs an output file.
    Pdf,
}
impl OutputFormat {
    /// Guesses the format from a file suffix.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(Self::Html),
            "tex" => Some(Self::Tex),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
    pub fn renderer(self, style: RenderStyle) -> Box<dyn Renderer> {
        match self {
            Self::Html => Box::new(HtmlRenderer { style }),
            Self::Tex | Self::Pdf => Box::new(TexRenderer { style }),
        }
    }
}

/// Number formatting used in rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStyle {
    /// Decimal places of percentages in tables.
    pub percent_digits: usize,
    /// Decimal places of inline values.
    pub value_digits: usize,
}
impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            percent_digits: 1,
            value_digits: 2,
        }
    }
}
impl RenderStyle {
    pub fn percent(&self, value: f64) -> String {
        format!("{:.*}%", self.percent_digits, value * 100.0)
    }
    pub fn value(&self, value: f64) -> String {
        expression::round(value, self.value_digits).to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriorRow {
    pub hypothesis: String,
    pub prior: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceRow {
    pub hypothesis: String,
    pub update: EvidenceAnnotation,
}

/// One output format.
pub trait Renderer {
    fn style(&self) -> &RenderStyle;
    fn escape(&self, text: &str) -> String;
    fn heading(&self, level: usize, text: &str) -> String;
    fn paragraph(&self, text: &str) -> String;
    fn rule(&self) -> String;
    /// A code span whose value could not be recovered.
    fn code(&self, text: &str) -> String;
    fn verbatim(&self, text: &str) -> String;
    fn priors(&self, rows: &[PriorRow]) -> String;
    fn evidence(&self, header: &BlockHeader, rows: &[EvidenceRow]) -> String;
    fn page(&self, title: &str, body: &str, stylesheet: Option<&str>) -> String;

    /// Shows the value computed for an inline expression.
    fn code_span(&self, text: &str) -> String {
        match annotation::parse_value(text) {
            Some(value) => self.escape(&self.style().value(value)),
            None => self.code(text),
        }
    }
}

/// Takes the first `#` heading as the title and returns it with the remaining text.
pub fn extract_title(text: &str) -> (Option<String>, String) {
    let mut title = None;
    let mut rest = Vec::new();
    for line in text.lines() {
        if title.is_none() {
            if let Some(heading) = line.trim().strip_prefix('#').filter(|h| !h.starts_with('#')) {
                title = Some(heading.trim().to_string());
                continue;
            }
        }
        rest.push(line);
    }
    // leading indentation may open a block, so only whole blank lines are dropped
    (title, rest.join("\n").trim_start_matches('\n').trim_end().to_string())
}

/// Renders an evaluated document.
pub fn render(text: &str, format: OutputFormat, style: RenderStyle, stylesheet: Option<&str>) -> Result<String> {
    let renderer = format.renderer(style);
    let (title, body) = extract_title(text);
    let body = render_body(renderer.as_ref(), &body)?;
    Ok(renderer.page(title.as_deref().unwrap_or_default(), &body, stylesheet))
}

/// Typesets rendered TeX with `pdflatex` in a scratch directory and copies the PDF
/// to `output`.
pub fn write_pdf(latex: &str, output: &Path) -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("document.tex"), latex)?;
    let status = Command::new("pdflatex")
        .args(["-interaction=nonstopmode", "-halt-on-error", "document.tex"])
        .current_dir(dir.path())
        .stdout(Stdio::null())
        .status()
        .map_err(|e| PierreError::Render(format!("cannot run pdflatex: {e}")))?;
    if !status.success() {
        return Err(PierreError::Render(format!("pdflatex failed ({status})")));
    }
    fs::copy(dir.path().join("document.pdf"), output)?;
    debug!(output = %output.display(), "pdf written");
    Ok(())
}

fn render_body(renderer: &dyn Renderer, text: &str) -> Result<String> {
    let mut out = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let flush_paragraph = |paragraph: &mut Vec<&str>, out: &mut Vec<String>| {
        if !paragraph.is_empty() {
            out.push(renderer.paragraph(&inline(renderer, &paragraph.join("\n"))));
            paragraph.clear();
        }
    };

    for (index, line) in text.lines().enumerate() {
        if chunk::is_indented(line) {
            flush_paragraph(&mut paragraph, &mut out);
            block.push(line);
            continue;
        }
        if !block.is_empty() {
            out.push(render_block(renderer, &block, index)?);
            block.clear();
        }
        if line.trim().is_empty() {
            flush_paragraph(&mut paragraph, &mut out);
        } else if RE_RULE.is_match(line) {
            flush_paragraph(&mut paragraph, &mut out);
            out.push(renderer.rule());
        } else if let Some(captures) = RE_HEADING.captures(line) {
            flush_paragraph(&mut paragraph, &mut out);
            let level = captures.get(1).map_or(1, |m| m.as_str().len());
            let title = captures.get(2).map_or("", |m| m.as_str());
            out.push(renderer.heading(level, &inline(renderer, title)));
        } else {
            paragraph.push(line);
        }
    }
    if !block.is_empty() {
        out.push(render_block(renderer, &block, text.lines().count())?);
    }
    flush_paragraph(&mut paragraph, &mut out);
    Ok(out.join("\n"))
}

// `end` is the 0-based index of the line after the block
fn render_block(renderer: &dyn Renderer, lines: &[&str], end: usize) -> Result<String> {
    let first_line = end - lines.len() + 1;
    let dedented = chunk::dedent(&lines.join("\n"));
    let mut body = dedented.lines().skip_while(|l| l.trim().is_empty());
    let Some(header_line) = body.next().filter(|l| l.trim_start().starts_with('@')) else {
        return Ok(renderer.verbatim(dedented.trim_end()));
    };
    let header = BlockHeader::parse(header_line).map_err(|e| e.at_line(first_line))?;
    let entries = body
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| bayes::split_line(l).ok());
    match header.kind() {
        BlockKind::Priors => {
            let rows = entries
                .map(|(name, rest)| -> Result<PriorRow> {
                    let prior = annotation::parse_value(rest).ok_or_else(|| {
                        PierreError::parse(format!("no evaluated prior for '{name}'")).at_line(first_line)
                    })?;
                    Ok(PriorRow { hypothesis: name.to_string(), prior })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(renderer.priors(&rows))
        }
        BlockKind::Evidence => {
            let rows = entries
                .map(|(name, rest)| -> Result<EvidenceRow> {
                    let update = annotation::parse_evidence(rest).ok_or_else(|| {
                        PierreError::parse(format!("no evaluated update for '{name}'")).at_line(first_line)
                    })?;
                    Ok(EvidenceRow { hypothesis: name.to_string(), update })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(renderer.evidence(&header, &rows))
        }
    }
}

fn inline(renderer: &dyn Renderer, text: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for captures in RE_CODE_SPAN.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        out.push_str(&renderer.escape(&text[last..whole.start()]));
        out.push_str(&renderer.code_span(inner.as_str()));
        last = whole.end();
    }
    out.push_str(&renderer.escape(&text[last..]));
    out
}

fn likelihood_heading(header: &BlockHeader) -> String {
    match header.subject() {
        Some((subject, true)) => format!("Likelihood of not being {subject}"),
        Some((subject, false)) => format!("Likelihood of being {subject}"),
        None => "Likelihood".to_string(),
    }
}

// ------------- HTML -------------
pub struct HtmlRenderer {
    style: RenderStyle,
}
impl Renderer for HtmlRenderer {
    fn style(&self) -> &RenderStyle {
        &self.style
    }
    fn escape(&self, text: &str) -> String {
        text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
    }
    fn heading(&self, level: usize, text: &str) -> String {
        format!("<h{level}>{text}</h{level}>")
    }
    fn paragraph(&self, text: &str) -> String {
        format!("<p>{text}</p>")
    }
    fn rule(&self) -> String {
        "<hr>".to_string()
    }
    fn code(&self, text: &str) -> String {
        format!("<code>{}</code>", self.escape(text))
    }
    fn verbatim(&self, text: &str) -> String {
        format!("<pre><code>{}</code></pre>", self.escape(text))
    }
    fn priors(&self, rows: &[PriorRow]) -> String {
        let rows: Vec<String> = rows
            .iter()
            .map(|r| {
                format!(
                    "<tr><td>{}</td><td>{}</td></tr>",
                    self.escape(&r.hypothesis),
                    self.style.percent(r.prior)
                )
            })
            .collect();
        format!(
            "<table>\n    <tr><th>Hypothesis</th><th>Prior</th></tr>\n    {}\n</table>",
            rows.join(" ")
        )
    }
    fn evidence(&self, header: &BlockHeader, rows: &[EvidenceRow]) -> String {
        let rows: Vec<String> = rows
            .iter()
            .map(|r| {
                format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    self.escape(&r.hypothesis),
                    self.style.percent(r.update.prior),
                    self.style.percent(r.update.likelihood),
                    self.style.percent(r.update.posterior)
                )
            })
            .collect();
        let caption = header
            .label()
            .map(|l| format!("<strong>Evidence: {}</strong>\n", self.escape(l)))
            .unwrap_or_default();
        format!(
            "{caption}<table>\n    <tr><th>Hypothesis</th><th>Prior</th>\n    <th>{}</th><th>Posterior</th></tr>\n    {}\n</table>",
            self.escape(&likelihood_heading(header)),
            rows.join(" ")
        )
    }
    fn page(&self, title: &str, body: &str, stylesheet: Option<&str>) -> String {
        let title = self.escape(title);
        let css = stylesheet.unwrap_or_default();
        let body = chunk::indent(body, 8);
        format!(
            r#"<html>
<head>
    <title>{title}</title>
    <style>{css}</style>
    <script type="text/x-mathjax-config">
        MathJax.Hub.Config({{
            messageStyle: "none",
            CommonHTML: {{ linebreaks: {{ automatic: true }} }},
            tex2jax: {{inlineMath: [['$','$']]}}
        }});
    </script>
    <script async
        src="https://cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.1/MathJax.js?config=TeX-MML-AM_CHTML">
    </script>
</head>
<body>
    <h1 style="font-size: 2.5em" class="title">{title}</h1>
    <main>
{body}
    </main>
</body>
</html>
"#
        )
    }
}

// ------------- TeX -------------
pub struct TexRenderer {
    style: RenderStyle,
}
impl Renderer for TexRenderer {
    fn style(&self) -> &RenderStyle {
        &self.style
    }
    fn escape(&self, text: &str) -> String {
        text.replace('%', r"\%").replace('&', r"\&")
    }
    fn heading(&self, level: usize, text: &str) -> String {
        let command = match level {
            1 => "section",
            2 => "subsection",
            _ => "subsubsection",
        };
        format!("\\{command}{{{text}}}\n")
    }
    fn paragraph(&self, text: &str) -> String {
        format!("{text}\n")
    }
    fn rule(&self) -> String {
        "\n\\hrulefill\\\\\n".to_string()
    }
    fn code(&self, text: &str) -> String {
        format!("\\texttt{{{}}}", self.escape(text))
    }
    fn verbatim(&self, text: &str) -> String {
        format!("\\begin{{verbatim}}\n{text}\n\\end{{verbatim}}\n")
    }
    fn priors(&self, rows: &[PriorRow]) -> String {
        let rows: Vec<String> = rows
            .iter()
            .map(|r| format!("{} & {}", self.escape(&r.hypothesis), self.escape(&self.style.percent(r.prior))))
            .collect();
        format!(
            "\\begin{{center}}\n\\begin{{tabular}}{{ l|r }}\n    \\hline\n    Hypothesis & Prior \\\\ \\hline\n    {}\n\\end{{tabular}}\n\\end{{center}}\n",
            rows.join(" \\\\ ")
        )
    }
    fn evidence(&self, header: &BlockHeader, rows: &[EvidenceRow]) -> String {
        let rows: Vec<String> = rows
            .iter()
            .map(|r| {
                format!(
                    "{} & {} & {} & {}",
                    self.escape(&r.hypothesis),
                    self.escape(&self.style.percent(r.update.prior)),
                    self.escape(&self.style.percent(r.update.likelihood)),
                    self.escape(&self.style.percent(r.update.posterior))
                )
            })
            .collect();
        let caption = header
            .label()
            .map(|l| format!("\\textbf{{Evidence: {}}}\n\n", self.escape(l)))
            .unwrap_or_default();
        format!(
            "\\begin{{center}}\n{caption}\\begin{{tabular}}{{ l|r r|r }}\n    \\hline\n    Hypothesis & Prior & {} & Posterior \\\\\n    \\hline\n    {}\n\\end{{tabular}}\n\\end{{center}}\n",
            self.escape(&likelihood_heading(header)),
            rows.join(" \\\\ ")
        )
    }
    fn page(&self, title: &str, body: &str, stylesheet: Option<&str>) -> String {
        let title = self.escape(title);
        let styling = stylesheet.unwrap_or_default();
        format!(
            "\\documentclass{{article}}\n\n\\setcounter{{secnumdepth}}{{0}}\n\\usepackage[margin=1.0in]{{geometry}}\n{styling}\n\n\\title{{{title}}}\n\n\\begin{{document}}\n    \\maketitle\n\n{body}\n\\end{{document}}\n"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_the_first_top_level_heading() {
        let (title, rest) = extract_title("# Coin\n\nSome text.\n## Part\n");
        assert_eq!(title.as_deref(), Some("Coin"));
        assert_eq!(rest, "Some text.\n## Part");
        assert_eq!(extract_title("no heading").0, None);
        assert_eq!(extract_title("    @priors\n    A: 1\n").1, "    @priors\n    A: 1");
    }

    #[test]
    fn format_from_suffix() {
        assert_eq!(OutputFormat::from_path(Path::new("out.tex")), Some(OutputFormat::Tex));
        assert_eq!(OutputFormat::from_path(Path::new("out.HTML")), Some(OutputFormat::Html));
        assert_eq!(OutputFormat::from_path(Path::new("report.pdf")), Some(OutputFormat::Pdf));
        assert_eq!(OutputFormat::from_path(Path::new("out")), None);
    }

    #[test]
    fn code_spans_show_rounded_values() {
        let html = OutputFormat::Html.renderer(RenderStyle::default());
        assert_eq!(inline(html.as_ref(), "p is `p = 1/3 [0.3333333333333333]` & `4`"), "p is 0.33 &amp; 4");
        assert_eq!(inline(html.as_ref(), "`x + y`"), "<code>x + y</code>");
    }
}
