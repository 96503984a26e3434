/*!
 * HTML report for an analysis run
 *
 * Model answers are Markdown-ish text. [`markdown_to_html`] handles the
 * subset the prompts ask for: headings, numbered and bulleted lists, pipe
 * tables, horizontal rules, bold/italic/code spans and paragraphs. All text
 * is HTML-escaped before any markup is added.
 */

use std::sync::LazyLock;

use regex::Regex;

use super::AnalysisReport;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid heading pattern"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+(.+)$").expect("valid numbered item pattern"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*•]\s+(.+)$").expect("valid bullet pattern"));
static RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:-{3,}|\*{3,}|_{3,})$").expect("valid rule pattern"));
static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|?(\s*:?-+:?\s*\|)+\s*:?-*:?\s*$").expect("valid separator pattern"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold pattern"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s][^*]*)\*").expect("valid italic pattern"));
static CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid code pattern"));

const STYLE: &str = r#"
:root { --primary: #2c3e50; --accent: #3498db; --background: #f5f7fa; --border: #e1e4e8; }
body { font-family: 'Helvetica Neue', Arial, sans-serif; line-height: 1.6; max-width: 1200px;
       margin: 0 auto; padding: 20px; background: var(--background); color: #333; }
.card { background: #fff; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); margin: 20px 0; padding: 20px; }
h1, h2, h3, h4, h5, h6 { color: var(--primary); border-bottom: 2px solid var(--border); padding-bottom: 0.3em; }
.meta-info { color: #666; font-size: 0.9em; }
.table-container { overflow-x: auto; margin: 20px 0; }
.analysis-table { width: 100%; border-collapse: collapse; min-width: 600px; }
.analysis-table th { background: #f8f9fa; color: var(--primary); padding: 12px 16px; border: 1px solid var(--border); }
.analysis-table td { padding: 10px 16px; border: 1px solid var(--border); }
.analysis-table tr:nth-child(even) { background: #f8f9fa; }
.text-left { text-align: left; } .text-center { text-align: center; } .text-right { text-align: right; }
.nav-tabs { display: flex; border-bottom: 2px solid var(--border); padding: 10px 10px 0; }
.nav-tab { padding: 12px 24px; cursor: pointer; margin-right: 5px; border: 1px solid var(--border);
           border-bottom: none; border-radius: 8px 8px 0 0; background: #f8f9fa; color: #666; }
.nav-tab.active { background: #fff; color: var(--primary); font-weight: bold; }
.tab-content { display: none; background: #fff; padding: 20px; }
.tab-content.active { display: block; }
.failure { color: #c0392b; }
code { background: #f8f9fa; padding: 0.2em 0.4em; border-radius: 3px; }
"#;

const SCRIPT: &str = r#"
function showTab(id) {
  document.querySelectorAll('.tab-content').forEach(t => t.classList.remove('active'));
  document.querySelectorAll('.nav-tab').forEach(t => t.classList.remove('active'));
  document.getElementById(id).classList.add('active');
  document.querySelector('[data-tab="' + id + '"]').classList.add('active');
}
"#;

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape, then apply code, bold and italic spans
fn inline(text: &str) -> String {
    let escaped = escape_html(text.trim());
    let coded = CODE.replace_all(&escaped, "<code>$1</code>");
    let bold = BOLD.replace_all(&coded, "<strong>$1</strong>");
    ITALIC.replace_all(&bold, "<em>$1</em>").into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    fn from_separator(cell: &str) -> Self {
        let cell = cell.trim();
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) => Align::Center,
            (false, true) => Align::Right,
            _ => Align::Left,
        }
    }

    fn class(self) -> &'static str {
        match self {
            Align::Left => "text-left",
            Align::Center => "text-center",
            Align::Right => "text-right",
        }
    }
}

fn table_cells(line: &str) -> Vec<&str> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}

fn render_table(lines: &[&str]) -> String {
    let headers = table_cells(lines[0]);
    let aligns: Vec<Align> = table_cells(lines[1]).into_iter().map(Align::from_separator).collect();
    let align_at = |i: usize| aligns.get(i).copied().unwrap_or(Align::Left).class();

    let mut html = String::from("<div class=\"table-container\">\n<table class=\"analysis-table\">\n<thead>\n<tr>");
    for (i, header) in headers.iter().enumerate() {
        html.push_str(&format!("<th class=\"{}\">{}</th>", align_at(i), inline(header)));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");
    for line in &lines[2..] {
        let cells = table_cells(line);
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        html.push_str("<tr>");
        for (i, cell) in cells.iter().enumerate() {
            html.push_str(&format!("<td class=\"{}\">{}</td>", align_at(i), inline(cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n</div>");
    html
}

#[derive(Default)]
struct BlockWriter {
    out: Vec<String>,
    paragraph: Vec<String>,
    list: Option<(bool, Vec<String>)>,
}

impl BlockWriter {
    fn flush_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            self.out.push(format!("<p>{}</p>", self.paragraph.join(" ")));
            self.paragraph.clear();
        }
    }

    fn flush_list(&mut self) {
        if let Some((ordered, items)) = self.list.take() {
            let tag = if ordered { "ol" } else { "ul" };
            let body: String = items.iter().map(|i| format!("<li>{}</li>\n", i)).collect();
            self.out.push(format!("<{tag}>\n{body}</{tag}>"));
        }
    }

    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_list();
    }

    fn push_item(&mut self, ordered: bool, item: String) {
        self.flush_paragraph();
        match self.list {
            Some((kind, ref mut items)) if kind == ordered => items.push(item),
            _ => {
                self.flush_list();
                self.list = Some((ordered, vec![item]));
            }
        }
    }

    fn push_block(&mut self, html: String) {
        self.flush();
        self.out.push(html);
    }
}

/// Convert a model answer to HTML
pub fn markdown_to_html(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut writer = BlockWriter::default();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();

        if line.is_empty() {
            writer.flush();
            i += 1;
            continue;
        }

        if line.starts_with('|') && lines.get(i + 1).is_some_and(|next| TABLE_SEPARATOR.is_match(next.trim())) {
            let start = i;
            i += 2;
            while i < lines.len() && lines[i].trim().starts_with('|') {
                i += 1;
            }
            writer.push_block(render_table(&lines[start..i]));
            continue;
        }

        if let Some(caps) = HEADING.captures(line) {
            let level = caps[1].len();
            writer.push_block(format!("<h{level}>{}</h{level}>", inline(&caps[2])));
        } else if RULE.is_match(line) {
            writer.push_block("<hr>".to_string());
        } else if let Some(caps) = NUMBERED.captures(line) {
            writer.push_item(true, inline(&caps[1]));
        } else if let Some(caps) = BULLET.captures(line) {
            writer.push_item(false, inline(&caps[1]));
        } else {
            writer.flush_list();
            writer.paragraph.push(inline(line));
        }
        i += 1;
    }

    writer.flush();
    writer.out.join("\n")
}

fn card(body: &str) -> String {
    format!("<div class=\"card\">\n{}\n</div>\n", body)
}

/// Full HTML page for `report`
pub fn render_report(report: &AnalysisReport, generated_at: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("<title>Document Analysis Report</title>\n");
    html.push_str(&format!("<style>{}</style>\n<script>{}</script>\n", STYLE, SCRIPT));
    html.push_str("</head>\n<body>\n<h1>Document Analysis Report</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta-info\">Generated: {} &middot; {} document(s), {} summarized</p>\n",
        escape_html(generated_at),
        report.documents_found,
        report.summaries.len()
    ));

    if let Some(ref analysis) = report.cross_document_analysis {
        html.push_str(&card(&format!(
            "<h2>Cross-document overview</h2>\n{}",
            markdown_to_html(analysis)
        )));
    }

    html.push_str("<div class=\"nav-tabs\">\n");
    for (id, label, active) in [
        ("tab-summary", "Summaries", true),
        ("tab-themes", "Themes", false),
        ("tab-discussion", "Discussion points", false),
    ] {
        html.push_str(&format!(
            "<div class=\"nav-tab{}\" data-tab=\"{id}\" onclick=\"showTab('{id}')\">{label}</div>\n",
            if active { " active" } else { "" }
        ));
    }
    html.push_str("</div>\n");

    html.push_str("<div id=\"tab-summary\" class=\"tab-content active\">\n<h2>Document summaries</h2>\n");
    for summary in &report.summaries {
        html.push_str(&card(&format!(
            "<h3>{}</h3>\n{}",
            escape_html(&summary.file_name),
            markdown_to_html(&summary.summary)
        )));
    }
    if !report.failures.is_empty() {
        let items: String = report
            .failures
            .iter()
            .map(|f| format!("<li>{}: {}</li>\n", escape_html(&f.file_name), escape_html(&f.reason)))
            .collect();
        html.push_str(&card(&format!(
            "<h3 class=\"failure\">Not summarized</h3>\n<ul>\n{}</ul>",
            items
        )));
    }
    html.push_str("</div>\n");

    html.push_str("<div id=\"tab-themes\" class=\"tab-content\">\n<h2>Themes</h2>\n");
    if let Some(ref analysis) = report.cross_document_analysis {
        html.push_str(&card(&markdown_to_html(analysis)));
    }
    html.push_str("</div>\n");

    html.push_str("<div id=\"tab-discussion\" class=\"tab-content\">\n<h2>Discussion points</h2>\n");
    if let Some(ref points) = report.discussion_points {
        html.push_str(&card(&markdown_to_html(points)));
    }
    html.push_str("</div>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::{DocumentFailure, DocumentSummary};

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let html = markdown_to_html("## Common themes\nKey handling is\ndiscussed widely.\n\n---\nNext");
        assert_eq!(
            html,
            "<h2>Common themes</h2>\n<p>Key handling is discussed widely.</p>\n<hr>\n<p>Next</p>"
        );
    }

    #[test]
    fn test_lists() {
        let html = markdown_to_html("1. First\n2. **Second**\n- Author: `Alpha`\n  * Reason: *urgent*");
        assert_eq!(
            html,
            "<ol>\n<li>First</li>\n<li><strong>Second</strong></li>\n</ol>\n\
             <ul>\n<li>Author: <code>Alpha</code></li>\n<li>Reason: <em>urgent</em></li>\n</ul>"
        );
    }

    #[test]
    fn test_table_with_alignment() {
        let html = markdown_to_html(
            "| Document | Author | Keywords |\n|:---|:---:|---:|\n| S1-001.docx | Alpha | keys |\n| | | |\n",
        );
        assert!(html.starts_with("<div class=\"table-container\">"));
        assert!(html.contains("<th class=\"text-left\">Document</th>"));
        assert!(html.contains("<th class=\"text-center\">Author</th>"));
        assert!(html.contains("<td class=\"text-right\">keys</td>"));
        assert_eq!(html.matches("<tr>").count(), 2);
    }

    #[test]
    fn test_pipe_line_without_separator_is_text() {
        let html = markdown_to_html("| not a table |");
        assert_eq!(html, "<p>| not a table |</p>");
    }

    #[test]
    fn test_model_markup_is_escaped() {
        let html = markdown_to_html("- <img src=x onerror=alert(1)>");
        assert_eq!(html, "<ul>\n<li>&lt;img src=x onerror=alert(1)&gt;</li>\n</ul>");
    }

    #[test]
    fn test_render_report() {
        let report = AnalysisReport {
            documents_found: 2,
            summaries: vec![DocumentSummary {
                file_name: "S1-001 <draft>.docx".to_string(),
                summary: "- Overview: keys".to_string(),
            }],
            failures: vec![DocumentFailure {
                file_name: "S1-002.docx".to_string(),
                reason: "no text found".to_string(),
            }],
            cross_document_analysis: Some("## Common themes\n- Key handling".to_string()),
            discussion_points: None,
        };
        let html = render_report(&report, "2024-05-20 10:00:00");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("2 document(s), 1 summarized"));
        assert!(html.contains("<h3>S1-001 &lt;draft&gt;.docx</h3>"));
        assert!(html.contains("<li>S1-002.docx: no text found</li>"));
        assert_eq!(html.matches("<h2>Common themes</h2>").count(), 2);
        assert!(html.contains("id=\"tab-discussion\""));
        assert!(html.trim_end().ends_with("</html>"));
    }
}
