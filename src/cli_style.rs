/*!
 * Terminal styling for tdoc-harvest
 *
 * Themed text, status lines, the navigation screen and the run summary
 * table.
 */

use std::path::Path;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};

use crate::stats::RunSummary;
use crate::summarize::AnalysisReport;

// ============================================================================
// THEME COLORS
// ============================================================================

/// Colors for consistent styling
pub struct Theme;

impl Theme {
    /// Primary accent color (cyan)
    pub fn primary<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    pub fn success<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    /// Muted/secondary text (dim)
    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    /// Header style (bold cyan)
    pub fn header<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }

    /// Value/number highlight (bold white)
    pub fn value<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).white().bold()
    }
}

// ============================================================================
// ICONS
// ============================================================================

/// Unicode icons for visual feedback
pub struct Icons;

impl Icons {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const INFO: &'static str = "ℹ";

    pub const FOLDER: &'static str = "📁";
    pub const MANIFEST: &'static str = "📋";
    pub const GLOBE: &'static str = "🌐";

    pub const ARROW_RIGHT: &'static str = "→";
    pub const ARROW_UP: &'static str = "↑";
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Draw a section header with a line
pub fn section_header(title: &str) {
    let line_len = 50 - title.chars().count().min(40);
    println!(
        "\n{} {}",
        Theme::header(title),
        Theme::muted("─".repeat(line_len))
    );
}

/// Render the navigation screen: current path, numbered children and the
/// two fixed choices.
pub fn render_directory(path: &str, children: &[String]) -> String {
    let mut out = format!(
        "{} {} {}\n",
        Icons::GLOBE,
        Theme::header("Current directory:"),
        Theme::value(path)
    );
    for (idx, child) in children.iter().enumerate() {
        out.push_str(&format!(
            "  {:>3}. {} {}\n",
            Theme::primary(idx + 1),
            Icons::FOLDER,
            child
        ));
    }
    if children.is_empty() {
        out.push_str(&format!("  {}\n", Theme::muted("(no subdirectories)")));
    }
    out.push_str(&format!(
        "  {:>3}. {}\n",
        Theme::success(0),
        Theme::success("Download files from this directory")
    ));
    out.push_str(&format!(
        "  {:>3}. {} {}\n",
        Theme::warning(-1),
        Icons::ARROW_UP,
        Theme::warning("Go up one level")
    ));
    out
}

// ============================================================================
// TABLES
// ============================================================================

/// Create a styled data table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create the end-of-run summary table
pub fn summary_table(summary: &RunSummary) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        Cell::new("Harvest Summary")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);

    table.add_row(vec![
        Cell::new("Remote Directory"),
        Cell::new(format!("{}{}", summary.host, summary.remote_dir)).fg(Color::White),
    ]);

    let manifest = match &summary.manifest {
        Some(name) => format!("{} ({})", name, summary.manifest_status),
        None => summary.manifest_status.to_string(),
    };
    let manifest_color = if summary.manifest_status.is_failure() {
        Color::Red
    } else if summary.index_entries > 0 {
        Color::Green
    } else {
        Color::Yellow
    };
    table.add_row(vec![Cell::new("Manifest"), Cell::new(manifest).fg(manifest_color)]);

    if summary.index_entries > 0 {
        table.add_row(vec![
            Cell::new("Indexed"),
            Cell::new(format!(
                "{} identifiers in {} categories",
                summary.index_entries, summary.categories
            )),
        ]);
    }

    table.add_row(vec![
        Cell::new("Archives Downloaded"),
        Cell::new(format!("{} / {}", summary.downloaded, summary.archives_found))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);

    if summary.download_failed > 0 {
        table.add_row(vec![
            Cell::new("Downloads Failed"),
            Cell::new(summary.download_failed.to_string())
                .fg(Color::Red)
                .add_attribute(Attribute::Bold),
        ]);
    }

    table.add_row(vec![
        Cell::new("Filed & Extracted"),
        Cell::new(summary.distributed.to_string()).fg(Color::Green),
    ]);

    if summary.unclassified > 0 {
        table.add_row(vec![
            Cell::new("Unclassified"),
            Cell::new(summary.unclassified.to_string()).fg(Color::Yellow),
        ]);
    }

    if summary.distribution_failed > 0 {
        table.add_row(vec![
            Cell::new("Extraction Failed"),
            Cell::new(summary.distribution_failed.to_string()).fg(Color::Red),
        ]);
    }

    table.add_row(vec![
        Cell::new("Total Size"),
        Cell::new(format_bytes(summary.bytes_downloaded))
            .fg(Color::White)
            .add_attribute(Attribute::Bold),
    ]);

    table.add_row(vec![
        Cell::new("Duration"),
        Cell::new(format_duration(summary.elapsed_secs())).fg(Color::White),
    ]);

    table.add_row(vec![
        Cell::new("Output"),
        Cell::new(summary.output_dir.display().to_string()).fg(Color::DarkGrey),
    ]);

    table
}

/// Create the table printed after a document analysis
pub fn analysis_table(report: &AnalysisReport, report_path: &Path) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        Cell::new("Analysis Summary")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);

    table.add_row(vec![
        Cell::new("Documents Summarized"),
        Cell::new(format!("{} / {}", report.summaries.len(), report.documents_found))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);

    if !report.failures.is_empty() {
        table.add_row(vec![
            Cell::new("Not Summarized"),
            Cell::new(report.failures.len().to_string())
                .fg(Color::Red)
                .add_attribute(Attribute::Bold),
        ]);
    }

    for (label, step) in [
        ("Cross-document Analysis", &report.cross_document_analysis),
        ("Discussion Points", &report.discussion_points),
    ] {
        let (text, color) = match step {
            Some(_) => ("done", Color::Green),
            None if report.summaries.is_empty() => ("skipped", Color::Yellow),
            None => ("failed", Color::Red),
        };
        table.add_row(vec![Cell::new(label), Cell::new(text).fg(color)]);
    }

    table.add_row(vec![
        Cell::new(format!("{} Report", Icons::MANIFEST)),
        Cell::new(report_path.display().to_string()).fg(Color::DarkGrey),
    ]);

    table
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let base = 1024.0_f64;
    let exp = (bytes_f.ln() / base.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f / base.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.2} {}", value, UNITS[exp])
    }
}

/// Format duration into human-readable string
pub fn format_duration(secs: f64) -> String {
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor();
        let remaining = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining)
    } else {
        let hours = (secs / 3600.0).floor();
        let mins = ((secs % 3600.0) / 60.0).floor();
        format!("{}h {}m", hours, mins)
    }
}

/// Print a styled error message with optional suggestion
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "\n{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!(
            "  {} {}",
            Theme::muted(Icons::ARROW_RIGHT),
            Theme::muted(hint)
        );
    }
    eprintln!();
}

/// Print a styled warning message
pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING.to_string()),
        Theme::warning(message)
    );
}

/// Print a styled success message
pub fn print_success(message: &str) {
    println!(
        "{} {}",
        Theme::success(Icons::SUCCESS.to_string()),
        Theme::success(message)
    );
}

/// Print a styled info message
pub fn print_info(message: &str) {
    println!("{} {}", Theme::primary(Icons::INFO.to_string()), message);
}
