//! Report formatting and printing utilities.
//!
//! Outlines and diagnostics are written in cargo style. Kept apart from the
//! engine so featmap can be used as a library.

use std::io::{self, Write};

use anyhow::{Context, Result};
use colored::Colorize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::{
    args::OutputFormat,
    commands::{CommandResult, CommandSummary, ExtractSummary, InitSummary},
};
use crate::{
    config::CONFIG_FILE_NAME,
    core::{DirectoryResult, FeatureKind, FeatureRecord, FeatureRegistry},
    issues::{Issue, Report, Severity},
};

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓

/// Failure mark for consistent output formatting.
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

/// Maximum display width of a comment preview in the outline.
const PREVIEW_WIDTH: usize = 60;

pub fn print(result: &CommandResult, verbose: bool) -> Result<()> {
    match &result.summary {
        CommandSummary::Extract(summary) => print_extract(summary, verbose),
        CommandSummary::Init(summary) => {
            print_init(summary);
            Ok(())
        }
    }
}

fn print_extract(summary: &ExtractSummary, verbose: bool) -> Result<()> {
    let result = &summary.result;
    let mut stdout = io::stdout().lock();

    match summary.format {
        OutputFormat::Text => {
            report_to(result, &mut stdout);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(result)
                .context("Failed to serialize extraction result")?;
            let _ = writeln!(stdout, "{}", json);
        }
        OutputFormat::Features => {
            let json = serde_json::to_string_pretty(&result.features_view())
                .context("Failed to serialize feature listing")?;
            let _ = writeln!(stdout, "{}", json);
        }
    }

    if summary.format != OutputFormat::Text {
        print_failure_warning_to(result, verbose, &mut io::stderr().lock());
    }
    Ok(())
}

/// Print outline, diagnostics and summary of a run to a custom writer.
pub fn report_to<W: Write>(result: &DirectoryResult, writer: &mut W) {
    for entry in result {
        let _ = writeln!(writer, "{}", entry.path.bold());
        outline_to(&entry.registry, writer);
    }

    let mut issues: Vec<(&str, Issue)> = result
        .iter()
        .flat_map(|entry| {
            entry
                .issues()
                .into_iter()
                .map(move |issue| (entry.path.as_str(), issue))
        })
        .collect();
    issues.sort_by(|(a_path, a), (b_path, b)| {
        a_path
            .cmp(b_path)
            .then_with(|| a.line().unwrap_or(0).cmp(&b.line().unwrap_or(0)))
    });

    if !issues.is_empty() {
        let _ = writeln!(writer);
    }
    for (path, issue) in &issues {
        print_issue(path, issue, writer);
    }

    print_summary_to(result, writer);
}

/// Print one file's records, indented by nesting.
pub fn outline_to<W: Write>(registry: &FeatureRegistry, writer: &mut W) {
    let range_width = registry
        .iter()
        .map(|r| line_range(r).width())
        .max()
        .unwrap_or(0);

    for record in registry {
        let indent = "  ".repeat(registry.nesting_level(record) + 1);
        let kind = match record.kind {
            FeatureKind::Function => "def".cyan(),
            FeatureKind::Class => "class".magenta(),
            FeatureKind::ModuleComment => "#".dimmed(),
        };
        let label = match record.kind {
            FeatureKind::ModuleComment => preview(&record.doc_text).dimmed(),
            _ => record.name.as_str().bold(),
        };
        let flags = if record.flags.is_empty() {
            String::new()
        } else {
            let names: Vec<String> = record.flags.iter().map(|f| f.to_string()).collect();
            format!(" [{}]", names.join(", ")).yellow().to_string()
        };

        let range = format!("{:>width$}", line_range(record), width = range_width);
        let _ = writeln!(
            writer,
            "  {}{}{} {}{}",
            range.dimmed(),
            indent,
            kind,
            label,
            flags
        );
    }
}

fn line_range(record: &FeatureRecord) -> String {
    if record.start_line == record.end_line {
        record.start_line.to_string()
    } else {
        format!("{}-{}", record.start_line, record.end_line)
    }
}

/// First line of a comment, cut to the preview width.
fn preview(text: &str) -> String {
    let first = text.lines().next().unwrap_or("").trim();
    if first.is_empty() {
        return "(empty)".to_string();
    }
    if first.width() <= PREVIEW_WIDTH {
        return first.to_string();
    }

    let mut out = String::new();
    let mut width = 0;
    for c in first.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > PREVIEW_WIDTH - 1 {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push('\u{2026}');
    out
}

fn print_issue<W: Write>(path: &str, issue: &Issue, writer: &mut W) {
    let severity_str = match issue.severity() {
        Severity::Error => "error".bold().red(),
        Severity::Warning => "warning".bold().yellow(),
    };

    let _ = writeln!(
        writer,
        "{}: {}  {}",
        severity_str,
        issue.message(),
        issue.rule().to_string().dimmed().cyan()
    );

    match issue.line() {
        Some(line) => {
            let _ = writeln!(writer, "  {} {}:{}", "-->".blue(), path, line);
        }
        None => {
            let _ = writeln!(writer, "  {} {}", "-->".blue(), path);
        }
    }

    if let Some(details) = issue.details() {
        let _ = writeln!(writer, "   {} {} {}", "=".blue(), "note:".bold(), details);
    }

    let _ = writeln!(writer);
}

fn print_summary_to<W: Write>(result: &DirectoryResult, writer: &mut W) {
    let files = result.len();
    let features = result.feature_count();
    let errors = result.failed_count();
    let warnings = result.diagnostic_count();

    if result.is_cancelled() {
        let _ = writeln!(
            writer,
            "{} extraction was cancelled; results are partial",
            "warning:".bold().yellow()
        );
    }

    let extracted = format!(
        "Extracted {} {} from {} {}",
        features,
        if features == 1 { "feature" } else { "features" },
        files,
        if files == 1 { "file" } else { "files" }
    );

    if errors + warnings == 0 {
        let _ = writeln!(writer, "{} {}", SUCCESS_MARK.green(), extracted.green());
        return;
    }

    let _ = writeln!(
        writer,
        "{} {} ({} {}, {} {})",
        FAILURE_MARK.red(),
        extracted,
        errors,
        if errors == 1 { "error" } else { "errors" }.red(),
        warnings,
        if warnings == 1 { "warning" } else { "warnings" }.yellow()
    );
}

/// Warn about unreadable files when the report itself is machine-readable.
pub fn print_failure_warning_to<W: Write>(result: &DirectoryResult, verbose: bool, writer: &mut W) {
    let failed = result.failed_count();
    if failed == 0 {
        return;
    }

    if verbose {
        for entry in result.iter().filter(|e| e.is_failed()) {
            let _ = writeln!(
                writer,
                "{} {}: {}",
                "warning:".bold().yellow(),
                entry.path,
                entry.failure.as_deref().unwrap_or_default()
            );
        }
    } else {
        let _ = writeln!(
            writer,
            "{} {} file(s) could not be read (use {} for details)",
            "warning:".bold().yellow(),
            failed,
            "-v".cyan()
        );
    }
}

fn print_init(summary: &InitSummary) {
    if summary.created {
        println!(
            "{} {}",
            SUCCESS_MARK.green(),
            format!("Created {}", CONFIG_FILE_NAME).green()
        );
    } else {
        eprintln!(
            "{} {} already exists",
            "error:".bold().red(),
            CONFIG_FILE_NAME
        );
    }
}
