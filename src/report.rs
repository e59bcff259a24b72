//! Output formatting for lint diagnostics.
//!
//! Supports two output formats:
//! - Pretty: diagnostics grouped by file, colored for terminals
//! - JSON: structured output for CI consumption

use colored::*;
use serde::Serialize;

use crate::lint::{Diagnostic, Severity};

/// Group diagnostics by file, keeping first-seen file order, with errors
/// ahead of warnings inside each group.
fn group_by_file(diagnostics: &[Diagnostic]) -> Vec<(String, Vec<&Diagnostic>)> {
    let mut groups: Vec<(String, Vec<&Diagnostic>)> = Vec::new();
    for diag in diagnostics {
        let file = diag
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match groups.iter_mut().find(|(name, _)| *name == file) {
            Some((_, list)) => list.push(diag),
            None => groups.push((file, vec![diag])),
        }
    }
    for (_, list) in &mut groups {
        list.sort_by_key(|d| std::cmp::Reverse(d.severity()));
    }
    groups
}

/// Render diagnostics as `<line>:<col> <SEVERITY> <message> (<code>)`
/// lines, grouped under their file.
pub fn render_pretty(diagnostics: &[Diagnostic], use_color: bool) -> String {
    let mut result = Vec::new();
    for (file, group) in group_by_file(diagnostics) {
        result.push(file);
        for diag in group {
            let line = diag.line.map(|l| l.to_string()).unwrap_or_default();
            let col = match diag.col {
                Some(col) => format!(":{col:<3}"),
                None => "    ".to_string(),
            };
            let label = match diag.severity() {
                Severity::Error => "ERROR",
                Severity::Warning => "WARN ",
            };
            let label = if use_color {
                match diag.severity() {
                    Severity::Error => label.red().to_string(),
                    Severity::Warning => label.yellow().to_string(),
                }
            } else {
                label.to_string()
            };
            result.push(format!(
                "{line:>4}{col} {label} {} ({})",
                diag.message, diag.code
            ));
        }
    }
    result.join("\n")
}

/// Print the pretty report to stdout, followed by a summary line.
pub fn write_pretty(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        println!("No problems found");
        return;
    }
    println!("{}", render_pretty(diagnostics, true));
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity() == Severity::Error)
        .count();
    let warnings = diagnostics.len() - errors;
    println!();
    println!("{errors} error(s), {warnings} warning(s)");
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: String,
    errors: usize,
    warnings: usize,
    diagnostics: &'a [Diagnostic],
}

/// Print the JSON report to stdout.
pub fn write_json(diagnostics: &[Diagnostic]) -> anyhow::Result<()> {
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity() == Severity::Error)
        .count();
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        errors,
        warnings: diagnostics.len() - errors,
        diagnostics,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
