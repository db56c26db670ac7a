//! CLI output formatting for task runs and watch events.
//!
//! # Architecture
//!
//! Each report kind has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes it out. Format functions
//! are pure: no I/O, no side effects. Informational output goes to stdout;
//! warnings and errors go to stderr.
//!
//! # Output Format
//!
//! ## Task run
//!
//! ```text
//! [1/4] compile-stylesheet
//! [2/4] inline-stylesheet
//! [3/4] bundle-scripts
//! [4/4] assemble(html)
//! html → /abs/dist/book.html (412.3 KB)
//! Task html complete
//! ```
//!
//! ## Watch
//!
//! ```text
//! Watching /abs/book (debounce 500 ms)
//! Changed: chapters/01-intro.md
//! Rebuilding: html
//! ```

use std::path::{Path, PathBuf};

use crate::exec::RunOutput;
use crate::tasks::TaskReport;

// ============================================================================
// Pure formatting
// ============================================================================

/// Format a byte count with one decimal (kilo = 1000).
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// One step header: `[2/4] inline-stylesheet`.
pub fn format_step(index: usize, total: usize, name: &str) -> String {
    format!("[{index}/{total}] {name}")
}

/// Summary lines for a finished task: one line per rendition, the archive
/// if one was produced, and a closing line.
pub fn format_task_report(report: &TaskReport) -> Vec<String> {
    let mut lines = Vec::new();
    for rendition in &report.renditions {
        lines.push(format!(
            "{} → {} ({})",
            rendition.format,
            rendition.path.display(),
            human_size(rendition.bytes)
        ));
    }
    if let Some(archive) = &report.archive {
        lines.push(format!("archive → {}", archive.display()));
    }
    lines.push(format!("Task {} complete", report.task));
    lines
}

/// Echo lines for an external tool's captured streams, prefixed with the
/// tool name. Returns (stdout lines, stderr lines).
pub fn format_tool_output(tool: &str, run: &RunOutput) -> (Vec<String>, Vec<String>) {
    let prefix = |text: &str| {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| format!("{tool}: {line}"))
            .collect::<Vec<_>>()
    };
    (prefix(&run.stdout), prefix(&run.stderr))
}

/// Lines announcing one batch of changed files.
pub fn format_changes(changed: &[PathBuf]) -> Vec<String> {
    changed
        .iter()
        .map(|path| format!("Changed: {}", path.display()))
        .collect()
}

// ============================================================================
// Print wrappers
// ============================================================================

pub fn print_step(index: usize, total: usize, name: &str) {
    println!("{}", format_step(index, total, name));
}

pub fn print_task_report(report: &TaskReport) {
    for line in format_task_report(report) {
        println!("{line}");
    }
}

pub fn print_tool_output(tool: &str, run: &RunOutput) {
    let (info, warnings) = format_tool_output(tool, run);
    for line in info {
        println!("{line}");
    }
    for line in warnings {
        eprintln!("{line}");
    }
}

pub fn print_changes(changed: &[PathBuf]) {
    for line in format_changes(changed) {
        println!("{line}");
    }
}

pub fn print_rebuild(task: &str) {
    println!("Rebuilding: {task}");
}

pub fn print_watch_started(root: &Path, debounce_ms: u64) {
    println!("Watching {} (debounce {debounce_ms} ms)", root.display());
}

pub fn print_serving(root: &Path, port: u16) {
    println!("Serving {} at http://127.0.0.1:{port}/", root.display());
}

pub fn print_warning(message: &str) {
    eprintln!("warning: {message}");
}

pub fn print_error(message: &str) {
    eprintln!("error: {message}");
}
