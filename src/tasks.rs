//! The task registry and the sequential step executor.
//!
//! Every CLI command maps to one named [`Task`]: a fixed, ordered list of
//! [`Step`]s. Execution is strictly sequential and short-circuiting: a
//! failed step aborts the rest of the task, and nothing is retried. The
//! registry is a fixed table; tasks take no parameters beyond the global
//! minify toggle carried by the [`BuildContext`].
//!
//! ```text
//! json     assemble(json)
//! html     compile-stylesheet, inline-stylesheet, bundle-scripts, assemble(html)
//! pdf      assemble(pdf)
//! epub     compile-stylesheet, inline-stylesheet, assemble(epub)
//! all      assets once, then assemble html, pdf, epub
//! package  all, then archive
//! ```
//!
//! After a successful run a machine-readable `build-report.json` is written
//! to the temp directory, listing the steps run and the renditions produced.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::assemble::{self, Assembled, AssembleError, Format};
use crate::assets::{self, AssetError};
use crate::config::BookConfig;
use crate::exec::CommandRunner;
use crate::output;
use crate::package::{self, PackageError};

#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("unknown task {0:?} (expected json, html, pdf, epub, all, or package)")]
    UnknownTask(String),
    #[error("task {task} failed at {step}: {source}")]
    StepFailed {
        task: String,
        step: String,
        #[source]
        source: StepError,
    },
}

/// Name of the compiled (not yet inlined) stylesheet in the temp directory.
pub const COMPILED_STYLESHEET: &str = "book.css";

/// One step of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CompileStylesheet,
    InlineStylesheet,
    BundleScripts,
    Assemble(Format),
    Package,
}

impl Step {
    pub fn name(self) -> String {
        match self {
            Step::CompileStylesheet => "compile-stylesheet".to_string(),
            Step::InlineStylesheet => "inline-stylesheet".to_string(),
            Step::BundleScripts => "bundle-scripts".to_string(),
            Step::Assemble(format) => format!("assemble({format})"),
            Step::Package => "package".to_string(),
        }
    }
}

/// A named, ordered sequence of steps.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: &'static str,
    pub steps: Vec<Step>,
}

/// The fixed command table. Order within each task is significant; order of
/// the tasks themselves is not.
pub fn registry() -> Vec<Task> {
    use Step::*;

    let html_steps = vec![
        CompileStylesheet,
        InlineStylesheet,
        BundleScripts,
        Assemble(Format::Html),
    ];
    // `all` runs the asset steps once up front; pdf ignores them and epub
    // reuses the compiled stylesheet.
    let mut all_steps = html_steps.clone();
    all_steps.push(Assemble(Format::Pdf));
    all_steps.push(Assemble(Format::Epub));
    let mut package_steps = all_steps.clone();
    package_steps.push(Package);

    vec![
        Task {
            name: "json",
            steps: vec![Assemble(Format::Json)],
        },
        Task {
            name: "html",
            steps: html_steps,
        },
        Task {
            name: "pdf",
            steps: vec![Assemble(Format::Pdf)],
        },
        Task {
            name: "epub",
            steps: vec![
                CompileStylesheet,
                InlineStylesheet,
                Assemble(Format::Epub),
            ],
        },
        Task {
            name: "all",
            steps: all_steps,
        },
        Task {
            name: "package",
            steps: package_steps,
        },
    ]
}

/// Look up a task by name.
pub fn find(name: &str) -> Option<Task> {
    registry().into_iter().find(|task| task.name == name)
}

/// Everything a task run needs, assembled once at startup and read-only
/// from then on.
///
/// `output_dir` and `temp_dir` must be absolute: external tools run with the
/// source root as their working directory and resolve these independently.
pub struct BuildContext<'a> {
    pub config: &'a BookConfig,
    pub source_root: &'a Path,
    pub output_dir: &'a Path,
    pub temp_dir: &'a Path,
    pub minify: bool,
}

/// Report of one successful task run, serialized to `build-report.json`.
#[derive(Debug, Serialize)]
pub struct TaskReport {
    pub task: String,
    pub steps: Vec<String>,
    pub renditions: Vec<Rendition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
}

/// One produced output file.
#[derive(Debug, Serialize)]
pub struct Rendition {
    pub format: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Run a task by registry name.
pub fn run_named(
    runner: &impl CommandRunner,
    ctx: &BuildContext<'_>,
    name: &str,
) -> Result<TaskReport, TaskError> {
    let task = find(name).ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;
    run_task(runner, ctx, &task)
}

/// Run every step of a task in order, stopping at the first failure.
pub fn run_task(
    runner: &impl CommandRunner,
    ctx: &BuildContext<'_>,
    task: &Task,
) -> Result<TaskReport, TaskError> {
    let total = task.steps.len();
    let mut report = TaskReport {
        task: task.name.to_string(),
        steps: Vec::new(),
        renditions: Vec::new(),
        archive: None,
    };

    for (index, step) in task.steps.iter().enumerate() {
        output::print_step(index + 1, total, &step.name());
        run_step(runner, ctx, *step, &mut report).map_err(|source| TaskError::StepFailed {
            task: task.name.to_string(),
            step: step.name(),
            source,
        })?;
        report.steps.push(step.name());
    }

    write_report(ctx, &report);
    Ok(report)
}

fn run_step(
    runner: &impl CommandRunner,
    ctx: &BuildContext<'_>,
    step: Step,
    report: &mut TaskReport,
) -> Result<(), StepError> {
    match step {
        Step::CompileStylesheet => {
            let entry = ctx.source_root.join(&ctx.config.assets.stylesheet);
            let load_paths: Vec<PathBuf> = ctx
                .config
                .assets
                .load_paths
                .iter()
                .map(|p| ctx.source_root.join(p))
                .collect();
            let css = assets::compile_stylesheet(&entry, &load_paths, ctx.minify)?;
            std::fs::create_dir_all(ctx.temp_dir)?;
            std::fs::write(ctx.temp_dir.join(COMPILED_STYLESHEET), css)?;
        }
        Step::InlineStylesheet => {
            let css = std::fs::read_to_string(ctx.temp_dir.join(COMPILED_STYLESHEET))?;
            // url() references resolve relative to the stylesheet entry's
            // directory, where the source sheet sits.
            let entry = ctx.source_root.join(&ctx.config.assets.stylesheet);
            let base_dir = entry.parent().unwrap_or(ctx.source_root).to_path_buf();
            let inlined = assets::inline_stylesheet(&css, &base_dir)?;
            std::fs::write(ctx.temp_dir.join(assemble::INLINED_STYLESHEET), inlined)?;
        }
        Step::BundleScripts => {
            std::fs::create_dir_all(ctx.temp_dir)?;
            assets::bundle_scripts(
                runner,
                &ctx.config.build.esbuild,
                &ctx.config.assets.script,
                ctx.source_root,
                &ctx.temp_dir.join(assemble::BUNDLED_SCRIPT),
                ctx.minify,
            )?;
        }
        Step::Assemble(format) => {
            let assembled = assemble::assemble(
                runner,
                ctx.config,
                format,
                ctx.source_root,
                ctx.output_dir,
                ctx.temp_dir,
            )?;
            report.renditions.push(rendition_entry(&assembled));
        }
        Step::Package => {
            let archive = package::package(ctx.config, ctx.output_dir)?;
            report.archive = Some(archive);
        }
    }
    Ok(())
}

fn rendition_entry(assembled: &Assembled) -> Rendition {
    let bytes = std::fs::metadata(&assembled.output)
        .map(|m| m.len())
        .unwrap_or(0);
    Rendition {
        format: assembled.format.as_str().to_string(),
        path: assembled.output.clone(),
        bytes,
    }
}

/// Best-effort: the report is a debugging aid, never a reason to fail a
/// build that already succeeded.
fn write_report(ctx: &BuildContext<'_>, report: &TaskReport) {
    let write = || -> std::io::Result<()> {
        std::fs::create_dir_all(ctx.temp_dir)?;
        let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
        std::fs::write(ctx.temp_dir.join("build-report.json"), json)
    };
    if let Err(e) = write() {
        output::print_warning(&format!("could not write build-report.json: {e}"));
    }
}
