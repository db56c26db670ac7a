//! Document assembly: one pandoc invocation per output format.
//!
//! This is the orchestration core. [`build_args`] turns a format profile and
//! the shared fragment list into pandoc's argument vector, and [`assemble`]
//! runs it through a [`CommandRunner`], blocking until pandoc exits.
//!
//! ## Argument Order
//!
//! The vector is concatenated in a fixed order:
//!
//! ```text
//! global flags          --from markdown+smart --standalone
//! output flag           --output <dir>/<profile.output>
//! template flag         --template <path>          (when the profile has one)
//! filter flags          --filter <path>            (one per filter, in order)
//! layout flags          papersize, --table-of-contents, --number-sections,
//!                       --self-contained, --highlight-style
//! stylesheet flag       --css <compiled css>       (when the profile asks)
//! scripts variable      --variable scripts=<bundle> (when the profile asks)
//! variables             --variable key=value       (sorted by key)
//! positional tail       <metadata> <fragment> <fragment> ...
//! ```
//!
//! Pandoc concatenates the trailing positional files into one document, so
//! the tail carries the whole book and its order. The tail is built from
//! config fields no profile can touch: **every format gets the identical
//! fragment order**. That is the one invariant this module exists to protect.
//!
//! ## Failure
//!
//! A non-zero pandoc exit and a failed spawn (pandoc not installed) are both
//! terminal for the enclosing task. There are no retries and no partial
//! output cleanup; pandoc's own stderr is the diagnostic.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::BookConfig;
use crate::exec::{CommandRunner, ExecError};
use crate::output;

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("unknown output format {0:?} (expected html, pdf, epub, or json)")]
    UnknownFormat(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Launch(#[from] ExecError),
    #[error("pandoc failed for {format}: {}", crate::exec::describe_code(.code))]
    CompilerFailed { format: Format, code: Option<i32> },
}

/// The closed set of output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Html,
    Pdf,
    Epub,
    Json,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Html, Format::Pdf, Format::Epub, Format::Json];

    /// Parse a format identifier. Anything outside the enumerated set is a
    /// configuration error, caught before any subprocess is spawned.
    pub fn parse(name: &str) -> Result<Self, AssembleError> {
        match name {
            "html" => Ok(Format::Html),
            "pdf" => Ok(Format::Pdf),
            "epub" => Ok(Format::Epub),
            "json" => Ok(Format::Json),
            other => Err(AssembleError::UnknownFormat(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Pdf => "pdf",
            Format::Epub => "epub",
            Format::Json => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the compiled, inlined stylesheet under the temp directory.
///
/// Written by the inline-stylesheet step, referenced here via `--css`.
pub const INLINED_STYLESHEET: &str = "book.inline.css";

/// Name of the script bundle under the temp directory.
///
/// Written by the bundle-scripts step, exposed to templates as the
/// `scripts` variable so `$if(scripts)$` blocks can pull it in.
pub const BUNDLED_SCRIPT: &str = "book.js";

/// A successfully assembled rendition.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub format: Format,
    pub output: PathBuf,
}

/// Build pandoc's argument vector for one format.
///
/// Pure function over the config: no filesystem access, no environment
/// reads. Paths in the tail are passed through verbatim (they are relative
/// to the source root, which is the working directory pandoc runs in);
/// `output_dir` and `temp_dir` must be absolute so pandoc resolves them
/// independently of that working directory.
pub fn build_args(
    config: &BookConfig,
    format: Format,
    output_dir: &Path,
    temp_dir: &Path,
) -> Vec<String> {
    let profile = config.profile(format);
    let mut args: Vec<String> = vec![
        "--from".to_string(),
        "markdown+smart".to_string(),
        "--standalone".to_string(),
    ];

    args.push("--output".to_string());
    args.push(output_dir.join(&profile.output).to_string_lossy().into_owned());

    if let Some(template) = &profile.template {
        args.push("--template".to_string());
        args.push(template.clone());
    }

    for filter in &profile.filters {
        args.push("--filter".to_string());
        args.push(filter.clone());
    }

    if let Some(paper_size) = &profile.paper_size {
        args.push("--variable".to_string());
        args.push(format!("papersize={paper_size}"));
    }
    if profile.toc {
        args.push("--table-of-contents".to_string());
    }
    if profile.number_sections {
        args.push("--number-sections".to_string());
    }
    if profile.self_contained {
        args.push("--self-contained".to_string());
    }
    args.push("--highlight-style".to_string());
    args.push(config.build.highlight_style.clone());

    if profile.stylesheet {
        args.push("--css".to_string());
        args.push(
            temp_dir
                .join(INLINED_STYLESHEET)
                .to_string_lossy()
                .into_owned(),
        );
    }
    if profile.script {
        args.push("--variable".to_string());
        args.push(format!(
            "scripts={}",
            temp_dir.join(BUNDLED_SCRIPT).to_string_lossy()
        ));
    }

    // BTreeMap iteration keeps variable order deterministic across runs.
    for (key, value) in &profile.variables {
        args.push("--variable".to_string());
        args.push(format!("{key}={value}"));
    }

    args.push(config.metadata.clone());
    args.extend(config.fragments.iter().cloned());

    args
}

/// Assemble one rendition: build the argument vector, run pandoc once, and
/// interpret its exit status.
///
/// Pandoc's stdout is echoed as informational output and its stderr as
/// warnings, whatever the outcome.
pub fn assemble(
    runner: &impl CommandRunner,
    config: &BookConfig,
    format: Format,
    source_root: &Path,
    output_dir: &Path,
    temp_dir: &Path,
) -> Result<Assembled, AssembleError> {
    std::fs::create_dir_all(output_dir)?;

    let args = build_args(config, format, output_dir, temp_dir);
    let run = runner.run(&config.build.pandoc, &args, source_root)?;
    output::print_tool_output("pandoc", &run);

    if !run.success() {
        return Err(AssembleError::CompilerFailed {
            format,
            code: run.code,
        });
    }

    Ok(Assembled {
        format,
        output: output_dir.join(&config.profile(format).output),
    })
}
