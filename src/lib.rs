//! # Bookpress
//!
//! A single-binary multi-format book builder. Your filesystem is the data
//! source: an ordered list of Markdown chapter fragments plus a metadata file
//! become one logical document, rendered to HTML, PDF, EPUB, and JSON by
//! driving the external `pandoc` compiler.
//!
//! # Architecture: Tasks Over a Fixed Registry
//!
//! Every CLI command is a named task: a fixed, ordered sequence of steps that
//! runs to completion or aborts at the first failure.
//!
//! ```text
//! html     = [compile-stylesheet, inline-stylesheet, bundle-scripts, assemble(html)]
//! pdf      = [assemble(pdf)]
//! epub     = [compile-stylesheet, inline-stylesheet, assemble(epub)]
//! json     = [assemble(json)]
//! all      = assets once, then assemble html, pdf, epub
//! package  = all, then archive the outputs
//! ```
//!
//! There is no conditional branching inside a task. Steps communicate only
//! through files in the temp directory, so each one is independently
//! inspectable after a run.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `book.toml` loading and validation, fragment list, per-format profiles |
//! | [`exec`] | Subprocess seam: run an external tool, get a structured outcome |
//! | [`assets`] | Stylesheet compilation (grass), `url()` inlining, script bundling (esbuild) |
//! | [`assemble`] | The document assembler: builds the pandoc argument vector and runs it |
//! | [`tasks`] | The task registry and the sequential step executor |
//! | [`package`] | Zips the produced renditions into one distributable archive |
//! | [`watch`] | Debounced filesystem watcher mapping change globs to task re-runs |
//! | [`serve`] | Static HTTP preview server over the output directory |
//! | [`output`] | CLI output formatting for task runs and watch events |
//!
//! # Design Decisions
//!
//! ## One Fragment List, Every Format
//!
//! The ordered fragment list is defined once in `book.toml` and shared by all
//! format profiles. Pandoc concatenates trailing positional file arguments
//! into one document, so fragment order *is* chapter order, identically in
//! every rendition. [`assemble::build_args`] is a pure function over the
//! config precisely so this invariant is testable without spawning anything.
//!
//! ## Argument Vectors, Never Shell Strings
//!
//! External tools are invoked with an explicit argument vector through
//! [`exec::CommandRunner`]; no shell is involved at any point, so paths with
//! spaces need no escaping. The trait seam also lets tests record the exact
//! command a step would have run.
//!
//! ## In-Process Stylesheet Compilation
//!
//! The SCSS theme is compiled with [grass](https://docs.rs/grass), a pure
//! Rust SASS implementation. The only tools the user must install are the two
//! the book genuinely depends on: `pandoc` and `esbuild`.
//!
//! ## Serialized Rebuilds
//!
//! The watch driver runs matched tasks inline on its own thread, one batch at
//! a time. Two rebuilds can never race on the same output file, at the cost
//! of change events queueing up behind a slow PDF build.

pub mod assemble;
pub mod assets;
pub mod config;
pub mod exec;
pub mod output;
pub mod package;
pub mod serve;
pub mod tasks;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
