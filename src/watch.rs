//! Debounced filesystem watching for save-triggered rebuilds.
//!
//! The watcher subscribes to change notifications under the source root and
//! maps changed paths onto the configured [`WatchRule`]s. Every rule whose
//! glob matches a changed file fires, in declaration order; within one
//! debounce batch each task runs at most once, no matter how many matching
//! files changed.
//!
//! ## Debouncing
//!
//! Events are batched with an explicit debounce window
//! (`serve.debounce_ms`, 500 ms by default): rapid successive saves from an
//! editor collapse into one rebuild instead of one per write.
//!
//! ## Serialized Rebuilds
//!
//! Matched tasks run inline on the watch loop's thread. A change arriving
//! while a rebuild is in progress waits in the channel until the rebuild
//! finishes, so two task runs never write the same output file concurrently.
//! A failed rebuild is reported and the loop keeps watching.

use globset::{Glob, GlobMatcher};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebouncedEvent, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use thiserror::Error;

use crate::config::WatchRule;
use crate::exec::CommandRunner;
use crate::output;
use crate::tasks::{self, BuildContext};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("invalid watch pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: globset::Error,
    },
    #[error("watch rule {pattern:?} names unknown task {task:?}")]
    UnknownTask { pattern: String, task: String },
    #[error("filesystem watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// A compiled watch rule: glob matcher plus the task it triggers.
pub struct CompiledRule {
    matcher: GlobMatcher,
    task: String,
}

/// Compile the rule table, validating globs and task names up front so a
/// typo in `book.toml` surfaces at startup, not on the first file save.
pub fn compile_rules(rules: &[WatchRule]) -> Result<Vec<CompiledRule>, WatchError> {
    rules
        .iter()
        .map(|rule| {
            let glob = Glob::new(&rule.pattern).map_err(|source| WatchError::Pattern {
                pattern: rule.pattern.clone(),
                source,
            })?;
            if tasks::find(&rule.task).is_none() {
                return Err(WatchError::UnknownTask {
                    pattern: rule.pattern.clone(),
                    task: rule.task.clone(),
                });
            }
            Ok(CompiledRule {
                matcher: glob.compile_matcher(),
                task: rule.task.clone(),
            })
        })
        .collect()
}

/// Map one batch of changed source-relative paths to the tasks to run.
///
/// Rules are consulted in declaration order; a task triggered by several
/// rules or several files still appears only once, at the position of the
/// first rule that matched.
pub fn matched_tasks(rules: &[CompiledRule], changed: &[PathBuf]) -> Vec<String> {
    let mut tasks_to_run: Vec<String> = Vec::new();
    for rule in rules {
        let hit = changed.iter().any(|path| rule.matcher.is_match(path));
        if hit && !tasks_to_run.contains(&rule.task) {
            tasks_to_run.push(rule.task.clone());
        }
    }
    tasks_to_run
}

/// Reduce a debounced event batch to source-relative paths worth acting on.
///
/// Paths under the output or temp directory are dropped: those are our own
/// writes, and rebuilding on them would loop forever.
fn relevant_paths(
    events: &[DebouncedEvent],
    source_root: &Path,
    output_dir: &Path,
    temp_dir: &Path,
) -> Vec<PathBuf> {
    events
        .iter()
        .filter(|event| {
            !event.path.starts_with(output_dir) && !event.path.starts_with(temp_dir)
        })
        .filter_map(|event| {
            event
                .path
                .strip_prefix(source_root)
                .ok()
                .map(Path::to_path_buf)
        })
        .collect()
}

/// Watch the source root and re-run matched tasks until the process exits.
///
/// Blocks forever on the happy path. Returns early only if the watcher
/// itself cannot be set up.
pub fn run(
    runner: &impl CommandRunner,
    ctx: &BuildContext<'_>,
    rules: &[WatchRule],
) -> Result<(), WatchError> {
    let compiled = compile_rules(rules)?;

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(
        Duration::from_millis(ctx.config.serve.debounce_ms),
        move |result: Result<Vec<DebouncedEvent>, notify::Error>| {
            // Receiver gone means the process is shutting down.
            let _ = tx.send(result);
        },
    )?;
    debouncer
        .watcher()
        .watch(ctx.source_root, RecursiveMode::Recursive)?;

    output::print_watch_started(ctx.source_root, ctx.config.serve.debounce_ms);

    for batch in rx {
        let events = match batch {
            Ok(events) => events,
            Err(error) => {
                output::print_warning(&format!("watch error: {error}"));
                continue;
            }
        };

        let changed = relevant_paths(&events, ctx.source_root, ctx.output_dir, ctx.temp_dir);
        if changed.is_empty() {
            continue;
        }
        output::print_changes(&changed);

        for task in matched_tasks(&compiled, &changed) {
            output::print_rebuild(&task);
            if let Err(error) = tasks::run_named(runner, ctx, &task) {
                output::print_error(&format!("rebuild failed: {error}"));
            }
        }
    }

    Ok(())
}
