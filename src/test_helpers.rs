//! Shared test fixtures.
//!
//! [`BookFixture`] lays out a minimal but complete book source tree in a
//! temp directory and hands out a ready-made [`BuildContext`] over it, so
//! task and watch tests don't each rebuild the same scaffolding.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::BookConfig;
use crate::tasks::BuildContext;

pub struct BookFixture {
    // Held for its Drop; the path accessors below are what tests use.
    _tmp: TempDir,
    source_root: PathBuf,
    output_dir: PathBuf,
    temp_dir: PathBuf,
    config: BookConfig,
}

impl BookFixture {
    /// A two-chapter book with a stylesheet, a script entry point, and a
    /// metadata file. Templates and filters are configured but not created
    /// on disk; the mock runner never checks.
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let source_root = tmp.path().join("book");

        fs::create_dir_all(source_root.join("chapters")).unwrap();
        fs::write(
            source_root.join("chapters/01-intro.md"),
            "# Introduction\n\nHello.\n",
        )
        .unwrap();
        fs::write(
            source_root.join("chapters/02-basics.md"),
            "# Basics\n\nWorld.\n",
        )
        .unwrap();
        fs::write(source_root.join("metadata.yaml"), "title: Test Book\n").unwrap();

        fs::create_dir_all(source_root.join("styles")).unwrap();
        fs::write(
            source_root.join("styles/book.scss"),
            "body {\n  color: #111;\n  a {\n    color: #222;\n  }\n}\n",
        )
        .unwrap();

        fs::create_dir_all(source_root.join("scripts")).unwrap();
        fs::write(source_root.join("scripts/book.js"), "console.log(1);\n").unwrap();

        let mut config = BookConfig::default();
        config.fragments = vec![
            "chapters/01-intro.md".to_string(),
            "chapters/02-basics.md".to_string(),
        ];

        Self {
            source_root,
            output_dir: tmp.path().join("dist"),
            temp_dir: tmp.path().join("temp"),
            _tmp: tmp,
            config,
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn config_mut(&mut self) -> &mut BookConfig {
        &mut self.config
    }

    pub fn context(&self, minify: bool) -> BuildContext<'_> {
        BuildContext {
            config: &self.config,
            source_root: &self.source_root,
            output_dir: &self.output_dir,
            temp_dir: &self.temp_dir,
            minify,
        }
    }
}
