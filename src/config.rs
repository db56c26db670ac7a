//! Book configuration module.
//!
//! Handles loading and validating `book.toml` from the source root. The
//! configuration is read exactly once at startup, turned into an immutable
//! [`BookConfig`], and passed by reference into every component. Nothing in
//! the build mutates it.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! # Ordered chapter fragments. Order here is chapter order in every
//! # rendition (HTML, PDF, EPUB, JSON alike).
//! fragments = [
//!     "chapters/01-intro.md",
//!     "chapters/02-basics.md",
//! ]
//!
//! # Pandoc metadata file, passed before the fragments.
//! metadata = "metadata.yaml"
//!
//! [assets]
//! stylesheet = "styles/book.scss"   # SCSS entry point
//! load_paths = ["styles"]           # SCSS include search paths
//! script = "scripts/book.js"        # Script bundle entry point
//!
//! [build]
//! pandoc = "pandoc"                 # Document compiler binary
//! esbuild = "esbuild"               # Script bundler binary
//! highlight_style = "tango"         # Code highlight style, all formats
//! archive = "book.zip"              # Name of the packaged archive
//!
//! [formats.html]
//! output = "book.html"
//! template = "templates/book.html"
//! filters = ["filters/tables.py"]
//! self_contained = true
//! stylesheet = true                 # Pass the compiled CSS to pandoc
//!
//! [formats.pdf]
//! output = "book.pdf"
//! template = "templates/book.tex"
//! filters = ["filters/callouts.py", "filters/columns.py"]
//! paper_size = "a4"
//! toc = true
//! number_sections = true
//!
//! [formats.epub]
//! output = "book.epub"
//! stylesheet = true
//!
//! [formats.json]
//! output = "book.json"
//!
//! [formats.html.variables]          # Free-form pandoc variables
//! lang = "en"
//!
//! [serve]
//! port = 8000                       # Preview server port
//! debounce_ms = 500                 # Watcher event batching window
//!
//! # Watch rules map change globs to task re-runs. Every rule matching a
//! # changed file fires, in declaration order.
//! [[watch]]
//! pattern = "chapters/**"
//! task = "html"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early. Unknown format names (anything outside
//! html/pdf/epub/json) are likewise rejected at load time, before any
//! subprocess is spawned.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::assemble::Format;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Book configuration loaded from `book.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BookConfig {
    /// Ordered Markdown fragments making up the book. Order is significant:
    /// it determines chapter order in every output format.
    pub fragments: Vec<String>,
    /// Pandoc metadata file, passed immediately before the fragments.
    pub metadata: String,
    /// Stylesheet and script entry points.
    pub assets: AssetsConfig,
    /// External tool names and shared layout settings.
    pub build: BuildConfig,
    /// One profile per output format.
    pub formats: FormatsConfig,
    /// Preview server and watcher settings.
    pub serve: ServeConfig,
    /// Watch rules, fired in declaration order.
    #[serde(rename = "watch")]
    pub watch_rules: Vec<WatchRule>,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            fragments: Vec::new(),
            metadata: "metadata.yaml".to_string(),
            assets: AssetsConfig::default(),
            build: BuildConfig::default(),
            formats: FormatsConfig::default(),
            serve: ServeConfig::default(),
            watch_rules: default_watch_rules(),
        }
    }
}

impl BookConfig {
    /// Load `book.toml` from the source root.
    ///
    /// A missing file yields the stock defaults; a present but malformed
    /// file is an error.
    pub fn load(source_root: &Path) -> Result<Self, ConfigError> {
        let path = source_root.join("book.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config values that serde cannot check structurally.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fragments.is_empty() {
            return Err(ConfigError::Validation(
                "fragments must list at least one Markdown file".into(),
            ));
        }
        if self.serve.port == 0 {
            return Err(ConfigError::Validation("serve.port must be non-zero".into()));
        }
        if self.serve.debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "serve.debounce_ms must be non-zero".into(),
            ));
        }
        for format in Format::ALL {
            if self.profile(format).output.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "formats.{}.output must not be empty (a partial [formats.{}] table \
                     must restate output)",
                    format.as_str(),
                    format.as_str()
                )));
            }
        }
        for rule in &self.watch_rules {
            if globset::Glob::new(&rule.pattern).is_err() {
                return Err(ConfigError::Validation(format!(
                    "watch pattern {:?} is not a valid glob",
                    rule.pattern
                )));
            }
        }
        Ok(())
    }

    /// Verify that every file the build would touch exists, without
    /// building anything. Returns the checked paths in check order.
    ///
    /// This catches at `check` time what would otherwise surface as a
    /// pandoc or esbuild failure mid-build: missing fragments, metadata,
    /// templates, filter executables, or asset entry points.
    pub fn check_sources(&self, source_root: &Path) -> Result<Vec<String>, ConfigError> {
        let mut checked = Vec::new();
        let mut require = |relative: &str| -> Result<(), ConfigError> {
            if !source_root.join(relative).is_file() {
                return Err(ConfigError::Validation(format!(
                    "missing source file: {relative}"
                )));
            }
            checked.push(relative.to_string());
            Ok(())
        };

        require(&self.metadata)?;
        for fragment in &self.fragments {
            require(fragment)?;
        }
        require(&self.assets.stylesheet)?;
        require(&self.assets.script)?;
        for format in Format::ALL {
            let profile = self.profile(format);
            if let Some(template) = &profile.template {
                require(template)?;
            }
            for filter in &profile.filters {
                require(filter)?;
            }
        }
        Ok(checked)
    }

    /// List Markdown files under the source root that no fragment references.
    ///
    /// A chapter saved to disk but never added to `fragments` silently stays
    /// out of every rendition; the `check` command surfaces these as
    /// warnings. Returned paths are source-relative and sorted.
    pub fn unlisted_markdown(&self, source_root: &Path) -> Vec<String> {
        let mut unlisted = Vec::new();
        for entry in walkdir::WalkDir::new(source_root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
        {
            let Ok(relative) = entry.path().strip_prefix(source_root) else {
                continue;
            };
            if relative.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let name = relative.to_string_lossy().into_owned();
            if !self.fragments.contains(&name) {
                unlisted.push(name);
            }
        }
        unlisted.sort();
        unlisted
    }

    /// The profile for one output format.
    pub fn profile(&self, format: Format) -> &FormatProfile {
        match format {
            Format::Html => &self.formats.html,
            Format::Pdf => &self.formats.pdf,
            Format::Epub => &self.formats.epub,
            Format::Json => &self.formats.json,
        }
    }
}

/// Stylesheet and script entry points, relative to the source root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// SCSS entry point compiled to the book stylesheet.
    pub stylesheet: String,
    /// Include search paths for SCSS `@use`/`@import`.
    pub load_paths: Vec<String>,
    /// Script bundle entry point.
    pub script: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            stylesheet: "styles/book.scss".to_string(),
            load_paths: vec!["styles".to_string()],
            script: "scripts/book.js".to_string(),
        }
    }
}

/// External tool names and layout settings shared by every format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Document compiler binary. A bare name resolves through PATH.
    pub pandoc: String,
    /// Script bundler binary.
    pub esbuild: String,
    /// Pandoc highlight style applied to every format.
    pub highlight_style: String,
    /// File name of the archive produced by the package task.
    pub archive: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            pandoc: "pandoc".to_string(),
            esbuild: "esbuild".to_string(),
            highlight_style: "tango".to_string(),
            archive: "book.zip".to_string(),
        }
    }
}

/// The four format profiles. The set of formats is closed: pandoc's output
/// matrix is what it is, and the task registry enumerates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatsConfig {
    pub html: FormatProfile,
    pub pdf: FormatProfile,
    pub epub: FormatProfile,
    pub json: FormatProfile,
}

impl Default for FormatsConfig {
    fn default() -> Self {
        Self {
            html: FormatProfile::default_html(),
            pdf: FormatProfile::default_pdf(),
            epub: FormatProfile::default_epub(),
            json: FormatProfile::default_json(),
        }
    }
}

/// Per-format build profile.
///
/// Each profile is independently resolvable: assembling one format reads
/// nothing from any other profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatProfile {
    /// Output file name, written under the output directory.
    pub output: String,
    /// Pandoc template path, relative to the source root.
    pub template: Option<String>,
    /// Filter executables, passed to pandoc in order, one `--filter` each.
    pub filters: Vec<String>,
    /// Free-form pandoc variables (`--variable key=value`).
    pub variables: BTreeMap<String, String>,
    /// Inline every external resource into the output file.
    pub self_contained: bool,
    /// Emit a table of contents.
    pub toc: bool,
    /// Number sections.
    pub number_sections: bool,
    /// Paper size variable (PDF).
    pub paper_size: Option<String>,
    /// Pass the compiled, inlined book stylesheet to pandoc.
    pub stylesheet: bool,
    /// Expose the bundled script to the template as the `scripts` variable.
    pub script: bool,
}

impl Default for FormatProfile {
    fn default() -> Self {
        Self {
            output: String::new(),
            template: None,
            filters: Vec::new(),
            variables: BTreeMap::new(),
            self_contained: false,
            toc: false,
            number_sections: false,
            paper_size: None,
            stylesheet: false,
            script: false,
        }
    }
}

impl FormatProfile {
    /// Stock HTML profile: templated, self-contained single file with the
    /// compiled stylesheet embedded and the table filter applied.
    pub fn default_html() -> Self {
        Self {
            output: "book.html".to_string(),
            template: Some("templates/book.html".to_string()),
            filters: vec!["filters/tables.py".to_string()],
            self_contained: true,
            stylesheet: true,
            script: true,
            ..Self::default()
        }
    }

    /// Stock PDF profile: LaTeX template, callout and multi-column filters,
    /// A4 paper, table of contents, numbered sections.
    pub fn default_pdf() -> Self {
        Self {
            output: "book.pdf".to_string(),
            template: Some("templates/book.tex".to_string()),
            filters: vec![
                "filters/callouts.py".to_string(),
                "filters/columns.py".to_string(),
            ],
            toc: true,
            number_sections: true,
            paper_size: Some("a4".to_string()),
            ..Self::default()
        }
    }

    /// Stock EPUB profile: no template or filters, stylesheet embedded.
    pub fn default_epub() -> Self {
        Self {
            output: "book.epub".to_string(),
            stylesheet: true,
            ..Self::default()
        }
    }

    /// Stock JSON profile: pandoc's AST dump, nothing else.
    pub fn default_json() -> Self {
        Self {
            output: "book.json".to_string(),
            ..Self::default()
        }
    }
}

/// Preview server and watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    /// Local port for the preview server.
    pub port: u16,
    /// Watcher debounce window in milliseconds. Changes arriving within one
    /// window are batched into a single rebuild.
    pub debounce_ms: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            debounce_ms: 500,
        }
    }
}

/// One watch rule: a glob over source-relative paths and the task to re-run
/// when a matching file changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchRule {
    /// Glob matched against paths relative to the source root.
    pub pattern: String,
    /// Registry task name to re-run.
    pub task: String,
}

/// Stock watch rules: anything feeding the HTML rendition triggers an HTML
/// rebuild. PDF and EPUB are too slow for save-triggered rebuilds; run them
/// explicitly.
fn default_watch_rules() -> Vec<WatchRule> {
    let rule = |pattern: &str, task: &str| WatchRule {
        pattern: pattern.to_string(),
        task: task.to_string(),
    };
    vec![
        rule("chapters/**", "html"),
        rule("styles/**", "html"),
        rule("scripts/**", "html"),
        rule("templates/**", "html"),
        rule("metadata.yaml", "html"),
    ]
}

/// Return the stock config file with all options documented.
pub fn stock_config_toml() -> String {
    r##"# bookpress configuration
# All options are optional - the values below are the defaults.

# Ordered chapter fragments. Order here is chapter order in every rendition
# (HTML, PDF, EPUB, JSON alike). Paths are relative to this file.
fragments = [
    "chapters/01-intro.md",
]

# Pandoc metadata file, passed before the fragments.
metadata = "metadata.yaml"

[assets]
stylesheet = "styles/book.scss"   # SCSS entry point
load_paths = ["styles"]           # SCSS include search paths
script = "scripts/book.js"        # Script bundle entry point

[build]
pandoc = "pandoc"                 # Document compiler binary
esbuild = "esbuild"               # Script bundler binary
highlight_style = "tango"         # Code highlight style, all formats
archive = "book.zip"              # Name of the packaged archive

[formats.html]
output = "book.html"
template = "templates/book.html"
filters = ["filters/tables.py"]
self_contained = true             # Single distributable file
stylesheet = true                 # Embed the compiled CSS
script = true                     # Expose the script bundle to the template

[formats.pdf]
output = "book.pdf"
template = "templates/book.tex"
filters = ["filters/callouts.py", "filters/columns.py"]
paper_size = "a4"
toc = true
number_sections = true

[formats.epub]
output = "book.epub"
stylesheet = true

[formats.json]
output = "book.json"

# Free-form pandoc variables, per format:
# [formats.html.variables]
# lang = "en"

[serve]
port = 8000                       # Preview server port
debounce_ms = 500                 # Watcher event batching window

# Watch rules map change globs to task re-runs. Every rule matching a
# changed file fires, in declaration order.
[[watch]]
pattern = "chapters/**"
task = "html"

[[watch]]
pattern = "styles/**"
task = "html"

[[watch]]
pattern = "scripts/**"
task = "html"

[[watch]]
pattern = "templates/**"
task = "html"

[[watch]]
pattern = "metadata.yaml"
task = "html"
"##
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
fragments = ["intro.md"]
"#
    }

    #[test]
    fn default_config_has_four_profiles() {
        let config = BookConfig::default();
        assert_eq!(config.formats.html.output, "book.html");
        assert_eq!(config.formats.pdf.output, "book.pdf");
        assert_eq!(config.formats.epub.output, "book.epub");
        assert_eq!(config.formats.json.output, "book.json");
    }

    #[test]
    fn pdf_profile_defaults_match_print_layout() {
        let pdf = FormatProfile::default_pdf();
        assert!(pdf.toc);
        assert!(pdf.number_sections);
        assert_eq!(pdf.paper_size.as_deref(), Some("a4"));
        assert_eq!(pdf.filters.len(), 2);
        assert!(!pdf.self_contained);
    }

    #[test]
    fn html_profile_is_self_contained_with_stylesheet() {
        let html = FormatProfile::default_html();
        assert!(html.self_contained);
        assert!(html.stylesheet);
        assert_eq!(html.filters, vec!["filters/tables.py".to_string()]);
    }

    #[test]
    fn parse_minimal_config() {
        let config: BookConfig = toml::from_str(minimal_toml()).unwrap();
        assert_eq!(config.fragments, vec!["intro.md".to_string()]);
        assert_eq!(config.metadata, "metadata.yaml");
        // Defaults fill in everything else
        assert_eq!(config.serve.port, 8000);
        assert_eq!(config.watch_rules.len(), 5);
    }

    #[test]
    fn partial_format_override_keeps_other_fields() {
        let toml_str = r#"
fragments = ["intro.md"]

[formats.pdf]
paper_size = "letter"
"#;
        let config: BookConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.formats.pdf.paper_size.as_deref(), Some("letter"));
        // Overriding one profile field resets the rest of that profile to
        // the serde default, not the pdf stock profile. Sparse users set
        // the whole table; this test documents the behavior.
        assert_eq!(config.formats.pdf.output, "");
        // Untouched profiles keep their stock defaults.
        assert_eq!(config.formats.html.output, "book.html");
    }

    #[test]
    fn unknown_keys_rejected() {
        let toml_str = r#"
fragments = ["intro.md"]
typo_key = true
"#;
        let result: Result<BookConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        let toml_str = r#"
fragments = ["intro.md"]

[formats.xml]
output = "book.xml"
"#;
        let result: Result<BookConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn empty_fragment_list_fails_validation() {
        let config = BookConfig::default();
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_port_fails_validation() {
        let mut config = BookConfig::default();
        config.fragments = vec!["intro.md".to_string()];
        config.serve.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn bad_watch_glob_fails_validation() {
        let mut config = BookConfig::default();
        config.fragments = vec!["intro.md".to_string()];
        config.watch_rules.push(WatchRule {
            pattern: "chapters/[".to_string(),
            task: "html".to_string(),
        });
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn stock_config_parses_and_validates() {
        let config: BookConfig = toml::from_str(&stock_config_toml()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.fragments, vec!["chapters/01-intro.md".to_string()]);
    }

    fn complete_tree() -> tempfile::TempDir {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        for dir in ["styles", "scripts", "templates", "filters"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        for file in [
            "metadata.yaml",
            "intro.md",
            "styles/book.scss",
            "scripts/book.js",
            "templates/book.html",
            "templates/book.tex",
            "filters/tables.py",
            "filters/callouts.py",
            "filters/columns.py",
        ] {
            fs::write(root.join(file), "").unwrap();
        }
        tmp
    }

    #[test]
    fn check_sources_passes_on_complete_tree() {
        let tmp = complete_tree();
        let mut config = BookConfig::default();
        config.fragments = vec!["intro.md".to_string()];

        let checked = config.check_sources(tmp.path()).unwrap();
        assert!(checked.contains(&"metadata.yaml".to_string()));
        assert!(checked.contains(&"intro.md".to_string()));
        assert!(checked.contains(&"templates/book.tex".to_string()));
    }

    #[test]
    fn check_sources_reports_missing_fragment() {
        let tmp = complete_tree();
        let mut config = BookConfig::default();
        config.fragments = vec!["intro.md".to_string(), "gone.md".to_string()];

        let result = config.check_sources(tmp.path());
        assert!(
            matches!(result, Err(ConfigError::Validation(ref msg)) if msg.contains("gone.md"))
        );
    }

    #[test]
    fn check_sources_reports_missing_filter() {
        let tmp = complete_tree();
        fs::remove_file(tmp.path().join("filters/callouts.py")).unwrap();
        let mut config = BookConfig::default();
        config.fragments = vec!["intro.md".to_string()];

        let result = config.check_sources(tmp.path());
        assert!(matches!(
            result,
            Err(ConfigError::Validation(ref msg)) if msg.contains("filters/callouts.py")
        ));
    }

    #[test]
    fn unlisted_markdown_reports_orphan_chapters() {
        let tmp = complete_tree();
        fs::write(tmp.path().join("draft.md"), "# Draft\n").unwrap();
        let mut config = BookConfig::default();
        config.fragments = vec!["intro.md".to_string()];

        let unlisted = config.unlisted_markdown(tmp.path());
        assert_eq!(unlisted, vec!["draft.md".to_string()]);
    }

    #[test]
    fn unlisted_markdown_ignores_listed_fragments_and_other_files() {
        let tmp = complete_tree();
        let mut config = BookConfig::default();
        config.fragments = vec!["intro.md".to_string()];

        // intro.md is listed; metadata.yaml and the templates are not
        // Markdown at all.
        assert!(config.unlisted_markdown(tmp.path()).is_empty());
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = BookConfig::load(tmp.path()).unwrap();
        assert_eq!(config.metadata, "metadata.yaml");
    }

    #[test]
    fn load_rejects_invalid_config() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("book.toml"), "fragments = []\n").unwrap();
        assert!(matches!(
            BookConfig::load(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }
}
