//! Asset pipeline: stylesheet compilation, `url()` inlining, script bundling.
//!
//! Three small steps feeding the HTML and EPUB renditions:
//!
//! 1. **Compile**: the SCSS entry point becomes plain CSS via grass, entirely
//!    in-process. The global minify toggle selects compressed output.
//! 2. **Inline**: every `url(...)` reference to a local file in the compiled
//!    CSS is replaced by a base64 data URI, so the stylesheet has no file
//!    dependencies left. Remote and `data:` URLs pass through untouched.
//! 3. **Bundle**: the script entry point is bundled into one file by the
//!    external `esbuild` binary. The same minify toggle adds `--minify`;
//!    there is no way to minify styles and scripts independently.
//!
//! All three write their results under the temp directory; the document
//! assembler picks them up from there.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::exec::{CommandRunner, ExecError};
use crate::output;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SCSS compilation failed: {0}")]
    Scss(String),
    #[error("inlined asset not found: {0}")]
    AssetNotFound(PathBuf),
    #[error(transparent)]
    Launch(#[from] ExecError),
    #[error("esbuild failed ({}): {detail}", crate::exec::describe_code(.code))]
    BundlerFailed { code: Option<i32>, detail: String },
}

/// Compile the SCSS entry point to CSS.
///
/// `load_paths` are the include search paths for `@use`/`@import`. With
/// `minify` set the output is compressed (whitespace stripped, rules merged);
/// otherwise it is expanded for inspection.
pub fn compile_stylesheet(
    entry: &Path,
    load_paths: &[PathBuf],
    minify: bool,
) -> Result<String, AssetError> {
    let style = if minify {
        grass::OutputStyle::Compressed
    } else {
        grass::OutputStyle::Expanded
    };
    let mut options = grass::Options::default().style(style);
    for path in load_paths {
        options = options.load_path(path);
    }
    grass::from_path(entry, &options).map_err(|e| AssetError::Scss(e.to_string()))
}

/// Rewrite every local `url(...)` in `css` into a base64 data URI.
///
/// Relative references resolve against `base_dir` (the directory of the
/// stylesheet entry point). References that are already remote (`http:`,
/// `https:`, protocol-relative `//`), already inlined (`data:`), or
/// fragment-only (`#`) are left untouched. A reference to a missing local
/// file is an error: a self-contained stylesheet with a dangling reference
/// would fail silently at render time instead.
pub fn inline_stylesheet(css: &str, base_dir: &Path) -> Result<String, AssetError> {
    let mut result = String::with_capacity(css.len());
    let mut rest = css;

    while let Some(start) = rest.find("url(") {
        let after_open = &rest[start + 4..];
        let Some(close) = after_open.find(')') else {
            // Unbalanced url( at the end of the sheet; emit as-is.
            break;
        };

        result.push_str(&rest[..start]);
        let reference = after_open[..close].trim().trim_matches(['"', '\'']);

        if is_external(reference) {
            result.push_str(&rest[start..start + 4 + close + 1]);
        } else {
            let data_uri = to_data_uri(reference, base_dir)?;
            result.push_str("url(\"");
            result.push_str(&data_uri);
            result.push_str("\")");
        }
        rest = &after_open[close + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

fn is_external(reference: &str) -> bool {
    reference.starts_with("http:")
        || reference.starts_with("https:")
        || reference.starts_with("//")
        || reference.starts_with("data:")
        || reference.starts_with('#')
        || reference.is_empty()
}

fn to_data_uri(reference: &str, base_dir: &Path) -> Result<String, AssetError> {
    // Strip query string and fragment; font references commonly carry both
    // (e.g. "font.woff2?v=4#iefix") but the file on disk does not.
    let file_part = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference);

    let path = base_dir.join(file_part);
    if !path.is_file() {
        return Err(AssetError::AssetNotFound(path));
    }
    let bytes = std::fs::read(&path)?;
    let mime = mime_for(&path);
    Ok(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
}

/// Content type from file extension. Unknown extensions fall back to
/// `application/octet-stream`, which browsers accept inside data URIs.
fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("css") => "text/css",
        _ => "application/octet-stream",
    }
}

/// Bundle the script entry point into one file with esbuild.
///
/// `entry` is relative to `source_root`, which is also the bundler's working
/// directory; `outfile` should be absolute. With `minify` set the whole
/// bundle is minified.
pub fn bundle_scripts(
    runner: &impl CommandRunner,
    esbuild: &str,
    entry: &str,
    source_root: &Path,
    outfile: &Path,
    minify: bool,
) -> Result<(), AssetError> {
    let mut args = vec![
        "--bundle".to_string(),
        entry.to_string(),
        format!("--outfile={}", outfile.display()),
    ];
    if minify {
        args.push("--minify".to_string());
    }

    let run = runner.run(esbuild, &args, source_root)?;
    output::print_tool_output("esbuild", &run);

    if !run.success() {
        return Err(AssetError::BundlerFailed {
            code: run.code,
            detail: first_line(&run.stderr),
        });
    }
    Ok(())
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("").to_string()
}
