//! Distributable packaging: zip the produced renditions into one archive.
//!
//! The package task runs after `all`, so by the time this module is invoked
//! the HTML, PDF, and EPUB outputs exist under the output directory. They are
//! zipped flat (no directory structure) into the archive named by
//! `build.archive`. The JSON rendition is a debugging artifact and stays out
//! of the archive.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::assemble::Format;
use crate::config::BookConfig;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("cannot package, rendition missing: {0} (run the all task first)")]
    MissingRendition(PathBuf),
}

/// The renditions that go into the distributable archive.
const PACKAGED_FORMATS: [Format; 3] = [Format::Html, Format::Pdf, Format::Epub];

/// Archive the distributable renditions into `build.archive` under the
/// output directory. Returns the archive path.
///
/// All three renditions must already exist; a missing one is an error before
/// any byte is written, so a half-packaged archive never replaces a good one.
pub fn package(config: &BookConfig, output_dir: &Path) -> Result<PathBuf, PackageError> {
    let entries: Vec<(String, PathBuf)> = PACKAGED_FORMATS
        .into_iter()
        .map(|format| {
            let name = config.profile(format).output.clone();
            let path = output_dir.join(&name);
            (name, path)
        })
        .collect();

    for (_, path) in &entries {
        if !path.is_file() {
            return Err(PackageError::MissingRendition(path.clone()));
        }
    }

    let archive_path = output_dir.join(&config.build.archive);
    let writer = BufWriter::new(File::create(&archive_path)?);
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, path) in &entries {
        zip.start_file(name.as_str(), options)?;
        let mut file = File::open(path)?;
        io::copy(&mut file, &mut zip)?;
    }

    zip.finish()?;
    Ok(archive_path)
}
