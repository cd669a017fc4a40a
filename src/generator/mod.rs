//! Generator module provides the page renderers for each output kind.
//!
//! This module contains the common interface for chapter renderers and the
//! two implementations: [`pdf::PdfGenerator`] and [`long_image::LongImageGenerator`].
//! Rendering is CPU-bound and synchronous; callers run it on a blocking thread.

use crate::error::{Error, Result};
use crate::path_utils::partial_path;
use crate::types::ArtifactKind;
use std::fs;
use std::path::{Path, PathBuf};

pub mod long_image;
pub mod pdf;

pub use long_image::LongImageGenerator;
pub use pdf::PdfGenerator;

/// Pages decoded together before being released.
pub const PAGE_BATCH_SIZE: usize = 5;

/// Encoding settings shared by both generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// JPEG quality (1-100) of pages embedded into PDFs.
    pub image_quality: u8,
    /// Trade encoding time for smaller output files.
    pub optimize: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            image_quality: 100,
            optimize: false,
        }
    }
}

/// Outcome of rendering one chapter into one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub output: PathBuf,
    /// Pages that made it into the artifact.
    pub pages_rendered: usize,
    /// Whether a file was written at `output`.
    pub written: bool,
    /// Pages that were skipped and other non-fatal problems.
    pub warnings: Vec<String>,
}

impl RenderReport {
    /// A report for an artifact that could not be produced because no page opened.
    pub fn nothing_written(output: &Path, mut warnings: Vec<String>) -> Self {
        log::warn!("No readable pages, skipping {:?}", output);
        warnings.push(format!(
            "no readable pages, {:?} not written",
            output.file_name().unwrap_or_default()
        ));
        Self {
            output: output.to_path_buf(),
            pages_rendered: 0,
            written: false,
            warnings,
        }
    }
}

/// Common interface for all chapter renderers.
///
/// A `Generator` turns an ordered page sequence into one output file. Pages that
/// cannot be opened are skipped and reported as warnings; only a failure to write
/// the final file is returned as an error ([`Error::RenderWrite`]).
pub trait Generator: Send + Sync {
    /// The artifact kind this generator produces.
    fn kind(&self) -> ArtifactKind;

    /// Renders `pages` (in order) into `output`.
    ///
    /// # Parameters
    /// * `pages` - Page image paths, already in reading order
    /// * `output` - Final path of the artifact
    ///
    /// # Returns
    /// * `Result<RenderReport>` - What was written, or a write error
    fn render(&self, pages: &[PathBuf], output: &Path) -> Result<RenderReport>;
}

/// Writes an artifact through a `.part` sibling and renames it into place.
///
/// The partial file is removed if `write` fails, so an interrupted write never
/// leaves a file at `output` that a later run would take as finished.
pub(crate) fn write_atomically<F>(output: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let partial = partial_path(output);

    if let Err(e) = write(&partial) {
        let _ = fs::remove_file(&partial);
        log::error!("Failed to write {:?}: {}", output, e);
        return Err(match e {
            Error::RenderWrite { .. } => e,
            other => Error::render_write(output, other),
        });
    }

    fs::rename(&partial, output).map_err(|e| {
        let _ = fs::remove_file(&partial);
        log::error!("Failed to move {:?} into place: {}", output, e);
        Error::render_write(output, e)
    })
}
