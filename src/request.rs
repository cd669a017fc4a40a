use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::generator::RenderSettings;
use crate::types::ArtifactKind;

/// Upper bound of the default worker count.
pub const MAX_DEFAULT_WORKERS: usize = 8;

/// Default pool size: available parallelism, capped at [`MAX_DEFAULT_WORKERS`].
pub fn default_max_workers() -> usize {
    num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS)
}

/// Immutable parameters of one conversion run, built declaratively using the builder pattern.
///
/// The settings file of the surrounding application is not read here; the
/// caller resolves it into a request. Defaults match a first launch: PDF output
/// on, long images off, full quality, no PDF optimization.
///
/// ```rust,no_run
/// # use comicpress::prelude::*;
/// # fn main() -> comicpress::error::Result<()> {
/// let request = ConversionRequest::builder()
///     .input_root("./input")
///     .output_root("./output")
///     .generate_long_image(true)
///     .max_workers(4)
///     .build()?;
/// request.preflight_check()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, derive_builder::Builder)]
#[builder(build_fn(validate = "Self::validate"))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConversionRequest {
    /// Folder holding one subfolder per comic.
    #[builder(setter(into))]
    pub input_root: PathBuf,

    /// Folder receiving `<comic>_pdf/`, `<comic>_long/` and their archives.
    /// Created at the start of the run if missing.
    #[builder(setter(into))]
    pub output_root: PathBuf,

    /// Produce `<chapter>.pdf` for every chapter.
    #[builder(default = "true")]
    pub generate_pdf: bool,

    /// Produce `<chapter>_long.png` for every chapter.
    #[builder(default = "false")]
    pub generate_long_image: bool,

    /// Size of the worker pool shared by all chapters of all comics.
    #[builder(default = "default_max_workers()")]
    pub max_workers: usize,

    /// JPEG quality (1-100) of the pages embedded in PDFs.
    #[builder(default = "100")]
    pub image_quality: u8,

    /// Write smaller files: leaner PDFs and best PNG compression.
    #[builder(default = "false")]
    pub optimize_pdf: bool,
}

impl ConversionRequest {
    /// Creates a new builder for configuring a `ConversionRequest`.
    pub fn builder() -> ConversionRequestBuilder {
        ConversionRequestBuilder::default()
    }

    /// Checks that the request can start a run, without touching the filesystem
    /// beyond reading the input root's metadata.
    ///
    /// # Returns
    ///
    /// * `Ok(&self)` - The request is usable
    /// * `Err(Error::NotFound)` - The input root does not exist
    /// * `Err(Error::InvalidRequest)` - Any other problem
    pub fn preflight_check(&self) -> Result<&Self> {
        if self.input_root.as_os_str().is_empty() {
            return Err(Error::InvalidRequest("Input folder is required".to_string()));
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(Error::InvalidRequest(
                "Output folder is required".to_string(),
            ));
        }
        if !self.input_root.exists() {
            return Err(Error::NotFound(format!(
                "Input folder does not exist: {:?}",
                self.input_root
            )));
        }
        if !self.input_root.is_dir() {
            return Err(Error::InvalidRequest(format!(
                "Input path is not a folder: {:?}",
                self.input_root
            )));
        }
        if self.output_root.exists() && !self.output_root.is_dir() {
            return Err(Error::InvalidRequest(format!(
                "Output path is not a folder: {:?}",
                self.output_root
            )));
        }
        Ok(self)
    }

    /// The artifact kinds this request asks for.
    pub fn requested_kinds(&self) -> Vec<ArtifactKind> {
        let mut kinds = Vec::with_capacity(2);
        if self.generate_pdf {
            kinds.push(ArtifactKind::Pdf);
        }
        if self.generate_long_image {
            kinds.push(ArtifactKind::LongImage);
        }
        kinds
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            image_quality: self.image_quality,
            optimize: self.optimize_pdf,
        }
    }
}

impl ConversionRequestBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(quality) = self.image_quality {
            if !(1..=100).contains(&quality) {
                return Err("Image quality must be between 1 and 100.".to_string());
            }
        }

        if let Some(workers) = self.max_workers {
            if workers == 0 {
                return Err("At least one worker is required.".to_string());
            }
        }

        let generate_pdf = self.generate_pdf.unwrap_or(true);
        let generate_long_image = self.generate_long_image.unwrap_or(false);
        if !generate_pdf && !generate_long_image {
            return Err("Enable PDF output, long image output, or both.".to_string());
        }

        Ok(())
    }
}

/// Creates `<base>/input` and `<base>/output` if they are missing.
///
/// This is what a first launch does before showing the folder pickers.
///
/// # Returns
///
/// * `Result<(PathBuf, PathBuf)>` - The input and output folder paths
pub fn ensure_default_folders(base: &Path) -> Result<(PathBuf, PathBuf)> {
    let input = base.join("input");
    let output = base.join("output");

    for folder in [&input, &output] {
        if !folder.exists() {
            std::fs::create_dir_all(folder)?;
            log::info!("Default folder created: {:?}", folder);
        }
    }

    Ok((input, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ConversionRequestBuilder {
        let mut builder = ConversionRequest::builder();
        builder.input_root("in").output_root("out");
        builder
    }

    #[test]
    fn test_defaults() {
        let request = base().build().unwrap();
        assert!(request.generate_pdf);
        assert!(!request.generate_long_image);
        assert_eq!(request.image_quality, 100);
        assert!(!request.optimize_pdf);
        assert!(request.max_workers >= 1 && request.max_workers <= MAX_DEFAULT_WORKERS);
        assert_eq!(request.requested_kinds(), vec![ArtifactKind::Pdf]);
    }

    #[test]
    fn test_validation() {
        assert!(base().image_quality(0).build().is_err());
        assert!(base().image_quality(101).build().is_err());
        assert!(base().max_workers(0).build().is_err());
        let err = base().generate_pdf(false).build().unwrap_err();
        assert!(err.to_string().contains("long image output"));
        assert!(
            base()
                .generate_pdf(false)
                .generate_long_image(true)
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_missing_paths_are_builder_errors() {
        assert!(ConversionRequest::builder().input_root("in").build().is_err());
    }
}
