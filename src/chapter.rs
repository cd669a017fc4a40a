//! The unit of work executed on the worker pool: one chapter, all requested outputs.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::generator::{Generator, LongImageGenerator, PdfGenerator, RenderSettings};
use crate::types::{ArtifactKind, ArtifactStatus, Chapter, ChapterOutcome, ChapterReport};

/// Converts one chapter into its requested artifacts.
///
/// A task owns everything it needs, so it can be moved onto a blocking worker.
/// Artifacts whose target file already exists are not recomputed. The task
/// never fails: errors end up in the returned report.
#[derive(Debug, Clone)]
pub struct ChapterTask {
    chapter: Chapter,
    /// `Some` only when PDF output is requested.
    pdf_folder: Option<PathBuf>,
    /// `Some` only when long image output is requested.
    long_folder: Option<PathBuf>,
    settings: RenderSettings,
}

impl ChapterTask {
    /// Creates a task for `chapter`.
    ///
    /// # Arguments
    ///
    /// * `chapter` - The chapter with its pages in reading order
    /// * `pdf_folder` - Output folder for the PDF, `None` if no PDF is requested
    /// * `long_folder` - Output folder for the long image, `None` if not requested
    /// * `settings` - Encoding settings for both generators
    pub fn new(
        chapter: Chapter,
        pdf_folder: Option<PathBuf>,
        long_folder: Option<PathBuf>,
        settings: RenderSettings,
    ) -> Self {
        Self {
            chapter,
            pdf_folder,
            long_folder,
            settings,
        }
    }

    pub fn chapter_name(&self) -> &str {
        &self.chapter.name
    }

    /// Runs the task. Blocking; decodes and encodes images.
    ///
    /// Never fails: a write error marks its artifact as failed, and the chapter
    /// as a whole is [`ChapterOutcome::Failed`] only when every requested
    /// artifact failed.
    pub fn run(self) -> ChapterReport {
        let page_count = self.chapter.pages.len();
        if page_count == 0 {
            log::debug!("No images in {:?}", self.chapter.folder);
            return ChapterReport {
                chapter: self.chapter.name,
                page_count,
                outcome: ChapterOutcome::NoImages,
                warnings: Vec::new(),
            };
        }

        let mut warnings = Vec::new();

        let pdf = match &self.pdf_folder {
            Some(folder) => self.produce(&PdfGenerator::new(self.settings), folder, &mut warnings),
            None => ArtifactStatus::NotRequested,
        };
        let long_image = match &self.long_folder {
            Some(folder) => {
                self.produce(&LongImageGenerator::new(self.settings), folder, &mut warnings)
            }
            None => ArtifactStatus::NotRequested,
        };

        let requested = [&pdf, &long_image]
            .into_iter()
            .filter(|status| **status != ArtifactStatus::NotRequested);
        let reasons: Vec<String> = requested
            .clone()
            .filter_map(|status| match status {
                ArtifactStatus::Failed(reason) => Some(reason.clone()),
                _ => None,
            })
            .collect();
        let requested_count = requested.count();

        let outcome = if !reasons.is_empty() && reasons.len() == requested_count {
            ChapterOutcome::Failed(reasons.join("; "))
        } else {
            ChapterOutcome::Rendered { pdf, long_image }
        };

        ChapterReport {
            chapter: self.chapter.name,
            page_count,
            outcome,
            warnings,
        }
    }

    /// Renders one artifact unless its target already exists.
    ///
    /// A failed write is reported as [`ArtifactStatus::Failed`] so the next
    /// requested artifact is still attempted.
    fn produce(
        &self,
        generator: &dyn Generator,
        folder: &Path,
        warnings: &mut Vec<String>,
    ) -> ArtifactStatus {
        let output = self.chapter.artifact_path(generator.kind(), folder);
        if output.exists() {
            return ArtifactStatus::AlreadyExists;
        }

        match generator.render(&self.chapter.pages, &output) {
            Ok(report) => {
                warnings.extend(report.warnings);
                if report.written {
                    ArtifactStatus::Written(report.pages_rendered)
                } else {
                    ArtifactStatus::NothingToWrite
                }
            }
            Err(e) => {
                log::error!(
                    "{} of chapter '{}' failed: {}",
                    generator.kind().label(),
                    self.chapter.name,
                    e
                );
                ArtifactStatus::Failed(e.to_string())
            }
        }
    }

    /// Whether any requested artifact of this chapter still has to be produced.
    pub fn has_pending_work(chapter: &Chapter, folders: &[(ArtifactKind, PathBuf)]) -> bool {
        !chapter.pages.is_empty()
            && folders
                .iter()
                .any(|(kind, folder)| !chapter.artifact_path(*kind, folder).exists())
    }

    /// Whether a comic has to be processed at all.
    ///
    /// A comic is up to date when it has at least one chapter with pages and
    /// every requested artifact of those chapters exists. A comic without any
    /// pages is always processed, so each of its chapters reports that it
    /// holds no images.
    pub fn comic_has_pending_work(
        chapters: &[Chapter],
        folders: &[(ArtifactKind, PathBuf)],
    ) -> bool {
        if chapters.iter().all(|chapter| chapter.pages.is_empty()) {
            return true;
        }
        chapters
            .par_iter()
            .any(|chapter| Self::has_pending_work(chapter, folders))
    }
}
