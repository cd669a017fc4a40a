//! Core data types, enums, and reports for the comicpress conversion library.
//!
//! This module defines the fundamental data structures used throughout comicpress:
//! - Scanned input structure (`Comic`, `Chapter`)
//! - Output kinds and their naming rules (`ArtifactKind`)
//! - Per-chapter and per-run reporting (`ChapterReport`, `RunSummary`)
//! - Run lifecycle enumerations (`RunPhase`, `RunStatus`)

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

/// File extensions (lowercase) that classify a file as a comic page.
pub const PAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Returns true if the path has one of the [`PAGE_EXTENSIONS`], ignoring case.
pub fn is_page_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            PAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// The two kinds of output a chapter can be converted into.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArtifactKind {
    /// One multi-page PDF per chapter
    Pdf,
    /// One vertically stacked PNG per chapter
    LongImage,
}

impl ArtifactKind {
    /// Suffix appended to the comic name for this kind's output folder.
    pub fn folder_suffix(&self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "_pdf",
            ArtifactKind::LongImage => "_long",
        }
    }

    /// Name of the per-comic output folder (and of its archive, minus `.zip`).
    pub fn folder_name(&self, comic_name: &str) -> String {
        format!("{}{}", comic_name, self.folder_suffix())
    }

    /// File name of this kind's artifact for one chapter.
    pub fn file_name(&self, chapter_name: &str) -> String {
        match self {
            ArtifactKind::Pdf => format!("{}.pdf", chapter_name),
            ArtifactKind::LongImage => format!("{}_long.png", chapter_name),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "PDF",
            ArtifactKind::LongImage => "long image",
        }
    }
}

/// One chapter of a comic: a folder and its naturally ordered pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    /// Unique (per comic) name used for the chapter's output files.
    pub name: String,
    pub folder: PathBuf,
    pub pages: Vec<PathBuf>,
}

impl Chapter {
    /// Path of this chapter's artifact inside the given output folder.
    pub fn artifact_path(&self, kind: ArtifactKind, output_folder: &Path) -> PathBuf {
        output_folder.join(kind.file_name(&self.name))
    }
}

/// A comic folder with chapter zero (the folder itself) followed by every nested chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Comic {
    pub name: String,
    pub folder: PathBuf,
    pub chapters: Vec<Chapter>,
}

impl Comic {
    /// Progress weight of this comic: one per chapter plus one for archiving.
    pub fn task_weight(&self) -> usize {
        self.chapters.len() + 1
    }

    /// The comic's output folder for `kind` under `output_root`.
    pub fn output_folder(&self, kind: ArtifactKind, output_root: &Path) -> PathBuf {
        output_root.join(kind.folder_name(&self.name))
    }
}

/// What happened to one requested artifact of a chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArtifactStatus {
    NotRequested,
    /// Target already existed; nothing was recomputed.
    AlreadyExists,
    /// Written with this many pages.
    Written(usize),
    /// Every page failed to open, so no file was written.
    NothingToWrite,
    /// The file could not be written; the other artifact was still attempted.
    Failed(String),
}

impl ArtifactStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, ArtifactStatus::Failed(_))
    }
}

/// Final outcome of one chapter task.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChapterOutcome {
    Rendered {
        pdf: ArtifactStatus,
        long_image: ArtifactStatus,
    },
    NoImages,
    Failed(String),
    /// The run was cancelled before the task started.
    Cancelled,
}

/// Report returned by a chapter task to the coordinator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChapterReport {
    pub chapter: String,
    pub page_count: usize,
    pub outcome: ChapterOutcome,
    /// Non-fatal problems met while rendering (skipped pages, empty outputs).
    pub warnings: Vec<String>,
}

impl ChapterReport {
    pub fn failed(chapter: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            chapter: chapter.into(),
            page_count: 0,
            outcome: ChapterOutcome::Failed(reason.to_string()),
            warnings: Vec::new(),
        }
    }

    pub fn cancelled(chapter: impl Into<String>) -> Self {
        Self {
            chapter: chapter.into(),
            page_count: 0,
            outcome: ChapterOutcome::Cancelled,
            warnings: Vec::new(),
        }
    }

    /// True if the chapter failed as a whole or any requested artifact failed.
    pub fn is_failure(&self) -> bool {
        match &self.outcome {
            ChapterOutcome::Failed(_) => true,
            ChapterOutcome::Rendered { pdf, long_image } => {
                pdf.is_failed() || long_image.is_failed()
            }
            _ => false,
        }
    }

    /// Human readable result, one line per fact, warnings last.
    pub fn message(&self) -> String {
        let mut lines = vec![format!("Chapter '{}':", self.chapter)];
        match &self.outcome {
            ChapterOutcome::NoImages => {
                lines.push("  no images found, skipped".to_string());
            }
            ChapterOutcome::Failed(reason) => {
                lines.push(format!("  failed: {}", reason));
            }
            ChapterOutcome::Cancelled => {
                lines.push("  not started, run cancelled".to_string());
            }
            ChapterOutcome::Rendered { pdf, long_image } => {
                lines.push(format!("  {} page(s) found", self.page_count));
                let statuses = [(ArtifactKind::Pdf, pdf), (ArtifactKind::LongImage, long_image)];
                for (kind, status) in statuses {
                    match status {
                        ArtifactStatus::NotRequested => {}
                        ArtifactStatus::AlreadyExists => {
                            lines.push(format!("  {} already exists, skipped", kind.label()))
                        }
                        ArtifactStatus::Written(pages) => {
                            lines.push(format!("  {} saved ({} page(s))", kind.label(), pages))
                        }
                        ArtifactStatus::NothingToWrite => {
                            lines.push(format!("  {} not written, no readable pages", kind.label()))
                        }
                        ArtifactStatus::Failed(reason) => {
                            lines.push(format!("  {} failed: {}", kind.label(), reason))
                        }
                    }
                }
            }
        }
        lines.extend(self.warnings.iter().map(|w| format!("  warning: {}", w)));
        lines.join("\n")
    }
}

impl fmt::Display for ChapterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunPhase {
    #[default]
    Idle,
    Scanning,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunPhase::Completed | RunPhase::Cancelled | RunPhase::Failed
        )
    }
}

/// Terminal status reported to the observer when a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunStatus {
    Completed,
    Cancelled,
    Failed,
}

impl From<RunStatus> for RunPhase {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Completed => RunPhase::Completed,
            RunStatus::Cancelled => RunPhase::Cancelled,
            RunStatus::Failed => RunPhase::Failed,
        }
    }
}

/// Summary of a finished run, returned by the coordinator.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunSummary {
    pub status: RunStatus,
    pub detail: String,
    pub completed: usize,
    pub total: usize,
    pub comics_processed: usize,
    pub comics_skipped: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
