//! comicpress - Comic Folder to PDF and Long Image Conversion Library
//!
//! This crate batch converts a tree of comic folders into per-chapter PDFs
//! and/or vertically stacked "long" PNG images, then packs each comic's output
//! folder into an uncompressed ZIP archive.
//!
//! The expected input layout is `input/<comic>/[<chapter>/]*<pages>`. Every
//! folder inside a comic (at any depth) is a chapter, and so is the comic
//! folder itself. Pages are `png`, `jpg`, `jpeg` and `webp` files, read in
//! natural order.
//!
//! # Getting Started
//!
//! Build a [`ConversionRequest`], pick an observer and run a [`Coordinator`]:
//!
//! ```rust,no_run
//! use comicpress::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> comicpress::error::Result<()> {
//!     let request = ConversionRequest::builder()
//!         .input_root("./input")
//!         .output_root("./output")
//!         .generate_long_image(true)
//!         .image_quality(90)
//!         .build()?;
//!
//!     let coordinator = Coordinator::new(request, Arc::new(LogObserver));
//!     let summary = coordinator.run().await;
//!     println!("{:?}: {}", summary.status, summary.detail);
//!
//!     Ok(())
//! }
//! ```
//!
//! Runs are cancelled cooperatively through a [`CancelFlag`]; a UI that needs
//! "at most one run at a time" uses [`Converter`] instead of spawning
//! coordinators directly.

pub mod archive;
pub mod chapter;
pub mod collector;
pub mod coordinator;
pub mod error;
pub mod generator;
pub mod observer;
pub mod path_utils;
pub mod request;
pub mod types;

pub use coordinator::{CancelFlag, Converter, Coordinator, Progress, RunHandle, RunState};
pub use request::{ConversionRequest, ConversionRequestBuilder};

// Re-export error and core types for direct access
pub use types::{
    ArtifactKind, ArtifactStatus, Chapter, ChapterOutcome, ChapterReport, Comic, RunPhase,
    RunStatus, RunSummary,
};

/// Prelude module for convenient imports.
///
/// Re-exports the most commonly used types and traits, so a single
/// `use comicpress::prelude::*;` covers a typical run.
pub mod prelude {
    pub use super::{
        ArtifactKind, CancelFlag, ChapterReport, Comic, ConversionRequest,
        ConversionRequestBuilder, Converter, Coordinator, RunHandle, RunPhase, RunStatus,
        RunSummary, error, generator, types,
    };
    pub use crate::collector::Collector;
    pub use crate::observer::{ChannelObserver, ConversionEvent, ConversionObserver, LogObserver};
    pub use std::path::{Path, PathBuf};
    pub use std::sync::Arc;
}
