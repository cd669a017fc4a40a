//! Custom error types and result handling for comicpress operations.
//!
//! All fallible operations return a [`Result<T>`], a type alias for
//! `std::result::Result<T, Error>`. Errors at or below chapter granularity
//! (page decode, artifact write) are contained by the chapter task and end up
//! as log lines; only setup errors abort a run.
//!
use std::path::PathBuf;

/// Type alias for Results with comicpress errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all comicpress operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O errors from the standard library
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Image decoding/encoding errors
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// ZIP file operation errors
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    /// Directory walk errors
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),
    /// Async task join errors
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Semaphore(#[from] tokio::sync::AcquireError),
    #[error(transparent)]
    RequestBuilder(#[from] crate::request::ConversionRequestBuilderError),
    /// A required input (usually the input root) does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// The request parameters cannot be used for a run
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// A single page could not be opened or converted
    #[error("Cannot decode page '{path:?}': {reason}")]
    PageDecode { path: PathBuf, reason: String },
    /// A PDF or long image could not be written after decoding
    #[error("Cannot write '{path:?}': {reason}")]
    RenderWrite { path: PathBuf, reason: String },
    /// Failure at the chapter task boundary (panic, closed pool)
    #[error("Chapter task failed: {0}")]
    ChapterTask(String),
    /// ZIP creation for a comic output folder failed
    #[error("Cannot archive '{path:?}': {reason}")]
    Archive { path: PathBuf, reason: String },
    /// Failures outside task execution that abort the whole run
    #[error("Conversion aborted: {0}")]
    Coordinator(String),
}

impl Error {
    /// Builds a [`Error::PageDecode`] from any displayable cause.
    pub fn page_decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::PageDecode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Builds a [`Error::RenderWrite`] from any displayable cause.
    pub fn render_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::RenderWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
