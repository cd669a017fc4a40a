//! Common test utilities and constants for the comicpress crate.
//!
//! Provides functions for setting up test directories, creating page images
//! (valid and corrupt), an observer that records every callback, and readers
//! for the produced PDFs and archives.

use comicpress::error::{Error, Result};
use comicpress::observer::ConversionObserver;
use comicpress::types::RunStatus;
use comicpress::CancelFlag;
use image::{ImageFormat, Rgb, RgbImage};
use rand::{Rng, distributions::Alphanumeric};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::fs;

#[allow(dead_code)]
pub const TEST_TMP_DIR: &str = "tests/tmp";
#[allow(dead_code)]
pub const LONG_TEST_TIMEOUT: Duration = Duration::from_secs(120);

#[allow(dead_code)]
pub struct TestDirs {
    pub base_dir: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Creates a unique test directory with `input` and `output` subdirectories.
#[allow(dead_code)]
pub async fn setup_test_dirs(sub_path: &str) -> TestDirs {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let base_dir = PathBuf::from(TEST_TMP_DIR).join(format!("{}-{}", sub_path, rand_string));
    if base_dir.exists() {
        fs::remove_dir_all(&base_dir).await.unwrap();
    }
    let input_dir = base_dir.join("input");
    let output_dir = base_dir.join("output");

    fs::create_dir_all(&input_dir).await.unwrap();

    TestDirs {
        base_dir,
        input_dir,
        output_dir,
    }
}

/// Creates a solid color page of the given size; the format follows the extension.
#[allow(dead_code)]
pub async fn create_page(path: &Path, width: u32, height: u32, color: Rgb<u8>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let format = ImageFormat::from_path(path).map_err(Error::Image)?;
    let img = RgbImage::from_pixel(width, height, color);
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || img.save_with_format(target, format))
        .await?
        .map_err(Error::Image)?;
    Ok(())
}

/// Creates a 100x100 red page.
#[allow(dead_code)]
pub async fn create_dummy_page(path: &Path) -> Result<()> {
    create_page(path, 100, 100, Rgb([255, 0, 0])).await
}

/// Writes a file with a page extension that no decoder can read.
#[allow(dead_code)]
pub async fn create_corrupt_page(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, b"definitely not an image").await?;
    Ok(())
}

/// Number of pages in a PDF file.
#[allow(dead_code)]
pub fn pdf_page_count(path: &Path) -> usize {
    let document = lopdf::Document::load(path).unwrap();
    document.get_pages().len()
}

/// Entry names of a ZIP archive, in archive order.
#[allow(dead_code)]
pub fn zip_entry_names(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Observer that keeps every callback for later assertions.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingObserver {
    logs: Mutex<Vec<String>>,
    progress: Mutex<Vec<(usize, usize)>>,
    finished: Mutex<Vec<(RunStatus, String)>>,
    cancel_on_first_tick: Mutex<Option<CancelFlag>>,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels `flag` as soon as the first task unit completes.
    pub fn cancel_on_first_tick(&self, flag: CancelFlag) {
        *self.cancel_on_first_tick.lock().unwrap() = Some(flag);
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().unwrap().clone()
    }

    pub fn log_text(&self) -> String {
        self.logs().join("\n")
    }

    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.progress.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<(RunStatus, String)> {
        self.finished.lock().unwrap().clone()
    }
}

impl ConversionObserver for RecordingObserver {
    fn on_log(&self, line: &str) {
        self.logs.lock().unwrap().push(line.to_string());
    }

    fn on_progress(&self, completed: usize, total: usize) {
        self.progress.lock().unwrap().push((completed, total));
        if completed >= 1 {
            if let Some(flag) = self.cancel_on_first_tick.lock().unwrap().as_ref() {
                flag.cancel();
            }
        }
    }

    fn on_finished(&self, status: RunStatus, detail: &str) {
        self.finished
            .lock()
            .unwrap()
            .push((status, detail.to_string()));
    }
}
