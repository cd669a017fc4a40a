//! Comic folder discovery and page collection.
//!
//! This module walks the input tree `input/<comic>/[<chapter>/]*<pages>`,
//! turning it into [`Comic`] values: chapter zero is the comic folder itself,
//! followed by every nested folder in walk order. Pages are filtered by
//! extension and put in natural order (`page2` before `page10`).

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::try_join_all;
use rayon::prelude::*;
use tokio::fs::{ReadDir, read_dir};
use tokio::spawn;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::path_utils::{get_file_name_lossy, relative_components};
use crate::types::{Chapter, Comic, is_page_file};

/// Limits the number of concurrent directory operations
const MAX_CONCURRENT_DIRS: usize = 64;

/// Separator used when a nested chapter name has to be qualified by its path.
const CHAPTER_PATH_SEPARATOR: &str = "_";

/// Scans an input root for comics, chapters and pages.
#[derive(Debug, Clone)]
pub struct Collector {
    input_root: PathBuf,
}

impl Collector {
    /// Creates a new Collector for the given input root.
    pub fn new(input_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
        }
    }

    /// Scans every comic under the input root.
    ///
    /// # Returns
    ///
    /// * `Result<Vec<Comic>>` - Comics in natural order of their folder names
    pub async fn scan(&self) -> Result<Vec<Comic>> {
        let mut comics = Vec::new();
        for comic_folder in Self::list_comics(&self.input_root).await? {
            comics.push(Self::scan_comic(&comic_folder).await?);
        }
        Ok(comics)
    }

    /// Lists the comic folders (immediate subdirectories) of `root`.
    ///
    /// Fails with [`Error::NotFound`] if `root` does not exist; files directly
    /// under `root` are ignored.
    pub async fn list_comics(root: &Path) -> Result<Vec<PathBuf>> {
        if !tokio::fs::try_exists(root).await.unwrap_or(false) {
            return Err(Error::NotFound(format!(
                "Input folder does not exist: {:?}",
                root
            )));
        }

        let mut comics = Self::collect_entries(root, true).await?;
        comics.par_sort_by(Self::natural_path_cmp);
        Ok(comics)
    }

    /// Collects every directory at any depth below `comic_folder`.
    ///
    /// The walk is top-down: all subdirectories of a folder are emitted
    /// together, then each one is descended into before its next sibling.
    /// The comic folder itself is not part of the result.
    pub async fn list_chapter_folders(comic_folder: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        let mut pending = vec![comic_folder.to_path_buf()];

        while let Some(directory) = pending.pop() {
            let mut subdirectories = Self::collect_entries(&directory, true).await?;
            subdirectories.par_sort_by(Self::natural_path_cmp);
            found.extend(subdirectories.iter().cloned());
            pending.extend(subdirectories.into_iter().rev());
        }

        Ok(found)
    }

    /// Lists the page images of one chapter folder in natural order.
    ///
    /// An empty result is not an error; it means the chapter has no pages.
    pub async fn list_pages(chapter_folder: &Path) -> Result<Vec<PathBuf>> {
        let mut pages: Vec<PathBuf> = Self::collect_entries(chapter_folder, false)
            .await?
            .into_iter()
            .filter(|path| is_page_file(path))
            .collect();
        pages.par_sort_by(Self::natural_path_cmp);
        Ok(pages)
    }

    /// Builds a [`Comic`] with chapter zero, every nested chapter and their pages.
    pub async fn scan_comic(comic_folder: &Path) -> Result<Comic> {
        let comic_name = get_file_name_lossy(comic_folder);

        let mut chapter_folders = Self::list_chapter_folders(comic_folder).await?;
        chapter_folders.insert(0, comic_folder.to_path_buf());

        let names = Self::assign_chapter_names(comic_folder, &chapter_folders);
        let pages = Self::collect_pages(chapter_folders.clone()).await?;

        let chapters = chapter_folders
            .into_iter()
            .zip(names)
            .zip(pages)
            .map(|((folder, name), pages)| Chapter {
                name,
                folder,
                pages,
            })
            .collect();

        Ok(Comic {
            name: comic_name,
            folder: comic_folder.to_path_buf(),
            chapters,
        })
    }

    /// Collects page images from each chapter directory concurrently.
    ///
    /// # Arguments
    ///
    /// * `chapters` - Vector of chapter directory paths
    ///
    /// # Returns
    ///
    /// * `Result<Vec<Vec<PathBuf>>>` - Page paths for each chapter, in input order
    pub async fn collect_pages(chapters: Vec<PathBuf>) -> Result<Vec<Vec<PathBuf>>> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_DIRS));
        let mut handles: Vec<JoinHandle<Result<(usize, Vec<PathBuf>)>>> = Vec::new();

        for (index, chapter_dir) in chapters.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);

            handles.push(spawn(async move {
                let _permit = semaphore.acquire().await?;
                let pages = Self::list_pages(&chapter_dir).await?;
                Ok((index, pages))
            }));
        }

        let results = try_join_all(handles).await.map_err(|e| {
            Error::Coordinator(format!("Failed to join page collection tasks: {}", e))
        })?;

        let mut pages_per_chapter = vec![Vec::new(); results.len()];
        for res in results {
            let (index, pages) = res?;
            pages_per_chapter[index] = pages;
        }

        Ok(pages_per_chapter)
    }

    /// Gives every chapter folder a unique artifact name.
    ///
    /// Chapter zero is named after the comic, nested chapters after their folder.
    /// A name already taken is replaced by the folder path relative to the comic,
    /// joined with `_` (`vol2/ch1` becomes `vol2_ch1`).
    pub fn assign_chapter_names(comic_folder: &Path, chapter_folders: &[PathBuf]) -> Vec<String> {
        let mut taken: HashSet<String> = HashSet::new();
        let mut names = Vec::with_capacity(chapter_folders.len());

        for folder in chapter_folders {
            let mut name = get_file_name_lossy(folder);
            if taken.contains(&name) {
                if let Some(qualified) =
                    relative_components(comic_folder, folder, CHAPTER_PATH_SEPARATOR)
                {
                    name = qualified;
                }
                // still clashing (e.g. a folder literally named "vol2_ch1")
                let base = name.clone();
                let mut counter = 2;
                while taken.contains(&name) {
                    name = format!("{}{}{}", base, CHAPTER_PATH_SEPARATOR, counter);
                    counter += 1;
                }
            }
            taken.insert(name.clone());
            names.push(name);
        }

        names
    }

    /// Natural ordering of two paths by file name: embedded numbers compare by value.
    pub fn natural_path_cmp(a: &PathBuf, b: &PathBuf) -> Ordering {
        let a_name = get_file_name_lossy(a);
        let b_name = get_file_name_lossy(b);
        natord::compare(&a_name, &b_name)
    }

    /// Collects directory contents with a directory/file filter.
    ///
    /// # Arguments
    ///
    /// * `directory` - Directory to scan
    /// * `only_dirs` - When true, only directories are collected; when false, only files
    ///
    /// # Returns
    ///
    /// * `Result<Vec<PathBuf>>` - Paths meeting the criteria, in read order
    pub async fn collect_entries(directory: &Path, only_dirs: bool) -> Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = Vec::new();

        let mut paths: ReadDir = read_dir(directory).await?;

        while let Some(entry) = paths.next_entry().await? {
            let path = entry.path();
            // Apply directory/file filter
            if only_dirs != path.is_dir() {
                continue;
            }

            entries.push(path);
        }

        Ok(entries)
    }
}
