//! Store-only ZIP archiving of a finished comic output folder.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::generator::write_atomically;
use crate::path_utils::{archive_entry_name, is_partial_file, path_to_string_lossy};

/// Path of the archive for `folder`: `<parent of folder>/<base_name>.zip`.
pub fn archive_path(folder: &Path, base_name: &str) -> PathBuf {
    let parent = folder.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}.zip", base_name))
}

/// Packs every file under `folder` into `<base_name>.zip` next to it.
///
/// Entries are stored uncompressed with `/`-separated paths relative to
/// `folder`, in file-name order. The archive is written through a `.part`
/// sibling, so an existing archive is only replaced once the new one is
/// complete. The source folder is left untouched.
///
/// # Returns
///
/// * `Result<PathBuf>` - Path of the written archive, or [`Error::Archive`]
pub fn archive_folder(folder: &Path, base_name: &str) -> Result<PathBuf> {
    let zip_path = archive_path(folder, base_name);

    write_atomically(&zip_path, |target| write_archive(folder, target)).map_err(|e| {
        log::error!("Failed to archive {:?}: {}", folder, e);
        let reason = match e {
            Error::RenderWrite { reason, .. } => reason,
            other => other.to_string(),
        };
        Error::Archive {
            path: zip_path.clone(),
            reason,
        }
    })?;

    log::info!(
        "Folder {} archived to {}",
        path_to_string_lossy(folder),
        path_to_string_lossy(&zip_path)
    );
    Ok(zip_path)
}

/// Lists the files that [`archive_folder`] would pack, in archive order.
pub fn archive_members(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut members = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && !is_partial_file(entry.path()) {
            members.push(entry.into_path());
        }
    }
    Ok(members)
}

fn write_archive(folder: &Path, zip_path: &Path) -> Result<()> {
    let options: SimpleFileOptions = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .unix_permissions(0o644);

    let members = archive_members(folder)?;
    let file = File::create(zip_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    for member in members {
        let Some(entry_name) = archive_entry_name(folder, &member) else {
            continue;
        };

        zip.start_file(entry_name, options)?;

        let source = File::open(&member)?;
        if source.metadata()?.len() == 0 {
            // zero-length files cannot be mapped
            continue;
        }
        // Create the read-only memory map
        let mmap = unsafe { MmapOptions::new().map(&source)? };
        zip.write_all(&mmap[..])?;
    }

    zip.finish()?.flush()?;
    Ok(())
}
