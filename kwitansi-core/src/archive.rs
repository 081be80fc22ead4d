//! Archive packaging: zip the batch's documents into one flat container.
//!
//! [`ArchivePackager::start`] hands the work to a blocking thread and returns a
//! [`PackagingJob`]. The job's [`PackagingJob::completed`] future resolves only
//! once the central directory is written and the file is flushed and synced;
//! a failed job removes whatever it had written.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::PackageError;

/// Deflate level used for every entry.
pub const MAX_COMPRESSION_LEVEL: i32 = 9;

#[derive(Debug, Clone)]
pub struct ArchivePackager {
    compression_level: i32,
}

impl Default for ArchivePackager {
    fn default() -> Self {
        Self {
            compression_level: MAX_COMPRESSION_LEVEL,
        }
    }
}

/// Completion handle for one archive.
#[derive(Debug)]
pub struct PackagingJob {
    target: PathBuf,
    handle: JoinHandle<Result<PathBuf, PackageError>>,
}

impl ArchivePackager {
    /// Begin writing `entries` (stored under their base names) into `target`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&self, entries: Vec<PathBuf>, target: PathBuf) -> PackagingJob {
        let level = self.compression_level;
        let job_target = target.clone();
        let handle = tokio::task::spawn_blocking(move || {
            match write_archive(&entries, &job_target, level) {
                Ok(()) => Ok(job_target),
                Err(e) => {
                    discard_partial(&job_target);
                    Err(e)
                }
            }
        });
        PackagingJob { target, handle }
    }
}

impl PackagingJob {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Resolves after the archive is durably written, or with the first error.
    pub async fn completed(self) -> Result<PathBuf, PackageError> {
        let result = self
            .handle
            .await
            .map_err(|e| PackageError::Task(e.to_string()))?;
        match &result {
            Ok(path) => info!(archive = %path.display(), "Archive written and flushed"),
            Err(e) => error!(archive = %self.target.display(), error = %e, "Archive packaging failed"),
        }
        result
    }
}

fn write_archive(entries: &[PathBuf], target: &Path, level: i32) -> Result<(), PackageError> {
    if entries.is_empty() {
        return Err(PackageError::NoEntries {
            target: target.to_path_buf(),
        });
    }
    let io_err = |source: io::Error| PackageError::Io {
        target: target.to_path_buf(),
        source,
    };
    let zip_err = |source: zip::result::ZipError| PackageError::Zip {
        target: target.to_path_buf(),
        source,
    };

    let file = File::create(target).map_err(io_err)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(level));

    for entry in entries {
        let name = entry
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PackageError::EntryName {
                path: entry.clone(),
            })?;
        zip.start_file(name, options).map_err(zip_err)?;

        let mut source = File::open(entry).map_err(|source| PackageError::Entry {
            path: entry.clone(),
            source,
        })?;
        let written = io::copy(&mut source, &mut zip).map_err(|source| PackageError::Entry {
            path: entry.clone(),
            source,
        })?;
        debug!(entry = name, bytes = written, "Added archive entry");
    }

    let mut file = zip.finish().map_err(zip_err)?;
    file.flush().map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    Ok(())
}

fn discard_partial(target: &Path) {
    match std::fs::remove_file(target) {
        Ok(()) => debug!(archive = %target.display(), "Removed partial archive"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(archive = %target.display(), error = %e, "Failed to remove partial archive"),
    }
}
