//! One-way mirroring: copy, then prune.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::copy::{copy_directory, CopyOptions, CopyReport};
use crate::error::FsError;
use crate::walk::{require_dir, walk, WalkConfig, WalkControl};

/// What a sync did.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// The copy phase.
    pub copy: CopyReport,

    /// Destination-only paths that were deleted. A removed directory is
    /// listed once; its contents are not listed separately.
    pub removed: Vec<PathBuf>,
}

/// Make `dst` a mirror of `src` with default copy options.
///
/// See [`sync_directories_with`].
pub fn sync_directories(src: &Path, dst: &Path) -> Result<SyncReport, FsError> {
    sync_directories_with(src, dst, CopyOptions::default())
}

/// Make `dst` a mirror of `src`.
///
/// Phase one copies every entry of `src` into `dst` with `overwrite` forced
/// on. Phase two deletes every path under `dst` that has no counterpart at the
/// same relative position under `src`, directories recursively.
///
/// The phases are not transactional. A failure in between leaves `dst` a
/// superset of `src` with deletions still pending; running the sync again
/// completes it.
///
/// # Errors
///
/// Anything [`copy_directory`] reports, plus failures to walk `dst` or to
/// remove an extraneous path.
pub fn sync_directories_with(src: &Path, dst: &Path, options: CopyOptions) -> Result<SyncReport, FsError> {
    require_dir(src)?;
    let options = options.overwrite(true);

    let copy = copy_directory(src, dst, &options)?;
    let removed = prune(src, dst)?;

    debug!(
        src = %src.display(),
        dst = %dst.display(),
        copied = copy.files_copied,
        removed = removed.len(),
        "sync finished"
    );

    Ok(SyncReport { copy, removed })
}

/// Delete everything under `dst` with no counterpart under `src`.
///
/// Candidates are collected during the walk and removed afterwards, so the
/// walk never reads a directory it is deleting.
fn prune(src: &Path, dst: &Path) -> Result<Vec<PathBuf>, FsError> {
    let mut doomed = Vec::new();

    walk(dst, &WalkConfig::default(), |entry| {
        let rel = match entry.path.strip_prefix(dst) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => return Ok(WalkControl::Continue),
        };

        let counterpart = src.join(rel);
        match fs::symlink_metadata(&counterpart) {
            Ok(_) => Ok(WalkControl::Continue),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                doomed.push((entry.path.clone(), entry.is_dir()));
                Ok(WalkControl::SkipSubtree)
            }
            Err(e) => Err(FsError::io("stat", &counterpart, e)),
        }
    })?
    .into_strict()?;

    let mut removed = Vec::with_capacity(doomed.len());
    for (path, is_dir) in doomed {
        let res = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        res.map_err(|e| FsError::io("remove", &path, e))?;
        debug!(path = %path.display(), "removed destination-only entry");
        removed.push(path);
    }
    Ok(removed)
}
