//! Content-addressed duplicate detection.
//!
//! Two phases: files are bucketed by size, then only buckets with more than
//! one member are digested. A file with a unique size cannot have a
//! duplicate, so it is never read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::FsError;
use crate::hash::{file_checksum, HashAlgorithm};
use crate::walk::{collect_strict, require_dir, WalkConfig};

/// Group regular files under `root` by SHA-256 content digest.
///
/// See [`find_duplicate_files_with`].
pub fn find_duplicate_files(root: &Path) -> Result<HashMap<String, Vec<PathBuf>>, FsError> {
    find_duplicate_files_with(root, HashAlgorithm::Sha256)
}

/// Group regular files under `root` by content digest.
///
/// Only groups with two or more members are returned. Paths inside a group
/// are sorted; group order is unspecified. Directories, symlinks and special
/// files are not grouped.
///
/// # Errors
///
/// Fails if `root` is not a directory, if any part of the tree cannot be
/// walked, or if a candidate file cannot be read.
pub fn find_duplicate_files_with(
    root: &Path,
    algorithm: HashAlgorithm,
) -> Result<HashMap<String, Vec<PathBuf>>, FsError> {
    require_dir(root)?;

    let mut by_size: HashMap<u64, Vec<PathBuf>> = HashMap::new();
    for entry in collect_strict(root, &WalkConfig::default())? {
        if entry.is_file() {
            by_size.entry(entry.size).or_default().push(entry.path);
        }
    }

    let mut by_digest: HashMap<String, Vec<PathBuf>> = HashMap::new();
    let mut hashed = 0usize;
    for paths in by_size.into_values().filter(|p| p.len() > 1) {
        for path in paths {
            let digest = file_checksum(&path, algorithm)?;
            hashed += 1;
            by_digest.entry(digest).or_default().push(path);
        }
    }

    by_digest.retain(|_, paths| paths.len() > 1);
    for paths in by_digest.values_mut() {
        paths.sort();
    }

    debug!(
        root = %root.display(),
        algorithm = %algorithm,
        hashed,
        groups = by_digest.len(),
        "duplicate scan finished"
    );

    Ok(by_digest)
}
