//! Whole-tree queries and cleanup built on the walker.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::entry::{mode_bits, Entry};
use crate::error::FsError;
use crate::hash::{file_checksum, hash_bytes, HashAlgorithm};
use crate::walk::{collect_strict, require_dir, WalkConfig};

/// Aggregate facts about a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryInfo {
    pub path: PathBuf,
    /// Sum of regular file sizes, recursively.
    pub total_size: u64,
    /// Non-directory entries below the root.
    pub file_count: usize,
    /// Directories below the root (the root itself is not counted).
    pub dir_count: usize,
    pub mode: u32,
    pub modified: SystemTime,
}

/// Total size in bytes of every regular file under `root`.
///
/// # Errors
/// Fails if `root` is not a directory or any part of it cannot be walked.
pub fn calculate_directory_size(root: &Path) -> Result<u64, FsError> {
    require_dir(root)?;
    let total = collect_strict(root, &WalkConfig::default())?
        .iter()
        .filter(|e| e.is_file())
        .map(|e| e.size)
        .sum();
    Ok(total)
}

/// Counts, total size, mode and mtime for `root`.
pub fn directory_info(root: &Path) -> Result<DirectoryInfo, FsError> {
    require_dir(root)?;
    let meta = fs::metadata(root).map_err(|e| FsError::io("stat", root, e))?;

    let mut info = DirectoryInfo {
        path: root.to_path_buf(),
        total_size: 0,
        file_count: 0,
        dir_count: 0,
        mode: mode_bits(&meta),
        modified: meta.modified().unwrap_or(UNIX_EPOCH),
    };

    for entry in collect_strict(root, &WalkConfig::default())? {
        if entry.depth == 0 {
            continue;
        }
        if entry.is_dir() {
            info.dir_count += 1;
        } else {
            info.file_count += 1;
            if entry.is_file() {
                info.total_size += entry.size;
            }
        }
    }
    Ok(info)
}

/// Entries directly inside `root`, or the whole tree when `recursive`,
/// sorted by path. The root itself is not included.
pub fn list_directory(root: &Path, recursive: bool) -> Result<Vec<Entry>, FsError> {
    require_dir(root)?;
    let config = WalkConfig {
        follow_symlinks: false,
        max_depth:       if recursive { None } else { Some(1) },
    };
    let mut entries: Vec<Entry> = collect_strict(root, &config)?
        .into_iter()
        .filter(|e| e.depth > 0)
        .collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// A single digest summarizing the names and contents of a tree.
///
/// Two trees with the same relative paths, the same directory layout and
/// byte-identical files produce the same checksum, regardless of where they
/// live or of timestamps and permissions.
pub fn directory_checksum(root: &Path, algorithm: HashAlgorithm) -> Result<String, FsError> {
    require_dir(root)?;

    let mut records: Vec<(String, Option<String>)> = Vec::new();
    for entry in collect_strict(root, &WalkConfig::default())? {
        if entry.depth == 0 {
            continue;
        }
        let rel = match entry.path.strip_prefix(root) {
            Ok(rel) => portable(rel),
            Err(_) => continue,
        };
        if entry.is_dir() {
            records.push((rel, None));
        } else if entry.is_file() {
            records.push((rel, Some(file_checksum(&entry.path, algorithm)?)));
        }
    }
    records.sort();

    let mut manifest = Vec::new();
    for (rel, digest) in &records {
        manifest.extend_from_slice(rel.as_bytes());
        match digest {
            Some(d) => {
                manifest.push(0);
                manifest.extend_from_slice(d.as_bytes());
            }
            None => manifest.push(b'/'),
        }
        manifest.push(b'\n');
    }

    Ok(hash_bytes(algorithm, &manifest))
}

/// Remove every empty directory below `root`, deepest first, so a directory
/// that only contained empty directories goes too. `root` is kept.
///
/// Returns how many directories were removed.
pub fn clean_empty_directories(root: &Path) -> Result<usize, FsError> {
    require_dir(root)?;

    let mut dirs: Vec<Entry> = collect_strict(root, &WalkConfig::default())?
        .into_iter()
        .filter(|e| e.is_dir() && e.depth > 0)
        .collect();
    dirs.sort_by(|a, b| b.depth.cmp(&a.depth));

    let mut removed = 0;
    for dir in dirs {
        let mut children = fs::read_dir(&dir.path).map_err(|e| FsError::io("read directory", &dir.path, e))?;
        if children.next().is_none() {
            fs::remove_dir(&dir.path).map_err(|e| FsError::io("remove directory", &dir.path, e))?;
            removed += 1;
        }
    }

    debug!(root = %root.display(), removed, "cleaned empty directories");
    Ok(removed)
}

/// `/`-joined relative path, identical on every platform.
fn portable(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
