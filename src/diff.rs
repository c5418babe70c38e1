//! Two-tree comparison.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::entry::Entry;
use crate::error::FsError;
use crate::hash::{file_checksum, HashAlgorithm};
use crate::walk::{collect_strict, require_dir, WalkConfig};

/// Classification of one relative path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffKind {
    /// Only on the right.
    Added,
    /// Only on the left.
    Removed,
    /// On both sides but different (kind, size, timestamp or content).
    Modified,
    /// On both sides and considered equal.
    Same,
}

impl DiffKind {
    /// The classification seen from the other side.
    pub fn mirrored(self) -> Self {
        match self {
            DiffKind::Added   => DiffKind::Removed,
            DiffKind::Removed => DiffKind::Added,
            other             => other,
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiffKind::Added    => "added",
            DiffKind::Removed  => "removed",
            DiffKind::Modified => "modified",
            DiffKind::Same     => "same",
        })
    }
}

/// One classified path.
#[derive(Debug, Clone)]
pub struct Difference {
    /// Path relative to both roots.
    pub path: PathBuf,
    pub kind: DiffKind,
    pub left: Option<Entry>,
    pub right: Option<Entry>,
}

/// How two files present on both sides are judged equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompareMode {
    /// Equal size and equal modification time truncated to whole seconds.
    /// Fast, but files rewritten with the same size within the same second
    /// compare as [`DiffKind::Same`].
    #[default]
    Metadata,

    /// Equal size and equal content digest. Timestamps are ignored.
    Content(HashAlgorithm),
}

/// Options for [`compare_directories_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    pub mode: CompareMode,
    pub follow_symlinks: bool,
}

impl CompareOptions {
    pub fn mode(mut self, mode: CompareMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.follow_symlinks = yes;
        self
    }
}

/// Compare two trees by size and second-granularity timestamp.
///
/// See [`compare_directories_with`].
pub fn compare_directories(left: &Path, right: &Path) -> Result<Vec<Difference>, FsError> {
    compare_directories_with(left, right, &CompareOptions::default())
}

/// Classify every relative path found under either root.
///
/// The roots themselves are not reported. The result is sorted by relative
/// path.
///
/// # Errors
///
/// [`FsError::NotFound`] / [`FsError::NotADirectory`] if either root is not
/// a directory. Any entry that cannot be read on either side fails the whole
/// comparison, since a missing subtree would otherwise be reported as
/// added or removed.
pub fn compare_directories_with(
    left: &Path,
    right: &Path,
    options: &CompareOptions,
) -> Result<Vec<Difference>, FsError> {
    require_dir(left)?;
    require_dir(right)?;

    let config = WalkConfig {
        follow_symlinks: options.follow_symlinks,
        max_depth:       None,
    };
    let left_map = snapshot(left, &config)?;
    let mut right_map = snapshot(right, &config)?;

    let mut out = Vec::with_capacity(left_map.len().max(right_map.len()));

    for (rel, l) in left_map {
        match right_map.remove(&rel) {
            None => out.push(Difference {
                path: rel,
                kind: DiffKind::Removed,
                left: Some(l),
                right: None,
            }),
            Some(r) => {
                let kind = classify(&l, &r, options.mode)?;
                out.push(Difference {
                    path: rel,
                    kind,
                    left: Some(l),
                    right: Some(r),
                });
            }
        }
    }

    for (rel, r) in right_map {
        out.push(Difference {
            path: rel,
            kind: DiffKind::Added,
            left: None,
            right: Some(r),
        });
    }

    out.sort_by(|a, b| a.path.cmp(&b.path));

    debug!(
        left = %left.display(),
        right = %right.display(),
        differences = out.iter().filter(|d| d.kind != DiffKind::Same).count(),
        total = out.len(),
        "compare finished"
    );

    Ok(out)
}

fn classify(l: &Entry, r: &Entry, mode: CompareMode) -> Result<DiffKind, FsError> {
    if l.kind != r.kind {
        return Ok(DiffKind::Modified);
    }
    if l.is_dir() {
        return Ok(DiffKind::Same);
    }
    if l.size != r.size {
        return Ok(DiffKind::Modified);
    }

    let equal = match mode {
        CompareMode::Metadata => l.modified_secs() == r.modified_secs(),
        CompareMode::Content(alg) if l.is_file() => {
            file_checksum(&l.path, alg)? == file_checksum(&r.path, alg)?
        }
        // Unfollowed links and special files: size is all we can compare
        // without reading through them.
        CompareMode::Content(_) => true,
    };

    Ok(if equal { DiffKind::Same } else { DiffKind::Modified })
}

/// Map every entry below `root` by its root-relative path.
pub(crate) fn snapshot(root: &Path, config: &WalkConfig) -> Result<BTreeMap<PathBuf, Entry>, FsError> {
    let mut map = BTreeMap::new();
    for entry in collect_strict(root, config)? {
        let rel = match entry.path.strip_prefix(root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
            _ => continue,
        };
        map.insert(rel, entry);
    }
    Ok(map)
}
