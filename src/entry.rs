use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// One filesystem node encountered during a walk.
///
/// A snapshot taken at traversal time. Nothing here is cached between walks;
/// every operation re-reads the tree from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Full path to the entry, as reached from the walk root.
    pub path: PathBuf,

    /// Final path component. For a root without one (e.g. `/`) this is the
    /// whole path rendered lossily.
    pub name: String,

    /// What kind of node this is.
    pub kind: EntryKind,

    /// Distance from the walk root. Root = 0.
    pub depth: usize,

    /// Size in bytes as reported by `stat`.
    pub size: u64,

    /// Permission bits. See [`mode_bits`].
    pub mode: u32,

    /// Last modification time. Falls back to the Unix epoch on platforms
    /// that cannot report it.
    pub modified: SystemTime,
}

/// The kind of a traversed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A regular file.
    File,

    /// A directory.
    Dir,

    /// A symbolic link that was not followed.
    Symlink,

    /// Anything else (device files, pipes, sockets, etc.).
    Other,
}

impl Entry {
    /// Build an entry from metadata already obtained by the caller.
    pub fn from_metadata(path: &Path, depth: usize, meta: &Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Self {
            path: path.to_path_buf(),
            name,
            kind: EntryKind::from_file_type(meta.file_type()),
            depth,
            size: meta.len(),
            mode: mode_bits(meta),
            modified: meta.modified().unwrap_or(UNIX_EPOCH),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Whether the name starts with the hidden-entry marker (`.`).
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    /// Modification time truncated to whole seconds since the epoch.
    /// Pre-epoch timestamps collapse to 0.
    pub fn modified_secs(&self) -> u64 {
        self.modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl EntryKind {
    pub(crate) fn from_file_type(ft: std::fs::FileType) -> Self {
        if ft.is_dir() {
            EntryKind::Dir
        } else if ft.is_file() {
            EntryKind::File
        } else if ft.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        }
    }
}

/// Permission bits of `meta`.
///
/// On Unix this is `st_mode & 0o7777`. Elsewhere only the read-only flag is
/// available, so the bits are synthesized as `0o444` or `0o644`.
#[cfg(unix)]
pub fn mode_bits(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
pub fn mode_bits(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
