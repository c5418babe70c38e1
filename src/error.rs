use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    // Traversal
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("symlink loop at {}", .0.display())]
    SymlinkLoop(PathBuf),

    #[error("walk error: {0}")]
    Walk(String),

    // Patterns
    #[error("invalid glob pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid regex `{pattern}`")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unsupported hash algorithm `{0}`")]
    UnsupportedHashAlgorithm(String),

    // Mutation
    #[error("destination exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("directory not empty: {}", .0.display())]
    DirectoryNotEmpty(PathBuf),

    #[error("destination {} overlaps source {}", .dst.display(), .src.display())]
    Overlap { src: PathBuf, dst: PathBuf },

    // Locks
    #[error("already locked: {}", .0.display())]
    AlreadyLocked(PathBuf),

    #[error("not locked: {}", .0.display())]
    NotLocked(PathBuf),

    #[error("{op} failed on {}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Wrap an I/O error with the operation and path that produced it.
    ///
    /// `NotFound` and `PermissionDenied` kinds are lifted into their own
    /// variants so callers can match on them without digging into `source`.
    pub fn io(op: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Io { op, path, source },
        }
    }

    /// The path this error occurred at, if applicable.
    /// Callers use this to present "Skipped: <path>" without pattern matching on variants.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::NotADirectory(p)
            | Self::PermissionDenied(p)
            | Self::SymlinkLoop(p)
            | Self::DestinationExists(p)
            | Self::DirectoryNotEmpty(p)
            | Self::AlreadyLocked(p)
            | Self::NotLocked(p)
            | Self::Overlap { dst: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Whether a walk can continue after this error.
    ///
    /// Recoverable errors (permission denied, symlink loops, IO on a single
    /// entry) are collected into the walk summary and the walk keeps going.
    ///
    /// Setup errors (missing root, bad pattern, lock misuse) halt immediately.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::SymlinkLoop(_) | Self::Io { .. } | Self::Walk(_)
        )
    }
}
