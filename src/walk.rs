use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use ignore::{DirEntry, WalkBuilder, WalkState};
use tracing::{debug, warn};

use crate::entry::Entry;
use crate::error::FsError;
use crate::results::ScanStats;

// ---------------------------------------------------------------------------
// WalkConfig
// ---------------------------------------------------------------------------

/// Traversal parameters for [`walk`].
///
/// Defaults: symlinks are not followed, depth is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkConfig {
    /// Stat through symbolic links and descend into linked directories.
    pub follow_symlinks: bool,

    /// Deepest level yielded. `0` means the root only, `1` means one level
    /// of children, and so on.
    pub max_depth: Option<usize>,
}

impl WalkConfig {
    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.follow_symlinks = yes;
        self
    }

    pub fn max_depth(mut self, d: usize) -> Self {
        self.max_depth = Some(d);
        self
    }
}

// ---------------------------------------------------------------------------
// Visitor control flow
// ---------------------------------------------------------------------------

/// What the walker should do after a visitor has seen an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    /// Keep going, descending into the entry if it is a directory.
    Continue,

    /// Do not descend into this directory. Behaves like `Continue` for
    /// anything that is not a directory.
    SkipSubtree,

    /// End the whole walk now. This is a successful outcome: the walk
    /// returns `Ok` with [`WalkSummary::stopped`] set.
    Stop,
}

/// Outcome of a completed walk.
#[derive(Debug)]
pub struct WalkSummary {
    /// Counts and timing for every entry handed to the visitor.
    pub stats: ScanStats,

    /// `true` when a visitor returned [`WalkControl::Stop`].
    pub stopped: bool,

    /// Per-entry failures absorbed during the walk (unreadable directories,
    /// symlink loops, failed `stat`). The failing subtree is skipped and the
    /// walk continues with its siblings.
    pub errors: Vec<FsError>,
}

impl WalkSummary {
    /// Turn the first absorbed error, if any, into a hard failure.
    ///
    /// Operations whose output would be misleading with a subtree missing
    /// (diff, duplicates, checksums) call this after walking.
    pub fn into_strict(mut self) -> Result<Self, FsError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(self.errors.swap_remove(0))
        }
    }
}

// ---------------------------------------------------------------------------
// walk()
// ---------------------------------------------------------------------------

/// Visit `root` (depth 0) and then every descendant (parent depth + 1).
///
/// Entries are delivered in whatever order the directory enumeration yields
/// them; a directory is always visited before its children. Traversal runs on
/// a single worker; the visitor is never called concurrently.
///
/// # Errors
///
/// Returns [`FsError::NotFound`] if `root` does not exist, or the first error
/// returned by `visit`. Per-entry traversal failures do not fail the walk; see
/// [`WalkSummary::errors`].
pub fn walk<F>(root: &Path, config: &WalkConfig, visit: F) -> Result<WalkSummary, FsError>
where
    F: FnMut(&Entry) -> Result<WalkControl, FsError> + Send,
{
    let probe = if config.follow_symlinks {
        std::fs::metadata(root)
    } else {
        std::fs::symlink_metadata(root)
    };
    probe.map_err(|e| FsError::io("stat", root, e))?;

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .ignore(false)
        .parents(false)
        .hidden(false)
        .follow_links(config.follow_symlinks)
        .same_file_system(false)
        .threads(1);

    if let Some(depth) = config.max_depth {
        builder.max_depth(Some(depth));
    }

    let walker = builder.build_parallel();

    let visit   = Arc::new(Mutex::new(visit));
    let files   = Arc::new(AtomicUsize::new(0));
    let dirs    = Arc::new(AtomicUsize::new(0));
    let stopped = Arc::new(AtomicBool::new(false));
    let errors  = Arc::new(Mutex::new(Vec::<FsError>::new()));
    let failure = Arc::new(Mutex::new(None::<FsError>));

    let start = Instant::now();
    debug!(root = %root.display(), "walk started");

    walker.run(|| {
        let visit   = Arc::clone(&visit);
        let files   = Arc::clone(&files);
        let dirs    = Arc::clone(&dirs);
        let stopped = Arc::clone(&stopped);
        let errors  = Arc::clone(&errors);
        let failure = Arc::clone(&failure);

        Box::new(move |res: Result<DirEntry, ignore::Error>| -> WalkState {
            // Quit can race with entries already queued; drop them.
            if stopped.load(Ordering::Relaxed) {
                return WalkState::Quit;
            }

            let dent = match res {
                Ok(d) => d,
                Err(e) => {
                    let err = map_ignore_error(e);
                    warn!(error = %err, "skipping unreadable entry");
                    errors.lock().unwrap_or_else(PoisonError::into_inner).push(err);
                    return WalkState::Continue;
                }
            };

            let entry = match to_entry(&dent) {
                Ok(e) => e,
                Err(err) => {
                    warn!(error = %err, "skipping entry with unreadable metadata");
                    errors.lock().unwrap_or_else(PoisonError::into_inner).push(err);
                    return WalkState::Skip;
                }
            };

            if entry.is_dir() {
                dirs.fetch_add(1, Ordering::Relaxed);
            } else {
                files.fetch_add(1, Ordering::Relaxed);
            }

            let control = {
                let mut visit = visit.lock().unwrap_or_else(PoisonError::into_inner);
                (&mut *visit)(&entry)
            };

            match control {
                Ok(WalkControl::Continue)    => WalkState::Continue,
                Ok(WalkControl::SkipSubtree) => WalkState::Skip,
                Ok(WalkControl::Stop) => {
                    stopped.store(true, Ordering::Relaxed);
                    WalkState::Quit
                }
                Err(err) => {
                    *failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(err);
                    stopped.store(true, Ordering::Relaxed);
                    WalkState::Quit
                }
            }
        })
    });

    let duration = start.elapsed();

    if let Some(err) = failure.lock().unwrap_or_else(PoisonError::into_inner).take() {
        debug!(root = %root.display(), error = %err, "walk aborted");
        return Err(err);
    }

    let errors = std::mem::take(&mut *errors.lock().unwrap_or_else(PoisonError::into_inner));
    let files  = files.load(Ordering::Relaxed);
    let dirs   = dirs.load(Ordering::Relaxed);

    debug!(
        root = %root.display(),
        files,
        dirs,
        absorbed = errors.len(),
        "walk finished"
    );

    Ok(WalkSummary {
        stats: ScanStats::compute(files, dirs, duration),
        stopped: stopped.load(Ordering::Relaxed),
        errors,
    })
}

/// Walk `root` and collect every entry, failing on the first absorbed error.
///
/// Shared by the operations that need a complete picture of a tree.
pub(crate) fn collect_strict(root: &Path, config: &WalkConfig) -> Result<Vec<Entry>, FsError> {
    let mut entries = Vec::new();
    walk(root, config, |entry| {
        entries.push(entry.clone());
        Ok(WalkControl::Continue)
    })?
    .into_strict()?;
    Ok(entries)
}

/// Fail with `NotFound`/`NotADirectory` unless `path` is an existing directory.
pub(crate) fn require_dir(path: &Path) -> Result<(), FsError> {
    let meta = std::fs::metadata(path).map_err(|e| FsError::io("stat", path, e))?;
    if meta.is_dir() {
        Ok(())
    } else {
        Err(FsError::NotADirectory(path.to_path_buf()))
    }
}

/// Canonical form of `path`. A path that does not exist yet is resolved
/// through its deepest existing ancestor and the missing tail re-appended.
pub(crate) fn resolve_path(path: &Path) -> Result<PathBuf, FsError> {
    let abs = std::path::absolute(path).map_err(|e| FsError::io("resolve", path, e))?;
    let mut existing = abs.as_path();
    let mut tail = Vec::new();
    loop {
        match std::fs::canonicalize(existing) {
            Ok(real) => return Ok(tail.iter().rev().fold(real, |acc, name| acc.join(name))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        tail.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => return Ok(abs.clone()),
                }
            }
            Err(e) => return Err(FsError::io("resolve", existing, e)),
        }
    }
}

fn to_entry(dent: &DirEntry) -> Result<Entry, FsError> {
    let meta = dent.metadata().map_err(map_ignore_error)?;
    Ok(Entry::from_metadata(dent.path(), dent.depth(), &meta))
}

// ---------------------------------------------------------------------------
// Map ignore::Error to FsError
// ---------------------------------------------------------------------------

fn map_ignore_error(e: ignore::Error) -> FsError {
    from_ignore(e, None)
}

/// Unwrap the path/depth/line tags, keeping the innermost path, until the
/// underlying cause is reached.
fn from_ignore(e: ignore::Error, path: Option<PathBuf>) -> FsError {
    match e {
        ignore::Error::WithPath { path, err } => from_ignore(*err, Some(path)),
        ignore::Error::WithDepth { err, .. } => from_ignore(*err, path),
        ignore::Error::WithLineNumber { err, .. } => from_ignore(*err, path),
        ignore::Error::Loop { child, .. } => FsError::SymlinkLoop(child),
        ignore::Error::Io(io_err) => FsError::io("read", path.unwrap_or_default(), io_err),
        other => match path {
            Some(p) => FsError::Walk(format!("{}: {}", p.display(), other)),
            None => FsError::Walk(other.to_string()),
        },
    }
}
