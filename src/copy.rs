//! Recursive directory copy, the first phase of a sync.

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use filetime::FileTime;
use tracing::{debug, warn};

use crate::entry::{Entry, EntryKind};
use crate::error::FsError;
use crate::walk::{require_dir, resolve_path, walk, WalkConfig, WalkControl};

/// Decides whether a source entry is copied. Rejecting a directory skips its
/// whole subtree.
pub type EntryFilter = Arc<dyn Fn(&Entry) -> bool + Send + Sync>;

/// Called after each file with `(bytes_copied_so_far, total_bytes, file)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64, &Path) + Send + Sync>;

// ---------------------------------------------------------------------------
// CopyOptions
// ---------------------------------------------------------------------------

/// Options for [`copy_directory`].
///
/// | field                  | default |
/// |------------------------|---------|
/// | `overwrite`            | `false` |
/// | `preserve_permissions` | `true`  |
/// | `preserve_times`       | `true`  |
/// | `skip_errors`          | `false` |
/// | `follow_symlinks`      | `false` |
/// | `filter`               | `None`  |
/// | `progress`             | `None`  |
#[derive(Clone)]
pub struct CopyOptions {
    /// Replace existing destination entries. Without it a conflicting file
    /// fails with [`FsError::DestinationExists`].
    pub overwrite:            bool,
    pub preserve_permissions: bool,
    /// Carry access and modification times over to the copy.
    pub preserve_times:       bool,
    /// Log and record per-entry failures instead of aborting.
    pub skip_errors:          bool,
    /// Copy what links point to instead of recreating the links.
    pub follow_symlinks:      bool,
    pub filter:               Option<EntryFilter>,
    pub progress:             Option<ProgressFn>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            overwrite:            false,
            preserve_permissions: true,
            preserve_times:       true,
            skip_errors:          false,
            follow_symlinks:      false,
            filter:               None,
            progress:             None,
        }
    }
}

impl fmt::Debug for CopyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyOptions")
            .field("overwrite", &self.overwrite)
            .field("preserve_permissions", &self.preserve_permissions)
            .field("preserve_times", &self.preserve_times)
            .field("skip_errors", &self.skip_errors)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("filter", &self.filter.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl CopyOptions {
    pub fn overwrite(mut self, yes: bool) -> Self {
        self.overwrite = yes;
        self
    }

    pub fn preserve_permissions(mut self, yes: bool) -> Self {
        self.preserve_permissions = yes;
        self
    }

    pub fn preserve_times(mut self, yes: bool) -> Self {
        self.preserve_times = yes;
        self
    }

    pub fn skip_errors(mut self, yes: bool) -> Self {
        self.skip_errors = yes;
        self
    }

    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.follow_symlinks = yes;
        self
    }

    pub fn filter(mut self, f: impl Fn(&Entry) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(f));
        self
    }

    pub fn progress(mut self, f: impl Fn(u64, u64, &Path) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(f));
        self
    }
}

/// What a copy did.
#[derive(Debug, Default)]
pub struct CopyReport {
    pub files_copied: usize,
    pub dirs_created: usize,
    pub links_created: usize,
    pub bytes_copied: u64,
    /// Failures skipped because `skip_errors` was set.
    pub errors: Vec<FsError>,
}

// ---------------------------------------------------------------------------
// copy_directory()
// ---------------------------------------------------------------------------

/// Copy the tree under `src` into `dst`, creating `dst` if needed.
///
/// Parents are created before children. Directory permissions and times are
/// applied last, deepest first, so a read-only source directory does not
/// block writing its own contents.
///
/// # Errors
///
/// Fails if `src` is not a directory or `dst` exists as a non-directory.
/// [`FsError::Overlap`] if `dst` resolves to `src` or to a path inside it;
/// nothing is written in that case.
/// Without `skip_errors`, the first entry that cannot be read or written
/// aborts the copy and leaves `dst` partially populated.
pub fn copy_directory(src: &Path, dst: &Path, options: &CopyOptions) -> Result<CopyReport, FsError> {
    require_dir(src)?;
    if let Ok(meta) = fs::metadata(dst) {
        if !meta.is_dir() {
            return Err(FsError::NotADirectory(dst.to_path_buf()));
        }
    }
    check_overlap(src, dst)?;

    let mut report = CopyReport::default();
    let plan = plan(src, options, &mut report)?;
    let total: u64 = plan.iter().filter(|e| e.is_file()).map(|e| e.size).sum();

    debug!(
        src = %src.display(),
        dst = %dst.display(),
        entries = plan.len(),
        total_bytes = total,
        "copy started"
    );

    fs::create_dir_all(dst).map_err(|e| FsError::io("create directory", dst, e))?;

    let mut dirs: Vec<(&Entry, PathBuf)> = Vec::new();

    for entry in &plan {
        let target = if entry.depth == 0 {
            dst.to_path_buf()
        } else {
            match entry.path.strip_prefix(src) {
                Ok(rel) => dst.join(rel),
                Err(_) => continue,
            }
        };

        let outcome = match entry.kind {
            EntryKind::Dir => {
                let res = if entry.depth == 0 {
                    Ok(())
                } else {
                    make_dir(&target, options).map(|()| report.dirs_created += 1)
                };
                if res.is_ok() {
                    dirs.push((entry, target));
                }
                res
            }
            EntryKind::File => copy_file(entry, &target, options).map(|copied| {
                if let Some(bytes) = copied {
                    report.files_copied += 1;
                    report.bytes_copied += bytes;
                    if let Some(progress) = &options.progress {
                        progress(report.bytes_copied, total, &entry.path);
                    }
                }
            }),
            EntryKind::Symlink => {
                copy_link(entry, &target, options).map(|created| {
                    if created {
                        report.links_created += 1;
                    }
                })
            }
            EntryKind::Other => {
                debug!(path = %entry.path.display(), "not copying special file");
                Ok(())
            }
        };

        if let Err(err) = outcome {
            absorb(err, options, &mut report)?;
        }
    }

    // Deepest first: fixing a parent's mtime must come after its children.
    dirs.sort_by(|a, b| b.0.depth.cmp(&a.0.depth));
    for (entry, target) in dirs {
        if let Err(err) = apply_attributes(&entry.path, &target, options) {
            absorb(err, options, &mut report)?;
        }
    }

    debug!(
        dst = %dst.display(),
        files = report.files_copied,
        bytes = report.bytes_copied,
        skipped = report.errors.len(),
        "copy finished"
    );

    Ok(report)
}

/// Reject a destination that is the source itself or lies below it.
fn check_overlap(src: &Path, dst: &Path) -> Result<(), FsError> {
    let src_real = resolve_path(src)?;
    let dst_real = resolve_path(dst)?;
    if dst_real.starts_with(&src_real) {
        return Err(FsError::Overlap {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
    }
    Ok(())
}

fn absorb(err: FsError, options: &CopyOptions, report: &mut CopyReport) -> Result<(), FsError> {
    if options.skip_errors {
        warn!(error = %err, "copy skipped entry");
        report.errors.push(err);
        Ok(())
    } else {
        Err(err)
    }
}

/// Walk `src` and list what will be copied, root first, parents before
/// children.
fn plan(src: &Path, options: &CopyOptions, report: &mut CopyReport) -> Result<Vec<Entry>, FsError> {
    let config = WalkConfig {
        follow_symlinks: options.follow_symlinks,
        max_depth:       None,
    };

    let mut entries = Vec::new();
    let summary = walk(src, &config, |entry| {
        if entry.depth > 0 {
            if let Some(filter) = &options.filter {
                if !filter(entry) {
                    return Ok(if entry.is_dir() {
                        WalkControl::SkipSubtree
                    } else {
                        WalkControl::Continue
                    });
                }
            }
        }
        entries.push(entry.clone());
        Ok(WalkControl::Continue)
    })?;

    for err in summary.errors {
        absorb(err, options, report)?;
    }
    Ok(entries)
}

/// Make room at `target` for an entry of `kind`. Returns `true` if something
/// of the same kind is already there.
fn clear_target(target: &Path, kind: EntryKind, overwrite: bool) -> Result<bool, FsError> {
    let existing = match fs::symlink_metadata(target) {
        Ok(meta) => EntryKind::from_file_type(meta.file_type()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(FsError::io("stat", target, e)),
    };

    if existing == EntryKind::Dir && kind == EntryKind::Dir {
        return Ok(true);
    }
    if !overwrite {
        return Err(FsError::DestinationExists(target.to_path_buf()));
    }

    let res = if existing == EntryKind::Dir {
        fs::remove_dir_all(target)
    } else {
        fs::remove_file(target)
    };
    res.map_err(|e| FsError::io("remove", target, e))?;
    Ok(false)
}

fn make_dir(target: &Path, options: &CopyOptions) -> Result<(), FsError> {
    if clear_target(target, EntryKind::Dir, options.overwrite)? {
        return Ok(());
    }
    fs::create_dir_all(target).map_err(|e| FsError::io("create directory", target, e))
}

/// Copy one file's bytes and, per options, its permissions and times.
/// An existing target is unlinked first so read-only targets can be replaced.
///
/// Returns `None` without touching anything when `target` already is the
/// source file (a hard link or a mount alias).
fn copy_file(entry: &Entry, target: &Path, options: &CopyOptions) -> Result<Option<u64>, FsError> {
    if same_file(&entry.path, target) {
        debug!(path = %entry.path.display(), target = %target.display(), "target is the source file, skipped");
        return Ok(None);
    }
    clear_target(target, EntryKind::File, options.overwrite)?;

    let mut reader = File::open(&entry.path).map_err(|e| FsError::io("open", &entry.path, e))?;
    let meta = reader
        .metadata()
        .map_err(|e| FsError::io("stat", &entry.path, e))?;
    let mut writer = File::create(target).map_err(|e| FsError::io("create", target, e))?;
    let bytes = io::copy(&mut reader, &mut writer).map_err(|e| FsError::io("copy", target, e))?;
    drop(writer);
    drop(reader);

    if options.preserve_times {
        let atime = FileTime::from_last_access_time(&meta);
        let mtime = FileTime::from_last_modification_time(&meta);
        filetime::set_file_times(target, atime, mtime)
            .map_err(|e| FsError::io("set times", target, e))?;
    }
    if options.preserve_permissions {
        fs::set_permissions(target, meta.permissions())
            .map_err(|e| FsError::io("set permissions", target, e))?;
    }

    Ok(Some(bytes))
}

#[cfg(unix)]
fn same_file(src: &Path, target: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (fs::metadata(src), fs::symlink_metadata(target)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(src: &Path, target: &Path) -> bool {
    match (fs::canonicalize(src), fs::canonicalize(target)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(unix)]
fn copy_link(entry: &Entry, target: &Path, options: &CopyOptions) -> Result<bool, FsError> {
    clear_target(target, EntryKind::Symlink, options.overwrite)?;
    let points_to = fs::read_link(&entry.path).map_err(|e| FsError::io("read link", &entry.path, e))?;
    std::os::unix::fs::symlink(&points_to, target)
        .map_err(|e| FsError::io("create link", target, e))?;
    Ok(true)
}

#[cfg(not(unix))]
fn copy_link(entry: &Entry, _target: &Path, _options: &CopyOptions) -> Result<bool, FsError> {
    warn!(path = %entry.path.display(), "symlink not copied on this platform");
    Ok(false)
}

fn apply_attributes(src: &Path, target: &Path, options: &CopyOptions) -> Result<(), FsError> {
    if !options.preserve_times && !options.preserve_permissions {
        return Ok(());
    }
    let meta = fs::metadata(src).map_err(|e| FsError::io("stat", src, e))?;
    if options.preserve_times {
        let atime = FileTime::from_last_access_time(&meta);
        let mtime = FileTime::from_last_modification_time(&meta);
        filetime::set_file_times(target, atime, mtime)
            .map_err(|e| FsError::io("set times", target, e))?;
    }
    if options.preserve_permissions {
        fs::set_permissions(target, meta.permissions())
            .map_err(|e| FsError::io("set permissions", target, e))?;
    }
    Ok(())
}
