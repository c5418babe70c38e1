//! # fsx
//!
//! Filesystem tree toolkit: a depth-aware walker and the operations built on
//! it (search, two-tree diff, duplicate detection, mirroring sync) plus an
//! in-process advisory lock registry.
//!
//! Every operation re-scans the tree; nothing is indexed or cached between
//! calls. Reads never mutate the tree being read.
//!
//! # Quick Start
//!
//! ```rust
//! use std::fs;
//! use fsx::{find_files, SearchOptions};
//!
//! let dir = tempfile::tempdir().unwrap();
//! fs::write(dir.path().join("a.txt"), "alpha").unwrap();
//! fs::write(dir.path().join(".hidden.txt"), "secret").unwrap();
//! fs::create_dir(dir.path().join("sub")).unwrap();
//! fs::write(dir.path().join("sub/b.txt"), "beta").unwrap();
//!
//! let opts = SearchOptions::default().ignore_hidden(true);
//! let results = find_files(dir.path(), "*.txt", &opts).unwrap();
//!
//! assert_eq!(results.len(), 2);
//! ```
//!
//! # Walking
//!
//! [`walk()`] hands each [`Entry`] to a visitor, which steers the traversal
//! with a [`WalkControl`]:
//!
//! ```rust
//! use fsx::{walk, WalkConfig, WalkControl};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("one"), "1").unwrap();
//! std::fs::write(dir.path().join("two"), "2").unwrap();
//!
//! let mut seen = 0;
//! let summary = walk(dir.path(), &WalkConfig::default(), |_entry| {
//!     seen += 1;
//!     Ok(if seen == 2 { WalkControl::Stop } else { WalkControl::Continue })
//! })
//! .unwrap();
//!
//! assert!(summary.stopped);
//! assert_eq!(seen, 2);
//! ```
//!
//! # Custom Matchers
//!
//! Implement [`Matcher`] for predicates the built-in entry points do not
//! cover, and run it through [`search()`] to get the same depth, hidden and
//! pattern filtering.

#![forbid(unsafe_code)]

mod copy;
mod diff;
mod directory;
mod duplicates;
mod entry;
mod error;
mod hash;
mod lock;
mod matchers;
mod options;
mod results;
mod search;
mod sync;
mod traits;
mod walk;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use copy::{copy_directory, CopyOptions, CopyReport, EntryFilter, ProgressFn};
pub use diff::{compare_directories, compare_directories_with, CompareMode, CompareOptions, DiffKind, Difference};
pub use directory::{
    calculate_directory_size, clean_empty_directories, directory_checksum, directory_info,
    list_directory, DirectoryInfo,
};
pub use duplicates::{find_duplicate_files, find_duplicate_files_with};
pub use entry::{mode_bits, Entry, EntryKind};
pub use error::FsError;
pub use hash::{file_checksum, hash_bytes, hash_reader, verify_file_checksum, HashAlgorithm};
pub use lock::{FileLock, LockRegistry};
pub use matchers::{
    is_text_file, AllMatcher, ContentMatcher, NameMatcher, PatternFilter, PermissionMatcher,
    RegexMatcher, SizeMatcher, TimeMatcher, TEXT_EXTENSIONS,
};
pub use options::SearchOptions;
pub use results::{MatchedBy, ScanStats, SearchResult, SearchResults};
pub use search::{
    find_files, find_files_by_content, find_files_by_permissions, find_files_by_regex,
    find_files_by_size, find_files_by_time, search,
};
pub use sync::{sync_directories, sync_directories_with, SyncReport};
pub use traits::{MatchDetail, Matcher};
pub use walk::{walk, WalkConfig, WalkControl, WalkSummary};
