use std::fmt;
use std::time::Duration;

use crate::entry::Entry;
use crate::error::FsError;

/// The output of a completed search.
#[derive(Debug)]
pub struct SearchResults {
    /// Matched entries, in the order the walk found them.
    pub matches: Vec<SearchResult>,

    /// Scan performance statistics.
    pub stats: ScanStats,

    /// Non-fatal errors absorbed during the walk (permission denied, etc.).
    /// Their subtrees were not searched. Use [`FsError::is_recoverable`] to
    /// tell warnings from failures.
    pub errors: Vec<FsError>,
}

impl SearchResults {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Iterate over the matched paths.
    pub fn paths(&self) -> impl Iterator<Item = &std::path::Path> {
        self.matches.iter().map(|m| m.entry.path.as_path())
    }
}

/// One matched entry plus the predicate that accepted it.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: Entry,

    pub matched_by: MatchedBy,

    /// 1-based line number of the first matching line (content search only).
    pub line_number: Option<usize>,

    /// Text of the first matching line, without its line terminator
    /// (content search only).
    pub line: Option<String>,
}

/// Which predicate produced a [`SearchResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchedBy {
    Name,
    Regex,
    Content,
    Size,
    Time,
    Permissions,
    /// A caller-supplied [`Matcher`](crate::Matcher).
    Custom,
}

impl fmt::Display for MatchedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchedBy::Name        => "name",
            MatchedBy::Regex       => "regex",
            MatchedBy::Content     => "content",
            MatchedBy::Size        => "size",
            MatchedBy::Time        => "time",
            MatchedBy::Permissions => "permissions",
            MatchedBy::Custom      => "custom",
        };
        f.write_str(s)
    }
}

/// Performance statistics for a completed scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanStats {
    /// Total number of non-directory entries encountered (matched or not).
    pub files: usize,

    /// Total number of directories encountered.
    pub dirs: usize,

    /// Wall-clock time from walk start to completion.
    pub duration: Duration,

    /// Total entries scanned per second. Equals
    /// `(files + dirs) / duration.as_secs_f64()`, clamped to 0 on
    /// zero-duration runs.
    pub entries_per_sec: usize,
}

impl ScanStats {
    /// Compute `entries_per_sec` from raw counts and duration.
    pub(crate) fn compute(files: usize, dirs: usize, duration: Duration) -> Self {
        let total = files + dirs;
        let eps = if duration.as_secs_f64() > 0.0 {
            (total as f64 / duration.as_secs_f64()) as usize
        } else {
            0
        };
        Self {
            files,
            dirs,
            duration,
            entries_per_sec: eps,
        }
    }
}
