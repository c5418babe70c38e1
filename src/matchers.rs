use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::SystemTime;

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::entry::Entry;
use crate::error::FsError;
use crate::results::MatchedBy;
use crate::traits::{MatchDetail, Matcher};

/// Extensions treated as text by content search. Anything else is skipped
/// without being opened.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "log", "md", "json", "xml", "yaml", "yml",
    "go", "js", "py", "java", "c", "cpp", "h", "hpp",
    "html", "css", "scss", "less", "vue", "jsx", "tsx",
    "sh", "bash", "zsh", "fish", "conf", "cfg", "ini",
    "csv", "sql", "rs", "rb", "php", "swift", "kt",
];

/// Whether content search will look inside `path`, judged by extension only.
pub fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TEXT_EXTENSIONS.iter().any(|t| t.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Glob compilation
// ---------------------------------------------------------------------------

/// Compile a single name glob (`*`, `?`, `[...]`, `{a,b}`).
///
/// `*` never crosses a path separator, so patterns behave the same whether
/// they are applied to a bare name or a relative path.
pub fn compile_glob(pattern: &str, case_sensitive: bool) -> Result<GlobMatcher, FsError> {
    GlobBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| FsError::InvalidPattern {
            pattern: pattern.to_string(),
            reason:  e.kind().to_string(),
        })
}

fn compile_set(patterns: &[String], case_sensitive: bool) -> Result<Option<GlobSet>, FsError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .literal_separator(true)
            .build()
            .map_err(|e| FsError::InvalidPattern {
                pattern: pattern.clone(),
                reason:  e.kind().to_string(),
            })?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| FsError::InvalidPattern {
            pattern: patterns.join(", "),
            reason:  e.to_string(),
        })
}

// ---------------------------------------------------------------------------
// PatternFilter
// ---------------------------------------------------------------------------

/// Compiled include/exclude name patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl PatternFilter {
    /// # Errors
    /// [`FsError::InvalidPattern`] if any pattern fails to compile.
    pub fn new(include: &[String], exclude: &[String], case_sensitive: bool) -> Result<Self, FsError> {
        Ok(Self {
            include: compile_set(include, case_sensitive)?,
            exclude: compile_set(exclude, case_sensitive)?,
        })
    }

    /// `true` if `name` matches any exclude pattern.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.as_ref().map(|s| s.is_match(name)).unwrap_or(false)
    }

    /// `true` if no include patterns are set or `name` matches one of them.
    pub fn is_included(&self, name: &str) -> bool {
        self.include.as_ref().map(|s| s.is_match(name)).unwrap_or(true)
    }
}

// ---------------------------------------------------------------------------
// Built-in matchers
// ---------------------------------------------------------------------------

/// Matches entries whose name matches a glob.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    glob: GlobMatcher,
}

impl NameMatcher {
    pub fn new(pattern: &str, case_sensitive: bool) -> Result<Self, FsError> {
        Ok(Self { glob: compile_glob(pattern, case_sensitive)? })
    }
}

impl Matcher for NameMatcher {
    fn matches(&self, entry: &Entry) -> Option<MatchDetail> {
        self.glob
            .is_match(&entry.name)
            .then(|| MatchDetail::new(MatchedBy::Name))
    }
}

/// Matches entries whose name contains a match for a regular expression
/// (unanchored).
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    re: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str, case_sensitive: bool) -> Result<Self, FsError> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|source| FsError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self { re })
    }
}

impl Matcher for RegexMatcher {
    fn matches(&self, entry: &Entry) -> Option<MatchDetail> {
        self.re
            .is_match(&entry.name)
            .then(|| MatchDetail::new(MatchedBy::Regex))
    }
}

/// Matches text files containing a literal string.
///
/// Reports the first matching line only; the rest of the file is not read.
/// Files that cannot be opened or read are skipped.
#[derive(Debug, Clone)]
pub struct ContentMatcher {
    needle:         String,
    case_sensitive: bool,
    whole_word:     bool,
}

impl ContentMatcher {
    pub fn new(needle: &str, case_sensitive: bool, whole_word: bool) -> Self {
        let needle = if case_sensitive {
            needle.to_string()
        } else {
            needle.to_lowercase()
        };
        Self { needle, case_sensitive, whole_word }
    }

    fn line_matches(&self, line: &str) -> bool {
        let folded;
        let line = if self.case_sensitive {
            line
        } else {
            folded = line.to_lowercase();
            folded.as_str()
        };

        if self.whole_word {
            line.split_whitespace().any(|word| word == self.needle)
        } else {
            line.contains(self.needle.as_str())
        }
    }
}

impl Matcher for ContentMatcher {
    fn matches(&self, entry: &Entry) -> Option<MatchDetail> {
        if entry.is_dir() || !is_text_file(&entry.path) {
            return None;
        }

        let file = match File::open(&entry.path) {
            Ok(f) => f,
            Err(e) => {
                debug!(path = %entry.path.display(), error = %e, "content search skipped file");
                return None;
            }
        };

        for (idx, raw) in BufReader::new(file).split(b'\n').enumerate() {
            let raw = match raw {
                Ok(r) => r,
                Err(e) => {
                    debug!(path = %entry.path.display(), error = %e, "content search stopped reading");
                    return None;
                }
            };
            let decoded = String::from_utf8_lossy(&raw);
            let line: &str = decoded.strip_suffix('\r').unwrap_or(&*decoded);
            if self.line_matches(line) {
                return Some(MatchDetail::at_line(MatchedBy::Content, idx + 1, line.to_string()));
            }
        }
        None
    }
}

/// Matches entries whose size lies in an inclusive range. `None` leaves that
/// side open.
#[derive(Debug, Clone, Copy)]
pub struct SizeMatcher {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl Matcher for SizeMatcher {
    fn matches(&self, entry: &Entry) -> Option<MatchDetail> {
        let above = self.min.map(|m| entry.size >= m).unwrap_or(true);
        let below = self.max.map(|m| entry.size <= m).unwrap_or(true);
        (above && below).then(|| MatchDetail::new(MatchedBy::Size))
    }
}

/// Matches entries modified strictly after `after` and strictly before
/// `before`. `None` leaves that side open.
#[derive(Debug, Clone, Copy)]
pub struct TimeMatcher {
    pub after:  Option<SystemTime>,
    pub before: Option<SystemTime>,
}

impl Matcher for TimeMatcher {
    fn matches(&self, entry: &Entry) -> Option<MatchDetail> {
        let after  = self.after.map(|t| entry.modified > t).unwrap_or(true);
        let before = self.before.map(|t| entry.modified < t).unwrap_or(true);
        (after && before).then(|| MatchDetail::new(MatchedBy::Time))
    }
}

/// Matches on the `0o777` permission bits, either exactly or as a required
/// subset.
#[derive(Debug, Clone, Copy)]
pub struct PermissionMatcher {
    pub mode:  u32,
    pub exact: bool,
}

impl Matcher for PermissionMatcher {
    fn matches(&self, entry: &Entry) -> Option<MatchDetail> {
        let perm = entry.mode & 0o777;
        let want = self.mode & 0o777;
        let hit = if self.exact {
            perm == want
        } else {
            perm & want == want
        };
        hit.then(|| MatchDetail::new(MatchedBy::Permissions))
    }
}

/// Matches every entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllMatcher;

impl Matcher for AllMatcher {
    fn matches(&self, _entry: &Entry) -> Option<MatchDetail> {
        Some(MatchDetail::new(MatchedBy::Custom))
    }
}
