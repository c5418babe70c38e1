use std::path::Path;
use std::time::SystemTime;

use tracing::debug;

use crate::entry::Entry;
use crate::error::FsError;
use crate::matchers::{
    ContentMatcher, NameMatcher, PatternFilter, PermissionMatcher, RegexMatcher, SizeMatcher,
    TimeMatcher,
};
use crate::options::SearchOptions;
use crate::results::{SearchResult, SearchResults};
use crate::traits::Matcher;
use crate::walk::{walk, WalkConfig, WalkControl};

// ---------------------------------------------------------------------------
// search()
// ---------------------------------------------------------------------------

/// Run `matcher` over every non-directory entry under `root` that survives
/// the option filters.
///
/// Filters run in this order, first rejection wins:
/// exclude patterns → include patterns → hidden check → depth bounds →
/// `matcher`. Excluded, hidden and too-deep directories are not descended.
/// The root itself is exempt from the exclude and hidden checks.
///
/// # Errors
///
/// Fails before walking if `root` is missing or a pattern does not compile.
/// Unreadable subtrees are reported in [`SearchResults::errors`] instead.
pub fn search(
    root: &Path,
    matcher: &dyn Matcher,
    options: &SearchOptions,
) -> Result<SearchResults, FsError> {
    let filter = PatternFilter::new(
        &options.include_patterns,
        &options.exclude_patterns,
        options.case_sensitive,
    )?;
    let limit = options.effective_limit();

    let config = WalkConfig {
        follow_symlinks: options.follow_symlinks,
        max_depth:       options.max_depth,
    };

    let mut matches = Vec::<SearchResult>::new();

    let summary = walk(root, &config, |entry| {
        if limit.is_some_and(|lim| matches.len() >= lim) {
            return Ok(WalkControl::Stop);
        }

        if let Some(control) = screen(entry, &filter, options) {
            return Ok(control);
        }

        if let Some(detail) = matcher.matches(entry) {
            matches.push(SearchResult {
                entry:       entry.clone(),
                matched_by:  detail.matched_by,
                line_number: detail.line_number,
                line:        detail.line,
            });
            if limit.is_some_and(|lim| matches.len() >= lim) {
                return Ok(WalkControl::Stop);
            }
        }

        Ok(WalkControl::Continue)
    })?;

    debug!(
        root = %root.display(),
        matches = matches.len(),
        capped = summary.stopped,
        "search finished"
    );

    Ok(SearchResults {
        matches,
        stats: summary.stats,
        errors: summary.errors,
    })
}

/// Decide whether `entry` is rejected before the matcher runs.
///
/// Returns the control signal for a rejected entry, or `None` if the entry
/// is a candidate for the matcher.
fn screen(entry: &Entry, filter: &PatternFilter, options: &SearchOptions) -> Option<WalkControl> {
    let reject = if entry.is_dir() {
        WalkControl::SkipSubtree
    } else {
        WalkControl::Continue
    };
    let is_root = entry.depth == 0;

    if !is_root && filter.is_excluded(&entry.name) {
        return Some(reject);
    }

    // Include patterns select results; they never prune directories.
    if !entry.is_dir() && !filter.is_included(&entry.name) {
        return Some(WalkControl::Continue);
    }

    if !is_root && options.ignore_hidden && entry.is_hidden() {
        return Some(reject);
    }

    if options.max_depth.is_some_and(|max| entry.depth > max) {
        return Some(reject);
    }

    if entry.is_dir() || entry.depth < options.min_depth {
        return Some(WalkControl::Continue);
    }

    None
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Find files whose name matches a glob (`*`, `?`, `[...]`, `{a,b}`).
///
/// # Errors
/// [`FsError::InvalidPattern`] for a malformed glob, [`FsError::NotFound`]
/// for a missing root.
pub fn find_files(root: &Path, pattern: &str, options: &SearchOptions) -> Result<SearchResults, FsError> {
    let matcher = NameMatcher::new(pattern, options.case_sensitive)?;
    search(root, &matcher, options)
}

/// Find files whose name contains a match for `pattern`.
///
/// The regex is compiled once, before any traversal.
///
/// # Errors
/// [`FsError::InvalidRegex`] for a pattern that does not compile.
pub fn find_files_by_regex(root: &Path, pattern: &str, options: &SearchOptions) -> Result<SearchResults, FsError> {
    let matcher = RegexMatcher::new(pattern, options.case_sensitive)?;
    search(root, &matcher, options)
}

/// Find text files containing `content`, one result per file carrying the
/// first matching line.
///
/// Only files with an extension in [`TEXT_EXTENSIONS`](crate::TEXT_EXTENSIONS)
/// are opened. Honours `case_sensitive` and `whole_word`.
pub fn find_files_by_content(root: &Path, content: &str, options: &SearchOptions) -> Result<SearchResults, FsError> {
    let matcher = ContentMatcher::new(content, options.case_sensitive, options.whole_word);
    search(root, &matcher, options)
}

/// Find files whose size lies in `min..=max`. `None` leaves a side open.
pub fn find_files_by_size(
    root: &Path,
    min: Option<u64>,
    max: Option<u64>,
    options: &SearchOptions,
) -> Result<SearchResults, FsError> {
    search(root, &SizeMatcher { min, max }, options)
}

/// Find files modified strictly after `after` and strictly before `before`.
/// `None` leaves a side open.
pub fn find_files_by_time(
    root: &Path,
    after: Option<SystemTime>,
    before: Option<SystemTime>,
    options: &SearchOptions,
) -> Result<SearchResults, FsError> {
    search(root, &TimeMatcher { after, before }, options)
}

/// Find files by permission bits. With `exact` the `0o777` bits must equal
/// `mode`; otherwise they must include every bit of `mode`.
pub fn find_files_by_permissions(
    root: &Path,
    mode: u32,
    exact: bool,
    options: &SearchOptions,
) -> Result<SearchResults, FsError> {
    search(root, &PermissionMatcher { mode, exact }, options)
}
