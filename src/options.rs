// ---------------------------------------------------------------------------
// SearchOptions
// ---------------------------------------------------------------------------

/// Knobs shared by every search entry point.
///
/// All fields are independent and public. Start from `SearchOptions::default()`
/// and chain setters:
///
/// ```rust
/// let opts = fsx::SearchOptions::default()
///     .max_depth(2)
///     .ignore_hidden(true)
///     .exclude(["*.bak"])
///     .limit(10);
/// assert_eq!(opts.max_depth, Some(2));
/// ```
///
/// | field              | default       |
/// |--------------------|---------------|
/// | `max_depth`        | `None` (unlimited) |
/// | `min_depth`        | `0`           |
/// | `follow_symlinks`  | `false`       |
/// | `case_sensitive`   | `true`        |
/// | `whole_word`       | `false`       |
/// | `ignore_hidden`    | `false`       |
/// | `limit`            | `None` (unlimited) |
/// | `include_patterns` | empty         |
/// | `exclude_patterns` | empty         |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub max_depth:        Option<usize>,
    pub min_depth:        usize,
    pub follow_symlinks:  bool,
    pub case_sensitive:   bool,
    pub whole_word:       bool,
    pub ignore_hidden:    bool,
    pub limit:            Option<usize>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_depth:        None,
            min_depth:        0,
            follow_symlinks:  false,
            case_sensitive:   true,
            whole_word:       false,
            ignore_hidden:    false,
            limit:            None,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl SearchOptions {
    // ── Depth ─────────────────────────────────────────────────────────────

    /// Deepest level searched, inclusive. `0` means the root only, `1` means
    /// one level of children, and so on. Unlimited by default.
    pub fn max_depth(mut self, d: usize) -> Self {
        self.max_depth = Some(d);
        self
    }

    /// Shallowest level reported, inclusive. Entries above it are still
    /// descended, just never returned.
    pub fn min_depth(mut self, d: usize) -> Self {
        self.min_depth = d;
        self
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.follow_symlinks = yes;
        self
    }

    /// Skip entries whose name starts with `.`, along with the whole subtree
    /// of hidden directories. The search root itself is never considered
    /// hidden.
    pub fn ignore_hidden(mut self, yes: bool) -> Self {
        self.ignore_hidden = yes;
        self
    }

    // ── Matching ──────────────────────────────────────────────────────────

    /// Applies to name globs, regexes, include/exclude patterns and content.
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    /// Content search only: match whitespace-separated words exactly instead
    /// of substrings.
    pub fn whole_word(mut self, yes: bool) -> Self {
        self.whole_word = yes;
        self
    }

    /// Names must match at least one of these globs to be reported.
    /// Directories are still descended when they fail an include pattern.
    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Names matching any of these globs are dropped; matching directories
    /// are not descended. Checked before include patterns.
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    // ── Limits ────────────────────────────────────────────────────────────

    /// Stop the walk once `n` results have been collected. `0` means
    /// unlimited.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// The effective result cap, with `Some(0)` normalized to unlimited.
    pub(crate) fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|&n| n > 0)
    }
}
