use crate::entry::Entry;
use crate::results::MatchedBy;

/// Determines whether an entry is a search hit.
///
/// The search pipeline runs exclude/include patterns, the hidden check and
/// the depth bounds first, then hands each surviving non-directory entry to
/// the matcher. Implement this for predicates the built-in entry points do
/// not cover; run it with [`search()`](crate::search()).
///
/// # Thread Safety
///
/// `Send + Sync` are required: matchers are shared with the walk worker.
///
/// # Example
///
/// ```rust
/// use fsx::{Entry, MatchDetail, MatchedBy, Matcher};
///
/// struct ExtensionMatcher(String);
///
/// impl Matcher for ExtensionMatcher {
///     fn matches(&self, entry: &Entry) -> Option<MatchDetail> {
///         let hit = entry.path
///             .extension()
///             .map(|e| e.eq_ignore_ascii_case(&self.0))
///             .unwrap_or(false);
///         hit.then(|| MatchDetail::new(MatchedBy::Custom))
///     }
/// }
/// ```
pub trait Matcher: Send + Sync {
    /// Returns `Some` if this entry should be included in results.
    fn matches(&self, entry: &Entry) -> Option<MatchDetail>;
}

/// Provenance of a match, copied into the resulting
/// [`SearchResult`](crate::SearchResult).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDetail {
    pub matched_by: MatchedBy,
    pub line_number: Option<usize>,
    pub line: Option<String>,
}

impl MatchDetail {
    pub fn new(matched_by: MatchedBy) -> Self {
        Self {
            matched_by,
            line_number: None,
            line: None,
        }
    }

    /// A content hit on `line_number` (1-based).
    pub fn at_line(matched_by: MatchedBy, line_number: usize, line: String) -> Self {
        Self {
            matched_by,
            line_number: Some(line_number),
            line: Some(line),
        }
    }
}
