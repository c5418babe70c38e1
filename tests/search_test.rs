use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use fsx::{
    find_files, find_files_by_content, find_files_by_permissions, find_files_by_regex,
    find_files_by_size, find_files_by_time, search, Entry, FsError, MatchDetail, MatchedBy,
    Matcher, SearchOptions,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory tree for testing.
///
/// Structure:
/// ```text
/// tmp/
///   test.txt              "Hello World"
///   test1.txt
///   test2.txt
///   document.md
///   data.json
///   script.sh
///   large_file.dat        1000 bytes
///   .hidden_file
///   subdir1/file.log
///   subdir2/another.txt
///   deep/nested/nested.log
///   .hidden_dir/secret.txt
/// ```
fn setup_test_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    for sub in ["subdir1", "subdir2", "deep/nested", ".hidden_dir"] {
        fs::create_dir_all(root.join(sub)).unwrap();
    }

    let files = [
        ("test.txt", "Hello World".to_string()),
        ("test1.txt", "Content of test1".to_string()),
        ("test2.txt", "Content of test2".to_string()),
        ("document.md", "# Markdown Document\n\nThis is a test document.".to_string()),
        ("data.json", r#"{"name": "test", "value": 123}"#.to_string()),
        ("script.sh", "#!/bin/bash\necho 'test'".to_string()),
        (".hidden_file", "Hidden content".to_string()),
        ("subdir1/file.log", "Log entry 1\nLog entry 2".to_string()),
        ("subdir2/another.txt", "Another file".to_string()),
        ("deep/nested/nested.log", "Deeply nested content".to_string()),
        (".hidden_dir/secret.txt", "Secret content".to_string()),
        ("large_file.dat", "x".repeat(1000)),
    ];
    for (path, content) in files {
        fs::write(root.join(path), content).unwrap();
    }

    dir
}

/// Number of path segments below `root`.
fn depth_of(root: &Path, path: &Path) -> usize {
    path.strip_prefix(root).unwrap().components().count()
}

fn names(results: &fsx::SearchResults) -> Vec<String> {
    let mut names: Vec<String> = results.matches.iter().map(|m| m.entry.name.clone()).collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// Name search
// ---------------------------------------------------------------------------

#[test]
fn glob_ignoring_hidden_skips_hidden_files_and_dirs() {
    let dir = setup_test_dir();
    let opts = SearchOptions::default().ignore_hidden(true);
    let results = find_files(dir.path(), "*.txt", &opts).unwrap();

    assert_eq!(
        names(&results),
        vec!["another.txt", "test.txt", "test1.txt", "test2.txt"]
    );
    assert!(results.matches.iter().all(|m| m.matched_by == MatchedBy::Name));
}

#[test]
fn hidden_scenario_returns_exactly_two() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    fs::write(dir.path().join(".hidden.txt"), "h").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/b.txt"), "b").unwrap();

    let results = find_files(dir.path(), "*.txt", &SearchOptions::default().ignore_hidden(true)).unwrap();
    assert_eq!(names(&results), vec!["a.txt", "b.txt"]);
}

#[test]
fn exact_name_and_case_folding() {
    let dir = setup_test_dir();

    let exact = find_files(dir.path(), "test.txt", &SearchOptions::default()).unwrap();
    assert_eq!(exact.len(), 1);

    let shouted = find_files(dir.path(), "TEST.TXT", &SearchOptions::default()).unwrap();
    assert!(shouted.is_empty());

    let folded = find_files(dir.path(), "TEST.TXT", &SearchOptions::default().case_sensitive(false)).unwrap();
    assert_eq!(folded.len(), 1);
}

#[test]
fn max_depth_excludes_deeper_entries() {
    let dir = setup_test_dir();
    let results = find_files(dir.path(), "*", &SearchOptions::default().max_depth(1)).unwrap();

    assert!(!results.is_empty());
    for m in &results.matches {
        assert!(depth_of(dir.path(), &m.entry.path) <= 1, "{} too deep", m.entry.path.display());
        assert!(m.entry.depth <= 1);
    }
    assert!(!results.paths().any(|p| p.ends_with("another.txt")));
}

#[test]
fn min_depth_excludes_shallow_entries() {
    let dir = setup_test_dir();
    let results = find_files(dir.path(), "*", &SearchOptions::default().min_depth(2)).unwrap();

    assert!(results.matches.iter().all(|m| depth_of(dir.path(), &m.entry.path) >= 2));
    assert!(results.paths().any(|p| p.ends_with("nested.log")));
    assert!(!results.paths().any(|p| p.ends_with("test.txt")));
}

#[test]
fn include_and_exclude_patterns() {
    let dir = setup_test_dir();
    let opts = SearchOptions::default()
        .include(["*.txt", "*.log"])
        .exclude([".*"]);
    let results = find_files(dir.path(), "*", &opts).unwrap();

    let found = names(&results);
    assert!(found.contains(&"test.txt".to_string()));
    assert!(found.contains(&"nested.log".to_string()), "include must not prune directories");
    assert!(!found.contains(&"secret.txt".to_string()), "excluded dir must not be descended");
    assert!(!found.contains(&".hidden_file".to_string()));
    assert!(!found.contains(&"data.json".to_string()));
}

#[test]
fn exclude_wins_over_include() {
    let dir = setup_test_dir();
    let opts = SearchOptions::default().include(["*.txt"]).exclude(["test*"]);
    let results = find_files(dir.path(), "*", &opts).unwrap();

    assert_eq!(names(&results), vec!["another.txt", "secret.txt"]);
}

#[test]
fn directories_are_never_results() {
    let dir = setup_test_dir();
    let results = find_files(dir.path(), "sub*", &SearchOptions::default()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn limit_caps_results_without_error() {
    let dir = setup_test_dir();
    let results = find_files(dir.path(), "*", &SearchOptions::default().limit(2)).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.errors.is_empty());
}

#[test]
fn zero_limit_means_unlimited() {
    let dir = setup_test_dir();
    let all = find_files(dir.path(), "*", &SearchOptions::default()).unwrap();
    let zero = find_files(dir.path(), "*", &SearchOptions::default().limit(0)).unwrap();
    assert_eq!(all.len(), 12);
    assert_eq!(zero.len(), all.len());
}

#[test]
fn ignore_hidden_reduces_results() {
    let dir = setup_test_dir();
    let with_hidden = find_files(dir.path(), "*", &SearchOptions::default()).unwrap();
    let without = find_files(dir.path(), "*", &SearchOptions::default().ignore_hidden(true)).unwrap();

    assert!(without.len() < with_hidden.len());
    assert!(without.matches.iter().all(|m| !m.entry.name.starts_with('.')));
}

#[test]
fn combined_knobs() {
    let dir = setup_test_dir();
    let opts = SearchOptions::default().max_depth(1).ignore_hidden(true).limit(5);
    let results = find_files(dir.path(), "*.txt", &opts).unwrap();

    assert!(results.len() <= 5);
    for m in &results.matches {
        assert!(m.entry.name.ends_with(".txt"));
        assert!(!m.entry.name.starts_with('.'));
        assert!(depth_of(dir.path(), &m.entry.path) <= 1);
    }
}

#[test]
fn malformed_glob_fails_before_walking() {
    let dir = setup_test_dir();
    let err = find_files(dir.path(), "[unclosed", &SearchOptions::default()).unwrap_err();
    assert!(matches!(err, FsError::InvalidPattern { .. }));

    let err = find_files(dir.path(), "*", &SearchOptions::default().exclude(["a[b"])).unwrap_err();
    assert!(matches!(err, FsError::InvalidPattern { .. }));
}

#[test]
fn missing_root_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = find_files(&dir.path().join("nope"), "*", &SearchOptions::default()).unwrap_err();
    assert!(matches!(err, FsError::NotFound(_)));
}

#[test]
fn no_match_is_empty_not_error() {
    let dir = setup_test_dir();
    let results = find_files(dir.path(), "*.xyz", &SearchOptions::default()).unwrap();
    assert!(results.is_empty());
    assert!(results.errors.is_empty());
}

// ---------------------------------------------------------------------------
// Regex search
// ---------------------------------------------------------------------------

#[test]
fn regex_matches_names() {
    let dir = setup_test_dir();
    let results = find_files_by_regex(dir.path(), r"test\d+\.txt", &SearchOptions::default()).unwrap();

    assert_eq!(names(&results), vec!["test1.txt", "test2.txt"]);
    assert!(results.matches.iter().all(|m| m.matched_by == MatchedBy::Regex));
}

#[test]
fn regex_case_insensitive() {
    let dir = setup_test_dir();
    let opts = SearchOptions::default().case_sensitive(false);
    let results = find_files_by_regex(dir.path(), r"^TEST\.TXT$", &opts).unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn invalid_regex_is_reported() {
    let dir = setup_test_dir();
    let err = find_files_by_regex(dir.path(), r"test(\d+", &SearchOptions::default()).unwrap_err();
    match err {
        FsError::InvalidRegex { pattern, .. } => assert_eq!(pattern, r"test(\d+"),
        other => panic!("unexpected error: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Content search
// ---------------------------------------------------------------------------

#[test]
fn content_reports_first_line() {
    let dir = setup_test_dir();
    let results = find_files_by_content(dir.path(), "Hello", &SearchOptions::default()).unwrap();

    assert_eq!(results.len(), 1);
    let hit = &results.matches[0];
    assert_eq!(hit.matched_by, MatchedBy::Content);
    assert_eq!(hit.line_number, Some(1));
    assert_eq!(hit.line.as_deref(), Some("Hello World"));
}

#[test]
fn content_one_result_per_file() {
    let dir = setup_test_dir();
    let results = find_files_by_content(dir.path(), "Log entry", &SearchOptions::default()).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results.matches[0].line_number, Some(1));
}

#[test]
fn content_line_numbers_are_one_based() {
    let dir = setup_test_dir();
    let results = find_files_by_content(dir.path(), "Log entry 2", &SearchOptions::default()).unwrap();
    assert_eq!(results.matches[0].line_number, Some(2));
}

#[test]
fn content_skips_non_text_extensions() {
    let dir = setup_test_dir();
    // large_file.dat is all x's but .dat is not on the allow-list.
    let results = find_files_by_content(dir.path(), "xxx", &SearchOptions::default()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn content_whole_word() {
    let dir = setup_test_dir();
    let target = dir.path().join("whole_word_test.txt");
    fs::write(&target, "testing test tested").unwrap();
    fs::write(dir.path().join("partial.txt"), "testing tested").unwrap();

    let opts = SearchOptions::default().whole_word(true);
    let results = find_files_by_content(dir.path(), "test", &opts).unwrap();

    assert!(results.paths().any(|p| p == target));
    assert!(!results.paths().any(|p| p.ends_with("partial.txt")));
}

#[test]
fn content_case_insensitive() {
    let dir = setup_test_dir();
    let opts = SearchOptions::default().case_sensitive(false);
    let results = find_files_by_content(dir.path(), "hello world", &opts).unwrap();
    assert_eq!(results.len(), 1);
}

// ---------------------------------------------------------------------------
// Size / time / permissions
// ---------------------------------------------------------------------------

#[test]
fn size_range_is_inclusive() {
    let dir = setup_test_dir();

    let mid = find_files_by_size(dir.path(), Some(10), Some(100), &SearchOptions::default()).unwrap();
    assert!(!mid.is_empty());
    assert!(mid.matches.iter().all(|m| (10..=100).contains(&m.entry.size)));

    let exact = find_files_by_size(dir.path(), Some(1000), Some(1000), &SearchOptions::default()).unwrap();
    assert_eq!(names(&exact), vec!["large_file.dat"]);

    let large = find_files_by_size(dir.path(), Some(100), None, &SearchOptions::default()).unwrap();
    assert!(large.matches.iter().all(|m| m.entry.size >= 100));
    assert!(large.matches.iter().all(|m| m.matched_by == MatchedBy::Size));
}

#[test]
fn time_range_filters_by_mtime() {
    let dir = setup_test_dir();
    let old = dir.path().join("old_file.txt");
    fs::write(&old, "old content").unwrap();
    let two_days_ago = SystemTime::now() - Duration::from_secs(48 * 3600);
    filetime::set_file_mtime(&old, filetime::FileTime::from_system_time(two_days_ago)).unwrap();

    let yesterday = SystemTime::now() - Duration::from_secs(24 * 3600);
    let tomorrow = SystemTime::now() + Duration::from_secs(24 * 3600);

    let recent = find_files_by_time(dir.path(), Some(yesterday), Some(tomorrow), &SearchOptions::default()).unwrap();
    assert!(!recent.paths().any(|p| p == old));
    assert!(!recent.is_empty());

    let stale = find_files_by_time(dir.path(), None, Some(yesterday), &SearchOptions::default()).unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale.matches[0].entry.path, old);
    assert_eq!(stale.matches[0].matched_by, MatchedBy::Time);
}

#[cfg(unix)]
#[test]
fn permissions_exact_and_at_least() {
    use std::os::unix::fs::PermissionsExt;

    let dir = setup_test_dir();
    let readonly = dir.path().join("readonly.txt");
    fs::write(&readonly, "readonly").unwrap();
    fs::set_permissions(&readonly, fs::Permissions::from_mode(0o444)).unwrap();

    let exec = dir.path().join("script.sh");
    fs::set_permissions(&exec, fs::Permissions::from_mode(0o755)).unwrap();

    let exact = find_files_by_permissions(dir.path(), 0o444, true, &SearchOptions::default()).unwrap();
    assert_eq!(names(&exact), vec!["readonly.txt"]);

    let executable = find_files_by_permissions(dir.path(), 0o100, false, &SearchOptions::default()).unwrap();
    assert_eq!(names(&executable), vec!["script.sh"]);

    let readable = find_files_by_permissions(dir.path(), 0o400, false, &SearchOptions::default()).unwrap();
    assert!(readable.len() >= 2);
    assert!(readable.matches.iter().all(|m| m.matched_by == MatchedBy::Permissions));
}

// ---------------------------------------------------------------------------
// Custom matcher
// ---------------------------------------------------------------------------

#[test]
fn custom_matcher_runs_through_pipeline() {
    struct RustMatcher;
    impl Matcher for RustMatcher {
        fn matches(&self, entry: &Entry) -> Option<MatchDetail> {
            entry
                .path
                .extension()
                .map(|e| e == "json")
                .unwrap_or(false)
                .then(|| MatchDetail::new(MatchedBy::Custom))
        }
    }

    let dir = setup_test_dir();
    let results = search(dir.path(), &RustMatcher, &SearchOptions::default()).unwrap();

    assert_eq!(results.len(), 1, "should find exactly 1 .json file");
    assert!(results.matches[0].entry.path.ends_with("data.json"));
    assert_eq!(results.matches[0].matched_by, MatchedBy::Custom);
}

#[test]
fn stats_are_populated() {
    let dir = setup_test_dir();
    let results = find_files(dir.path(), "*", &SearchOptions::default()).unwrap();

    // 12 files; root + 5 directories.
    assert_eq!(results.stats.files, 12);
    assert_eq!(results.stats.dirs, 6);
}

// ---------------------------------------------------------------------------
// Absorbed walk errors
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn dangling_link_is_reported_and_siblings_still_searched() {
    let dir = setup_test_dir();
    let dangling = dir.path().join("subdir1/dangling");
    std::os::unix::fs::symlink(dir.path().join("nowhere"), &dangling).unwrap();

    let opts = SearchOptions::default().follow_symlinks(true);
    let results = find_files(dir.path(), "*", &opts).unwrap();

    assert_eq!(results.errors.len(), 1, "{:?}", results.errors);
    let err = &results.errors[0];
    assert!(matches!(err, FsError::NotFound(_)), "{err:?}");
    assert_eq!(err.path(), Some(dangling.as_path()));

    assert!(results.paths().any(|p| p.ends_with("subdir1/file.log")));
    assert!(results.paths().any(|p| p.ends_with("nested.log")));
    assert_eq!(results.len(), 12);
}

#[cfg(unix)]
#[test]
fn symlink_loop_is_reported_and_walk_continues() {
    let dir = setup_test_dir();
    std::os::unix::fs::symlink(dir.path().join("deep"), dir.path().join("deep/nested/back")).unwrap();

    let opts = SearchOptions::default().follow_symlinks(true);
    let results = find_files(dir.path(), "*.log", &opts).unwrap();

    assert!(
        results.errors.iter().any(|e| matches!(e, FsError::SymlinkLoop(_))),
        "{:?}",
        results.errors
    );
    assert!(results.errors.iter().all(|e| e.path().is_some()));
    assert_eq!(names(&results), vec!["file.log", "nested.log"]);
}
