use ignore::WalkBuilder;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use super::matcher::LiteralMatcher;
use super::processor::scan_file;
use crate::config::ScanConfig;
use crate::errors::ScanResult;
use crate::filters::{should_scan_entry, ExcludedPaths};
use crate::pool::ThreadPool;
use crate::report::{finalize, ScanReport};
use crate::results::{ScanOutput, SharedScanState};

/// Scans every non-empty regular file under `root` for `pattern`, one pool
/// task per file, and returns the aggregates once every task has resolved.
///
/// The returned output is not sorted yet; that happens in
/// [`finalize`](crate::report::finalize). A walk error aborts the scan. A
/// task that panics is counted in [`ScanOutput::failed_tasks`] and does not
/// affect the other files.
pub fn find_files(root: &Path, pattern: &str, pool: &ThreadPool) -> ScanResult<ScanOutput> {
    find_files_excluding(root, pattern, pool, &ExcludedPaths::new())
}

/// Like [`find_files`], but never submits a file listed in `excluded`.
pub fn find_files_excluding(
    root: &Path,
    pattern: &str,
    pool: &ThreadPool,
    excluded: &ExcludedPaths,
) -> ScanResult<ScanOutput> {
    let matcher = Arc::new(LiteralMatcher::new(pattern)?);
    let state = SharedScanState::new();

    // Hidden files and ignore files are not special: every file is scanned.
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build();

    debug!("Scanning directory: {}", root.display());
    let mut handles = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !should_scan_entry(&entry)? {
            continue;
        }
        if excluded.contains(entry.path()) {
            debug!("Skipping output file {}", entry.path().display());
            continue;
        }

        let path = entry.into_path();
        trace!("Submitting scan task for {}", path.display());
        let matcher = Arc::clone(&matcher);
        let state = state.clone();
        handles.push(
            pool.submit_with_worker(move |worker| scan_file(&path, &matcher, &state, worker))?,
        );
    }

    info!(
        "Submitted {} scan tasks, waiting for completion",
        handles.len()
    );

    let mut failed_tasks = 0;
    for handle in handles {
        if let Err(e) = handle.get() {
            warn!("Scan task failed: {}", e);
            failed_tasks += 1;
        }
    }

    let mut output = state.take_output();
    output.failed_tasks = failed_tasks;
    Ok(output)
}

/// Runs a complete scan: validate, scan with a fresh pool, then finalize.
pub fn search(config: &ScanConfig) -> ScanResult<ScanReport> {
    info!(
        "Starting search for '{}' in {}",
        config.pattern,
        config.root_path.display()
    );
    let start = Instant::now();
    config.validate()?;

    let thread_count = config.thread_count.get();
    let paths = config.output_paths();
    let excluded = ExcludedPaths::from_outputs(&paths);

    let pool = ThreadPool::new(thread_count)?;
    let mut output = find_files_excluding(&config.root_path, &config.pattern, &pool, &excluded)?;
    pool.shutdown();

    let output_failures = finalize(&mut output, &paths);

    info!(
        "Search complete. Found {} matches in {} files",
        output.stats.total_matches, output.stats.files_with_pattern
    );

    Ok(ScanReport {
        stats: output.stats,
        result_path: paths.result_file,
        log_path: paths.log_file,
        thread_count,
        elapsed: start.elapsed(),
        failed_tasks: output.failed_tasks,
        output_failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ScanError;
    use crate::results::RunStats;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_find_files_counts_matches() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foo\nbar\nfoo\n").unwrap();
        fs::write(dir.path().join("b.txt"), "baz\n").unwrap();

        let pool = ThreadPool::new(2).unwrap();
        let output = find_files(dir.path(), "foo", &pool).unwrap();

        assert_eq!(
            output.stats,
            RunStats {
                files_searched: 2,
                files_with_pattern: 1,
                total_matches: 2,
            }
        );
        assert_eq!(output.results.len(), 2);
        assert_eq!(output.activity.total_files(), 2);
        assert_eq!(output.failed_tasks, 0);
    }

    #[test]
    fn test_find_files_skips_empty_files_and_scans_hidden() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".hidden/deeper")).unwrap();
        fs::write(dir.path().join(".hidden/deeper/x.txt"), "needle\n").unwrap();
        fs::write(dir.path().join(".gitignore"), "*.txt\n").unwrap();
        fs::write(dir.path().join("empty.txt"), "").unwrap();

        let pool = ThreadPool::new(3).unwrap();
        let output = find_files(dir.path(), "needle", &pool).unwrap();

        assert_eq!(output.stats.files_searched, 2);
        assert_eq!(output.stats.total_matches, 1);
        assert!(output
            .results
            .iter()
            .all(|file| !file.path.ends_with("empty.txt")));
    }

    #[test]
    fn test_find_files_missing_root_fails() {
        let dir = tempdir().unwrap();
        let pool = ThreadPool::new(1).unwrap();
        let result = find_files(&dir.path().join("gone"), "x", &pool);
        assert!(matches!(result, Err(ScanError::Walk(_))));
    }

    #[test]
    fn test_find_files_on_stopped_pool_fails() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "x\n").unwrap();

        let pool = ThreadPool::new(1).unwrap();
        pool.shutdown();
        let result = find_files(dir.path(), "x", &pool);
        assert!(matches!(result, Err(ScanError::Pool(_))));
    }

    #[test]
    fn test_search_writes_outputs() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("a.txt"), "foo\nbar\nfoo\n").unwrap();

        let mut config = ScanConfig::new("foo", &root);
        config.result_file = dir.path().join("out");
        config.log_file = dir.path().join("out");

        let report = search(&config).unwrap();
        assert!(report.outputs_written());
        assert_eq!(report.result_path, dir.path().join("out.txt"));
        assert_eq!(report.log_path, dir.path().join("out.log"));
        assert_eq!(report.stats.total_matches, 2);
        assert_eq!(report.thread_count, 4);

        let log = fs::read_to_string(&report.log_path).unwrap();
        assert!(log.starts_with("worker-"));
        assert!(log.trim_end().ends_with(": a.txt"));
    }

    #[test]
    fn test_find_files_excluding_skips_listed_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foo\n").unwrap();
        fs::write(dir.path().join("old.txt"), "a.txt:1: foo\n").unwrap();

        let excluded = ExcludedPaths::from_outputs(&crate::report::OutputPaths {
            result_file: dir.path().join("old.txt"),
            log_file: dir.path().join("old.log"),
        });
        let pool = ThreadPool::new(2).unwrap();
        let output = find_files_excluding(dir.path(), "foo", &pool, &excluded).unwrap();

        assert_eq!(output.stats.files_searched, 1);
        assert_eq!(output.stats.total_matches, 1);
        assert!(output.results[0].path.ends_with("a.txt"));
    }

    #[test]
    fn test_search_rejects_empty_pattern() {
        let dir = tempdir().unwrap();
        let config = ScanConfig::new("", dir.path());
        assert!(matches!(search(&config), Err(ScanError::InvalidPattern(_))));
    }
}
