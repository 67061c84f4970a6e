//! Aggregates shared by concurrently running scan tasks.
//!
//! During a scan every task holds a clone of [`SharedScanState`]. All three
//! aggregates live behind one mutex:
//!
//! - [`RunStats`]: files searched, files containing the pattern, total matches
//! - the results aggregate: one [`FileMatches`] per scanned file
//! - [`WorkerActivity`]: which worker processed which files
//!
//! The lock is taken briefly for each counter bump or append and is never held
//! while reading from disk. Once every task has resolved, the coordinator takes
//! the state out with [`SharedScanState::take_output`] and sorts it; nothing is
//! read from the aggregates before that point.
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::pool::WorkerId;

/// Counters collected over one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Files that were opened and read
    pub files_searched: usize,
    /// Files with at least one matching line
    pub files_with_pattern: usize,
    /// Matching lines across all files
    pub total_matches: usize,
}

/// Formats one result line as `{path}:{line_number}: {content}`
pub fn format_match(path: &Path, line_number: usize, content: &str) -> String {
    format!("{}:{}: {}", path.display(), line_number, content)
}

/// The formatted match lines produced by scanning one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatches {
    /// The path to the file
    pub path: PathBuf,
    /// Formatted match lines, in line order
    pub lines: Vec<String>,
}

impl FileMatches {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
        }
    }

    /// Appends a match found at `line_number` (1-based)
    pub fn push(&mut self, line_number: usize, content: &str) {
        let line = format_match(&self.path, line_number, content);
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Filenames processed by each worker, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerActivity {
    entries: HashMap<WorkerId, Vec<String>>,
}

impl WorkerActivity {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record(&mut self, worker: WorkerId, filename: String) {
        self.entries.entry(worker).or_default().push(filename);
    }

    pub fn files_for(&self, worker: WorkerId) -> Option<&[String]> {
        self.entries.get(&worker).map(Vec::as_slice)
    }

    /// Number of workers that processed at least one file
    pub fn worker_count(&self) -> usize {
        self.entries.len()
    }

    pub fn total_files(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Entries ordered by descending file count. Workers with equal counts
    /// keep ascending id order.
    pub fn sorted(&self) -> Vec<(WorkerId, &[String])> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(worker, files)| (*worker, files.as_slice()))
            .collect();
        entries.sort_by_key(|(worker, _)| *worker);
        entries.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        entries
    }
}

#[derive(Debug, Default)]
struct ScanState {
    stats: RunStats,
    results: Vec<FileMatches>,
    activity: WorkerActivity,
}

/// Handle to the aggregates of one scan, cloned into every scan task
#[derive(Debug, Clone, Default)]
pub struct SharedScanState {
    inner: Arc<Mutex<ScanState>>,
}

impl SharedScanState {
    pub fn new() -> Self {
        Default::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScanState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts one matching line. `first_in_file` is set for the first match
    /// of a file, which also counts the file as containing the pattern.
    pub fn record_match(&self, first_in_file: bool) {
        let mut state = self.lock();
        state.stats.total_matches += 1;
        if first_in_file {
            state.stats.files_with_pattern += 1;
        }
    }

    /// Records a fully read file: counts it as searched, logs it against the
    /// worker, and appends its (possibly empty) match list.
    pub fn complete_file(&self, worker: WorkerId, filename: String, matches: FileMatches) {
        let mut state = self.lock();
        state.stats.files_searched += 1;
        state.activity.record(worker, filename);
        state.results.push(matches);
    }

    pub fn stats(&self) -> RunStats {
        self.lock().stats
    }

    /// Moves the collected aggregates out, leaving this state empty.
    pub fn take_output(&self) -> ScanOutput {
        let state = std::mem::take(&mut *self.lock());
        ScanOutput {
            stats: state.stats,
            results: state.results,
            activity: state.activity,
            failed_tasks: 0,
        }
    }
}

/// The aggregates of a completed scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub stats: RunStats,
    /// Per-file match lists
    pub results: Vec<FileMatches>,
    pub activity: WorkerActivity,
    /// Scan tasks that failed instead of completing
    pub failed_tasks: usize,
}

impl ScanOutput {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sorts the per-file lists by descending match count. Files with equal
    /// counts are ordered by path, so completion order never leaks into the
    /// output.
    pub fn sort_results(&mut self) {
        self.results
            .sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.path.cmp(&b.path)));
    }

    /// Results file content: every match line of every file, one per line,
    /// files in the current order of `results`
    pub fn render_results(&self) -> String {
        let mut out = String::new();
        for line in self.results.iter().flat_map(|file| file.lines.iter()) {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Log file content: `{worker}: {file1}, {file2}, ...` per worker, busiest
    /// worker first
    pub fn render_activity(&self) -> String {
        let mut out = String::new();
        for (worker, files) in self.activity.sorted() {
            out.push_str(&format!("{}: {}\n", worker, files.join(", ")));
        }
        out
    }
}
