use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace, warn};

use super::matcher::LiteralMatcher;
use crate::filters::activity_name;
use crate::pool::WorkerId;
use crate::results::{FileMatches, SharedScanState};

const BUFFER_CAPACITY: usize = 65536;

/// Scans one file on behalf of `worker` and records the outcome in `state`.
///
/// Returns the number of matching lines, or `None` if the file could not be
/// opened. An unopenable file is skipped silently: it is not counted as
/// searched and does not appear in the activity log.
///
/// Lines are split on `\n` and numbered from 1. Each match bumps the shared
/// counters right away; the file's match list, the searched counter and the
/// activity entry are recorded together once the whole file has been read.
/// The shared lock is never held while reading.
pub fn scan_file(
    path: &Path,
    matcher: &LiteralMatcher,
    state: &SharedScanState,
    worker: WorkerId,
) -> Option<usize> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Skipping {}: {}", path.display(), e);
            return None;
        }
    };

    let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
    let mut matches = FileMatches::new(path);
    let mut line_buffer = Vec::with_capacity(256);
    let mut line_number = 0;

    loop {
        line_buffer.clear();
        match reader.read_until(b'\n', &mut line_buffer) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(
                    "Read error in {} after line {}: {}",
                    path.display(),
                    line_number,
                    e
                );
                break;
            }
        }
        line_number += 1;

        let line = line_buffer.strip_suffix(b"\n").unwrap_or(&line_buffer[..]);
        if matcher.is_match(line) {
            let content = String::from_utf8_lossy(line);
            trace!("Found match at line {}: {}", line_number, content);
            matches.push(line_number, &content);
            state.record_match(matches.len() == 1);
        }
    }

    let match_count = matches.len();
    debug!(
        "{} found {} matches in file {}",
        worker,
        match_count,
        path.display()
    );
    state.complete_file(worker, activity_name(path), matches);
    Some(match_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::RunStats;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_file_records_matches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "foo\nbar\nfoo\n").unwrap();

        let matcher = LiteralMatcher::new("foo").unwrap();
        let state = SharedScanState::new();
        let worker = WorkerId::new(0);

        assert_eq!(scan_file(&path, &matcher, &state, worker), Some(2));

        let output = state.take_output();
        assert_eq!(
            output.stats,
            RunStats {
                files_searched: 1,
                files_with_pattern: 1,
                total_matches: 2,
            }
        );
        let expected = vec![
            format!("{}:1: foo", path.display()),
            format!("{}:3: foo", path.display()),
        ];
        assert_eq!(output.results[0].lines, expected);
        assert_eq!(
            output.activity.files_for(worker),
            Some(&["a.txt".to_string()][..])
        );
    }

    #[test]
    fn test_scan_file_without_matches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.txt");
        fs::write(&path, "baz\n").unwrap();

        let matcher = LiteralMatcher::new("foo").unwrap();
        let state = SharedScanState::new();

        assert_eq!(scan_file(&path, &matcher, &state, WorkerId::new(1)), Some(0));

        let output = state.take_output();
        assert_eq!(output.stats.files_searched, 1);
        assert_eq!(output.stats.files_with_pattern, 0);
        assert_eq!(output.stats.total_matches, 0);
        assert_eq!(output.results.len(), 1);
        assert!(output.results[0].is_empty());
    }

    #[test]
    fn test_unopenable_file_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");

        let matcher = LiteralMatcher::new("foo").unwrap();
        let state = SharedScanState::new();

        assert_eq!(scan_file(&path, &matcher, &state, WorkerId::new(0)), None);

        let output = state.take_output();
        assert_eq!(output.stats, RunStats::default());
        assert!(output.results.is_empty());
        assert_eq!(output.activity.worker_count(), 0);
    }

    #[test]
    fn test_last_line_without_newline_and_crlf() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(&path, "skip\r\nfoo one\r\nno\nlast foo").unwrap();

        let matcher = LiteralMatcher::new("foo").unwrap();
        let state = SharedScanState::new();
        scan_file(&path, &matcher, &state, WorkerId::new(0));

        let output = state.take_output();
        let expected = vec![
            format!("{}:2: foo one\r", path.display()),
            format!("{}:4: last foo", path.display()),
        ];
        assert_eq!(output.results[0].lines, expected);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bin.dat");
        fs::write(&path, b"\xffpattern\n").unwrap();

        let matcher = LiteralMatcher::new("pattern").unwrap();
        let state = SharedScanState::new();
        assert_eq!(scan_file(&path, &matcher, &state, WorkerId::new(0)), Some(1));

        let output = state.take_output();
        assert!(output.results[0].lines[0].ends_with(":1: \u{FFFD}pattern"));
    }
}
