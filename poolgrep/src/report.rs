//! Finalize phase: sort the aggregates of a finished scan and write them out.
//!
//! Both outputs fail softly. If the result file cannot be written the log
//! file is still attempted, and the other way round; every failure is
//! returned as an [`OutputFailure`] instead of aborting the run.
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::{ScanError, ScanResult};
use crate::results::{RunStats, ScanOutput};

/// Destination files for the finalize phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPaths {
    pub result_file: PathBuf,
    pub log_file: PathBuf,
}

/// Which output a failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Results,
    ActivityLog,
}

/// An output file that could not be written
#[derive(Debug, Serialize)]
pub struct OutputFailure {
    pub kind: OutputKind,
    #[serde(serialize_with = "serialize_display")]
    pub error: ScanError,
}

fn serialize_display<S: Serializer>(error: &ScanError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Read-only summary of a finished scan
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub stats: RunStats,
    pub result_path: PathBuf,
    pub log_path: PathBuf,
    pub thread_count: usize,
    pub elapsed: Duration,
    /// Scan tasks that failed instead of completing
    pub failed_tasks: usize,
    pub output_failures: Vec<OutputFailure>,
}

impl ScanReport {
    /// Returns `true` if both output files were written
    pub fn outputs_written(&self) -> bool {
        self.output_failures.is_empty()
    }

    pub fn to_json(&self) -> ScanResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Sorts `output` and writes the results file and the activity log.
///
/// Returns the outputs that could not be written; an empty list means both
/// files were written.
pub fn finalize(output: &mut ScanOutput, paths: &OutputPaths) -> Vec<OutputFailure> {
    output.sort_results();

    let mut failures = Vec::new();
    let writes = [
        (OutputKind::Results, &paths.result_file, output.render_results()),
        (OutputKind::ActivityLog, &paths.log_file, output.render_activity()),
    ];
    for (kind, path, contents) in writes {
        match write_output(path, &contents) {
            Ok(()) => debug!("Wrote {:?} to {}", kind, path.display()),
            Err(error) => {
                warn!("{}", error);
                failures.push(OutputFailure { kind, error });
            }
        }
    }

    info!(
        "Finalized scan: {} files searched, {} with pattern, {} matches",
        output.stats.files_searched, output.stats.files_with_pattern, output.stats.total_matches
    );
    failures
}

fn write_output(path: &Path, contents: &str) -> ScanResult<()> {
    fs::write(path, contents).map_err(|e| ScanError::output_write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::WorkerId;
    use crate::results::FileMatches;
    use tempfile::tempdir;

    fn sample_output() -> ScanOutput {
        let mut few = FileMatches::new("few.txt");
        few.push(2, "needle");
        let mut many = FileMatches::new("many.txt");
        many.push(1, "needle");
        many.push(5, "needle again");

        let mut output = ScanOutput::new();
        output.results = vec![FileMatches::new("none.txt"), few, many];
        output.activity.record(WorkerId::new(0), "none.txt".to_string());
        output.activity.record(WorkerId::new(1), "few.txt".to_string());
        output.activity.record(WorkerId::new(1), "many.txt".to_string());
        output
    }

    #[test]
    fn test_finalize_writes_sorted_outputs() {
        let dir = tempdir().unwrap();
        let paths = OutputPaths {
            result_file: dir.path().join("out.txt"),
            log_file: dir.path().join("out.log"),
        };

        let mut output = sample_output();
        let failures = finalize(&mut output, &paths);
        assert!(failures.is_empty());

        assert_eq!(
            fs::read_to_string(&paths.result_file).unwrap(),
            "many.txt:1: needle\nmany.txt:5: needle again\nfew.txt:2: needle\n"
        );
        assert_eq!(
            fs::read_to_string(&paths.log_file).unwrap(),
            "worker-1: few.txt, many.txt\nworker-0: none.txt\n"
        );
    }

    #[test]
    fn test_one_failed_output_does_not_block_the_other() {
        let dir = tempdir().unwrap();
        let paths = OutputPaths {
            result_file: dir.path().join("missing_dir").join("out.txt"),
            log_file: dir.path().join("out.log"),
        };

        let mut output = sample_output();
        let failures = finalize(&mut output, &paths);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, OutputKind::Results);
        assert!(matches!(failures[0].error, ScanError::OutputWrite { .. }));
        assert!(paths.log_file.exists());
    }

    #[test]
    fn test_empty_output_writes_empty_files() {
        let dir = tempdir().unwrap();
        let paths = OutputPaths {
            result_file: dir.path().join("out.txt"),
            log_file: dir.path().join("out.log"),
        };

        let failures = finalize(&mut ScanOutput::new(), &paths);
        assert!(failures.is_empty());
        assert_eq!(fs::read_to_string(&paths.result_file).unwrap(), "");
        assert_eq!(fs::read_to_string(&paths.log_file).unwrap(), "");
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = ScanReport {
            stats: RunStats {
                files_searched: 2,
                files_with_pattern: 1,
                total_matches: 2,
            },
            result_path: PathBuf::from("r.txt"),
            log_path: PathBuf::from("r.log"),
            thread_count: 2,
            elapsed: Duration::from_millis(5),
            failed_tasks: 0,
            output_failures: vec![OutputFailure {
                kind: OutputKind::ActivityLog,
                error: ScanError::output_write(
                    "r.log",
                    std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                ),
            }],
        };

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["stats"]["total_matches"], 2);
        assert_eq!(json["output_failures"][0]["kind"], "activity_log");
        assert!(json["output_failures"][0]["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to write r.log"));
        assert!(!report.outputs_written());
    }
}
