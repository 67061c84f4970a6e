//! Decides which walked entries become scan tasks.
//!
//! Only regular files with a non-zero size are scanned. Directories, symlinks
//! (links are not followed) and empty files never reach the pool. The output
//! files of the run are skipped as well, so a scan rooted above them does not
//! read back what an earlier scan wrote.
use ignore::DirEntry;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

use crate::errors::ScanResult;
use crate::report::OutputPaths;

/// Checks if metadata describes a regular file with content
pub fn is_scannable(metadata: &Metadata) -> bool {
    metadata.is_file() && metadata.len() > 0
}

/// Determines if a walked entry should be scanned
///
/// A failure to read the entry's metadata is returned to the caller, which
/// treats it as a failed walk.
pub fn should_scan_entry(entry: &DirEntry) -> ScanResult<bool> {
    if !entry.file_type().is_some_and(|ft| ft.is_file()) {
        return Ok(false);
    }
    Ok(is_scannable(&entry.metadata()?))
}

/// Name recorded in the worker activity log for a scanned file
pub fn activity_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Files the walk must never submit, compared by canonical path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedPaths {
    paths: Vec<PathBuf>,
}

impl ExcludedPaths {
    pub fn new() -> Self {
        Default::default()
    }

    /// Excludes both output files. Outputs that do not exist yet are
    /// resolved through their parent directory.
    pub fn from_outputs(outputs: &OutputPaths) -> Self {
        let paths = [&outputs.result_file, &outputs.log_file]
            .into_iter()
            .filter_map(|path| canonical_target(path))
            .collect();
        Self { paths }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Returns `true` if `path` names one of the excluded files
    pub fn contains(&self, path: &Path) -> bool {
        // Cheap name check first; canonicalizing costs a syscall per entry.
        let name = path.file_name();
        if !self.paths.iter().any(|excluded| excluded.file_name() == name) {
            return false;
        }
        fs::canonicalize(path)
            .map(|canonical| self.paths.contains(&canonical))
            .unwrap_or(false)
    }
}

fn canonical_target(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = fs::canonicalize(path) {
        return Some(canonical);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::canonicalize(parent).ok().map(|dir| dir.join(name))
}
