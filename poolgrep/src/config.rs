use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{ScanError, ScanResult};
use crate::report::OutputPaths;

const DEFAULT_THREAD_COUNT: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(count) => count,
    None => panic!("default thread count must be non-zero"),
};

/// Configuration for one scan.
///
/// # Configuration Locations
///
/// Configuration is loaded from these locations, later ones overriding earlier:
/// 1. Global `$CONFIG_DIR/poolgrep/config.yaml`
/// 2. Local `.poolgrep.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// Command-line values are applied on top with [`ScanConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Literal text to search for
/// pattern: "TODO"
///
/// # Root directory to search in
/// root_path: "."
///
/// # Worker threads in the pool
/// thread_count: 4
///
/// # Output files; ".txt" / ".log" is appended when no extension is given
/// result_file: "poolgrep"
/// log_file: "poolgrep"
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Literal pattern searched for in every line
    #[serde(default)]
    pub pattern: String,

    /// Root directory to start the scan from
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Number of pool worker threads
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Where match lines are written
    #[serde(default = "default_result_file")]
    pub result_file: PathBuf,

    /// Where the per-worker activity log is written
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_thread_count() -> NonZeroUsize {
    DEFAULT_THREAD_COUNT
}

fn default_result_file() -> PathBuf {
    PathBuf::from("poolgrep.txt")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("poolgrep.log")
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            root_path: default_root_path(),
            thread_count: default_thread_count(),
            result_file: default_result_file(),
            log_file: default_log_file(),
            log_level: default_log_level(),
        }
    }
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub pattern: Option<String>,
    pub root_path: Option<PathBuf>,
    pub thread_count: Option<NonZeroUsize>,
    pub result_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl ScanConfig {
    /// Creates a configuration with defaults for everything but the pattern
    /// and root
    pub fn new(pattern: impl Into<String>, root_path: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            root_path: root_path.into(),
            ..Default::default()
        }
    }

    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("poolgrep/config.yaml")),
            Some(PathBuf::from(".poolgrep.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicitly requested file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        // CLI values take precedence over config file values
        if let Some(pattern) = cli.pattern {
            self.pattern = pattern;
        }
        if let Some(root_path) = cli.root_path {
            self.root_path = root_path;
        }
        if let Some(thread_count) = cli.thread_count {
            self.thread_count = thread_count;
        }
        if let Some(result_file) = cli.result_file {
            self.result_file = result_file;
        }
        if let Some(log_file) = cli.log_file {
            self.log_file = log_file;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Rejects a configuration that cannot be scanned
    pub fn validate(&self) -> ScanResult<()> {
        if self.pattern.is_empty() {
            return Err(ScanError::invalid_pattern("pattern must not be empty"));
        }
        if !self.root_path.is_dir() {
            return Err(ScanError::root_not_found(&self.root_path));
        }
        Ok(())
    }

    /// Result and log file paths, with default extensions applied
    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths {
            result_file: with_default_extension(&self.result_file, "txt"),
            log_file: with_default_extension(&self.log_file, "log"),
        }
    }
}

fn with_default_extension(path: &Path, extension: &str) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(extension)
    }
}
