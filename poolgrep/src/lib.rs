pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod pool;
pub mod report;
pub mod results;
pub mod search;

pub use config::ScanConfig;
pub use errors::{PoolError, ScanError, ScanResult};
pub use pool::{PoolState, TaskHandle, ThreadPool, WorkerId};
pub use report::{finalize, OutputPaths, ScanReport};
pub use results::{FileMatches, RunStats, ScanOutput, WorkerActivity};
pub use filters::ExcludedPaths;
pub use search::{find_files, find_files_excluding, search};
