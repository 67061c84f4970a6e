//! The scan coordinator.
//!
//! A scan runs through four phases:
//!
//! 1. **Enumerating**: the tree under the root is walked and one task per
//!    non-empty regular file is submitted to the [`ThreadPool`](crate::pool::ThreadPool).
//!    [`search`] leaves out the run's own output files.
//! 2. **Awaiting completion**: the coordinator blocks on every task handle.
//!    Handles are awaited in submission order, which says nothing about the
//!    order in which the tasks finish.
//! 3. **Finalizing**: the aggregates are sorted and written out, see
//!    [`crate::report`].
//! 4. **Done**.
//!
//! While tasks run, they share one [`SharedScanState`](crate::results::SharedScanState).
//! Every update takes its single lock for the duration of one increment or
//! append, so matches are never lost or counted twice. Nothing reads the
//! aggregates until every handle has resolved.
//!
//! ```rust,ignore
//! let pool = ThreadPool::new(4)?;
//! let mut output = find_files(Path::new("src"), "TODO", &pool)?;
//! let failures = finalize(&mut output, &config.output_paths());
//! ```
pub mod engine;
pub mod matcher;
pub mod processor;

pub use engine::{find_files, find_files_excluding, search};
pub use matcher::LiteralMatcher;
pub use processor::scan_file;
