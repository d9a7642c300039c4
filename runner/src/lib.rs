//! RateBridge Runner
//!
//! Single-shot job that fetches both quote sources, derives the complete rate
//! table and publishes it to the configured sink and report. At most one run
//! executes at a time, enforced by a lock file.

pub mod config;
pub mod fetcher;
pub mod job;
pub mod reporter;
pub mod run_lock;
pub mod sink;

pub use config::{ReportConfig, RunnerConfig, SinkTarget};
pub use fetcher::HttpTableFetcher;
pub use job::{run, run_with};
pub use run_lock::RunLock;
