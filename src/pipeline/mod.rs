//! Crawl-and-probe pipelines.
//!
//! Discovery fans out one task per directory page. Probing dispatches fixed
//! size batches of domains, each batch fully settled (and its rows on disk)
//! before the next begins. In both, a failed unit is recorded as data and
//! never cancels its siblings.

mod discovery;
mod error;
mod probe;
mod progress;

#[cfg(test)]
pub(crate) mod testing;

pub use discovery::{
    resolve_last_page, validate_last_page, DiscoveryPipeline, DiscoveryReport, PageResult,
};
pub use error::ScanError;
pub use probe::{ProbeOptions, ProbePipeline, ProbeReport, ProbeResult};
pub use progress::{BatchStats, Progress, Silent};
