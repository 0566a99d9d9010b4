//! Progress reporting hooks for pipeline runs.

/// Counts for one dispatch group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: usize,
    pub reachable: usize,
    pub detected: usize,
}

/// Observer notified as units of work start and finish.
///
/// Called concurrently from every unit, so implementations must be cheap and
/// thread-safe.
pub trait Progress: Send + Sync {
    /// A dispatch group of `size` units is about to start. `batch` is 1-based.
    fn batch_started(&self, _batch: usize, _size: usize) {}

    /// One unit finished, whatever its outcome.
    fn unit_finished(&self) {}

    /// A line worth showing the operator (a save, a detection).
    fn message(&self, _line: &str) {}

    /// Every unit of the group has returned.
    fn batch_finished(&self, _batch: usize, _stats: &BatchStats) {}
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Progress for Silent {}
