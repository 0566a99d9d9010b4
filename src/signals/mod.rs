//! Signal extraction from storefront markup.
//!
//! Each probing pipeline is parameterized by one [`SignalExtractor`]: it
//! turns a response body into a signal, decides whether that signal clears
//! the pipeline's threshold and, if so, shapes the detection row written to
//! the sink.

pub mod locale;
pub mod widget;

pub use locale::{LocaleDetection, LocaleDetector, LocaleSignal};
pub use widget::{WidgetDetection, WidgetDetector, WidgetSignal};

use crate::sink::Record;

/// Pluggable rule set applied to each reachable storefront.
pub trait SignalExtractor: Send + Sync + 'static {
    /// What the rules computed for one body.
    type Signal: Clone + Send + Sync + 'static;
    /// Row written to the detections sink.
    type Detection: Record + Send + Sync + 'static;

    /// Evaluate the rules against a response body. Pure and deterministic.
    fn extract(&self, body: &str) -> Self::Signal;

    /// Whether the signal counts as a detection.
    fn fires(&self, signal: &Self::Signal) -> bool;

    /// Detection row for a domain whose signal fired, None otherwise.
    fn detection(
        &self,
        domain: &str,
        status: u16,
        signal: &Self::Signal,
        timestamp: String,
    ) -> Option<Self::Detection>;

    /// Operator-facing line announcing a detection.
    fn describe(&self, domain: &str, signal: &Self::Signal) -> String;
}

/// Extractors whose pipeline also keeps a per-domain results file.
pub trait ResultsFile: SignalExtractor {
    /// Domain, reachability, status, the detected flag and the error.
    const RESULTS_HEADER: &'static [&'static str];
}
