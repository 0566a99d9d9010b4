//! VerifyPass verification widget detection.

use super::{ResultsFile, SignalExtractor};
use crate::sink::Record;

/// Lowercase markers of the VerifyPass integration: vendor domain, script
/// file, Shopify app class prefix and data attribute.
pub const VERIFYPASS_MARKERS: &[&str] = &[
    "verifypass.com",
    "verifypass.js",
    "verifypass-shopify",
    "data-verifypass",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidgetSignal {
    pub detected: bool,
}

/// Case-insensitive substring match against [`VERIFYPASS_MARKERS`].
#[derive(Debug, Clone, Default)]
pub struct WidgetDetector;

impl WidgetDetector {
    pub fn new() -> Self {
        Self
    }
}

impl SignalExtractor for WidgetDetector {
    type Signal = WidgetSignal;
    type Detection = WidgetDetection;

    fn extract(&self, body: &str) -> WidgetSignal {
        let body = body.to_lowercase();
        WidgetSignal {
            detected: VERIFYPASS_MARKERS.iter().any(|m| body.contains(m)),
        }
    }

    fn fires(&self, signal: &WidgetSignal) -> bool {
        signal.detected
    }

    fn detection(
        &self,
        domain: &str,
        status: u16,
        signal: &WidgetSignal,
        timestamp: String,
    ) -> Option<WidgetDetection> {
        signal.detected.then(|| WidgetDetection {
            domain: domain.to_string(),
            timestamp,
            status,
        })
    }

    fn describe(&self, domain: &str, _signal: &WidgetSignal) -> String {
        format!("VerifyPass detected: {}", domain)
    }
}

impl ResultsFile for WidgetDetector {
    const RESULTS_HEADER: &'static [&'static str] =
        &["Domain", "Valid", "Status", "VerifyPass", "Error"];
}

/// Row of the VerifyPass detections file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetDetection {
    pub domain: String,
    pub timestamp: String,
    pub status: u16,
}

impl Record for WidgetDetection {
    const HEADER: &'static [&'static str] = &["Domain", "Timestamp", "Status"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.domain.clone(),
            self.timestamp.clone(),
            self.status.to_string(),
        ]
    }
}
