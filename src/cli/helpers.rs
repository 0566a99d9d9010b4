//! Terminal progress output shared by the CLI commands.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use shopscan::pipeline::{BatchStats, Progress};

/// How a command labels its per-batch summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSummary {
    /// Discovery: one group of pages, no per-batch line.
    Pages,
    /// Widget probing: reachable and detected counts.
    Widget,
    /// Locale probing: detected count.
    Locale,
}

/// Progress bar plus operator-facing lines.
pub struct ConsoleProgress {
    bar: ProgressBar,
    summary: BatchSummary,
}

impl ConsoleProgress {
    pub fn new(summary: BatchSummary) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar, summary }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Progress for ConsoleProgress {
    fn batch_started(&self, batch: usize, size: usize) {
        if self.summary != BatchSummary::Pages {
            self.bar.println(format!(
                "\n{} Processing batch {} ({} domains)",
                style("→").cyan(),
                batch,
                size
            ));
        }
        self.bar.set_length(size as u64);
        self.bar.set_position(0);
    }

    fn unit_finished(&self) {
        self.bar.inc(1);
    }

    fn message(&self, line: &str) {
        self.bar.println(format!("{} {}", style("✓").green(), line));
    }

    fn batch_finished(&self, batch: usize, stats: &BatchStats) {
        match self.summary {
            BatchSummary::Pages => {}
            BatchSummary::Widget => self.bar.println(format!(
                "Batch results: {} valid sites, {} with VerifyPass",
                stats.reachable, stats.detected
            )),
            BatchSummary::Locale => self.bar.println(format!(
                "Completed batch {}: {} Indian sites",
                batch, stats.detected
            )),
        }
    }
}
