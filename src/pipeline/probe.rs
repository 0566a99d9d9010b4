//! Batched domain probing, generic over the signal being looked for.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use super::{BatchStats, Progress, ScanError};
use crate::config::RunContext;
use crate::http::{normalize_url, FetchFailure, Fetcher};
use crate::signals::{ResultsFile, SignalExtractor};
use crate::sink::{opt_field, CsvSink, SinkError};

/// Status recorded for a storefront that answered with a body.
const STATUS_OK: u16 = 200;

/// Outcome of probing one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult<S> {
    pub domain: String,
    pub reachable: bool,
    pub status: Option<u16>,
    pub signal: Option<S>,
    /// Whether the signal cleared the pipeline's threshold.
    pub detected: bool,
    pub error: Option<FetchFailure>,
}

impl<S> ProbeResult<S> {
    fn reachable(domain: String, signal: S, detected: bool) -> Self {
        Self {
            domain,
            reachable: true,
            status: Some(STATUS_OK),
            signal: Some(signal),
            detected,
            error: None,
        }
    }

    fn failed(domain: String, failure: FetchFailure) -> Self {
        Self {
            domain,
            reachable: false,
            status: failure.status(),
            signal: None,
            detected: false,
            error: Some(failure),
        }
    }
}

/// Row of the per-domain results file, in `ResultsFile::RESULTS_HEADER` order.
fn result_fields<S>(result: &ProbeResult<S>) -> Vec<String> {
    vec![
        result.domain.clone(),
        result.reachable.to_string(),
        opt_field(result.status),
        result.detected.to_string(),
        opt_field(result.error.as_ref()),
    ]
}

/// Knobs for a probing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Units dispatched together; the next batch waits for this one.
    pub batch_size: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Totals across all batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeReport {
    pub batches: usize,
    pub processed: usize,
    pub reachable: usize,
    pub detected: usize,
}

impl ProbeReport {
    fn absorb(&mut self, stats: &BatchStats) {
        self.batches += 1;
        self.processed += stats.processed;
        self.reachable += stats.reachable;
        self.detected += stats.detected;
    }
}

/// Probe domains in sequential batches with one [`SignalExtractor`].
///
/// Detections go to the detections sink as soon as each unit sees them. When
/// a results sink is attached, every unit (failures included) also gets a
/// row there; otherwise failed units leave no trace on disk.
pub struct ProbePipeline<E: SignalExtractor> {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<E>,
    detections: Arc<CsvSink>,
    results: Option<Arc<CsvSink>>,
    run: Arc<RunContext>,
    options: ProbeOptions,
}

impl<E: SignalExtractor> Clone for ProbePipeline<E> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            detections: self.detections.clone(),
            results: self.results.clone(),
            run: self.run.clone(),
            options: self.options,
        }
    }
}

impl<E: SignalExtractor> ProbePipeline<E> {
    /// Build a pipeline, creating the detections file with its header.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: E,
        detections_path: &Path,
        run: Arc<RunContext>,
        options: ProbeOptions,
    ) -> Result<Self, SinkError> {
        let detections = CsvSink::create::<E::Detection>(detections_path)?;
        Ok(Self::with_sink(fetcher, extractor, detections, run, options))
    }

    /// Build a pipeline over an already created detections sink.
    pub fn with_sink(
        fetcher: Arc<dyn Fetcher>,
        extractor: E,
        detections: CsvSink,
        run: Arc<RunContext>,
        options: ProbeOptions,
    ) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(extractor),
            detections: Arc::new(detections),
            results: None,
            run,
            options,
        }
    }

    pub fn detections_path(&self) -> &Path {
        self.detections.path()
    }

    pub fn results_path(&self) -> Option<&Path> {
        self.results.as_ref().map(|sink| sink.path())
    }

    /// Probe `domains` batch by batch.
    ///
    /// A sink failure ends the run once the batch it happened in settles.
    pub async fn run(
        &self,
        domains: &[String],
        progress: Arc<dyn Progress>,
    ) -> Result<ProbeReport, ScanError> {
        let batch_size = self.options.batch_size.max(1);
        let mut report = ProbeReport::default();

        for (index, batch) in domains.chunks(batch_size).enumerate() {
            let number = index + 1;
            progress.batch_started(number, batch.len());
            let stats = self.run_batch(batch, &progress).await?;
            progress.batch_finished(number, &stats);
            report.absorb(&stats);
        }

        Ok(report)
    }

    async fn run_batch(
        &self,
        batch: &[String],
        progress: &Arc<dyn Progress>,
    ) -> Result<BatchStats, ScanError> {
        let handles: Vec<_> = batch
            .iter()
            .map(|domain| {
                let pipeline = self.clone();
                let progress = progress.clone();
                let domain = domain.clone();
                tokio::spawn(async move { pipeline.probe(domain, progress.as_ref()).await })
            })
            .collect();

        let mut stats = BatchStats::default();
        let mut sink_error = None;

        for (domain, joined) in batch.iter().zip(join_all(handles).await) {
            stats.processed += 1;
            match joined {
                Ok(Ok(result)) => {
                    stats.reachable += result.reachable as usize;
                    stats.detected += result.detected as usize;
                }
                Ok(Err(e)) => {
                    sink_error.get_or_insert(e);
                }
                Err(e) => {
                    warn!(domain, "Probe task failed: {}", e);
                    let failed = ProbeResult::<E::Signal>::failed(
                        domain.clone(),
                        FetchFailure::OtherError(e.to_string()),
                    );
                    if let Err(e) = self.record_result(&failed).await {
                        sink_error.get_or_insert(e);
                    }
                }
            }
        }

        match sink_error {
            Some(e) => Err(e.into()),
            None => Ok(stats),
        }
    }

    /// Probe one domain: fetch, extract, record.
    async fn probe(
        &self,
        domain: String,
        progress: &dyn Progress,
    ) -> Result<ProbeResult<E::Signal>, SinkError> {
        let url = normalize_url(&domain);

        let result = match self.fetcher.fetch(&url, Some(self.options.timeout)).await {
            Ok(body) => {
                let signal = self.extractor.extract(&body);
                let detection =
                    self.extractor
                        .detection(&domain, STATUS_OK, &signal, self.run.capture_time());
                let detected = detection.is_some();
                if let Some(row) = detection {
                    self.detections.append(&row).await?;
                    progress.message(&self.extractor.describe(&domain, &signal));
                }
                ProbeResult::reachable(domain, signal, detected)
            }
            Err(failure) => {
                debug!(url, "Probe failed: {}", failure);
                ProbeResult::failed(domain, failure)
            }
        };

        self.record_result(&result).await?;
        progress.unit_finished();
        Ok(result)
    }

    async fn record_result(&self, result: &ProbeResult<E::Signal>) -> Result<(), SinkError> {
        match &self.results {
            Some(sink) => sink.append_row(result_fields(result)).await,
            None => Ok(()),
        }
    }
}

impl<E: ResultsFile> ProbePipeline<E> {
    /// Also record every unit's outcome to `path`.
    pub fn with_results_file(mut self, path: &Path) -> Result<Self, SinkError> {
        let results = CsvSink::with_header(path, E::RESULTS_HEADER)?;
        self.results = Some(Arc::new(results));
        Ok(self)
    }
}
