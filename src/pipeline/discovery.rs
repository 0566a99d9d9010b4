//! Directory discovery: every listing page fetched concurrently, qualifying
//! domains written to the sink as each page completes.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{BatchStats, Progress, ScanError};
use crate::config::RunContext;
use crate::directory::{DiscoveredDomain, Directory};
use crate::http::{FetchFailure, Fetcher};
use crate::sink::{CsvSink, SinkError};

/// Domains found on one listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub page: u32,
    /// Qualifying domains in page order.
    pub domains: Vec<String>,
    /// Why the page yielded nothing, if it couldn't be fetched.
    pub failure: Option<FetchFailure>,
}

/// Totals for a discovery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub pages: u32,
    pub failed_pages: usize,
    pub domains: usize,
}

/// Check an explicit last-page value given by the operator.
pub fn validate_last_page(value: i64) -> Result<u32, ScanError> {
    if value < 0 {
        return Err(ScanError::InvalidArgument(
            "Last page cannot be less than 0".to_string(),
        ));
    }
    u32::try_from(value)
        .map_err(|_| ScanError::InvalidArgument(format!("Last page {} is too large", value)))
}

/// Use the override when given, otherwise read it off the directory.
pub async fn resolve_last_page(
    directory: &Directory,
    fetcher: &dyn Fetcher,
    last_page_override: Option<i64>,
) -> Result<u32, ScanError> {
    match last_page_override {
        Some(value) => validate_last_page(value),
        None => directory.resolve_last_page(fetcher).await,
    }
}

/// Fan-out over every page of one directory zone.
#[derive(Clone)]
pub struct DiscoveryPipeline {
    fetcher: Arc<dyn Fetcher>,
    directory: Arc<Directory>,
    sink: Arc<CsvSink>,
    run: Arc<RunContext>,
}

impl DiscoveryPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        directory: Directory,
        sink: Arc<CsvSink>,
        run: Arc<RunContext>,
    ) -> Self {
        Self {
            fetcher,
            directory: Arc::new(directory),
            sink,
            run,
        }
    }

    /// Scrape pages `1..=last_page`, all at once.
    ///
    /// Returns once every page task has finished. A sink failure is returned
    /// after the remaining pages settle.
    pub async fn run(
        &self,
        last_page: u32,
        progress: Arc<dyn Progress>,
    ) -> Result<DiscoveryReport, ScanError> {
        info!(
            zone = self.directory.zone(),
            last_page, "Scraping till page number {}", last_page
        );
        progress.batch_started(1, last_page as usize);

        let handles: Vec<_> = (1..=last_page)
            .map(|page| {
                let pipeline = self.clone();
                let progress = progress.clone();
                tokio::spawn(async move { pipeline.scrape_page(page, progress.as_ref()).await })
            })
            .collect();

        let mut report = DiscoveryReport {
            pages: last_page,
            ..Default::default()
        };
        let mut sink_error = None;

        for (page, joined) in (1..=last_page).zip(join_all(handles).await) {
            match joined {
                Ok(Ok(result)) => {
                    if result.failure.is_some() {
                        report.failed_pages += 1;
                    }
                    report.domains += result.domains.len();
                }
                Ok(Err(e)) => {
                    report.failed_pages += 1;
                    sink_error.get_or_insert(e);
                }
                Err(e) => {
                    warn!(page, "Page task failed: {}", e);
                    report.failed_pages += 1;
                }
            }
        }

        progress.batch_finished(
            1,
            &BatchStats {
                processed: last_page as usize,
                reachable: last_page as usize - report.failed_pages,
                detected: report.domains,
            },
        );

        match sink_error {
            Some(e) => Err(e.into()),
            None => Ok(report),
        }
    }

    /// Fetch one page, extract its domains and append them to the sink.
    async fn scrape_page(
        &self,
        page: u32,
        progress: &dyn Progress,
    ) -> Result<PageResult, SinkError> {
        let url = self.directory.page_url(page);

        let body = match self.fetcher.fetch(&url, None).await {
            Ok(body) => body,
            Err(failure) => {
                debug!(page, "Skipping page {}: {}", url, failure);
                progress.unit_finished();
                return Ok(PageResult {
                    page,
                    domains: Vec::new(),
                    failure: Some(failure),
                });
            }
        };

        let domains = self.directory.extract_domains(&body);
        if !domains.is_empty() {
            let timestamp = self.run.capture_time();
            let rows: Vec<DiscoveredDomain> = domains
                .iter()
                .map(|domain| DiscoveredDomain {
                    page,
                    domain: domain.clone(),
                    timestamp: timestamp.clone(),
                })
                .collect();
            self.sink.append_all(&rows).await?;
            progress.message(&format!("Page {}: Saved {} domains", page, domains.len()));
        }

        progress.unit_finished();
        Ok(PageResult {
            page,
            domains,
            failure: None,
        })
    }
}
