//! Storefront probing commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use console::style;

use shopscan::config::{RunContext, Settings};
use shopscan::http::{resolve_user_agent, Fetcher, HttpClient};
use shopscan::pipeline::{ProbeOptions, ProbePipeline, ProbeReport};
use shopscan::signals::{LocaleDetector, SignalExtractor, WidgetDetector};
use shopscan::sink::load_domains;

use crate::cli::helpers::{BatchSummary, ConsoleProgress};

const VERIFYPASS_PREFIX: &str = "verifypass_domains";
const RESULTS_PREFIX: &str = "domain_check_results";
const LOCALE_PREFIX: &str = "indian_shopify_domains";

/// Return the input path, or print usage and exit with status 1.
pub fn require_input(input: Option<PathBuf>, command: &str) -> PathBuf {
    match input {
        Some(path) => path,
        None => {
            eprintln!("Please provide the CSV file path as an argument");
            eprintln!("Usage: shopscan {} <INPUT_CSV>", command);
            std::process::exit(1);
        }
    }
}

/// Probe every domain for the VerifyPass widget.
pub async fn cmd_verify(settings: &Settings, input: &Path) -> anyhow::Result<()> {
    let run = Arc::new(RunContext::new(settings));
    let fetcher = build_fetcher(settings, settings.widget_timeout)?;

    let pipeline = ProbePipeline::new(
        fetcher,
        WidgetDetector::new(),
        &run.output_path(VERIFYPASS_PREFIX),
        run.clone(),
        probe_options(settings, settings.widget_timeout),
    )?
    .with_results_file(&run.output_path(RESULTS_PREFIX))?;

    println!(
        "VerifyPass domains will be saved to: {}",
        pipeline.detections_path().display()
    );
    let report = probe_all(&pipeline, input, BatchSummary::Widget).await?;

    println!();
    println!("{}", style("Final Summary:").bold());
    println!("Total domains processed: {}", report.processed);
    println!("Valid sites: {}", report.reachable);
    println!("Sites with VerifyPass: {}", report.detected);
    println!(
        "VerifyPass domains saved to: {}",
        pipeline.detections_path().display()
    );
    if let Some(path) = pipeline.results_path() {
        println!("Results saved to: {}", path.display());
    }
    Ok(())
}

/// Probe every domain for signs of an India-targeted storefront.
pub async fn cmd_locale(
    settings: &Settings,
    input: &Path,
    min_confidence: Option<u8>,
) -> anyhow::Result<()> {
    let run = Arc::new(RunContext::new(settings));
    let fetcher = build_fetcher(settings, settings.locale_timeout)?;
    let detector = match min_confidence {
        Some(min) => LocaleDetector::with_min_confidence(min),
        None => LocaleDetector::new(),
    };

    let pipeline = ProbePipeline::new(
        fetcher,
        detector,
        &run.output_path(LOCALE_PREFIX),
        run.clone(),
        probe_options(settings, settings.locale_timeout),
    )?;

    println!(
        "Indian domains will be saved to: {}",
        pipeline.detections_path().display()
    );
    let report = probe_all(&pipeline, input, BatchSummary::Locale).await?;

    println!();
    println!(
        "{} Processing complete! {} Indian sites out of {} domains",
        style("✓").green(),
        report.detected,
        report.processed
    );
    println!(
        "Check {} for results",
        pipeline.detections_path().display()
    );
    Ok(())
}

fn build_fetcher(settings: &Settings, timeout: Duration) -> anyhow::Result<Arc<dyn Fetcher>> {
    let user_agent = resolve_user_agent(settings.user_agent.as_deref());
    Ok(Arc::new(HttpClient::new(&user_agent, timeout)?))
}

fn probe_options(settings: &Settings, timeout: Duration) -> ProbeOptions {
    ProbeOptions {
        batch_size: settings.batch_size,
        timeout,
    }
}

async fn probe_all<E: SignalExtractor>(
    pipeline: &ProbePipeline<E>,
    input: &Path,
    summary: BatchSummary,
) -> anyhow::Result<ProbeReport> {
    println!("Loading domains from {}", input.display());
    let domains = load_domains(input)?;
    println!("Found {} domains to check", domains.len());

    let progress = Arc::new(ConsoleProgress::new(summary));
    let result = pipeline.run(&domains, progress.clone()).await;
    progress.finish();
    Ok(result?)
}
