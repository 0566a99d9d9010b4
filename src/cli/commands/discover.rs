//! Directory discovery command.

use std::sync::Arc;

use console::style;

use shopscan::config::{RunContext, Settings};
use shopscan::directory::{DiscoveredDomain, Directory};
use shopscan::http::{resolve_user_agent, Fetcher, HttpClient};
use shopscan::pipeline::{resolve_last_page, DiscoveryPipeline, ScanError};
use shopscan::sink::CsvSink;

use crate::cli::helpers::{BatchSummary, ConsoleProgress};

/// Output file prefix for discovered domains.
const OUTPUT_PREFIX: &str = "shopify_domains";
const ZONE_LIST_URL: &str = "https://onshopify.com/domains";

/// Crawl every page of `zone` and write qualifying domains as they are found.
pub async fn cmd_discover(
    settings: &Settings,
    zone: &str,
    last_page: Option<i64>,
) -> anyhow::Result<()> {
    let run = Arc::new(RunContext::new(settings));
    let user_agent = resolve_user_agent(settings.user_agent.as_deref());
    let fetcher: Arc<dyn Fetcher> =
        Arc::new(HttpClient::new(&user_agent, settings.discovery_timeout)?);
    let directory = Directory::new(&settings.base_url, zone);

    println!("{} Scraping started for zone .{}", style("→").cyan(), zone);

    let last_page = match resolve_last_page(&directory, fetcher.as_ref(), last_page).await {
        Ok(page) => page,
        Err(e) => {
            // the error itself is reported by main
            if let Some(hint) = zone_hint(&e) {
                eprintln!("{} {}", style("!").yellow(), hint);
            }
            return Err(e.into());
        }
    };

    let path = run.output_path(OUTPUT_PREFIX);
    let sink = Arc::new(CsvSink::create::<DiscoveredDomain>(&path)?);

    println!("Scraping till page number {}", last_page);
    println!("Domains will be saved to: {}", path.display());

    let progress = Arc::new(ConsoleProgress::new(BatchSummary::Pages));
    let pipeline = DiscoveryPipeline::new(fetcher, directory, sink, run.clone());
    let result = pipeline.run(last_page, progress.clone()).await;
    progress.finish();
    let report = result?;

    println!();
    println!(
        "Total execution time: {:.2} seconds",
        run.elapsed().as_secs_f64()
    );
    println!("Total domains found: {}", style(report.domains).bold());
    if report.failed_pages > 0 {
        println!(
            "{} {} of {} pages could not be fetched",
            style("!").yellow(),
            report.failed_pages,
            report.pages
        );
    }

    Ok(())
}

/// Extra guidance printed alongside an unknown-zone error.
fn zone_hint(err: &ScanError) -> Option<String> {
    match err {
        ScanError::InvalidZone { .. } => {
            Some(format!("You can find valid zones at {}", ZONE_LIST_URL))
        }
        _ => None,
    }
}
