//! End-to-end runs of the pipelines against a local HTTP server.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shopscan::config::{RunContext, Settings};
use shopscan::directory::{DiscoveredDomain, Directory};
use shopscan::http::{Fetcher, HttpClient, BROWSER_USER_AGENT};
use shopscan::pipeline::{
    resolve_last_page, DiscoveryPipeline, ProbeOptions, ProbePipeline, ScanError, Silent,
};
use shopscan::signals::{LocaleDetector, WidgetDetector};
use shopscan::sink::{load_domains, CsvSink};

fn run_context(dir: &Path) -> Arc<RunContext> {
    let settings = Settings {
        output_dir: dir.to_path_buf(),
        ..Default::default()
    };
    Arc::new(RunContext::with_timestamp(&settings, "20240101_000000".into()))
}

fn client(timeout: Duration) -> Arc<dyn Fetcher> {
    Arc::new(HttpClient::new(BROWSER_USER_AGENT, timeout).unwrap())
}

fn listing(domains: &[&str]) -> String {
    let cells: String = domains
        .iter()
        .map(|d| format!(r#"<div class="col-lg-4 col-md-4 col-sm-12"><a>{}</a></div>"#, d))
        .collect();
    format!("<html><body><div class=\"row\">{}</div></body></html>", cells)
}

fn data_lines(path: &Path) -> Vec<String> {
    let contents = std::fs::read_to_string(path).unwrap();
    let mut lines: Vec<String> = contents.lines().skip(1).map(str::to_string).collect();
    lines.sort();
    lines
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn discovery_writes_only_qualifying_domains() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/domain-zone/com/",
        r#"<ul class="pagination"><li>1</li><li>2</li><li>3</li></ul>"#.to_string(),
    )
    .await;
    mount_page(&server, "/domain-zone/com/1", listing(&[])).await;
    mount_page(
        &server,
        "/domain-zone/com/2",
        listing(&["widgetshop.com", "widgetshop.com.au", "other.net"]),
    )
    .await;
    // Page 3 is left unmounted and answers 404.

    let dir = tempfile::tempdir().unwrap();
    let run = run_context(dir.path());
    let fetcher = client(Duration::from_secs(5));
    let directory = Directory::new(&format!("{}/domain-zone", server.uri()), "com");

    let last_page = resolve_last_page(&directory, fetcher.as_ref(), None)
        .await
        .unwrap();
    assert_eq!(last_page, 3);

    let sink_path = run.output_path("shopify_domains");
    let sink = Arc::new(CsvSink::create::<DiscoveredDomain>(&sink_path).unwrap());
    let report = DiscoveryPipeline::new(fetcher, directory, sink, run)
        .run(last_page, Arc::new(Silent))
        .await
        .unwrap();

    assert_eq!(report.domains, 1);
    assert_eq!(report.failed_pages, 1);

    let contents = std::fs::read_to_string(&sink_path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("Page,Domain,Timestamp"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("2,widgetshop.com,"), "row: {}", row);
    assert_eq!(lines.next(), None);
}

#[tokio::test]
async fn discovery_rejects_zone_without_pagination() {
    let server = MockServer::start().await;
    mount_page(&server, "/domain-zone/zz/", "<html><body></body></html>".into()).await;

    let directory = Directory::new(&format!("{}/domain-zone", server.uri()), "zz");
    let err = resolve_last_page(&directory, client(Duration::from_secs(5)).as_ref(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidZone { .. }));
}

#[tokio::test]
async fn widget_probe_records_detections_and_timeouts() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/widget",
        r#"<script src="https://cdn.verifypass.com/verifypass.js"></script>"#.into(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let widget = format!("{}/widget", server.uri());
    let slow = format!("{}/slow", server.uri());
    let missing = format!("{}/missing", server.uri());

    let dir = tempfile::tempdir().unwrap();
    let run = run_context(dir.path());
    let options = ProbeOptions {
        batch_size: 2,
        timeout: Duration::from_millis(300),
    };
    let pipeline = ProbePipeline::new(
        client(Duration::from_secs(5)),
        WidgetDetector::new(),
        &run.output_path("verifypass_domains"),
        run.clone(),
        options,
    )
    .unwrap()
    .with_results_file(&run.output_path("domain_check_results"))
    .unwrap();

    let domains = vec![widget.clone(), slow.clone(), missing.clone()];
    let report = pipeline.run(&domains, Arc::new(Silent)).await.unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(report.processed, 3);
    assert_eq!(report.reachable, 1);
    assert_eq!(report.detected, 1);

    let detections = data_lines(pipeline.detections_path());
    assert_eq!(detections.len(), 1);
    assert!(detections[0].starts_with(&format!("{},", widget)));
    assert!(detections[0].ends_with(",200"));

    let results = data_lines(pipeline.results_path().unwrap());
    let mut expected = vec![
        format!("{},false,404,false,Invalid status code: 404", missing),
        format!("{},false,,false,Timeout", slow),
        format!("{},true,200,true,", widget),
    ];
    expected.sort();
    assert_eq!(results, expected);
}

#[tokio::test]
async fn locale_probe_reads_domains_from_csv() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/in",
        r#"<html><head><meta property="og:locale" content="en_IN"></head>
        <body><script>Shopify.currency.active = "INR";</script></body></html>"#
            .into(),
    )
    .await;
    mount_page(&server, "/us", "<html><body>$10.00</body></html>".into()).await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("domains.csv");
    let india = format!("{}/in", server.uri());
    let us = format!("{}/us", server.uri());
    std::fs::write(
        &input,
        format!("Page,Domain,Timestamp\n1,{},x\n1,{},x\n2,{},x\n", india, us, india),
    )
    .unwrap();

    let domains = load_domains(&input).unwrap();
    assert_eq!(domains, vec![india.clone(), us]);

    let run = run_context(dir.path());
    let pipeline = ProbePipeline::new(
        client(Duration::from_secs(5)),
        LocaleDetector::new(),
        &run.output_path("indian_shopify_domains"),
        run.clone(),
        ProbeOptions {
            batch_size: 50,
            timeout: Duration::from_secs(5),
        },
    )
    .unwrap();

    let report = pipeline.run(&domains, Arc::new(Silent)).await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.detected, 1);

    let rows = data_lines(pipeline.detections_path());
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with(&format!("{},50,", india)));
}
