//! The paginated storefront directory: listing URLs, pagination bound
//! resolution and domain extraction from listing pages.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::http::Fetcher;
use crate::pipeline::ScanError;
use crate::sink::Record;

/// Container class the directory renders around each listed domain.
static DOMAIN_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".col-lg-4.col-md-4.col-sm-12").unwrap());
static PAGINATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".pagination").unwrap());
static PAGINATION_ENTRY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());

/// One zone of the directory, e.g. every `.com` storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    base_url: String,
    zone: String,
}

impl Directory {
    pub fn new(base_url: &str, zone: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            zone: zone.to_string(),
        }
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Landing page of the zone, which carries the pagination control.
    pub fn landing_url(&self) -> String {
        format!("{}/{}/", self.base_url, self.zone)
    }

    /// `{base}/{zone}/{page}`
    pub fn page_url(&self, page: u32) -> String {
        format!("{}/{}/{}", self.base_url, self.zone, page)
    }

    /// Fetch the landing page and read the highest page number from its
    /// pagination control.
    pub async fn resolve_last_page(&self, fetcher: &dyn Fetcher) -> Result<u32, ScanError> {
        let url = self.landing_url();
        info!("Resolving last page from {}", url);

        let html = fetcher
            .fetch(&url, None)
            .await
            .map_err(|source| ScanError::LandingPage {
                url: url.clone(),
                source,
            })?;

        parse_last_page(&html, &self.zone)
    }

    /// Domains listed on one page whose text ends with `.{zone}`.
    pub fn extract_domains(&self, html: &str) -> Vec<String> {
        extract_domains(html, &self.zone)
    }
}

/// Read the last page number from a landing page.
///
/// Uses the last pagination entry; if that isn't a number (a "next" arrow,
/// say), the highest numbered entry wins.
pub fn parse_last_page(html: &str, zone: &str) -> Result<u32, ScanError> {
    let document = Html::parse_document(html);
    let control = document
        .select(&PAGINATION)
        .next()
        .ok_or_else(|| ScanError::InvalidZone {
            zone: zone.to_string(),
        })?;

    let numbers: Vec<Option<u32>> = control
        .select(&PAGINATION_ENTRY)
        .map(|li| li.text().collect::<String>().trim().parse().ok())
        .collect();

    match numbers.last() {
        Some(Some(last)) => Ok(*last),
        _ => numbers
            .into_iter()
            .flatten()
            .max()
            .ok_or_else(|| ScanError::Pagination {
                zone: zone.to_string(),
            }),
    }
}

/// Domains on a listing page whose trimmed text ends with exactly `.{zone}`.
pub fn extract_domains(html: &str, zone: &str) -> Vec<String> {
    let suffix = format!(".{}", zone);
    let document = Html::parse_document(html);

    let domains: Vec<String> = document
        .select(&DOMAIN_CELL)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .filter(|text| text.ends_with(&suffix))
        .collect();

    debug!("Extracted {} .{} domains", domains.len(), zone);
    domains
}

/// One qualifying domain found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDomain {
    pub page: u32,
    pub domain: String,
    pub timestamp: String,
}

impl Record for DiscoveredDomain {
    const HEADER: &'static [&'static str] = &["Page", "Domain", "Timestamp"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.page.to_string(),
            self.domain.clone(),
            self.timestamp.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(cells: &[&str]) -> String {
        let body: String = cells
            .iter()
            .map(|c| format!(r#"<div class="col-lg-4 col-md-4 col-sm-12"> {} </div>"#, c))
            .collect();
        format!(
            r#"<html><body><div class="row">{}<div class="col-lg-8">other.com</div></div></body></html>"#,
            body
        )
    }

    #[test]
    fn urls_are_built_from_base_and_zone() {
        let dir = Directory::new("https://onshopify.com/domain-zone/", "com");
        assert_eq!(dir.landing_url(), "https://onshopify.com/domain-zone/com/");
        assert_eq!(dir.page_url(7), "https://onshopify.com/domain-zone/com/7");
    }

    #[test]
    fn suffix_filter_is_exact() {
        let html = listing(&["shop.com", "shop.com.uk", "store.co", "Store.COM"]);
        assert_eq!(extract_domains(&html, "com"), vec!["shop.com"]);
    }

    #[test]
    fn only_marked_cells_are_considered() {
        let html = listing(&[]);
        assert!(extract_domains(&html, "com").is_empty());
    }

    #[test]
    fn cell_text_is_trimmed_across_children() {
        let html = r#"<div class="col-lg-4 col-md-4 col-sm-12">
            <a href="/store/1"><span>widget</span>shop.in</a>
        </div>"#;
        assert_eq!(extract_domains(html, "in"), vec!["widgetshop.in"]);
    }

    #[test]
    fn last_page_from_last_entry() {
        let html = r#"<ul class="pagination"><li>1</li><li>2</li><li> 3 </li></ul>"#;
        assert_eq!(parse_last_page(html, "com").unwrap(), 3);
    }

    #[test]
    fn non_numeric_last_entry_uses_highest_number() {
        let html = r#"<ul class="pagination"><li>1</li><li>12</li><li>&raquo;</li></ul>"#;
        assert_eq!(parse_last_page(html, "com").unwrap(), 12);
    }

    #[test]
    fn missing_pagination_is_invalid_zone() {
        let err = parse_last_page("<html><body>nothing</body></html>", "zz").unwrap_err();
        assert!(matches!(err, ScanError::InvalidZone { ref zone } if zone == "zz"));
    }

    #[test]
    fn pagination_without_numbers_is_an_error() {
        let html = r#"<ul class="pagination"><li>prev</li><li>next</li></ul>"#;
        let err = parse_last_page(html, "com").unwrap_err();
        assert!(matches!(err, ScanError::Pagination { .. }));
    }

    #[test]
    fn discovered_domain_row() {
        let row = DiscoveredDomain {
            page: 2,
            domain: "widgetshop.com".into(),
            timestamp: "2024-01-01 00:00:00".into(),
        };
        assert_eq!(
            row.fields(),
            vec!["2", "widgetshop.com", "2024-01-01 00:00:00"]
        );
    }
}
