//! Detection of Shopify storefronts that target India.
//!
//! Independent checks each contribute zero or more pieces of evidence. Named
//! indicators drive the confidence score; the digital wallet meta tag only
//! yields a shop identifier. A check that fails to parse its input is logged
//! at trace level and simply contributes nothing.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::trace;

use super::SignalExtractor;
use crate::sink::{opt_field, Record};

/// Country code the checks look for.
pub const TARGET_COUNTRY: &str = "IN";
/// Confidence contributed by each indicator.
pub const CONFIDENCE_PER_INDICATOR: u8 = 25;
/// Lowest confidence written to the detections file.
pub const DEFAULT_MIN_CONFIDENCE: u8 = 25;

const SHOP_PATH: &str = "/shop/";
const SHOP_OBJECT_MARKER: &str = "Shopify.shop";

/// Template fragments used by Indian postal address forms.
pub const ADDRESS_NEEDLES: &[&str] = &[
    "pin-code",
    "pincode",
    "postal-code-in",
    "india-zip",
    "india-post",
];

static STOREFRONT_LOCALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Shopify\.locale\s*=\s*["']([^"']+)["']"#).unwrap());

static SHOP_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Shopify\.shop\s*=\s*(\{[^}]+\})").unwrap());

static CURRENCY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#"currency:\s*["']INR["']"#).unwrap(),
        Regex::new(r#"defaultCurrency:\s*["']INR["']"#).unwrap(),
        Regex::new(r#"Shopify\.currency\.active\s*=\s*["']INR["']"#).unwrap(),
    ]
});

static META: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").unwrap());
static SCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());

/// A check that could not evaluate its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("malformed Shopify.shop object: {0}")]
    MalformedShopObject(String),
}

/// One piece of evidence produced by a check.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Evidence {
    Indicator(String),
    Country(&'static str),
    ShopId(String),
}

type CheckResult = Result<Vec<Evidence>, ExtractionError>;

/// Everything the locale checks found on one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleSignal {
    pub country_code: Option<String>,
    pub shop_id: Option<String>,
    /// Distinct indicator labels in check order.
    pub indicators: Vec<String>,
    pub confidence: u8,
}

impl LocaleSignal {
    fn absorb(&mut self, evidence: Evidence) {
        match evidence {
            Evidence::Indicator(label) => {
                if !self.indicators.contains(&label) {
                    self.indicators.push(label);
                }
            }
            Evidence::Country(code) => self.country_code = Some(code.to_string()),
            Evidence::ShopId(id) => self.shop_id = Some(id),
        }
    }
}

/// `min(100, 25 × indicators)`
pub fn confidence(indicator_count: usize) -> u8 {
    let score = indicator_count.saturating_mul(CONFIDENCE_PER_INDICATOR as usize);
    score.min(100) as u8
}

/// Rule set flagging India-targeted storefronts.
#[derive(Debug, Clone)]
pub struct LocaleDetector {
    min_confidence: u8,
}

impl Default for LocaleDetector {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl LocaleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_confidence(min_confidence: u8) -> Self {
        Self { min_confidence }
    }

    pub fn min_confidence(&self) -> u8 {
        self.min_confidence
    }
}

impl SignalExtractor for LocaleDetector {
    type Signal = LocaleSignal;
    type Detection = LocaleDetection;

    fn extract(&self, body: &str) -> LocaleSignal {
        let document = Html::parse_document(body);
        let lowered = body.to_lowercase();

        let checks: [(&str, CheckResult); 6] = [
            ("storefront locale", check_storefront_locale(body)),
            ("meta locale", check_meta_locale(&document)),
            ("digital wallet", check_shop_id(&document)),
            ("shop object", check_shop_object(&document)),
            ("currency", check_currency(body)),
            ("address format", check_address_format(&lowered)),
        ];

        let mut signal = LocaleSignal::default();
        for (name, result) in checks {
            match result {
                Ok(evidence) => evidence.into_iter().for_each(|e| signal.absorb(e)),
                Err(e) => trace!(check = name, "locale check skipped: {}", e),
            }
        }
        signal.confidence = confidence(signal.indicators.len());
        signal
    }

    fn fires(&self, signal: &LocaleSignal) -> bool {
        signal.confidence >= self.min_confidence && !signal.indicators.is_empty()
    }

    fn detection(
        &self,
        domain: &str,
        _status: u16,
        signal: &LocaleSignal,
        timestamp: String,
    ) -> Option<LocaleDetection> {
        if !self.fires(signal) {
            return None;
        }
        Some(LocaleDetection {
            domain: domain.to_string(),
            confidence: signal.confidence,
            indicators: signal.indicators.join(", "),
            country_code: signal.country_code.clone(),
            shop_id: signal.shop_id.clone(),
            timestamp,
        })
    }

    fn describe(&self, domain: &str, signal: &LocaleSignal) -> String {
        format!(
            "Indian site detected: {} (Shop ID: {}, Country: {})",
            domain,
            signal.shop_id.as_deref().unwrap_or("None"),
            signal.country_code.as_deref().unwrap_or("None"),
        )
    }
}

/// `Shopify.locale = "en-IN"` assigned in page scripts.
fn check_storefront_locale(body: &str) -> CheckResult {
    let Some(locale) = STOREFRONT_LOCALE.captures(body).and_then(|c| c.get(1)) else {
        return Ok(Vec::new());
    };
    if locale.as_str().to_uppercase().contains(TARGET_COUNTRY) {
        Ok(vec![
            Evidence::Country(TARGET_COUNTRY),
            Evidence::Indicator("Shopify locale: IN".to_string()),
        ])
    } else {
        Ok(Vec::new())
    }
}

/// `<meta property="og:locale" content="en_IN">`
fn check_meta_locale(document: &Html) -> CheckResult {
    let fired = document.select(&META).any(|meta| {
        let el = meta.value();
        el.attr("property") == Some("og:locale")
            && el
                .attr("content")
                .unwrap_or("")
                .to_uppercase()
                .contains(TARGET_COUNTRY)
    });

    if fired {
        Ok(vec![
            Evidence::Country(TARGET_COUNTRY),
            Evidence::Indicator("Meta locale: IN".to_string()),
        ])
    } else {
        Ok(Vec::new())
    }
}

/// Shop identifier from a `shopify-digital-wallet` meta tag whose content
/// holds a `/shop/{id}/...` path. The last matching tag wins.
fn check_shop_id(document: &Html) -> CheckResult {
    let shop_id = document
        .select(&META)
        .filter(|meta| meta.value().attr("name") == Some("shopify-digital-wallet"))
        .filter_map(|meta| meta.value().attr("content"))
        .filter(|content| content.contains(SHOP_PATH))
        .filter_map(|content| content.rsplit(SHOP_PATH).next())
        .map(|rest| rest.split('/').next().unwrap_or("").to_string())
        .last();

    Ok(shop_id.map(Evidence::ShopId).into_iter().collect())
}

/// `Shopify.shop = {...}` object literal whose `country_code` is IN.
fn check_shop_object(document: &Html) -> CheckResult {
    let mut malformed = None;

    for script in document.select(&SCRIPT) {
        let text: String = script.text().collect();
        if !text.contains(SHOP_OBJECT_MARKER) {
            continue;
        }
        let Some(object) = SHOP_OBJECT.captures(&text).and_then(|c| c.get(1)) else {
            continue;
        };

        match serde_json::from_str::<serde_json::Value>(object.as_str()) {
            Ok(shop) => {
                if shop.get("country_code").and_then(|v| v.as_str()) == Some(TARGET_COUNTRY) {
                    return Ok(vec![
                        Evidence::Country(TARGET_COUNTRY),
                        Evidence::Indicator("Shopify.shop country: IN".to_string()),
                    ]);
                }
            }
            Err(e) => {
                malformed.get_or_insert_with(|| ExtractionError::MalformedShopObject(e.to_string()));
            }
        }
    }

    match malformed {
        Some(err) => Err(err),
        None => Ok(Vec::new()),
    }
}

/// Store currency set to INR. The first matching pattern wins.
fn check_currency(body: &str) -> CheckResult {
    if CURRENCY_PATTERNS.iter().any(|p| p.is_match(body)) {
        Ok(vec![Evidence::Indicator("Currency: INR".to_string())])
    } else {
        Ok(Vec::new())
    }
}

/// Indian address form fragments; each one present is its own indicator.
fn check_address_format(lowered_body: &str) -> CheckResult {
    Ok(ADDRESS_NEEDLES
        .iter()
        .filter(|needle| lowered_body.contains(**needle))
        .map(|needle| Evidence::Indicator(format!("Indian address format: {}", needle)))
        .collect())
}

/// Row of the India storefront detections file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleDetection {
    pub domain: String,
    pub confidence: u8,
    pub indicators: String,
    pub country_code: Option<String>,
    pub shop_id: Option<String>,
    pub timestamp: String,
}

impl Record for LocaleDetection {
    const HEADER: &'static [&'static str] = &[
        "Domain",
        "Confidence",
        "Indicators",
        "Country_Code",
        "Shop_ID",
        "Timestamp",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.domain.clone(),
            self.confidence.to_string(),
            self.indicators.clone(),
            opt_field(self.country_code.as_deref()),
            opt_field(self.shop_id.as_deref()),
            self.timestamp.clone(),
        ]
    }
}
