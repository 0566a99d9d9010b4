//! Loading candidate domains from an input CSV.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::http::normalize_url;

/// Header of the column holding candidate domains.
pub const DOMAIN_COLUMN: &str = "Domain";

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: &'static str },
}

/// Read the `Domain` column of `path`, in file order.
///
/// Other columns are ignored. Values are trimmed, blank cells skipped and
/// repeated domains dropped after their first occurrence. Two values are the
/// same domain when their normalized URLs match ignoring case.
pub fn load_domains(path: &Path) -> Result<Vec<String>, InputError> {
    let csv_err = |source| InputError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let column = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .position(|h| h.trim() == DOMAIN_COLUMN)
        .ok_or_else(|| InputError::MissingColumn {
            path: path.to_path_buf(),
            column: DOMAIN_COLUMN,
        })?;

    let mut seen = HashSet::new();
    let mut domains = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let domain = record.get(column).unwrap_or("").trim();
        if domain.is_empty() {
            continue;
        }
        if seen.insert(normalize_url(domain).to_ascii_lowercase()) {
            domains.push(domain.to_string());
        } else {
            debug!("Skipping duplicate domain {}", domain);
        }
    }

    Ok(domains)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_domain_column_by_header() {
        let file = write_csv("Page,Domain,Timestamp\n1,a.com,t\n2,b.com,t\n");
        let domains = load_domains(file.path()).unwrap();
        assert_eq!(domains, vec!["a.com", "b.com"]);
    }

    #[test]
    fn skips_blank_and_duplicate_domains() {
        let file = write_csv("Domain\na.com\n\n  \nb.com\na.com\n");
        let domains = load_domains(file.path()).unwrap();
        assert_eq!(domains, vec!["a.com", "b.com"]);
    }

    #[test]
    fn duplicates_match_on_normalized_url() {
        let file = write_csv("Domain\na.com\nhttps://a.com\nHTTPS://A.com\nhttp://a.com\n");
        let domains = load_domains(file.path()).unwrap();
        assert_eq!(domains, vec!["a.com", "http://a.com"]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let file = write_csv("Page,Host\n1,a.com\n");
        let err = load_domains(file.path()).unwrap_err();
        assert!(matches!(err, InputError::MissingColumn { .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_domains(Path::new("/nonexistent/domains.csv")).unwrap_err();
        assert!(matches!(err, InputError::Csv { .. }));
    }
}
