use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

use crate::app::ports::HttpClientPort;
use crate::error::{CleanerError, Result};
use crate::infra::csv_codec;
use crate::metrics::MetricName;
use crate::table::RecordTable;

/// Where the raw CSV comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    Path(PathBuf),
}

impl Source {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Source::Url(raw.to_string())
        } else {
            Source::Path(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: RecordTable,
    pub byte_len: usize,
    /// Hex SHA-256 of the raw bytes as fetched
    pub sha256: String,
}

pub struct Loader {
    http: Box<dyn HttpClientPort>,
}

impl Loader {
    pub fn new(http: Box<dyn HttpClientPort>) -> Self {
        Self { http }
    }

    fn fetch(&self, source: &Source) -> Result<Vec<u8>> {
        match source {
            Source::Url(url) => {
                let resp = self.http.get(url)?;
                if !resp.is_success() {
                    return Err(CleanerError::HttpStatus { url: url.clone(), status: resp.status });
                }
                debug!("Fetched {} bytes ({})", resp.content_length, resp.content_type);
                Ok(resp.bytes)
            }
            Source::Path(path) => Ok(fs::read(path)?),
        }
    }

    /// Read the CSV and check that every column in `required` is present.
    #[instrument(skip(self, source, required), fields(source = %source))]
    pub fn load(&self, source: &Source, required: &[String]) -> Result<LoadedTable> {
        let bytes = self.fetch(source)?;
        let sha256 = hex::encode(Sha256::digest(&bytes));
        let table = csv_codec::read_table(bytes.as_slice(), &source.to_string())?;

        for column in required {
            table.require_column(column)?;
        }

        let (rows, cols) = table.shape();
        info!("Dataset loaded: {} rows x {} columns", rows, cols);
        metrics::counter!(MetricName::RowsLoaded.as_str()).increment(rows as u64);
        metrics::counter!(MetricName::SourceBytes.as_str()).increment(bytes.len() as u64);

        Ok(LoadedTable { table, byte_len: bytes.len(), sha256 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::HttpGetResult;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct FixedHttp {
        status: u16,
        body: &'static str,
    }

    impl HttpClientPort for FixedHttp {
        fn get(&self, _url: &str) -> Result<HttpGetResult> {
            Ok(HttpGetResult {
                status: self.status,
                bytes: self.body.as_bytes().to_vec(),
                content_type: "text/csv".to_string(),
                content_length: self.body.len() as u64,
            })
        }
    }

    fn loader(status: u16, body: &'static str) -> Loader {
        Loader::new(Box::new(FixedHttp { status, body }))
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(Source::parse("https://example.com/a.csv"), Source::Url("https://example.com/a.csv".into()));
        assert_eq!(Source::parse("HTTP://example.com"), Source::Url("HTTP://example.com".into()));
        assert_eq!(Source::parse(" data/a.csv "), Source::Path(PathBuf::from("data/a.csv")));
    }

    #[test]
    fn test_load_from_url() {
        let loaded = loader(200, "age,course\n20,math\n")
            .load(&Source::parse("https://example.com/s.csv"), &["age".to_string()])
            .unwrap();
        assert_eq!(loaded.table.shape(), (1, 2));
        assert_eq!(loaded.byte_len, 19);
        assert_eq!(loaded.sha256.len(), 64);
    }

    #[test]
    fn test_http_error_status_is_terminal() {
        let err = loader(404, "not found")
            .load(&Source::parse("https://example.com/missing.csv"), &[])
            .unwrap_err();
        assert!(matches!(err, CleanerError::HttpStatus { status: 404, .. }));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "age,is_intern\n19,yes\n40,no\n").unwrap();
        let source = Source::Path(file.path().to_path_buf());
        let loaded = loader(500, "").load(&source, &[]).unwrap();
        assert_eq!(loaded.table.len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = Source::Path(PathBuf::from("/definitely/not/here.csv"));
        assert!(matches!(loader(200, "").load(&source, &[]), Err(CleanerError::Io(_))));
    }

    #[test]
    fn test_required_columns_checked() {
        let err = loader(200, "age\n20\n")
            .load(&Source::parse("https://example.com/s.csv"), &["age".into(), "course".into()])
            .unwrap_err();
        assert!(matches!(err, CleanerError::MissingColumn(c) if c == "course"));
    }
}
