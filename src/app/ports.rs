use std::path::PathBuf;

use crate::error::Result;
use crate::table::RecordTable;

// Ingest-side ports
pub trait HttpClientPort {
    fn get(&self, url: &str) -> Result<HttpGetResult>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub content_length: u64,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// Output-side ports
pub trait TableSinkPort {
    fn write(&self, table: &RecordTable) -> Result<WriteSummary>;
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}
