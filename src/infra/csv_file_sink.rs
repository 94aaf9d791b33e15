use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::app::ports::{TableSinkPort, WriteSummary};
use crate::error::Result;
use crate::infra::csv_codec;
use crate::table::RecordTable;

/// Writes the table as CSV to `path`, going through a sibling temp file so a
/// failed write never leaves a truncated output behind.
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output.csv".to_string());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    fn write_to(&self, tmp: &Path, table: &RecordTable) -> Result<()> {
        let file = File::create(tmp)?;
        csv_codec::write_table(BufWriter::new(file), table)?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

impl TableSinkPort for CsvFileSink {
    fn write(&self, table: &RecordTable) -> Result<WriteSummary> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        if let Err(e) = self.write_to(&tmp, table) {
            if tmp.exists() {
                if let Err(cleanup) = fs::remove_file(&tmp) {
                    warn!("Could not remove temp file {}: {}", tmp.display(), cleanup);
                }
            }
            return Err(e);
        }

        let bytes = fs::metadata(&self.path)?.len();
        info!("Wrote {} rows ({} bytes) to {}", table.len(), bytes, self.path.display());
        Ok(WriteSummary { path: self.path.clone(), rows: table.len(), bytes })
    }
}
