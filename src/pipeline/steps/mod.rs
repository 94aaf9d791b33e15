use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::table::RecordTable;

pub mod binary_values;
pub mod missing_values;
pub mod range_filter;
pub mod text_normalize;
pub mod type_standardize;

pub use binary_values::BinaryValuesStep;
pub use missing_values::MissingValuesStep;
pub use range_filter::RangeFilterStep;
pub use text_normalize::TextNormalizeStep;
pub use type_standardize::TypeStandardizeStep;

/// Common trait for the in-memory cleaning stages.
pub trait CleaningStep {
    /// Apply this stage to the table. On `Err` the table must be left as it was
    /// before the call.
    fn execute(&self, table: &mut RecordTable) -> Result<StepResult>;

    fn step_name(&self) -> &'static str;
}

/// Result of executing a cleaning stage
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step: &'static str,
    /// Rows the stage looked at
    pub processed_count: usize,
    /// Cells rewritten, or rows removed for filtering stages
    pub changed_count: usize,
    pub message: String,
    pub metadata: BTreeMap<String, String>,
}

impl StepResult {
    pub fn new(step: &'static str, processed: usize, changed: usize, message: String) -> Self {
        Self {
            step,
            processed_count: processed,
            changed_count: changed,
            message,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}
