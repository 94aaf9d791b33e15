/// Column and label constants shared by the default configuration and the stages.

// Dataset published alongside the school-management coursework
pub const DEFAULT_SOURCE_URL: &str = "https://drive.google.com/uc?id=19bgbc4hU69jVNRTdXH3S1FfAuv-V8Efx";
pub const DEFAULT_OUTPUT_PATH: &str = "cleaned_student_data.csv";
pub const DEFAULT_CONFIG_PATH: &str = "cleaner.toml";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Columns of interest
pub const AGE_COLUMN: &str = "age";
pub const COURSE_COLUMN: &str = "course";
pub const ENROLLMENT_DATE_COLUMN: &str = "enrollment_date";
pub const IS_INTERN_COLUMN: &str = "is_intern";

pub const DEFAULT_MIN_AGE: i64 = 18;
pub const DEFAULT_MAX_AGE: i64 = 45;
pub const UNKNOWN_COURSE: &str = "Unknown";

// Canonical binary labels
pub const YES_LABEL: &str = "Yes";
pub const NO_LABEL: &str = "No";

pub const YES_SPELLINGS: [&str; 4] = ["yes", "y", "true", "1"];
pub const NO_SPELLINGS: [&str; 4] = ["no", "n", "false", "0"];

/// Cell contents read as missing when loading a CSV (exact match, no trimming).
pub const NULL_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Tried in order, so an ambiguous `01/02/2024` reads month-first. Formats
/// carrying a time of day keep only the date part.
pub const DEFAULT_DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

pub const PREVIEW_ROWS: usize = 5;

// Environment overrides
pub const ENV_INPUT: &str = "CLEANER_INPUT";
pub const ENV_OUTPUT: &str = "CLEANER_OUTPUT";

pub fn is_null_token(raw: &str) -> bool {
    NULL_TOKENS.contains(&raw)
}
