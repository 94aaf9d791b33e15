use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants;
use crate::error::{CleanerError, Result};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub fill: Vec<FillRule>,
    pub types: TypesConfig,
    pub text: TextConfig,
    pub filter: FilterConfig,
    pub binary: BinaryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Local path, or an `http(s)://` URL
    pub input: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Where to write the JSON run report, if anywhere
    pub report: Option<PathBuf>,
}

/// How a configured column's nulls are replaced.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FillRule {
    pub column: String,
    #[serde(flatten)]
    pub strategy: FillStrategy,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FillStrategy {
    Median,
    Mode,
    Constant { value: String },
}

/// What the driver does after a type coercion failure. The stage itself never
/// applies a partial conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionPolicy {
    /// Stop the pipeline with the coercion error
    #[default]
    Abort,
    /// Warn and continue with the columns left unconverted
    KeepUnconverted,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TypesConfig {
    pub integer_columns: Vec<String>,
    pub date_columns: Vec<String>,
    pub date_formats: Vec<String>,
    pub on_error: CoercionPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TextConfig {
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    pub column: String,
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BinaryConfig {
    pub columns: Vec<String>,
}

/// Values given as command-line flags. `None` leaves the configured value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub input: Option<String>,
    pub output: Option<PathBuf>,
    pub min_age: Option<i64>,
    pub max_age: Option<i64>,
    pub report: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            input: constants::DEFAULT_SOURCE_URL.to_string(),
            timeout_seconds: constants::DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::DEFAULT_OUTPUT_PATH),
            report: None,
        }
    }
}

impl FillRule {
    pub fn new(column: &str, strategy: FillStrategy) -> Self {
        Self { column: column.to_string(), strategy }
    }

    pub fn default_rules() -> Vec<FillRule> {
        vec![
            FillRule::new(constants::AGE_COLUMN, FillStrategy::Median),
            FillRule::new(
                constants::COURSE_COLUMN,
                FillStrategy::Constant { value: constants::UNKNOWN_COURSE.to_string() },
            ),
            FillRule::new(constants::ENROLLMENT_DATE_COLUMN, FillStrategy::Mode),
            FillRule::new(
                constants::IS_INTERN_COLUMN,
                FillStrategy::Constant { value: constants::NO_LABEL.to_string() },
            ),
        ]
    }
}

impl Default for TypesConfig {
    fn default() -> Self {
        Self {
            integer_columns: vec![constants::AGE_COLUMN.to_string()],
            date_columns: vec![constants::ENROLLMENT_DATE_COLUMN.to_string()],
            date_formats: constants::DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            on_error: CoercionPolicy::Abort,
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { columns: vec![constants::COURSE_COLUMN.to_string()] }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            column: constants::AGE_COLUMN.to_string(),
            min: constants::DEFAULT_MIN_AGE,
            max: constants::DEFAULT_MAX_AGE,
        }
    }
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self { columns: vec![constants::IS_INTERN_COLUMN.to_string()] }
    }
}

impl Config {
    /// Built-in defaults with the standard fill rules.
    pub fn standard() -> Self {
        Self { fill: FillRule::default_rules(), ..Self::default() }
    }

    /// Load from `path`, or from `cleaner.toml` when present, else the built-in
    /// defaults. Environment overrides are applied afterwards. The result is not
    /// validated; call [`Config::validate`] once command-line overrides are in.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(constants::DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(constants::DEFAULT_CONFIG_PATH))?
            }
            None => {
                debug!("No config file found, using built-in defaults");
                Self::standard()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CleanerError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// An omitted `[[fill]]` table means the standard rules; an explicit empty
    /// list is not expressible in TOML arrays of tables.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        if config.fill.is_empty() {
            config.fill = FillRule::default_rules();
        }
        Ok(config)
    }

    /// `CLEANER_INPUT` / `CLEANER_OUTPUT` through `lookup`. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(input) = set(constants::ENV_INPUT) {
            debug!("Input overridden from {}", constants::ENV_INPUT);
            self.source.input = input;
        }
        if let Some(output) = set(constants::ENV_OUTPUT) {
            debug!("Output overridden from {}", constants::ENV_OUTPUT);
            self.output.path = PathBuf::from(output);
        }
    }

    /// Command-line values win over both the file and the environment.
    pub fn apply_cli(&mut self, cli: CliOverrides) {
        if let Some(input) = cli.input {
            self.source.input = input;
        }
        if let Some(output) = cli.output {
            self.output.path = output;
        }
        if let Some(min) = cli.min_age {
            self.filter.min = min;
        }
        if let Some(max) = cli.max_age {
            self.filter.max = max;
        }
        if cli.report.is_some() {
            self.output.report = cli.report;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.input.trim().is_empty() {
            return Err(CleanerError::Config("source.input must not be empty".to_string()));
        }
        if self.output.path.as_os_str().is_empty() {
            return Err(CleanerError::Config("output.path must not be empty".to_string()));
        }
        if self.filter.min > self.filter.max {
            return Err(CleanerError::Config(format!(
                "filter.min ({}) is greater than filter.max ({})",
                self.filter.min, self.filter.max
            )));
        }
        if self.types.date_formats.is_empty() && !self.types.date_columns.is_empty() {
            return Err(CleanerError::Config(
                "types.date_formats must list at least one format".to_string(),
            ));
        }
        Ok(())
    }

    /// Every column some stage operates on, in first-mention order.
    pub fn required_columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = Vec::new();
        let mentioned = self
            .fill
            .iter()
            .map(|r| &r.column)
            .chain(&self.types.integer_columns)
            .chain(&self.types.date_columns)
            .chain(&self.text.columns)
            .chain(std::iter::once(&self.filter.column))
            .chain(&self.binary.columns);
        for col in mentioned {
            if !cols.contains(col) {
                cols.push(col.clone());
            }
        }
        cols
    }
}
