use anyhow::Result;
use roster_cleaner::app::ports::{HttpClientPort, HttpGetResult, TableSinkPort, WriteSummary};
use roster_cleaner::config::{CoercionPolicy, Config};
use roster_cleaner::infra::csv_codec::read_table;
use roster_cleaner::pipeline::{Loader, Pipeline};
use roster_cleaner::table::{ColumnType, RecordTable, Value};
use roster_cleaner::CleanerError;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::tempdir;

const STUDENTS: &str = "\
student_id,age,course,enrollment_date,is_intern
1,20, computer science ,2024-01-15,yes
2,,data analytics,2024-01-15,TRUE
3,17,physics,2024-01-16,no
4,30,,,maybe
5,46,biology,2024-01-17,
6,25,MATH,2024-01-16,1
7,40,art history,2024-01-15,N
";

fn config_for(input: &Path, dir: &Path) -> Config {
    let mut config = Config::standard();
    config.source.input = input.to_string_lossy().into_owned();
    config.output.path = dir.join("out").join("cleaned.csv");
    config.output.report = Some(dir.join("out").join("report.json"));
    config
}

fn write_input(dir: &Path, content: &str) -> Result<PathBuf> {
    let path = dir.join("students.csv");
    fs::write(&path, content)?;
    Ok(path)
}

#[test]
fn test_full_run_produces_cleaned_csv() -> Result<()> {
    let dir = tempdir()?;
    let input = write_input(dir.path(), STUDENTS)?;
    let config = config_for(&input, dir.path());
    let output_path = config.output.path.clone();

    let result = Pipeline::from_config(config)?.run()?;

    assert_eq!(result.rows_loaded, 7);
    assert_eq!(result.cells_filled, 4);
    assert_eq!(result.rows_removed, 2);
    assert_eq!(result.rows_written, 5);
    assert!(result.warnings.is_empty());
    assert_eq!(result.input_sha256.len(), 64);

    let written = fs::read_to_string(&output_path)?;
    assert_eq!(
        written,
        "student_id,age,course,enrollment_date,is_intern\n\
         1,20,Computer Science,2024-01-15,Yes\n\
         2,27,Data Analytics,2024-01-15,Yes\n\
         4,30,Unknown,2024-01-15,No\n\
         6,25,Math,2024-01-16,Yes\n\
         7,40,Art History,2024-01-15,No\n"
    );

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out").join("report.json"))?)?;
    assert_eq!(report["rows_removed"], 2);
    assert_eq!(report["steps"].as_array().map(|s| s.len()), Some(5));
    Ok(())
}

#[test]
fn test_cleaned_table_invariants() -> Result<()> {
    let dir = tempdir()?;
    let input = write_input(dir.path(), STUDENTS)?;
    let pipeline = Pipeline::from_config(config_for(&input, dir.path()))?;

    let mut table = pipeline.load()?.table;
    let outcome = pipeline.clean(&mut table)?;
    assert_eq!(outcome.rows_removed(), 2);

    let age = table.column_index("age").unwrap();
    assert_eq!(table.column_type(age), ColumnType::Int64);
    assert!(table
        .column_values(age)
        .all(|v| matches!(v, Value::Int(a) if (18..=45).contains(a))));

    let intern = table.column_index("is_intern").unwrap();
    assert!(table
        .column_values(intern)
        .all(|v| *v == Value::text("Yes") || *v == Value::text("No")));

    let date = table.column_index("enrollment_date").unwrap();
    assert_eq!(table.column_type(date), ColumnType::Date);

    for name in ["age", "course", "enrollment_date", "is_intern"] {
        let idx = table.column_index(name).unwrap();
        assert!(table.column_values(idx).all(|v| !v.is_null()));
    }
    Ok(())
}

#[test]
fn test_written_output_reloads_with_same_content() -> Result<()> {
    let dir = tempdir()?;
    let input = write_input(dir.path(), STUDENTS)?;
    let config = config_for(&input, dir.path());
    let output_path = config.output.path.clone();
    let pipeline = Pipeline::from_config(config)?;

    let mut table = pipeline.load()?.table;
    pipeline.clean(&mut table)?;
    pipeline.save(&table)?;

    let reloaded = read_table(fs::File::open(&output_path)?, "reloaded")?;
    assert_eq!(reloaded.columns(), table.columns());
    assert_eq!(reloaded.len(), table.len());
    for (before, after) in table.rows().iter().zip(reloaded.rows()) {
        let before: Vec<String> = before.iter().map(|v| v.to_string()).collect();
        let after: Vec<String> = after.iter().map(|v| v.to_string()).collect();
        assert_eq!(before, after);
    }
    Ok(())
}

#[test]
fn test_bad_date_aborts_without_output() -> Result<()> {
    let dir = tempdir()?;
    let input = write_input(
        dir.path(),
        "age,course,enrollment_date,is_intern\n20,math,2024-01-15,yes\n21,art,someday,no\n",
    )?;
    let config = config_for(&input, dir.path());
    let output_path = config.output.path.clone();

    let err = Pipeline::from_config(config)?.run().unwrap_err();

    assert!(matches!(err, CleanerError::Coercion { ref column, row: 1, .. } if column == "enrollment_date"));
    assert!(!output_path.exists());
    Ok(())
}

#[test]
fn test_keep_unconverted_policy_continues() -> Result<()> {
    let dir = tempdir()?;
    let input = write_input(
        dir.path(),
        "age,course,enrollment_date,is_intern\n20,math,2024-01-15,yes\n50,art,someday,no\n",
    )?;
    let mut config = config_for(&input, dir.path());
    config.types.on_error = CoercionPolicy::KeepUnconverted;
    let output_path = config.output.path.clone();

    let result = Pipeline::from_config(config)?.run()?;

    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("someday"));
    assert_eq!(result.rows_written, 1);
    let written = fs::read_to_string(output_path)?;
    assert_eq!(written, "age,course,enrollment_date,is_intern\n20,Math,2024-01-15,Yes\n");
    Ok(())
}

#[test]
fn test_missing_input_file_fails_load() -> Result<()> {
    let dir = tempdir()?;
    let config = config_for(&dir.path().join("absent.csv"), dir.path());
    let err = Pipeline::from_config(config)?.run().unwrap_err();
    assert!(matches!(err, CleanerError::Io(_)));
    Ok(())
}

#[test]
fn test_missing_required_column_fails_load() -> Result<()> {
    let dir = tempdir()?;
    let input = write_input(dir.path(), "age,course,is_intern\n20,math,yes\n")?;
    let err = Pipeline::from_config(config_for(&input, dir.path()))?.run().unwrap_err();
    assert!(matches!(err, CleanerError::MissingColumn(ref c) if c == "enrollment_date"));
    Ok(())
}

#[test]
fn test_unwritable_output_reports_io_error() -> Result<()> {
    let dir = tempdir()?;
    let input = write_input(dir.path(), STUDENTS)?;
    let mut config = config_for(&input, dir.path());
    // Output path is an existing, non-empty directory
    let blocked = dir.path().join("blocked");
    fs::create_dir_all(blocked.join("inner"))?;
    config.output.path = blocked.clone();
    config.output.report = None;

    let err = Pipeline::from_config(config)?.run().unwrap_err();
    assert!(matches!(err, CleanerError::Io(_)));
    assert!(blocked.is_dir());
    Ok(())
}

struct CannedHttp(&'static str);

impl HttpClientPort for CannedHttp {
    fn get(&self, _url: &str) -> roster_cleaner::Result<HttpGetResult> {
        Ok(HttpGetResult {
            status: 200,
            bytes: self.0.as_bytes().to_vec(),
            content_type: "text/csv".to_string(),
            content_length: self.0.len() as u64,
        })
    }
}

#[derive(Clone, Default)]
struct MemorySink(Rc<RefCell<Option<RecordTable>>>);

impl TableSinkPort for MemorySink {
    fn write(&self, table: &RecordTable) -> roster_cleaner::Result<WriteSummary> {
        *self.0.borrow_mut() = Some(table.clone());
        Ok(WriteSummary { path: PathBuf::from("memory"), rows: table.len(), bytes: 0 })
    }
}

#[test]
fn test_url_source_goes_through_http_port() -> Result<()> {
    let mut config = Config::standard();
    config.source.input = "https://example.com/students.csv".to_string();
    let sink = MemorySink::default();

    let pipeline = Pipeline::new(
        config,
        Loader::new(Box::new(CannedHttp(STUDENTS))),
        Box::new(sink.clone()),
    );
    let result = pipeline.run()?;

    assert_eq!(result.rows_written, 5);
    let table = sink.0.borrow().clone().expect("sink received a table");
    assert_eq!(table.get(0, "course"), Some(&Value::text("Computer Science")));
    assert_eq!(table.get(1, "age"), Some(&Value::Int(27)));
    Ok(())
}
