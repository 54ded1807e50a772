use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::exception::{ResultExt, locate};
use crate::raise;

#[derive(Debug, Error, PartialEq)]
pub enum IngestionError {
    #[error("test ratio must be strictly between 0 and 1, got {0}")]
    InvalidTestRatio(f64),

    #[error("dataset {0} has no header row")]
    MissingHeader(PathBuf),

    #[error("line {line}: quoted field is never closed")]
    UnterminatedQuote { line: usize },

    #[error("line {line}: expected {expected} fields, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataIngestionConfig {
    /// Raw CSV dataset to ingest
    pub source_path: PathBuf,
    /// Directory receiving raw/train/test artifacts
    pub artifacts_dir: PathBuf,
    /// Fraction of rows routed to the test split
    pub test_ratio: f64,
}

impl Default for DataIngestionConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("data/raw.csv"),
            artifacts_dir: PathBuf::from("artifacts"),
            test_ratio: 0.2,
        }
    }
}

impl DataIngestionConfig {
    pub fn raw_data_path(&self) -> PathBuf {
        self.artifacts_dir.join("raw.csv")
    }

    pub fn train_data_path(&self) -> PathBuf {
        self.artifacts_dir.join("train.csv")
    }

    pub fn test_data_path(&self) -> PathBuf {
        self.artifacts_dir.join("test.csv")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestionArtifacts {
    pub raw_data_path: PathBuf,
    pub train_data_path: PathBuf,
    pub test_data_path: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// The ingestion step as consumed by the pipeline entry point.
pub trait Ingest {
    fn initiate_data_ingestion(&self) -> Result<IngestionArtifacts>;
}

#[derive(Debug, Clone)]
pub struct DataIngestion {
    config: DataIngestionConfig,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DataIngestionConfig {
        &self.config
    }
}

impl Ingest for DataIngestion {
    fn initiate_data_ingestion(&self) -> Result<IngestionArtifacts> {
        let config = &self.config;
        debug!(source = %config.source_path.display(), "entered data ingestion");

        let ratio = config.test_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(locate(IngestionError::InvalidTestRatio(ratio)).into());
        }

        let raw = fs::read_to_string(&config.source_path)
            .located()
            .with_context(|| {
                format!(
                    "failed to read dataset at {}",
                    config.source_path.display()
                )
            })?;
        let dataset = Dataset::parse(&raw, &config.source_path)?;
        debug!(
            rows = dataset.rows.len(),
            columns = dataset.width(),
            "read dataset"
        );

        fs::create_dir_all(&config.artifacts_dir)
            .located()
            .with_context(|| {
                format!(
                    "failed to create artifacts dir {}",
                    config.artifacts_dir.display()
                )
            })?;

        let raw_data_path = config.raw_data_path();
        write_csv(&raw_data_path, dataset.header, &dataset.rows)?;

        let (train, test) = split_rows(&dataset.rows, ratio);
        let train_data_path = config.train_data_path();
        let test_data_path = config.test_data_path();
        write_csv(&train_data_path, dataset.header, &train)?;
        write_csv(&test_data_path, dataset.header, &test)?;

        debug!(
            train_rows = train.len(),
            test_rows = test.len(),
            artifacts = %config.artifacts_dir.display(),
            "data ingestion completed"
        );

        Ok(IngestionArtifacts {
            raw_data_path,
            train_data_path,
            test_data_path,
            train_rows: train.len(),
            test_rows: test.len(),
        })
    }
}

struct Dataset<'a> {
    header: &'a str,
    rows: Vec<&'a str>,
}

impl<'a> Dataset<'a> {
    fn parse(raw: &'a str, origin: &Path) -> Result<Self> {
        let records = split_records(raw)
            .located()
            .with_context(|| format!("malformed dataset {}", origin.display()))?;
        let mut lines = records
            .into_iter()
            .filter(|(_, record)| !record.trim().is_empty());

        let Some((_, header)) = lines.next() else {
            return Err(locate(IngestionError::MissingHeader(origin.to_path_buf())).into());
        };
        let expected = field_count(header);

        let mut rows = Vec::new();
        for (line_no, line) in lines {
            let found = field_count(line);
            if found != expected {
                return Err(locate(IngestionError::RaggedRow {
                    line: line_no,
                    expected,
                    found,
                }))
                .with_context(|| format!("malformed dataset {}", origin.display()));
            }
            rows.push(line);
        }

        if rows.is_empty() {
            raise!("dataset {} has a header but no data rows", origin.display());
        }
        Ok(Self { header, rows })
    }

    fn width(&self) -> usize {
        field_count(self.header)
    }
}

/// Split `raw` into CSV records paired with the 1-based line each starts on.
/// Newlines inside double-quoted fields stay part of the record.
fn split_records(raw: &str) -> Result<Vec<(usize, &str)>, IngestionError> {
    let mut records = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    let mut start_line = 1;
    let mut line = 1;
    for (idx, byte) in raw.bytes().enumerate() {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b'\n' => {
                line += 1;
                if !in_quotes {
                    records.push((start_line, raw[start..idx].trim_end_matches('\r')));
                    start = idx + 1;
                    start_line = line;
                }
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(IngestionError::UnterminatedQuote { line: start_line });
    }
    if start < raw.len() {
        records.push((start_line, raw[start..].trim_end_matches('\r')));
    }
    Ok(records)
}

// Escaped quotes ("") toggle twice, so they never change the quoting state.
fn field_count(record: &str) -> usize {
    let mut in_quotes = false;
    let mut fields = 1;
    for byte in record.bytes() {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b',' if !in_quotes => fields += 1,
            _ => {}
        }
    }
    fields
}

/// Spread `floor(n * ratio)` rows evenly into the test split; keep input order.
pub fn split_rows<'a>(rows: &[&'a str], ratio: f64) -> (Vec<&'a str>, Vec<&'a str>) {
    let mut train = Vec::with_capacity(rows.len());
    let mut test = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        let before = (idx as f64 * ratio).floor();
        let after = ((idx + 1) as f64 * ratio).floor();
        if after > before {
            test.push(*row);
        } else {
            train.push(*row);
        }
    }
    (train, test)
}

fn write_csv(path: &Path, header: &str, rows: &[&str]) -> Result<()> {
    let body: usize = rows.iter().map(|row| row.len() + 1).sum();
    let mut out = String::with_capacity(header.len() + 1 + body);
    out.push_str(header);
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out)
        .located()
        .with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), rows = rows.len(), "wrote artifact");
    Ok(())
}
