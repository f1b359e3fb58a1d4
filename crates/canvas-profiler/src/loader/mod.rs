//! Dataset loading: raw bytes plus a file-type hint into a DataFrame.
//!
//! Size-based head sampling is applied here. The random statistics sample
//! for large (but not oversized) tables is drawn later by the profiler.

mod excel;

use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use tracing::debug;

use crate::config::ProfilerConfig;
use crate::error::{ProfilerError, Result, ResultExt};

pub use excel::read_excel;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Csv,
    Tsv,
    Json,
    Parquet,
    Excel,
}

impl FileType {
    /// Map a bare extension (`csv`, `xlsx`, ...) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            "parquet" | "pq" => Some(Self::Parquet),
            "xlsx" | "xls" | "xlsm" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Match a MIME content type by substring.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("spreadsheet") || ct.contains("excel") {
            Some(Self::Excel)
        } else if ct.contains("tab-separated-values") {
            Some(Self::Tsv)
        } else if ct.contains("csv") || ct.contains("text/plain") {
            Some(Self::Csv)
        } else if ct.contains("json") {
            Some(Self::Json)
        } else if ct.contains("parquet") {
            Some(Self::Parquet)
        } else {
            None
        }
    }

    /// Resolve the format from a declared type (extension or MIME), falling
    /// back to the extension of `storage_path` when nothing is declared.
    pub fn resolve(declared: Option<&str>, storage_path: &str) -> Result<Self> {
        match declared.map(str::trim).filter(|d| !d.is_empty()) {
            Some(declared) => {
                let normalized = declared
                    .rsplit('/')
                    .next()
                    .unwrap_or(declared)
                    .to_ascii_lowercase();
                Self::from_extension(&normalized)
                    .or_else(|| Self::from_content_type(declared))
                    .ok_or_else(|| ProfilerError::UnsupportedFileType(normalized))
            }
            None => {
                let ext = Path::new(storage_path)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or_default();
                Self::from_extension(ext).ok_or_else(|| {
                    ProfilerError::UnsupportedFileType(if ext.is_empty() {
                        storage_path.to_string()
                    } else {
                        ext.to_ascii_lowercase()
                    })
                })
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Json => "json",
            Self::Parquet => "parquet",
            Self::Excel => "xlsx",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed table plus how it was sampled.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub df: DataFrame,
    pub file_type: FileType,
    /// True when only the head of an oversized file was read.
    pub sampled: bool,
    pub note: Option<String>,
}

/// Parses raw bytes, applying the size threshold from [`ProfilerConfig`].
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    head_sample_size: usize,
    max_file_size_bytes: u64,
}

impl DatasetLoader {
    pub fn new(config: &ProfilerConfig) -> Self {
        Self {
            head_sample_size: config.head_sample_size,
            max_file_size_bytes: config.max_file_size_bytes(),
        }
    }

    /// Parse `bytes` as `file_type`.
    pub fn load(&self, bytes: Vec<u8>, file_type: FileType) -> Result<LoadedDataset> {
        let oversized = bytes.len() as u64 > self.max_file_size_bytes;
        let row_limit = oversized.then_some(self.head_sample_size);

        debug!(
            "Loading {} bytes as {} (head sampling: {})",
            bytes.len(),
            file_type,
            oversized
        );

        let df = match file_type {
            FileType::Csv => read_delimited(bytes, b',', row_limit),
            FileType::Tsv => read_delimited(bytes, b'\t', row_limit),
            FileType::Json => read_json(bytes),
            FileType::Parquet => read_parquet(bytes),
            FileType::Excel => read_excel(bytes),
        }
        .context(format!("Failed to parse {file_type} data"))?;

        let df = match row_limit {
            Some(limit) if df.height() > limit => df.head(Some(limit)),
            _ => df,
        };

        let note = oversized.then(|| {
            format!(
                "computed on first {} rows; file exceeds size threshold",
                df.height()
            )
        });

        Ok(LoadedDataset {
            df,
            file_type,
            sampled: oversized,
            note,
        })
    }
}

fn read_delimited(bytes: Vec<u8>, separator: u8, n_rows: Option<usize>) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_n_rows(n_rows)
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_quote_char(Some(b'"'))
                .with_try_parse_dates(true),
        )
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}

fn read_json(bytes: Vec<u8>) -> Result<DataFrame> {
    let is_array = bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'[');
    if is_array {
        return Ok(JsonReader::new(Cursor::new(bytes))
            .with_json_format(JsonFormat::Json)
            .finish()?);
    }

    match JsonReader::new(Cursor::new(bytes.clone()))
        .with_json_format(JsonFormat::JsonLines)
        .finish()
    {
        Ok(df) => Ok(df),
        Err(e) => {
            debug!("JSON lines parse failed, retrying as array: {}", e);
            Ok(JsonReader::new(Cursor::new(bytes))
                .with_json_format(JsonFormat::Json)
                .finish()?)
        }
    }
}

fn read_parquet(bytes: Vec<u8>) -> Result<DataFrame> {
    Ok(ParquetReader::new(Cursor::new(bytes)).finish()?)
}
