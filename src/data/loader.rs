//! Loading and saving datasets

use super::Dataset;
use crate::error::{InsightError, Result};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Data loader for CSV/TSV, Parquet and line-delimited JSON files
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used to infer the CSV schema
    infer_schema_length: usize,
    /// Keep only these columns after loading
    columns: Option<Vec<String>>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
            columns: None,
        }
    }

    /// Set the schema inference window for CSV files
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    /// Restrict the loaded dataset to the given columns
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Load a delimited text file with a header row
    pub fn load_csv(&self, path: &Path, delimiter: u8) -> Result<Dataset> {
        let file = File::open(path)
            .map_err(|e| InsightError::DataError(format!("{}: {}", path.display(), e)))?;

        let parse_opts = CsvParseOptions::default().with_separator(delimiter);

        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()?;

        self.finish(frame)
    }

    /// Load a Parquet file
    pub fn load_parquet(&self, path: &Path) -> Result<Dataset> {
        let file = File::open(path)
            .map_err(|e| InsightError::DataError(format!("{}: {}", path.display(), e)))?;

        let frame = ParquetReader::new(file).finish()?;
        self.finish(frame)
    }

    /// Load a line-delimited JSON file
    pub fn load_json(&self, path: &Path) -> Result<Dataset> {
        let file = File::open(path)
            .map_err(|e| InsightError::DataError(format!("{}: {}", path.display(), e)))?;

        let frame = JsonReader::new(file)
            .with_json_format(JsonFormat::JsonLines)
            .finish()?;
        self.finish(frame)
    }

    /// Detect the format from the file extension and load
    pub fn load_auto(&self, path: &Path) -> Result<Dataset> {
        let start = Instant::now();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let data = match ext.as_str() {
            "tsv" => self.load_csv(path, b'\t')?,
            "parquet" | "pq" => self.load_parquet(path)?,
            "json" | "jsonl" | "ndjson" => self.load_json(path)?,
            _ => self.load_csv(path, b',')?,
        };

        info!(
            path = %path.display(),
            rows = data.height(),
            columns = data.frame().width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(data)
    }

    /// Header and row count of a CSV file without parsing it
    pub fn file_info(&self, path: &Path) -> Result<FileInfo> {
        let metadata = std::fs::metadata(path)?;
        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();

        let header = lines.next().transpose()?.unwrap_or_default();
        let columns: Vec<String> = header.split(',').map(|s| s.trim().to_string()).collect();
        let n_rows = lines.count();

        Ok(FileInfo {
            path: path.display().to_string(),
            file_size: metadata.len(),
            n_rows,
            columns,
        })
    }

    fn finish(&self, frame: DataFrame) -> Result<Dataset> {
        let frame = match &self.columns {
            Some(columns) => frame.select(columns.iter().map(|c| c.as_str()))?,
            None => frame,
        };
        Ok(Dataset::new(frame))
    }
}

/// Header-level information about a CSV file
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: String,
    pub file_size: u64,
    pub n_rows: usize,
    pub columns: Vec<String>,
}

/// Save DataFrames produced by the report layer
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV with a header row
    pub fn save_csv(frame: &mut DataFrame, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).include_header(true).finish(frame)?;
        Ok(())
    }

    /// Save to Parquet
    pub fn save_parquet(frame: &mut DataFrame, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        ParquetWriter::new(file).finish(frame)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv_roundtrip() {
        let mut tmp = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(tmp, "ageph,fuel,expo").unwrap();
        writeln!(tmp, "25,gasoline,1.0").unwrap();
        writeln!(tmp, "40,diesel,0.5").unwrap();
        tmp.flush().unwrap();

        let data = DataLoader::new().load_auto(tmp.path()).unwrap();
        assert_eq!(data.height(), 2);
        assert!(data.is_categorical("fuel").unwrap());
        assert_eq!(data.numeric_column("ageph").unwrap(), vec![25.0, 40.0]);

        let info = DataLoader::new().file_info(tmp.path()).unwrap();
        assert_eq!(info.n_rows, 2);
        assert_eq!(info.columns, vec!["ageph", "fuel", "expo"]);
    }

    #[test]
    fn test_load_selected_columns() {
        let mut tmp = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(tmp, "a,b,c").unwrap();
        writeln!(tmp, "1,2,3").unwrap();
        tmp.flush().unwrap();

        let data = DataLoader::new()
            .with_columns(vec!["c".to_string(), "a".to_string()])
            .load_auto(tmp.path())
            .unwrap();
        assert_eq!(data.column_names(), vec!["c", "a"]);
    }

    #[test]
    fn test_save_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut frame = df!("x" => &[1.0, 2.0]).unwrap();
        DataSaver::save_csv(&mut frame, &path).unwrap();

        let loaded = DataLoader::new().load_auto(&path).unwrap();
        assert_eq!(loaded.numeric_column("x").unwrap(), vec![1.0, 2.0]);
    }
}
