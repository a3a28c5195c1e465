//! CSV record reader for batch classification input.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::record::{RawRecord, RawTable};
use crate::IoError;

/// Reads a headed CSV file into a [`RawTable`].
///
/// Every cell is kept as a string and goes through the same coercion as
/// JSON input. Short rows simply lack the trailing keys; empty cells are
/// kept as `""`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
pub struct RecordReader {
    path: PathBuf,
}

impl RecordReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read every record.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<RawTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let header: Vec<String> = rdr
            .headers()
            .map_err(|e| self.csv_error(e))?
            .iter()
            .map(String::from)
            .collect();
        debug!(n_columns = header.len(), "read CSV header");

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| self.csv_error(e))?;
            let fields: Map<String, Value> = header
                .iter()
                .zip(record.iter())
                .map(|(name, cell)| (name.clone(), Value::String(cell.to_string())))
                .collect();
            rows.push(RawRecord::new(fields));
        }

        info!(n_rows = rows.len(), n_columns = header.len(), "records loaded");
        Ok(RawTable::new(rows))
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::CellValue;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_rows_as_text() {
        let f = write_csv("P,depth,name\n3.5,120,k1\n7.0,,k2\n");
        let table = RecordReader::new(f.path()).read().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].cell("P"), CellValue::Text("3.5".into()));
        assert_eq!(table.rows()[1].cell("depth"), CellValue::Text(String::new()));
        assert!(table.has_column("name"));
    }

    #[test]
    fn short_row_lacks_trailing_keys() {
        let f = write_csv("a,b,c\n1,2,3\n4\n");
        let table = RecordReader::new(f.path()).read().unwrap();
        assert!(table.rows()[1].contains("a"));
        assert!(!table.rows()[1].contains("b"));
    }

    #[test]
    fn header_only_is_empty_table() {
        let f = write_csv("a,b\n");
        let table = RecordReader::new(f.path()).read().unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn missing_file() {
        let err = RecordReader::new(Path::new("/nonexistent/input.csv"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
