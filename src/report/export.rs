//! CSV export of result tables.
//!
//! The export is a plain function of the table: the same rows always produce
//! the same bytes. Previously exported files can be read back with
//! [`read_csv`].

use crate::error::ExportError;
use crate::models::{ResultRow, ResultTable};
use chrono::NaiveDate;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name offered for the export.
pub const EXPORT_FILE_NAME: &str = "results.csv";
/// MIME type of the export.
pub const EXPORT_MIME_TYPE: &str = "text/csv";

const DATE_HEADER: &str = "Date";
const LOCATION_HEADER: &str = "Location";
const NDVI_HEADER: &str = "Custom_NDVI";
/// Historical label of the water index column, space included.
pub const LEGACY_NDWI_HEADER: &str = "Custom_ND VI";
const NDWI_HEADER: &str = "Custom_NDWI";

/// A serialized table ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub file_name: String,
    pub mime_type: &'static str,
    pub data: String,
}

/// Column labels of the export.
pub fn header(legacy: bool) -> [&'static str; 4] {
    [
        DATE_HEADER,
        LOCATION_HEADER,
        NDVI_HEADER,
        if legacy { LEGACY_NDWI_HEADER } else { NDWI_HEADER },
    ]
}

/// Serialize a table to CSV text.
pub fn to_csv(table: &ResultTable, legacy_header: bool) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header(legacy_header))?;

    for row in table.iter() {
        writer.write_record([
            row.date.format("%Y-%m-%d").to_string(),
            row.location.clone(),
            row.ndvi.to_string(),
            row.ndwi.to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Invalid(e.to_string()))
}

/// Build the downloadable export.
pub fn export(table: &ResultTable, legacy_header: bool) -> Result<CsvExport, ExportError> {
    Ok(CsvExport {
        file_name: EXPORT_FILE_NAME.to_string(),
        mime_type: EXPORT_MIME_TYPE,
        data: to_csv(table, legacy_header)?,
    })
}

/// Write the export to `path`, or to its file name inside `path` when that
/// is a directory. Returns the file written.
pub fn write_csv(export: &CsvExport, path: &Path) -> Result<PathBuf, ExportError> {
    let target = if path.is_dir() {
        path.join(&export.file_name)
    } else {
        path.to_path_buf()
    };

    std::fs::write(&target, export.data.as_bytes())?;
    info!(
        "Wrote {} ({}, {} bytes)",
        target.display(),
        export.mime_type,
        export.data.len()
    );
    Ok(target)
}

/// Parse a previously exported CSV. Both header spellings are accepted.
pub fn read_csv<R: Read>(reader: R) -> Result<ResultTable, ExportError> {
    let mut reader = csv::Reader::from_reader(reader);

    let headers = reader.headers()?.clone();
    let names: Vec<&str> = headers.iter().collect();
    if names != header(true) && names != header(false) {
        return Err(ExportError::Invalid(format!(
            "unexpected header: {}",
            names.join(",")
        )));
    }

    let mut table = ResultTable::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = i + 2;
        let field = |idx: usize| {
            record
                .get(idx)
                .ok_or_else(|| ExportError::Invalid(format!("line {}: missing column {}", line, idx + 1)))
        };
        let number = |idx: usize| -> Result<f64, ExportError> {
            field(idx)?
                .parse::<f64>()
                .map_err(|e| ExportError::Invalid(format!("line {}: {}", line, e)))
        };

        let date = NaiveDate::parse_from_str(field(0)?, "%Y-%m-%d")
            .map_err(|e| ExportError::Invalid(format!("line {}: {}", line, e)))?;

        table.push(ResultRow {
            date,
            location: field(1)?.to_string(),
            ndvi: number(2)?,
            ndwi: number(3)?,
        });
    }

    Ok(table)
}

/// Read a results file from disk.
pub fn load_csv(path: &Path) -> Result<ResultTable, ExportError> {
    let file = std::fs::File::open(path)?;
    read_csv(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(date: &str, location: &str, ndvi: f64, ndwi: f64) -> ResultRow {
        ResultRow {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            location: location.to_string(),
            ndvi,
            ndwi,
        }
    }

    fn sample() -> ResultTable {
        ResultTable::from(vec![
            row("2024-01-01", "Origin", 0.3333333333333333, 0.25),
            row("2024-01-01", "Rome, Italy", -0.125, 0.0),
            row("2024-01-31", "Origin", 0.4, -0.05),
        ])
    }

    #[test]
    fn test_legacy_header() {
        let csv = to_csv(&ResultTable::new(), true).unwrap();
        assert_eq!(csv, "Date,Location,Custom_NDVI,Custom_ND VI\n");

        let csv = to_csv(&ResultTable::new(), false).unwrap();
        assert_eq!(csv, "Date,Location,Custom_NDVI,Custom_NDWI\n");
    }

    #[test]
    fn test_rows_and_quoting() {
        let csv = to_csv(&sample(), true).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "2024-01-01,Origin,0.3333333333333333,0.25");
        assert_eq!(lines[2], "2024-01-01,\"Rome, Italy\",-0.125,0");
        assert_eq!(lines[3], "2024-01-31,Origin,0.4,-0.05");
    }

    #[test]
    fn test_export_is_deterministic() {
        let first = export(&sample(), true).unwrap();
        let second = export(&sample(), true).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.file_name, "results.csv");
        assert_eq!(first.mime_type, "text/csv");
    }

    #[test]
    fn test_round_trip() {
        for legacy in [true, false] {
            let csv = to_csv(&sample(), legacy).unwrap();
            let parsed = read_csv(csv.as_bytes()).unwrap();
            assert_eq!(parsed, sample());
        }
    }

    #[test]
    fn test_read_rejects_foreign_files() {
        assert!(read_csv("a,b,c\n1,2,3\n".as_bytes()).is_err());
        assert!(read_csv("Date,Location,Custom_NDVI,Custom_ND VI\nyesterday,X,0.1,0.2\n".as_bytes()).is_err());
        assert!(read_csv("Date,Location,Custom_NDVI,Custom_ND VI\n2024-01-01,X,high,0.2\n".as_bytes()).is_err());
    }

    #[test]
    fn test_write_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(EXPORT_FILE_NAME);

        let export = export(&sample(), true).unwrap();
        assert_eq!(write_csv(&export, &path).unwrap(), path);

        assert_eq!(load_csv(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_write_into_directory_uses_file_name() {
        let dir = TempDir::new().unwrap();

        let export = export(&sample(), false).unwrap();
        let written = write_csv(&export, dir.path()).unwrap();

        assert_eq!(written, dir.path().join("results.csv"));
        assert_eq!(load_csv(&written).unwrap(), sample());
    }
}
