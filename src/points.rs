//! Loading sample points from CSV files.

use crate::config::PointConfig;
use crate::error::ConfigError;
use crate::models::Point;
use std::io::Read;
use std::path::Path;

/// Read points from a CSV with `lat`, `lon` and optional `name` columns.
///
/// Unnamed points are numbered from `offset + 1`.
pub fn read_points<R: Read>(reader: R, offset: usize) -> Result<Vec<Point>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut points = Vec::new();
    for (i, record) in reader.deserialize::<PointConfig>().enumerate() {
        let entry = record.map_err(|e| format!("line {}: {}", i + 2, e))?;
        let point = entry.to_point(offset + i);
        point.validate()?;
        points.push(point);
    }

    Ok(points)
}

/// Load a points file from disk.
pub fn load_points_file(path: &Path, offset: usize) -> Result<Vec<Point>, ConfigError> {
    let err = |reason: String| ConfigError::PointsFile {
        path: path.to_path_buf(),
        reason,
    };

    let file = std::fs::File::open(path).map_err(|e| err(e.to_string()))?;
    read_points(file, offset).map_err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_points() {
        let csv = "lat,lon,name\n41.9028,12.4964,Rome\n0,0,\n";
        let points = read_points(csv.as_bytes(), 0).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Point::new(12.4964, 41.9028, "Rome"));
        assert_eq!(points[1].name, "Point 2");
    }

    #[test]
    fn test_offset_numbering_and_optional_name_column() {
        let csv = "lon,lat\n1.0,2.0\n";
        let points = read_points(csv.as_bytes(), 3).unwrap();
        assert_eq!(points[0], Point::new(1.0, 2.0, "Point 4"));
    }

    #[test]
    fn test_bad_rows() {
        assert!(read_points("lat,lon,name\nnorth,0,X\n".as_bytes(), 0).is_err());
        assert!(read_points("lat,lon,name\n100,0,X\n".as_bytes(), 0).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_points_file(Path::new("/nonexistent/points.csv"), 0).unwrap_err();
        assert!(matches!(err, ConfigError::PointsFile { .. }));
    }
}
