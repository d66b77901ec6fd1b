//! Region tables returned by `getRegion` queries.
//!
//! The service answers with a list of rows: the first row is the header
//! (`id, longitude, latitude, time, <band...>`), every following row holds one
//! pixel of one image. Masked pixels come back as `null`.

use crate::error::ServiceError;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

const ID_COLUMN: &str = "id";
const LON_COLUMN: &str = "longitude";
const LAT_COLUMN: &str = "latitude";
const TIME_COLUMN: &str = "time";

/// Raw per-pixel, per-image result for one geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// One pixel of one image with its band values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub image_id: Option<String>,
    /// Acquisition time in milliseconds since the Unix epoch.
    pub time_ms: Option<i64>,
    pub bands: BTreeMap<String, Option<f64>>,
}

impl Observation {
    /// Value of a band, `None` when the band is missing or masked.
    pub fn band(&self, name: &str) -> Option<f64> {
        self.bands.get(name).copied().flatten()
    }

    pub fn set_band(&mut self, name: &str, value: Option<f64>) {
        self.bands.insert(name.to_string(), value);
    }

    /// UTC acquisition date.
    pub fn acquired_on(&self) -> Option<NaiveDate> {
        DateTime::<Utc>::from_timestamp_millis(self.time_ms?).map(|t| t.date_naive())
    }
}

impl RegionTable {
    /// Parse the JSON value returned by the service.
    pub fn from_value(value: Value) -> Result<Self, ServiceError> {
        let Value::Array(mut rows) = value else {
            return Err(ServiceError::MalformedResponse(
                "region result is not a list".to_string(),
            ));
        };

        if rows.is_empty() {
            return Err(ServiceError::MalformedResponse(
                "region result has no header row".to_string(),
            ));
        }

        let header = match rows.remove(0) {
            Value::Array(cols) => cols
                .into_iter()
                .map(|c| match c {
                    Value::String(s) => Ok(s),
                    other => Err(ServiceError::MalformedResponse(format!(
                        "non-string header column: {}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => {
                return Err(ServiceError::MalformedResponse(
                    "region header is not a list".to_string(),
                ))
            }
        };

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| match row {
                Value::Array(values) if values.len() == header.len() => Ok(values),
                Value::Array(values) => Err(ServiceError::MalformedResponse(format!(
                    "row {} has {} columns, header has {}",
                    i + 1,
                    values.len(),
                    header.len()
                ))),
                _ => Err(ServiceError::MalformedResponse(format!(
                    "row {} is not a list",
                    i + 1
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { header, rows })
    }

    /// Position of a column in the header.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Convert every data row into an [`Observation`].
    pub fn observations(&self) -> Vec<Observation> {
        self.rows
            .iter()
            .map(|row| {
                let mut obs = Observation::default();
                for (name, value) in self.header.iter().zip(row) {
                    match name.as_str() {
                        ID_COLUMN => obs.image_id = value.as_str().map(String::from),
                        LON_COLUMN | LAT_COLUMN => {}
                        TIME_COLUMN => {
                            obs.time_ms = value.as_i64().or_else(|| value.as_f64().map(|t| t as i64))
                        }
                        band => obs.set_band(band, value.as_f64()),
                    }
                }
                obs
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIXTURE: &str = include_str!("../../fixtures/region_response.json");

    #[test]
    fn test_parse_fixture() {
        let value: Value = serde_json::from_str(FIXTURE).unwrap();
        let table = RegionTable::from_value(value["result"].clone()).unwrap();

        assert_eq!(table.header[0], "id");
        assert_eq!(table.column("time"), Some(3));
        assert_eq!(table.rows.len(), 3);

        let obs = table.observations();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].image_id.as_deref(), Some("20240103T100401_20240103T100355_T32TQM"));
        assert_eq!(obs[0].band("B4"), Some(812.0));
        assert_eq!(obs[2].band("B4"), None);
        assert_eq!(obs[0].time_ms, Some(1_704_276_241_000));
        assert_eq!(obs[0].acquired_on(), NaiveDate::from_ymd_opt(2024, 1, 3));
    }

    #[test]
    fn test_acquired_on_without_time() {
        let obs = Observation::default();
        assert_eq!(obs.acquired_on(), None);
    }

    #[test]
    fn test_null_bands_are_masked() {
        let table = RegionTable::from_value(json!([
            ["id", "longitude", "latitude", "time", "B2", "B3"],
            ["a", 0.0, 0.0, 1704067200000i64, null, 120]
        ]))
        .unwrap();

        let obs = &table.observations()[0];
        assert_eq!(obs.band("B2"), None);
        assert_eq!(obs.band("B3"), Some(120.0));
        assert_eq!(obs.band("B8"), None);
        assert_eq!(obs.time_ms, Some(1_704_067_200_000));
    }

    #[test]
    fn test_header_only_is_empty() {
        let table = RegionTable::from_value(json!([["id", "longitude", "latitude", "time"]])).unwrap();
        assert!(table.is_empty());
        assert!(table.observations().is_empty());
    }

    #[test]
    fn test_rejects_malformed_results() {
        assert!(RegionTable::from_value(json!({"not": "a list"})).is_err());
        assert!(RegionTable::from_value(json!([])).is_err());
        assert!(RegionTable::from_value(json!([["id", "time"], ["a"]])).is_err());
        assert!(RegionTable::from_value(json!([[1, 2]])).is_err());
    }
}
