//! Normalized-difference index computation.
//!
//! Derives the vegetation and water index bands from raw Sentinel-2
//! reflectances and attaches them to each observation.

use crate::config::IndicesConfig;
use crate::service::Observation;

/// Default band pair for the vegetation index (red, green).
pub const NDVI_BANDS: (&str, &str) = ("B4", "B3");
/// Default band pair for the water index (green, blue).
pub const NDWI_BANDS: (&str, &str) = ("B3", "B2");
/// Name of the derived vegetation band.
pub const NDVI_NAME: &str = "Custom_NDVI";
/// Name of the derived water band.
pub const NDWI_NAME: &str = "Custom_NDWI";

/// `(a - b) / (a + b)`, undefined on masked or degenerate input.
///
/// Negative inputs are masked, as Earth Engine's `normalizedDifference` does.
pub fn normalized_difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    let (a, b) = (a?, b?);
    if !a.is_finite() || !b.is_finite() || a < 0.0 || b < 0.0 {
        return None;
    }
    let sum = a + b;
    if sum == 0.0 {
        return None;
    }
    Some((a - b) / sum)
}

/// A derived band: output name plus the two input bands.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBand {
    pub name: String,
    pub first: String,
    pub second: String,
}

impl IndexBand {
    pub fn new(name: &str, (first, second): (&str, &str)) -> Self {
        Self {
            name: name.to_string(),
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    fn compute(&self, obs: &Observation) -> Option<f64> {
        normalized_difference(obs.band(&self.first), obs.band(&self.second))
    }
}

/// Adds the vegetation and water index bands to observations.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexCalculator {
    pub vegetation: IndexBand,
    pub water: IndexBand,
}

impl Default for IndexCalculator {
    fn default() -> Self {
        Self {
            vegetation: IndexBand::new(NDVI_NAME, NDVI_BANDS),
            water: IndexBand::new(NDWI_NAME, NDWI_BANDS),
        }
    }
}

impl From<&IndicesConfig> for IndexCalculator {
    fn from(config: &IndicesConfig) -> Self {
        Self {
            vegetation: IndexBand::new(
                &config.ndvi_name,
                (config.ndvi_bands[0].as_str(), config.ndvi_bands[1].as_str()),
            ),
            water: IndexBand::new(
                &config.ndwi_name,
                (config.ndwi_bands[0].as_str(), config.ndwi_bands[1].as_str()),
            ),
        }
    }
}

impl IndexCalculator {
    /// Return a copy of the observation with both index bands attached.
    pub fn apply(&self, obs: &Observation) -> Observation {
        let mut out = obs.clone();
        out.set_band(&self.vegetation.name, self.vegetation.compute(obs));
        out.set_band(&self.water.name, self.water.compute(obs));
        out
    }

    /// Apply to every observation of a collection.
    pub fn apply_all(&self, observations: &[Observation]) -> Vec<Observation> {
        observations.iter().map(|o| self.apply(o)).collect()
    }

    /// Input bands the service has to return.
    pub fn input_bands(&self) -> Vec<&str> {
        let mut bands = vec![
            self.vegetation.first.as_str(),
            self.vegetation.second.as_str(),
            self.water.first.as_str(),
            self.water.second.as_str(),
        ];
        bands.sort_unstable();
        bands.dedup();
        bands
    }
}
