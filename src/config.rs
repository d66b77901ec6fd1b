//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.s2index.toml` files.

use crate::indices::{NDVI_BANDS, NDVI_NAME, NDWI_BANDS, NDWI_NAME};
use crate::models::Point;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".s2index.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Imagery service settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Credential bootstrap settings.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Bucketing and filtering settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Derived band settings.
    #[serde(default)]
    pub indices: IndicesConfig,

    /// CSV export settings.
    #[serde(default)]
    pub export: ExportConfig,

    /// Points to sample when none are given on the command line.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<PointConfig>,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    crate::report::EXPORT_FILE_NAME.to_string()
}

/// Earth Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Cloud project used for API calls. Falls back to the credentials' project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Image collection to query.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Base URL of the REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// OAuth2 token endpoint used to exchange the refresh token.
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            project: None,
            collection: default_collection(),
            api_url: default_api_url(),
            token_url: default_token_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_collection() -> String {
    "COPERNICUS/S2_SR_HARMONIZED".to_string()
}

fn default_api_url() -> String {
    "https://earthengine.googleapis.com/v1".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_timeout() -> u64 {
    300
}

/// Where credentials come from and whether they are written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Environment variable holding the credential JSON.
    #[serde(default = "default_env_var")]
    pub env_var: String,

    /// Target file for the credential copy. Defaults to
    /// `~/.config/earthengine/credentials`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Write the credentials to `path` before connecting.
    #[serde(default = "default_true")]
    pub persist: bool,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_var: default_env_var(),
            path: None,
            persist: true,
        }
    }
}

fn default_env_var() -> String {
    "EE_AUTHENTICATION".to_string()
}

/// Bucketing and image filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Bucket width in days.
    #[serde(default = "default_interval")]
    pub interval_days: u32,

    /// Maximum allowed cloud percentage (exclusive).
    #[serde(default = "default_cloud_threshold")]
    pub cloud_threshold: f64,

    /// Image property holding the cloud percentage.
    #[serde(default = "default_cloud_property")]
    pub cloud_property: String,

    /// Sampling scale in meters.
    #[serde(default = "default_scale")]
    pub scale_meters: f64,

    /// Cap the last bucket's query at the end date.
    #[serde(default)]
    pub clamp_final_bucket: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            interval_days: default_interval(),
            cloud_threshold: default_cloud_threshold(),
            cloud_property: default_cloud_property(),
            scale_meters: default_scale(),
            clamp_final_bucket: false,
        }
    }
}

fn default_interval() -> u32 {
    15
}

fn default_cloud_threshold() -> f64 {
    20.0
}

fn default_cloud_property() -> String {
    "CLOUDY_PIXEL_PERCENTAGE".to_string()
}

fn default_scale() -> f64 {
    10.0 // native resolution of the visible bands
}

/// Band pairs and names of the derived indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicesConfig {
    #[serde(default = "default_ndvi_bands")]
    pub ndvi_bands: [String; 2],

    #[serde(default = "default_ndwi_bands")]
    pub ndwi_bands: [String; 2],

    #[serde(default = "default_ndvi_name")]
    pub ndvi_name: String,

    #[serde(default = "default_ndwi_name")]
    pub ndwi_name: String,
}

impl Default for IndicesConfig {
    fn default() -> Self {
        Self {
            ndvi_bands: default_ndvi_bands(),
            ndwi_bands: default_ndwi_bands(),
            ndvi_name: default_ndvi_name(),
            ndwi_name: default_ndwi_name(),
        }
    }
}

fn default_ndvi_bands() -> [String; 2] {
    [NDVI_BANDS.0.to_string(), NDVI_BANDS.1.to_string()]
}

fn default_ndwi_bands() -> [String; 2] {
    [NDWI_BANDS.0.to_string(), NDWI_BANDS.1.to_string()]
}

fn default_ndvi_name() -> String {
    NDVI_NAME.to_string()
}

fn default_ndwi_name() -> String {
    NDWI_NAME.to_string()
}

/// CSV export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Keep the historical `Custom_ND VI` label on the water index column.
    #[serde(default = "default_true")]
    pub legacy_header: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            legacy_header: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A point entry in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointConfig {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub name: Option<String>,
}

impl PointConfig {
    /// Convert to a [`Point`], naming it after its position when unnamed.
    pub fn to_point(&self, index: usize) -> Point {
        let name = match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Point {}", index + 1),
        };
        Point::new(self.lon, self.lat, name)
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref project) = args.project {
            self.service.project = Some(project.clone());
        }
        if let Some(ref collection) = args.collection {
            self.service.collection = collection.clone();
        }
        if let Some(timeout) = args.timeout {
            self.service.timeout_seconds = timeout;
        }

        if let Some(interval) = args.interval {
            self.analysis.interval_days = interval;
        }
        if let Some(threshold) = args.cloud_threshold {
            self.analysis.cloud_threshold = threshold;
        }
        if let Some(scale) = args.scale {
            self.analysis.scale_meters = scale;
        }
        if args.clamp_final_bucket {
            self.analysis.clamp_final_bucket = true;
        }

        if args.ndwi_header {
            self.export.legacy_header = false;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
    }

    /// Points from the config file.
    pub fn points(&self) -> Vec<Point> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| p.to_point(i))
            .collect()
    }

    /// Default credentials target, `~/.config/earthengine/credentials`.
    pub fn credentials_path(&self) -> PathBuf {
        if let Some(ref path) = self.credentials.path {
            return path.clone();
        }
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("earthengine").join("credentials")
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.collection, "COPERNICUS/S2_SR_HARMONIZED");
        assert_eq!(config.analysis.interval_days, 15);
        assert_eq!(config.analysis.cloud_threshold, 20.0);
        assert_eq!(config.analysis.scale_meters, 10.0);
        assert!(!config.analysis.clamp_final_bucket);
        assert_eq!(config.credentials.env_var, "EE_AUTHENTICATION");
        assert!(config.export.legacy_header);
        assert_eq!(config.general.output, "results.csv");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[service]
project = "my-ee-project"
timeout_seconds = 60

[analysis]
interval_days = 10
cloud_threshold = 35.5
clamp_final_bucket = true

[indices]
ndvi_bands = ["B8", "B4"]

[[points]]
lat = 41.9028
lon = 12.4964
name = "Rome"

[[points]]
lat = 0.0
lon = 0.0
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.service.project.as_deref(), Some("my-ee-project"));
        assert_eq!(config.service.timeout_seconds, 60);
        assert_eq!(config.analysis.interval_days, 10);
        assert_eq!(config.analysis.cloud_threshold, 35.5);
        assert!(config.analysis.clamp_final_bucket);
        assert_eq!(config.indices.ndvi_bands, ["B8".to_string(), "B4".to_string()]);
        assert_eq!(config.indices.ndwi_bands, ["B3".to_string(), "B2".to_string()]);

        let points = config.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], Point::new(12.4964, 41.9028, "Rome"));
        assert_eq!(points[1].name, "Point 2");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[service]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[export]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.analysis.interval_days, 15);
    }

    #[test]
    fn test_logging_is_not_a_config_setting() {
        // Verbosity comes from --verbose/--quiet only
        assert!(!Config::default_toml().contains("verbose"));

        let config: Config = toml::from_str(
            r#"
[general]
output = "out.csv"
verbose = true
"#,
        )
        .unwrap();
        assert_eq!(config.general.output, "out.csv");
    }

    #[test]
    fn test_explicit_credentials_path() {
        let mut config = Config::default();
        config.credentials.path = Some(PathBuf::from("/tmp/ee/creds"));
        assert_eq!(config.credentials_path(), PathBuf::from("/tmp/ee/creds"));

        config.credentials.path = None;
        assert!(config
            .credentials_path()
            .ends_with(".config/earthengine/credentials"));
    }
}
