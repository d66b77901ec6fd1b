//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Point;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// s2index - Sentinel-2 NDVI and NDWI analysis
///
/// Computes mean vegetation and water index values for each point over
/// fixed-width date buckets and exports them as CSV.
///
/// Examples:
///   s2index --point 41.9028,12.4964,Rome --start 2024-01-01 --end 2024-03-31
///   s2index --points-file sites.csv --interval 10 --cloud-threshold 15
///   s2index --point 0,0,Origin --start 2024-01-01 --end 2024-01-31 --dry-run
///   s2index --show results.csv
///   s2index --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Point to sample as LAT,LON[,NAME] (repeatable)
    ///
    /// Unnamed points are called "Point N" after their position.
    #[arg(short, long = "point", value_name = "LAT,LON[,NAME]", value_parser = parse_point)]
    pub points: Vec<PointArg>,

    /// CSV file with `lat,lon,name` columns
    #[arg(long, value_name = "FILE")]
    pub points_file: Option<PathBuf>,

    /// First day of the analysis (YYYY-MM-DD, default: today)
    #[arg(short, long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Last day of the analysis (YYYY-MM-DD, default: today)
    #[arg(short, long, value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Bucket width in days (default: 15)
    #[arg(short, long, value_name = "DAYS")]
    pub interval: Option<u32>,

    /// Maximum allowable CLOUDY_PIXEL_PERCENTAGE (default: 20)
    #[arg(long, value_name = "PERCENT")]
    pub cloud_threshold: Option<f64>,

    /// Sampling scale in meters (default: 10)
    #[arg(long, value_name = "METERS")]
    pub scale: Option<f64>,

    /// Earth Engine cloud project
    #[arg(long, env = "EE_PROJECT", value_name = "PROJECT")]
    pub project: Option<String>,

    /// Image collection to query
    #[arg(long, value_name = "ID")]
    pub collection: Option<String>,

    /// Cap the last bucket at the end date instead of a full interval
    #[arg(long)]
    pub clamp_final_bucket: bool,

    /// Label the water index column `Custom_NDWI` instead of `Custom_ND VI`
    #[arg(long)]
    pub ndwi_header: bool,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output file path for the CSV export (default: results.csv)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// How to display the result table
    #[arg(long, default_value = "table", value_name = "FORMAT")]
    pub format: DisplayFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .s2index.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the date buckets without contacting Earth Engine
    #[arg(long)]
    pub dry_run: bool,

    /// Display a previously exported results file and exit
    #[arg(long, value_name = "FILE", conflicts_with = "dry_run")]
    pub show: Option<PathBuf>,

    /// Generate a default .s2index.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// A point given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct PointArg {
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
}

impl PointArg {
    pub fn to_point(&self, index: usize) -> Point {
        let name = match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Point {}", index + 1),
        };
        Point::new(self.lon, self.lat, name)
    }
}

/// Parse `LAT,LON[,NAME]`. The name may itself contain commas.
fn parse_point(s: &str) -> Result<PointArg, String> {
    let mut parts = s.splitn(3, ',');
    let lat = parts
        .next()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| "missing latitude".to_string())?
        .parse::<f64>()
        .map_err(|e| format!("invalid latitude: {}", e))?;
    let lon = parts
        .next()
        .map(str::trim)
        .ok_or_else(|| "expected LAT,LON[,NAME]".to_string())?
        .parse::<f64>()
        .map_err(|e| format!("invalid longitude: {}", e))?;
    let name = parts.next().map(|n| n.trim().to_string());

    Ok(PointArg { lat, lon, name })
}

/// Display format for the result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DisplayFormat {
    /// Aligned plain-text table (default)
    #[default]
    Table,
    /// Markdown table
    Markdown,
    /// JSON array
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config and --show
        if self.init_config || self.show.is_some() {
            return Ok(());
        }

        if let Some(interval) = self.interval {
            if interval == 0 {
                return Err("Interval must be at least 1 day".to_string());
            }
        }

        if let Some(threshold) = self.cloud_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err("Cloud threshold must be 0.0 or greater".to_string());
            }
        }

        if let Some(scale) = self.scale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err("Scale must be a positive number of meters".to_string());
            }
        }

        for (i, point) in self.points.iter().enumerate() {
            point.to_point(i).validate()?;
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref path) = self.points_file {
            if !path.is_file() {
                return Err(format!("Points file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Points given with `--point`, in input order.
    pub fn cli_points(&self) -> Vec<Point> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| p.to_point(i))
            .collect()
    }
}
