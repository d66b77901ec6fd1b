//! Imagery service access.
//!
//! The aggregator only sees the [`ImageryService`] trait; the Earth Engine
//! REST client is the production implementation.

pub mod earth_engine;
pub mod expression;
pub mod region;

pub use earth_engine::{EarthEngineClient, EarthEngineOptions};
pub use region::{Observation, RegionTable};

use crate::error::ServiceError;
use crate::models::{DateBucket, Point};
use async_trait::async_trait;

/// A filtered view of an image collection: one date window, one cloud cut-off.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogWindow {
    pub collection: String,
    pub bucket: DateBucket,
    /// Image property compared against `max_cloud`.
    pub cloud_property: String,
    /// Images qualify when their cloud property is strictly below this.
    pub max_cloud: f64,
}

/// Queries the aggregator issues against the imagery catalog.
#[async_trait]
pub trait ImageryService: Send + Sync {
    /// Number of images in the window.
    async fn count_images(&self, window: &CatalogWindow) -> Result<u64, ServiceError>;

    /// Per-pixel values of every image in the window at `point`.
    async fn region(
        &self,
        window: &CatalogWindow,
        point: &Point,
        scale: f64,
    ) -> Result<RegionTable, ServiceError>;
}
