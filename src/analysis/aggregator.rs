//! Window aggregation.
//!
//! Drives the bucket loop: for every date bucket it asks the imagery service
//! whether any image passes the cloud filter, then samples each point and
//! reduces the per-pixel index values to one mean per band.

use super::buckets::generate_buckets;
use crate::config::Config;
use crate::error::ServiceError;
use crate::indices::IndexCalculator;
use crate::models::{AnalysisOutcome, AnalysisRequest, DateBucket, ResultRow};
use crate::service::{CatalogWindow, ImageryService, RegionTable};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Query settings that stay fixed for a whole run.
#[derive(Debug, Clone)]
pub struct AggregationSettings {
    pub collection: String,
    pub cloud_property: String,
    pub scale_meters: f64,
    pub clamp_final_bucket: bool,
    pub show_progress: bool,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AggregationSettings {
    fn from(config: &Config) -> Self {
        Self {
            collection: config.service.collection.clone(),
            cloud_property: config.analysis.cloud_property.clone(),
            scale_meters: config.analysis.scale_meters,
            clamp_final_bucket: config.analysis.clamp_final_bucket,
            show_progress: false,
        }
    }
}

/// Arithmetic mean of the defined, finite samples. `None` when there are none.
pub fn mean_valid<I>(samples: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = samples
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Progress bar that clears itself however the run ends.
struct Progress(ProgressBar);

impl Progress {
    fn new(show: bool, len: usize) -> Self {
        if !show {
            return Self(ProgressBar::hidden());
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        Self(pb)
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}

/// Computes per-point, per-bucket index means through an [`ImageryService`].
pub struct WindowAggregator<'a, S: ImageryService + ?Sized> {
    service: &'a S,
    calculator: IndexCalculator,
    settings: AggregationSettings,
}

impl<'a, S: ImageryService + ?Sized> WindowAggregator<'a, S> {
    pub fn new(service: &'a S, calculator: IndexCalculator, settings: AggregationSettings) -> Self {
        Self {
            service,
            calculator,
            settings,
        }
    }

    /// The date buckets a request will be split into.
    pub fn buckets(&self, request: &AnalysisRequest) -> Vec<DateBucket> {
        generate_buckets(
            request.start,
            request.end,
            request.interval_days,
            self.settings.clamp_final_bucket,
        )
    }

    fn window(&self, bucket: DateBucket, max_cloud: f64) -> CatalogWindow {
        CatalogWindow {
            collection: self.settings.collection.clone(),
            bucket,
            cloud_property: self.settings.cloud_property.clone(),
            max_cloud,
        }
    }

    /// Mean vegetation and water index of a region table.
    ///
    /// Returns `Ok(None)` when either band has no valid sample.
    pub fn reduce(&self, table: &RegionTable) -> Result<Option<(f64, f64)>, ServiceError> {
        if table.is_empty() {
            return Ok(None);
        }

        if let Some(missing) = self
            .calculator
            .input_bands()
            .into_iter()
            .find(|band| table.column(band).is_none())
        {
            return Err(ServiceError::MalformedResponse(format!(
                "region table has no {} column",
                missing
            )));
        }

        let indexed = self.calculator.apply_all(&table.observations());
        let images: BTreeSet<&str> = indexed
            .iter()
            .filter_map(|o| o.image_id.as_deref())
            .collect();
        let acquired: BTreeSet<NaiveDate> = indexed.iter().filter_map(|o| o.acquired_on()).collect();
        match (acquired.first(), acquired.last()) {
            (Some(first), Some(last)) => debug!(
                "{} sample(s) from {} image(s) acquired {} to {}",
                indexed.len(),
                images.len(),
                first,
                last
            ),
            _ => debug!("{} sample(s) from {} image(s)", indexed.len(), images.len()),
        }

        let ndvi = mean_valid(indexed.iter().map(|o| o.band(&self.calculator.vegetation.name)));
        let ndwi = mean_valid(indexed.iter().map(|o| o.band(&self.calculator.water.name)));

        Ok(ndvi.zip(ndwi))
    }

    /// Run the full bucket loop. Any service error aborts the run.
    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, ServiceError> {
        let started = Instant::now();
        let buckets = self.buckets(request);

        if buckets.is_empty() {
            warn!(
                "End date {} is before start date {}; nothing to analyze",
                request.end, request.start
            );
        }
        if let Some(last) = buckets.last() {
            if last.overruns(request.end) {
                debug!(
                    "Final bucket {} extends past the end date {}",
                    last, request.end
                );
            }
        }

        info!(
            "Analyzing {} point(s) over {} bucket(s) of {} day(s)",
            request.points.len(),
            buckets.len(),
            request.interval_days
        );

        let progress = Progress::new(self.settings.show_progress, buckets.len());
        let mut outcome = AnalysisOutcome::default();
        outcome.summary.buckets = buckets.len();

        for bucket in &buckets {
            progress.0.set_message(format!("Running analysis... {}", bucket));
            let window = self.window(*bucket, request.cloud_threshold);

            let count = self.service.count_images(&window).await?;
            if count == 0 {
                debug!("No images below {}% cloud in {}", request.cloud_threshold, bucket);
                outcome.summary.empty_buckets += 1;
                progress.0.inc(1);
                continue;
            }
            debug!("{} image(s) in {}", count, bucket);

            for point in &request.points {
                let table = self
                    .service
                    .region(&window, point, self.settings.scale_meters)
                    .await?;

                match self.reduce(&table)? {
                    Some((ndvi, ndwi)) => {
                        debug!("{} {}: ndvi={:.4} ndwi={:.4}", bucket, point.name, ndvi, ndwi);
                        outcome.table.push(ResultRow {
                            date: bucket.start,
                            location: point.name.clone(),
                            ndvi,
                            ndwi,
                        });
                    }
                    None => {
                        debug!("No valid samples for {} in {}", point.name, bucket);
                        outcome.summary.omitted_pairs += 1;
                    }
                }
            }

            progress.0.inc(1);
        }

        outcome.summary.rows = outcome.table.len();
        outcome.summary.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            "Analysis complete: {} row(s), {} empty bucket(s)",
            outcome.summary.rows, outcome.summary.empty_buckets
        );

        Ok(outcome)
    }
}
