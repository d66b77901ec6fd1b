//! s2index - Sentinel-2 NDVI and NDWI analysis
//!
//! A CLI tool that samples Sentinel-2 imagery through the Earth Engine
//! REST API and reports mean vegetation and water index values per point
//! and per date bucket.
//!
//! Exit codes:
//!   0 - Success (including runs that produced no rows)
//!   1 - Runtime error (missing credentials, config, service failure, etc.)

mod analysis;
mod cli;
mod config;
mod credentials;
mod error;
mod indices;
mod models;
mod points;
mod report;
mod service;

use analysis::{generate_buckets, AggregationSettings, WindowAggregator};
use anyhow::{bail, Context, Result};
use chrono::Local;
use cli::{Args, DisplayFormat};
use config::Config;
use credentials::Credentials;
use indices::IndexCalculator;
use models::{AnalysisRequest, Point, ResultTable};
use service::{EarthEngineClient, EarthEngineOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("s2index v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = match args.show.clone() {
        Some(path) => handle_show(&path, &args),
        None => run_analysis(args).await,
    };

    match result {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .s2index.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE_NAME);
    println!("   Edit it to set your project, points, bands and thresholds.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete analysis workflow. Returns the exit code.
async fn run_analysis(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let request = build_request(&args, &config)?;
    let mut settings = AggregationSettings::from(&config);
    settings.show_progress = !args.quiet;

    println!("🛰️  Sentinel-2 NDVI and NDWI Analysis");
    println!("   Collection: {}", settings.collection);
    println!("   Points: {}", request.points.len());
    for point in &request.points {
        println!("     📍 {}", point);
    }
    println!(
        "   Dates: {} to {} every {} day(s)",
        request.start, request.end, request.interval_days
    );
    println!(
        "   Max {}: {}",
        settings.cloud_property, request.cloud_threshold
    );

    // Handle --dry-run: list buckets and exit
    if args.dry_run {
        return handle_dry_run(&request, &settings);
    }

    // Step 1: Credentials. Nothing remote happens without them.
    let credentials = Credentials::from_env(&config.credentials.env_var)?;
    if config.credentials.persist {
        credentials.persist(&config.credentials_path())?;
    }

    // Step 2: Connect
    let options = EarthEngineOptions {
        api_url: config.service.api_url.clone(),
        token_url: config.service.token_url.clone(),
        project: config.service.project.clone(),
        timeout_seconds: config.service.timeout_seconds,
    };
    let client = EarthEngineClient::new(credentials, options)?;
    println!("   Project: {}", client.project());

    // Step 3: Aggregate
    println!("\n🔬 Running analysis...");
    let aggregator = WindowAggregator::new(&client, IndexCalculator::from(&config.indices), settings);
    let outcome = aggregator.run(&request).await?;

    // Step 4: Display
    let legacy = config.export.legacy_header;
    println!();
    if outcome.table.is_empty() {
        println!("   No bucket had qualifying imagery with valid samples.");
    }
    print!("{}", render_table(&outcome.table, args.format, legacy)?);

    // Step 5: Export
    let export = report::export(&outcome.table, legacy)?;
    let output = PathBuf::from(&config.general.output);
    let output = report::write_csv(&export, &output)
        .with_context(|| format!("Failed to write results to {}", output.display()))?;

    println!("\n📊 Analysis Summary:");
    println!("{}", report::generate_summary(&outcome.summary));
    println!(
        "\n✅ Analysis complete! Results saved to: {} ({})",
        output.display(),
        export.mime_type
    );

    Ok(0)
}

/// Assemble the analysis request from arguments and configuration.
fn build_request(args: &Args, config: &Config) -> Result<AnalysisRequest> {
    let mut points: Vec<Point> = args.cli_points();
    if let Some(ref path) = args.points_file {
        let from_file = crate::points::load_points_file(path, points.len())?;
        info!("Loaded {} point(s) from {}", from_file.len(), path.display());
        points.extend(from_file);
    }
    if points.is_empty() {
        points = config.points();
        for point in &points {
            point.validate().map_err(anyhow::Error::msg)?;
        }
    }
    if points.is_empty() {
        bail!("No points given: use --point, --points-file or [[points]] in the config file");
    }

    if config.analysis.interval_days == 0 {
        bail!("Interval must be at least 1 day");
    }
    if !config.analysis.cloud_threshold.is_finite() || config.analysis.cloud_threshold < 0.0 {
        bail!("Cloud threshold must be 0.0 or greater");
    }
    if !config.analysis.scale_meters.is_finite() || config.analysis.scale_meters <= 0.0 {
        bail!("Scale must be a positive number of meters");
    }

    let today = Local::now().date_naive();
    let start = args.start.unwrap_or(today);
    let end = args.end.unwrap_or(today);
    if end < start {
        warn!("End date {} is before start date {}", end, start);
    }

    Ok(AnalysisRequest {
        points,
        start,
        end,
        interval_days: config.analysis.interval_days,
        cloud_threshold: config.analysis.cloud_threshold,
    })
}

/// Handle --dry-run: print the buckets that would be queried.
fn handle_dry_run(request: &AnalysisRequest, settings: &AggregationSettings) -> Result<i32> {
    println!("\n🔍 Dry run: date buckets (no Earth Engine calls)...\n");

    let buckets = generate_buckets(
        request.start,
        request.end,
        request.interval_days,
        settings.clamp_final_bucket,
    );

    if buckets.is_empty() {
        println!("   No buckets: the end date is before the start date.");
    } else {
        for bucket in &buckets {
            let note = if bucket.overruns(request.end) {
                "  (extends past end date)"
            } else {
                ""
            };
            println!("     📅 {} {} day(s){}", bucket, bucket.days(), note);
        }
        println!(
            "\n   Total: {} bucket(s) x {} point(s)",
            buckets.len(),
            request.points.len()
        );
    }

    println!("\n✅ Dry run complete. No remote calls were made.");
    Ok(0)
}

/// Handle --show: display an existing results file.
fn handle_show(path: &Path, args: &Args) -> Result<i32> {
    let mut config = load_config(args)?;
    config.merge_with_args(args);

    let table = report::load_csv(path)
        .with_context(|| format!("Failed to read results from {}", path.display()))?;
    info!("Loaded {} row(s) from {}", table.len(), path.display());

    print!(
        "{}",
        render_table(&table, args.format, config.export.legacy_header)?
    );
    Ok(0)
}

fn render_table(table: &ResultTable, format: DisplayFormat, legacy: bool) -> Result<String> {
    let columns = report::header(legacy);
    Ok(match format {
        DisplayFormat::Table => report::generate_text_table(table, &columns),
        DisplayFormat::Markdown => report::generate_markdown_table(table, &columns),
        DisplayFormat::Json => report::generate_json_table(table)? + "\n",
    })
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
