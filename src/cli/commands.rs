use crate::archive::HistoryProduct;
use crate::cli::args::{Cli, Commands};
use crate::client::{BomClient, OpenMeteoClient};
use crate::pipelines::{
    city_selected, combine_cities, ForecastPipeline, HistoryPipeline, ObservationPipeline,
    OpenMeteoPipeline, RunReport,
};
use crate::processors::combine_raw;
use crate::settings::Settings;
use crate::storage::{repair_tree, PartitionStore};
use crate::utils::constants::AXF_NUMERIC_COLUMNS;
use crate::writers::ParquetWriter;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let quiet = cli.log_file.is_some();

    match cli.command {
        Commands::Scrape { city } => {
            let client = BomClient::new()?;
            let mut report = observe(&settings, &client, city.as_deref(), quiet).await?;
            report.merge(forecast(&settings, &client, city.as_deref()).await?);
            finish("Scrape", &report);
        }

        Commands::Observe { city } => {
            let client = BomClient::new()?;
            let report = observe(&settings, &client, city.as_deref(), quiet).await?;
            finish("Observe", &report);
        }

        Commands::Forecast { city } => {
            let client = BomClient::new()?;
            let report = forecast(&settings, &client, city.as_deref()).await?;
            finish("Forecast", &report);
        }

        Commands::ForecastPage { city } => {
            if !featured_selected(&settings, city.as_deref()) {
                return Ok(());
            }
            let client = BomClient::new()?;
            let days = ForecastPipeline::new(&settings)?
                .run_page(&client)
                .await
                .context("Forecast page scrape failed")?;
            println!("Forecast page: {} days", days.len());
        }

        Commands::History {
            city,
            from_file,
            product,
            climate,
        } => {
            if !featured_selected(&settings, city.as_deref()) {
                return Ok(());
            }
            let pipeline = HistoryPipeline::new(&settings);

            if let Some(path) = from_file {
                let product = HistoryProduct::from(product);
                let days = pipeline
                    .ingest_file(&path, product)
                    .with_context(|| format!("Failed to import {}", path.display()))?;
                println!("{}: {} days imported from {}", product, days, path.display());
            } else {
                let client = BomClient::new()?;
                let report = pipeline.run(&client).await?;
                finish("History", &report);

                if climate {
                    let rows = pipeline
                        .run_climate(&client)
                        .await
                        .context("Climate table fetch failed")?;
                    println!("Climate table: {} rows", rows);
                }
            }
        }

        Commands::ClimateStats { city } => {
            if !featured_selected(&settings, city.as_deref()) {
                return Ok(());
            }
            HistoryPipeline::new(&settings)
                .write_climate_stats()
                .context("Failed to write climate statistics")?;
            println!("Climate statistics written to {}", settings.static_dir.display());
        }

        Commands::OpenMeteo { city } => {
            let client = OpenMeteoClient::new(&settings.open_meteo)?;
            let report = OpenMeteoPipeline::new(&settings)?
                .silent(quiet)
                .run(&client, city.as_deref())
                .await
                .context("Open-Meteo run failed")?;
            finish("Open-Meteo", &report);
        }

        Commands::Combine { city } => {
            let built = combine_cities(&settings, city.as_deref(), Utc::now())
                .context("Combine failed")?;
            println!("Combined {} cities: {}", built.len(), built.join(", "));
        }

        Commands::CombineRaw { city } => {
            let mut report = RunReport::default();
            for station in settings
                .stations
                .iter()
                .filter(|s| city_selected(city.as_deref(), &s.city))
            {
                let output = settings.data_dir.join(format!("{}.csv", station.city));
                if let Some(Some(rows)) =
                    report.record(&station.city, combine_raw(&settings.raw_dir(), &station.city, &output))
                {
                    println!("{}: {} rows -> {}", station.city, rows, output.display());
                }
            }
            finish("Combine raw", &report);
        }

        Commands::Repair { city, dir } => {
            let root = match (dir, city) {
                (Some(dir), _) => dir,
                (None, Some(city)) => settings.observations_dir(&city),
                (None, None) => settings.data_dir.clone(),
            };
            let writer = ParquetWriter::new().with_compression(&settings.compression)?;
            let report = repair_tree(&writer, &root, AXF_NUMERIC_COLUMNS)
                .with_context(|| format!("Repair of {} failed", root.display()))?;
            println!("{}", report.summary());
        }

        Commands::Info { city, file } => {
            let path = match city {
                Some(city) if file.is_relative() && !file.exists() => {
                    settings.observations_dir(&city).join(&file)
                }
                _ => file,
            };
            show_info(&path)?;
        }
    }

    Ok(())
}

async fn observe(
    settings: &Settings,
    client: &BomClient,
    city: Option<&str>,
    quiet: bool,
) -> Result<RunReport> {
    ObservationPipeline::new(settings)?
        .silent(quiet)
        .run(client, city)
        .await
        .context("Observation run failed")
}

async fn forecast(settings: &Settings, client: &BomClient, city: Option<&str>) -> Result<RunReport> {
    ForecastPipeline::new(settings)?
        .run(client, city)
        .await
        .context("Forecast run failed")
}

fn featured_selected(settings: &Settings, city: Option<&str>) -> bool {
    let selected = city_selected(city, &settings.featured_city);
    if !selected {
        warn!(
            featured = %settings.featured_city,
            "Only the featured city has this product"
        );
    }
    selected
}

fn finish(job: &str, report: &RunReport) {
    info!(job, succeeded = report.succeeded.len(), failed = report.failed.len(), "Finished");
    println!("{}: {}", job, report.summary());
}

fn show_info(path: &Path) -> Result<()> {
    let writer = ParquetWriter::new();

    if path.is_dir() {
        let store = PartitionStore::new(path);
        let partitions = store.list_partitions()?;
        println!("{} partitions in {}", partitions.len(), path.display());
        for partition in partitions {
            let info = writer
                .get_file_info(&partition)
                .with_context(|| format!("Failed to read {}", partition.display()))?;
            let text_columns = info.text_columns();
            if text_columns.is_empty() {
                println!("  {}: {} rows", partition.display(), info.rows);
            } else {
                println!(
                    "  {}: {} rows, text columns: {}",
                    partition.display(),
                    info.rows,
                    text_columns.join(", ")
                );
            }
        }
        return Ok(());
    }

    let info = writer
        .get_file_info(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    println!("{}", info.summary());
    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
