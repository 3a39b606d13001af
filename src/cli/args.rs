use crate::archive::HistoryProduct;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bom-weather")]
#[command(about = "Scrape BOM and Open-Meteo weather feeds into Parquet partitions and dashboard JSON")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Config file [default: bom-weather.toml if present]")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch observations, then forecasts
    Scrape {
        #[arg(long)]
        city: Option<String>,
    },

    /// Fetch the AXF observation feed of every station
    Observe {
        #[arg(long)]
        city: Option<String>,
    },

    /// Fetch the précis forecast XML feeds
    Forecast {
        #[arg(long)]
        city: Option<String>,
    },

    /// Scrape the featured city's HTML forecast page
    ForecastPage {
        #[arg(long)]
        city: Option<String>,
    },

    /// Download the featured station's full daily history
    History {
        #[arg(long)]
        city: Option<String>,

        #[arg(long, help = "Import a local history file (zip or CSV) instead of downloading")]
        from_file: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "rainfall", help = "Product of --from-file")]
        product: ProductArg,

        #[arg(long, help = "Also fetch the climate statistics table")]
        climate: bool,
    },

    /// Write the static long-term climate statistics
    ClimateStats {
        #[arg(long)]
        city: Option<String>,
    },

    /// Fetch Open-Meteo history and forecasts
    OpenMeteo {
        #[arg(long)]
        city: Option<String>,
    },

    /// Merge Open-Meteo observations and forecasts into per-city dashboard files
    Combine {
        #[arg(long)]
        city: Option<String>,
    },

    /// Rebuild per-city CSVs from the raw snapshots
    CombineRaw {
        #[arg(long)]
        city: Option<String>,
    },

    /// Cast text-typed numeric columns in stored partitions back to numbers
    Repair {
        #[arg(long)]
        city: Option<String>,

        #[arg(short, long, help = "Directory to repair [default: the data directory]")]
        dir: Option<PathBuf>,
    },

    /// Display information about a Parquet file or partition directory
    Info {
        #[arg(long)]
        city: Option<String>,

        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProductArg {
    Rainfall,
    MaxTemperature,
    MinTemperature,
}

impl From<ProductArg> for HistoryProduct {
    fn from(arg: ProductArg) -> Self {
        match arg {
            ProductArg::Rainfall => HistoryProduct::Rainfall,
            ProductArg::MaxTemperature => HistoryProduct::MaxTemperature,
            ProductArg::MinTemperature => HistoryProduct::MinTemperature,
        }
    }
}
