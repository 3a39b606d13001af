use bom_weather::archive::HistoryProduct;
use bom_weather::models::{GeoLocation, HourlySeries};
use bom_weather::pipelines::open_meteo::load_geocode_cache;
use bom_weather::pipelines::{
    combine_cities, ForecastPipeline, HistoryPipeline, ObservationPipeline, OpenMeteoPipeline,
};
use bom_weather::processors::combine_raw;
use bom_weather::storage::columns::f64_column;
use bom_weather::storage::PartitionStore;
use bom_weather::utils::time::from_unix_seconds;
use bom_weather::writers::{read_json, write_json, ParquetWriter};
use bom_weather::{Result, Settings};
use chrono::{DateTime, NaiveDate, TimeZone};
use chrono_tz::Tz;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

const AXF: &str = include_str!("fixtures/IDV60901.95936.axf");
const FORECAST_XML: &str = include_str!("fixtures/IDV10753.xml");
const RAIN_HISTORY: &str = include_str!("fixtures/IDCJAC0009_086338_1800_Data.csv");
const CLIMATE_TABLE: &str = include_str!("fixtures/IDCJCM0035_086338.csv");

// 2025-10-25T00:00:00Z
const MIDNIGHT_UTC: i64 = 1_761_350_400;

fn settings_in(root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.data_dir = root.join("data");
    settings.static_dir = root.join("static");
    settings.open_meteo.base_dir = root.join("new_data");
    settings.combiner.output_dir = root.join("cities");
    settings
}

fn melbourne_morning() -> DateTime<Tz> {
    chrono_tz::Australia::Melbourne
        .with_ymd_and_hms(2025, 10, 25, 10, 15, 0)
        .unwrap()
}

fn read_value(path: &Path) -> Value {
    read_json(path).unwrap()
}

#[test]
fn test_observe_writes_partitions_and_summaries() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_in(dir.path());
    let pipeline = ObservationPipeline::new(&settings)?;

    let outcome = pipeline.ingest("Melbourne", AXF, melbourne_morning())?;

    assert_eq!(outcome.partitions.len(), 1);
    assert_eq!(outcome.partitions[0].rows, 3);
    assert!(outcome.partitions[0].path.ends_with("new/Melbourne/2025-10.parquet"));
    assert_eq!(outcome.legacy_rows, 3);
    assert!(outcome.summaries_written);
    assert!(settings.data_dir.join("Melbourne.csv").exists());
    assert!(settings
        .raw_dir()
        .join("20251025")
        .join("Melbourne_10.csv")
        .exists());

    // "Trace" before the 9am reset leaves the day's rain unknown
    assert_eq!(
        read_value(&settings.static_dir.join("observations.json")),
        json!([{"Date": "2025-10-25", "Temp": 15.2, "Rain": null, "Wind": 15.0, "Humidity": 61.0}])
    );

    let last30 = read_value(&settings.static_dir.join("last30.json"));
    assert_eq!(
        last30,
        json!([
            {"Date": "2025-10-25", "Hour": 8, "Temp": 13.4, "Rain": null, "Wind": 11.0, "Humidity": 67.0},
            {"Date": "2025-10-25", "Hour": 9, "Temp": 14.6, "Rain": 0.8, "Wind": null, "Humidity": 60.0},
            {"Date": "2025-10-25", "Hour": 10, "Temp": 15.2, "Rain": 1.2, "Wind": 15.0, "Humidity": 56.0},
        ])
    );
    Ok(())
}

#[test]
fn test_observe_reingest_keeps_newest_row() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_in(dir.path());
    let pipeline = ObservationPipeline::new(&settings)?;

    pipeline.ingest("Sydney", AXF, melbourne_morning())?;
    let revised = AXF.replace(",24,13,15.2,", ",24,13,15.9,");
    let outcome = pipeline.ingest("Sydney", &revised, melbourne_morning())?;

    assert_eq!(outcome.partitions[0].rows, 3);
    assert!(!outcome.summaries_written);

    let batch = PartitionStore::new(settings.observations_dir("Sydney"))
        .read_all()?
        .expect("partition written");
    // Sorted ascending by key; the 10:00 reading is last
    assert_eq!(
        f64_column(&batch, "air_temp")?,
        vec![Some(13.4), Some(14.6), Some(15.9)]
    );
    assert!(!settings.static_dir.join("observations.json").exists());
    Ok(())
}

#[test]
fn test_observe_then_combine_raw_snapshots() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_in(dir.path());
    let pipeline = ObservationPipeline::new(&settings)?;

    pipeline.ingest("Hobart", AXF, melbourne_morning())?;
    let later = melbourne_morning() + chrono::Duration::hours(2);
    pipeline.ingest("Hobart", AXF, later)?;

    let output = settings.data_dir.join("Hobart.csv");
    let rows = combine_raw(&settings.raw_dir(), "Hobart", &output)?;
    assert_eq!(rows, Some(3));
    Ok(())
}

#[test]
fn test_observe_without_readable_times_keeps_previous_csv() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_in(dir.path());
    let pipeline = ObservationPipeline::new(&settings)?;

    pipeline.ingest("Darwin", AXF, melbourne_morning())?;
    let csv_path = settings.data_dir.join("Darwin.csv");
    let before = std::fs::read_to_string(&csv_path)?;

    let untimed = AXF
        .replace("\"25/10:00am\"", "\"-\"")
        .replace("\"25/09:30am\"", "\"-\"")
        .replace("\"25/08:30am\"", "\"-\"");
    let later = melbourne_morning() + chrono::Duration::hours(1);
    let outcome = pipeline.ingest("Darwin", &untimed, later)?;

    assert_eq!(outcome.legacy_rows, 0);
    assert_eq!(outcome.snapshot, None);
    assert_eq!(outcome.partitions[0].rows, 3);
    assert_eq!(std::fs::read_to_string(&csv_path)?, before);

    let output = dir.path().join("Darwin_combined.csv");
    assert_eq!(combine_raw(&settings.raw_dir(), "Darwin", &output)?, Some(3));
    Ok(())
}

#[test]
fn test_last_updated_stamp() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_in(dir.path());
    ObservationPipeline::new(&settings)?.write_last_updated(melbourne_morning())?;

    assert_eq!(
        read_value(&settings.static_dir.join("last_updated.json")),
        json!({"lastUpdated": "2025-10-25T10:15:00+11:00"})
    );
    Ok(())
}

#[test]
fn test_forecast_ingest() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_in(dir.path());
    let pipeline = ForecastPipeline::new(&settings)?;

    assert_eq!(pipeline.ingest("Melbourne", FORECAST_XML)?, 2);
    assert_eq!(pipeline.ingest("Ballarat", FORECAST_XML)?, 0);

    let store = PartitionStore::new(settings.forecast_dir("Melbourne"));
    assert_eq!(store.list_partitions()?.len(), 1);
    assert!(settings.data_dir.join("forecasts").join("Melbourne.csv").exists());
    assert_eq!(
        read_value(&settings.static_dir.join("forecasts.json")),
        json!([
            {"Date": "2025-10-25", "Max_temp": 22.0, "Rain": 2.0},
            {"Date": "2025-10-26", "Max_temp": 19.0, "Rain": null},
        ])
    );
    Ok(())
}

#[test]
fn test_forecast_page_ingest() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_in(dir.path());
    let html = r#"<html><body><div id="main-content">
      <div class="day"><dl><dd class="amt">1 to 4 mm</dd><dd class="max">21°C</dd></dl></div>
      <div class="day"><dl><dd class="amt">0 mm</dd><dd class="max">24°C</dd></dl></div>
    </div></body></html>"#;

    let days = ForecastPipeline::new(&settings)?.ingest_page(html, melbourne_morning())?;

    assert_eq!(days.len(), 2);
    assert!(settings
        .featured_dir()
        .join("forecasts")
        .join("20251025.csv")
        .exists());
    assert_eq!(
        read_value(&settings.static_dir.join("forecasts.json"))[1],
        json!({"Date": "2025-10-26", "Max_temp": 24.0, "Rain": 0.0})
    );
    Ok(())
}

#[test]
fn test_history_and_climate_ingest() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_in(dir.path());
    let pipeline = HistoryPipeline::new(&settings);

    assert_eq!(pipeline.ingest(HistoryProduct::Rainfall, RAIN_HISTORY)?, 3);
    assert!(settings.featured_dir().join("rain.csv").exists());
    assert_eq!(
        read_value(&settings.static_dir.join("historic_rain.json")),
        json!([
            {"Date": "2013-01-02", "Value": 0.0},
            {"Date": "2013-01-03", "Value": 12.4},
        ])
    );

    assert_eq!(pipeline.ingest_climate(CLIMATE_TABLE)?, 3);
    let climate = read_value(&settings.static_dir.join("climate.json"));
    assert_eq!(climate[0]["January"], json!(26.5));
    assert_eq!(climate[2]["January"], json!("25 Jan 2019"));
    assert_eq!(climate[0]["Unnamed: 4"], Value::Null);

    pipeline.write_climate_stats()?;
    let stats = read_value(&settings.static_dir.join("climate_stats.json"));
    assert!(stats.as_array().is_some_and(|rows| !rows.is_empty()));
    Ok(())
}

#[test]
fn test_history_from_plain_file() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_in(dir.path());
    let path = dir.path().join("regional.csv");
    std::fs::write(&path, RAIN_HISTORY)?;

    let days = HistoryPipeline::new(&settings).ingest_file(&path, HistoryProduct::Rainfall)?;
    assert_eq!(days, 3);
    Ok(())
}

fn hourly(city: &str, variables: &[&str], start: i64, values: Vec<Vec<Option<f64>>>) -> HourlySeries {
    let hours = values.first().map_or(0, Vec::len);
    HourlySeries {
        city: city.to_string(),
        variables: variables.iter().map(|v| v.to_string()).collect(),
        times: (0..hours as i64)
            .map(|h| from_unix_seconds(start + h * 3600).unwrap())
            .collect(),
        values,
    }
}

#[test]
fn test_open_meteo_store_then_combine() -> Result<()> {
    let dir = TempDir::new()?;
    let mut settings = settings_in(dir.path());
    settings.combiner.variables = vec!["temperature_2m".to_string()];
    let pipeline = OpenMeteoPipeline::new(&settings)?;

    let mut cache = BTreeMap::new();
    cache.insert(
        "Melbourne".to_string(),
        GeoLocation {
            latitude: -37.814,
            longitude: 144.9633,
            name: "Melbourne".to_string(),
            country: "Australia".to_string(),
            timezone: "Australia/Melbourne".to_string(),
        },
    );
    write_json(&settings.open_meteo.geocode_cache_path(), &cache)?;
    assert_eq!(load_geocode_cache(&settings.open_meteo.geocode_cache_path())?, cache);

    // Two archived hours, 11:00 and 12:00 local
    let observed = hourly(
        "Melbourne",
        &["temperature_2m"],
        MIDNIGHT_UTC,
        vec![vec![Some(14.0), Some(15.04)]],
    );
    pipeline.store_observations(&observed)?;
    // Storing again must not duplicate rows
    let summaries = pipeline.store_observations(&observed)?;
    assert_eq!(summaries[0].rows, 2);
    assert!(settings
        .open_meteo
        .observations_dir()
        .join("Melbourne.json")
        .exists());

    // Forecast overlaps the 12:00 observation and adds 13:00
    let forecast = hourly(
        "Melbourne",
        &["temperature_2m", "precipitation_probability"],
        MIDNIGHT_UTC + 3600,
        vec![vec![Some(99.0), Some(16.0)], vec![Some(10.0), Some(40.0)]],
    );
    pipeline.store_forecast(&forecast, None)?;

    assert_eq!(
        pipeline.resume_date("Melbourne")?,
        NaiveDate::from_ymd_opt(2025, 10, 25).unwrap()
    );
    assert_eq!(
        pipeline.resume_date("Perth")?,
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    );

    let now = from_unix_seconds(MIDNIGHT_UTC + 3 * 3600)?;
    let built = combine_cities(&settings, None, now)?;
    // Sydney has no geocode entry and is skipped
    assert_eq!(built, vec!["Melbourne".to_string()]);

    let output_dir = &settings.combiner.output_dir;
    assert_eq!(read_value(&output_dir.join("_list.json")), json!(["Melbourne"]));

    let city = read_value(&output_dir.join("Melbourne.json"));
    assert_eq!(
        city["temperature_2m"],
        json!([
            {"time": "2025-10-25T11:00:00+11:00", "value": 14.0},
            {"time": "2025-10-25T12:00:00+11:00", "value": 15.0},
            {"time": "2025-10-25T13:00:00+11:00", "value": 16.0},
        ])
    );
    assert_eq!(
        city["temperature_2m_avg"],
        json!([{"hour": 11, "value": 14.0}, {"hour": 12, "value": 15.0}])
    );
    assert_eq!(
        city["precipitation_probability"],
        json!([{"time": "2025-10-25T13:00:00+11:00", "value": 40.0}])
    );
    Ok(())
}

#[test]
fn test_repair_partitions_written_as_text() -> Result<()> {
    use arrow::array::StringArray;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    let dir = TempDir::new()?;
    let path = dir.path().join("new").join("Perth").join("2025-10.parquet");
    let batch = RecordBatch::try_new(
        Arc::new(Schema::new(vec![
            Field::new("local_date_time_full[80]", DataType::Utf8, true),
            Field::new("air_temp", DataType::Utf8, true),
        ])),
        vec![
            Arc::new(StringArray::from(vec!["20251025100000"])),
            Arc::new(StringArray::from(vec!["21.5"])),
        ],
    )?;
    let writer = ParquetWriter::new();
    writer.write_batch(&batch, &path)?;

    let report = bom_weather::storage::repair_tree(&writer, dir.path(), &["air_temp"])?;
    assert_eq!(report.total, 1);
    assert_eq!(report.fixed, 1);

    let repaired = writer.read_batch(&path)?;
    assert_eq!(f64_column(&repaired, "air_temp")?, vec![Some(21.5)]);
    Ok(())
}
