use crate::error::Result;
use crate::pipelines::city_selected;
use crate::pipelines::open_meteo::load_geocode_cache;
use crate::processors::{Combiner, SourceRow};
use crate::settings::Settings;
use crate::storage::PartitionStore;
use crate::utils::constants::CITY_LIST_FILE;
use crate::utils::time::parse_timezone;
use crate::writers::{read_json, write_json};
use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;
use tracing::{info, warn};

/// Build `cities/<city>.json` for each configured city and the
/// `_list.json` index of the cities written.
pub fn combine_cities(
    settings: &Settings,
    city: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<String>> {
    let open_meteo = &settings.open_meteo;
    let combiner = Combiner::new(&settings.combiner);
    let locations = load_geocode_cache(&open_meteo.geocode_cache_path())?;
    let archive = PartitionStore::new(open_meteo.observations_archive_dir());
    let output_dir = &settings.combiner.output_dir;

    let mut built = Vec::new();
    for name in settings
        .combiner
        .cities
        .iter()
        .filter(|c| city_selected(city, c))
    {
        let Some(location) = locations.get(name) else {
            warn!(city = %name, "No timezone in geocode cache, skipping");
            continue;
        };
        let tz = match parse_timezone(&location.timezone) {
            Ok(tz) => tz,
            Err(e) => {
                warn!(city = %name, error = %e, "Skipping city");
                continue;
            }
        };
        let local_now = now.with_timezone(&tz);

        let observations = match archive.read_month_across_years(local_now.month())? {
            Some(batch) => combiner.observation_rows(&batch, name)?,
            None => Vec::new(),
        };
        let forecast = forecast_rows(settings, &combiner, name)?;

        match combiner.combine(&observations, &forecast, local_now) {
            Some(document) => {
                write_json(&output_dir.join(format!("{}.json", name)), &document)?;
                info!(
                    city = %name,
                    observations = observations.len(),
                    forecast = forecast.len(),
                    "Combined city"
                );
                built.push(name.clone());
            }
            None => warn!(city = %name, "No observations or forecast, skipping"),
        }
    }

    write_json(&output_dir.join(CITY_LIST_FILE), &built)?;
    Ok(built)
}

fn forecast_rows(settings: &Settings, combiner: &Combiner, city: &str) -> Result<Vec<SourceRow>> {
    let path = settings
        .open_meteo
        .forecasts_dir()
        .join(format!("{}.json", city));
    if !path.exists() {
        return Ok(Vec::new());
    }

    let document: Value = read_json(&path)?;
    Ok(document
        .get("hourly")
        .and_then(Value::as_array)
        .map(|hourly| combiner.forecast_rows(hourly))
        .unwrap_or_default())
}
