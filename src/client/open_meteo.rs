use crate::error::{ProcessingError, Result};
use crate::models::open_meteo::{ApiResponse, GeocodeResponse};
use crate::models::GeoLocation;
use crate::settings::OpenMeteoSettings;
use crate::utils::constants::{RATE_LIMIT_BASE_WAIT_SECS, RATE_LIMIT_MAX_RETRIES};
use crate::utils::text::preview;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use validator::Validate;

type Query = Vec<(&'static str, String)>;

/// Client for the geocoding, archive and forecast APIs.
///
/// Every request asks for unix timestamps in UTC so responses from all three
/// endpoints line up.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    geocoding_url: String,
    archive_url: String,
    forecast_url: String,
    rate_limit_wait: Duration,
}

impl OpenMeteoClient {
    pub fn new(settings: &OpenMeteoSettings) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            geocoding_url: settings.geocoding_url.clone(),
            archive_url: settings.archive_url.clone(),
            forecast_url: settings.forecast_url.clone(),
            rate_limit_wait: Duration::from_secs(RATE_LIMIT_BASE_WAIT_SECS),
        })
    }

    /// Base wait before retrying a rate-limited call; grows linearly per attempt.
    pub fn with_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.rate_limit_wait = wait;
        self
    }

    /// First geocoding match for a city name.
    pub async fn geocode(&self, city: &str) -> Result<GeoLocation> {
        let query: Query = vec![
            ("name", city.to_string()),
            ("count", "1".to_string()),
            ("language", "en".to_string()),
            ("format", "json".to_string()),
        ];
        let response: GeocodeResponse = self.get_json(&self.geocoding_url, &query).await?;

        let location = response
            .results
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| ProcessingError::GeocodeNotFound(city.to_string()))?;
        location.validate()?;
        Ok(location)
    }

    /// Hourly reanalysis between two dates, inclusive.
    pub async fn archive(
        &self,
        location: &GeoLocation,
        start: NaiveDate,
        end: NaiveDate,
        hourly: &[String],
    ) -> Result<ApiResponse> {
        let query = archive_query(location, start, end, hourly);
        self.get_json(&self.archive_url, &query).await
    }

    pub async fn forecast(
        &self,
        location: &GeoLocation,
        hourly: &[String],
        daily: &[String],
    ) -> Result<ApiResponse> {
        let query = forecast_query(location, hourly, daily);
        self.get_json(&self.forecast_url, &query).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &Query) -> Result<T> {
        for attempt in 1..=RATE_LIMIT_MAX_RETRIES {
            match self.try_get_json(url, query).await {
                Err(ProcessingError::Api { status, reason })
                    if is_rate_limited(status, &reason) =>
                {
                    let wait = self.rate_limit_wait * attempt;
                    warn!(
                        attempt,
                        max_attempts = RATE_LIMIT_MAX_RETRIES,
                        wait_secs = wait.as_secs(),
                        "Rate limited, waiting"
                    );
                    tokio::time::sleep(wait).await;
                }
                other => return other,
            }
        }

        Err(ProcessingError::RateLimited {
            attempts: RATE_LIMIT_MAX_RETRIES,
        })
    }

    async fn try_get_json<T: DeserializeOwned>(&self, url: &str, query: &Query) -> Result<T> {
        debug!(url, "GET");
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProcessingError::Api {
                status: status.as_u16(),
                reason: error_reason(&body),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn location_query(location: &GeoLocation) -> Query {
    vec![
        ("latitude", location.latitude.to_string()),
        ("longitude", location.longitude.to_string()),
    ]
}

pub fn archive_query(
    location: &GeoLocation,
    start: NaiveDate,
    end: NaiveDate,
    hourly: &[String],
) -> Query {
    let mut query = location_query(location);
    query.extend([
        ("start_date", start.format("%Y-%m-%d").to_string()),
        ("end_date", end.format("%Y-%m-%d").to_string()),
        ("hourly", hourly.join(",")),
        ("timeformat", "unixtime".to_string()),
        ("timezone", "UTC".to_string()),
    ]);
    query
}

pub fn forecast_query(location: &GeoLocation, hourly: &[String], daily: &[String]) -> Query {
    let mut query = location_query(location);
    query.push(("hourly", hourly.join(",")));
    if !daily.is_empty() {
        query.push(("daily", daily.join(",")));
    }
    query.extend([
        ("timeformat", "unixtime".to_string()),
        ("timezone", "UTC".to_string()),
    ]);
    query
}

/// The API reports failures as `{"error": true, "reason": "..."}`.
fn error_reason(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("reason").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| preview(body, 200))
}

pub fn is_rate_limited(status: u16, reason: &str) -> bool {
    let reason = reason.to_lowercase();
    status == 429 || reason.contains("rate limit") || reason.contains("limit exceeded")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn melbourne() -> GeoLocation {
        GeoLocation {
            latitude: -37.814,
            longitude: 144.9633,
            name: "Melbourne".to_string(),
            country: "Australia".to_string(),
            timezone: "Australia/Melbourne".to_string(),
        }
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(is_rate_limited(429, ""));
        assert!(is_rate_limited(400, "Daily API request limit exceeded. Please try again tomorrow."));
        assert!(is_rate_limited(503, "Rate limit reached"));
        assert!(!is_rate_limited(400, "Parameter 'hourly' is invalid"));
    }

    #[test]
    fn test_error_reason() {
        assert_eq!(
            error_reason(r#"{"error":true,"reason":"Cannot initialize WeatherVariable"}"#),
            "Cannot initialize WeatherVariable"
        );
        assert_eq!(error_reason("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_archive_query() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 3, 30).unwrap();
        let hourly = vec!["temperature_2m".to_string(), "rain".to_string()];
        let query = archive_query(&melbourne(), start, end, &hourly);

        assert_eq!(
            query,
            vec![
                ("latitude", "-37.814".to_string()),
                ("longitude", "144.9633".to_string()),
                ("start_date", "2020-01-01".to_string()),
                ("end_date", "2020-03-30".to_string()),
                ("hourly", "temperature_2m,rain".to_string()),
                ("timeformat", "unixtime".to_string()),
                ("timezone", "UTC".to_string()),
            ]
        );
    }

    #[test]
    fn test_forecast_query_includes_daily() {
        let hourly = vec!["temperature_2m".to_string()];
        let daily = vec!["sunrise".to_string(), "sunset".to_string()];
        let query = forecast_query(&melbourne(), &hourly, &daily);

        assert!(query.contains(&("daily", "sunrise,sunset".to_string())));
        assert!(query.contains(&("timeformat", "unixtime".to_string())));
    }
}
