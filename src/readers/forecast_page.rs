use crate::error::Result;
use crate::models::ForecastSummary;
use crate::readers::html::selector;
use chrono::{Duration, NaiveDate};
use scraper::{ElementRef, Html};
use tracing::debug;

/// Daily forecasts from the BOM town forecast page.
///
/// Each `.day` block under `#main-content` is one day, starting today.
/// Days missing either the rain or the maximum are skipped.
pub fn read_forecast_page(html: &str, today: NaiveDate) -> Result<Vec<ForecastSummary>> {
    let document = Html::parse_document(html);
    let days = selector("div#main-content .day")?;
    let rain = selector(".amt")?;
    let max = selector(".max")?;

    let mut summaries = Vec::new();
    for (offset, day) in document.select(&days).enumerate() {
        let rain_text = first_text(&day, &rain);
        let max_text = first_text(&day, &max);

        let (Some(rain_text), Some(max_text)) = (rain_text, max_text) else {
            debug!(offset, "Skipping forecast day without rain or maximum");
            continue;
        };

        summaries.push(ForecastSummary {
            date: (today + Duration::days(offset as i64))
                .format("%Y-%m-%d")
                .to_string(),
            max_temp: parse_max_temp(&max_text),
            rain: parse_rain_amount(&rain_text),
        });
    }

    Ok(summaries)
}

fn first_text(element: &ElementRef, selector: &scraper::Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// `0 to 2 mm` → 2, `5 mm` → 5
fn parse_rain_amount(text: &str) -> Option<f64> {
    let upper = text.rsplit(" to ").next().unwrap_or(text);
    upper.trim().trim_end_matches("mm").trim().parse().ok()
}

/// `22°C` → 22
fn parse_max_temp(text: &str) -> Option<f64> {
    text.trim().trim_end_matches("°C").trim().parse().ok()
}
