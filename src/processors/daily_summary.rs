use crate::models::{without_sentinel, DailySummary, LegacyObservation};
use crate::utils::constants::RAIN_RESET_HOUR;
use crate::utils::time::hour_of_day;
use std::collections::BTreeMap;

/// Minutes past midnight of a `hh:mm am` reading.
fn clock_minutes(time: &str) -> Option<u32> {
    let hour = hour_of_day(time)?;
    let minute = time
        .split(':')
        .nth(1)?
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse::<u32>()
        .ok()?;
    Some(hour * 60 + minute)
}

/// Daily figures for `observations.json`, sorted by date.
///
/// BOM's rain gauge resets at 9am, so rainfall since midnight is the last
/// reading before 9am plus the last reading after it.
pub fn summarize_days(rows: &[LegacyObservation]) -> Vec<DailySummary> {
    let mut by_date: BTreeMap<&str, Vec<(u32, &LegacyObservation)>> = BTreeMap::new();
    for row in rows {
        if let Some(minutes) = clock_minutes(&row.time) {
            by_date.entry(row.date.as_str()).or_default().push((minutes, row));
        }
    }

    by_date
        .into_iter()
        .map(|(date, mut day)| {
            day.sort_by_key(|(minutes, _)| *minutes);
            let readings: Vec<&LegacyObservation> = day.iter().map(|(_, row)| *row).collect();
            summarize_day(date, &readings)
        })
        .filter(|summary| !summary.is_empty())
        .collect()
}

fn summarize_day(date: &str, readings: &[&LegacyObservation]) -> DailySummary {
    let temp = readings
        .iter()
        .filter_map(|r| without_sentinel(r.temp))
        .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))));

    let wind = readings
        .iter()
        .filter_map(|r| r.wind_speed_kmh())
        .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))));

    let humidity: Vec<f64> = readings
        .iter()
        .filter_map(|r| without_sentinel(r.humidity))
        .collect();
    let humidity = if humidity.is_empty() {
        None
    } else {
        Some(humidity.iter().sum::<f64>() / humidity.len() as f64)
    };

    DailySummary {
        date: date.to_string(),
        temp,
        rain: rain_since_midnight(readings),
        wind,
        humidity,
    }
}

fn rain_since_midnight(readings: &[&LegacyObservation]) -> Option<f64> {
    let reset = RAIN_RESET_HOUR * 60;
    let (before, after): (Vec<&LegacyObservation>, Vec<&LegacyObservation>) = readings
        .iter()
        .copied()
        .partition(|r| clock_minutes(&r.time).is_some_and(|m| m < reset));

    // An empty window contributes nothing; a missing final reading is unknown
    let window_total = |window: &[&LegacyObservation]| match window.last() {
        None => Some(0.0),
        Some(last) => without_sentinel(last.rain_since_9am),
    };

    Some(window_total(before.as_slice())? + window_total(after.as_slice())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reading(date: &str, time: &str, rain: Option<f64>) -> LegacyObservation {
        LegacyObservation {
            time: time.to_string(),
            temp: Some(10.0),
            feels_like: None,
            humidity: Some(50.0),
            wind_direction: None,
            wind_speed: "10 5".to_string(),
            wind_gust: "– –".to_string(),
            pressure: None,
            rain_since_9am: rain,
            date: date.to_string(),
        }
    }

    #[test]
    fn test_rain_spans_the_reset() {
        let rows = vec![
            reading("2025-10-25", "03:00 pm", Some(2.0)),
            reading("2025-10-25", "12:30 am", Some(0.4)),
            reading("2025-10-25", "08:30 am", Some(3.2)),
            reading("2025-10-25", "09:00 am", Some(0.0)),
            reading("2025-10-25", "11:00 pm", Some(4.5)),
        ];

        let days = summarize_days(&rows);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].rain, Some(3.2 + 4.5));
    }

    #[test]
    fn test_rain_with_only_morning_readings() {
        let rows = vec![
            reading("2025-10-26", "06:00 am", Some(1.0)),
            reading("2025-10-26", "12:00 am", Some(0.2)),
        ];
        assert_eq!(summarize_days(&rows)[0].rain, Some(1.0));
    }

    #[test]
    fn test_missing_last_reading_makes_rain_unknown() {
        let rows = vec![
            reading("2025-10-27", "10:00 am", Some(1.0)),
            reading("2025-10-27", "11:00 am", None),
        ];
        assert_eq!(summarize_days(&rows)[0].rain, None);
    }

    #[test]
    fn test_other_aggregates_and_ordering() {
        let mut hot = reading("2025-10-24", "02:00 pm", Some(0.0));
        hot.temp = Some(31.5);
        hot.humidity = Some(20.0);
        hot.wind_speed = "35 19".to_string();

        let rows = vec![
            reading("2025-10-25", "10:00 am", None),
            hot,
            reading("2025-10-24", "09:30 am", Some(0.0)),
        ];
        let days = summarize_days(&rows);

        assert_eq!(days[0].date, "2025-10-24");
        assert_eq!(days[0].temp, Some(31.5));
        assert_eq!(days[0].wind, Some(35.0));
        assert_eq!(days[0].humidity, Some(35.0));
        assert_eq!(days[1].date, "2025-10-25");
    }

    #[test]
    fn test_empty_days_are_dropped() {
        let mut blank = reading("2025-10-28", "10:00 am", None);
        blank.temp = None;
        blank.humidity = None;
        blank.wind_speed = "– –".to_string();

        assert!(summarize_days(&[blank]).is_empty());
    }

    #[test]
    fn test_placeholder_readings_are_ignored() {
        let mut missing = reading("2025-10-29", "11:00 am", Some(-9999.0));
        missing.temp = Some(-9999.0);
        missing.humidity = Some(-9999.0);
        let rows = vec![reading("2025-10-29", "10:00 am", Some(0.4)), missing];

        let days = summarize_days(&rows);
        assert_eq!(days[0].temp, Some(10.0));
        assert_eq!(days[0].humidity, Some(50.0));
        assert_eq!(days[0].rain, None);
    }

    #[test]
    fn test_clock_minutes() {
        assert_eq!(clock_minutes("12:30 am"), Some(30));
        assert_eq!(clock_minutes("09:00 am"), Some(540));
        assert_eq!(clock_minutes("12:15 pm"), Some(735));
    }
}
