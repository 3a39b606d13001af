use serde::ser::{Serialize, SerializeMap, Serializer};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// One row of the long-term statistics for Melbourne (Olympic Park).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateStat {
    pub category: &'static str,
    pub metric: &'static str,
    pub monthly: [f64; 12],
}

/// Serialised flat: `Category`, `Metric`, then one key per month.
impl Serialize for ClimateStat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + MONTH_NAMES.len()))?;
        map.serialize_entry("Category", self.category)?;
        map.serialize_entry("Metric", self.metric)?;
        for (month, value) in MONTH_NAMES.iter().zip(self.monthly.iter()) {
            map.serialize_entry(month, value)?;
        }
        map.end()
    }
}

pub const MELBOURNE_OLYMPIC_PARK: &[ClimateStat] = &[
    ClimateStat {
        category: "Temperature",
        metric: "Mean_Max_Temp",
        monthly: [25.9, 25.9, 23.9, 20.3, 16.7, 14.1, 13.5, 15.0, 17.3, 19.7, 22.0, 24.2],
    },
    ClimateStat {
        category: "Temperature",
        metric: "Mean_Min_Temp",
        monthly: [14.3, 14.6, 13.3, 10.8, 8.7, 6.9, 6.0, 6.7, 8.0, 9.6, 11.3, 13.0],
    },
    ClimateStat {
        category: "Rainfall",
        metric: "Mean_Rainfall",
        monthly: [46.8, 48.0, 50.1, 57.3, 55.7, 49.5, 47.5, 50.0, 58.0, 66.0, 60.3, 59.1],
    },
    ClimateStat {
        category: "Rainfall",
        metric: "Median_Rainfall",
        monthly: [36.6, 32.6, 38.8, 49.8, 54.9, 43.2, 44.4, 49.2, 52.9, 65.6, 53.8, 51.5],
    },
    ClimateStat {
        category: "Rainfall",
        metric: "Decile_1",
        monthly: [9.4, 6.9, 11.8, 17.8, 21.3, 25.6, 22.0, 23.6, 27.9, 26.9, 21.7, 17.6],
    },
    ClimateStat {
        category: "Rainfall",
        metric: "Decile_9",
        monthly: [99.2, 107.9, 104.6, 114.4, 91.0, 85.6, 72.1, 77.7, 92.4, 111.2, 114.5, 110.2],
    },
    ClimateStat {
        category: "Humidity",
        metric: "Mean_9am_RH",
        monthly: [63.0, 66.0, 68.0, 71.0, 77.0, 80.0, 79.0, 73.0, 67.0, 62.0, 63.0, 62.0],
    },
    ClimateStat {
        category: "Humidity",
        metric: "Mean_3pm_RH",
        monthly: [47.0, 48.0, 49.0, 52.0, 59.0, 63.0, 61.0, 56.0, 53.0, 50.0, 49.0, 47.0],
    },
    ClimateStat {
        category: "Wind",
        metric: "Mean_9am_Wind",
        monthly: [20.0, 19.0, 19.0, 19.0, 19.0, 20.0, 22.0, 22.0, 22.0, 22.0, 22.0, 21.0],
    },
];
