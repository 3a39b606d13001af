pub mod extractor;

pub use extractor::{extract_first_csv, ExtractedCsv};

use serde::{Deserialize, Serialize};

/// BOM daily history products, identified on the Climate Data Online pages
/// by their observation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryProduct {
    Rainfall,
    MaxTemperature,
    MinTemperature,
}

impl HistoryProduct {
    pub fn from_obs_code(code: u32) -> Option<Self> {
        match code {
            136 => Some(HistoryProduct::Rainfall),
            122 => Some(HistoryProduct::MaxTemperature),
            123 => Some(HistoryProduct::MinTemperature),
            _ => None,
        }
    }

    pub fn obs_code(&self) -> u32 {
        match self {
            HistoryProduct::Rainfall => 136,
            HistoryProduct::MaxTemperature => 122,
            HistoryProduct::MinTemperature => 123,
        }
    }

    /// Name of the value column in the product's CSV
    pub fn value_column(&self) -> &'static str {
        match self {
            HistoryProduct::Rainfall => "Rainfall amount (millimetres)",
            HistoryProduct::MaxTemperature => "Maximum temperature (Degree C)",
            HistoryProduct::MinTemperature => "Minimum temperature (Degree C)",
        }
    }

    /// Short name used for output files: `rain.csv`, `historic_rain.json`
    pub fn stem(&self) -> &'static str {
        match self {
            HistoryProduct::Rainfall => "rain",
            HistoryProduct::MaxTemperature => "temp",
            HistoryProduct::MinTemperature => "min_temp",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            HistoryProduct::Rainfall => "Rainfall",
            HistoryProduct::MaxTemperature => "Temperature (Max)",
            HistoryProduct::MinTemperature => "Temperature (Min)",
        }
    }
}

impl std::fmt::Display for HistoryProduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obs_code_round_trip() {
        for product in [
            HistoryProduct::Rainfall,
            HistoryProduct::MaxTemperature,
            HistoryProduct::MinTemperature,
        ] {
            assert_eq!(HistoryProduct::from_obs_code(product.obs_code()), Some(product));
        }
        assert_eq!(HistoryProduct::from_obs_code(999), None);
    }

    #[test]
    fn test_value_column() {
        assert_eq!(
            HistoryProduct::MaxTemperature.value_column(),
            "Maximum temperature (Degree C)"
        );
        assert_eq!(HistoryProduct::Rainfall.to_string(), "Rainfall");
        assert_eq!(HistoryProduct::MaxTemperature.stem(), "temp");
    }
}
