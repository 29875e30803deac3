//! Class lists and disease interpretation.
//!
//! A trained classifier only knows class indices. This module maps an index
//! to the raw dataset label, turns that into a display name, and decides via
//! keyword matching whether the label is a disease and which canned treatment
//! applies.

mod classes;
mod profile;

pub use classes::ClassNames;
pub use profile::{DiseaseProfile, Interpretation};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which detector a process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[serde(alias = "plant")]
    Crop,
    #[serde(alias = "livestock")]
    Cattle,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Crop => "crop",
            Variant::Cattle => "cattle",
        }
    }

    /// Title used in service banners ("Crop Disease Detection API").
    pub fn title(&self) -> &'static str {
        match self {
            Variant::Crop => "Crop",
            Variant::Cattle => "Cattle",
        }
    }

    /// What a healthy prediction is about ("Plant is healthy").
    pub fn subject(&self) -> &'static str {
        match self {
            Variant::Crop => "Plant",
            Variant::Cattle => "Animal",
        }
    }

    pub fn profile(&self) -> DiseaseProfile {
        match self {
            Variant::Crop => DiseaseProfile::crop(),
            Variant::Cattle => DiseaseProfile::cattle(),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crop" | "plant" => Ok(Variant::Crop),
            "cattle" | "livestock" => Ok(Variant::Cattle),
            other => Err(format!(
                "unknown variant '{other}' (expected crop or cattle)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("Plant".parse::<Variant>().unwrap(), Variant::Crop);
        assert_eq!(" livestock ".parse::<Variant>().unwrap(), Variant::Cattle);
        assert!("poultry".parse::<Variant>().is_err());
    }

    #[test]
    fn deserializes_from_config_strings() {
        let v: Variant = serde_json::from_str("\"cattle\"").unwrap();
        assert_eq!(v, Variant::Cattle);
        let v: Variant = serde_json::from_str("\"plant\"").unwrap();
        assert_eq!(v, Variant::Crop);
    }
}
