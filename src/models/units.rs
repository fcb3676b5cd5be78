use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pounds per kilogram.
const LBS_PER_KG: f64 = 2.204_622_621_8;

/// Unit a weight value is expressed in.
///
/// The remote store only accepts kilograms; conversion happens at the
/// remote write boundary, not inside the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Kg,
    Lbs,
}

impl WeightUnit {
    /// Converts a value in this unit to kilograms.
    pub fn to_kg(&self, value: f64) -> f64 {
        match self {
            WeightUnit::Kg => value,
            WeightUnit::Lbs => value / LBS_PER_KG,
        }
    }

    /// Converts a value in kilograms to this unit.
    pub fn from_kg(&self, value: f64) -> f64 {
        match self {
            WeightUnit::Kg => value,
            WeightUnit::Lbs => value * LBS_PER_KG,
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightUnit::Kg => write!(f, "kg"),
            WeightUnit::Lbs => write!(f, "lbs"),
        }
    }
}

impl FromStr for WeightUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kg" => Ok(WeightUnit::Kg),
            "lbs" | "lb" => Ok(WeightUnit::Lbs),
            _ => Err(format!("Invalid weight unit '{}'. Valid options: kg, lbs", s)),
        }
    }
}

impl Default for WeightUnit {
    fn default() -> Self {
        WeightUnit::Kg
    }
}

/// Unit a height value is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    Cm,
    In,
}

impl fmt::Display for HeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeightUnit::Cm => write!(f, "cm"),
            HeightUnit::In => write!(f, "in"),
        }
    }
}

impl FromStr for HeightUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cm" => Ok(HeightUnit::Cm),
            "in" | "inches" => Ok(HeightUnit::In),
            _ => Err(format!("Invalid height unit '{}'. Valid options: cm, in", s)),
        }
    }
}

impl Default for HeightUnit {
    fn default() -> Self {
        HeightUnit::Cm
    }
}

/// How a body-fat percentage was measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFatMethod {
    Dexa,
    Calipers,
    Bia,
    Navy,
    Visual,
}

impl fmt::Display for BodyFatMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyFatMethod::Dexa => write!(f, "dexa"),
            BodyFatMethod::Calipers => write!(f, "calipers"),
            BodyFatMethod::Bia => write!(f, "bia"),
            BodyFatMethod::Navy => write!(f, "navy"),
            BodyFatMethod::Visual => write!(f, "visual"),
        }
    }
}

impl FromStr for BodyFatMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dexa" => Ok(BodyFatMethod::Dexa),
            "calipers" => Ok(BodyFatMethod::Calipers),
            "bia" => Ok(BodyFatMethod::Bia),
            "navy" => Ok(BodyFatMethod::Navy),
            "visual" => Ok(BodyFatMethod::Visual),
            _ => Err(format!(
                "Invalid body fat method '{}'. Valid options: dexa, calipers, bia, navy, visual",
                s
            )),
        }
    }
}

/// Self-reported gender, used for body-composition reference ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
            Gender::Other => write!(f, "other"),
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(format!(
                "Invalid gender '{}'. Valid options: male, female, other",
                s
            )),
        }
    }
}
