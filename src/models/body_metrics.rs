use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::units::{BodyFatMethod, WeightUnit};

/// One logged body-composition measurement.
///
/// Identified by its own client-generated id, not by date; the model allows
/// multiple entries per day even though most users log once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyMetricEntry {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub weight: Option<f64>,
    pub weight_unit: WeightUnit,
    pub body_fat_percentage: Option<f64>,
    pub body_fat_method: Option<BodyFatMethod>,
    pub lean_mass: Option<f64>,
    pub bone_mass: Option<f64>,
    pub fat_mass: Option<f64>,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BodyMetricEntry {
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            date,
            weight: None,
            weight_unit: WeightUnit::Kg,
            body_fat_percentage: None,
            body_fat_method: None,
            lean_mass: None,
            bone_mass: None,
            fat_mass: None,
            photo_url: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_weight(mut self, weight: f64, unit: WeightUnit) -> Self {
        self.weight = Some(weight);
        self.weight_unit = unit;
        self
    }

    pub fn with_body_fat(mut self, percentage: f64, method: BodyFatMethod) -> Self {
        self.body_fat_percentage = Some(percentage);
        self.body_fat_method = Some(method);
        self
    }

    pub fn with_masses(
        mut self,
        lean: Option<f64>,
        bone: Option<f64>,
        fat: Option<f64>,
    ) -> Self {
        self.lean_mass = lean;
        self.bone_mass = bone;
        self.fat_mass = fat;
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns a copy with weight and mass fields converted to kilograms.
    ///
    /// The remote store persists a single normalized unit; the local copy
    /// keeps whatever the user entered.
    pub fn normalized_to_kg(&self) -> BodyMetricEntry {
        let unit = self.weight_unit;
        BodyMetricEntry {
            weight: self.weight.map(|w| unit.to_kg(w)),
            weight_unit: WeightUnit::Kg,
            lean_mass: self.lean_mass.map(|m| unit.to_kg(m)),
            bone_mass: self.bone_mass.map(|m| unit.to_kg(m)),
            fat_mass: self.fat_mass.map(|m| unit.to_kg(m)),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_entry_new() {
        let entry = BodyMetricEntry::new("user-1", date()).with_weight(180.0, WeightUnit::Lbs);
        assert_eq!(entry.user_id, "user-1");
        assert_eq!(entry.weight, Some(180.0));
        assert_eq!(entry.weight_unit, WeightUnit::Lbs);
        assert!(entry.body_fat_percentage.is_none());
    }

    #[test]
    fn test_unique_ids() {
        let a = BodyMetricEntry::new("user-1", date());
        let b = BodyMetricEntry::new("user-1", date());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_normalized_to_kg() {
        let entry = BodyMetricEntry::new("user-1", date())
            .with_weight(180.0, WeightUnit::Lbs)
            .with_masses(Some(150.0), Some(8.0), Some(22.0));

        let normalized = entry.normalized_to_kg();
        assert_eq!(normalized.weight_unit, WeightUnit::Kg);
        assert!((normalized.weight.unwrap() - 81.646).abs() < 0.01);
        assert!((normalized.lean_mass.unwrap() - 68.038).abs() < 0.01);
        // Identity and timestamps are untouched.
        assert_eq!(normalized.id, entry.id);
        assert_eq!(normalized.updated_at, entry.updated_at);
    }

    #[test]
    fn test_normalized_kg_is_noop() {
        let entry = BodyMetricEntry::new("user-1", date()).with_weight(82.0, WeightUnit::Kg);
        let normalized = entry.normalized_to_kg();
        assert_eq!(normalized.weight, Some(82.0));
    }

    #[test]
    fn test_json_roundtrip() {
        let entry = BodyMetricEntry::new("user-1", date())
            .with_weight(82.0, WeightUnit::Kg)
            .with_body_fat(18.5, BodyFatMethod::Dexa)
            .with_notes("morning weigh-in");

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: BodyMetricEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
