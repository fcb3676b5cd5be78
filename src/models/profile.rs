use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::units::{Gender, HeightUnit, WeightUnit};

/// Preferred display units, keyed by measurement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UnitPreferences {
    pub weight: WeightUnit,
    pub height: HeightUnit,
    pub measurements: HeightUnit,
}

/// Notification toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPreferences {
    pub daily_reminder: bool,
    pub weekly_summary: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            daily_reminder: true,
            weekly_summary: true,
        }
    }
}

/// Free-form profile settings with an enumerated schema.
///
/// Known keys (`units.*`, `notifications.*`) are typed fields; anything the
/// client sends beyond those lands in `extra` and survives round-trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProfileSettings {
    pub units: UnitPreferences,
    pub notifications: NotificationPreferences,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ProfileSettings {
    /// Merges two settings blobs key-by-key, with `base` taking precedence.
    ///
    /// Known nested sections merge as whole typed values from the base;
    /// unknown `extra` keys take a shallow key-union with base precedence.
    pub fn merged(base: &ProfileSettings, other: &ProfileSettings) -> ProfileSettings {
        let mut extra = other.extra.clone();
        for (key, value) in &base.extra {
            extra.insert(key.clone(), value.clone());
        }
        ProfileSettings {
            units: base.units,
            notifications: base.notifications,
            extra,
        }
    }
}

/// One profile per user, keyed by the authenticated user id.
///
/// Never deleted, only overwritten; the id doubles as the join key between
/// the local and remote copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub height: Option<f64>,
    pub height_unit: HeightUnit,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub goal_weight: Option<f64>,
    pub goal_weight_unit: WeightUnit,
    pub settings: ProfileSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            email: None,
            full_name: None,
            height: None,
            height_unit: HeightUnit::Cm,
            date_of_birth: None,
            gender: None,
            goal_weight: None,
            goal_weight_unit: WeightUnit::Kg,
            settings: ProfileSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_height(mut self, height: f64, unit: HeightUnit) -> Self {
        self.height = Some(height);
        self.height_unit = unit;
        self
    }

    pub fn with_date_of_birth(mut self, dob: NaiveDate) -> Self {
        self.date_of_birth = Some(dob);
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_goal_weight(mut self, weight: f64, unit: WeightUnit) -> Self {
        self.goal_weight = Some(weight);
        self.goal_weight_unit = unit;
        self
    }
}
