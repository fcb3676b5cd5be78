use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// At most one record per user per calendar day.
///
/// Unlike a body-metric entry this is updated incrementally through the day
/// (step count refreshed repeatedly), so writes overwrite the same row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetricEntry {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub steps: Option<u32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyMetricEntry {
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            date,
            steps: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_entry_new() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let entry = DailyMetricEntry::new("user-1", date).with_steps(8000);
        assert_eq!(entry.user_id, "user-1");
        assert_eq!(entry.steps, Some(8000));
        assert!(entry.notes.is_none());
    }

    #[test]
    fn test_json_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let entry = DailyMetricEntry::new("user-1", date)
            .with_steps(12000)
            .with_notes("long walk");

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: DailyMetricEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
