//! Conflict resolution between local and remote copies of a record.
//!
//! Pure functions only: given both sides of a conflict, return the record
//! that should be treated as current truth. Safe to call any number of
//! times with the same inputs. The strategy is chosen per deployment via
//! config, not per call.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{BodyMetricEntry, DailyMetricEntry, ProfileSettings, UserProfile};

/// How a conflict between local and remote copies is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStrategy {
    /// The record with the later `updated_at` wins in full (default).
    /// Equal timestamps resolve to the remote side.
    LastWriteWins,
    /// The remote copy always wins.
    ServerWins,
    /// The local copy always wins.
    ClientWins,
    /// Field-level reconciliation; gaps on the winning side are filled
    /// from the losing side.
    Merge,
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictStrategy::LastWriteWins => write!(f, "last-write-wins"),
            ConflictStrategy::ServerWins => write!(f, "server-wins"),
            ConflictStrategy::ClientWins => write!(f, "client-wins"),
            ConflictStrategy::Merge => write!(f, "merge"),
        }
    }
}

impl FromStr for ConflictStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "last-write-wins" => Ok(ConflictStrategy::LastWriteWins),
            "server-wins" => Ok(ConflictStrategy::ServerWins),
            "client-wins" => Ok(ConflictStrategy::ClientWins),
            "merge" => Ok(ConflictStrategy::Merge),
            _ => Err(format!(
                "Invalid conflict strategy '{}'. Valid options: last-write-wins, server-wins, client-wins, merge",
                s
            )),
        }
    }
}

impl Default for ConflictStrategy {
    fn default() -> Self {
        ConflictStrategy::LastWriteWins
    }
}

/// Resolves conflicts between local and remote record copies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver {
    strategy: ConflictStrategy,
}

impl ConflictResolver {
    pub fn new(strategy: ConflictStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ConflictStrategy {
        self.strategy
    }

    pub fn resolve_profile(&self, local: &UserProfile, remote: &UserProfile) -> UserProfile {
        match self.strategy {
            ConflictStrategy::LastWriteWins => {
                pick_by_timestamp(local, remote, local.updated_at, remote.updated_at).clone()
            }
            ConflictStrategy::ServerWins => remote.clone(),
            ConflictStrategy::ClientWins => local.clone(),
            ConflictStrategy::Merge => merge_profiles(local, remote),
        }
    }

    pub fn resolve_body_metrics(
        &self,
        local: &BodyMetricEntry,
        remote: &BodyMetricEntry,
    ) -> BodyMetricEntry {
        match self.strategy {
            ConflictStrategy::LastWriteWins => {
                pick_by_timestamp(local, remote, local.updated_at, remote.updated_at).clone()
            }
            ConflictStrategy::ServerWins => remote.clone(),
            ConflictStrategy::ClientWins => local.clone(),
            ConflictStrategy::Merge => merge_body_metrics(local, remote),
        }
    }

    pub fn resolve_daily_metrics(
        &self,
        local: &DailyMetricEntry,
        remote: &DailyMetricEntry,
    ) -> DailyMetricEntry {
        match self.strategy {
            ConflictStrategy::LastWriteWins => {
                pick_by_timestamp(local, remote, local.updated_at, remote.updated_at).clone()
            }
            ConflictStrategy::ServerWins => remote.clone(),
            ConflictStrategy::ClientWins => local.clone(),
            ConflictStrategy::Merge => merge_daily_metrics(local, remote),
        }
    }

    /// Advisory predicate: were both copies modified independently since the
    /// last known sync point?
    ///
    /// Without a sync point, timestamps within a one-second slack window are
    /// treated as the same write (clock skew and rounding, not logical
    /// concurrency).
    pub fn has_conflict(
        local_updated_at: DateTime<Utc>,
        remote_updated_at: DateTime<Utc>,
        last_sync: Option<DateTime<Utc>>,
    ) -> bool {
        if let Some(sync_time) = last_sync {
            return local_updated_at > sync_time && remote_updated_at > sync_time;
        }

        (local_updated_at - remote_updated_at).abs() > Duration::seconds(1)
    }
}

/// Later `updated_at` wins; ties go to the remote side.
fn pick_by_timestamp<'a, T>(
    local: &'a T,
    remote: &'a T,
    local_updated_at: DateTime<Utc>,
    remote_updated_at: DateTime<Utc>,
) -> &'a T {
    if local_updated_at > remote_updated_at {
        local
    } else {
        remote
    }
}

/// Differing non-empty notes are concatenated rather than one replacing
/// the other. Deliberate product decision: a dropped note is unrecoverable
/// data loss, a doubled note is an edit away from clean.
fn merge_notes(a: Option<&str>, b: Option<&str>) -> Option<String> {
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (Some(a), Some(b)) if a == b => Some(a.to_string()),
        (Some(a), Some(b)) => Some(format!("{}\n---\n{}", a, b)),
    }
}

fn merge_body_metrics(local: &BodyMetricEntry, remote: &BodyMetricEntry) -> BodyMetricEntry {
    let base = pick_by_timestamp(local, remote, local.updated_at, remote.updated_at);
    let other = if std::ptr::eq(base, local) { remote } else { local };

    let mut merged = base.clone();
    if merged.weight.is_none() {
        merged.weight = other.weight;
        merged.weight_unit = other.weight_unit;
    }
    merged.body_fat_percentage = merged.body_fat_percentage.or(other.body_fat_percentage);
    merged.body_fat_method = merged.body_fat_method.or(other.body_fat_method);
    merged.lean_mass = merged.lean_mass.or(other.lean_mass);
    merged.bone_mass = merged.bone_mass.or(other.bone_mass);
    merged.fat_mass = merged.fat_mass.or(other.fat_mass);
    merged.photo_url = merged.photo_url.or_else(|| other.photo_url.clone());
    merged.notes = merge_notes(base.notes.as_deref(), other.notes.as_deref());
    merged
}

fn merge_daily_metrics(local: &DailyMetricEntry, remote: &DailyMetricEntry) -> DailyMetricEntry {
    let base = pick_by_timestamp(local, remote, local.updated_at, remote.updated_at);
    let other = if std::ptr::eq(base, local) { remote } else { local };

    let mut merged = base.clone();
    // A step-count gap means the other side observed additional steps,
    // never fewer, so take the maximum instead of preferring the base.
    merged.steps = match (base.steps, other.steps) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    merged.notes = merge_notes(base.notes.as_deref(), other.notes.as_deref());
    merged
}

fn merge_profiles(local: &UserProfile, remote: &UserProfile) -> UserProfile {
    let base = pick_by_timestamp(local, remote, local.updated_at, remote.updated_at);
    let other = if std::ptr::eq(base, local) { remote } else { local };

    let mut merged = base.clone();
    merged.email = merged.email.or_else(|| other.email.clone());
    merged.full_name = merged.full_name.or_else(|| other.full_name.clone());
    if merged.height.is_none() {
        merged.height = other.height;
        merged.height_unit = other.height_unit;
    }
    merged.date_of_birth = merged.date_of_birth.or(other.date_of_birth);
    merged.gender = merged.gender.or(other.gender);
    if merged.goal_weight.is_none() {
        merged.goal_weight = other.goal_weight;
        merged.goal_weight_unit = other.goal_weight_unit;
    }
    merged.settings = ProfileSettings::merged(&base.settings, &other.settings);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BodyFatMethod, Gender, WeightUnit};
    use chrono::{NaiveDate, TimeZone};

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, secs).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn entry_at(secs: u32) -> BodyMetricEntry {
        let mut entry = BodyMetricEntry::new("user-1", date());
        entry.updated_at = at(secs);
        entry
    }

    fn daily_at(secs: u32) -> DailyMetricEntry {
        let mut entry = DailyMetricEntry::new("user-1", date());
        entry.updated_at = at(secs);
        entry
    }

    #[test]
    fn test_last_write_wins_later_local() {
        let resolver = ConflictResolver::new(ConflictStrategy::LastWriteWins);
        let local = entry_at(20).with_weight(82.0, WeightUnit::Kg);
        let remote = entry_at(10).with_weight(80.0, WeightUnit::Kg);

        let resolved = resolver.resolve_body_metrics(&local, &remote);
        assert_eq!(resolved.weight, Some(82.0));
    }

    #[test]
    fn test_last_write_wins_later_remote() {
        let resolver = ConflictResolver::new(ConflictStrategy::LastWriteWins);
        let local = entry_at(10).with_weight(82.0, WeightUnit::Kg);
        let remote = entry_at(20).with_weight(80.0, WeightUnit::Kg);

        let resolved = resolver.resolve_body_metrics(&local, &remote);
        assert_eq!(resolved.weight, Some(80.0));
    }

    #[test]
    fn test_last_write_wins_tie_prefers_remote() {
        let resolver = ConflictResolver::new(ConflictStrategy::LastWriteWins);
        let local = entry_at(10).with_weight(82.0, WeightUnit::Kg);
        let remote = entry_at(10).with_weight(80.0, WeightUnit::Kg);

        let resolved = resolver.resolve_body_metrics(&local, &remote);
        assert_eq!(resolved.weight, Some(80.0));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = ConflictResolver::new(ConflictStrategy::LastWriteWins);
        let local = entry_at(15).with_weight(82.0, WeightUnit::Kg);
        let remote = entry_at(10).with_weight(80.0, WeightUnit::Kg);

        let first = resolver.resolve_body_metrics(&local, &remote);
        let second = resolver.resolve_body_metrics(&local, &remote);
        assert_eq!(first, second);
    }

    #[test]
    fn test_server_and_client_wins_ignore_timestamps() {
        let local = entry_at(20).with_weight(82.0, WeightUnit::Kg);
        let remote = entry_at(10).with_weight(80.0, WeightUnit::Kg);

        let server = ConflictResolver::new(ConflictStrategy::ServerWins)
            .resolve_body_metrics(&local, &remote);
        assert_eq!(server.weight, Some(80.0));

        let client = ConflictResolver::new(ConflictStrategy::ClientWins)
            .resolve_body_metrics(&local, &remote);
        assert_eq!(client.weight, Some(82.0));
    }

    #[test]
    fn test_merge_fills_gaps_from_losing_side() {
        let resolver = ConflictResolver::new(ConflictStrategy::Merge);
        let local = entry_at(10)
            .with_weight(180.0, WeightUnit::Lbs)
            .with_body_fat(18.0, BodyFatMethod::Dexa)
            .with_photo_url("https://example.com/photo.jpg");
        let remote = entry_at(20);

        let resolved = resolver.resolve_body_metrics(&local, &remote);
        // Remote wins as base but carries no data, so everything fills in.
        assert_eq!(resolved.weight, Some(180.0));
        assert_eq!(resolved.weight_unit, WeightUnit::Lbs);
        assert_eq!(resolved.body_fat_percentage, Some(18.0));
        assert_eq!(resolved.body_fat_method, Some(BodyFatMethod::Dexa));
        assert_eq!(
            resolved.photo_url,
            Some("https://example.com/photo.jpg".to_string())
        );
        assert_eq!(resolved.updated_at, at(20));
    }

    #[test]
    fn test_merge_base_fields_not_overwritten() {
        let resolver = ConflictResolver::new(ConflictStrategy::Merge);
        let local = entry_at(10).with_weight(180.0, WeightUnit::Lbs);
        let remote = entry_at(20).with_weight(81.5, WeightUnit::Kg);

        let resolved = resolver.resolve_body_metrics(&local, &remote);
        assert_eq!(resolved.weight, Some(81.5));
        assert_eq!(resolved.weight_unit, WeightUnit::Kg);
    }

    #[test]
    fn test_merge_differing_notes_keeps_both() {
        let resolver = ConflictResolver::new(ConflictStrategy::Merge);
        let local = entry_at(10).with_notes("fasted");
        let remote = entry_at(20).with_notes("post-workout");

        let resolved = resolver.resolve_body_metrics(&local, &remote);
        let notes = resolved.notes.unwrap();
        assert!(notes.contains("fasted"));
        assert!(notes.contains("post-workout"));
    }

    #[test]
    fn test_merge_identical_notes_not_doubled() {
        let resolver = ConflictResolver::new(ConflictStrategy::Merge);
        let local = entry_at(10).with_notes("same");
        let remote = entry_at(20).with_notes("same");

        let resolved = resolver.resolve_body_metrics(&local, &remote);
        assert_eq!(resolved.notes, Some("same".to_string()));
    }

    #[test]
    fn test_two_devices_offline_edit_scenario() {
        // Device A logs weight at T=10; device B adds a note at T=12.
        let resolver = ConflictResolver::new(ConflictStrategy::Merge);
        let device_a = entry_at(10).with_weight(180.0, WeightUnit::Lbs);
        let device_b = entry_at(12).with_notes("post-workout");

        let resolved = resolver.resolve_body_metrics(&device_a, &device_b);
        // B wins as base and carries the note; A's weight fills the gap.
        assert_eq!(resolved.weight, Some(180.0));
        assert_eq!(resolved.notes, Some("post-workout".to_string()));
        assert_eq!(resolved.updated_at, at(12));
    }

    #[test]
    fn test_daily_merge_steps_take_maximum() {
        let resolver = ConflictResolver::new(ConflictStrategy::Merge);
        let local = daily_at(20).with_steps(4000);
        let remote = daily_at(10).with_steps(9500);

        let resolved = resolver.resolve_daily_metrics(&local, &remote);
        // Base (local) is later but the other side saw more steps.
        assert_eq!(resolved.steps, Some(9500));
    }

    #[test]
    fn test_daily_merge_steps_one_sided() {
        let resolver = ConflictResolver::new(ConflictStrategy::Merge);
        let local = daily_at(20);
        let remote = daily_at(10).with_steps(3000);

        let resolved = resolver.resolve_daily_metrics(&local, &remote);
        assert_eq!(resolved.steps, Some(3000));
    }

    #[test]
    fn test_profile_merge_settings_base_precedence() {
        let resolver = ConflictResolver::new(ConflictStrategy::Merge);

        let mut local = UserProfile::new("user-1");
        local.updated_at = at(20);
        local.settings.units.weight = WeightUnit::Lbs;
        local
            .settings
            .extra
            .insert("theme".to_string(), serde_json::json!("dark"));

        let mut remote = UserProfile::new("user-1");
        remote.updated_at = at(10);
        remote.full_name = Some("Sam".to_string());
        remote.gender = Some(Gender::Female);
        remote
            .settings
            .extra
            .insert("beta".to_string(), serde_json::json!(true));

        let resolved = resolver.resolve_profile(&local, &remote);
        assert_eq!(resolved.settings.units.weight, WeightUnit::Lbs);
        assert_eq!(resolved.settings.extra["theme"], serde_json::json!("dark"));
        assert_eq!(resolved.settings.extra["beta"], serde_json::json!(true));
        // Fields absent locally fill in from the remote copy.
        assert_eq!(resolved.full_name, Some("Sam".to_string()));
        assert_eq!(resolved.gender, Some(Gender::Female));
    }

    #[test]
    fn test_has_conflict_with_sync_point() {
        // Both modified after the last sync: conflict.
        assert!(ConflictResolver::has_conflict(at(20), at(25), Some(at(10))));
        // Only one side modified since: no conflict.
        assert!(!ConflictResolver::has_conflict(at(5), at(25), Some(at(10))));
        assert!(!ConflictResolver::has_conflict(at(20), at(5), Some(at(10))));
    }

    #[test]
    fn test_has_conflict_slack_window() {
        // Within one second: treated as the same write.
        assert!(!ConflictResolver::has_conflict(at(10), at(10), None));
        assert!(!ConflictResolver::has_conflict(at(10), at(11), None));
        // Beyond the slack window either way.
        assert!(ConflictResolver::has_conflict(at(10), at(12), None));
        assert!(ConflictResolver::has_conflict(at(12), at(10), None));
    }
}
