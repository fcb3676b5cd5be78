use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::models::{ProfileSettings, RecordStatus, UserProfile};

pub struct ProfileRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: String,
    email: Option<String>,
    full_name: Option<String>,
    height: Option<f64>,
    height_unit: String,
    date_of_birth: Option<String>,
    gender: Option<String>,
    goal_weight: Option<f64>,
    goal_weight_unit: String,
    settings: String,
    created_at: String,
    updated_at: String,
}

impl ProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upserts a profile from the UI write path.
    ///
    /// Stamps `updated_at` to now and resets the record to `pending` so the
    /// next sync pass picks it up.
    pub async fn put(&self, profile: &UserProfile) -> Result<UserProfile, sqlx::Error> {
        let mut stamped = profile.clone();
        stamped.updated_at = Utc::now();
        self.put_with_status(&stamped, RecordStatus::Pending).await
    }

    /// Upserts a profile preserving its timestamps.
    ///
    /// Sync write-back path: resolved records land here with status
    /// `synced` and their reconciled `updated_at` intact.
    pub async fn put_with_status(
        &self,
        profile: &UserProfile,
        status: RecordStatus,
    ) -> Result<UserProfile, sqlx::Error> {
        let settings =
            serde_json::to_string(&profile.settings).unwrap_or_else(|_| "{}".to_string());
        let date_of_birth = profile.date_of_birth.map(|d| d.to_string());
        let gender = profile.gender.map(|g| g.to_string());
        let created_at = profile.created_at.to_rfc3339();
        let updated_at = profile.updated_at.to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO user_profiles (id, email, full_name, height, height_unit, date_of_birth, gender, goal_weight, goal_weight_unit, settings, sync_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                full_name = excluded.full_name,
                height = excluded.height,
                height_unit = excluded.height_unit,
                date_of_birth = excluded.date_of_birth,
                gender = excluded.gender,
                goal_weight = excluded.goal_weight,
                goal_weight_unit = excluded.goal_weight_unit,
                settings = excluded.settings,
                sync_status = excluded.sync_status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(profile.height)
        .bind(profile.height_unit.to_string())
        .bind(&date_of_birth)
        .bind(&gender)
        .bind(profile.goal_weight)
        .bind(profile.goal_weight_unit.to_string())
        .bind(&settings)
        .bind(status.to_string())
        .bind(&created_at)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;

        self.get(&profile.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, id: &str) -> Result<Option<UserProfile>, sqlx::Error> {
        let row: Option<ProfileRow> = sqlx::query_as("SELECT * FROM user_profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(hydrate_profile))
    }

    pub async fn get_unsynced(&self) -> Result<Vec<UserProfile>, sqlx::Error> {
        let rows: Vec<ProfileRow> = sqlx::query_as(
            "SELECT * FROM user_profiles WHERE sync_status = 'pending' ORDER BY updated_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(hydrate_profile).collect())
    }

    /// Flips the record to `synced`, but only if it has not been edited
    /// since `expected_updated_at` was read. Returns whether a row changed.
    pub async fn mark_synced(
        &self,
        id: &str,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_profiles SET sync_status = 'synced' WHERE id = ? AND updated_at = ?",
        )
        .bind(id)
        .bind(expected_updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn hydrate_profile(row: ProfileRow) -> UserProfile {
    let settings: ProfileSettings = serde_json::from_str(&row.settings).unwrap_or_default();

    UserProfile {
        id: row.id,
        email: row.email,
        full_name: row.full_name,
        height: row.height,
        height_unit: row.height_unit.parse().unwrap_or_default(),
        date_of_birth: row
            .date_of_birth
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        gender: row.gender.as_deref().and_then(|g| g.parse().ok()),
        goal_weight: row.goal_weight,
        goal_weight_unit: row.goal_weight_unit.parse().unwrap_or_default(),
        settings,
        created_at: DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        updated_at: DateTime::parse_from_rfc3339(&row.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::{Gender, HeightUnit, WeightUnit};
    use tempfile::TempDir;

    async fn setup() -> (ProfileRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(Some(db_path)).await.unwrap();
        (ProfileRepository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (repo, _temp) = setup().await;

        let profile = UserProfile::new("user-1")
            .with_full_name("Sam")
            .with_height(180.0, HeightUnit::Cm)
            .with_gender(Gender::Male);
        let stored = repo.put(&profile).await.unwrap();

        assert_eq!(stored.id, "user-1");
        assert_eq!(stored.full_name, Some("Sam".to_string()));
        assert_eq!(stored.height, Some(180.0));
        assert_eq!(stored.gender, Some(Gender::Male));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (repo, _temp) = setup().await;
        let result = repo.get("nobody").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_singleton() {
        let (repo, _temp) = setup().await;

        let profile = UserProfile::new("user-1").with_full_name("Before");
        repo.put(&profile).await.unwrap();

        let mut edited = profile.clone();
        edited.full_name = Some("After".to_string());
        repo.put(&edited).await.unwrap();

        let fetched = repo.get("user-1").await.unwrap().unwrap();
        assert_eq!(fetched.full_name, Some("After".to_string()));
    }

    #[tokio::test]
    async fn test_put_bumps_updated_at() {
        let (repo, _temp) = setup().await;

        let profile = UserProfile::new("user-1");
        let first = repo.put(&profile).await.unwrap();
        let second = repo.put(&first).await.unwrap();

        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let (repo, _temp) = setup().await;

        let mut profile = UserProfile::new("user-1");
        profile.settings.units.weight = WeightUnit::Lbs;
        profile.settings.notifications.weekly_summary = false;
        profile
            .settings
            .extra
            .insert("theme".to_string(), serde_json::json!("dark"));
        repo.put(&profile).await.unwrap();

        let fetched = repo.get("user-1").await.unwrap().unwrap();
        assert_eq!(fetched.settings.units.weight, WeightUnit::Lbs);
        assert!(!fetched.settings.notifications.weekly_summary);
        assert_eq!(fetched.settings.extra["theme"], serde_json::json!("dark"));
    }

    #[tokio::test]
    async fn test_unsynced_and_mark_synced() {
        let (repo, _temp) = setup().await;

        let stored = repo.put(&UserProfile::new("user-1")).await.unwrap();
        assert_eq!(repo.get_unsynced().await.unwrap().len(), 1);

        let marked = repo.mark_synced("user-1", stored.updated_at).await.unwrap();
        assert!(marked);
        assert!(repo.get_unsynced().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_synced_stale_timestamp_is_noop() {
        let (repo, _temp) = setup().await;

        let stored = repo.put(&UserProfile::new("user-1")).await.unwrap();
        // Record is edited again after the sync pass read it.
        let newer = repo.put(&stored).await.unwrap();
        assert!(newer.updated_at > stored.updated_at);

        let marked = repo.mark_synced("user-1", stored.updated_at).await.unwrap();
        assert!(!marked);
        assert_eq!(repo.get_unsynced().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_with_status_preserves_updated_at() {
        let (repo, _temp) = setup().await;

        let profile = UserProfile::new("user-1");
        let stored = repo
            .put_with_status(&profile, RecordStatus::Synced)
            .await
            .unwrap();

        assert_eq!(stored.updated_at, profile.updated_at);
        assert!(repo.get_unsynced().await.unwrap().is_empty());
    }
}
