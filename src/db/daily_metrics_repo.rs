use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{DailyMetricEntry, RecordStatus};

pub struct DailyMetricsRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct DailyMetricRow {
    id: String,
    user_id: String,
    date: String,
    steps: Option<i64>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl DailyMetricsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upserts an entry from the UI write path.
    ///
    /// Stamps `updated_at` to now and resets the record to `pending`.
    pub async fn put(&self, entry: &DailyMetricEntry) -> Result<DailyMetricEntry, sqlx::Error> {
        let mut stamped = entry.clone();
        stamped.updated_at = Utc::now();
        self.put_with_status(&stamped, RecordStatus::Pending).await
    }

    /// Upserts an entry preserving its timestamps (sync write-back path).
    pub async fn put_with_status(
        &self,
        entry: &DailyMetricEntry,
        status: RecordStatus,
    ) -> Result<DailyMetricEntry, sqlx::Error> {
        let id = entry.id.to_string();
        let date = entry.date.to_string();
        let steps = entry.steps.map(|s| s as i64);
        let created_at = entry.created_at.to_rfc3339();
        let updated_at = entry.updated_at.to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO daily_metrics (id, user_id, date, steps, notes, sync_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                date = excluded.date,
                steps = excluded.steps,
                notes = excluded.notes,
                sync_status = excluded.sync_status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(&entry.user_id)
        .bind(&date)
        .bind(steps)
        .bind(&entry.notes)
        .bind(status.to_string())
        .bind(&created_at)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;

        self.get(entry.id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<DailyMetricEntry>, sqlx::Error> {
        let id_str = id.to_string();

        let row: Option<DailyMetricRow> = sqlx::query_as("SELECT * FROM daily_metrics WHERE id = ?")
            .bind(&id_str)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(hydrate_entry))
    }

    /// One record per user per calendar day, if present.
    pub async fn get_by_user_and_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyMetricEntry>, sqlx::Error> {
        let date_str = date.to_string();

        let row: Option<DailyMetricRow> =
            sqlx::query_as("SELECT * FROM daily_metrics WHERE user_id = ? AND date = ?")
                .bind(user_id)
                .bind(&date_str)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(hydrate_entry))
    }

    pub async fn query_by_user_and_range(
        &self,
        user_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailyMetricEntry>, sqlx::Error> {
        let from_str = from.map_or_else(|| "0000-01-01".to_string(), |d| d.to_string());
        let to_str = to.map_or_else(|| "9999-12-31".to_string(), |d| d.to_string());

        let rows: Vec<DailyMetricRow> = sqlx::query_as(
            r#"
            SELECT * FROM daily_metrics
            WHERE user_id = ? AND date >= ? AND date <= ?
            ORDER BY date
            "#,
        )
        .bind(user_id)
        .bind(&from_str)
        .bind(&to_str)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(hydrate_entry).collect())
    }

    pub async fn get_unsynced(&self) -> Result<Vec<DailyMetricEntry>, sqlx::Error> {
        let rows: Vec<DailyMetricRow> = sqlx::query_as(
            "SELECT * FROM daily_metrics WHERE sync_status = 'pending' ORDER BY date",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(hydrate_entry).collect())
    }

    /// Flips the record to `synced`, but only if it has not been edited
    /// since `expected_updated_at` was read. Returns whether a row changed.
    pub async fn mark_synced(
        &self,
        id: Uuid,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE daily_metrics SET sync_status = 'synced' WHERE id = ? AND updated_at = ?",
        )
        .bind(id.to_string())
        .bind(expected_updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn hydrate_entry(row: DailyMetricRow) -> DailyMetricEntry {
    DailyMetricEntry {
        id: Uuid::parse_str(&row.id).unwrap_or_default(),
        user_id: row.user_id,
        date: NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        steps: row.steps.map(|s| s as u32),
        notes: row.notes,
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
    use tempfile::TempDir;

    async fn setup() -> (DailyMetricsRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(Some(db_path)).await.unwrap();
        (DailyMetricsRepository::new(pool), temp_dir)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_put_and_get_by_date() {
        let (repo, _temp) = setup().await;

        let entry = DailyMetricEntry::new("user-1", day(15)).with_steps(8000);
        repo.put(&entry).await.unwrap();

        let fetched = repo
            .get_by_user_and_date("user-1", day(15))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, entry.id);
        assert_eq!(fetched.steps, Some(8000));
    }

    #[tokio::test]
    async fn test_get_by_date_missing_returns_none() {
        let (repo, _temp) = setup().await;
        let fetched = repo.get_by_user_and_date("user-1", day(1)).await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_incremental_update_same_row() {
        let (repo, _temp) = setup().await;

        let entry = DailyMetricEntry::new("user-1", day(15)).with_steps(2000);
        repo.put(&entry).await.unwrap();

        // Step count refreshed later the same day.
        let mut refreshed = entry.clone();
        refreshed.steps = Some(9500);
        repo.put(&refreshed).await.unwrap();

        let all = repo
            .query_by_user_and_range("user-1", None, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].steps, Some(9500));
    }

    #[tokio::test]
    async fn test_one_row_per_user_per_day() {
        let (repo, _temp) = setup().await;

        repo.put(&DailyMetricEntry::new("user-1", day(15)))
            .await
            .unwrap();
        // A second id for the same user and day violates the unique index.
        let result = repo.put(&DailyMetricEntry::new("user-1", day(15))).await;
        assert!(result.is_err());

        // A different user on the same day is fine.
        repo.put(&DailyMetricEntry::new("user-2", day(15)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unsynced_and_mark_synced() {
        let (repo, _temp) = setup().await;

        let stored = repo
            .put(&DailyMetricEntry::new("user-1", day(1)))
            .await
            .unwrap();
        assert_eq!(repo.get_unsynced().await.unwrap().len(), 1);

        assert!(repo.mark_synced(stored.id, stored.updated_at).await.unwrap());
        assert!(repo.get_unsynced().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_synced_stale_timestamp_is_noop() {
        let (repo, _temp) = setup().await;

        let stored = repo
            .put(&DailyMetricEntry::new("user-1", day(1)))
            .await
            .unwrap();
        let newer = repo.put(&stored).await.unwrap();

        assert!(!repo.mark_synced(stored.id, stored.updated_at).await.unwrap());
        assert_eq!(repo.get_unsynced().await.unwrap().len(), 1);
        assert!(newer.updated_at > stored.updated_at);
    }
}
