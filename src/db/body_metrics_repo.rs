use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{BodyMetricEntry, RecordStatus};

pub struct BodyMetricsRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct BodyMetricRow {
    id: String,
    user_id: String,
    date: String,
    weight: Option<f64>,
    weight_unit: String,
    body_fat_percentage: Option<f64>,
    body_fat_method: Option<String>,
    lean_mass: Option<f64>,
    bone_mass: Option<f64>,
    fat_mass: Option<f64>,
    photo_url: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl BodyMetricsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upserts an entry from the UI write path.
    ///
    /// Stamps `updated_at` to now and resets the record to `pending`.
    pub async fn put(&self, entry: &BodyMetricEntry) -> Result<BodyMetricEntry, sqlx::Error> {
        let mut stamped = entry.clone();
        stamped.updated_at = Utc::now();
        self.put_with_status(&stamped, RecordStatus::Pending).await
    }

    /// Upserts an entry preserving its timestamps (sync write-back path).
    pub async fn put_with_status(
        &self,
        entry: &BodyMetricEntry,
        status: RecordStatus,
    ) -> Result<BodyMetricEntry, sqlx::Error> {
        let id = entry.id.to_string();
        let date = entry.date.to_string();
        let body_fat_method = entry.body_fat_method.map(|m| m.to_string());
        let created_at = entry.created_at.to_rfc3339();
        let updated_at = entry.updated_at.to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO body_metrics (id, user_id, date, weight, weight_unit, body_fat_percentage, body_fat_method, lean_mass, bone_mass, fat_mass, photo_url, notes, sync_status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                date = excluded.date,
                weight = excluded.weight,
                weight_unit = excluded.weight_unit,
                body_fat_percentage = excluded.body_fat_percentage,
                body_fat_method = excluded.body_fat_method,
                lean_mass = excluded.lean_mass,
                bone_mass = excluded.bone_mass,
                fat_mass = excluded.fat_mass,
                photo_url = excluded.photo_url,
                notes = excluded.notes,
                sync_status = excluded.sync_status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(&entry.user_id)
        .bind(&date)
        .bind(entry.weight)
        .bind(entry.weight_unit.to_string())
        .bind(entry.body_fat_percentage)
        .bind(&body_fat_method)
        .bind(entry.lean_mass)
        .bind(entry.bone_mass)
        .bind(entry.fat_mass)
        .bind(&entry.photo_url)
        .bind(&entry.notes)
        .bind(status.to_string())
        .bind(&created_at)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;

        self.get(entry.id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<BodyMetricEntry>, sqlx::Error> {
        let id_str = id.to_string();

        let row: Option<BodyMetricRow> = sqlx::query_as("SELECT * FROM body_metrics WHERE id = ?")
            .bind(&id_str)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(hydrate_entry))
    }

    /// Returns a user's entries ordered by date ascending, optionally
    /// bounded to an inclusive date range.
    pub async fn query_by_user_and_range(
        &self,
        user_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<BodyMetricEntry>, sqlx::Error> {
        let from_str = from.map_or_else(|| "0000-01-01".to_string(), |d| d.to_string());
        let to_str = to.map_or_else(|| "9999-12-31".to_string(), |d| d.to_string());

        let rows: Vec<BodyMetricRow> = sqlx::query_as(
            r#"
            SELECT * FROM body_metrics
            WHERE user_id = ? AND date >= ? AND date <= ?
            ORDER BY date, created_at
            "#,
        )
        .bind(user_id)
        .bind(&from_str)
        .bind(&to_str)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(hydrate_entry).collect())
    }

    pub async fn get_unsynced(&self) -> Result<Vec<BodyMetricEntry>, sqlx::Error> {
        let rows: Vec<BodyMetricRow> = sqlx::query_as(
            "SELECT * FROM body_metrics WHERE sync_status = 'pending' ORDER BY date, created_at",
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
            "UPDATE body_metrics SET sync_status = 'synced' WHERE id = ? AND updated_at = ?",
        )
        .bind(id.to_string())
        .bind(expected_updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn hydrate_entry(row: BodyMetricRow) -> BodyMetricEntry {
    BodyMetricEntry {
        id: Uuid::parse_str(&row.id).unwrap_or_default(),
        user_id: row.user_id,
        date: NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        weight: row.weight,
        weight_unit: row.weight_unit.parse().unwrap_or_default(),
        body_fat_percentage: row.body_fat_percentage,
        body_fat_method: row.body_fat_method.as_deref().and_then(|m| m.parse().ok()),
        lean_mass: row.lean_mass,
        bone_mass: row.bone_mass,
        fat_mass: row.fat_mass,
        photo_url: row.photo_url,
        notes: row.notes,
        created_at: DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        updated_at: DateTime::parse_from_rfc3339(&row.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    }
}
