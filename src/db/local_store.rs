//! Facade over the per-kind repositories.
//!
//! The Sync Manager talks to this type only: it enumerates pending work,
//! reports the pending count, and wipes everything on logout. Reads and
//! writes for a single kind go through the kind's repository.

use sqlx::SqlitePool;

use super::{BodyMetricsRepository, DailyMetricsRepository, ProfileRepository};
use crate::models::{BodyMetricEntry, DailyMetricEntry, UserProfile};

/// Every pending record, grouped by kind.
///
/// This is the authoritative definition of "work to do" for a sync pass.
#[derive(Debug, Default)]
pub struct UnsyncedRecords {
    pub profiles: Vec<UserProfile>,
    pub body_metrics: Vec<BodyMetricEntry>,
    pub daily_metrics: Vec<DailyMetricEntry>,
}

impl UnsyncedRecords {
    pub fn total(&self) -> usize {
        self.profiles.len() + self.body_metrics.len() + self.daily_metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Durable local store for the three record kinds.
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn profiles(&self) -> ProfileRepository {
        ProfileRepository::new(self.pool.clone())
    }

    pub fn body_metrics(&self) -> BodyMetricsRepository {
        BodyMetricsRepository::new(self.pool.clone())
    }

    pub fn daily_metrics(&self) -> DailyMetricsRepository {
        DailyMetricsRepository::new(self.pool.clone())
    }

    /// Enumerates every record still waiting to reach the remote store.
    pub async fn get_unsynced(&self) -> Result<UnsyncedRecords, sqlx::Error> {
        Ok(UnsyncedRecords {
            profiles: self.profiles().get_unsynced().await?,
            body_metrics: self.body_metrics().get_unsynced().await?,
            daily_metrics: self.daily_metrics().get_unsynced().await?,
        })
    }

    pub async fn pending_count(&self) -> Result<usize, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM user_profiles WHERE sync_status = 'pending')
              + (SELECT COUNT(*) FROM body_metrics WHERE sync_status = 'pending')
              + (SELECT COUNT(*) FROM daily_metrics WHERE sync_status = 'pending')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count as usize)
    }

    /// Wipes all three kinds in a single transaction (logout path).
    pub async fn clear_all(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_profiles")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM body_metrics")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM daily_metrics")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
