//! LogBody Core Library
//!
//! Offline-first storage and sync for body-composition tracking: a durable
//! local store for the three record kinds (profile, body metrics, daily
//! metrics), a pure conflict resolver, and the sync manager that reconciles
//! local state against the remote store.

pub mod config;
pub mod db;
pub mod models;
pub mod sync;

pub use config::{Config, ConfigError, SyncConfig};
pub use db::{
    init_db, BodyMetricsRepository, DailyMetricsRepository, LocalStore, ProfileRepository,
    UnsyncedRecords,
};
pub use models::{
    BodyFatMethod, BodyMetricEntry, DailyMetricEntry, Gender, HeightUnit,
    NotificationPreferences, ProfileSettings, RecordStatus, UnitPreferences, UserProfile,
    WeightUnit,
};
pub use sync::{
    check_server, ConflictResolver, ConflictStrategy, HttpRemoteStore, RemoteError, RemoteStore,
    SubscriptionId, SyncError, SyncManager, SyncState, SyncStatus,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
