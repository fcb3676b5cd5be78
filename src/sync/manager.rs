//! Sync protocol state machine.
//!
//! The only stateful, side-effecting component of the sync core. One
//! `SyncManager` is constructed per authenticated session and torn down
//! with `destroy` at logout; UI code receives it by reference.
//!
//! A pass walks `idle -> syncing -> (success | error) -> idle`. Success and
//! error are momentary states notified to subscribers, not resting states.
//! Pushes are idempotent upserts keyed by record id, so a pass repeated
//! after a lost acknowledgement is harmless.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::conflict::{ConflictResolver, ConflictStrategy};
use super::error::SyncError;
use super::remote::RemoteStore;
use crate::db::LocalStore;
use crate::models::{BodyMetricEntry, DailyMetricEntry, RecordStatus, UserProfile, WeightUnit};

/// Pass-level status published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Success,
    Error,
}

/// State published to every subscriber on each change.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub is_syncing: bool,
    pub last_sync_date: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    pub pending_sync_count: usize,
    pub is_online: bool,
    pub error: Option<String>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            is_syncing: false,
            last_sync_date: None,
            sync_status: SyncStatus::Idle,
            pending_sync_count: 0,
            is_online: true,
            error: None,
        }
    }
}

/// Handle returned by `subscribe`, consumed by `unsubscribe`.
pub type SubscriptionId = u64;

type Listener = Box<dyn Fn(&SyncState) + Send + Sync>;

/// Orchestrates sync passes between the local and remote stores.
pub struct SyncManager {
    store: LocalStore,
    remote: Arc<dyn RemoteStore>,
    resolver: ConflictResolver,
    sync_interval: Duration,
    // Handle back to our own Arc, used to detach background tasks without
    // keeping the manager alive past destroy.
    self_ref: Weak<SyncManager>,
    state: Mutex<SyncState>,
    listeners: Mutex<HashMap<SubscriptionId, Listener>>,
    next_subscription_id: AtomicU64,
    session_user: Mutex<Option<String>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl SyncManager {
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteStore>,
        strategy: ConflictStrategy,
        sync_interval: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            store,
            remote,
            resolver: ConflictResolver::new(strategy),
            sync_interval,
            self_ref: me.clone(),
            state: Mutex::new(SyncState::default()),
            listeners: Mutex::new(HashMap::new()),
            next_subscription_id: AtomicU64::new(1),
            session_user: Mutex::new(None),
            timer: Mutex::new(None),
        })
    }

    /// Starts the periodic sync timer. No-op if already started.
    pub fn start(&self) {
        let mut timer = self.timer.lock().unwrap();
        if timer.is_some() {
            return;
        }

        let weak = self.self_ref.clone();
        let interval = self.sync_interval;
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it so the timer
            // fires one full interval after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(manager) => manager.sync_if_needed().await,
                    None => break,
                }
            }
        }));
    }

    /// Releases the timer and listener set. Idempotent.
    pub fn destroy(&self) {
        if let Some(handle) = self.timer.lock().unwrap().take() {
            handle.abort();
        }
        self.listeners.lock().unwrap().clear();
    }

    // ========== State publication ==========

    /// Snapshot of the current published state.
    pub fn state(&self) -> SyncState {
        self.state.lock().unwrap().clone()
    }

    /// Registers a listener, invoking it immediately with the current state.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SyncState) + Send + Sync + 'static,
    {
        let id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.state();
        listener(&snapshot);
        self.listeners.lock().unwrap().insert(id, Box::new(listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().unwrap().remove(&id);
    }

    fn notify_listeners(&self) {
        let snapshot = self.state();
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.values() {
            listener(&snapshot);
        }
    }

    // ========== Session and connectivity ==========

    /// Sets the session user; local convenience reads and writes are scoped
    /// to this id.
    pub fn set_user(&self, user_id: Option<String>) {
        *self.session_user.lock().unwrap() = user_id;
    }

    /// Connectivity signal from the hosting environment. An offline-to-
    /// online transition kicks off a background sync attempt.
    pub fn set_online(&self, online: bool) {
        let came_online = {
            let mut state = self.state.lock().unwrap();
            let was_online = state.is_online;
            state.is_online = online;
            online && !was_online
        };
        self.notify_listeners();

        if came_online {
            self.spawn_background_sync();
        }
    }

    /// Spawns a best-effort sync attempt detached from the caller.
    ///
    /// The caller's return value never depends on the attempt's outcome;
    /// failures land only in the published state.
    fn spawn_background_sync(&self) {
        if let Some(manager) = self.self_ref.upgrade() {
            tokio::spawn(async move {
                manager.sync_if_needed().await;
            });
        }
    }

    // ========== Sync passes ==========

    /// Runs one pass if there is pending work and the device is online.
    pub async fn sync_if_needed(&self) {
        {
            let state = self.state.lock().unwrap();
            if !state.is_online || state.is_syncing {
                return;
            }
        }

        let pending = match self.store.pending_count().await {
            Ok(count) => count,
            Err(e) => {
                debug!("pending count unavailable, skipping sync: {}", e);
                return;
            }
        };

        if pending > 0 {
            self.sync_all().await;
        }
    }

    /// Runs one sync pass to completion.
    ///
    /// Callers awaiting this observe the final state. A concurrent trigger
    /// while a pass is in flight is a no-op; the guard is set synchronously
    /// before the first suspension point, so there is no check/set race.
    pub async fn sync_all(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.is_syncing || !state.is_online {
                return;
            }
            state.is_syncing = true;
            state.sync_status = SyncStatus::Syncing;
            state.error = None;
        }
        self.notify_listeners();

        let result = self.run_pass().await;

        let pending = self.store.pending_count().await.ok();

        {
            let mut state = self.state.lock().unwrap();
            state.is_syncing = false;
            if let Some(count) = pending {
                state.pending_sync_count = count;
            }
            match &result {
                Ok(()) => {
                    state.sync_status = SyncStatus::Success;
                    state.last_sync_date = Some(Utc::now());
                    state.error = None;
                }
                Err(message) => {
                    state.sync_status = SyncStatus::Error;
                    state.error = Some(message.clone());
                }
            }
        }
        // Success/error is observed momentarily before settling back to idle.
        self.notify_listeners();

        self.state.lock().unwrap().sync_status = SyncStatus::Idle;
        self.notify_listeners();
    }

    /// Pushes every pending record. Per-record failures are contained;
    /// pass-level failures abort and become the returned message.
    async fn run_pass(&self) -> Result<(), String> {
        let user_id = match self.remote.current_user().await {
            Ok(Some(id)) => id,
            Ok(None) => return Err("Not authenticated".to_string()),
            Err(e) => return Err(e.to_string()),
        };

        let unsynced = self
            .store
            .get_unsynced()
            .await
            .map_err(|e| format!("Local storage unavailable: {}", e))?;

        let last_sync = self.state.lock().unwrap().last_sync_date;
        let mut failed = 0usize;

        // Stable processing order: profiles, then body metrics, then daily
        // metrics.
        for profile in &unsynced.profiles {
            if let Err(e) = self.push_profile(profile, &user_id, last_sync).await {
                warn!(profile_id = %profile.id, "profile sync failed: {}", e);
                failed += 1;
            }
        }

        for entry in &unsynced.body_metrics {
            if let Err(e) = self.push_body_metrics(entry, &user_id, last_sync).await {
                warn!(entry_id = %entry.id, "body metrics sync failed: {}", e);
                failed += 1;
            }
        }

        for entry in &unsynced.daily_metrics {
            if let Err(e) = self.push_daily_metrics(entry, &user_id, last_sync).await {
                warn!(entry_id = %entry.id, "daily metrics sync failed: {}", e);
                failed += 1;
            }
        }

        if failed > 0 {
            Err(format!("{} record(s) failed to sync", failed))
        } else {
            Ok(())
        }
    }

    async fn push_profile(
        &self,
        profile: &UserProfile,
        user_id: &str,
        last_sync: Option<DateTime<Utc>>,
    ) -> Result<(), SyncError> {
        let mut outgoing = profile.clone();
        outgoing.id = user_id.to_string();

        if let Some(remote_copy) = self.remote.fetch_profile(user_id).await? {
            if ConflictResolver::has_conflict(
                outgoing.updated_at,
                remote_copy.updated_at,
                last_sync,
            ) {
                let resolved = self.resolver.resolve_profile(&outgoing, &remote_copy);
                self.remote.upsert_profile(&stamped_profile(&resolved)).await?;
                self.store
                    .profiles()
                    .put_with_status(&resolved, RecordStatus::Synced)
                    .await?;
                return Ok(());
            }
        }

        self.remote.upsert_profile(&stamped_profile(&outgoing)).await?;
        self.store
            .profiles()
            .mark_synced(&profile.id, profile.updated_at)
            .await?;
        Ok(())
    }

    async fn push_body_metrics(
        &self,
        entry: &BodyMetricEntry,
        user_id: &str,
        last_sync: Option<DateTime<Utc>>,
    ) -> Result<(), SyncError> {
        let mut outgoing = entry.clone();
        outgoing.user_id = user_id.to_string();

        if let Some(remote_copy) = self.remote.fetch_body_metrics(entry.id).await? {
            if ConflictResolver::has_conflict(
                outgoing.updated_at,
                remote_copy.updated_at,
                last_sync,
            ) {
                let resolved = self.resolver.resolve_body_metrics(&outgoing, &remote_copy);
                self.remote
                    .upsert_body_metrics(&stamped_body_metrics(&resolved))
                    .await?;
                self.store
                    .body_metrics()
                    .put_with_status(&resolved, RecordStatus::Synced)
                    .await?;
                return Ok(());
            }
        }

        self.remote
            .upsert_body_metrics(&stamped_body_metrics(&outgoing))
            .await?;
        self.store
            .body_metrics()
            .mark_synced(entry.id, entry.updated_at)
            .await?;
        Ok(())
    }

    async fn push_daily_metrics(
        &self,
        entry: &DailyMetricEntry,
        user_id: &str,
        last_sync: Option<DateTime<Utc>>,
    ) -> Result<(), SyncError> {
        let mut outgoing = entry.clone();
        outgoing.user_id = user_id.to_string();

        if let Some(remote_copy) = self.remote.fetch_daily_metrics(entry.id).await? {
            if ConflictResolver::has_conflict(
                outgoing.updated_at,
                remote_copy.updated_at,
                last_sync,
            ) {
                let resolved = self.resolver.resolve_daily_metrics(&outgoing, &remote_copy);
                self.remote
                    .upsert_daily_metrics(&stamped_daily_metrics(&resolved))
                    .await?;
                self.store
                    .daily_metrics()
                    .put_with_status(&resolved, RecordStatus::Synced)
                    .await?;
                return Ok(());
            }
        }

        self.remote
            .upsert_daily_metrics(&stamped_daily_metrics(&outgoing))
            .await?;
        self.store
            .daily_metrics()
            .mark_synced(entry.id, entry.updated_at)
            .await?;
        Ok(())
    }

    // ========== Convenience write paths ==========

    /// Logs a weight measurement for today. Writes locally and returns
    /// immediately; a background sync attempt follows without being awaited.
    pub async fn log_weight(
        &self,
        weight: f64,
        unit: WeightUnit,
        notes: Option<&str>,
    ) -> Result<BodyMetricEntry, SyncError> {
        let user_id = self.require_user()?;

        let mut entry =
            BodyMetricEntry::new(user_id, Utc::now().date_naive()).with_weight(weight, unit);
        if let Some(notes) = notes {
            entry = entry.with_notes(notes);
        }

        let stored = self.store.body_metrics().put(&entry).await?;
        self.refresh_pending_count().await;
        self.spawn_background_sync();
        Ok(stored)
    }

    /// Logs or refreshes today's daily metrics. The day's record is updated
    /// in place; step counts overwrite, notes replace when provided.
    pub async fn log_daily_metrics(
        &self,
        steps: Option<u32>,
        notes: Option<&str>,
    ) -> Result<DailyMetricEntry, SyncError> {
        let user_id = self.require_user()?;
        let today = Utc::now().date_naive();

        let entry = match self
            .store
            .daily_metrics()
            .get_by_user_and_date(&user_id, today)
            .await?
        {
            Some(mut existing) => {
                if steps.is_some() {
                    existing.steps = steps;
                }
                if let Some(notes) = notes {
                    existing.notes = Some(notes.to_string());
                }
                existing
            }
            None => {
                let mut fresh = DailyMetricEntry::new(user_id, today);
                fresh.steps = steps;
                fresh.notes = notes.map(|n| n.to_string());
                fresh
            }
        };

        let stored = self.store.daily_metrics().put(&entry).await?;
        self.refresh_pending_count().await;
        self.spawn_background_sync();
        Ok(stored)
    }

    // ========== Read-through for optimistic rendering ==========

    /// Local body-metric entries for the session user, empty when signed
    /// out rather than erroring.
    pub async fn get_local_body_metrics(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<BodyMetricEntry>, SyncError> {
        let user_id = match self.session_user.lock().unwrap().clone() {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };

        Ok(self
            .store
            .body_metrics()
            .query_by_user_and_range(&user_id, from, to)
            .await?)
    }

    /// The session user's daily metrics for one day, `None` when signed out.
    pub async fn get_local_daily_metrics(
        &self,
        date: NaiveDate,
    ) -> Result<Option<DailyMetricEntry>, SyncError> {
        let user_id = match self.session_user.lock().unwrap().clone() {
            Some(id) => id,
            None => return Ok(None),
        };

        Ok(self
            .store
            .daily_metrics()
            .get_by_user_and_date(&user_id, date)
            .await?)
    }

    // ========== Lifecycle ==========

    /// Wipes the local store and resets to the initial idle state (logout).
    pub async fn clear_all_data(&self) -> Result<(), SyncError> {
        self.store.clear_all().await?;

        {
            let mut state = self.state.lock().unwrap();
            state.is_syncing = false;
            state.last_sync_date = None;
            state.sync_status = SyncStatus::Idle;
            state.pending_sync_count = 0;
            state.error = None;
        }
        self.notify_listeners();
        Ok(())
    }

    fn require_user(&self) -> Result<String, SyncError> {
        self.session_user
            .lock()
            .unwrap()
            .clone()
            .ok_or(SyncError::NotAuthenticated)
    }

    async fn refresh_pending_count(&self) {
        match self.store.pending_count().await {
            Ok(count) => {
                self.state.lock().unwrap().pending_sync_count = count;
                self.notify_listeners();
            }
            Err(e) => debug!("pending count refresh failed: {}", e),
        }
    }
}

/// The remote copy carries the push time as its write timestamp; the remote
/// side runs its own last-write-wins on this field.
fn stamped_profile(profile: &UserProfile) -> UserProfile {
    let mut stamped = profile.clone();
    stamped.updated_at = Utc::now();
    stamped
}

fn stamped_body_metrics(entry: &BodyMetricEntry) -> BodyMetricEntry {
    let mut stamped = entry.clone();
    stamped.updated_at = Utc::now();
    stamped
}

fn stamped_daily_metrics(entry: &DailyMetricEntry) -> DailyMetricEntry {
    let mut stamped = entry.clone();
    stamped.updated_at = Utc::now();
    stamped
}
