//! Rate Limiting
//!
//! Fixed-window request counting per (client key, operation class).
//!
//! A window opens on the first request for a key and lasts the class's
//! `window_seconds`. Requests inside the window are admitted until the
//! count reaches the class limit. The first request at or after the reset
//! instant opens a new window with a count of one. A client can therefore
//! get up to twice the limit across a window boundary.

pub mod middleware;
pub mod store;
pub mod sweep;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::clock::{Clock, SystemClock};
pub use store::{HitOutcome, MemoryRateLimitStore, RateLimitStore, RateLimitStoreError};
pub use sweep::{EveryNthCall, NeverSweep, RandomSweep, SweepPolicy};

// ============================================================================
// Policy table
// ============================================================================

/// Category of action with its own limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationClass {
    Default,
    Authentication,
    SessionCreation,
    PointAward,
}

impl OperationClass {
    pub const ALL: [OperationClass; 4] = [
        OperationClass::Default,
        OperationClass::Authentication,
        OperationClass::SessionCreation,
        OperationClass::PointAward,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::Default => "default",
            OperationClass::Authentication => "authentication",
            OperationClass::SessionCreation => "session_creation",
            OperationClass::PointAward => "point_award",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicy {
    /// Maximum admitted requests per window
    pub limit: u32,
    pub window_seconds: u64,
}

impl RateLimitPolicy {
    pub const fn new(limit: u32, window_seconds: u64) -> Self {
        Self {
            limit,
            window_seconds,
        }
    }

    /// Longest window whose length still fits in epoch milliseconds.
    pub const MAX_WINDOW_SECONDS: u64 = i64::MAX as u64 / 1000;

    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window_seconds.saturating_mul(1000)).unwrap_or(i64::MAX)
    }

    fn is_valid(&self) -> bool {
        self.limit > 0 && (1..=Self::MAX_WINDOW_SECONDS).contains(&self.window_seconds)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitConfigError {
    #[error("Invalid rate-limit table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate-limit policy for {0} needs a limit of at least 1 and a window between 1 and {max} seconds", max = RateLimitPolicy::MAX_WINDOW_SECONDS)]
    InvalidPolicy(OperationClass),
}

/// Policy per operation class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitTable {
    policies: HashMap<OperationClass, RateLimitPolicy>,
}

impl Default for RateLimitTable {
    fn default() -> Self {
        let policies = HashMap::from([
            (OperationClass::Default, RateLimitPolicy::new(100, 60)),
            (OperationClass::Authentication, RateLimitPolicy::new(5, 15 * 60)),
            (OperationClass::SessionCreation, RateLimitPolicy::new(10, 60 * 60)),
            (OperationClass::PointAward, RateLimitPolicy::new(20, 60)),
        ]);
        Self { policies }
    }
}

impl RateLimitTable {
    /// Parse `{"authentication": {"limit": 3, "windowSeconds": 60}, ...}`
    /// and merge it over the defaults.
    pub fn from_json(json: &str) -> Result<Self, RateLimitConfigError> {
        let overrides: HashMap<OperationClass, RateLimitPolicy> = serde_json::from_str(json)?;
        let mut table = Self::default();
        for (class, policy) in overrides {
            table = table.with_policy(class, policy)?;
        }
        Ok(table)
    }

    pub fn with_policy(
        mut self,
        class: OperationClass,
        policy: RateLimitPolicy,
    ) -> Result<Self, RateLimitConfigError> {
        if !policy.is_valid() {
            return Err(RateLimitConfigError::InvalidPolicy(class));
        }
        self.policies.insert(class, policy);
        Ok(self)
    }

    /// Policy for `class`, falling back to the `default` class.
    pub fn policy(&self, class: OperationClass) -> RateLimitPolicy {
        self.policies
            .get(&class)
            .or_else(|| self.policies.get(&OperationClass::Default))
            .copied()
            .unwrap_or(RateLimitPolicy::new(100, 60))
    }
}

// ============================================================================
// Counters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub client: String,
    pub class: OperationClass,
}

impl RateLimitKey {
    pub fn new(client: impl Into<String>, class: OperationClass) -> Self {
        Self {
            client: client.into(),
            class,
        }
    }
}

/// Window state for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    /// Window end, Unix epoch milliseconds
    pub reset_at_ms: i64,
}

impl RateLimitEntry {
    pub fn fresh(now_ms: i64, policy: &RateLimitPolicy) -> Self {
        Self {
            count: 1,
            reset_at_ms: now_ms.saturating_add(policy.window_ms()),
        }
    }

    /// The window is over at its reset instant, not after it.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.reset_at_ms <= now_ms
    }
}

/// Admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: i64,
    /// Seconds until the window resets, rounded up. Only set on denial.
    pub retry_after_secs: Option<u64>,
}

impl RateLimitResult {
    /// Reset instant as Unix epoch seconds (rounded up)
    pub fn reset_at_secs(&self) -> i64 {
        self.reset_at_ms.div_euclid(1000) + i64::from(self.reset_at_ms.rem_euclid(1000) != 0)
    }
}

// ============================================================================
// Limiter
// ============================================================================

/// Fixed-window rate limiter over an injected store.
pub struct RateLimiter<S = MemoryRateLimitStore> {
    store: Arc<S>,
    table: RateLimitTable,
    clock: Arc<dyn Clock>,
    sweep: Arc<dyn SweepPolicy>,
}

impl<S> Clone for RateLimiter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            table: self.table.clone(),
            clock: Arc::clone(&self.clock),
            sweep: Arc::clone(&self.sweep),
        }
    }
}

impl<S> fmt::Debug for RateLimiter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("table", &self.table)
            .field("sweep", &self.sweep)
            .finish_non_exhaustive()
    }
}

impl RateLimiter<MemoryRateLimitStore> {
    pub fn in_memory(table: RateLimitTable) -> Self {
        Self::new(MemoryRateLimitStore::new(), table)
    }
}

impl<S> RateLimiter<S>
where
    S: RateLimitStore + Send + Sync + 'static,
{
    /// System clock, probabilistic sweep.
    pub fn new(store: S, table: RateLimitTable) -> Self {
        Self {
            store: Arc::new(store),
            table,
            clock: Arc::new(SystemClock),
            sweep: Arc::new(RandomSweep::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sweep_policy(mut self, sweep: Arc<dyn SweepPolicy>) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn table(&self) -> &RateLimitTable {
        &self.table
    }

    /// Count a request from `client` for `class` and decide admission.
    pub async fn admit(
        &self,
        client: &str,
        class: OperationClass,
    ) -> Result<RateLimitResult, RateLimitStoreError> {
        let now_ms = self.clock.now_ms();

        if self.sweep.should_sweep() {
            // A failed sweep must not block admission.
            if let Err(e) = self.sweep_at(now_ms).await {
                tracing::warn!(error = %e, "Rate-limit sweep failed");
            }
        }

        let policy = self.table.policy(class);
        let key = RateLimitKey::new(client, class);
        let HitOutcome { allowed, entry } = self.store.hit(&key, &policy, now_ms).await?;

        let retry_after_secs = (!allowed).then(|| {
            let remaining_ms = (entry.reset_at_ms - now_ms).max(0) as u64;
            remaining_ms.div_ceil(1000)
        });

        if let Some(retry_after) = retry_after_secs {
            tracing::warn!(
                client,
                class = %class,
                limit = policy.limit,
                retry_after,
                "Rate limit exceeded"
            );
        }

        Ok(RateLimitResult {
            allowed,
            limit: policy.limit,
            remaining: policy.limit.saturating_sub(entry.count),
            reset_at_ms: entry.reset_at_ms,
            retry_after_secs,
        })
    }

    /// Purge expired entries now.
    pub async fn sweep(&self) -> Result<usize, RateLimitStoreError> {
        self.sweep_at(self.clock.now_ms()).await
    }

    async fn sweep_at(&self, now_ms: i64) -> Result<usize, RateLimitStoreError> {
        let removed = self.store.sweep_expired(now_ms).await?;
        if removed > 0 {
            tracing::debug!(removed, "Swept expired rate-limit entries");
        }
        Ok(removed)
    }

    /// Sweep on a fixed interval in a background task.
    ///
    /// Must be called inside a tokio runtime. Abort the handle to stop.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = limiter.sweep().await {
                    tracing::warn!(error = %e, "Background rate-limit sweep failed");
                }
            }
        })
    }
}
