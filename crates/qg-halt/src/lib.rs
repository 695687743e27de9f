//! Global trading halt (kill switch) with externalized state.
//!
//! # Invariants
//!
//! - **Checked first.** [`KillSwitch::is_active`] must be consulted on every
//!   signal before any other work; when it reports active, the pipeline emits
//!   no orders.
//! - **Fail-closed by default.** If the backing store cannot be reached, the
//!   switch reports *active* (trading halted) under
//!   [`HaltPolicy::FailClosed`]. [`HaltPolicy::FailOpen`] exists as an
//!   explicit opt-in for offline dry runs only.
//! - **Reasons are preserved.** Activation and deactivation record the
//!   operator-supplied reason and a timestamp so the cause is visible before
//!   anyone flips the switch back.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, warn};

// ---------------------------------------------------------------------------
// Store boundary
// ---------------------------------------------------------------------------

/// The backing store is unavailable or refused the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(pub String);

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "halt store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Minimal key-value contract the kill switch needs from its backing store.
///
/// Production wires a Redis-like service here; tests and single-process
/// deployments use [`MemoryHaltStore`].
#[async_trait]
pub trait HaltStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory [`HaltStore`] with identical semantics to the external store.
#[derive(Debug, Default)]
pub struct MemoryHaltStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryHaltStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HaltStore for MemoryHaltStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.lock().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Kill switch
// ---------------------------------------------------------------------------

const KEY_ACTIVE: &str = "kill_switch:active";
const KEY_REASON: &str = "kill_switch:reason";
const KEY_ACTIVATED_AT: &str = "kill_switch:activated_at";
const KEY_DEACTIVATED_AT: &str = "kill_switch:deactivated_at";
const KEY_DEACTIVATION_REASON: &str = "kill_switch:deactivation_reason";

/// What [`KillSwitch::is_active`] reports when the store is unreachable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HaltPolicy {
    /// Store outage halts trading (default).
    FailClosed,
    /// Store outage is treated as "not halted". Dry-run environments only.
    FailOpen,
}

/// Snapshot of the kill-switch state plus its metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KillSwitchState {
    pub active: bool,
    pub reason: Option<String>,
    pub activated_at: Option<String>,
    pub deactivated_at: Option<String>,
    pub deactivation_reason: Option<String>,
}

/// Global halt flag read on every signal.
pub struct KillSwitch {
    store: Arc<dyn HaltStore>,
    policy: HaltPolicy,
}

impl KillSwitch {
    /// Fail-closed kill switch over the given store.
    pub fn new(store: Arc<dyn HaltStore>) -> Self {
        Self {
            store,
            policy: HaltPolicy::FailClosed,
        }
    }

    pub fn with_policy(store: Arc<dyn HaltStore>, policy: HaltPolicy) -> Self {
        Self { store, policy }
    }

    /// Whether trading is halted.
    ///
    /// A store failure resolves per [`HaltPolicy`]; under the default
    /// fail-closed policy an unreachable store reads as *halted*.
    pub async fn is_active(&self) -> bool {
        match self.store.get(KEY_ACTIVE).await {
            Ok(state) => state.as_deref() == Some("1"),
            Err(e) => {
                error!(error = %e, "kill-switch store unreachable");
                matches!(self.policy, HaltPolicy::FailClosed)
            }
        }
    }

    /// Halt all trading, recording the reason and activation timestamp.
    pub async fn activate(&self, reason: &str) -> Result<(), StoreError> {
        warn!(reason, "kill switch activated - trading halted");
        self.store.set(KEY_ACTIVE, "1").await?;
        self.store.set(KEY_REASON, reason).await?;
        self.store.set(KEY_ACTIVATED_AT, &now_rfc3339()).await?;
        Ok(())
    }

    /// Resume trading, recording the reason and deactivation timestamp.
    pub async fn deactivate(&self, reason: &str) -> Result<(), StoreError> {
        warn!(reason, "kill switch deactivated - trading resumed");
        self.store.set(KEY_ACTIVE, "0").await?;
        self.store.set(KEY_DEACTIVATED_AT, &now_rfc3339()).await?;
        self.store.set(KEY_DEACTIVATION_REASON, reason).await?;
        Ok(())
    }

    /// Full state snapshot for the admin surface.
    ///
    /// On store failure the snapshot reflects the halt policy and carries the
    /// store error as the reason.
    pub async fn status(&self) -> KillSwitchState {
        let active = self.is_active().await;
        match self.read_metadata().await {
            Ok((reason, activated_at, deactivated_at, deactivation_reason)) => KillSwitchState {
                active,
                reason,
                activated_at,
                deactivated_at,
                deactivation_reason,
            },
            Err(e) => KillSwitchState {
                active,
                reason: Some(format!("kill-switch store unavailable: {e}")),
                activated_at: None,
                deactivated_at: None,
                deactivation_reason: None,
            },
        }
    }

    async fn read_metadata(
        &self,
    ) -> Result<(Option<String>, Option<String>, Option<String>, Option<String>), StoreError> {
        Ok((
            self.store.get(KEY_REASON).await?,
            self.store.get(KEY_ACTIVATED_AT).await?,
            self.store.get(KEY_DEACTIVATED_AT).await?,
            self.store.get(KEY_DEACTIVATION_REASON).await?,
        ))
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Store that fails every operation, for outage-path tests.
    struct DownStore;

    #[async_trait]
    impl HaltStore for DownStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn inactive_by_default() {
        let ks = KillSwitch::new(Arc::new(MemoryHaltStore::new()));
        assert!(!ks.is_active().await);
    }

    #[tokio::test]
    async fn activate_then_deactivate_round_trip() {
        let ks = KillSwitch::new(Arc::new(MemoryHaltStore::new()));

        ks.activate("drill").await.unwrap();
        assert!(ks.is_active().await);
        let st = ks.status().await;
        assert!(st.active);
        assert_eq!(st.reason.as_deref(), Some("drill"));
        assert!(st.activated_at.is_some());

        ks.deactivate("drill complete").await.unwrap();
        assert!(!ks.is_active().await);
        let st = ks.status().await;
        assert!(!st.active);
        assert_eq!(st.deactivation_reason.as_deref(), Some("drill complete"));
        assert!(st.deactivated_at.is_some());
    }

    #[tokio::test]
    async fn store_outage_fails_closed_by_default() {
        let ks = KillSwitch::new(Arc::new(DownStore));
        assert!(ks.is_active().await, "unreachable store must read as halted");
        let st = ks.status().await;
        assert!(st.active);
        assert!(st.reason.unwrap().contains("store unavailable"));
    }

    #[tokio::test]
    async fn fail_open_policy_reads_outage_as_not_halted() {
        let ks = KillSwitch::with_policy(Arc::new(DownStore), HaltPolicy::FailOpen);
        assert!(!ks.is_active().await);
    }

    #[tokio::test]
    async fn reactivation_overwrites_reason() {
        let ks = KillSwitch::new(Arc::new(MemoryHaltStore::new()));
        ks.activate("first").await.unwrap();
        ks.activate("second").await.unwrap();
        assert_eq!(ks.status().await.reason.as_deref(), Some("second"));
    }
}
