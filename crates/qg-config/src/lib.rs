//! Risk-limit and gateway configuration.
//!
//! Limits are loaded once at process start and shared read-only afterwards.
//! Layered YAML files are deep-merged in order (later files override earlier
//! ones), canonicalized to stable JSON, and hashed so a run can be tied to
//! the exact limit set it enforced.

use std::fs;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// RiskLimits
// ---------------------------------------------------------------------------

/// Centralized risk limit bundle consumed by every pre-trade check.
///
/// Read-only after load; safe to clone and share freely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Max position size per symbol, USD.
    pub max_position_size_usd: f64,
    /// Max total portfolio exposure, USD.
    pub max_total_exposure_usd: f64,
    /// Max share of portfolio value in a single asset (fraction, not bps).
    pub max_single_asset_exposure_pct: f64,

    /// Max daily loss, USD.
    pub max_daily_loss_usd: f64,
    /// Max daily loss as a fraction of portfolio value.
    pub max_daily_loss_pct: f64,

    /// Max single order notional, USD.
    pub max_order_notional_usd: f64,
    /// Min order notional, USD (anti-spam).
    pub min_order_notional_usd: f64,

    pub max_orders_per_strategy_per_minute: u32,
    pub max_orders_per_strategy_per_hour: u32,

    /// Max tolerated slippage a signal may request, basis points.
    pub max_slippage_bps: u32,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size_usd: 1_000_000.0,
            max_total_exposure_usd: 10_000_000.0,
            max_single_asset_exposure_pct: 0.20,
            max_daily_loss_usd: 100_000.0,
            max_daily_loss_pct: 0.05,
            max_order_notional_usd: 500_000.0,
            min_order_notional_usd: 1_000.0,
            max_orders_per_strategy_per_minute: 10,
            max_orders_per_strategy_per_hour: 100,
            max_slippage_bps: 50,
        }
    }
}

/// Limits plus the canonical form and hash they were loaded from.
#[derive(Clone, Debug)]
pub struct LoadedLimits {
    pub limits: RiskLimits,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Load + merge YAML limit files in order, canonicalize, hash, deserialize.
///
/// Missing keys fall back to [`RiskLimits::default`]; unknown keys are
/// ignored so limit files can carry operator annotations.
pub fn load_layered_limits(paths: &[&str]) -> Result<LoadedLimits> {
    let mut merged = Value::Object(Default::default());

    for p in paths {
        let s = fs::read_to_string(p).with_context(|| format!("read limits file: {p}"))?;
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {p}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    let limits: RiskLimits =
        serde_json::from_value(merged).context("limits do not match the RiskLimits shape")?;

    Ok(LoadedLimits {
        limits,
        canonical_json: canonical,
        config_hash: hash,
    })
}

/// Deep-merge: objects merge recursively; arrays replaced; scalars overwritten.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

/// Canonicalize JSON by sorting all object keys recursively and emitting
/// compact JSON.
fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).unwrap_or_default()
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

// ---------------------------------------------------------------------------
// Gateway runtime configuration
// ---------------------------------------------------------------------------

/// Process-level settings resolved from the environment at daemon start.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// HTTP bind address. `QG_GATEWAY_ADDR` wins over `PORT`; default
    /// `127.0.0.1:8080`.
    pub bind_addr: SocketAddr,
    /// Base URL of the external portfolio service; `None` runs against the
    /// in-memory portfolio (dry-run / tests).
    pub portfolio_service_url: Option<String>,
    /// Directory receiving the decision and trade JSONL logs.
    pub audit_dir: String,
    /// Simulated slippage applied by the paper broker, basis points.
    pub paper_slippage_bps: u32,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("QG_GATEWAY_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .or_else(|| {
                std::env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse::<u16>().ok())
                    .map(|p| SocketAddr::from(([127, 0, 0, 1], p)))
            })
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        Self {
            bind_addr,
            portfolio_service_url: std::env::var("PORTFOLIO_SERVICE_URL").ok(),
            audit_dir: std::env::var("QG_AUDIT_DIR").unwrap_or_else(|_| "audit".to_string()),
            paper_slippage_bps: std::env::var("QG_PAPER_SLIPPAGE_BPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
