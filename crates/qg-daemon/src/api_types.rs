//! Request/response bodies specific to the HTTP surface.
//!
//! The signal response itself is the shared [`qg_schemas::SignalResponse`];
//! only admin and health shapes live here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// Body for kill-switch activate/deactivate; the reason is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HaltActionRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HaltActionResponse {
    pub status: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
