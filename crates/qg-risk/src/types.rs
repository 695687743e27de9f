use serde::Serialize;
use serde_json::{json, Value};

/// Result of a single risk check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub valid: bool,
    pub error: Option<String>,
}

impl CheckOutcome {
    pub fn pass() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// A check outcome tagged with its stable audit name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NamedCheck {
    pub name: &'static str,
    pub outcome: CheckOutcome,
}

/// Outcome of the full pre-trade battery.
///
/// `checks` preserves execution order; the serialized form is keyed by check
/// name so audit entries can be diffed across versions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RiskReport {
    pub approved: bool,
    pub errors: Vec<String>,
    pub checks: Vec<NamedCheck>,
}

impl RiskReport {
    pub fn from_checks(checks: Vec<NamedCheck>) -> Self {
        let errors: Vec<String> = checks
            .iter()
            .filter_map(|c| c.outcome.error.clone())
            .collect();
        Self {
            approved: errors.is_empty(),
            errors,
            checks,
        }
    }

    /// Per-check results as a JSON object `{name: {valid, error}}` — the
    /// shape embedded in decision audit entries.
    pub fn check_results(&self) -> Value {
        let mut map = serde_json::Map::new();
        for c in &self.checks {
            map.insert(
                c.name.to_string(),
                json!({ "valid": c.outcome.valid, "error": c.outcome.error }),
            );
        }
        Value::Object(map)
    }

    /// Lookup a single check outcome by name.
    pub fn outcome(&self, name: &str) -> Option<&CheckOutcome> {
        self.checks.iter().find(|c| c.name == name).map(|c| &c.outcome)
    }
}
