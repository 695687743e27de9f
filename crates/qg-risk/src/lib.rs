//! Pre-trade risk engine.
//!
//! Stateless per-axis checkers (exposure, loss, throttle) orchestrated by
//! [`PreTradeRiskChecker::run_all_checks`], which executes every check in a
//! fixed order and never short-circuits: the audit entry for a decision must
//! record the outcome of every check, pass or fail.

mod exposure;
mod loss;
mod pre_trade;
mod throttle;
mod types;

pub use exposure::ExposureChecker;
pub use loss::LossLimitChecker;
pub use pre_trade::PreTradeRiskChecker;
pub use throttle::{MemoryThrottleStore, ThrottleChecker, ThrottleStore, ThrottleStoreError};
pub use types::{CheckOutcome, NamedCheck, RiskReport};
