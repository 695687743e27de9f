//! HTTP gateway for the trade engine.
//!
//! `routes::build_router` returns the bare router so scenario tests can
//! drive it in-process; `main.rs` attaches middleware and serves it.

pub mod api_types;
pub mod routes;
pub mod state;
