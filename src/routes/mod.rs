//! HTTP route handlers.
//!
//! One submodule per surface: `search` ranks threads against a query,
//! `admin` drops and rebuilds the cached index, and `health` answers
//! readiness probes. Every handler carries an `#[openapi]` annotation so the
//! generated OpenAPI document tracks whatever is mounted.

pub mod admin;
pub mod health;
pub mod search;
