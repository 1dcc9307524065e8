//! # apitest-core
//!
//! Building blocks for API test suites that drive a live HTTP service:
//!
//! - Runtime configuration, loaded once at suite startup and readable
//!   everywhere ([`config`])
//! - A two-level report tree (parent node per suite, child node per test
//!   method) with per-execution-flow current-node bindings ([`report`])
//! - A shared registry of side effects awaiting compensating teardown
//!   actions ([`cleanup`])
//! - Typed verification of captured HTTP responses: status codes,
//!   JSON-schema shape and error-envelope messages ([`verify`])
//! - A thin HTTP client wrapper producing fully captured responses
//!   ([`http`])
//!
//! ## Execution model
//!
//! Suites run concurrently, one logical execution flow each; test methods
//! within a suite run sequentially on that flow. Report bindings are scoped
//! per flow, so concurrent suites never observe each other's current
//! parent/child nodes. Configuration and the cleanup registry are the only
//! cross-flow mutable state and both use atomic replace/append disciplines.

pub mod cleanup;
pub mod config;
pub mod error;
pub mod http;
pub mod report;
pub mod verify;

// Re-export error handling for consumers
pub use anyhow;
pub use eyre;

pub use cleanup::{CleanupEntry, ResourceKind};
pub use config::Config;
pub use error::{Error, Result};
pub use report::{Level, Outcome, Status};
pub use verify::Verify;
