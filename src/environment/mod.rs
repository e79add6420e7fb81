//! Environment bindings.
//!
//! A client is written against the `Environment` trait and never against a
//! concrete host. A binding decides whether it can run at all, how deferred
//! work is scheduled, what happens at app start, how reports are enriched or
//! suppressed, and how they are finally transmitted.

/// Thread-backed binding with a pluggable transport.
pub mod native;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Context;
use crate::log::{Console, TracingConsole};
use crate::report::Report;

pub use native::{NativeConfig, NativeEnvironment, Transport};

/// Deferred unit of work handed to `Environment::next_tick`.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// How a report should be put on the wire.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportHint {
    Beacon,
    Post,
    Image,
}

impl Default for TransportHint {
    fn default() -> Self {
        Self::Post
    }
}

/// Extension points a host binding must supply.
pub trait Environment: Send + Sync + 'static {
    /// Returns false if the client cannot run in this host.
    fn is_right_env(&self) -> bool;

    /// Schedules `task` for deferred execution.
    ///
    /// Ordering relative to other deferred work is up to the binding; running
    /// the task immediately is a valid choice.
    fn next_tick(&self, task: Task);

    /// Host-specific setup, run once after the context is bound.
    fn init_app(&self, context: &Context);

    /// Final enrichment of a plugin result.
    ///
    /// Called for every occurrence, including ones the plugin dropped
    /// (`report` is `None`). Returning `None` suppresses delivery.
    fn transform(&self, report: Option<Report>) -> Option<Report>;

    /// Transmits a report. Failures are the binding's concern.
    fn report(&self, url: &str, report: &Report, hint: Option<TransportHint>);

    /// Console sink for debug output. `None` disables client logging.
    fn console(&self) -> Option<Arc<dyn Console>> {
        Some(Arc::new(TracingConsole))
    }
}
