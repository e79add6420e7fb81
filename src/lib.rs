//! # Heimdallr - plugin-based client telemetry
//!
//! Heimdallr observes runtime events in a host (unhandled rejections, clicks,
//! and whatever else a plugin listens to), turns each one into a normalized
//! report enriched with recent user actions, and hands the report to the host
//! binding for delivery.
//!
//! ## Core Concepts
//!
//! - **Client**: owns options, context and the breadcrumb stack; registers plugins
//! - **Environment**: the host binding (env check, scheduling, init, transform, transport)
//! - **Plugin**: `monitor` a host event source, `transform` occurrences into reports
//! - **Breadcrumb**: a bounded, newest-first history shared by every plugin
//! - **Subscribe**: the per-batch channel router between plugins and the client
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use heimdallr::{AppInfo, Client, Dsn, NativeConfig, NativeEnvironment, Options, PluginSet};
//! use heimdallr::event_source::EventHub;
//! use heimdallr::plugins::{DomPlugin, UnhandledRejectionPlugin};
//!
//! let rejections = Arc::new(EventHub::new());
//! let clicks = Arc::new(EventHub::new());
//!
//! let options = Options::new(Dsn::new("collector.example.com", "/init").with_upload("/upload"), AppInfo::new("shop"));
//! let client = Client::new(NativeEnvironment::new(my_transport, NativeConfig::default()), options)?;
//! client.use_plugins(
//!     PluginSet::new()
//!         .with(UnhandledRejectionPlugin::new(Arc::clone(&rejections)))
//!         .with(DomPlugin::new(Arc::clone(&clicks))),
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod breadcrumb;
pub mod client;
pub mod config;
pub mod environment;
pub mod error;
pub mod event_source;
pub mod log;
pub mod plugin;
pub mod plugins;
pub mod report;
pub mod subscribe;
pub mod throttle;
pub mod url;

// Re-export primary types at crate root for convenience
pub use breadcrumb::{Breadcrumb, BreadcrumbStack, BreadcrumbType};
pub use client::Client;
pub use config::{AppInfo, Context, Dsn, Options};
pub use environment::{Environment, NativeConfig, NativeEnvironment, Task, Transport, TransportHint};
pub use error::{ClientError, ConfigError, HeimdallrError, HeimdallrResult, TransportError};
pub use log::{Console, ConsoleLevel, Logger, TracingConsole};
pub use plugin::{CollectedEvent, Notifier, Plugin, PluginContext, PluginSet};
pub use report::{EventId, EventType, Report, ReportData};
pub use subscribe::Subscribe;
pub use throttle::{throttle, Throttle};
pub use url::format_url_path;
