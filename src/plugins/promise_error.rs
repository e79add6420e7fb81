//! Unhandled promise rejection capture.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::breadcrumb::{Breadcrumb, BreadcrumbType};
use crate::event_source::{EventHub, ListenerId};
use crate::log::ConsoleLevel;
use crate::plugin::{CollectedEvent, Notifier, Plugin, PluginContext};
use crate::report::{EventId, EventType, Report, ReportData};

/// Channel name of the rejection plugin.
pub const NAME: &str = "unhandledrejection";

/// Why a promise was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Rejected with a plain string.
    #[allow(missing_docs)]
    Text { message: String },
    /// Rejected with an error-like object.
    Object {
        /// Stack trace of the error, if it had one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
    /// Rejected with anything else (number, undefined, ...).
    Other,
}

impl RejectionReason {
    /// Convenience constructor for a string reason.
    #[must_use]
    pub fn text(message: impl Into<String>) -> Self {
        Self::Text {
            message: message.into(),
        }
    }

    /// Extracts the report message: the string itself or a non-empty stack.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Text { message } => Some(message.clone()),
            Self::Object { stack } => stack.clone().filter(|s| !s.is_empty()),
            Self::Other => None,
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message() {
            Some(message) => write!(f, "unhandled rejection: {message}"),
            None => f.write_str("unhandled rejection"),
        }
    }
}

/// Host event for an unhandled rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionEvent {
    /// Value the promise was rejected with.
    pub reason: RejectionReason,
    default_prevented: bool,
}

impl RejectionEvent {
    /// A rejection whose default handling has not been prevented.
    #[must_use]
    pub const fn new(reason: RejectionReason) -> Self {
        Self {
            reason,
            default_prevented: false,
        }
    }

    /// Suppresses the host's default handling of this rejection.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Returns true once a listener called `prevent_default`.
    #[must_use]
    pub const fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Reports every unhandled rejection as an error.
#[derive(Debug)]
pub struct UnhandledRejectionPlugin {
    source: Arc<EventHub<RejectionEvent>>,
    listener: Mutex<Option<ListenerId>>,
}

impl UnhandledRejectionPlugin {
    /// Creates a plugin that listens on `source` once registered.
    #[must_use]
    pub fn new(source: Arc<EventHub<RejectionEvent>>) -> Self {
        Self {
            source,
            listener: Mutex::new(None),
        }
    }
}

impl Plugin for UnhandledRejectionPlugin {
    type Collected = CollectedEvent<EventType, RejectionReason>;

    fn name(&self) -> &str {
        NAME
    }

    fn monitor(&self, ctx: &PluginContext, notify: Notifier<Self::Collected>) {
        let logger = ctx.logger().clone();
        let id = self.source.add_listener(move |event: &mut RejectionEvent| {
            event.prevent_default();
            logger.log(&event.reason, ConsoleLevel::Error);
            notify.notify(CollectedEvent {
                category: EventType::Error,
                data: event.reason.clone(),
            });
        });
        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(id);
        if let Some(previous) = previous {
            self.source.remove_listener(previous);
        }
    }

    fn transform(&self, ctx: &PluginContext, collected: Self::Collected) -> Option<Report> {
        let CollectedEvent { category, data } = collected;
        let message = data.message();
        let id = EventId::new();

        ctx.breadcrumb().unshift(Breadcrumb::new(
            id,
            BreadcrumbType::UnhandledRejection,
            json!({ "message": message }),
        ));

        Some(
            Report::new(id, category, ReportData::UnhandledRejection { message })
                .with_breadcrumb(ctx.breadcrumb().get_stack()),
        )
    }

    fn teardown(&self, _ctx: &PluginContext) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = listener {
            self.source.remove_listener(id);
        }
    }
}
