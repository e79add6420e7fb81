//! Report records handed to the transport.
//!
//! These types are serializable so environments can put them on the wire
//! as JSON without a separate wire model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::breadcrumb::Breadcrumb;

/// Identifier shared by a report and the breadcrumb recorded for it.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Create a new random event id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Top-level report category.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Error,
    Dom,
    Api,
    Route,
    Performance,
    Custom,
}

/// Type-specific report payload, tagged by `sub_type`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sub_type", rename_all = "lowercase")]
pub enum ReportData {
    /// A promise was rejected without a handler.
    UnhandledRejection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// A click on a DOM element.
    Click {
        ele: String,
    },

    /// Payload produced by a third-party plugin.
    Custom {
        name: String,
        #[serde(default)]
        payload: Value,
    },
}

/// A normalized, transport-ready record of one monitored occurrence.
///
/// The breadcrumb field is an owned snapshot taken when the report was built;
/// later insertions into the shared stack never show up here.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: EventId,
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<Vec<Breadcrumb>>,
    pub data: ReportData,
}

impl Report {
    /// Creates a report stamped with the current time.
    #[must_use]
    pub fn new(id: EventId, event_type: EventType, data: ReportData) -> Self {
        Self {
            id,
            time: Utc::now(),
            event_type,
            breadcrumb: None,
            data,
        }
    }

    /// Attaches a breadcrumb snapshot.
    #[must_use]
    pub fn with_breadcrumb(mut self, breadcrumb: Vec<Breadcrumb>) -> Self {
        self.breadcrumb = Some(breadcrumb);
        self
    }

    /// Serializes the report to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if a custom payload cannot be encoded.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
