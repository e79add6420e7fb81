//! DOM click capture.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::breadcrumb::{Breadcrumb, BreadcrumbType};
use crate::event_source::{EventHub, ListenerId};
use crate::plugin::{CollectedEvent, Notifier, Plugin, PluginContext};
use crate::report::{EventId, EventType, Report, ReportData};
use crate::throttle::throttle;

/// Channel name of the DOM plugin.
pub const NAME: &str = "domPlugin";

/// Kind of DOM interaction.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomEventType {
    Click,
}

/// Serializable view of a DOM element.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementSnapshot {
    pub tag_name: String,
    pub id: String,
    pub class_names: Vec<String>,
    pub inner_text: String,
}

impl ElementSnapshot {
    /// Snapshot of a bare element with the given tag.
    #[must_use]
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    /// Sets the element id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Appends a class name.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class_names.push(class.into());
        self
    }

    /// Sets the inner text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.inner_text = text.into();
        self
    }
}

/// Document state at the moment of an interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentSnapshot {
    /// The focused element, if any.
    pub active_element: Option<ElementSnapshot>,
}

/// Host click event, dispatched on the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickEvent {
    /// Document state when the click happened.
    pub document: DocumentSnapshot,
}

impl ClickEvent {
    /// A click while `element` has focus.
    #[must_use]
    pub fn on(element: ElementSnapshot) -> Self {
        Self {
            document: DocumentSnapshot {
                active_element: Some(element),
            },
        }
    }
}

/// Renders an element as `<tag id="..." class="...">text</tag>`.
///
/// Returns `None` for `<body>`, which carries no useful signal about what
/// was clicked.
#[must_use]
pub fn html_element_as_string(element: &ElementSnapshot) -> Option<String> {
    let tag = element.tag_name.trim().to_ascii_lowercase();
    if tag.is_empty() || tag == "body" {
        return None;
    }

    let id = if element.id.is_empty() {
        String::new()
    } else {
        format!(" id=\"{}\"", element.id)
    };
    let classes = element.class_names.join(" ");
    let classes = if classes.is_empty() {
        String::new()
    } else {
        format!(" class=\"{classes}\"")
    };

    Some(format!("<{tag}{id}{classes}>{}</{tag}>", element.inner_text))
}

/// Reports clicks on the focused element, throttled by `throttle_delay_time`.
#[derive(Debug)]
pub struct DomPlugin {
    source: Arc<EventHub<ClickEvent>>,
    listener: Mutex<Option<ListenerId>>,
}

impl DomPlugin {
    /// Creates a plugin that listens on `source` once registered.
    #[must_use]
    pub fn new(source: Arc<EventHub<ClickEvent>>) -> Self {
        Self {
            source,
            listener: Mutex::new(None),
        }
    }
}

impl Plugin for DomPlugin {
    type Collected = CollectedEvent<DomEventType, DocumentSnapshot>;

    fn name(&self) -> &str {
        NAME
    }

    fn monitor(&self, ctx: &PluginContext, notify: Notifier<Self::Collected>) {
        let delay = Duration::from_millis(ctx.get_options().throttle_delay_time);
        let on_click = throttle(
            move |document: DocumentSnapshot| {
                notify.notify(CollectedEvent {
                    category: DomEventType::Click,
                    data: document,
                });
            },
            delay,
        );
        let id = self
            .source
            .add_listener(move |event: &mut ClickEvent| on_click(event.document.clone()));
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
        let ele = data.active_element.as_ref().and_then(html_element_as_string)?;

        let id = EventId::new();
        ctx.breadcrumb().unshift(Breadcrumb::new(
            id,
            BreadcrumbType::Click,
            json!({ "ele": ele }),
        ));

        let data = match category {
            DomEventType::Click => ReportData::Click { ele },
        };
        Some(Report::new(id, EventType::Dom, data).with_breadcrumb(ctx.breadcrumb().get_stack()))
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
