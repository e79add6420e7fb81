//! Reference plugins.
//!
//! Each one attaches to an in-process `EventHub` standing in for a host event
//! source and detaches again in `teardown`.

pub mod dom;
pub mod promise_error;

pub use dom::{
    html_element_as_string, ClickEvent, DocumentSnapshot, DomEventType, DomPlugin, ElementSnapshot,
};
pub use promise_error::{RejectionEvent, RejectionReason, UnhandledRejectionPlugin};
