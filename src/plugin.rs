//! The plugin contract.
//!
//! A plugin observes one kind of host event (`monitor`) and turns each
//! occurrence into a report (`transform`). Both phases receive an explicit
//! `PluginContext` carrying the client's options, context, breadcrumb stack
//! and logger.
//!
//! Each plugin picks its own collected-event type. Batches of plugins with
//! different types travel through one router as type-erased payloads; the
//! erasure is internal to this module.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use crate::breadcrumb::BreadcrumbStack;
use crate::config::{Context, Options};
use crate::log::{ConsoleLevel, Logger};
use crate::report::Report;
use crate::subscribe::Subscribe;

pub(crate) type Erased = Box<dyn Any + Send>;
pub(crate) type Router = Subscribe<Erased>;

/// Raw occurrence captured by `monitor`: a category tag plus the host payload.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedEvent<C, T> {
    pub category: C,
    pub data: T,
}

/// Explicit client state handed to plugin callbacks.
#[derive(Debug, Clone)]
pub struct PluginContext {
    options: Arc<Options>,
    context: Arc<Context>,
    breadcrumb: Arc<BreadcrumbStack>,
    logger: Logger,
}

impl PluginContext {
    pub(crate) fn new(
        options: Arc<Options>,
        context: Arc<Context>,
        breadcrumb: Arc<BreadcrumbStack>,
        logger: Logger,
    ) -> Self {
        Self {
            options,
            context,
            breadcrumb,
            logger,
        }
    }

    /// Independent copy of the client options.
    #[must_use]
    pub fn get_options(&self) -> Options {
        Options::clone(&self.options)
    }

    /// Context bound from the client options.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The breadcrumb stack shared by every plugin on the client.
    #[must_use]
    pub fn breadcrumb(&self) -> &BreadcrumbStack {
        &self.breadcrumb
    }

    /// Debug-gated logger of the client.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Shorthand for `logger().log(message, level)`.
    pub fn log(&self, message: impl std::fmt::Display, level: ConsoleLevel) {
        self.logger.log(message, level);
    }
}

/// Channel-bound notify function handed to `Plugin::monitor`.
///
/// Cheap to clone and safe to move into host listeners on any thread. The
/// router is owned by the client; once the client is torn down or dropped,
/// `notify` reaches nothing.
pub struct Notifier<T> {
    channel: Arc<str>,
    router: Weak<Router>,
    _payload: PhantomData<fn(T)>,
}

impl<T: Send + 'static> Notifier<T> {
    pub(crate) fn new(channel: &str, router: &Arc<Router>) -> Self {
        Self {
            channel: Arc::from(channel),
            router: Arc::downgrade(router),
            _payload: PhantomData,
        }
    }

    /// Pushes an occurrence to the client. Returns false if nothing was
    /// watching the channel, in which case the occurrence is lost.
    pub fn notify(&self, collected: T) -> bool {
        self.router
            .upgrade()
            .is_some_and(|router| router.notify(&self.channel, Box::new(collected)))
    }

    /// Channel this notifier is bound to.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            channel: Arc::clone(&self.channel),
            router: Weak::clone(&self.router),
            _payload: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

/// A capture-and-transform unit registered on a client.
pub trait Plugin: Send + Sync + 'static {
    /// Payload produced by `monitor` and consumed by `transform`.
    type Collected: Send + 'static;

    /// Channel name. Must be unique within one `use_plugins` batch.
    fn name(&self) -> &str;

    /// Attaches to a host event source and calls `notify` per occurrence.
    ///
    /// Runs once at registration. Any rate limiting happens here, before
    /// `notify`.
    fn monitor(&self, ctx: &PluginContext, notify: Notifier<Self::Collected>);

    /// Converts one occurrence into a report, or `None` to drop it.
    ///
    /// An accepted occurrence must unshift exactly one breadcrumb before the
    /// report's breadcrumb snapshot is taken. A dropped one must not touch
    /// the stack.
    fn transform(&self, ctx: &PluginContext, collected: Self::Collected) -> Option<Report>;

    /// Detaches from host event sources. Default does nothing.
    fn teardown(&self, _ctx: &PluginContext) {}
}

pub(crate) trait ErasedPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn monitor(&self, ctx: &PluginContext, router: &Arc<Router>);
    fn transform(&self, ctx: &PluginContext, collected: Erased) -> Option<Report>;
    fn teardown(&self, ctx: &PluginContext);
}

impl<P: Plugin> ErasedPlugin for P {
    fn name(&self) -> &str {
        Plugin::name(self)
    }

    fn monitor(&self, ctx: &PluginContext, router: &Arc<Router>) {
        let notify = Notifier::new(Plugin::name(self), router);
        Plugin::monitor(self, ctx, notify);
    }

    fn transform(&self, ctx: &PluginContext, collected: Erased) -> Option<Report> {
        // A mismatch means two plugins in one batch share a channel name.
        match collected.downcast::<P::Collected>() {
            Ok(collected) => Plugin::transform(self, ctx, *collected),
            Err(_) => {
                ctx.log(
                    format!("{}: unexpected payload on channel", Plugin::name(self)),
                    ConsoleLevel::Warn,
                );
                None
            }
        }
    }

    fn teardown(&self, ctx: &PluginContext) {
        Plugin::teardown(self, ctx);
    }
}

/// A batch of plugins registered together by `Client::use_plugins`.
#[derive(Default)]
pub struct PluginSet {
    plugins: Vec<Arc<dyn ErasedPlugin>>,
}

impl PluginSet {
    /// An empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin to the batch.
    #[must_use]
    pub fn with<P: Plugin>(mut self, plugin: P) -> Self {
        self.push(plugin);
        self
    }

    /// Adds a plugin to the batch in place.
    pub fn push<P: Plugin>(&mut self, plugin: P) {
        self.plugins.push(Arc::new(plugin));
    }

    /// Number of plugins in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if the batch holds no plugins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Channel names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub(crate) fn into_inner(self) -> Vec<Arc<dyn ErasedPlugin>> {
        self.plugins
    }
}

impl std::fmt::Debug for PluginSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSet")
            .field("plugins", &self.names())
            .finish()
    }
}
