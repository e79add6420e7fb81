//! The client core.
//!
//! A `Client` owns the options, the derived context, the shared breadcrumb
//! stack and the environment binding. It registers plugin batches and runs
//! every plugin result, report or drop, through the environment's transform
//! before scheduling delivery on the environment's next tick.
//!
//! Construction is the only fallible step. A client that failed to bind its
//! options is never handed out, so every `Client` value is live. After
//! construction nothing is raised to the caller: dropped occurrences,
//! suppressed reports and transport failures are all silent or logged.
//!
//! The client owns the per-batch routers. Plugins only hold weak notifiers,
//! so dropping the client detaches every plugin and releases the environment.

use std::sync::{Arc, Mutex, PoisonError};

use crate::breadcrumb::BreadcrumbStack;
use crate::config::{Context, Options};
use crate::environment::Environment;
use crate::error::{ClientError, HeimdallrResult};
use crate::log::{ConsoleLevel, Logger};
use crate::plugin::{Erased, ErasedPlugin, PluginContext, PluginSet, Router};
use crate::report::Report;

/// A live telemetry client bound to an environment.
pub struct Client<E: Environment> {
    env: Arc<E>,
    options: Arc<Options>,
    context: Arc<Context>,
    breadcrumb: Arc<BreadcrumbStack>,
    logger: Logger,
    registered: Mutex<Vec<Arc<dyn ErasedPlugin>>>,
    routers: Mutex<Vec<Arc<Router>>>,
}

impl<E: Environment> Client<E> {
    /// Builds a client, taking ownership of the environment.
    ///
    /// # Errors
    ///
    /// - `ClientError::EnvironmentMismatch` if `env.is_right_env()` is false
    /// - `ClientError::InvalidOptions` if the app or DSN host is missing
    ///
    /// Both are also logged; `init_app` is not called in either case.
    pub fn new(env: E, options: Options) -> Result<Self, ClientError> {
        Self::with_shared_env(Arc::new(env), options)
    }

    /// Builds a client around an environment the caller keeps a handle to.
    ///
    /// # Errors
    ///
    /// Same as [`Client::new`].
    pub fn with_shared_env(env: Arc<E>, options: Options) -> Result<Self, ClientError> {
        if !env.is_right_env() {
            tracing::warn!(target: "heimdallr", "Client does not match the environment");
            return Err(ClientError::EnvironmentMismatch);
        }

        let context = Context::bind(&options).map_err(|err| {
            tracing::warn!(target: "heimdallr", error = %err, "Missing app or dsn in options");
            ClientError::InvalidOptions(err)
        })?;

        let logger = Logger::new(env.console(), context.debug);
        let breadcrumb = Arc::new(BreadcrumbStack::with_capacity(options.max_breadcrumbs));

        env.init_app(&context);

        Ok(Self {
            env,
            options: Arc::new(options),
            context: Arc::new(context),
            breadcrumb,
            logger,
            registered: Mutex::new(Vec::new()),
            routers: Mutex::new(Vec::new()),
        })
    }

    /// Builds a client from options given as a JSON document.
    ///
    /// # Errors
    ///
    /// - `HeimdallrError::Config` if `json` is not valid options JSON
    /// - `HeimdallrError::Client` for the failures of [`Client::new`]
    pub fn from_json(env: E, json: &str) -> HeimdallrResult<Self> {
        let options = Options::from_json_str(json).inspect_err(|err| {
            tracing::warn!(target: "heimdallr", error = %err, "Unreadable options");
        })?;
        Ok(Self::new(env, options)?)
    }

    /// Registers a batch of plugins.
    ///
    /// The batch gets its own router, so channel names only need to be unique
    /// within one call. Each plugin's `monitor` runs before its channel is
    /// watched: anything it notifies synchronously during `monitor` is lost.
    pub fn use_plugins(&self, plugins: PluginSet) {
        let router = Arc::new(Router::new());
        let ctx = self.plugin_context();

        for plugin in plugins.into_inner() {
            plugin.monitor(&ctx, &router);
            router.watch(plugin.name(), self.pipeline(Arc::clone(&plugin), ctx.clone()));
            tracing::debug!(target: "heimdallr", plugin = plugin.name(), "plugin registered");

            self.registered
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(plugin);
        }

        self.routers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(router);
    }

    // plugin transform -> environment transform -> deferred report
    fn pipeline(
        &self,
        plugin: Arc<dyn ErasedPlugin>,
        ctx: PluginContext,
    ) -> impl Fn(Erased) + Send + Sync + 'static {
        let env = Arc::clone(&self.env);
        let context = Arc::clone(&self.context);

        move |collected: Erased| {
            let Some(report) = env.transform(plugin.transform(&ctx, collected)) else {
                return;
            };
            if context.enabled {
                schedule_report(&env, context.upload_url.clone(), report);
            }
        }
    }

    /// Detaches every registered plugin from its event source and releases
    /// the routers, so notifiers kept by plugins reach nothing afterwards.
    pub fn teardown(&self) {
        self.routers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let plugins: Vec<_> = self
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        let ctx = self.plugin_context();
        for plugin in plugins {
            plugin.teardown(&ctx);
        }
    }

    /// Independent copy of the options the client was built with.
    #[must_use]
    pub fn get_options(&self) -> Options {
        Options::clone(&self.options)
    }

    /// Context bound at construction.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The breadcrumb stack shared by every plugin.
    #[must_use]
    pub fn breadcrumb(&self) -> &BreadcrumbStack {
        &self.breadcrumb
    }

    /// The environment binding.
    #[must_use]
    pub fn environment(&self) -> &Arc<E> {
        &self.env
    }

    /// Number of plugins registered and not yet torn down.
    #[must_use]
    pub fn plugin_count(&self) -> usize {
        self.registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The handle plugin callbacks receive.
    #[must_use]
    pub fn plugin_context(&self) -> PluginContext {
        PluginContext::new(
            Arc::clone(&self.options),
            Arc::clone(&self.context),
            Arc::clone(&self.breadcrumb),
            self.logger.clone(),
        )
    }

    /// Writes a debug message through the environment's console.
    pub fn log(&self, message: impl std::fmt::Display, level: ConsoleLevel) {
        self.logger.log(message, level);
    }
}

fn schedule_report<E: Environment>(env: &Arc<E>, url: String, report: Report) {
    let task_env = Arc::clone(env);
    env.next_tick(Box::new(move || task_env.report(&url, &report, None)));
}

impl<E: Environment> Drop for Client<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<E: Environment> std::fmt::Debug for Client<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("context", &self.context)
            .field("breadcrumbs", &self.breadcrumb.len())
            .field("plugins", &self.plugin_count())
            .finish_non_exhaustive()
    }
}
