//! Thread-backed environment binding.
//!
//! Deferred work runs on a single worker thread fed by a bounded channel, so
//! reports are sent off the caller's stack in the order they were scheduled.
//! Scheduling never blocks: when the queue is full the task is dropped and
//! counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::config::Context;
use crate::error::TransportError;
use crate::report::Report;

use super::{Environment, Task, TransportHint};

/// Physical delivery of serialized payloads.
pub trait Transport: Send + Sync + 'static {
    /// Sends `body` to `url`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the payload could not be delivered.
    fn send(&self, url: &str, body: &[u8], hint: TransportHint) -> Result<(), TransportError>;
}

/// Native binding configuration.
#[derive(Debug, Clone)]
pub struct NativeConfig {
    /// Max queued deferred tasks before new ones are dropped.
    pub queue_capacity: usize,
    /// Hint used when the caller does not pass one.
    pub default_hint: TransportHint,
    /// Register the app at the init endpoint during `init_app`.
    pub register_app: bool,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            default_hint: TransportHint::Post,
            register_app: true,
        }
    }
}

enum TickMsg {
    Run(Task),
    Flush(Sender<()>),
}

/// Environment binding that runs deferred work on a dedicated thread.
pub struct NativeEnvironment<T> {
    cfg: NativeConfig,
    transport: Arc<T>,
    tx: Sender<TickMsg>,
    dropped_tasks: AtomicU64,
    _worker: JoinHandle<()>,
}

impl<T: Transport> NativeEnvironment<T> {
    /// Spawns the tick worker and wraps `transport`.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the worker thread.
    #[must_use]
    pub fn new(transport: T, cfg: NativeConfig) -> Self {
        let capacity = cfg.queue_capacity.max(1);
        let (tx, rx) = bounded::<TickMsg>(capacity);

        let worker = thread::Builder::new()
            .name("heimdallr-tick".to_string())
            .spawn(move || worker_loop(rx))
            .expect("failed to spawn heimdallr tick worker");

        Self {
            cfg: NativeConfig {
                queue_capacity: capacity,
                ..cfg
            },
            transport: Arc::new(transport),
            tx,
            dropped_tasks: AtomicU64::new(0),
            _worker: worker,
        }
    }

    /// The transport reports are handed to.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of deferred tasks dropped because the queue was full or closed.
    #[must_use]
    pub fn dropped_tasks(&self) -> u64 {
        self.dropped_tasks.load(Ordering::Relaxed)
    }

    /// Waits until every task queued before this call has run.
    ///
    /// Returns false if `timeout` elapsed first.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (reply_tx, reply_rx) = bounded::<()>(1);
        if self.tx.send_timeout(TickMsg::Flush(reply_tx), timeout).is_err() {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        reply_rx.recv_timeout(remaining).is_ok()
    }

    fn submit(&self, task: Task) -> Result<(), TransportError> {
        match self.tx.try_send(TickMsg::Run(task)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(TransportError::QueueFull {
                capacity: self.cfg.queue_capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(TransportError::Disconnected),
        }
    }

    fn send_json(&self, url: &str, body: Result<Vec<u8>, serde_json::Error>, hint: TransportHint) {
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                let err = TransportError::Serialization {
                    message: e.to_string(),
                };
                tracing::warn!(target: "heimdallr", url, error = %err, "dropping report");
                return;
            }
        };
        if let Err(err) = self.transport.send(url, &body, hint) {
            tracing::warn!(target: "heimdallr", url, error = %err, "report delivery failed");
        }
    }
}

impl<T: Transport> Environment for NativeEnvironment<T> {
    fn is_right_env(&self) -> bool {
        true
    }

    fn next_tick(&self, task: Task) {
        if let Err(err) = self.submit(task) {
            self.dropped_tasks.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(target: "heimdallr", error = %err, "deferred task dropped");
        }
    }

    fn init_app(&self, context: &Context) {
        tracing::debug!(
            target: "heimdallr",
            app = %context.app.name,
            init_url = %context.init_url,
            upload_url = %context.upload_url,
            "app initialized"
        );
        if !self.cfg.register_app {
            return;
        }

        let transport = Arc::clone(&self.transport);
        let url = context.init_url.clone();
        let body = serde_json::to_vec(&context.app);
        self.next_tick(Box::new(move || {
            let result = body
                .map_err(|e| TransportError::Serialization {
                    message: e.to_string(),
                })
                .and_then(|body| transport.send(&url, &body, TransportHint::Post));
            if let Err(err) = result {
                tracing::warn!(target: "heimdallr", url = %url, error = %err, "app registration failed");
            }
        }));
    }

    fn transform(&self, report: Option<Report>) -> Option<Report> {
        report
    }

    fn report(&self, url: &str, report: &Report, hint: Option<TransportHint>) {
        self.send_json(url, report.to_json(), hint.unwrap_or(self.cfg.default_hint));
    }
}

impl<T> std::fmt::Debug for NativeEnvironment<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEnvironment")
            .field("cfg", &self.cfg)
            .field("dropped_tasks", &self.dropped_tasks.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

// The worker is detached rather than joined on drop: a queued task may hold
// the last reference to the environment, and joining from the worker itself
// would deadlock. It exits once every sender is gone.
fn worker_loop(rx: Receiver<TickMsg>) {
    while let Ok(msg) = rx.recv() {
        match msg {
            TickMsg::Run(task) => task(),
            TickMsg::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }
}
