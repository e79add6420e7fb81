use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use heimdallr::{
    AppInfo, Client, ClientError, Console, ConsoleLevel, Context, Dsn, Environment, EventId,
    EventType, Notifier, Options, Plugin, PluginContext, PluginSet, Report, ReportData, Task,
    TransportHint,
};
use heimdallr::{Breadcrumb, BreadcrumbType};

/// Environment that records reports and can defer ticks until drained.
#[derive(Default)]
struct TestEnv {
    deferred: bool,
    queue: Mutex<Vec<Task>>,
    sent: Mutex<Vec<(String, Report)>>,
    suppress: AtomicBool,
    // Whether each transform call carried a report.
    transformed: Mutex<Vec<bool>>,
    inits: AtomicUsize,
    lines: Arc<Lines>,
}

#[derive(Default)]
struct Lines(Mutex<Vec<(ConsoleLevel, String)>>);

impl Console for Lines {
    fn write(&self, level: ConsoleLevel, tag: &str, message: &str) -> bool {
        self.0.lock().unwrap().push((level, format!("{tag} {message}")));
        true
    }
}

impl TestEnv {
    fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    fn drain(&self) {
        let tasks: Vec<Task> = self.queue.lock().unwrap().drain(..).collect();
        for task in tasks {
            task();
        }
    }

    fn sent(&self) -> Vec<(String, Report)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Environment for TestEnv {
    fn is_right_env(&self) -> bool {
        true
    }

    fn next_tick(&self, task: Task) {
        if self.deferred {
            self.queue.lock().unwrap().push(task);
        } else {
            task();
        }
    }

    fn init_app(&self, _context: &Context) {
        self.inits.fetch_add(1, Ordering::SeqCst);
    }

    fn transform(&self, report: Option<Report>) -> Option<Report> {
        self.transformed.lock().unwrap().push(report.is_some());
        if self.suppress.load(Ordering::SeqCst) {
            None
        } else {
            report
        }
    }

    fn report(&self, url: &str, report: &Report, _hint: Option<TransportHint>) {
        self.sent.lock().unwrap().push((url.to_string(), report.clone()));
    }

    fn console(&self) -> Option<Arc<dyn Console>> {
        Some(self.lines.clone())
    }
}

/// Plugin that exposes its notifier so tests can fire occurrences directly.
/// Odd numbers are dropped by `transform`.
struct Manual {
    name: String,
    notifier: Arc<Mutex<Option<Notifier<u32>>>>,
    notify_in_monitor: bool,
}

impl Manual {
    fn new(name: &str) -> (Self, Arc<Mutex<Option<Notifier<u32>>>>) {
        let notifier = Arc::new(Mutex::new(None));
        (
            Self {
                name: name.to_string(),
                notifier: Arc::clone(&notifier),
                notify_in_monitor: false,
            },
            notifier,
        )
    }
}

impl Plugin for Manual {
    type Collected = u32;

    fn name(&self) -> &str {
        &self.name
    }

    fn monitor(&self, _ctx: &PluginContext, notify: Notifier<u32>) {
        if self.notify_in_monitor {
            notify.notify(2);
        }
        *self.notifier.lock().unwrap() = Some(notify);
    }

    fn transform(&self, ctx: &PluginContext, collected: u32) -> Option<Report> {
        if collected % 2 == 1 {
            return None;
        }
        let id = EventId::new();
        ctx.breadcrumb().unshift(Breadcrumb::new(
            id,
            BreadcrumbType::Custom,
            serde_json::json!({ "plugin": self.name, "n": collected }),
        ));
        Some(
            Report::new(
                id,
                EventType::Custom,
                ReportData::Custom {
                    name: self.name.clone(),
                    payload: serde_json::json!(collected),
                },
            )
            .with_breadcrumb(ctx.breadcrumb().get_stack()),
        )
    }
}

fn fire(notifier: &Arc<Mutex<Option<Notifier<u32>>>>, n: u32) -> bool {
    notifier.lock().unwrap().as_ref().unwrap().notify(n)
}

fn options() -> Options {
    Options::new(
        Dsn::new("example.com", "/init").with_upload("/upload"),
        AppInfo::new("shop"),
    )
}

#[test]
fn accepted_occurrence_is_reported_to_upload_url() {
    let env = Arc::new(TestEnv::default());
    let client = Client::with_shared_env(Arc::clone(&env), options()).unwrap();
    let (plugin, notifier) = Manual::new("manual");
    client.use_plugins(PluginSet::new().with(plugin));

    assert!(fire(&notifier, 4));

    let sent = env.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "//example.com/upload");
    assert_eq!(sent[0].1.event_type, EventType::Custom);
    assert_eq!(client.breadcrumb().len(), 1);
}

#[test]
fn dropped_occurrence_sends_nothing_and_records_nothing() {
    let env = Arc::new(TestEnv::default());
    let client = Client::with_shared_env(Arc::clone(&env), options()).unwrap();
    let (plugin, notifier) = Manual::new("manual");
    client.use_plugins(PluginSet::new().with(plugin));

    fire(&notifier, 3);

    assert!(env.sent().is_empty());
    assert!(client.breadcrumb().is_empty());
}

#[test]
fn environment_transform_sees_dropped_occurrence() {
    let env = Arc::new(TestEnv::default());
    let client = Client::with_shared_env(Arc::clone(&env), options()).unwrap();
    let (plugin, notifier) = Manual::new("manual");
    client.use_plugins(PluginSet::new().with(plugin));

    fire(&notifier, 3);
    fire(&notifier, 2);

    assert_eq!(*env.transformed.lock().unwrap(), vec![false, true]);
    assert_eq!(env.sent().len(), 1);
    assert_eq!(client.breadcrumb().len(), 1);
}

#[test]
fn environment_transform_can_suppress() {
    let env = Arc::new(TestEnv::default());
    let client = Client::with_shared_env(Arc::clone(&env), options()).unwrap();
    let (plugin, notifier) = Manual::new("manual");
    client.use_plugins(PluginSet::new().with(plugin));

    env.suppress.store(true, Ordering::SeqCst);
    fire(&notifier, 2);
    assert!(env.sent().is_empty());
    // The plugin already recorded its breadcrumb before suppression.
    assert_eq!(client.breadcrumb().len(), 1);
}

#[test]
fn disabled_client_builds_reports_but_never_sends() {
    let env = Arc::new(TestEnv::default());
    let client =
        Client::with_shared_env(Arc::clone(&env), options().with_enabled(false)).unwrap();
    let (plugin, notifier) = Manual::new("manual");
    client.use_plugins(PluginSet::new().with(plugin));

    fire(&notifier, 2);
    assert!(env.sent().is_empty());
    assert_eq!(client.breadcrumb().len(), 1);
}

#[test]
fn report_waits_for_tick_with_snapshot_already_taken() {
    let env = Arc::new(TestEnv::deferred());
    let client = Client::with_shared_env(Arc::clone(&env), options()).unwrap();
    let (plugin, notifier) = Manual::new("manual");
    client.use_plugins(PluginSet::new().with(plugin));

    fire(&notifier, 2);
    fire(&notifier, 4);
    assert!(env.sent().is_empty());

    env.drain();
    let sent = env.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1.breadcrumb.as_ref().unwrap().len(), 1);
    assert_eq!(sent[1].1.breadcrumb.as_ref().unwrap().len(), 2);
}

#[test]
fn notify_during_monitor_is_lost() {
    let env = Arc::new(TestEnv::default());
    let client = Client::with_shared_env(Arc::clone(&env), options()).unwrap();
    let (mut plugin, notifier) = Manual::new("eager");
    plugin.notify_in_monitor = true;
    client.use_plugins(PluginSet::new().with(plugin));

    assert!(env.sent().is_empty());
    assert!(client.breadcrumb().is_empty());

    assert!(fire(&notifier, 2));
    assert_eq!(env.sent().len(), 1);
}

#[test]
fn batches_use_independent_routers() {
    let env = Arc::new(TestEnv::default());
    let client = Client::with_shared_env(Arc::clone(&env), options()).unwrap();

    let (first, first_notifier) = Manual::new("same");
    client.use_plugins(PluginSet::new().with(first));
    let (second, second_notifier) = Manual::new("same");
    client.use_plugins(PluginSet::new().with(second));

    fire(&first_notifier, 2);
    fire(&second_notifier, 4);

    let payloads: Vec<_> = env
        .sent()
        .into_iter()
        .map(|(_, r)| match r.data {
            ReportData::Custom { payload, .. } => payload,
            other => panic!("unexpected data {other:?}"),
        })
        .collect();
    assert_eq!(payloads, vec![serde_json::json!(2), serde_json::json!(4)]);
    assert_eq!(client.plugin_count(), 2);
}

#[test]
fn plugins_share_one_breadcrumb_stack() {
    let env = Arc::new(TestEnv::default());
    let client = Client::with_shared_env(Arc::clone(&env), options()).unwrap();
    let (a, a_notifier) = Manual::new("a");
    let (b, b_notifier) = Manual::new("b");
    client.use_plugins(PluginSet::new().with(a).with(b));

    fire(&a_notifier, 2);
    fire(&b_notifier, 4);

    let sent = env.sent();
    let first = sent[0].1.breadcrumb.clone().unwrap();
    let second = sent[1].1.breadcrumb.clone().unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].data["plugin"], "b");
    assert_eq!(second[1].data["plugin"], "a");
    assert_eq!(second[1].event_id, sent[0].1.id);
}

#[test]
fn breadcrumb_bound_comes_from_options() {
    let env = Arc::new(TestEnv::default());
    let client =
        Client::with_shared_env(Arc::clone(&env), options().with_max_breadcrumbs(2)).unwrap();
    let (plugin, notifier) = Manual::new("manual");
    client.use_plugins(PluginSet::new().with(plugin));

    for n in [2, 4, 6] {
        fire(&notifier, n);
    }
    let stack = client.breadcrumb().get_stack();
    assert_eq!(stack.len(), 2);
    assert_eq!(stack[0].data["n"], 6);
    assert_eq!(stack[1].data["n"], 4);
}

#[test]
fn dropping_client_releases_router_and_environment() {
    let env = Arc::new(TestEnv::default());
    let client = Client::with_shared_env(Arc::clone(&env), options()).unwrap();
    let (plugin, notifier) = Manual::new("manual");
    client.use_plugins(PluginSet::new().with(plugin));
    assert!(fire(&notifier, 2));

    let weak_env: Weak<TestEnv> = Arc::downgrade(&env);
    drop(env);
    drop(client);

    assert!(!fire(&notifier, 4));
    assert!(weak_env.upgrade().is_none());
}

#[test]
fn teardown_silences_kept_notifiers() {
    let env = Arc::new(TestEnv::default());
    let client = Client::with_shared_env(Arc::clone(&env), options()).unwrap();
    let (plugin, notifier) = Manual::new("manual");
    client.use_plugins(PluginSet::new().with(plugin));

    client.teardown();
    assert!(!fire(&notifier, 2));
    assert!(env.sent().is_empty());
}

#[test]
fn invalid_options_never_produce_a_client() {
    for bad in [
        Options {
            app: None,
            ..options()
        },
        Options {
            dsn: None,
            ..options()
        },
        Options::default(),
    ] {
        let env = Arc::new(TestEnv::default());
        let err = Client::with_shared_env(Arc::clone(&env), bad).unwrap_err();
        assert!(matches!(err, ClientError::InvalidOptions(_)));
        assert_eq!(env.inits.load(Ordering::SeqCst), 0);
        assert!(env.sent().is_empty());
    }
}

#[test]
fn client_log_respects_debug_flag() {
    let env = Arc::new(TestEnv::default());
    let client = Client::with_shared_env(Arc::clone(&env), options()).unwrap();
    client.log("quiet", ConsoleLevel::Warn);
    assert!(env.lines.0.lock().unwrap().is_empty());

    let env = Arc::new(TestEnv::default());
    let client = Client::with_shared_env(Arc::clone(&env), options().with_debug(true)).unwrap();
    client.log("loud", ConsoleLevel::Info);
    assert_eq!(
        *env.lines.0.lock().unwrap(),
        vec![(ConsoleLevel::Info, "[heimdallr] loud".to_string())]
    );
}
