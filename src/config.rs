//! Client options and the context derived from them.
//!
//! `Options` is the caller-supplied configuration. It is read-only once a
//! client is built; accessors hand out clones so callers can never reach the
//! live copy. `Context` is computed once from `Options` and exists only when
//! binding succeeds.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::url::format_url_path;

/// Default bound of the breadcrumb stack.
pub const DEFAULT_MAX_BREADCRUMBS: usize = 20;

/// Default click throttle window in milliseconds.
pub const DEFAULT_THROTTLE_DELAY_MS: u64 = 300;

/// Collection endpoint description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dsn {
    /// Collector host, with or without scheme.
    pub host: String,

    /// Path of the app registration endpoint.
    pub init: String,

    /// Path of the report upload endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload: Option<String>,
}

impl Dsn {
    /// Creates a DSN with the given host and init path.
    #[must_use]
    pub fn new(host: impl Into<String>, init: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            init: init.into(),
            upload: None,
        }
    }

    /// Sets the upload path.
    #[must_use]
    pub fn with_upload(mut self, upload: impl Into<String>) -> Self {
        self.upload = Some(upload.into());
        self
    }
}

/// Identity of the monitored application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    /// Application identifier.
    pub name: String,

    /// Owner of the application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<String>,

    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl AppInfo {
    /// Creates an app identity with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            leader: None,
            desc: None,
        }
    }
}

/// Client options.
///
/// # Examples
///
/// ```
/// use heimdallr::config::Options;
///
/// let options = Options::from_json_str(
///     r#"{"dsn": {"host": "example.com", "init": "/init", "upload": "/upload"},
///         "app": {"name": "shop"}, "debug": true, "throttleDelayTime": 100}"#,
/// ).unwrap();
/// assert_eq!(options.throttle_delay_time, 100);
/// assert!(options.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Collection endpoints.
    pub dsn: Option<Dsn>,

    /// Application identity.
    pub app: Option<AppInfo>,

    /// Enables diagnostic logging through the client's console sink.
    pub debug: bool,

    /// When false, reports are built but never handed to the transport.
    pub enabled: bool,

    /// Bound of the shared breadcrumb stack.
    pub max_breadcrumbs: usize,

    /// Throttle window for high-frequency plugins, in milliseconds.
    pub throttle_delay_time: u64,

    /// Plugin-specific keys that the core does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dsn: None,
            app: None,
            debug: false,
            enabled: true,
            max_breadcrumbs: DEFAULT_MAX_BREADCRUMBS,
            throttle_delay_time: DEFAULT_THROTTLE_DELAY_MS,
            extra: Map::new(),
        }
    }
}

impl Options {
    /// Creates options with the two required fields set.
    #[must_use]
    pub fn new(dsn: Dsn, app: AppInfo) -> Self {
        Self {
            dsn: Some(dsn),
            app: Some(app),
            ..Self::default()
        }
    }

    /// Parses options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the document is not valid options JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Sets the debug flag.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the breadcrumb bound.
    #[must_use]
    pub fn with_max_breadcrumbs(mut self, max: usize) -> Self {
        self.max_breadcrumbs = max;
        self
    }

    /// Sets the throttle window in milliseconds.
    #[must_use]
    pub fn with_throttle_delay_time(mut self, millis: u64) -> Self {
        self.throttle_delay_time = millis;
        self
    }

    /// Sets a plugin-specific key.
    #[must_use]
    pub fn with_plugin_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Looks up a plugin-specific key.
    #[must_use]
    pub fn plugin_value(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Process-lifetime state derived from valid options.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub app: AppInfo,
    pub init_url: String,
    pub upload_url: String,
    pub debug: bool,
    pub enabled: bool,
}

impl Context {
    /// Binds options into a context.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingApp` when no app name is given and
    /// `ConfigError::MissingHost` when the DSN or its host is absent.
    pub fn bind(options: &Options) -> Result<Self, ConfigError> {
        let app = options
            .app
            .as_ref()
            .filter(|app| !app.name.trim().is_empty())
            .ok_or(ConfigError::MissingApp)?;
        let dsn = options
            .dsn
            .as_ref()
            .filter(|dsn| !dsn.host.trim().is_empty())
            .ok_or(ConfigError::MissingHost)?;

        let upload = dsn.upload.as_deref().unwrap_or_default();

        Ok(Self {
            app: app.clone(),
            init_url: format_url_path(&dsn.host, &dsn.init),
            upload_url: format_url_path(&dsn.host, upload),
            debug: options.debug,
            enabled: options.enabled,
        })
    }
}
