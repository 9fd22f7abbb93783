use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 4310;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// REST server port (default: 4310).
    port: Option<u16>,
    /// SQLite connection string for the task store,
    /// e.g. "sqlite:///home/me/.local/share/todod/todos.db".
    db_url: Option<String>,
    /// Log level filter string, e.g. "debug", "info,todod=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json" (structured for log aggregators).
    log_format: Option<String>,
    /// Bind address for the REST server (default: "127.0.0.1"; use "0.0.0.0" for LAN access).
    bind_address: Option<String>,
    /// Log SQLite queries slower than this threshold (milliseconds). 0 = disabled (default).
    slow_query_threshold_ms: Option<u64>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct TodoConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub log: String,
    /// Task store connection string (TODOD_DB_URL env var or `db_url` in config.toml).
    /// Client subcommands never touch the store, so this stays optional until
    /// `serve` resolves it — a missing value is a fatal startup error there.
    pub db_url: Option<String>,
    /// Bind address for the REST server (TODOD_BIND env var, default: "127.0.0.1").
    pub bind_address: String,
    /// Log output format: "pretty" (default) | "json" (structured for log aggregators).
    pub log_format: String,
    /// Log SQLite queries slower than this threshold (milliseconds). 0 = disabled.
    pub slow_query_threshold_ms: u64,
}

impl TodoConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        db_url: Option<String>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let db_url = db_url.filter(|s| !s.is_empty()).or(toml.db_url);

        let bind_address = bind_address
            .filter(|s| !s.is_empty())
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let log_format = std::env::var("TODOD_LOG_FORMAT")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.log_format)
            .unwrap_or_else(|| "pretty".to_string());

        let slow_query_threshold_ms = toml.slow_query_threshold_ms.unwrap_or(0);

        Self {
            port,
            data_dir,
            log,
            db_url,
            bind_address,
            log_format,
            slow_query_threshold_ms,
        }
    }

    /// Base URL client commands use to reach the REST server.
    pub fn server_url(&self) -> String {
        // A server bound to 0.0.0.0 is still reachable on loopback.
        let host = if self.bind_address == "0.0.0.0" {
            "127.0.0.1"
        } else {
            self.bind_address.as_str()
        };
        format!("http://{}:{}", host, self.port)
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/todod
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("todod");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/todod or ~/.local/share/todod
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("todod");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("todod");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\todod
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("todod");
        }
    }
    // Fallback
    PathBuf::from(".todod")
}
