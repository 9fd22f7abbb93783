use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use todod::{
    cli::client::ApiClient,
    config::TodoConfig,
    rest,
    storage::Storage,
    tasks::TaskService,
    ui::{view, TodoUi},
    AppContext,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "todod",
    about = "todod — personal to-do daemon and terminal client",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// REST API server port
    #[arg(long, env = "TODOD_PORT")]
    port: Option<u16>,

    /// Data directory for the config file
    #[arg(long, env = "TODOD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// SQLite connection string for the task store,
    /// e.g. sqlite:///home/me/.local/share/todod/todos.db
    #[arg(long, env = "TODOD_DB_URL")]
    db_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TODOD_LOG")]
    log: Option<String>,

    /// Bind address for the REST server (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "TODOD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TODOD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,

    /// Suppress progress and informational output.
    ///
    /// Errors are still printed to stderr. JSON output (--json flags) is
    /// unaffected. Use this flag when piping output to other tools.
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start the API server (default when no subcommand given).
    ///
    /// Runs todod in the foreground, serving the REST API backed by the
    /// task store. Requires a connection string (TODOD_DB_URL, --db-url,
    /// or db_url in config.toml); a missing or unreachable store aborts
    /// startup.
    ///
    /// Examples:
    ///   todod serve
    ///   TODOD_DB_URL=sqlite://todos.db todod
    Serve,
    /// Open the full-screen terminal UI.
    ///
    /// Browse tasks in display order (open tasks first, earliest deadline
    /// on top), toggle completion, and add new tasks. Requires a running
    /// server.
    ///
    /// Examples:
    ///   todod ui
    Ui,
    /// List tasks in display order.
    ///
    /// Open tasks print before completed ones; overdue tasks are marked
    /// with [!].
    ///
    /// Examples:
    ///   todod list
    ///   todod list --json
    List {
        /// Print the raw task array as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a task.
    ///
    /// Name and description are required; the deadline defaults to now
    /// when omitted.
    ///
    /// Examples:
    ///   todod add "Write spec" "finish doc"
    ///   todod add "Write spec" "finish doc" --deadline "2025-01-01 10:00"
    Add {
        name: String,
        description: String,
        /// Deadline (RFC 3339 or "YYYY-MM-DD HH:MM", local time)
        #[arg(long)]
        deadline: Option<String>,
    },
    /// Mark a task as completed.
    ///
    /// Examples:
    ///   todod done 5f9a…
    Done { id: String },
    /// Mark a completed task as open again.
    ///
    /// Examples:
    ///   todod reopen 5f9a…
    Reopen { id: String },
    /// Show server status.
    ///
    /// Probes the health endpoint of the running server and prints a
    /// summary line. Exits 0 if healthy, 1 if stopped or unresponsive.
    ///
    /// Examples:
    ///   todod status
    ///   todod status --json
    Status {
        /// Print the health response as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── Logging setup ────────────────────────────────────────────────────────
    // Init once — must happen before any tracing calls. Client subcommands
    // default to errors-only so their stdout stays clean.
    let default_level = match &args.command {
        None | Some(Command::Serve) => "info",
        _ => "error",
    };
    let log_level = args.log.as_deref().unwrap_or(default_level).to_owned();
    let log_format = std::env::var("TODOD_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let _file_guard = setup_logging(&log_level, args.log_file.as_deref(), &log_format);

    let config = TodoConfig::new(
        args.port,
        args.data_dir,
        args.db_url,
        Some(log_level),
        args.bind_address,
    );
    let quiet = args.quiet;

    match args.command {
        Some(Command::Ui) => TodoUi::new(&config).run().await?,
        Some(Command::List { json }) => run_list(&config, json).await?,
        Some(Command::Add {
            name,
            description,
            deadline,
        }) => run_add(&config, &name, &description, deadline.as_deref(), quiet).await?,
        Some(Command::Done { id }) => run_set_completed(&config, &id, true, quiet).await?,
        Some(Command::Reopen { id }) => run_set_completed(&config, &id, false, quiet).await?,
        Some(Command::Status { json }) => {
            let exit_code = run_status(&config, json).await;
            std::process::exit(exit_code);
        }
        None | Some(Command::Serve) => run_server(config).await?,
    }

    Ok(())
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("todod.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            // Fall back to stdout-only — don't panic on a bad log path.
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}

// ─── Server ──────────────────────────────────────────────────────────────────

async fn run_server(config: TodoConfig) -> Result<()> {
    let config = Arc::new(config);
    info!("todod v{} starting", env!("CARGO_PKG_VERSION"));

    let db_url = config.db_url.clone().context(
        "no database connection string configured — set TODOD_DB_URL, pass --db-url, or add db_url to config.toml",
    )?;

    // The store connection is established exactly once, here. Any failure is
    // fatal: the error propagates out of main and the process exits non-zero.
    let storage = Storage::connect(&db_url, config.slow_query_threshold_ms)
        .await
        .context("task store unreachable")?;
    info!(db_url = %db_url, "task store ready");

    let ctx = Arc::new(AppContext {
        config: Arc::clone(&config),
        tasks: TaskService::new(storage),
        started_at: std::time::Instant::now(),
    });

    rest::start_rest_server(ctx).await
}

// ─── Client commands ─────────────────────────────────────────────────────────

async fn run_list(config: &TodoConfig, json: bool) -> Result<()> {
    let client = ApiClient::new(config.server_url())?;
    let mut tasks = client.list_tasks().await?;
    view::sort_for_display(&mut tasks);

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks yet. Add one with: todod add <name> <description>");
        return Ok(());
    }

    let now = chrono::Utc::now();
    for task in &tasks {
        let marker = if task.completed {
            "[x]"
        } else if view::is_overdue(task, now) {
            "[!]"
        } else {
            "[ ]"
        };
        println!(
            "{marker} {:<18} {} — {}  ({})",
            view::format_timestamp(task),
            task.name,
            task.description,
            task.id
        );
    }
    Ok(())
}

async fn run_add(
    config: &TodoConfig,
    name: &str,
    description: &str,
    deadline: Option<&str>,
    quiet: bool,
) -> Result<()> {
    let deadline = deadline.map(view::parse_deadline_input).transpose()?;
    let client = ApiClient::new(config.server_url())?;
    let task = client.create_task(name, description, deadline).await?;
    if !quiet {
        println!("created task {} — {}", task.id, task.name);
    }
    Ok(())
}

async fn run_set_completed(
    config: &TodoConfig,
    id: &str,
    completed: bool,
    quiet: bool,
) -> Result<()> {
    let client = ApiClient::new(config.server_url())?;
    let task = client.set_completed(id, completed).await?;
    if !quiet {
        let state = if task.completed { "completed" } else { "open" };
        println!("marked {} as {state}", task.id);
    }
    Ok(())
}

/// Probe the running server. Returns the process exit code.
async fn run_status(config: &TodoConfig, json: bool) -> i32 {
    let client = match ApiClient::new(config.server_url()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    match client.health().await {
        Ok(health) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&health).unwrap_or_default()
                );
            } else {
                let version = health
                    .get("version")
                    .and_then(|v| v.as_str())
                    .unwrap_or("?");
                let uptime = health
                    .get("uptime_secs")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0);
                println!("todod is running — v{version}, up {uptime}s");
            }
            0
        }
        Err(e) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "running": false, "error": e.to_string() })
                );
            } else {
                eprintln!("todod is not running: {e}");
            }
            1
        }
    }
}
