use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pomodoro_mcp::config::{self, SettingsLayer, SettingsSource};
use pomodoro_mcp::db::Database;
use pomodoro_mcp::hooks::{Hook, LogHook, ScriptHook};
use pomodoro_mcp::tracker::Tracker;
use pomodoro_mcp::{api, mcp};

#[derive(Parser)]
#[command(name = "pomodoro-mcp")]
#[command(about = "Pomodoro timer for AI agents over MCP")]
struct Cli {
    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct GlobalOptions {
    /// Data directory holding settings, history and hooks (default: ~/.pomodoro)
    #[arg(long, global = true, env = "POMODORO_DIR")]
    directory: Option<PathBuf>,

    /// Override the daily goal
    #[arg(long, global = true, env = "POMODORO_DAILY_GOAL")]
    daily_goal: Option<u32>,

    /// Override the default Pomodoro duration, in minutes
    #[arg(long, global = true, env = "POMODORO_DURATION")]
    duration: Option<i64>,

    /// Override the default break duration, in minutes
    #[arg(long, global = true, env = "POMODORO_BREAK_DURATION")]
    break_duration: Option<i64>,

    /// Override the default tags (comma-separated)
    #[arg(long, global = true, env = "POMODORO_TAGS", value_delimiter = ',')]
    tags: Option<Vec<String>>,

    /// Seconds before a hook script is killed and reported as failed
    #[arg(long, global = true, default_value = "30")]
    hook_timeout: u64,

    /// Log hook events instead of running hook scripts
    #[arg(long, global = true)]
    no_hooks: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server via stdio (default)
    Mcp,
    /// Serve MCP over streamable HTTP plus a read-only JSON API
    Serve {
        /// Port for HTTP
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

/// Initialize tracing with output to stderr (for MCP mode) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "pomodoro_mcp=info,tower_http=info".into()),
    );

    if use_stderr {
        // stdout is the protocol channel
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn build_tracker(options: &GlobalOptions) -> anyhow::Result<Tracker> {
    let data_directory = match &options.directory {
        Some(dir) => dir.clone(),
        None => config::default_data_directory()?,
    };

    let overrides = SettingsLayer {
        daily_goal: options.daily_goal,
        default_pomodoro_duration: options.duration,
        default_break_duration: options.break_duration,
        default_tags: options.tags.clone(),
    };
    let settings = SettingsSource::new(&data_directory, overrides);
    // Fail at startup rather than on the first tool call
    settings.load()?;

    let db = Database::open_in(&data_directory)?;
    db.migrate()?;

    let hook: Arc<dyn Hook> = if options.no_hooks {
        Arc::new(LogHook)
    } else {
        Arc::new(ScriptHook::new(
            &data_directory,
            Duration::from_secs(options.hook_timeout),
        ))
    };

    tracing::info!("Using data directory {:?}", data_directory);
    Ok(Tracker::new(db, settings, hook))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = !matches!(cli.command, Some(Commands::Serve { .. }));
    init_tracing(use_stderr);

    let tracker = build_tracker(&cli.options)?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            let app = api::create_router(tracker);

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("Pomodoro server listening on http://127.0.0.1:{}", port);

            axum::serve(listener, app).await?;
        }
        Some(Commands::Mcp) | None => {
            mcp::run_stdio_server(tracker).await?;
        }
    }

    Ok(())
}
