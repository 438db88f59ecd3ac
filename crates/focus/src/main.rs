//! focus - scheduled site blocking with a one-way manual focus override
//!
//! Usage:
//!   focus daemon                Restore state, then reconcile every minute
//!   focus start                 Start a one-hour manual focus session
//!   focus status                Show blocking status
//!   focus sync                  Reconcile the rule set once
//!   focus install               Write default config and blocked page, then sync
//!   focus rules                 Show the installed redirect rules
//!   focus page                  Print (or --write) the blocked page

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use focusguard_core::daemon::{check_daemon, PidFile};
use focusguard_core::Paths;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use focus::commands::{self, FocusResponse};
use focus::coordinator::Coordinator;
use focus::display;
use focus::store::{FileRuleStore, FileStateStore, RuleStore};
use focus::ticker::{self, TICK_INTERVAL};
use focus::{BlockerConfig, Clock, ManualFocusSession, SyncOutcome};

const DAEMON_NAME: &str = "focusd";
const RULES_FILE: &str = "rules.json";
const BLOCKED_PAGE_FILE: &str = "blocked.html";

type FileCoordinator = Coordinator<FileRuleStore, FileStateStore>;

/// Focus - scheduled site blocking with a one-way manual focus override
#[derive(Parser)]
#[command(name = "focus")]
#[command(about = "Scheduled site blocking with an irrevocable manual focus override")]
#[command(version)]
#[command(after_help = r#"WHEN TO USE:
    Keep distracting sites out of reach during working hours, or commit
    to an hour of focus right now. A started session cannot be stopped.

CONFIG:
    ~/.config/focusguard/config.json
    {
      "schedule": { "days": [1, 2, 3, 4, 5], "startHour": 9, "endHour": 17 },
      "blockedSites": ["reddit.com", "linkedin.com"]
    }
    Days: 0=Sunday .. 6=Saturday. Hours block [startHour, endHour).

EXAMPLES:
    focus install               # Write defaults and install rules
    focus daemon                # Keep rules in step with the schedule
    focus start                 # Block everything for the next hour
    focus status --json         # Machine-readable status

ALIASES:
    focus s     # start
    focus st    # status
"#)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore state, then reconcile every tick until interrupted
    #[command(alias = "run")]
    Daemon {
        /// Seconds between reconciliations
        #[arg(long, default_value_t = TICK_INTERVAL.as_secs())]
        interval: u64,
    },

    /// Start a one-hour manual focus session (cannot be stopped)
    #[command(alias = "s")]
    Start {
        /// Print the command response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show blocking status
    #[command(alias = "st")]
    Status {
        /// Print the status projection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile the rule set with the current decision once
    Sync,

    /// Write default config and blocked page if missing, then reconcile
    Install,

    /// Show installed redirect rules
    Rules {
        #[arg(long)]
        json: bool,
    },

    /// Print the blocked page
    Page {
        /// Write it to the data directory instead of stdout
        #[arg(long)]
        write: bool,
    },
}

// ANSI color codes
const RED: &str = "\x1b[0;31m";
const GREEN: &str = "\x1b[0;32m";
const YELLOW: &str = "\x1b[0;33m";
const CYAN: &str = "\x1b[0;36m";
const MAGENTA: &str = "\x1b[0;35m";
const BOLD: &str = "\x1b[1m";
const NC: &str = "\x1b[0m";

/// Check if stdout is a TTY and colors should be used
fn use_colors() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}

/// Conditionally apply color
fn color(code: &str, text: &str) -> String {
    if use_colors() {
        format!("{}{}{}", code, text, NC)
    } else {
        text.to_string()
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = Paths::new();

    if let Some(Commands::Install) = cli.command {
        write_defaults(&paths)?;
    }

    let config = BlockerConfig::load(&paths.config_file())
        .with_context(|| format!("Failed to load config: {}", paths.config_file().display()))?;

    if let Some(Commands::Page { write }) = cli.command {
        return cmd_page(&paths, &config, write);
    }

    let target = display::redirect_target(&config, &paths.state(BLOCKED_PAGE_FILE));
    let coordinator = Coordinator::new(
        config,
        target,
        FileRuleStore::new(paths.state(RULES_FILE)),
        FileStateStore::new(paths.data.clone()),
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        match cli.command {
            Some(Commands::Daemon { interval }) => cmd_daemon(&paths, &coordinator, interval).await,
            Some(Commands::Start { json }) => cmd_start(&coordinator, json).await,
            Some(Commands::Status { json }) => cmd_status(&paths, &coordinator, json).await,
            Some(Commands::Sync) | Some(Commands::Install) => cmd_sync(&coordinator).await,
            Some(Commands::Rules { json }) => cmd_rules(&coordinator, json).await,
            Some(Commands::Page { .. }) => Ok(()),
            None => cmd_status(&paths, &coordinator, false).await,
        }
    })
}

/// Install/update hook: create config and blocked page if they don't exist
fn write_defaults(paths: &Paths) -> Result<()> {
    let config_path = paths.config_file();
    if !config_path.exists() {
        BlockerConfig::default()
            .save(&config_path)
            .with_context(|| format!("Failed to write default config: {}", config_path.display()))?;
        println!("{} Wrote default config to {}", color(GREEN, "[ok]"), config_path.display());
    }

    let config = BlockerConfig::load(&config_path)?;
    write_blocked_page(paths, &config)
}

fn write_blocked_page(paths: &Paths, config: &BlockerConfig) -> Result<()> {
    let page_path = paths.state(BLOCKED_PAGE_FILE);
    std::fs::create_dir_all(&paths.data)
        .with_context(|| format!("Failed to create data directory: {}", paths.data.display()))?;
    std::fs::write(&page_path, display::blocked_page_html(config))
        .with_context(|| format!("Failed to write blocked page: {}", page_path.display()))?;
    println!("{} Blocked page at {}", color(GREEN, "[ok]"), page_path.display());
    Ok(())
}

fn local_time(at: DateTime<Utc>) -> String {
    let local: DateTime<Local> = at.into();
    local.format("%H:%M").to_string()
}

/// Run the reconciliation loop
async fn cmd_daemon(paths: &Paths, coordinator: &FileCoordinator, interval: u64) -> Result<()> {
    if interval == 0 {
        bail!("--interval must be at least one second");
    }

    let daemon = check_daemon(paths, DAEMON_NAME);
    if daemon.status == focusguard_core::DaemonStatus::Running {
        bail!(
            "focus daemon already running (pid {})",
            daemon.pid.unwrap_or_default()
        );
    }
    let _pid_file = PidFile::create(paths, DAEMON_NAME)?;

    tracing::info!(interval, "Starting focus daemon");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    ticker::run(coordinator, Duration::from_secs(interval), shutdown).await;

    Ok(())
}

/// Start a manual focus session
async fn cmd_start(coordinator: &FileCoordinator, json: bool) -> Result<()> {
    let response: FocusResponse = commands::start_focus(coordinator).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        if !response.success {
            std::process::exit(1);
        }
        return Ok(());
    }

    let end_time = match (response.success, response.end_time) {
        (true, Some(end)) => ManualFocusSession::from_millis(end),
        _ => bail!(
            "Failed to start focus mode: {}",
            response.error.unwrap_or_else(|| "unknown error".to_string())
        ),
    };

    println!("{} Manual focus started", color(GREEN, "[ok]"));
    println!();
    println!("{}", color(&format!("{}{}", BOLD, MAGENTA), "FOCUS MODE"));
    println!();
    println!("  {}   {}", color(CYAN, "Ends at:"), local_time(end_time.end()));
    println!("  {}     {}", color(CYAN, "Sites:"), coordinator.config().blocked_sites.join(", "));
    println!();
    println!("There is no stop. Blocking lifts on its own when the hour is up.");

    Ok(())
}

/// Show blocking status
async fn cmd_status(paths: &Paths, coordinator: &FileCoordinator, json: bool) -> Result<()> {
    let status = coordinator.status().await.context("Failed to read blocking state")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let now = coordinator.clock().now();
    let line = display::status_line(&status, &now);
    let badge = display::badge_text(&status);
    if status.should_block {
        println!("{}  [{}]", color(&format!("{}{}", BOLD, RED), &line), badge);
    } else {
        println!("{}  [{}]", color(&format!("{}{}", BOLD, GREEN), &line), badge);
    }
    println!();
    println!("  {}     {}", color(CYAN, "Phase:"), status.phase());

    if let Some(focus) = display::focus_summary(&status, &now) {
        println!("  {}     {}", color(CYAN, "Focus:"), focus);
    }

    let schedule = &coordinator.config().schedule;
    println!("  {}      {}", color(CYAN, "Days:"), schedule.days_label());
    println!("  {}      {}", color(CYAN, "Time:"), schedule.hours_label());
    println!();
    println!("{}", color(BOLD, "Blocked sites"));
    for site in &coordinator.config().blocked_sites {
        println!("  - {}", site);
    }

    let daemon = check_daemon(paths, DAEMON_NAME);
    println!();
    println!(
        "  {}    {} {}",
        color(CYAN, "Daemon:"),
        daemon.status.symbol(),
        daemon.status.as_str()
    );
    if daemon.status != focusguard_core::DaemonStatus::Running {
        println!(
            "  {}",
            color(YELLOW, "Rules only change when 'focus daemon' runs or a command syncs")
        );
    }

    Ok(())
}

/// Reconcile once
async fn cmd_sync(coordinator: &FileCoordinator) -> Result<()> {
    match coordinator.restore_state().await {
        SyncOutcome::Blocking { rules } => {
            println!("{} Blocking active, {} rules installed", color(GREEN, "[ok]"), rules)
        }
        SyncOutcome::Cleared => println!("{} Blocking inactive, rules cleared", color(GREEN, "[ok]")),
        SyncOutcome::FailedOpen { error, cleared } => {
            println!("{} Reconciliation failed: {}", color(YELLOW, "[warn]"), error);
            if cleared {
                println!("Rules were cleared; the next sync will retry.");
            } else {
                bail!("Rule store unreachable");
            }
        }
    }
    Ok(())
}

/// Show installed rules
async fn cmd_rules(coordinator: &FileCoordinator, json: bool) -> Result<()> {
    let rules = coordinator.rule_store().list().await.context("Failed to read rule store")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    if rules.is_empty() {
        println!("No blocking rules installed");
        return Ok(());
    }

    for rule in &rules {
        println!(
            "  {:>3}  {:<32} -> {}",
            rule.id,
            rule.condition.url_filter,
            rule.redirect_url()
        );
    }
    Ok(())
}

/// Print or write the blocked page
fn cmd_page(paths: &Paths, config: &BlockerConfig, write: bool) -> Result<()> {
    if write {
        write_blocked_page(paths, config)
    } else {
        print!("{}", display::blocked_page_html(config));
        Ok(())
    }
}
