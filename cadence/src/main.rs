//! Cadence - recurring task scheduler
//!
//! CLI entry point for running the demo tasks or configured shell commands.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use cadence::cli::{Cli, Command, OutputFormat};
use cadence::config::{Config, TaskSpec};
use cadence::jobs;
use cadence::{MonotonicClock, Priority, Scheduler, TaskInfo};

fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    let writer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create log directory")?;
            }
            let file = fs::File::create(path).context("Failed to create log file")?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config decides where logs go, so it is loaded first
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.verbose, config.log.file.as_deref()).context("Failed to setup logging")?;
    config.validate().context("Invalid configuration")?;

    info!(
        poll_interval_ms = config.scheduler.poll_interval_ms,
        tasks = config.tasks.len(),
        "Cadence loaded config"
    );

    match cli.command {
        Command::Demo { duration } => cmd_demo(&config, duration).await,
        Command::Run { duration } => cmd_run(&config, duration).await,
        Command::List { format } => cmd_list(&config, format),
    }
}

/// Run the three demo tasks until the deadline or Ctrl-C
async fn cmd_demo(config: &Config, duration_secs: u64) -> Result<()> {
    println!("Task Scheduler Demo");
    println!("Press Ctrl-C to stop the scheduler (auto-stop after {}s)...", duration_secs);

    let scheduler = Arc::new(Scheduler::new(config.scheduler.clone()).with_clock(Arc::new(MonotonicClock::new())));
    for task in jobs::demo_tasks() {
        scheduler.add(task);
    }

    run_until_stopped(&scheduler, Some(Duration::from_secs(duration_secs))).await?;

    println!("Scheduler stopped by cancellation.");
    print_task_table(&scheduler.list_tasks());
    println!("Scheduler demo finished!");
    Ok(())
}

/// Run the configured shell-command tasks
async fn cmd_run(config: &Config, duration_secs: Option<u64>) -> Result<()> {
    if config.tasks.is_empty() {
        warn!("No tasks configured");
        println!("No tasks configured; add a `tasks:` section to the config file");
        return Ok(());
    }

    let scheduler = Arc::new(Scheduler::new(config.scheduler.clone()));
    for spec in &config.tasks {
        scheduler.add(jobs::command_task(spec));
    }
    info!(tasks = config.tasks.len(), "Registered configured tasks");

    run_until_stopped(&scheduler, duration_secs.map(Duration::from_secs)).await?;

    print_task_table(&scheduler.list_tasks());
    Ok(())
}

/// Spawn the scheduler and stop it on a signal or after `deadline`
async fn run_until_stopped(scheduler: &Arc<Scheduler>, deadline: Option<Duration>) -> Result<()> {
    let cancel = CancellationToken::new();
    let handle = Arc::clone(scheduler).spawn(cancel.clone());

    let deadline = async {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = deadline => info!("Deadline reached"),
        result = shutdown_signal() => {
            result?;
            warn!("Shutdown signal received");
        }
    }

    cancel.cancel();
    handle.join().await.context("Scheduler failed")?;

    let stats = scheduler.stats();
    info!(
        cycles = stats.cycles,
        succeeded = stats.tasks_succeeded,
        failed = stats.tasks_failed,
        "Scheduler finished"
    );
    Ok(())
}

/// Resolve on SIGINT or SIGTERM (Ctrl-C elsewhere)
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}

/// Print configured tasks without running them
fn cmd_list(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config.tasks)?);
        }
        OutputFormat::Text => {
            if config.tasks.is_empty() {
                println!("No tasks configured");
                return Ok(());
            }
            for spec in &config.tasks {
                print_spec(spec);
            }
        }
    }
    Ok(())
}

fn print_spec(spec: &TaskSpec) {
    println!(
        "{:<24} {:<8} every {:>8}ms  {}",
        spec.name.cyan(),
        colored_priority(spec.priority),
        spec.interval_ms,
        spec.command.dimmed()
    );
}

fn print_task_table(tasks: &[TaskInfo]) {
    println!();
    println!("{:<24} {:<8} {:>10} {:>6} {:>8}  {}", "TASK", "PRIORITY", "INTERVAL", "RUNS", "FAILURES", "LAST RUN");
    for task in tasks {
        let last_run = task
            .last_run
            .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        let failures = if task.failures > 0 {
            task.failures.to_string().red()
        } else {
            task.failures.to_string().normal()
        };
        println!(
            "{:<24} {:<8} {:>10} {:>6} {:>8}  {}",
            task.name.cyan(),
            colored_priority(task.priority),
            format!("{:?}", task.interval),
            task.runs,
            failures,
            last_run
        );
    }
}

fn colored_priority(priority: Priority) -> ColoredString {
    let label = priority.to_string();
    match priority {
        Priority::High => label.red().bold(),
        Priority::Normal => label.yellow(),
        Priority::Low => label.normal(),
    }
}
