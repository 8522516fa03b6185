//! Work units for the `cadence` binary

use std::process::Stdio;
use std::time::Duration;

use chrono::Local;
use eyre::{Context, eyre};
use tokio::process::Command;
use tracing::debug;

use crate::config::TaskSpec;
use crate::domain::{Priority, Task};

/// The three demo tasks: High every 2s, Normal every 3s, Low every 4s
///
/// Each prints a timestamped line and then simulates some work.
pub fn demo_tasks() -> Vec<Task> {
    [
        ("High Priority Task", Priority::High, 2, 500),
        ("Normal Priority Task", Priority::Normal, 3, 300),
        ("Low Priority Task", Priority::Low, 4, 200),
    ]
    .into_iter()
    .map(|(name, priority, interval_secs, work_ms)| {
        Task::new(name, priority, Duration::from_secs(interval_secs), move || async move {
            println!("[{}] Running {} priority task", Local::now().format("%H:%M:%S"), priority);
            tokio::time::sleep(Duration::from_millis(work_ms)).await;
            Ok(())
        })
    })
    .collect()
}

/// Build a task that runs `spec.command` through `sh -c`
///
/// A non-zero exit status is a task failure carrying the command's stderr.
pub fn command_task(spec: &TaskSpec) -> Task {
    let name = spec.name.clone();
    let command = spec.command.clone();
    Task::new(spec.name.clone(), spec.priority, spec.interval(), move || {
        run_command(name.clone(), command.clone())
    })
}

async fn run_command(name: String, command: String) -> eyre::Result<()> {
    debug!(%name, %command, "run_command: called");
    let output = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context(format!("Failed to spawn command for task '{}'", name))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(eyre!("`{}` exited with {}: {}", command, output.status, stderr.trim()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    debug!(%name, stdout = %stdout.trim(), "run_command: succeeded");
    Ok(())
}
