use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tenderwatch_common::{Config, SubscriberTask};
use tenderwatch_pipeline::run::{Pipeline, TaskState};
use tenderwatch_pipeline::schedule::Schedule;
use tenderwatch_pipeline::sender::DryRunSender;

/// Subscribers state their preferences in Czech local time; the scheduler
/// feeds tasks on the same convention.
const LOCAL_UTC_OFFSET_HOURS: i64 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "tenderwatch",
    about = "Fetch, score and deliver one subscriber's tender digest"
)]
struct Args {
    /// Path to the subscriber task JSON.
    #[arg(long, conflicts_with = "task_json")]
    task_file: Option<PathBuf>,

    /// Subscriber task JSON, inline.
    #[arg(long)]
    task_json: Option<String>,

    /// Compose the digest but skip delivery.
    #[arg(long)]
    dry_run: bool,

    /// Exit without running when the task's notification frequency says
    /// no digest is due this hour.
    #[arg(long)]
    respect_schedule: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("tenderwatch_pipeline=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let raw = match (&args.task_file, &args.task_json) {
        (Some(path), None) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read task file {}", path.display()))?,
        (None, Some(json)) => json.clone(),
        _ => bail!("Provide exactly one of --task-file or --task-json"),
    };
    let task: SubscriberTask =
        serde_json::from_str(&raw).context("Task JSON does not match the expected shape")?;

    if args.respect_schedule {
        if let Some(preference) = &task.notification_frequency {
            let schedule = Schedule::parse(preference);
            let local_now = chrono::Utc::now().naive_utc()
                + chrono::Duration::hours(LOCAL_UTC_OFFSET_HOURS);
            if !schedule.is_empty() && !schedule.is_due(local_now) {
                println!("No digest due for this hour ({preference}), skipping run");
                return Ok(());
            }
        }
    }

    let config = Config::from_env();
    config.log_redacted();

    let mut pipeline = Pipeline::from_config(&config);
    if args.dry_run {
        pipeline = pipeline.with_sender(Box::new(DryRunSender));
    }

    let report = pipeline.run(&task).await?;
    println!("{report}");

    match report.state {
        TaskState::Done => Ok(()),
        TaskState::Failed(stage) => bail!("Task failed in the {stage} stage"),
    }
}
