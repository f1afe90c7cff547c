use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use buildwatch::codebuild::{BuildStatusSource, CodeBuildClient};
use buildwatch::config::Config;
use buildwatch::logs::LogFetcher;
use buildwatch::notifications::{BuildReport, EmailNotifier};
use buildwatch::poll::{self, PollConfig, PollOutcome};

#[derive(Parser, Debug)]
#[command(name = "buildwatch")]
#[command(author, version, about = "Watches an AWS CodeBuild build and emails a status report", long_about = None)]
struct Cli {
    /// Check the status once instead of polling until the build finishes
    #[arg(long, env = "BUILDWATCH_ONCE")]
    once: bool,

    /// Skip fetching build logs for the report attachment
    #[arg(long, env = "BUILDWATCH_NO_LOGS")]
    no_logs: bool,

    /// Seconds between status checks while polling
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 30)]
    interval_secs: u64,

    /// Seconds to wait for the build to finish before giving up
    #[arg(long, env = "POLL_TIMEOUT_SECS", default_value_t = 1800)]
    timeout_secs: u64,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = cli.log_level.clone().unwrap_or_else(|| "info".to_string());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        project = %config.project,
        build_id = %config.build_id,
        "Starting buildwatch v{}",
        env!("CARGO_PKG_VERSION")
    );

    if !config.is_monitored() {
        tracing::warn!(
            project = %config.project,
            monitored = %config.monitored_project(),
            "Project is not in the monitored list, nothing to do"
        );
        return Ok(());
    }

    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    let status_client = CodeBuildClient::new(&aws_config);

    let status = if cli.once {
        status_client.build_status(&config.build_id).await?
    } else {
        let poll_config = PollConfig {
            interval: Duration::from_secs(cli.interval_secs),
            timeout: Duration::from_secs(cli.timeout_secs),
        };
        match poll::wait_for_terminal(&status_client, &config.build_id, poll_config).await? {
            PollOutcome::Done(status) => status,
            PollOutcome::TimedOut => anyhow::bail!(
                "build {} still in progress after {}s",
                config.build_id,
                cli.timeout_secs
            ),
        }
    };

    tracing::info!(%status, "Build status resolved");

    let logs = if status.is_terminal() && !cli.no_logs {
        LogFetcher::new(&aws_config)
            .fetch(&config.project, &config.build_id)
            .await
    } else {
        None
    };

    let report = BuildReport::new(
        &config.environment,
        &config.project,
        &config.build_id,
        status,
    );

    // Delivery failure is logged but does not fail the run; the build
    // outcome itself was already resolved and logged above.
    let notifier = EmailNotifier::new(config.email.clone());
    if let Err(e) = notifier.send_report(&report, logs.as_ref()).await {
        tracing::error!(error = %e, "Failed to deliver the report email");
    }

    Ok(())
}
