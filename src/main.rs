use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};
use clap::Parser;

use daily_log::config::JobConfig;
use daily_log::dates;
use daily_log::job::{DailyLogJob, Phase};

#[derive(Parser, Debug)]
#[command(name = "daily-log", version, about = "Build, store and mail the daily log")]
struct Cli {
    /// Phases to run.
    #[arg(long, value_enum, default_value_t = Phase::All)]
    phase: Phase,

    /// JST date to process (YYYY-MM-DD). Defaults to yesterday in JST.
    #[arg(long, value_parser = parse_date_arg)]
    date: Option<NaiveDate>,
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    dates::parse_date(value).ok_or_else(|| format!("expected YYYY-MM-DD, got {value:?}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        bail!("Failed to install rustls crypto provider");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let target_date = cli.date.unwrap_or_else(|| dates::default_target_date(Utc::now()));

    let config = JobConfig::from_env(cli.phase).context("Failed to load configuration")?;
    tracing::info!(
        phase = ?cli.phase,
        target_date = %target_date,
        run_id = %config.run_id,
        "Daily log job starting"
    );

    let job = DailyLogJob::from_config(&config);
    let report = job.run(cli.phase, target_date).await?;

    if let Some(outcome) = report.publish {
        tracing::info!(?outcome, "Publish finished");
    }
    Ok(())
}
