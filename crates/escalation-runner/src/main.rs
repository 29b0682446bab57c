use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use escalation_coordination::{CoordinatorConfig, ResolvedBy};
use escalation_runner::{run_scenario, telemetry, Scenario};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file; environment overrides still apply
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Trigger one escalation and follow it until it ends
    Simulate {
        #[arg(long, default_value = "user-1")]
        subject: String,

        #[arg(long, default_value = "health_critical")]
        kind: String,

        #[arg(long, default_value = "")]
        value: String,

        #[arg(long, default_value = "")]
        measurement_ref: String,

        /// Guardian to page at stage 2 (repeatable)
        #[arg(long = "guardian")]
        guardians: Vec<String>,

        /// Recipient whose deliveries should fail (repeatable)
        #[arg(long = "fail-recipient")]
        fail_recipients: Vec<String>,

        /// Acknowledge after this many seconds
        #[arg(long)]
        ack_after: Option<f64>,

        /// Who acknowledges: user, guardian or operator
        #[arg(long, default_value = "guardian")]
        resolved_by: String,
    },

    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init(args.json_logs);

    let config = CoordinatorConfig::load(args.config.as_deref())
        .context("failed to load coordinator configuration")?;

    match args.command {
        Command::ShowConfig => {
            let text = toml::to_string_pretty(&config).context("failed to render config")?;
            println!("{}", text);
        }
        Command::Simulate {
            subject,
            kind,
            value,
            measurement_ref,
            guardians,
            fail_recipients,
            ack_after,
            resolved_by,
        } => {
            let resolved_by: ResolvedBy = resolved_by
                .parse()
                .context("invalid --resolved-by")?;
            let ack_after = ack_after
                .map(Duration::try_from_secs_f64)
                .transpose()
                .context("invalid --ack-after")?;

            info!(
                delays = ?config.policy.delays(),
                subject = %subject,
                "Escalation rehearsal starting"
            );

            let report = run_scenario(
                config,
                Scenario {
                    subject_id: subject,
                    alert_kind: kind,
                    measurement_ref,
                    value,
                    guardians,
                    fail_recipients,
                    ack_after,
                    resolved_by,
                },
            )
            .await
            .context("escalation rehearsal failed")?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
