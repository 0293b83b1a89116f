use std::path::{Path, PathBuf};
use std::process::ExitCode;

use agentprobe_core::config::{AgentDefaults, TestConfig, DEFAULT_THRESHOLD};
use agentprobe_core::engine::{run_stress, QaRunner, StressInput};
use agentprobe_core::http::HttpClient;
use agentprobe_core::results::export::{write_csv, write_json};
use agentprobe_core::results::import::read_test_cases;
use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agentprobe")]
#[command(about = "Load and QA testing for chat agent webhooks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fire N concurrent requests at a webhook and report latency statistics
    Stress {
        #[arg(long)]
        url: String,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long, default_value = "10")]
        concurrency: u32,

        #[arg(long)]
        message: Option<String>,

        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run a CSV of questions through the agent and judge every answer
    Qa {
        /// CSV with a question column and an optional expected-answer column
        #[arg(long)]
        cases: PathBuf,

        #[arg(long, env = "LANGFLOW_API_URL")]
        api_url: Option<String>,

        #[arg(long, env = "LANGFLOW_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        #[arg(long, env = "BEARER_TOKEN", hide_env_values = true)]
        bearer_token: Option<String>,

        /// Minimum success rate (0-100) for the run to pass
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,

        #[arg(long)]
        skip_validation: bool,

        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also export results as CSV (defaults to test-results-<date>.csv)
        #[arg(long, num_args = 0..=1)]
        csv: Option<Option<PathBuf>>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("global tracing subscriber already set");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let client = HttpClient::new().context("building HTTP client")?;

    match cli.command {
        Commands::Stress {
            url,
            api_key,
            concurrency,
            message,
            output,
        } => {
            let plan = StressInput {
                webhook_url: Some(url),
                api_key,
                concurrency: Some(concurrency.into()),
                message,
            }
            .into_plan()?;

            eprintln!("Starting load run:");
            eprintln!("  Webhook: {}", plan.webhook_url);
            eprintln!("  Concurrency: {}", plan.concurrency);
            eprintln!();

            let report = run_stress(&client, &plan).await;
            let s = &report.stats;
            eprintln!(
                "{} requests: {} ok, {} errors | avg {} ms, min {} ms, max {} ms, p95 {} ms",
                s.total, s.success, s.errors, s.avg_latency_ms, s.min_latency_ms, s.max_latency_ms, s.p95_latency_ms
            );

            emit(&report, output.as_deref()).await?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Qa {
            cases,
            api_url,
            api_key,
            bearer_token,
            threshold,
            skip_validation,
            output,
            csv,
        } => {
            let defaults = AgentDefaults::from_env().context("reading agent defaults")?;
            let resolved = TestConfig {
                api_url,
                api_key,
                bearer_token,
                threshold: Some(threshold),
                skip_validation: Some(skip_validation),
            }
            .resolve(&defaults)?;

            let test_cases = read_test_cases(&cases)
                .await
                .with_context(|| format!("reading test cases from {}", cases.display()))?;

            eprintln!("Running {} test cases against {}", test_cases.len(), resolved.target.url);

            let report = QaRunner::new(client, resolved.target)
                .skip_validation(resolved.skip_validation)
                .run(&test_cases, resolved.threshold)
                .await;

            let m = &report.metrics;
            eprintln!(
                "{} cases: {} pass, {} fail, {} error, {} skip | success rate {}% (threshold {}%) | avg {} ms",
                m.total, m.success, m.failed, m.errors, m.skipped, m.success_rate, m.threshold, m.avg_latency_ms
            );

            if let Some(csv_path) = csv {
                let path = csv_path.unwrap_or_else(default_csv_path);
                write_csv(&report.results, &path)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                eprintln!("CSV saved to: {}", path.display());
            }

            emit(&report, output.as_deref()).await?;

            if report.metrics.passed {
                eprintln!("PASSED");
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("FAILED");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn default_csv_path() -> PathBuf {
    PathBuf::from(format!(
        "test-results-{}.csv",
        chrono::Local::now().format("%Y-%m-%d")
    ))
}

/// Write `report` as JSON to `output`, or pretty-print it to stdout.
async fn emit<T: Serialize>(report: &T, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            write_json(report, path)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Results saved to: {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}
