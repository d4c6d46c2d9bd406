mod cmd;
mod output;

use autodeploy_core::run_log::{self, RunLog};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Parser)]
#[command(
    name = "autodeploy",
    about = "Deploy the database objects marked `deploy` in configuration.yaml",
    version
)]
struct Cli {
    /// Branch to check out: dev, develop, or a release branch
    #[arg(long)]
    branch: String,

    /// Target environment: dev, tst or prd
    #[arg(long)]
    environment: String,
}

fn main() {
    let cli = Cli::parse();
    let environment = cli.environment.to_lowercase();
    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let log = match RunLog::create(&root, &environment, Local::now()) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("error: cannot create run log: {e}");
            std::process::exit(1);
        }
    };
    let log_path = log.path().to_path_buf();

    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        );
    let subscriber = tracing_subscriber::registry()
        .with(run_log::layer(log.into_writer()))
        .with(stderr);

    let result = tracing::subscriber::with_default(subscriber, || {
        cmd::deploy::run(&root, &cli.branch, &environment, &log_path)
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
