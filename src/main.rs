use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> anyhow::Result<ExitCode> {
    servicepages::logging::init().context("init logging")?;

    let cli = servicepages::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        servicepages::cli::Command::Plan(args) => {
            servicepages::plan::run(args).context("plan")?;
        }
        servicepages::cli::Command::Generate(args) => {
            let summary = servicepages::generate::run(args).await.context("generate")?;
            if summary.has_failures() {
                return Ok(ExitCode::FAILURE);
            }
        }
        servicepages::cli::Command::Check(args) => {
            let summary = servicepages::check::run(args).context("check")?;
            if summary.has_failures() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
