use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use zbx_config::cli::Cli;
use zbx_config::controller::{Controller, ModuleRegistry};
use zbx_config::modules::TaskReport;
use zbx_config::telemetry;
use zbx_config::zabbix::ZabbixSession;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    if let Err(e) = telemetry::init_telemetry() {
        eprintln!("Failed to initialize telemetry: {}", e);
    }

    let cli = Cli::parse();

    let reports = match run(&cli).await {
        Ok(reports) => reports,
        Err(e) => vec![TaskReport::failed("zbx-config", &e)],
    };

    match serde_json::to_string_pretty(&reports) {
        Ok(output) => println!("{}", output),
        Err(e) => eprintln!("Failed to serialize results: {}", e),
    }

    if reports.iter().any(TaskReport::is_failed) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run(cli: &Cli) -> Result<Vec<TaskReport>> {
    let config = cli.config()?;
    let connection = config.connection()?;
    let tasks = cli.tasks()?;

    info!("{}, {} task(s)", config, tasks.len());

    let modules = ModuleRegistry::with_default_modules();
    modules.validate(&tasks)?;

    let session = ZabbixSession::open(
        &connection.url,
        &connection.user,
        &connection.password,
        connection.timeout,
    )
    .await
    .context("Failed to open Zabbix session")?;

    let controller = Controller::new(Box::new(session), modules).check_mode(cli.check);
    Ok(controller.run(&tasks).await)
}
