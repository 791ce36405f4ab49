mod cli;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use cli::{Cli, Command, ResourceArgs};
use rotor::config::RotorConfig;
use rotor::delivery::HttpDeliveryClient;
use rotor::job::{JobPolicy, ResourceSet};
use rotor::logging;
use rotor::orchestrator::Orchestrator;
use ui::JobProgress;

const STATUS_REFRESH: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match &cli.config {
        Some(path) => RotorConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => RotorConfig::load()?,
    };

    match cli.command {
        Command::Run {
            resources,
            delay,
            max_delay,
            delay_on,
            cooldown,
            export_dir,
        } => {
            let mut config = config;
            if export_dir.is_some() {
                config.export_dir = export_dir;
            }
            let resources = load_resources(resources)?;
            let policy = config.job_policy(delay, max_delay, delay_on.into(), cooldown);
            run(&config, resources, policy).await
        }
        Command::Check { resources } => {
            let resources = load_resources(resources)?;
            println!(
                "{} credentials, {} messages, {} targets",
                resources.credentials().len(),
                resources.messages().len(),
                resources.targets().len()
            );
            Ok(())
        }
    }
}

fn load_resources(args: ResourceArgs) -> Result<ResourceSet> {
    let resources = ResourceSet::from_files(
        &args.credentials,
        &args.messages,
        &args.targets,
        args.prefix,
        args.suffix,
    )?;
    Ok(resources)
}

async fn run(config: &RotorConfig, resources: ResourceSet, policy: JobPolicy) -> Result<()> {
    config.require_endpoint()?;
    let client = HttpDeliveryClient::from_config(config)?;
    let orchestrator = Orchestrator::new(Arc::new(client), config.orchestrator_settings());

    let id = orchestrator.start(resources, policy)?;
    info!(job_id = %id, endpoint = %config.endpoint, "running until Ctrl-C");

    let progress = JobProgress::start(id.as_str());
    let mut interval = tokio::time::interval(STATUS_REFRESH);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stop_requested = false;

    let last = loop {
        tokio::select! {
            _ = interval.tick() => {}
            signal = &mut ctrl_c, if !stop_requested => {
                signal.context("failed to listen for Ctrl-C")?;
                stop_requested = true;
                progress.stopping();
                orchestrator.cancel(&id)?;
            }
        }

        let snapshot = orchestrator.query(&id);
        progress.update(&snapshot);
        if snapshot.phase.is_terminal() {
            break snapshot;
        }
    };

    progress.complete(&last);
    orchestrator.shutdown().await;
    Ok(())
}
