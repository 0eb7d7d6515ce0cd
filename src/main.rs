mod bootstrap;
mod cli;
mod config;
mod env;
mod error;
mod install;
mod launch;
mod strings;
mod synth;

use bootstrap::{Bootstrap, BootstrapBuilder};
use clap::Parser;
use cli::{Cli, Commands};
use env::{BootSettings, EnvSnapshot};
use install::PipInstaller;
use std::io::Write;
use synth::ConfigStore;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "nanobot_boot=debug,info"
    } else {
        "nanobot_boot=info"
    };

    // stderr keeps stdout clean for render/args/config dumps
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> error::Result<()> {
    let env = EnvSnapshot::capture();
    let settings = BootSettings::from_env(&env)?;

    let bootstrap = BootstrapBuilder::new(settings)
        .config_path(cli.config)
        .agent_command(cli.agent)
        .installer(Box::new(PipInstaller::new(cli.pip, cli.package)))
        .build()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let command = bootstrap.prepare(&mut std::io::stdout()).await?;
            // Only returns if exec failed
            let never = command.exec()?;
            match never {}
        }

        Commands::Render => {
            let json = bootstrap.settings().runtime_config()?.to_json()?;
            let mut stdout = std::io::stdout();
            stdout.write_all(json.as_bytes())?;
            stdout.flush()?;
        }

        Commands::Args => {
            println!("{}", bootstrap.gateway_command().argv().join(" "));
        }

        Commands::Provider { model } => {
            show_provider(&bootstrap, model.as_deref())?;
        }
    }

    Ok(())
}

/// Resolve against the file on disk if there is one, else against what `run` would write
fn show_provider(bootstrap: &Bootstrap, model: Option<&str>) -> error::Result<()> {
    let store: &ConfigStore = bootstrap.store();
    let config = if store.exists() {
        info!("Reading {}", store.path().display());
        store.load()?
    } else {
        info!(
            "{} does not exist, using the configuration synthesized from the environment",
            store.path().display()
        );
        bootstrap.settings().runtime_config()?
    };

    let model = model.unwrap_or(config.agents.defaults.model.as_str()).to_string();
    println!("{}", strings::format_string(strings::PROVIDER_MODEL, &model));

    match config.resolve_provider(Some(&model)) {
        Some(resolved) => {
            println!(
                "{}",
                strings::format_string(strings::PROVIDER_RESOLVED, &resolved.provider.name())
            );
            println!("{}", strings::format_string(strings::PROVIDER_BASE, &resolved.api_base));
            println!("{}", strings::format_string(strings::PROVIDER_KEY, &resolved.masked_key()));
        }
        None => {
            println!("{}", strings::format_string(strings::PROVIDER_NONE, &model));
        }
    }

    Ok(())
}
