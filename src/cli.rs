use crate::install::{DEFAULT_AGENT_COMMAND, DEFAULT_PACKAGE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nanobot-boot")]
#[command(
    about = "Container entry point for the nanobot gateway - installs the agent, writes its config from the environment and launches it",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: $HOME/.nanobot/config.json)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Agent command to probe for and launch
    #[arg(long, global = true, default_value = DEFAULT_AGENT_COMMAND)]
    pub agent: String,

    /// Package spec passed to pip when installing the agent
    #[arg(long, global = true, default_value = DEFAULT_PACKAGE)]
    pub package: String,

    /// pip executable used for installation
    #[arg(long, global = true, default_value = "pip")]
    pub pip: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install if needed, write the config and exec the gateway (default)
    Run,

    /// Print the config document synthesized from the environment without writing it
    Render,

    /// Print the gateway command line that `run` would exec
    Args,

    /// Show which provider and API base the gateway will use
    Provider {
        /// Model id (default: agents.defaults.model from the config)
        #[arg(short, long)]
        model: Option<String>,
    },
}
