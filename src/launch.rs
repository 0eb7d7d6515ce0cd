use crate::config::GATEWAY_DEFAULT_PORT;
use crate::env::LaunchSettings;
use crate::error::{BootError, Result};
use std::convert::Infallible;
use std::os::unix::process::CommandExt;
use std::process::Command;
use tracing::{debug, info};

/// Agent subcommand that starts the long-running gateway
pub const GATEWAY_SUBCOMMAND: &str = "gateway";

/// Gateway launch arguments: `--port <N>` first (if any), then `--verbose` (if any).
pub fn build_args(settings: &LaunchSettings) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(port) = &settings.port {
        args.push("--port".to_string());
        args.push(port.clone());
    }

    if settings.verbose {
        args.push("--verbose".to_string());
    }

    args
}

/// Fully resolved gateway invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl GatewayCommand {
    pub fn new(program: impl Into<String>, settings: &LaunchSettings) -> Self {
        let mut args = vec![GATEWAY_SUBCOMMAND.to_string()];
        args.extend(build_args(settings));
        Self {
            program: program.into(),
            args,
        }
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// Replace the current process with the gateway. Only returns on failure.
    pub fn exec(&self) -> Result<Infallible> {
        if !self.args.iter().any(|a| a == "--port") {
            debug!("No port configured, gateway will use {}", GATEWAY_DEFAULT_PORT);
        }
        info!("Launching: {}", self.argv().join(" "));

        let err = Command::new(&self.program).args(&self.args).exec();
        Err(BootError::Launch(format!("{}: {}", self.program, err)))
    }
}
