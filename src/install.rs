use crate::env::InstallFlags;
use crate::error::{BootError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Default agent command looked up on PATH
pub const DEFAULT_AGENT_COMMAND: &str = "nanobot";

/// Default package spec handed to pip
pub const DEFAULT_PACKAGE: &str = "nanobot-ai";

/// Checks whether a command is available in the execution environment
pub trait CommandProbe: Send + Sync {
    fn is_present(&self, command: &str) -> bool;
}

/// Looks the command up on PATH
pub struct PathProbe;

impl CommandProbe for PathProbe {
    fn is_present(&self, command: &str) -> bool {
        match which::which(command) {
            Ok(path) => {
                debug!("Found {} at {}", command, path.display());
                true
            }
            Err(_) => false,
        }
    }
}

#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Install the agent package. `upgrade` replaces an already installed version.
    async fn install(&self, upgrade: bool) -> Result<()>;
}

/// Installs the agent package with pip
pub struct PipInstaller {
    pip: String,
    package: String,
}

impl PipInstaller {
    pub fn new(pip: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            pip: pip.into(),
            package: package.into(),
        }
    }

    fn build_install_args(&self, upgrade: bool) -> Vec<String> {
        let mut args = vec!["install".to_string(), "--no-cache-dir".to_string()];
        if upgrade {
            args.push("--upgrade".to_string());
        }
        args.push(self.package.clone());
        args
    }
}

impl Default for PipInstaller {
    fn default() -> Self {
        Self::new("pip", DEFAULT_PACKAGE)
    }
}

#[async_trait]
impl PackageInstaller for PipInstaller {
    async fn install(&self, upgrade: bool) -> Result<()> {
        let args = self.build_install_args(upgrade);
        info!("Installing {} with {}", self.package, self.pip);
        debug!("Running: {} {:?}", self.pip, args);

        // Output goes straight to the container log
        let status = Command::new(&self.pip)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| BootError::InstallFailed(format!("Failed to execute {}: {}", self.pip, e)))?;

        if !status.success() {
            return Err(BootError::InstallFailed(format!(
                "{} install {} exited with {}",
                self.pip, self.package, status
            )));
        }

        info!("Installed {}", self.package);
        Ok(())
    }
}

/// Decide whether the agent package must be installed before launch.
///
/// `NANOBOT_SKIP_INSTALL=1` wins over everything, then `NANOBOT_FORCE_INSTALL=1`,
/// then the presence probe.
pub fn should_install(flags: &InstallFlags, probe: &dyn CommandProbe, command: &str) -> bool {
    if flags.skip {
        debug!("Install skipped by NANOBOT_SKIP_INSTALL");
        return false;
    }
    if flags.force {
        debug!("Install forced by NANOBOT_FORCE_INSTALL");
        return true;
    }
    let present = probe.is_present(command);
    if present {
        debug!("{} already installed", command);
    }
    !present
}

/// Run the install gate and, when it opens, the installer. Installer failure is fatal.
pub async fn ensure_installed(
    flags: &InstallFlags,
    probe: &dyn CommandProbe,
    installer: &dyn PackageInstaller,
    command: &str,
) -> Result<bool> {
    if !should_install(flags, probe, command) {
        return Ok(false);
    }
    installer.install(flags.force).await?;
    Ok(true)
}
