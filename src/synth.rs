//! Config synthesizer: decides whether to write the runtime configuration
//! file and writes it atomically.

use crate::config::RuntimeConfig;
use crate::env::WriteMode;
use crate::error::{BootError, Result};
use crate::strings;
use chrono::{DateTime, Local};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Config file location relative to the home directory
pub const CONFIG_RELATIVE_PATH: &str = ".nanobot/config.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDecision {
    /// Write (or overwrite) the file
    Write(WriteReason),
    /// Leave whatever is on disk untouched
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteReason {
    Forced,
    FirstBoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyExists,
    Disabled,
}

/// Apply the write precedence policy
pub fn decide(mode: WriteMode, exists: bool) -> WriteDecision {
    match mode {
        WriteMode::Always => WriteDecision::Write(WriteReason::Forced),
        WriteMode::Auto if !exists => WriteDecision::Write(WriteReason::FirstBoot),
        WriteMode::Auto => WriteDecision::Skip(SkipReason::AlreadyExists),
        WriteMode::Never => WriteDecision::Skip(SkipReason::Disabled),
    }
}

/// Default config path under `home`
pub fn default_config_path(home: &Path) -> PathBuf {
    home.join(CONFIG_RELATIVE_PATH)
}

/// The persisted configuration file. The bootstrap is its only writer.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<RuntimeConfig> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            BootError::Config(format!(
                "Failed to read config file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        RuntimeConfig::from_json(&content).map_err(|e| {
            BootError::Config(format!(
                "Failed to parse config file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Write the document via a temp file in the same directory, then rename
    /// over the target, so readers never see a partial file.
    pub fn write(&self, config: &RuntimeConfig) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| {
            BootError::Config(format!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            ))
        })?;

        let content = config.to_json()?;
        let write_err = |e: std::io::Error| {
            BootError::Config(format!(
                "Failed to write config file {}: {}",
                self.path.display(),
                e
            ))
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        // Holds API keys
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!("Wrote {} bytes to {}", content.len(), self.path.display());
        Ok(())
    }

    /// Print file metadata and contents. Exposes every secret in the file.
    pub fn dump(&self, out: &mut dyn Write) -> Result<()> {
        let metadata = std::fs::metadata(&self.path)?;
        let modified = metadata
            .modified()
            .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S %z").to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        writeln!(out, "{}", strings::PRINT_CONFIG_BANNER)?;
        writeln!(out, "{}", strings::format_string(strings::DUMP_PATH, &self.path.display()))?;
        writeln!(out, "{}", strings::format_string(strings::DUMP_SIZE, &metadata.len()))?;
        writeln!(
            out,
            "{}",
            strings::format_string(
                strings::DUMP_MODE,
                &format!("{:o}", metadata.permissions().mode() & 0o7777)
            )
        )?;
        writeln!(out, "{}", strings::format_string(strings::DUMP_MODIFIED, &modified))?;
        writeln!(out)?;

        let content = std::fs::read_to_string(&self.path)?;
        out.write_all(content.as_bytes())?;
        if !content.ends_with('\n') {
            writeln!(out)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Apply the write policy against `store`. `build` runs only when the
/// document is going to be written, so its errors cannot block a skip.
pub fn synthesize<F>(mode: WriteMode, build: F, store: &ConfigStore) -> Result<WriteDecision>
where
    F: FnOnce() -> Result<RuntimeConfig>,
{
    let decision = decide(mode, store.exists());
    match decision {
        WriteDecision::Write(reason) => {
            store.write(&build()?)?;
            match reason {
                WriteReason::Forced => info!("Rewrote config at {}", store.path().display()),
                WriteReason::FirstBoot => info!("Created config at {}", store.path().display()),
            }
        }
        WriteDecision::Skip(SkipReason::AlreadyExists) => {
            info!(
                "Keeping existing config at {} (set NANOBOT_WRITE_CONFIG=1 to regenerate)",
                store.path().display()
            );
        }
        WriteDecision::Skip(SkipReason::Disabled) => {
            if store.exists() {
                info!("Config writing disabled, using {}", store.path().display());
            } else {
                warn!(
                    "Config writing disabled and no config at {}; the gateway will start with its own defaults",
                    store.path().display()
                );
            }
        }
    }
    Ok(decision)
}
