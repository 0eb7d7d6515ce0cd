//! Environment reader.
//!
//! The process environment is captured once into an [`EnvSnapshot`] and then
//! validated into [`BootSettings`]. Everything downstream consumes typed values;
//! nothing else in the crate calls `std::env::var` for bootstrap inputs.

use crate::config::RuntimeConfig;
use crate::error::{BootError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Names of every environment variable the bootstrap recognizes.
pub mod vars {
    pub const SKIP_INSTALL: &str = "NANOBOT_SKIP_INSTALL";
    pub const FORCE_INSTALL: &str = "NANOBOT_FORCE_INSTALL";
    pub const WRITE_CONFIG: &str = "NANOBOT_WRITE_CONFIG";
    pub const PRINT_CONFIG: &str = "NANOBOT_PRINT_CONFIG";
    pub const NANOBOT_PORT: &str = "NANOBOT_PORT";
    pub const PORT: &str = "PORT";
    pub const VERBOSE: &str = "NANOBOT_VERBOSE";

    pub const TOGETHER_API_KEY: &str = "TOGETHER_API_KEY";
    pub const TOGETHERAI_API_KEY: &str = "TOGETHERAI_API_KEY";
    pub const TOGETHER_API_BASE: &str = "TOGETHER_API_BASE";
    pub const OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
    pub const MODEL: &str = "MODEL";
    pub const TELEGRAM_ENABLED: &str = "TELEGRAM_ENABLED";
    pub const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
    pub const TELEGRAM_ALLOW_FROM: &str = "TELEGRAM_ALLOW_FROM";
    pub const WHATSAPP_ENABLED: &str = "WHATSAPP_ENABLED";
    pub const WEBSEARCH_API_KEY: &str = "WEBSEARCH_API_KEY";

    pub const HOME: &str = "HOME";
}

/// Immutable view of the environment, read once at startup
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment. Variables whose name or value
    /// is not valid UTF-8 are skipped.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    #[cfg(test)]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value, if present (may be empty)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Trimmed value, treating an empty or whitespace-only value as unset
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Untrimmed value, treating an empty or whitespace-only value as unset
    pub fn raw_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    /// Value exactly as given, or the empty string. Used for secrets, which are
    /// written as "" when absent.
    pub fn string_or_empty(&self, name: &str) -> String {
        self.raw_non_empty(name).unwrap_or_default().to_string()
    }

    /// True only for the exact value "1"
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).map(str::trim) == Some("1")
    }

    /// Parse a boolean variable, falling back to `default` when unset or empty
    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool> {
        let Some(raw) = self.non_empty(name) else {
            return Ok(default);
        };
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(BootError::Config(format!(
                "Invalid boolean '{}' for {}. Expected one of: true, false, 1, 0, yes, no",
                raw, name
            ))),
        }
    }

    /// Comma-separated list, see [`split_allow_list`]
    pub fn list(&self, name: &str) -> Vec<String> {
        self.get(name).map(split_allow_list).unwrap_or_default()
    }
}

/// Split a comma-separated value into trimmed, non-empty entries, preserving order.
pub fn split_allow_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Config file write policy (`NANOBOT_WRITE_CONFIG`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Always (re)write, overwriting an existing file
    Always,
    /// Write only when no file exists yet
    Auto,
    /// Never write
    Never,
}

impl WriteMode {
    pub fn parse(raw: Option<&str>) -> Self {
        let value = raw.map(str::trim).unwrap_or_default();
        match value {
            "1" | "true" | "yes" => Self::Always,
            "" | "auto" => Self::Auto,
            "0" | "false" | "no" => Self::Never,
            other => {
                warn!(
                    "Unrecognized {} value '{}'; configuration will not be written. \
                     Use 1/true/yes to force a rewrite or auto for first-boot only",
                    vars::WRITE_CONFIG,
                    other
                );
                Self::Never
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallFlags {
    pub skip: bool,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchSettings {
    /// Validated port, kept as the trimmed literal from the environment
    pub port: Option<String>,
    pub verbose: bool,
}

/// Typed bootstrap inputs, validated once from an [`EnvSnapshot`].
///
/// The config document is not built here: a bad channel flag only matters
/// when the document is actually written or rendered.
#[derive(Debug, Clone)]
pub struct BootSettings {
    pub install: InstallFlags,
    pub write_mode: WriteMode,
    pub print_config: bool,
    pub launch: LaunchSettings,
    pub home: Option<PathBuf>,
    env: EnvSnapshot,
}

impl BootSettings {
    pub fn from_env(env: &EnvSnapshot) -> Result<Self> {
        let settings = Self {
            install: InstallFlags {
                skip: env.flag(vars::SKIP_INSTALL),
                force: env.flag(vars::FORCE_INSTALL),
            },
            write_mode: WriteMode::parse(env.get(vars::WRITE_CONFIG)),
            print_config: env.flag(vars::PRINT_CONFIG),
            launch: LaunchSettings {
                port: resolve_port(env)?,
                verbose: env.flag(vars::VERBOSE),
            },
            home: env.non_empty(vars::HOME).map(PathBuf::from),
            env: env.clone(),
        };
        debug!(
            "Boot settings: install={:?} write_mode={:?} print_config={} launch={:?}",
            settings.install, settings.write_mode, settings.print_config, settings.launch
        );
        Ok(settings)
    }

    /// Config document derived from the captured environment
    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        RuntimeConfig::from_env(&self.env)
    }
}

/// `NANOBOT_PORT` wins over `PORT`; only the winning variable is validated.
fn resolve_port(env: &EnvSnapshot) -> Result<Option<String>> {
    for name in [vars::NANOBOT_PORT, vars::PORT] {
        if let Some(raw) = env.non_empty(name) {
            return parse_port(name, raw).map(Some);
        }
    }
    Ok(None)
}

fn parse_port(name: &str, raw: &str) -> Result<String> {
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(raw.to_string()),
        _ => Err(BootError::Config(format!(
            "Invalid port '{}' in {}. Expected a number between 1 and 65535",
            raw, name
        ))),
    }
}
