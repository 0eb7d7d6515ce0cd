use crate::env::BootSettings;
use crate::error::{BootError, Result};
use crate::install::{self, CommandProbe, PackageInstaller, PathProbe, PipInstaller, DEFAULT_AGENT_COMMAND};
use crate::launch::GatewayCommand;
use crate::synth::{self, ConfigStore};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Runs the bootstrap sequence: install gate, config synthesis, argument build.
/// Each step completes before the next one starts.
pub struct Bootstrap {
    settings: BootSettings,
    store: ConfigStore,
    agent_command: String,
    probe: Box<dyn CommandProbe>,
    installer: Box<dyn PackageInstaller>,
}

impl Bootstrap {
    pub fn settings(&self) -> &BootSettings {
        &self.settings
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Gateway invocation for the current settings (pure)
    pub fn gateway_command(&self) -> GatewayCommand {
        GatewayCommand::new(&self.agent_command, &self.settings.launch)
    }

    /// Run every step up to (not including) the exec. The config dump, when
    /// enabled, is written to `out`.
    pub async fn prepare(&self, out: &mut dyn Write) -> Result<GatewayCommand> {
        install::ensure_installed(
            &self.settings.install,
            &*self.probe,
            &*self.installer,
            &self.agent_command,
        )
        .await?;

        synth::synthesize(
            self.settings.write_mode,
            || self.settings.runtime_config(),
            &self.store,
        )?;

        if self.settings.print_config {
            if self.store.exists() {
                self.store.dump(out)?;
            } else {
                warn!(
                    "NANOBOT_PRINT_CONFIG=1 but {} does not exist",
                    self.store.path().display()
                );
            }
        }

        let command = self.gateway_command();
        info!("Bootstrap complete");
        Ok(command)
    }
}

/// Explicit path wins; otherwise `$HOME/.nanobot/config.json`
pub fn resolve_config_path(explicit: Option<&Path>, home: Option<&Path>) -> Result<PathBuf> {
    match (explicit, home) {
        (Some(path), _) => Ok(path.to_path_buf()),
        (None, Some(home)) => Ok(synth::default_config_path(home)),
        (None, None) => Err(BootError::Config(
            "HOME environment variable not set; pass --config to choose the config path".to_string(),
        )),
    }
}

/// Builder for [`Bootstrap`]
pub struct BootstrapBuilder {
    settings: BootSettings,
    config_path: Option<PathBuf>,
    agent_command: String,
    probe: Box<dyn CommandProbe>,
    installer: Box<dyn PackageInstaller>,
}

impl BootstrapBuilder {
    pub fn new(settings: BootSettings) -> Self {
        Self {
            settings,
            config_path: None,
            agent_command: DEFAULT_AGENT_COMMAND.to_string(),
            probe: Box::new(PathProbe),
            installer: Box::new(PipInstaller::default()),
        }
    }

    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn agent_command(mut self, command: impl Into<String>) -> Self {
        self.agent_command = command.into();
        self
    }

    #[cfg(test)]
    pub fn probe(mut self, probe: Box<dyn CommandProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn installer(mut self, installer: Box<dyn PackageInstaller>) -> Self {
        self.installer = installer;
        self
    }

    pub fn build(self) -> Result<Bootstrap> {
        let path = resolve_config_path(self.config_path.as_deref(), self.settings.home.as_deref())?;
        Ok(Bootstrap {
            settings: self.settings,
            store: ConfigStore::new(path),
            agent_command: self.agent_command,
            probe: self.probe,
            installer: self.installer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvSnapshot;
    use crate::install::tests::{FakeInstaller, FakeProbe};
    use crate::strings;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn settings(pairs: &[(&str, &str)]) -> BootSettings {
        BootSettings::from_env(&EnvSnapshot::from_pairs(pairs.iter().copied())).unwrap()
    }

    struct SharedInstaller(Arc<FakeInstaller>);

    #[async_trait::async_trait]
    impl PackageInstaller for SharedInstaller {
        async fn install(&self, upgrade: bool) -> Result<()> {
            self.0.install(upgrade).await
        }
    }

    #[test]
    fn test_resolve_config_path() {
        assert_eq!(
            resolve_config_path(Some(Path::new("/etc/nanobot.json")), Some(Path::new("/root"))).unwrap(),
            PathBuf::from("/etc/nanobot.json")
        );
        assert_eq!(
            resolve_config_path(None, Some(Path::new("/root"))).unwrap(),
            PathBuf::from("/root/.nanobot/config.json")
        );
        assert!(matches!(
            resolve_config_path(None, None),
            Err(BootError::Config(_))
        ));
    }

    #[test]
    fn test_builder_uses_home() {
        let bootstrap = BootstrapBuilder::new(settings(&[("HOME", "/home/bot")]))
            .build()
            .unwrap();
        assert_eq!(
            bootstrap.store().path(),
            Path::new("/home/bot/.nanobot/config.json")
        );
        assert_eq!(bootstrap.gateway_command().argv(), vec!["nanobot", "gateway"]);
    }

    #[tokio::test]
    async fn test_prepare_first_boot() {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path().to_str().unwrap().to_string();
        let installer = Arc::new(FakeInstaller::default());

        let bootstrap = BootstrapBuilder::new(settings(&[
            ("HOME", home.as_str()),
            ("NANOBOT_PORT", "9000"),
            ("PORT", "3000"),
            ("NANOBOT_VERBOSE", "1"),
            ("TELEGRAM_ALLOW_FROM", "123, 456,,789"),
        ]))
        .probe(Box::new(FakeProbe(false)))
        .installer(Box::new(SharedInstaller(installer.clone())))
        .build()
        .unwrap();

        let mut out = Vec::new();
        let command = bootstrap.prepare(&mut out).await.unwrap();

        assert_eq!(installer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            command.argv(),
            vec!["nanobot", "gateway", "--port", "9000", "--verbose"]
        );
        let config = bootstrap.store().load().unwrap();
        assert_eq!(
            config.channels.telegram.allow_from,
            Some(vec!["123".to_string(), "456".to_string(), "789".to_string()])
        );
        // Nothing printed unless NANOBOT_PRINT_CONFIG=1
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_prepare_skip_install_and_keep_existing_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{}\n").unwrap();
        let installer = Arc::new(FakeInstaller::default());

        let bootstrap = BootstrapBuilder::new(settings(&[
            ("NANOBOT_SKIP_INSTALL", "1"),
            ("NANOBOT_FORCE_INSTALL", "1"),
            ("OPENROUTER_API_KEY", "or-key"),
        ]))
        .config_path(Some(path.clone()))
        .probe(Box::new(FakeProbe(false)))
        .installer(Box::new(SharedInstaller(installer.clone())))
        .build()
        .unwrap();

        let mut out = Vec::new();
        let command = bootstrap.prepare(&mut out).await.unwrap();

        assert_eq!(installer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
        assert_eq!(command.argv(), vec!["nanobot", "gateway"]);
    }

    #[tokio::test]
    async fn test_prepare_ignores_bad_channel_flag_when_not_writing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let bootstrap = BootstrapBuilder::new(settings(&[
            ("NANOBOT_WRITE_CONFIG", "0"),
            ("TELEGRAM_ENABLED", "enabled"),
        ]))
        .config_path(Some(path.clone()))
        .probe(Box::new(FakeProbe(true)))
        .installer(Box::new(FakeInstaller::default()))
        .build()
        .unwrap();

        bootstrap.prepare(&mut Vec::new()).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_prepare_auto_with_existing_file_ignores_bad_channel_flag() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{}\n").unwrap();

        let bootstrap = BootstrapBuilder::new(settings(&[("WHATSAPP_ENABLED", "sometimes")]))
            .config_path(Some(path.clone()))
            .probe(Box::new(FakeProbe(true)))
            .installer(Box::new(FakeInstaller::default()))
            .build()
            .unwrap();

        bootstrap.prepare(&mut Vec::new()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[tokio::test]
    async fn test_prepare_rejects_bad_channel_flag_on_first_boot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let bootstrap = BootstrapBuilder::new(settings(&[("TELEGRAM_ENABLED", "enabled")]))
            .config_path(Some(path.clone()))
            .probe(Box::new(FakeProbe(true)))
            .installer(Box::new(FakeInstaller::default()))
            .build()
            .unwrap();

        let result = bootstrap.prepare(&mut Vec::new()).await;
        assert!(matches!(result, Err(BootError::Config(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_prepare_passes_port_literal_through() {
        let temp_dir = TempDir::new().unwrap();

        let bootstrap = BootstrapBuilder::new(settings(&[("NANOBOT_PORT", "09000")]))
            .config_path(Some(temp_dir.path().join("config.json")))
            .probe(Box::new(FakeProbe(true)))
            .installer(Box::new(FakeInstaller::default()))
            .build()
            .unwrap();

        let command = bootstrap.prepare(&mut Vec::new()).await.unwrap();
        assert_eq!(command.argv(), vec!["nanobot", "gateway", "--port", "09000"]);
    }

    #[tokio::test]
    async fn test_prepare_install_failure_aborts_before_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let bootstrap = BootstrapBuilder::new(settings(&[]))
            .config_path(Some(path.clone()))
            .probe(Box::new(FakeProbe(false)))
            .installer(Box::new(FakeInstaller {
                fail: true,
                ..Default::default()
            }))
            .build()
            .unwrap();

        let result = bootstrap.prepare(&mut Vec::new()).await;

        assert!(matches!(result, Err(BootError::InstallFailed(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_prepare_prints_config_when_requested() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let bootstrap = BootstrapBuilder::new(settings(&[
            ("NANOBOT_PRINT_CONFIG", "1"),
            ("TELEGRAM_TOKEN", "bot-token"),
        ]))
        .config_path(Some(path))
        .probe(Box::new(FakeProbe(true)))
        .installer(Box::new(FakeInstaller::default()))
        .build()
        .unwrap();

        let mut out = Vec::new();
        bootstrap.prepare(&mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with(strings::PRINT_CONFIG_BANNER));
        assert!(text.contains("bot-token"));
    }

    #[tokio::test]
    async fn test_prepare_print_config_without_file() {
        let temp_dir = TempDir::new().unwrap();

        let bootstrap = BootstrapBuilder::new(settings(&[
            ("NANOBOT_PRINT_CONFIG", "1"),
            ("NANOBOT_WRITE_CONFIG", "0"),
        ]))
        .config_path(Some(temp_dir.path().join("config.json")))
        .probe(Box::new(FakeProbe(true)))
        .installer(Box::new(FakeInstaller::default()))
        .build()
        .unwrap();

        let mut out = Vec::new();
        bootstrap.prepare(&mut out).await.unwrap();
        assert!(out.is_empty());
    }
}
