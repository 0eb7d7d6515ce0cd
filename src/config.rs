//! Runtime configuration document consumed by the nanobot gateway.
//!
//! Keys are camelCase in the JSON file. String leaves are never `null` or
//! missing: absent secrets serialize as `""` so the gateway's parser never
//! hits a missing-key error.

use crate::env::{vars, EnvSnapshot};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Model used when `MODEL` is unset
pub const DEFAULT_MODEL: &str = "anthropic/claude-opus-4-5";

/// Port the gateway listens on when no `--port` is passed
pub const GATEWAY_DEFAULT_PORT: u16 = 18790;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub providers: ProvidersConfig,
    pub agents: AgentsConfig,
    pub channels: ChannelsConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProvidersConfig {
    pub together: ProviderCredentials,
    pub openrouter: ProviderCredentials,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    #[serde(default)]
    pub api_key: String,

    /// Only emitted for providers that take a base URL from the environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentsConfig {
    pub defaults: AgentDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelsConfig {
    pub telegram: ChannelConfig,
    pub whatsapp: ChannelConfig,
}

/// A chat channel entry. `token` and `allow_from` are omitted for channels
/// that take neither from the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Identifiers allowed to talk to the bot, in the order given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_from: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolsConfig {
    pub web: WebToolsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebToolsConfig {
    pub search: WebSearchConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchConfig {
    #[serde(default)]
    pub api_key: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            together: ProviderCredentials {
                api_key: String::new(),
                api_base: Some(String::new()),
            },
            openrouter: ProviderCredentials::default(),
        }
    }
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            telegram: ChannelConfig {
                enabled: true,
                token: Some(String::new()),
                allow_from: Some(Vec::new()),
            },
            whatsapp: ChannelConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Build the document from the environment. Each field has exactly one
    /// source variable (plus the `TOGETHERAI_API_KEY` alias) and a fixed default.
    pub fn from_env(env: &EnvSnapshot) -> Result<Self> {
        let together_key = env
            .raw_non_empty(vars::TOGETHER_API_KEY)
            .or_else(|| env.raw_non_empty(vars::TOGETHERAI_API_KEY))
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            providers: ProvidersConfig {
                together: ProviderCredentials {
                    api_key: together_key,
                    api_base: Some(env.string_or_empty(vars::TOGETHER_API_BASE)),
                },
                openrouter: ProviderCredentials {
                    api_key: env.string_or_empty(vars::OPENROUTER_API_KEY),
                    api_base: None,
                },
            },
            agents: AgentsConfig {
                defaults: AgentDefaults {
                    model: env
                        .non_empty(vars::MODEL)
                        .map(String::from)
                        .unwrap_or_else(default_model),
                },
            },
            channels: ChannelsConfig {
                telegram: ChannelConfig {
                    enabled: env.bool_or(vars::TELEGRAM_ENABLED, true)?,
                    token: Some(env.string_or_empty(vars::TELEGRAM_TOKEN)),
                    allow_from: Some(env.list(vars::TELEGRAM_ALLOW_FROM)),
                },
                whatsapp: ChannelConfig {
                    enabled: env.bool_or(vars::WHATSAPP_ENABLED, false)?,
                    token: None,
                    allow_from: None,
                },
            },
            tools: ToolsConfig {
                web: WebToolsConfig {
                    search: WebSearchConfig {
                        api_key: env.string_or_empty(vars::WEBSEARCH_API_KEY),
                    },
                },
            },
        })
    }

    /// Serialized form written to disk (pretty JSON, trailing newline)
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Provider the gateway will use for `model` (defaults to the configured model)
    pub fn resolve_provider(&self, model: Option<&str>) -> Option<ResolvedProvider<'_>> {
        let model_lower = model
            .unwrap_or(self.agents.defaults.model.as_str())
            .to_lowercase();

        let keyword_match = Provider::ALL.into_iter().find(|p| {
            p.keywords().iter().any(|kw| model_lower.contains(kw))
                && !self.credentials(*p).api_key.is_empty()
        });

        // Fall back to the first provider that has a key, in priority order
        let provider = keyword_match.or_else(|| {
            Provider::ALL
                .into_iter()
                .find(|p| !self.credentials(*p).api_key.is_empty())
        })?;

        let credentials = self.credentials(provider);
        let api_base = credentials
            .api_base
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(provider.default_api_base());

        Some(ResolvedProvider {
            provider,
            api_key: &credentials.api_key,
            api_base,
        })
    }

    pub fn credentials(&self, provider: Provider) -> &ProviderCredentials {
        match provider {
            Provider::OpenRouter => &self.providers.openrouter,
            Provider::Together => &self.providers.together,
        }
    }
}

/// LLM providers that can be provisioned from the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenRouter,
    Together,
}

impl Provider {
    /// Fallback priority order
    pub const ALL: [Provider; 2] = [Provider::OpenRouter, Provider::Together];

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::Together => "together",
        }
    }

    /// Substrings of a model id that select this provider
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::OpenRouter => &["openrouter"],
            Self::Together => &["together"],
        }
    }

    pub fn default_api_base(&self) -> &'static str {
        match self {
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Together => "https://api.together.xyz/v1",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProvider<'a> {
    pub provider: Provider,
    pub api_key: &'a str,
    pub api_base: &'a str,
}

impl ResolvedProvider<'_> {
    /// Key with everything but the last four characters hidden
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }
}
