use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::paths;
use crate::translation::ProviderKind;
use crate::ui::Style;

/// Endpoint of the built-in provider used when nothing is configured.
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Name of the built-in provider.
pub const DEFAULT_PROVIDER_NAME: &str = "ollama";

/// Number of models translated at the same time unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Default settings in the `[polytl]` section of config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolytlConfig {
    /// Default provider name.
    pub provider: Option<String>,
    /// Models translated on every run.
    #[serde(default)]
    pub models: Vec<String>,
    /// Default source language (ISO 639-1 code). Omitted means auto-detect.
    pub from: Option<String>,
    /// Default target language (ISO 639-1 code).
    pub to: Option<String>,
    /// Maximum number of models streaming at the same time.
    pub concurrency: Option<usize>,
}

/// Configuration for a translation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Wire protocol spoken by the endpoint.
    #[serde(default)]
    pub kind: ProviderKind,
    /// Base URL of the API endpoint.
    pub endpoint: String,
    /// API key stored directly in config (not recommended).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable name containing the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// List of available models for this provider.
    #[serde(default)]
    pub models: Vec<String>,
}

impl ProviderConfig {
    /// The provider used when no config file exists.
    pub fn builtin_ollama() -> Self {
        Self {
            kind: ProviderKind::Ollama,
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            api_key: None,
            api_key_env: None,
            models: Vec::new(),
        }
    }

    /// Gets the API key, preferring environment variable over config file.
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(env_var) = &self.api_key_env
            && let Ok(key) = std::env::var(env_var)
            && !key.is_empty()
        {
            return Some(key);
        }
        self.api_key.clone()
    }

    /// Returns `true` if this provider requires an API key.
    pub const fn requires_api_key(&self) -> bool {
        self.api_key.is_some() || self.api_key_env.is_some()
    }
}

/// The complete configuration file structure.
///
/// Corresponds to `~/.config/polytl/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Default settings.
    #[serde(default)]
    pub polytl: PolytlConfig,
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl ConfigFile {
    /// Looks up a provider by name, falling back to the built-in Ollama
    /// provider when that name is not configured.
    pub fn provider(&self, name: &str) -> Result<ProviderConfig> {
        if let Some(provider) = self.providers.get(name) {
            return Ok(provider.clone());
        }
        if name == DEFAULT_PROVIDER_NAME {
            return Ok(ProviderConfig::builtin_ollama());
        }

        let mut available: Vec<_> = self.providers.keys().map(String::as_str).collect();
        available.sort_unstable();
        if available.is_empty() {
            bail!(
                "Provider '{name}' not found\n\n\
                 No providers configured. Add providers to ~/.config/polytl/config.toml"
            )
        }
        bail!(
            "Provider '{name}' not found\n\n\
             Available providers:\n  \
             - {}\n\n\
             Add providers to ~/.config/polytl/config.toml",
            available.join("\n  - ")
        )
    }
}

/// One model to translate with, and where to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// The provider name from the config file.
    pub provider_name: String,
    /// Wire protocol of the provider.
    pub kind: ProviderKind,
    /// The API endpoint URL.
    pub endpoint: String,
    /// The model to use for translation.
    pub model: String,
    /// The API key (if required).
    pub api_key: Option<String>,
}

/// Resolved configuration after merging CLI arguments and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Every model to run, in the order given.
    pub targets: Vec<ResolvedTarget>,
    /// The source language code, if not auto-detected.
    pub source_language: Option<String>,
    /// The target language code.
    pub target_language: String,
    /// Maximum number of models streaming at the same time.
    pub concurrency: NonZeroUsize,
}

/// Options for resolving configuration.
///
/// Contains CLI overrides that take precedence over config file values.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Target language code override.
    pub to: Option<String>,
    /// Source language code override.
    pub from: Option<String>,
    /// Provider name override.
    pub provider: Option<String>,
    /// Model overrides. Each entry is `model` or `model@provider`.
    pub models: Vec<String>,
    /// Concurrency override.
    pub concurrency: Option<usize>,
}

/// Resolves the name of the provider used for models without an explicit
/// `@provider` suffix.
///
/// Without a CLI option or config default, a lone configured provider is
/// used, and with none configured the built-in Ollama provider.
pub fn default_provider_name(
    options: &ResolveOptions,
    config_file: &ConfigFile,
) -> Result<String> {
    if let Some(name) = options
        .provider
        .as_ref()
        .or(config_file.polytl.provider.as_ref())
    {
        return Ok(name.clone());
    }

    let mut names = config_file.providers.keys();
    match (names.next(), names.next()) {
        (None, _) => Ok(DEFAULT_PROVIDER_NAME.to_string()),
        (Some(only), None) => Ok(only.clone()),
        _ => bail!(
            "Missing required configuration: 'provider'\n\n\
             Please provide it via:\n  \
             - CLI option: polytl --provider <name>\n  \
             - Config file: ~/.config/polytl/config.toml"
        ),
    }
}

/// Splits `model@provider` into its parts. Ollama model names may contain
/// `:` and OpenAI-style names may contain `/`, so `@` is the separator.
pub fn split_model_spec(spec: &str) -> (&str, Option<&str>) {
    match spec.rsplit_once('@') {
        Some((model, provider)) if !model.is_empty() && !provider.is_empty() => {
            (model, Some(provider))
        }
        _ => (spec, None),
    }
}

/// Resolves configuration by merging CLI options with config file settings.
///
/// CLI options take precedence over config file values.
///
/// # Errors
///
/// Returns an error if required configuration (models, target language)
/// is missing, a provider is not found, or a provider's API key is missing.
pub fn resolve_config(
    options: &ResolveOptions,
    config_file: &ConfigFile,
) -> Result<ResolvedConfig> {
    let default_provider = default_provider_name(options, config_file)?;

    // Resolve models
    let model_specs = if options.models.is_empty() {
        &config_file.polytl.models
    } else {
        &options.models
    };
    if model_specs.is_empty() {
        bail!(
            "Missing required configuration: 'models'\n\n\
             Please provide it via:\n  \
             - CLI option: polytl --model <name> [--model <name> ...]\n  \
             - Config file: ~/.config/polytl/config.toml"
        );
    }

    let mut targets = Vec::with_capacity(model_specs.len());
    for spec in model_specs {
        let (model, provider_override) = split_model_spec(spec);
        let provider_name = provider_override.unwrap_or(&default_provider);
        let provider_config = config_file.provider(provider_name)?;

        // Warn if model is not in provider's models list
        if !provider_config.models.is_empty()
            && !provider_config.models.iter().any(|m| m == model)
        {
            eprintln!(
                "{} Model '{}' is not in the configured models list for '{}'\n\
                 Configured models: {}\n\
                 Proceeding anyway...\n",
                Style::warning("Warning:"),
                model,
                provider_name,
                provider_config.models.join(", ")
            );
        }

        let api_key = provider_config.get_api_key();

        // Check if API key is required but missing
        if provider_config.requires_api_key() && api_key.is_none() {
            let env_var = provider_config.api_key_env.as_deref().unwrap_or("API_KEY");
            bail!(
                "Provider '{provider_name}' requires an API key\n\n\
                 Set the {env_var} environment variable:\n  \
                 export {env_var}=\"your-api-key\"\n\n\
                 Or set api_key in ~/.config/polytl/config.toml"
            );
        }

        targets.push(ResolvedTarget {
            provider_name: provider_name.to_string(),
            kind: provider_config.kind,
            endpoint: provider_config.endpoint.clone(),
            model: model.to_string(),
            api_key,
        });
    }

    // Resolve target language
    let target_language = options
        .to
        .as_ref()
        .or(config_file.polytl.to.as_ref())
        .cloned()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Missing required configuration: 'to' (target language)\n\n\
                 Please provide it via:\n  \
                 - CLI option: polytl --to <lang>\n  \
                 - Config file: ~/.config/polytl/config.toml"
            )
        })?;

    let source_language = options
        .from
        .as_ref()
        .or(config_file.polytl.from.as_ref())
        .cloned();

    let concurrency = options
        .concurrency
        .or(config_file.polytl.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);
    let concurrency = NonZeroUsize::new(concurrency)
        .ok_or_else(|| anyhow::anyhow!("Invalid configuration: 'concurrency' must be at least 1"))?;

    Ok(ResolvedConfig {
        targets,
        source_language,
        target_language,
        concurrency,
    })
}

/// Manages loading configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager.
    ///
    /// Configuration is stored at `$XDG_CONFIG_HOME/polytl/config.toml`
    /// or `~/.config/polytl/config.toml` if `XDG_CONFIG_HOME` is not set.
    pub fn new() -> Self {
        Self {
            config_path: paths::config_file(),
        }
    }

    pub const fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn load(&self) -> Result<ConfigFile> {
        let contents = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config_file: ConfigFile =
            toml::from_str(&contents).with_context(|| "Failed to parse config file")?;

        Ok(config_file)
    }

    /// Loads the config file; a missing file yields the defaults, a broken
    /// one is still an error.
    pub fn load_or_default(&self) -> Result<ConfigFile> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "no config file, using defaults");
            return Ok(ConfigFile::default());
        }
        self.load()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
