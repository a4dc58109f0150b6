//! Configuration file management and provider settings.

mod manager;

pub use manager::{
    ConfigFile, ConfigManager, DEFAULT_CONCURRENCY, DEFAULT_OLLAMA_ENDPOINT,
    DEFAULT_PROVIDER_NAME, PolytlConfig, ProviderConfig, ResolveOptions, ResolvedConfig,
    ResolvedTarget, default_provider_name, resolve_config, split_model_spec,
};
