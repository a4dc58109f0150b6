//! Provider listing command handler.

use anyhow::Result;
use std::fmt::Write as _;

use crate::config::{
    ConfigFile, ConfigManager, DEFAULT_PROVIDER_NAME, ProviderConfig, ResolveOptions,
    default_provider_name,
};
use crate::ui::Style;

/// Prints configured providers to stdout.
///
/// With `specific_provider`, shows the details of that provider only.
pub fn print_providers(specific_provider: Option<&str>) -> Result<()> {
    let config = ConfigManager::new().load_or_default()?;
    print!("{}", describe_providers(&config, specific_provider)?);
    Ok(())
}

fn describe_providers(config: &ConfigFile, specific_provider: Option<&str>) -> Result<String> {
    let default_provider = default_provider_name(&ResolveOptions::default(), config).ok();
    let marker = |name: &str| {
        if default_provider.as_deref() == Some(name) {
            format!(" {}", Style::default_marker())
        } else {
            String::new()
        }
    };

    let mut out = String::new();

    if let Some(name) = specific_provider {
        let provider = config.provider(name)?;
        let _ = writeln!(out, "{}{}", Style::header(name), marker(name));
        describe_one(&mut out, &provider);
        return Ok(out);
    }

    if config.providers.is_empty() {
        let _ = writeln!(out, "{}\n", Style::header("No providers configured, using the built-in one:"));
        let _ = writeln!(out, "  {}{}", Style::value(DEFAULT_PROVIDER_NAME), marker(DEFAULT_PROVIDER_NAME));
        describe_one(&mut out, &ProviderConfig::builtin_ollama());
        let _ = writeln!(out, "\n{}", Style::hint("Add providers to ~/.config/polytl/config.toml"));
        return Ok(out);
    }

    let _ = writeln!(out, "{}\n", Style::header("Configured providers:"));
    let mut names: Vec<_> = config.providers.keys().collect();
    names.sort();
    for name in names {
        let _ = writeln!(out, "  {}{}", Style::value(name), marker(name));
        describe_one(&mut out, &config.providers[name]);
    }
    Ok(out)
}

fn describe_one(out: &mut String, provider: &ProviderConfig) {
    let _ = writeln!(out, "    {} {}", Style::label("kind:    "), provider.kind);
    let _ = writeln!(
        out,
        "    {} {}",
        Style::label("endpoint:"),
        Style::secondary(&provider.endpoint)
    );
    if provider.requires_api_key() {
        let state = if provider.get_api_key().is_some() {
            Style::success("(set)")
        } else {
            Style::warning("(not set)")
        };
        let _ = writeln!(out, "    {} {state}", Style::label("api key: "));
    }
    if !provider.models.is_empty() {
        let _ = writeln!(
            out,
            "    {} {}",
            Style::label("models:  "),
            provider.models.join(", ")
        );
    }
}
