//! Model listing command handler.

use anyhow::{Context, Result};

use crate::config::{ConfigManager, ResolveOptions, default_provider_name};
use crate::translation::{ListedModel, TranslationClient};
use crate::ui::{Spinner, Style};

/// Queries a provider for the models it serves and prints them, sorted.
pub async fn print_models(provider: Option<String>) -> Result<()> {
    let config = ConfigManager::new().load_or_default()?;
    let options = ResolveOptions {
        provider,
        ..ResolveOptions::default()
    };
    let name = default_provider_name(&options, &config)?;
    let provider = config.provider(&name)?;

    let client = TranslationClient::new(provider.kind, provider.endpoint.clone(), provider.get_api_key());
    let spinner = Spinner::new(&format!("Fetching models from {name}..."));
    let models = client
        .list_models()
        .await
        .with_context(|| format!("Could not list models of provider '{name}'"))?;
    spinner.stop();

    print!("{}", describe_models(&name, &models));
    Ok(())
}

fn describe_models(provider: &str, models: &[ListedModel]) -> String {
    if models.is_empty() {
        return format!("Provider '{provider}' reports no models.\n");
    }
    let mut out = format!("{}\n\n", Style::header(format!("Models on {provider}:")));
    for model in models {
        out.push_str("  ");
        out.push_str(&Style::value(&model.name));
        if let Some(context) = model.context_length {
            out.push_str(&format!("  {}", Style::secondary(format!("{context} tokens"))));
        }
        out.push('\n');
    }
    out
}
