//! Per-model metadata looked up once before any translation starts.
//!
//! The catalog is filled by [`ModelCatalog::refresh`] and then only read,
//! by reference, while jobs run.

use std::collections::{HashMap, HashSet};

use super::client::{ProviderKind, TranslationClient};

/// What is known about one model on one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    /// Declared context window in tokens, when the provider reports one.
    pub context_length: Option<u64>,
}

/// Lookup table keyed by endpoint and model name.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    entries: HashMap<(String, String), ModelInfo>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, endpoint: &str, info: ModelInfo) {
        self.entries
            .insert((endpoint.to_string(), info.name.clone()), info);
    }

    pub fn get(&self, endpoint: &str, model: &str) -> Option<&ModelInfo> {
        self.entries.get(&(endpoint.to_string(), model.to_string()))
    }

    pub fn context_length(&self, endpoint: &str, model: &str) -> Option<u64> {
        self.get(endpoint, model).and_then(|info| info.context_length)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the context size of every `(client, model)` pair.
    ///
    /// Lookups are best-effort: a provider that cannot be reached or does
    /// not report a size leaves its models without an entry, and the job
    /// itself will surface any real connection problem.
    pub async fn refresh(&mut self, targets: &[(&TranslationClient, &str)]) {
        let mut listed_endpoints = HashSet::new();

        for (client, model) in targets {
            match client.kind() {
                ProviderKind::Ollama => match client.show_context_length(model).await {
                    Ok(context_length) => self.insert(
                        client.endpoint(),
                        ModelInfo {
                            name: (*model).to_string(),
                            context_length,
                        },
                    ),
                    Err(err) => {
                        tracing::debug!(model, error = %err, "context size lookup failed");
                    }
                },
                ProviderKind::OpenAi => {
                    if !listed_endpoints.insert(client.endpoint().to_string()) {
                        continue;
                    }
                    match client.list_models().await {
                        Ok(models) => {
                            for listed in models {
                                self.insert(
                                    client.endpoint(),
                                    ModelInfo {
                                        name: listed.name,
                                        context_length: listed.context_length,
                                    },
                                );
                            }
                        }
                        Err(err) => {
                            tracing::debug!(endpoint = client.endpoint(), error = %err, "model listing failed");
                        }
                    }
                }
            }
        }

        tracing::debug!(entries = self.len(), "model catalog refreshed");
    }
}
