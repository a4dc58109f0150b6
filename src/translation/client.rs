use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::pin::Pin;

use super::decoder::{FrameDecoder, NdjsonDecoder, SseDecoder};
use super::error::JobError;
use super::prompt::{build_generate_prompt, build_system_prompt};

/// Raw response body chunks as they come off the wire.
pub type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// The wire protocol a provider speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local generation service: `/api/generate`, NDJSON responses.
    #[default]
    Ollama,
    /// OpenAI-compatible service: `/v1/chat/completions`, SSE responses.
    #[serde(rename = "openai", alias = "openai-compatible")]
    OpenAi,
}

impl ProviderKind {
    /// Creates a fresh decoder for this provider's response bodies.
    pub fn decoder(self) -> Box<dyn FrameDecoder> {
        match self {
            Self::Ollama => Box::new(NdjsonDecoder::new()),
            Self::OpenAi => Box::new(SseDecoder::new()),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => f.write_str("ollama"),
            Self::OpenAi => f.write_str("openai"),
        }
    }
}

/// What to translate, independent of the model it is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub source_text: String,
    /// Human-readable source language; `None` lets the model detect it.
    pub source_language: Option<String>,
    /// Human-readable target language.
    pub target_language: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

// Use Cow to avoid cloning strings that are only borrowed for serialization
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Cow<'a, str>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

/// An entry of `/v1/models`. Context size is not part of the OpenAI schema;
/// several compatible servers add it under one of these names.
#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default, alias = "max_model_len", alias = "context_window")]
    context_length: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ShowRequest<'a> {
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct ShowResponse {
    #[serde(default)]
    model_info: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    parameters: Option<String>,
}

impl ShowResponse {
    /// A `num_ctx` override in the modelfile wins over the architecture's
    /// trained context length.
    fn context_length(&self) -> Option<u64> {
        let num_ctx = self.parameters.as_deref().and_then(|params| {
            params.lines().find_map(|line| {
                let mut parts = line.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some("num_ctx"), Some(value)) => value.parse().ok(),
                    _ => None,
                }
            })
        });

        num_ctx.or_else(|| {
            self.model_info
                .iter()
                .find(|(key, _)| key.ends_with(".context_length"))
                .and_then(|(_, value)| value.as_u64())
        })
    }
}

/// A model as reported by a provider's listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedModel {
    pub name: String,
    pub context_length: Option<u64>,
}

/// HTTP client bound to one provider endpoint.
#[derive(Debug, Clone)]
pub struct TranslationClient {
    client: Client,
    kind: ProviderKind,
    endpoint: String,
    api_key: Option<String>,
}

impl TranslationClient {
    pub fn new(kind: ProviderKind, endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            kind,
            endpoint,
            api_key,
        }
    }

    /// Shares an existing connection pool instead of opening a new one.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub const fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        match (self.kind, path.strip_prefix("/v1")) {
            // Accept endpoints configured either with or without the `/v1` suffix.
            (ProviderKind::OpenAi, Some(rest)) if base.ends_with("/v1") => format!("{base}{rest}"),
            _ => format!("{base}{path}"),
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(api_key) => request.header("Authorization", format!("Bearer {api_key}")),
            None => request,
        }
    }

    /// Sends a streaming translation request and returns the response body.
    ///
    /// Fails with [`JobError::Transport`] when the request cannot be sent or
    /// the server answers with a non-success status.
    pub async fn open_stream(
        &self,
        model: &str,
        request: &TranslationRequest,
    ) -> Result<ByteStream, JobError> {
        let http_request = match self.kind {
            ProviderKind::Ollama => {
                let body = GenerateRequest {
                    model,
                    prompt: build_generate_prompt(
                        request.source_language.as_deref(),
                        &request.target_language,
                        &request.source_text,
                    ),
                    stream: true,
                };
                self.client.post(self.url("/api/generate")).json(&body)
            }
            ProviderKind::OpenAi => {
                let system_prompt = build_system_prompt(
                    request.source_language.as_deref(),
                    &request.target_language,
                );
                let body = ChatCompletionRequest {
                    model,
                    messages: vec![
                        Message {
                            role: "system",
                            content: Cow::Owned(system_prompt),
                        },
                        Message {
                            role: "user",
                            content: Cow::Borrowed(&request.source_text),
                        },
                    ],
                    stream: true,
                };
                self.client
                    .post(self.url("/v1/chat/completions"))
                    .header("Accept", "text/event-stream")
                    .json(&body)
            }
        };

        let response = self
            .authorized(http_request)
            .send()
            .await
            .map_err(|e| JobError::Transport(format!("failed to connect to {}: {e}", self.endpoint)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body = body.trim();
            return Err(JobError::Transport(if body.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {body}")
            }));
        }

        Ok(Box::pin(response.bytes_stream()))
    }

    /// Lists the models the provider serves, sorted by name.
    pub async fn list_models(&self) -> Result<Vec<ListedModel>> {
        let mut models = match self.kind {
            ProviderKind::Ollama => {
                let tags: TagsResponse = self.get_json("/api/tags").await?;
                tags.models
                    .into_iter()
                    .map(|m| ListedModel {
                        name: m.name,
                        context_length: None,
                    })
                    .collect::<Vec<_>>()
            }
            ProviderKind::OpenAi => {
                let listing: ModelsResponse = self.get_json("/v1/models").await?;
                listing
                    .data
                    .into_iter()
                    .map(|m| ListedModel {
                        name: m.id,
                        context_length: m.context_length,
                    })
                    .collect()
            }
        };
        models.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(models)
    }

    /// Reads the context size a local model declares. `None` when the
    /// provider does not report one.
    pub async fn show_context_length(&self, model: &str) -> Result<Option<u64>> {
        let url = self.url("/api/show");
        let response = self
            .authorized(self.client.post(&url).json(&ShowRequest { model }))
            .send()
            .await
            .with_context(|| format!("Failed to connect to API endpoint: {url}"))?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Model details request for '{model}' failed with status {status}");
        }

        let details: ShowResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse model details for '{model}'"))?;
        Ok(details.context_length())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .with_context(|| format!("Unable to fetch models from {}", self.endpoint))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Unable to fetch models from {}. API request failed with status {status}: {body}",
                self.endpoint
            );
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(kind: ProviderKind, endpoint: &str) -> TranslationClient {
        TranslationClient::new(kind, endpoint.to_string(), None)
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let c = client(ProviderKind::Ollama, "http://localhost:11434/");
        assert_eq!(c.url("/api/generate"), "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_url_accepts_v1_suffix() {
        let c = client(ProviderKind::OpenAi, "https://api.example.com/v1");
        assert_eq!(
            c.url("/v1/chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
        let c = client(ProviderKind::OpenAi, "https://openrouter.ai/api");
        assert_eq!(
            c.url("/v1/chat/completions"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_provider_kind_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: ProviderKind,
        }
        let w: Wrapper = toml::from_str("kind = \"openai\"").unwrap();
        assert_eq!(w.kind, ProviderKind::OpenAi);
        let w: Wrapper = toml::from_str("kind = \"openai-compatible\"").unwrap();
        assert_eq!(w.kind, ProviderKind::OpenAi);
        let w: Wrapper = toml::from_str("kind = \"ollama\"").unwrap();
        assert_eq!(w.kind, ProviderKind::Ollama);
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
    }

    #[test]
    fn test_show_response_context_from_model_info() {
        let details: ShowResponse = serde_json::from_str(
            r#"{"model_info":{"general.architecture":"gemma3","gemma3.context_length":131072}}"#,
        )
        .unwrap();
        assert_eq!(details.context_length(), Some(131_072));
    }

    #[test]
    fn test_show_response_num_ctx_parameter_wins() {
        let details: ShowResponse = serde_json::from_str(
            r#"{"parameters":"stop \"<end>\"\nnum_ctx                        8192","model_info":{"llama.context_length":131072}}"#,
        )
        .unwrap();
        assert_eq!(details.context_length(), Some(8192));
    }

    #[test]
    fn test_show_response_without_context() {
        let details: ShowResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(details.context_length(), None);
    }

    #[test]
    fn test_model_entry_context_aliases() {
        let listing: ModelsResponse = serde_json::from_str(
            r#"{"data":[{"id":"a","max_model_len":4096},{"id":"b","context_window":128000},{"id":"c"}]}"#,
        )
        .unwrap();
        let lengths: Vec<_> = listing.data.iter().map(|m| m.context_length).collect();
        assert_eq!(lengths, [Some(4096), Some(128_000), None]);
    }
}
