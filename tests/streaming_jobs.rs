#![allow(clippy::unwrap_used)]
//! End-to-end job tests against mock Ollama and OpenAI-compatible servers.

use futures_util::StreamExt;
use serde_json::json;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use polytl::translation::{
    JobError, JobEvent, JobEvents, JobSpec, JobStatus, ModelCatalog, ProviderKind, Scheduler,
    TranslationClient, TranslationJob, TranslationRequest,
};

const HOLA_NDJSON: &str =
    "{\"response\":\"Hola\"}\n{\"response\":\" mundo\"}\n{\"done\":true}\n";

const BONJOUR_SSE: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Bon\"}}]}\n\n\
                           data: {\"choices\":[{\"delta\":{\"content\":\"jour\"}}]}\n\n\
                           data: [DONE]\n\n";

fn request() -> Arc<TranslationRequest> {
    Arc::new(TranslationRequest {
        source_text: "Hello world".to_string(),
        source_language: Some("English".to_string()),
        target_language: "Spanish".to_string(),
    })
}

fn job(
    kind: ProviderKind,
    server: &MockServer,
    model: &str,
    api_key: Option<&str>,
) -> (TranslationJob, JobEvents) {
    TranslationJob::new(JobSpec {
        client: TranslationClient::new(kind, server.uri(), api_key.map(str::to_string)),
        provider_name: "mock".to_string(),
        model: model.to_string(),
        request: request(),
    })
}

fn ndjson(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/x-ndjson")
}

async fn mount_generate(server: &MockServer, model: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": model, "stream": true })))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ollama_job_streams_partials_then_finishes() {
    let server = MockServer::start().await;
    mount_generate(&server, "gemma3", ndjson(HOLA_NDJSON)).await;

    let (job, events) = job(ProviderKind::Ollama, &server, "gemma3", None);
    let result = job.run(&ModelCatalog::new()).await;
    let events: Vec<JobEvent> = events.collect().await;

    assert_eq!(result.text, "Hola mundo");
    assert_eq!(result.status, JobStatus::Done);
    assert_eq!(
        events,
        vec![
            JobEvent::Streaming,
            JobEvent::Partial {
                text: "Hola".to_string()
            },
            JobEvent::Partial {
                text: "Hola mundo".to_string()
            },
            JobEvent::Finished(result),
        ]
    );
}

#[tokio::test]
async fn test_ollama_prompt_names_both_languages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "prompt": "Translate the following text from English to Spanish. Preserve meaning, lists and punctuation. Return only the translated text.\n\nHello world"
        })))
        .respond_with(ndjson(HOLA_NDJSON))
        .expect(1)
        .mount(&server)
        .await;

    let (job, _events) = job(ProviderKind::Ollama, &server, "gemma3", None);
    assert!(job.run(&ModelCatalog::new()).await.is_done());
}

#[tokio::test]
async fn test_openai_job_sends_bearer_key_and_decodes_sse() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "stream": true })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(BONJOUR_SSE, "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (job, _events) = job(ProviderKind::OpenAi, &server, "gpt-4o-mini", Some("sk-test"));
    let result = job.run(&ModelCatalog::new()).await;

    assert_eq!(result.status, JobStatus::Done);
    assert_eq!(result.text, "Bonjour");
}

#[tokio::test]
async fn test_http_error_status_is_a_transport_failure() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        "gemma3",
        ResponseTemplate::new(500).set_body_string("boom"),
    )
    .await;

    let (job, events) = job(ProviderKind::Ollama, &server, "gemma3", None);
    let result = job.run(&ModelCatalog::new()).await;
    let events: Vec<JobEvent> = events.collect().await;

    match &result.status {
        JobStatus::Failed(JobError::Transport(message)) => {
            assert!(message.contains("500"), "{message}");
            assert!(message.contains("boom"), "{message}");
        }
        other => panic!("unexpected status {other:?}"),
    }
    assert!(result.text.is_empty());
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_upstream_error_frame_is_reported_verbatim() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        "gemma3",
        ndjson("{\"response\":\"Ho\"}\n{\"error\":\"model runner crashed\"}\n{\"response\":\"la\"}\n"),
    )
    .await;

    let (job, _events) = job(ProviderKind::Ollama, &server, "gemma3", None);
    let result = job.run(&ModelCatalog::new()).await;

    assert_eq!(
        result.status,
        JobStatus::Failed(JobError::Upstream("model runner crashed".to_string()))
    );
    assert_eq!(result.text, "Ho");
    assert_eq!(result.display_text(), "Ho\n\nError: model runner crashed");
}

#[tokio::test]
async fn test_truncated_body_is_an_incomplete_stream() {
    let server = MockServer::start().await;
    mount_generate(&server, "gemma3", ndjson("{\"response\":\"a\"}\n{\"resp")).await;

    let (job, _events) = job(ProviderKind::Ollama, &server, "gemma3", None);
    let result = job.run(&ModelCatalog::new()).await;

    assert!(matches!(
        result.status,
        JobStatus::Failed(JobError::IncompleteStream(_))
    ));
    assert_eq!(result.text, "a");
}

#[tokio::test]
async fn test_malformed_frame_is_a_decode_failure() {
    let server = MockServer::start().await;
    mount_generate(&server, "gemma3", ndjson("<html>oops</html>\n")).await;

    let (job, _events) = job(ProviderKind::Ollama, &server, "gemma3", None);
    let result = job.run(&ModelCatalog::new()).await;

    assert!(matches!(result.status, JobStatus::Failed(JobError::Decode(_))));
}

#[tokio::test]
async fn test_scheduler_bounds_concurrency_and_isolates_failures() {
    let server = MockServer::start().await;
    let slow = |body: &str| ndjson(body).set_delay(Duration::from_millis(150));
    mount_generate(&server, "a", slow("{\"response\":\"uno\",\"done\":true}\n")).await;
    mount_generate(&server, "b", ResponseTemplate::new(500)).await;
    mount_generate(&server, "c", slow("{\"response\":\"tres\",\"done\":true}\n")).await;
    mount_generate(&server, "d", slow("{\"response\":\"cuatro\",\"done\":true}\n")).await;

    let jobs: Vec<TranslationJob> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|model| job(ProviderKind::Ollama, &server, model, None).0)
        .collect();
    let scheduler = Scheduler::new(NonZeroUsize::new(2).unwrap());

    let results = scheduler.run(jobs, &ModelCatalog::new()).await;

    let models: Vec<&str> = results.iter().map(|r| r.model.as_str()).collect();
    assert_eq!(models, vec!["a", "b", "c", "d"]);
    assert_eq!(results[0].text, "uno");
    assert!(matches!(
        results[1].status,
        JobStatus::Failed(JobError::Transport(_))
    ));
    assert_eq!(results[2].text, "tres");
    assert_eq!(results[3].text, "cuatro");
    assert!(scheduler.peak_in_flight() <= 2);
    assert_eq!(scheduler.in_flight(), 0);
}

#[tokio::test]
async fn test_catalog_reads_context_sizes_from_both_providers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .and(body_partial_json(json!({ "model": "gemma3" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model_info": { "gemma3.context_length": 131_072, "general.architecture": "gemma3" },
            "parameters": "num_ctx 8192\nstop \"<end>\""
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": "small", "max_model_len": 4096 },
                { "id": "plain" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ollama = TranslationClient::new(ProviderKind::Ollama, server.uri(), None);
    let openai = TranslationClient::new(ProviderKind::OpenAi, server.uri(), None);
    let mut catalog = ModelCatalog::new();
    catalog
        .refresh(&[(&ollama, "gemma3"), (&openai, "small"), (&openai, "plain")])
        .await;

    assert_eq!(catalog.context_length(&server.uri(), "gemma3"), Some(8192));
    assert_eq!(catalog.context_length(&server.uri(), "small"), Some(4096));
    assert_eq!(catalog.context_length(&server.uri(), "plain"), None);
    assert!(catalog.get(&server.uri(), "plain").is_some());
}

#[tokio::test]
async fn test_catalog_ignores_unreachable_lookups() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/show"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let ollama = TranslationClient::new(ProviderKind::Ollama, server.uri(), None);
    let mut catalog = ModelCatalog::new();
    catalog.refresh(&[(&ollama, "missing")]).await;

    assert!(catalog.is_empty());
}

#[tokio::test]
async fn test_list_models_is_sorted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "llama3.2" }, { "name": "gemma3:12b" }]
        })))
        .mount(&server)
        .await;

    let client = TranslationClient::new(ProviderKind::Ollama, server.uri(), None);
    let names: Vec<String> = client
        .list_models()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();

    assert_eq!(names, vec!["gemma3:12b", "llama3.2"]);
}
