//! One model's translation: request, stream, accumulate, report.
//!
//! A job reports through its own channel: any number of
//! [`JobEvent::Partial`] notifications, each carrying the full text so far,
//! followed by exactly one [`JobEvent::Finished`].

use futures::channel::mpsc;
use futures_util::{Stream, StreamExt};
use std::sync::Arc;

use super::catalog::ModelCatalog;
use super::client::{TranslationClient, TranslationRequest};
use super::decoder::{StreamEvent, decode_events};
use super::error::JobError;

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Created, request not yet answered.
    Pending,
    /// Response body is being decoded.
    Streaming,
    /// Finished cleanly; the text is complete.
    Done,
    /// Finished with an error; the text holds whatever arrived before it.
    Failed(JobError),
}

impl JobStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// The observable outcome of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub model: String,
    pub provider: String,
    pub text: String,
    pub status: JobStatus,
}

impl JobResult {
    /// A result for a job that has not started yet.
    pub fn pending(model: &str, provider: &str) -> Self {
        Self {
            model: model.to_string(),
            provider: provider.to_string(),
            text: String::new(),
            status: JobStatus::Pending,
        }
    }

    pub const fn is_done(&self) -> bool {
        matches!(self.status, JobStatus::Done)
    }

    pub const fn error(&self) -> Option<&JobError> {
        match &self.status {
            JobStatus::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Text to show in place of the translation: the translation itself, or
    /// an inline error note for failed jobs.
    pub fn display_text(&self) -> String {
        match self.error() {
            None => self.text.clone(),
            Some(err) if self.text.is_empty() => format!("Error: {err}"),
            Some(err) => format!("{}\n\nError: {err}", self.text),
        }
    }
}

/// Notification sent on a job's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// The response body opened; increments follow.
    Streaming,
    /// Cumulative text after a new increment arrived.
    Partial { text: String },
    /// The terminal result. Always the last event.
    Finished(JobResult),
}

/// Receiving half of a job's notification channel.
pub type JobEvents = mpsc::UnboundedReceiver<JobEvent>;

/// Everything a job needs to run.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub client: TranslationClient,
    pub provider_name: String,
    pub model: String,
    pub request: Arc<TranslationRequest>,
}

/// A streaming translation against a single model.
pub struct TranslationJob {
    spec: JobSpec,
    events: mpsc::UnboundedSender<JobEvent>,
}

/// Rough token estimate used only for the context-size warning.
pub fn estimated_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

impl TranslationJob {
    pub fn new(spec: JobSpec) -> (Self, JobEvents) {
        let (events, receiver) = mpsc::unbounded();
        (Self { spec, events }, receiver)
    }

    pub fn model(&self) -> &str {
        &self.spec.model
    }

    /// Runs the job to a terminal state. Never fails: every error becomes
    /// [`JobStatus::Failed`] on the returned result.
    pub async fn run(self, catalog: &ModelCatalog) -> JobResult {
        let spec = &self.spec;
        let mut result = JobResult::pending(&spec.model, &spec.provider_name);
        self.check_context(catalog);

        tracing::debug!(model = %spec.model, provider = %spec.provider_name, "requesting");
        let body = match spec.client.open_stream(&spec.model, &spec.request).await {
            Ok(body) => body,
            Err(err) => return self.finish(result, Err(err)),
        };

        result.status = JobStatus::Streaming;
        self.notify(JobEvent::Streaming);
        let outcome = self.consume(body, &mut result.text).await;
        self.finish(result, outcome)
    }

    /// Decodes `body`, appending increments to `text` and publishing each
    /// new cumulative text. Stops at the first terminal event.
    async fn consume<S, E>(&self, body: S, text: &mut String) -> Result<(), JobError>
    where
        S: Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let events = decode_events(body, self.spec.client.kind().decoder());
        let mut events = std::pin::pin!(events);

        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Content(increment) => {
                    text.push_str(&increment);
                    self.notify(JobEvent::Partial { text: text.clone() });
                }
                StreamEvent::Error(message) => return Err(JobError::Upstream(message)),
                StreamEvent::Done => return Ok(()),
            }
        }
        Ok(())
    }

    fn finish(&self, mut result: JobResult, outcome: Result<(), JobError>) -> JobResult {
        match outcome {
            Ok(()) => {
                result.status = JobStatus::Done;
                tracing::info!(model = %result.model, chars = result.text.len(), "translation done");
            }
            Err(err) => {
                tracing::info!(model = %result.model, error = %err, "translation failed");
                result.status = JobStatus::Failed(err);
            }
        }
        self.notify(JobEvent::Finished(result.clone()));
        result
    }

    fn notify(&self, event: JobEvent) {
        // Nobody listening is fine; the result is also returned from `run`.
        let _ = self.events.unbounded_send(event);
    }

    fn check_context(&self, catalog: &ModelCatalog) {
        let spec = &self.spec;
        let Some(limit) = catalog.context_length(spec.client.endpoint(), &spec.model) else {
            return;
        };
        let estimate = estimated_tokens(&spec.request.source_text);
        if estimate > limit {
            tracing::warn!(
                model = %spec.model,
                estimated_tokens = estimate,
                context_length = limit,
                "input likely exceeds the model's context window"
            );
        }
    }
}
