//! Streaming translation against one or more models.
//!
//! A [`TranslationJob`] sends one request to one model and decodes the
//! streamed reply; a [`Scheduler`] runs many jobs with bounded concurrency.

mod catalog;
mod client;
pub mod decoder;
mod error;
mod job;
mod language;
mod prompt;
mod scheduler;

pub use catalog::{ModelCatalog, ModelInfo};
pub use client::{ByteStream, ListedModel, ProviderKind, TranslationClient, TranslationRequest};
pub use error::{DecodeError, JobError};
pub use job::{
    JobEvent, JobEvents, JobResult, JobSpec, JobStatus, TranslationJob, estimated_tokens,
};
pub use language::{SUPPORTED_LANGUAGES, language_name, print_languages, validate_language};
pub use scheduler::Scheduler;
