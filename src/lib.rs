//! # polytl - translate with several models at once
//!
//! `polytl` sends one text to several language models, streams every
//! model's translation as it arrives, and renders the results as sanitized
//! HTML. Models can live on a local Ollama server or on any
//! OpenAI-compatible service.
//!
//! ## Quick Start
//!
//! ```bash
//! # Compare two local models
//! polytl --to es -m gemma3:12b -m llama3.2 ./notes.md
//!
//! # Mix providers and keep an HTML page of the results
//! cat report.md | polytl --to ja -m gemma3:12b -m gpt-4o-mini@openrouter --html out.html
//!
//! # Render markdown without translating
//! polytl render README.md
//! ```
//!
//! ## Configuration
//!
//! Settings are read from `~/.config/polytl/config.toml`:
//!
//! ```toml
//! [polytl]
//! models = ["gemma3:12b", "llama3.2"]
//! to = "ja"
//! concurrency = 2
//!
//! [providers.openrouter]
//! kind = "openai"
//! endpoint = "https://openrouter.ai/api"
//! api_key_env = "OPENROUTER_API_KEY"
//! ```
//!
//! Without a config file, models are looked up on `http://localhost:11434`.

/// Command-line interface definitions and handlers.
pub mod cli;

/// Configuration file management and provider settings.
pub mod config;

/// File system utilities.
pub mod fs;

/// Input reading from files and stdin.
pub mod input;

/// Global output configuration (quiet mode, colors).
pub mod output;

/// XDG-style configuration paths.
pub mod paths;

/// Markdown rendering and code highlighting.
pub mod render;

/// Streaming translation jobs, wire decoders and scheduling.
pub mod translation;

/// Terminal UI components (spinners, colors).
pub mod ui;

/// Per-model result cards and HTML page output.
pub mod view;
