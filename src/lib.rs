//! # Story Pipeline
//!
//! Turns a short topic into a creative-writing package by calling two LLM
//! providers in sequence:
//!
//! ```text
//! topic ──► outline (OpenAI) ──► story (Gemini) ──► hashtags (OpenAI) ──► StoryPackage
//! ```
//!
//! ## Core Concepts
//!
//! - **[`StoryWriter`]**: owns the three stages and runs them. Any failure
//!   inside [`StoryWriter::create_story`] is logged and turned into `None`.
//! - **[`LlmCall`]**: one stage. Renders its prompt templates, calls the
//!   backend registered for its provider, cleans the reply into text.
//! - **[`Chain`]**: sequential composition; each output feeds the next input.
//! - **[`ExecCtx`]**: shared HTTP client, one endpoint per provider,
//!   template vars, backoff policy and an optional event handler.
//! - **[`Backend`](backend::Backend)**: provider adapter. [`OpenAiBackend`]
//!   and [`GeminiBackend`] speak HTTP; [`MockBackend`] replays scripted
//!   replies for tests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use story_pipeline::report::ConsoleReporter;
//! use story_pipeline::{Credentials, StoryConfig, StoryRequest, StoryWriter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoryConfig::default();
//!     let writer = StoryWriter::new(&config, &Credentials::from_env()?)?
//!         .with_event_handler(Arc::new(ConsoleReporter::new()));
//!
//!     let request = StoryRequest::new("A mysterious island with ancient technology")
//!         .with_genre("science fiction adventure");
//!     match writer.create_story(&request).await {
//!         Some(package) => println!("{}", package.hashtags),
//!         None => eprintln!("story generation failed"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod chain;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod exec_ctx;
pub mod llm_call;
pub mod output_parser;
pub mod payload;
pub mod prompt;
pub mod report;
pub mod templates;
pub mod types;
pub mod writer;

pub use backend::{BackoffConfig, GeminiBackend, MockBackend, MockReply, OpenAiBackend, Provider};
pub use chain::{Chain, ChainRun};
pub use client::LlmConfig;
pub use config::{Credentials, ProviderSettings, StoryConfig};
pub use diagnostics::CallDiagnostics;
pub use error::{PipelineError, Result};
pub use exec_ctx::{ExecCtx, ExecCtxBuilder};
pub use llm_call::LlmCall;
pub use payload::{BoxFut, Payload, PayloadOutput};
pub use types::{StoryPackage, StoryRequest};
pub use writer::StoryWriter;
