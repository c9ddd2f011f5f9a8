//! story-writer: topic in, outline + story + hashtags out.
//!
//! Reads `OPENAI_API_KEY` and `GOOGLE_API_KEY` from the environment (a
//! `.env` file is loaded first if present) and prints each stage as it
//! completes.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use story_pipeline::report::ConsoleReporter;
use story_pipeline::{Credentials, StoryConfig, StoryRequest, StoryWriter};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_TOPIC: &str = "A mysterious island with ancient technology";
const DEFAULT_GENRE: &str = "science fiction adventure";

/// Command-line arguments for the story writer.
#[derive(Parser, Debug)]
#[command(name = "story-writer")]
#[command(about = "Generate a story outline, a short story and hashtags from a topic")]
#[command(version)]
struct Args {
    /// What the story is about
    #[arg(default_value = DEFAULT_TOPIC)]
    topic: String,

    /// Genre steering the outline
    #[arg(short, long, default_value = DEFAULT_GENRE)]
    genre: String,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "STORY_WRITER_CONFIG")]
    config: Option<PathBuf>,

    /// Print the finished package as JSON instead of a summary
    #[arg(long)]
    json: bool,

    /// Do not print stage output while the pipeline runs
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = StoryConfig::load(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "invalid default configuration".to_string(),
    })?;
    info!(
        openai_model = %config.openai.model,
        gemini_model = %config.gemini.model,
        word_target = config.word_target,
        "configuration loaded"
    );

    let credentials = Credentials::from_env()?;
    let mut writer = StoryWriter::new(&config, &credentials)?;
    if !args.quiet && !args.json {
        writer = writer.with_event_handler(Arc::new(ConsoleReporter::new()));
        println!("Starting story generation for topic: '{}'", args.topic);
    }

    let request = StoryRequest::new(args.topic).with_genre(args.genre);
    let Some(package) = writer.create_story(&request).await else {
        anyhow::bail!("story generation failed");
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&package)?);
    } else {
        println!("{}", "=".repeat(50));
        println!("STORY CREATION COMPLETE!");
        println!("{}", "=".repeat(50));
        println!("Topic: {}", package.topic);
        println!("Genre: {}", package.genre);
        println!("Story length: {} words", package.story_words());
        println!("Hashtags: {}", package.hashtags);
    }

    Ok(())
}
