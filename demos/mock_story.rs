//! Run the story pipeline offline against scripted backends.
//!
//! ```sh
//! cargo run --example mock_story
//! ```

use std::sync::Arc;
use story_pipeline::report::ConsoleReporter;
use story_pipeline::{MockBackend, StoryConfig, StoryRequest, StoryWriter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let openai = MockBackend::new(vec![
        "1. Setting: a lighthouse on a reef that is not on any chart\n\
         2. Characters: Ines, the new keeper; the light itself\n\
         3. Conflict: the beam points somewhere new every night\n\
         4. Plot: a log book, a storm, a ship that answers\n\
         5. Resolution: Ines follows the beam"
            .to_string(),
        "#Lighthouse #Mystery #ShortStory #Ocean #Keeper #WritingCommunity #FlashFiction #Adventure"
            .to_string(),
    ]);
    let gemini = MockBackend::fixed(
        "The light turned before Ines touched the lever. It swung north, then held, \
         as if listening for something past the reef.",
    );

    let writer = StoryWriter::with_backends(
        &StoryConfig::default(),
        Arc::new(openai),
        Arc::new(gemini),
    )?
    .with_event_handler(Arc::new(ConsoleReporter::new()));

    let request = StoryRequest::new("A lighthouse that moves").with_genre("mystery");
    let package = writer.try_create_story(&request).await?;

    println!("{}", serde_json::to_string_pretty(&package)?);
    Ok(())
}
