//! Console output for a story run.

use crate::backend::Provider;
use crate::events::{Event, EventHandler};
use crate::writer::{STAGE_HASHTAGS, STAGE_OUTLINE, STAGE_STORY};

const RULE_WIDTH: usize = 50;

/// Prints each stage's text to stdout as soon as it is produced.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// Create a reporter.
    pub fn new() -> Self {
        Self
    }
}

impl EventHandler for ConsoleReporter {
    fn on_event(&self, event: Event) {
        match event {
            Event::PayloadStart { name, kind: "llm-call" } => {
                println!("{}...", progress_line(&name));
            }
            Event::Output {
                name,
                provider,
                text,
            } => print!("{}", render_stage(&name, provider, &text)),
            _ => {}
        }
    }
}

fn stage_title(name: &str) -> String {
    match name {
        STAGE_OUTLINE => "STORY OUTLINE".to_string(),
        STAGE_STORY => "GENERATED STORY".to_string(),
        STAGE_HASHTAGS => "SOCIAL MEDIA HASHTAGS".to_string(),
        other => other.to_uppercase(),
    }
}

fn progress_line(name: &str) -> String {
    match name {
        STAGE_OUTLINE => "Creating story outline".to_string(),
        STAGE_STORY => "Writing story".to_string(),
        STAGE_HASHTAGS => "Generating hashtags".to_string(),
        other => format!("Running {other}"),
    }
}

/// Banner, rule, text and a trailing blank line for one stage.
pub fn render_stage(name: &str, provider: Provider, text: &str) -> String {
    format!(
        "\n{} ({})\n{}\n{}\n\n",
        stage_title(name),
        provider,
        "=".repeat(RULE_WIDTH),
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_stage_layout() {
        let out = render_stage(STAGE_HASHTAGS, Provider::OpenAi, "#Island #Mystery");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "SOCIAL MEDIA HASHTAGS (OpenAI)");
        assert_eq!(lines[2], "=".repeat(50));
        assert_eq!(lines[3], "#Island #Mystery");
        assert!(out.ends_with("\n\n"));
    }

    #[test]
    fn test_unknown_stage_title_is_uppercased() {
        assert_eq!(stage_title("epilogue"), "EPILOGUE");
        assert_eq!(progress_line(STAGE_STORY), "Writing story");
    }
}
