//! Clean text extraction from LLM responses.
//!
//! Provides [`parse_text`] for extracting clean prose from LLM output,
//! stripping think blocks and common boilerplate prefixes.

use crate::output_parser::error::ParseError;
use crate::output_parser::extract::preprocess;

/// Common boilerplate prefixes that LLMs add to responses.
const SIMPLE_PREFIXES: &[&str] = &[
    "Sure! ",
    "Sure, ",
    "Sure.\n",
    "Of course! ",
    "Of course, ",
    "Of course.\n",
    "Certainly! ",
    "Certainly, ",
    "Certainly.\n",
    "Absolutely! ",
    "Absolutely, ",
];

/// Intro lines of the form "Here's your outline:" that precede the real content.
const LINE_PREFIXES: &[&str] = &["Here's ", "Here is ", "Here are "];

/// Clean an LLM response for use as plain text.
///
/// Processing:
/// 1. Strip `<think>` blocks, unwrap a lone code fence, trim
/// 2. Strip one simple prefix ("Sure! ", "Certainly, ", ...)
/// 3. Otherwise drop a leading "Here's ...:" intro line, but only when
///    something follows it
///
/// Returns the cleaned text or `EmptyResponse` if nothing remains.
///
/// # Examples
///
/// ```
/// use story_pipeline::output_parser::parse_text;
///
/// let result = parse_text("Sure! The tide came in.").unwrap();
/// assert_eq!(result, "The tide came in.");
///
/// let result = parse_text("Here are your hashtags:\n#SciFi #Island").unwrap();
/// assert_eq!(result, "#SciFi #Island");
/// ```
pub fn parse_text(response: &str) -> Result<String, ParseError> {
    let cleaned = preprocess(response);

    if cleaned.is_empty() {
        return Err(ParseError::EmptyResponse);
    }

    let mut text = cleaned.as_str();

    for prefix in SIMPLE_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest;
            break;
        }
    }

    if text.len() == cleaned.len() {
        text = strip_intro_line(text);
    }

    let result = text.trim().to_string();

    if result.is_empty() {
        return Err(ParseError::EmptyResponse);
    }

    Ok(result)
}

/// Clean an LLM response without touching its wording.
///
/// Only [`preprocess`] runs: think blocks go, a lone code fence is unwrapped
/// and the text is trimmed. Use this for prose whose first words belong to
/// the content, such as a story that opens with "Of course, ".
///
/// ```
/// use story_pipeline::output_parser::parse_plain;
///
/// let story = "Of course, the island was never on any map.";
/// assert_eq!(parse_plain(story).unwrap(), story);
/// ```
pub fn parse_plain(response: &str) -> Result<String, ParseError> {
    let cleaned = preprocess(response);
    if cleaned.is_empty() {
        return Err(ParseError::EmptyResponse);
    }
    Ok(cleaned)
}

fn strip_intro_line(text: &str) -> &str {
    let Some((first, rest)) = text.split_once('\n') else {
        return text;
    };
    let is_intro = LINE_PREFIXES.iter().any(|p| first.starts_with(p))
        && first.trim_end().ends_with(':');
    if is_intro && !rest.trim().is_empty() {
        rest.trim_start()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text() {
        assert_eq!(parse_text("The island slept.").unwrap(), "The island slept.");
    }

    #[test]
    fn with_think() {
        assert_eq!(parse_text("<think>reasoning</think>Paris.").unwrap(), "Paris.");
    }

    #[test]
    fn sure_prefix() {
        assert_eq!(
            parse_text("Certainly, the outline follows.").unwrap(),
            "the outline follows."
        );
    }

    #[test]
    fn heres_intro_line() {
        let result = parse_text("Here's a 300-word story based on the outline:\n\nMara woke.").unwrap();
        assert_eq!(result, "Mara woke.");
    }

    #[test]
    fn heres_inside_story_is_kept() {
        let story = "Here's the thing about islands.\nThey keep secrets.";
        assert_eq!(parse_text(story).unwrap(), story);
    }

    #[test]
    fn intro_alone_is_kept() {
        assert_eq!(parse_text("Here is the outline:").unwrap(), "Here is the outline:");
    }

    #[test]
    fn plain_keeps_opening_words() {
        let story = "Here is where it ends:\nThe tide took the lantern.";
        assert_eq!(parse_plain(story).unwrap(), story);
        assert_eq!(
            parse_plain("<think>plan</think>\nSure, Mara said.\n").unwrap(),
            "Sure, Mara said."
        );
        assert!(matches!(parse_plain("  \n"), Err(ParseError::EmptyResponse)));
    }

    #[test]
    fn empty_after_strip() {
        assert!(matches!(
            parse_text("<think>just thinking</think>   "),
            Err(ParseError::EmptyResponse)
        ));
    }
}
