use serde::{Deserialize, Serialize};

/// Genre used when the caller does not name one.
pub const DEFAULT_GENRE: &str = "adventure";

/// Input to a story run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRequest {
    /// What the story is about.
    pub topic: String,

    /// Genre steering the outline. Default: `"adventure"`.
    pub genre: String,
}

impl StoryRequest {
    /// Request for `topic` in the default genre.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            genre: DEFAULT_GENRE.to_string(),
        }
    }

    /// Override the genre.
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }
}

/// The finished creative-writing package.
///
/// Assembled once, after all three stages succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPackage {
    /// Topic the run started from.
    pub topic: String,
    /// Genre the outline was written for.
    pub genre: String,
    /// Structured outline from the first stage.
    pub outline: String,
    /// Story text from the second stage.
    pub story: String,
    /// Single line of hashtags from the third stage.
    pub hashtags: String,
}

impl StoryPackage {
    /// Individual `#tag` tokens from the hashtag line, in order.
    ///
    /// ```
    /// use story_pipeline::StoryPackage;
    ///
    /// let pkg = StoryPackage {
    ///     topic: "t".into(),
    ///     genre: "g".into(),
    ///     outline: "o".into(),
    ///     story: "s".into(),
    ///     hashtags: "#SciFi, #Island and #Adventure".into(),
    /// };
    /// assert_eq!(pkg.hashtag_list(), vec!["#SciFi", "#Island", "#Adventure"]);
    /// ```
    pub fn hashtag_list(&self) -> Vec<&str> {
        self.hashtags
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| t.starts_with('#') && t.len() > 1)
            .collect()
    }

    /// Number of whitespace-separated words in the story.
    pub fn story_words(&self) -> usize {
        word_count(&self.story)
    }
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(hashtags: &str) -> StoryPackage {
        StoryPackage {
            topic: "A mysterious island".into(),
            genre: DEFAULT_GENRE.into(),
            outline: "1. Setting".into(),
            story: "The tide  turned\nat dawn.".into(),
            hashtags: hashtags.into(),
        }
    }

    #[test]
    fn test_request_defaults_to_adventure() {
        let req = StoryRequest::new("A mysterious island");
        assert_eq!(req.genre, "adventure");
        assert_eq!(req.with_genre("noir").genre, "noir");
    }

    #[test]
    fn test_hashtag_list_ignores_plain_words() {
        let pkg = package("Tags: #Island #Mystery # #ShortStory");
        assert_eq!(pkg.hashtag_list(), vec!["#Island", "#Mystery", "#ShortStory"]);
    }

    #[test]
    fn test_story_words() {
        assert_eq!(package("#a").story_words(), 5);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn test_package_serializes_all_fields() {
        let value = serde_json::to_value(package("#a")).unwrap();
        for key in ["topic", "genre", "outline", "story", "hashtags"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
