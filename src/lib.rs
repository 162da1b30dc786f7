pub mod completion;
pub mod config;
pub mod error;
pub mod favorites;
pub mod pipeline;
pub mod posts;
pub mod retry;
pub mod server;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Recognized URL shapes, tried in order. The first non-empty capture wins.
static VIDEO_ID_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&\n?#]+)").expect("watch pattern"),
        Regex::new(r"youtube\.com/embed/([^&\n?#]+)").expect("embed pattern"),
        Regex::new(r"youtube\.com/v/([^&\n?#]+)").expect("v pattern"),
    ]
});

/// A video identifier extracted from a recognized YouTube URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoReference(String);

impl VideoReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VideoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single captioned segment as the captions provider returns it
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranscriptSegment {
    pub text: String,
    pub offset: f64,
    pub duration: f64,
}

/// Join segment texts into one normalized transcript string.
///
/// Texts are joined with single spaces, whitespace runs collapse to one space
/// and the result is trimmed.
pub fn join_segments<'a, I>(texts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    texts
        .into_iter()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract video ID from various YouTube URL formats
pub fn extract_video_id(input: &str) -> Option<VideoReference> {
    VIDEO_ID_PATTERNS.iter().find_map(|re| {
        re.captures(input)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|id| !id.is_empty())
            .map(|id| VideoReference(id.to_string()))
    })
}
