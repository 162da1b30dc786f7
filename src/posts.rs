use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest post accepted, in characters
pub const MAX_POST_CHARS: usize = 280;

static NUMBER_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("number prefix pattern"));

/// A short-form post produced by repurposing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Post {
    pub id: String,
    pub text: String,
}

impl Post {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
        }
    }
}

/// Split a model reply into post texts.
///
/// One candidate per line, a leading `N.` prefix stripped, trimmed. Empty lines
/// and lines over [`MAX_POST_CHARS`] are dropped; order is kept and duplicates
/// are not removed.
pub fn parse_posts(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(|line| NUMBER_PREFIX.replace(line, "").trim().to_string())
        .filter(|post| !post.is_empty() && post.chars().count() <= MAX_POST_CHARS)
        .collect()
}
