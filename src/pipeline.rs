use log::{debug, info};

use crate::completion::ChatClient;
use crate::config::CAPTIONS_KEY_ENV;
use crate::error::{FetchError, PipelineError};
use crate::extract_video_id;
use crate::posts::{Post, parse_posts};
use crate::retry::{RetryPolicy, retry};
use crate::youtube::CaptionsClient;

/// The transcribe and repurpose flows, with their clients injected
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub captions: CaptionsClient,
    pub chat: ChatClient,
    pub retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(captions: CaptionsClient, chat: ChatClient, retry: RetryPolicy) -> Self {
        Self { captions, chat, retry }
    }

    /// URL → video id → captions (with retries) → refined transcript
    pub async fn transcribe(&self, url: &str) -> Result<String, PipelineError> {
        // Checked up front so a configuration error is never retried
        if !self.captions.has_api_key() {
            return Err(FetchError::MissingApiKey {
                env_var: CAPTIONS_KEY_ENV,
            }
            .into());
        }

        let url = url.trim();
        if url.is_empty() {
            return Err(PipelineError::MissingUrl);
        }

        let video = extract_video_id(url).ok_or(PipelineError::InvalidUrl)?;
        info!("Transcribing video {video}");

        let raw = retry(&self.retry, || self.captions.fetch_transcript(&video)).await?;
        debug!("Raw transcript for {video}: {} chars", raw.len());

        let refined = self.chat.refine(&raw).await?;
        info!("Refined transcript for {video}: {} chars", refined.len());
        Ok(refined)
    }

    /// Split a transcript into short posts, in the order the model wrote them
    pub async fn repurpose(&self, transcript: &str) -> Result<Vec<Post>, PipelineError> {
        if transcript.trim().is_empty() {
            return Err(PipelineError::MissingTranscript);
        }

        let reply = self.chat.repurpose(transcript).await?;
        let posts: Vec<Post> = parse_posts(&reply).into_iter().map(Post::new).collect();
        info!("Repurposed transcript into {} posts", posts.len());
        Ok(posts)
    }
}
