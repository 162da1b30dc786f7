use thiserror::Error;

/// Failure to turn a video reference into transcript text
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("captions provider API key is not configured ({env_var})")]
    MissingApiKey { env_var: &'static str },

    #[error("captions provider unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("no captions available for video {video_id}: {reason}")]
    NoCaptions { video_id: String, reason: String },

    #[error("caption data for video {video_id} contained no text")]
    EmptyText { video_id: String },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Unreachable(_))
    }
}

/// Failure of a chat-completion call
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion API key is not configured ({env_var})")]
    MissingApiKey { env_var: &'static str },

    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("completion API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion API returned no content")]
    EmptyContent,
}

/// Failure of the favorites store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid {what} key: {key:?}")]
    InvalidKey { what: &'static str, key: String },

    #[error("favorites database request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("favorites database returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Failure anywhere in the transcribe/repurpose pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("YouTube URL is required")]
    MissingUrl,

    #[error("Invalid YouTube URL")]
    InvalidUrl,

    #[error("Transcript is required")]
    MissingTranscript,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_fetch_errors_are_not_retryable() {
        let no_captions = FetchError::NoCaptions {
            video_id: "abc".to_string(),
            reason: "disabled".to_string(),
        };
        assert!(!no_captions.is_retryable());
        assert!(!FetchError::EmptyText { video_id: "abc".to_string() }.is_retryable());
        assert!(!FetchError::MissingApiKey { env_var: "RAPIDAPI_KEY" }.is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let e = FetchError::NoCaptions {
            video_id: "abc123".to_string(),
            reason: "provider reported failure".to_string(),
        };
        assert_eq!(e.to_string(), "no captions available for video abc123: provider reported failure");
        assert_eq!(PipelineError::InvalidUrl.to_string(), "Invalid YouTube URL");
        assert_eq!(
            PipelineError::from(CompletionError::EmptyContent).to_string(),
            "completion API returned no content"
        );
    }
}
