use log::debug;
use serde::Deserialize;

use crate::config::CAPTIONS_KEY_ENV;
use crate::error::FetchError;
use crate::{TranscriptSegment, VideoReference, join_segments};

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    transcript: Option<CaptionPayload>,
    #[serde(default)]
    message: Option<String>,
}

/// The provider either inlines segments or points at a timed-text track
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CaptionPayload {
    Segments(Vec<TranscriptSegment>),
    TrackUrl(String),
}

/// Client for the RapidAPI youtube-transcript3 captions provider
#[derive(Debug, Clone)]
pub struct CaptionsClient {
    http: reqwest::Client,
    base_url: String,
    host: String,
    api_key: Option<String>,
}

impl CaptionsClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        host: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            host: host.into(),
            api_key,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch the caption track for `video` and normalize it into one string
    pub async fn fetch_transcript(&self, video: &VideoReference) -> Result<String, FetchError> {
        let api_key = self.api_key.as_deref().ok_or(FetchError::MissingApiKey {
            env_var: CAPTIONS_KEY_ENV,
        })?;

        let url = format!("{}/api/transcript", self.base_url);
        debug!("Fetching transcript for video {video} from {url}");

        let resp: TranscriptResponse = self
            .http
            .get(&url)
            .query(&[("videoId", video.as_str())])
            .header("x-rapidapi-key", api_key)
            .header("x-rapidapi-host", &self.host)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| body_error(video, e))?;

        let payload = match resp {
            TranscriptResponse { success: Some(false), message, .. } => {
                let reason = message.unwrap_or_else(|| "provider reported failure".to_string());
                return Err(no_captions(video, reason));
            }
            TranscriptResponse { transcript: None, .. } => {
                return Err(no_captions(video, "no transcript in response".to_string()));
            }
            TranscriptResponse { transcript: Some(payload), .. } => payload,
        };

        let text = match payload {
            CaptionPayload::Segments(segments) => {
                debug!("Provider returned {} segments", segments.len());
                join_segments(segments.iter().map(|s| s.text.as_str()))
            }
            CaptionPayload::TrackUrl(track_url) => {
                debug!("Provider returned caption track URL, fetching {track_url}");
                let xml = self
                    .http
                    .get(&track_url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                let segments = parse_caption_xml(&xml).map_err(|reason| no_captions(video, reason))?;
                join_segments(segments.iter().map(|s| s.text.as_str()))
            }
        };

        if text.is_empty() {
            return Err(FetchError::EmptyText {
                video_id: video.to_string(),
            });
        }

        debug!("Fetched transcript for {video}: {} chars", text.len());
        Ok(text)
    }
}

fn no_captions(video: &VideoReference, reason: String) -> FetchError {
    FetchError::NoCaptions {
        video_id: video.to_string(),
        reason,
    }
}

/// A body that arrived but is not a transcript response is permanent; a body
/// cut off in transit is not
fn body_error(video: &VideoReference, e: reqwest::Error) -> FetchError {
    if e.is_decode() {
        no_captions(video, format!("undecodable response: {e}"))
    } else {
        FetchError::Unreachable(e)
    }
}

/// Extract `<text start dur>` cues from a timed-text track, tags stripped
fn parse_caption_xml(xml: &str) -> Result<Vec<TranscriptSegment>, String> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<TranscriptSegment> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut segment = TranscriptSegment::default();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value);
                    match attr.key.as_ref() {
                        b"start" => segment.offset = value.parse().unwrap_or_default(),
                        b"dur" => segment.duration = value.parse().unwrap_or_default(),
                        _ => {}
                    }
                }
                current = Some(segment);
            }
            Ok(Event::Text(ref e)) => {
                // Inline markup inside a cue (<font>, <i>) splits its text into pieces
                if let Some(segment) = current.as_mut() {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text);
                    if text.trim().is_empty() {
                        continue;
                    }
                    if !segment.text.is_empty() {
                        segment.text.push(' ');
                    }
                    segment.text.push_str(text.trim());
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                if let Some(segment) = current.take().filter(|s| !s.text.is_empty()) {
                    segments.push(segment);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("error parsing caption XML: {e}")),
            _ => {}
        }
    }

    Ok(segments)
}
