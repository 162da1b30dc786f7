//! HTTP surface: `/transcribe`, `/repurpose` and `/favorites`.
//!
//! Every failure is logged here and turned into a `{message, error?}` JSON body.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::error::{CompletionError, FetchError, PipelineError, StoreError};
use crate::favorites::{FavoriteEntry, FavoritePost, FavoritesStore};
use crate::pipeline::Pipeline;
use crate::posts::Post;

const FETCH_FAILED_MESSAGE: &str =
    "Unable to fetch transcript. This video might not have captions available or they might be disabled.";

pub struct AppState {
    pub pipeline: Pipeline,
    pub favorites: Arc<dyn FavoritesStore>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/transcribe", post(transcribe))
        .route("/repurpose", post(repurpose))
        .route("/favorites/{user_id}", get(list_favorites))
        .route("/favorites/{user_id}/{post_id}", put(add_favorite).delete(remove_favorite))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// A logged failure on its way out as JSON
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    error: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>, error: Option<String>) -> Self {
        let api_error = Self {
            status,
            message: message.into(),
            error,
        };
        let detail = api_error.error.as_deref().unwrap_or("-");
        if status.is_server_error() {
            error!("{} {}: {detail}", status.as_u16(), api_error.message);
        } else {
            warn!("{} {}: {detail}", status.as_u16(), api_error.message);
        }
        api_error
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, None)
    }

    /// Map a pipeline failure; `failed` is the message for completion errors
    fn from_pipeline(err: PipelineError, failed: &str) -> Self {
        match err {
            PipelineError::MissingUrl | PipelineError::InvalidUrl | PipelineError::MissingTranscript => {
                Self::bad_request(err.to_string())
            }
            PipelineError::Fetch(e @ FetchError::MissingApiKey { .. }) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Captions provider API key is not configured",
                Some(e.to_string()),
            ),
            PipelineError::Fetch(e) => Self::new(StatusCode::BAD_REQUEST, FETCH_FAILED_MESSAGE, Some(e.to_string())),
            PipelineError::Completion(e @ CompletionError::MissingApiKey { .. }) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Completion API key is not configured",
                Some(e.to_string()),
            ),
            PipelineError::Completion(e) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, failed, Some(e.to_string()))
            }
        }
    }

    fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::InvalidKey { .. } => Self::bad_request(err.to_string()),
            other => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update favorites",
                Some(other.to_string()),
            ),
        }
    }

    fn from_rejection(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid request body", Some(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message,
            error: self.error,
        };
        (self.status, Json(body)).into_response()
    }
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct TranscribeRequest {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranscribeResponse {
    transcript: String,
}

/// POST /transcribe - fetch and refine the captions of a YouTube video
async fn transcribe(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TranscribeRequest>, JsonRejection>,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let Json(req) = body.map_err(ApiError::from_rejection)?;
    let url = req.url.unwrap_or_default();

    let transcript = state
        .pipeline
        .transcribe(&url)
        .await
        .map_err(|e| ApiError::from_pipeline(e, "Failed to process transcript"))?;

    Ok(Json(TranscribeResponse { transcript }))
}

#[derive(Debug, Deserialize)]
struct RepurposeRequest {
    #[serde(default)]
    transcript: Option<String>,
}

#[derive(Debug, Serialize)]
struct RepurposeResponse {
    tweets: Vec<String>,
    posts: Vec<Post>,
}

/// POST /repurpose - turn a transcript into short posts
async fn repurpose(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RepurposeRequest>, JsonRejection>,
) -> Result<Json<RepurposeResponse>, ApiError> {
    let Json(req) = body.map_err(ApiError::from_rejection)?;
    let transcript = req.transcript.unwrap_or_default();

    let posts = state
        .pipeline
        .repurpose(&transcript)
        .await
        .map_err(|e| ApiError::from_pipeline(e, "Failed to repurpose transcript"))?;

    Ok(Json(RepurposeResponse {
        tweets: posts.iter().map(|p| p.text.clone()).collect(),
        posts,
    }))
}

#[derive(Debug, Serialize)]
struct FavoritesResponse {
    favorites: Vec<FavoritePost>,
}

/// GET /favorites/{user_id}
async fn list_favorites(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<FavoritesResponse>, ApiError> {
    let rx = state.favorites.subscribe(&user_id).await.map_err(ApiError::from_store)?;
    let favorites = rx.borrow().clone();
    Ok(Json(FavoritesResponse { favorites }))
}

#[derive(Debug, Deserialize)]
struct AddFavoriteRequest {
    text: String,
    #[serde(rename = "videoUrl", default)]
    video_url: Option<String>,
}

/// PUT /favorites/{user_id}/{post_id}
async fn add_favorite(
    State(state): State<Arc<AppState>>,
    Path((user_id, post_id)): Path<(String, String)>,
    body: Result<Json<AddFavoriteRequest>, JsonRejection>,
) -> Result<Json<FavoritePost>, ApiError> {
    let Json(req) = body.map_err(ApiError::from_rejection)?;
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request("Post text is required"));
    }

    let entry = FavoriteEntry::now(req.text, req.video_url.filter(|u| !u.is_empty()));
    state
        .favorites
        .write(&user_id, &post_id, entry.clone())
        .await
        .map_err(ApiError::from_store)?;

    Ok(Json(FavoritePost { id: post_id, entry }))
}

/// DELETE /favorites/{user_id}/{post_id}
async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    Path((user_id, post_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .favorites
        .delete(&user_id, &post_id)
        .await
        .map_err(ApiError::from_store)?;
    Ok(StatusCode::NO_CONTENT)
}
