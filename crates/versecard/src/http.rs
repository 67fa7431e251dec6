//! The HTTP surface: one `/search` endpoint plus static files.
//!
//! Error detail never leaves the process; callers get a bare status code and
//! the log gets the full story under a per-request correlation id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use versecard_core::{CardRequest, Error, Pipeline};

pub struct AppState {
    pub pipeline: Pipeline,
    request_ids: AtomicU64,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            request_ids: AtomicU64::new(0),
        }
    }

    fn next_request_id(&self) -> String {
        let n = self.request_ids.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{n}", std::process::id())
    }
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState, public_dir: std::path::PathBuf) -> Router {
    Router::new()
        .route("/search", get(search))
        .fallback_service(ServeDir::new(public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    p: Option<String>,
    eo: Option<String>,
    so: Option<String>,
    d: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody {
    image_data: String,
    lyrics_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    video_link: Option<String>,
    has_more_pages: bool,
    has_more_start_offset: bool,
    has_more_end_offset: bool,
}

async fn search(State(state): State<SharedState>, Query(params): Query<SearchParams>) -> Response {
    let request_id = state.next_request_id();

    let Some(request) = parse_request(&params) else {
        tracing::warn!(%request_id, ?params, "malformed search parameters");
        return StatusCode::BAD_REQUEST.into_response();
    };
    tracing::info!(%request_id, query = %request.query, page = request.page, "search");

    match state.pipeline.compose(&request).await {
        Ok(composed) => {
            tracing::info!(%request_id, "generated result");
            let debug_image = params.d.as_deref() == Some("true");
            if debug_image {
                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, "image/png"),
                        (header::CACHE_CONTROL, "no-store"),
                    ],
                    composed.image,
                )
                    .into_response()
            } else {
                let body = SearchBody {
                    image_data: format!(
                        "data:image/png;base64,{}",
                        BASE64.encode(&composed.image)
                    ),
                    lyrics_link: composed.lyrics_link,
                    video_link: composed.video_link,
                    has_more_pages: composed.has_more_pages,
                    has_more_start_offset: composed.has_more_before,
                    has_more_end_offset: composed.has_more_after,
                };
                (
                    StatusCode::OK,
                    [(header::CACHE_CONTROL, "no-store")],
                    Json(body),
                )
                    .into_response()
            }
        }
        Err(Error::InvalidQuery) => {
            tracing::warn!(%request_id, "empty query after normalization");
            StatusCode::BAD_REQUEST.into_response()
        }
        Err(Error::NoCandidate) => {
            tracing::warn!(%request_id, page = request.page, "no results");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            tracing::error!(%request_id, query = %request.query, page = request.page, error = %err, "search failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// All four parameters must be present and numeric ones must parse as
/// non-negative integers; anything else is an input error.
fn parse_request(params: &SearchParams) -> Option<CardRequest> {
    let query = params.q.clone()?;
    let page = params.p.as_deref()?.parse::<usize>().ok()?;
    let after_offset = params.eo.as_deref()?.parse::<u32>().ok()?;
    let before_offset = params.so.as_deref()?.parse::<u32>().ok()?;
    Some(CardRequest {
        query,
        page,
        before_offset,
        after_offset,
    })
}
