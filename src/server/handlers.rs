use axum::{
    body::Body,
    extract::{Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE, HOST},
        HeaderMap, HeaderValue,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::extractors::{validate_url, MediaKind, MediaMetadata, Platform};
use crate::transcript::Transcript;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub status: String,
    pub data: DownloadData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadData {
    pub title: String,
    pub duration: String,
    pub formats: Vec<FormatLink>,
    pub transcript: Option<Transcript>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatLink {
    pub quality: String,
    pub url: String,
}

/// Reject missing, blank and non-http(s) URLs
fn required_url(url: Option<&str>) -> ApiResult<String> {
    let url = url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing URL."))?;

    validate_url(url).map_err(|_| ApiError::bad_request("Invalid URL."))?;
    Ok(url.to_string())
}

/// Scheme and host the client used to reach us
fn request_base(state: &AppState, headers: &HeaderMap) -> ApiResult<String> {
    if let Some(base) = &state.public_base_url {
        return Ok(base.clone());
    }

    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| {
            tracing::error!("Request without Host header and no public base URL configured");
            ApiError::internal()
        })?;

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|p| p.to_str().ok())
        .and_then(|p| p.split(',').next())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or("http");

    Ok(format!("{}://{}", proto, host))
}

/// Links back to the stream endpoint for each media kind
pub fn format_links(base: &str, url: &str) -> Vec<FormatLink> {
    [MediaKind::Video, MediaKind::Audio]
        .into_iter()
        .map(|kind| FormatLink {
            quality: kind.quality_label().to_string(),
            url: format!(
                "{}/api/stream?type={}&url={}",
                base,
                kind.as_str(),
                urlencoding::encode(url)
            ),
        })
        .collect()
}

pub async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Json<DownloadResponse>> {
    let url = required_url(query.url.as_deref())?;
    let base = request_base(&state, &headers)?;
    let platform = Platform::detect(&url);

    tracing::info!(
        "Download request for {} ({})",
        crate::utils::extract_domain(&url).unwrap_or_default(),
        platform.name()
    );

    // Captions and metadata are independent yt-dlp runs
    let captions = async {
        if platform.has_captions() {
            Some(state.transcripts.original_text(&url).await)
        } else {
            None
        }
    };
    let (metadata, captions) = tokio::join!(state.metadata.fetch_metadata(&url), captions);

    let metadata = metadata.unwrap_or_else(|e| {
        tracing::warn!("Metadata extraction failed for {}: {:#}", url, e);
        MediaMetadata::placeholder()
    });

    let transcript = match captions {
        Some(text) => Some(
            state
                .transcripts
                .finish(text, metadata.description.as_deref())
                .await
                .preview(),
        ),
        None => None,
    };

    Ok(Json(DownloadResponse {
        status: "ok".to_string(),
        data: DownloadData {
            title: metadata.title,
            duration: metadata.duration,
            formats: format_links(&base, &url),
            transcript,
        },
    }))
}

pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    let url = required_url(query.url.as_deref())?;
    let kind = MediaKind::from_query(query.kind.as_deref());

    let bytes = state.streams.open_stream(&url, kind).await.map_err(|e| {
        tracing::error!("Failed to start {} stream for {}: {:#}", kind.as_str(), url, e);
        ApiError::bad_gateway("Could not start the media stream.")
    })?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", kind.file_name()))
        .map_err(|_| ApiError::internal())?;

    let mut response = Body::from_stream(bytes).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static(kind.mime_type()));
    response_headers.insert(CONTENT_DISPOSITION, disposition);

    Ok(response)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
