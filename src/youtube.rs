use async_trait::async_trait;
use google_youtube3::{
    YouTube,
    api::{
        Playlist, PlaylistItem, PlaylistItemSnippet, PlaylistSnippet, PlaylistStatus, ResourceId,
        SearchResult,
    },
    hyper_rustls, hyper_util,
};
use http_body_util::BodyExt;

use crate::remote::{
    Operation, PlaylistId, PlaylistService, RemoteFailure, SearchOutcome, VideoId, VideoMatch,
};

const VIDEO_KIND: &str = "youtube#video";

type Connector = hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// YouTube Data API v3 client, obtained from [`crate::credentials::Credentials`].
pub struct YouTubeClient {
    hub: YouTube<Connector>,
    scopes: Vec<String>,
}

impl YouTubeClient {
    pub(crate) fn new(hub: YouTube<Connector>, scopes: Vec<String>) -> Self {
        Self { hub, scopes }
    }
}

#[async_trait]
impl PlaylistService for YouTubeClient {
    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<PlaylistId, RemoteFailure> {
        let result = self
            .hub
            .playlists()
            .insert(playlist_body(name, description))
            .add_part("snippet")
            .add_part("status")
            .add_scopes(&self.scopes)
            .doit()
            .await;

        let (_, created) = match result {
            Ok(response) => response,
            Err(e) => {
                return Err(api_failure(Operation::CreatePlaylist, name.to_string(), e).await);
            }
        };

        created.id.map(PlaylistId).ok_or_else(|| {
            RemoteFailure::new(Operation::CreatePlaylist, name, "response carried no playlist id")
        })
    }

    async fn search_video(&self, query: &str) -> Result<SearchOutcome, RemoteFailure> {
        let result = self
            .hub
            .search()
            .list(&vec!["id".to_string(), "snippet".to_string()])
            .q(query)
            .max_results(1)
            .add_type("video")
            .add_scopes(&self.scopes)
            .doit()
            .await;

        match result {
            Ok((_, response)) => Ok(first_video(response.items.unwrap_or_default())),
            Err(e) => Err(api_failure(Operation::SearchVideo, query.to_string(), e).await),
        }
    }

    async fn add_item(
        &self,
        playlist_id: &PlaylistId,
        video_id: &VideoId,
    ) -> Result<(), RemoteFailure> {
        let result = self
            .hub
            .playlist_items()
            .insert(playlist_item_body(playlist_id, video_id))
            .add_part("snippet")
            .add_scopes(&self.scopes)
            .doit()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => Err(api_failure(
                Operation::AddItem,
                format!("{video_id} -> {playlist_id}"),
                e,
            )
            .await),
        }
    }
}

/// A public playlist with the given title and description.
fn playlist_body(name: &str, description: &str) -> Playlist {
    Playlist {
        snippet: Some(PlaylistSnippet {
            title: Some(name.to_string()),
            description: Some(description.to_string()),
            ..Default::default()
        }),
        status: Some(PlaylistStatus {
            privacy_status: Some("public".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn playlist_item_body(playlist_id: &PlaylistId, video_id: &VideoId) -> PlaylistItem {
    PlaylistItem {
        snippet: Some(PlaylistItemSnippet {
            playlist_id: Some(playlist_id.0.clone()),
            resource_id: Some(ResourceId {
                kind: Some(VIDEO_KIND.to_string()),
                video_id: Some(video_id.0.clone()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The first result that is a video with an id.
fn first_video(items: Vec<SearchResult>) -> SearchOutcome {
    for result in items {
        let Some(id) = result.id else { continue };
        if id.kind.as_deref() != Some(VIDEO_KIND) {
            continue;
        }
        if let Some(video_id) = id.video_id {
            let title = result
                .snippet
                .and_then(|snippet| snippet.title)
                .unwrap_or_default();
            return SearchOutcome::Found(VideoMatch {
                id: VideoId(video_id),
                title,
            });
        }
    }

    SearchOutcome::NoMatch
}

/// Turn a client library error into a [`RemoteFailure`], keeping the HTTP status and
/// the response body where the service returned one.
async fn api_failure(
    operation: Operation,
    target: String,
    err: google_youtube3::Error,
) -> RemoteFailure {
    let failure = match err {
        google_youtube3::Error::BadRequest(body) => failure_from_body(operation, target, &body),
        google_youtube3::Error::Failure(response) => {
            let (parts, body) = response.into_parts();
            let text = match body.collect().await {
                Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
                Err(e) => {
                    tracing::debug!(error = %e, "could not read error response body");
                    String::new()
                }
            };
            failure_from_status(
                operation,
                target,
                parts.status.as_u16(),
                parts.status.canonical_reason(),
                &text,
            )
        }
        other => RemoteFailure::new(operation, target, other.to_string()),
    };

    tracing::warn!(
        operation = ?failure.operation,
        target = %failure.target,
        status = ?failure.status,
        message = %failure.message,
        "YouTube API call failed"
    );

    failure
}

/// Google API errors look like `{"error": {"code": 403, "message": "...", ...}}`.
fn failure_from_body(operation: Operation, target: String, body: &serde_json::Value) -> RemoteFailure {
    let message = body
        .pointer("/error/message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());

    let failure = RemoteFailure::new(operation, target, message);
    match body
        .pointer("/error/code")
        .and_then(serde_json::Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
    {
        Some(status) => failure.with_status(status),
        None => failure,
    }
}

/// A non-JSON error response: the body text, or the reason phrase when it is empty.
fn failure_from_status(
    operation: Operation,
    target: String,
    status: u16,
    reason: Option<&str>,
    body: &str,
) -> RemoteFailure {
    let body = body.trim();
    let message = if body.is_empty() {
        reason.unwrap_or("unexpected response")
    } else {
        body
    };

    RemoteFailure::new(operation, target, message).with_status(status)
}
