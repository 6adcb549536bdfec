use std::fmt;

use async_trait::async_trait;

/// Identifier of a playlist created on the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistId(pub String);

/// Identifier of a video returned by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoId(pub String);

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMatch {
    pub id: VideoId,
    pub title: String,
}

/// Result of a successful search call.
///
/// An empty result set is `NoMatch`, which is not a failure of the call itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(VideoMatch),
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreatePlaylist,
    SearchVideo,
    AddItem,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::CreatePlaylist => "creating playlist",
            Operation::SearchVideo => "searching",
            Operation::AddItem => "adding playlist item",
        })
    }
}

/// A remote call that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    pub operation: Operation,
    /// Playlist name, query text, or `video -> playlist` pair the call was about.
    pub target: String,
    /// HTTP status, when the service answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteFailure {
    pub fn new(operation: Operation, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation,
            target: target.into(),
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "An HTTP error {status} occurred while {} '{}': {}",
                self.operation, self.target, self.message
            ),
            None => write!(
                f,
                "An error occurred while {} '{}': {}",
                self.operation, self.target, self.message
            ),
        }
    }
}

impl std::error::Error for RemoteFailure {}

/// The remote calls needed to fill a playlist.
///
/// Implementations must not retry, and must report every failure as a
/// [`RemoteFailure`] rather than panicking.
#[async_trait]
pub trait PlaylistService: Send + Sync {
    /// Create a public playlist and return its id.
    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<PlaylistId, RemoteFailure>;

    /// Look up the single best video match for a free-text query.
    async fn search_video(&self, query: &str) -> Result<SearchOutcome, RemoteFailure>;

    /// Append a video to the end of a playlist.
    async fn add_item(
        &self,
        playlist_id: &PlaylistId,
        video_id: &VideoId,
    ) -> Result<(), RemoteFailure>;
}
