use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a run before or outside the per-playlist loop.
///
/// Remote failures for individual playlists and tracks are not represented
/// here; see [`crate::remote::RemoteFailure`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("the file '{}' was not found", path.display())]
    InputNotFound { path: PathBuf },

    #[error("could not decode JSON from '{}', please check the file format: {source}", path.display())]
    InputMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the path to the OAuth2 client secret file is not set")]
    MissingClientSecret,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("configuration error: {0}")]
    Config(#[from] confy::ConfyError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
