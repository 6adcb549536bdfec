use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::de::{self, DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// The whole input file: block id to playlist request, in file order.
#[derive(Debug, Default, PartialEq)]
pub struct BatchSpec {
    pub blocks: Vec<(String, Entry<PlaylistRequest>)>,
}

/// One value from the input file, kept as raw JSON when it does not have the
/// expected shape so that only that block or track is skipped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Entry<T> {
    Valid(T),
    Invalid(serde_json::Value),
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct PlaylistRequest {
    #[serde(default)]
    pub playlist_name: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub songs: Vec<Entry<TrackRequest>>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct TrackRequest {
    #[serde(default)]
    pub artist: Option<String>,

    #[serde(default)]
    pub title: Option<String>,
}

/// Why a block is skipped without touching the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    MissingPlaylistName,
    NoSongs,
    Malformed,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Skip::MissingPlaylistName => "'playlist_name' is missing",
            Skip::NoSongs => "No songs found",
            Skip::Malformed => "expected an object with a string 'playlist_name' and a 'songs' list",
        })
    }
}

impl BatchSpec {
    /// Read and parse the input file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::InputNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&contents).map_err(|source| Error::InputMalformed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl PlaylistRequest {
    /// Returns the playlist name and its songs, or the reason to skip the block.
    ///
    /// The name is checked before the songs.
    pub fn validate(&self) -> Result<(&str, &[Entry<TrackRequest>]), Skip> {
        let name = match self.playlist_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(Skip::MissingPlaylistName),
        };

        if self.songs.is_empty() {
            return Err(Skip::NoSongs);
        }

        Ok((name, &self.songs))
    }
}

impl Entry<PlaylistRequest> {
    pub fn validate(&self) -> Result<(&str, &[Entry<TrackRequest>]), Skip> {
        match self {
            Entry::Valid(request) => request.validate(),
            Entry::Invalid(_) => Err(Skip::Malformed),
        }
    }
}

impl TrackRequest {
    /// The search query for this track, `"<artist> - <title>"`, if both are present.
    pub fn query(&self) -> Option<String> {
        match (self.artist.as_deref(), self.title.as_deref()) {
            (Some(artist), Some(title)) if !artist.is_empty() && !title.is_empty() => {
                Some(format!("{artist} - {title}"))
            }
            _ => None,
        }
    }
}

impl Entry<TrackRequest> {
    pub fn query(&self) -> Option<String> {
        match self {
            Entry::Valid(track) => track.query(),
            Entry::Invalid(_) => None,
        }
    }
}

impl From<TrackRequest> for Entry<TrackRequest> {
    fn from(track: TrackRequest) -> Self {
        Entry::Valid(track)
    }
}

/// Song data as it appears in log lines.
impl fmt::Display for Entry<TrackRequest> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Valid(track) => write!(f, "{track:?}"),
            Entry::Invalid(raw) => write!(f, "{raw}"),
        }
    }
}

impl<'de> Deserialize<'de> for BatchSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BatchVisitor;

        impl<'de> Visitor<'de> for BatchVisitor {
            type Value = BatchSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of block ids to playlist requests")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let capacity = map.size_hint().unwrap_or(0);
                let mut blocks = Vec::with_capacity(capacity);
                let mut seen = HashSet::with_capacity(capacity);

                while let Some((id, request)) =
                    map.next_entry::<String, Entry<PlaylistRequest>>()?
                {
                    if !seen.insert(id.clone()) {
                        return Err(de::Error::custom(format!("duplicate block id '{id}'")));
                    }
                    blocks.push((id, request));
                }

                Ok(BatchSpec { blocks })
            }
        }

        deserializer.deserialize_map(BatchVisitor)
    }
}
