use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const APP_NAME: &str = "playseed";

/// Scope needed to create playlists and insert items.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/youtube.force-ssl";

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Set the path to the OAuth2 client secret JSON file
    #[clap(short = 's', long, value_name = "PATH")]
    pub client_secret: Option<String>,

    /// Set the default playlist input file
    #[clap(short = 'i', long, value_name = "PATH")]
    pub input: Option<String>,

    /// Set where OAuth2 tokens are cached between runs
    #[clap(long, value_name = "PATH")]
    pub token_cache: Option<String>,

    /// Set the description given to created playlists
    #[clap(short = 'd', long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Show the current configuration
    #[clap(short = 'l', long)]
    pub list: bool,

    /// Reset the configuration to default values
    #[clap(long)]
    pub reset: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Path to the OAuth2 client secret file from the Google Cloud console
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// The playlists to create, see `BatchSpec`
    pub input_file: String,

    /// Token cache file, defaults to `token_cache.json` next to the config file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_cache: Option<String>,

    /// OAuth2 scopes requested for every call
    pub scopes: Vec<String>,

    /// Description given to every created playlist
    pub description: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            client_secret: None,
            input_file: "playlists.json".to_string(),
            token_cache: None,
            scopes: vec![DEFAULT_SCOPE.to_string()],
            description: String::new(),
        }
    }
}

impl Config {
    /// Read the configuration from the file
    pub fn read() -> Result<Self> {
        let cfg: Config = confy::load(APP_NAME, None)?;

        Ok(cfg)
    }

    /// Write the configuration to the file
    pub fn write(&self) -> Result<()> {
        confy::store(APP_NAME, None, self)?;

        Ok(())
    }

    /// Apply the values given on the command line, returning whether anything changed.
    pub fn apply(&mut self, args: &ConfigArgs) -> bool {
        let before = self.clone();

        if let Some(path) = &args.client_secret {
            self.client_secret = Some(path.clone());
        }
        if let Some(path) = &args.input {
            self.input_file = path.clone();
        }
        if let Some(path) = &args.token_cache {
            self.token_cache = Some(path.clone());
        }
        if let Some(description) = &args.description {
            self.description = description.clone();
        }

        *self != before
    }

    pub fn client_secret(&self) -> Result<&str> {
        self.client_secret
            .as_deref()
            .filter(|path| !path.is_empty())
            .ok_or(Error::MissingClientSecret)
    }

    /// The token cache path, falling back to the configuration directory.
    pub fn token_cache_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.token_cache {
            return Ok(PathBuf::from(path));
        }

        let config_path = confy::get_configuration_file_path(APP_NAME, None)?;
        let cache_dir = config_path.parent().map(PathBuf::from).unwrap_or_default();

        Ok(cache_dir.join("token_cache.json"))
    }
}
