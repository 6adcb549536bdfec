use std::path::PathBuf;

use google_youtube3::{YouTube, hyper_rustls, hyper_util, yup_oauth2};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::youtube::YouTubeClient;

/// Everything needed to obtain an authorized client.
///
/// This is the only place that reads or writes OAuth2 files.
#[derive(Debug, Clone)]
pub struct Credentials {
    client_secret: PathBuf,
    token_cache: PathBuf,
    scopes: Vec<String>,
}

impl Credentials {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            client_secret: PathBuf::from(cfg.client_secret()?),
            token_cache: cfg.token_cache_path()?,
            scopes: cfg.scopes.clone(),
        })
    }

    /// Produce an authorized client, reusing cached tokens when they are still valid
    /// and falling back to the interactive browser flow otherwise.
    pub async fn authenticate(&self) -> Result<YouTubeClient> {
        let secret = yup_oauth2::read_application_secret(&self.client_secret)
            .await
            .map_err(|e| {
                Error::Auth(format!(
                    "could not read client secret '{}': {e}",
                    self.client_secret.display()
                ))
            })?;

        if let Some(cache_dir) = self.token_cache.parent() {
            if !cache_dir.as_os_str().is_empty() {
                std::fs::create_dir_all(cache_dir).map_err(|source| Error::Io {
                    path: cache_dir.to_path_buf(),
                    source,
                })?;
            }
        }

        let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
            secret,
            yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(self.token_cache.clone())
        .build()
        .await
        .map_err(|e| Error::Auth(format!("could not build authenticator: {e}")))?;

        // Fetch a token now so the browser flow happens before any playlist work.
        auth.token(&self.scopes)
            .await
            .map_err(|e| Error::Auth(e.to_string()))?;
        tracing::debug!(token_cache = %self.token_cache.display(), "obtained OAuth2 token");

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| Error::Auth(format!("could not load native TLS roots: {e}")))?
            .https_or_http()
            .enable_http1()
            .build();

        let hub = YouTube::new(
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build(connector),
            auth,
        );

        Ok(YouTubeClient::new(hub, self.scopes.clone()))
    }
}
