//! Durable asset cache and the network seam

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::warn;
use url::Url;

use super::{AssetResponse, ResponseSource, WorkerError};

/// Transport used by the worker to reach the application origin
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch an origin-relative path
    ///
    /// An HTTP error status is a successful fetch; only a request that got no
    /// response at all is an error.
    async fn fetch(&self, path: &str) -> Result<AssetResponse, WorkerError>;
}

/// [`Network`] backed by reqwest against a fixed origin
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: Client,
    origin: Url,
}

impl HttpNetwork {
    pub fn new(origin: &str) -> Result<Self, WorkerError> {
        Ok(Self {
            client: Client::new(),
            origin: Url::parse(origin)?,
        })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, path: &str) -> Result<AssetResponse, WorkerError> {
        let url = self.origin.join(path)?;
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(AssetResponse {
            status,
            content_type,
            body,
            source: ResponseSource::Network,
        })
    }
}

/// Distinguishes concurrent temp files for the same entry
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Header line at the start of each entry file
#[derive(Debug, Serialize, Deserialize)]
struct StoredMeta {
    path: String,
    status: u16,
    content_type: Option<String>,
}

/// Named, on-disk store of responses keyed by request path
///
/// Each entry is a single file: one line of JSON metadata followed by the raw
/// body. Entries are replaced by renaming a finished temp file over them, so a
/// reader sees either the old response or the new one in full.
#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    /// Opens (lazily creating) the cache `name` under `root`
    pub fn new(root: &Path, name: &str) -> Self {
        Self {
            dir: root.join(&*urlencoding::encode(name)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, path: &str) -> PathBuf {
        self.dir.join(format!("{}.entry", urlencoding::encode(path)))
    }

    /// Stores `response` under `path`, replacing any previous entry
    pub async fn put(&self, path: &str, response: &AssetResponse) -> Result<(), WorkerError> {
        fs::create_dir_all(&self.dir).await?;
        let meta = StoredMeta {
            path: path.to_string(),
            status: response.status,
            content_type: response.content_type.clone(),
        };
        // Compact JSON never contains a raw newline
        let mut contents = serde_json::to_vec(&meta)?;
        contents.push(b'\n');
        contents.extend_from_slice(&response.body);

        let entry = self.entry_path(path);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = entry.with_extension(format!("{}.{}.tmp", std::process::id(), seq));
        fs::write(&tmp, contents).await?;
        if let Err(e) = fs::rename(&tmp, &entry).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Looks up the response stored for `path`
    pub async fn match_path(&self, path: &str) -> Option<AssetResponse> {
        let mut contents = match fs::read(self.entry_path(path)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path, error = %e, "failed to read cached asset");
                return None;
            }
        };
        let Some(split) = contents.iter().position(|&b| b == b'\n') else {
            warn!(path, "ignoring cached asset without metadata");
            return None;
        };
        let meta: StoredMeta = match serde_json::from_slice(&contents[..split]) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path, error = %e, "ignoring corrupt cached asset");
                return None;
            }
        };
        let body = contents.split_off(split + 1);

        Some(AssetResponse {
            status: meta.status,
            content_type: meta.content_type,
            body,
            source: ResponseSource::Cache,
        })
    }
}
