//! Worker lifecycle and request handling

use futures::future::join_all;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{
    AssetCache, AssetRequest, AssetResponse, Network, RequestMode, WorkerError, WorkerMessage,
    WorkerOptions,
};

/// Capacity of each client's message queue
const CLIENT_QUEUE: usize = 8;

/// Lifecycle of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, not yet installed
    New,
    /// Assets cached, waiting to activate
    Installed,
    /// Controlling clients
    Activated,
    /// Install failed; the worker will never activate
    Redundant,
}

struct ClientSlot {
    id: u64,
    sender: mpsc::Sender<WorkerMessage>,
    controlled: bool,
}

/// State and behavior of one worker instance
///
/// This is the worker's side of the boundary; the application drives it
/// through [`WorkerHandle`](super::WorkerHandle).
pub struct OfflineWorker {
    options: WorkerOptions,
    assets: AssetCache,
    network: Arc<dyn Network>,
    state: Mutex<WorkerState>,
    clients: Mutex<Vec<ClientSlot>>,
    next_client_id: AtomicU64,
}

impl OfflineWorker {
    /// Creates a worker whose asset cache lives under `cache_root`
    pub fn new(options: WorkerOptions, cache_root: &Path, network: Arc<dyn Network>) -> Self {
        let assets = AssetCache::new(cache_root, &options.cache_name);
        Self {
            options,
            assets,
            network,
            state: Mutex::new(WorkerState::New),
            clients: Mutex::new(Vec::new()),
            next_client_id: AtomicU64::new(1),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    /// Fetches every manifest entry and stores them in the asset cache
    ///
    /// All entries are fetched before any is stored. A transport failure or a
    /// non-success status for any entry aborts the install and leaves the
    /// worker redundant.
    pub async fn install(&self) -> Result<(), WorkerError> {
        let result = self.precache().await;
        let mut state = self.state.lock();
        match &result {
            Ok(()) => {
                info!(cache = %self.options.cache_name, assets = self.options.manifest.len(), "worker installed");
                *state = WorkerState::Installed;
            }
            Err(e) => {
                error!(error = %e, "worker install failed");
                *state = WorkerState::Redundant;
            }
        }
        result
    }

    async fn precache(&self) -> Result<(), WorkerError> {
        let fetches = self.options.manifest.iter().map(|path| async move {
            let response = self.network.fetch(path).await?;
            if !response.is_success() {
                return Err(WorkerError::AssetStatus {
                    path: path.clone(),
                    status: response.status,
                });
            }
            Ok((path, response))
        });

        let responses = join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        for (path, response) in responses {
            self.assets.put(path, &response).await?;
        }
        Ok(())
    }

    /// Activates an installed worker and takes control of every connected client
    ///
    /// Returns the number of clients claimed. Activating twice is harmless.
    pub fn activate(&self) -> Result<usize, WorkerError> {
        {
            let mut state = self.state.lock();
            match *state {
                WorkerState::Installed | WorkerState::Activated => *state = WorkerState::Activated,
                WorkerState::New | WorkerState::Redundant => return Err(WorkerError::NotInstalled),
            }
        }

        let mut clients = self.clients.lock();
        let mut claimed = 0;
        for client in clients.iter_mut().filter(|c| !c.controlled) {
            client.controlled = true;
            claimed += 1;
        }
        info!(claimed, "worker activated");
        Ok(claimed)
    }

    /// Registers a new application instance
    ///
    /// Instances connecting after activation are controlled immediately; earlier
    /// ones become controlled when the worker activates.
    pub fn connect(&self) -> (u64, mpsc::Receiver<WorkerMessage>) {
        let (sender, receiver) = mpsc::channel(CLIENT_QUEUE);
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let controlled = self.state() == WorkerState::Activated;
        self.clients.lock().push(ClientSlot {
            id,
            sender,
            controlled,
        });
        debug!(client = id, controlled, "client connected");
        (id, receiver)
    }

    /// Number of connected clients this worker controls
    pub fn controlled_clients(&self) -> usize {
        self.clients
            .lock()
            .iter()
            .filter(|c| c.controlled && !c.sender.is_closed())
            .count()
    }

    /// Answers a request
    ///
    /// Navigations go to the network first and fall back to the cached offline
    /// page only when no response arrives. Everything else is served from the
    /// asset cache when present and fetched otherwise.
    pub async fn handle_fetch(&self, request: &AssetRequest) -> Result<AssetResponse, WorkerError> {
        match request.mode {
            RequestMode::Navigate => match self.network.fetch(&request.path).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    debug!(path = %request.path, error = %e, "navigation failed, serving offline page");
                    self.assets
                        .match_path(&self.options.offline_page)
                        .await
                        .ok_or(WorkerError::OfflinePageMissing)
                }
            },
            RequestMode::Other => match self.assets.match_path(&request.path).await {
                Some(hit) => Ok(hit),
                None => self.network.fetch(&request.path).await,
            },
        }
    }

    /// Handles a periodic wake-up
    ///
    /// When `tag` is the weather sync tag, every controlled client is told to
    /// refresh. Returns the number of clients notified.
    pub fn periodic_sync(&self, tag: &str) -> usize {
        if tag != self.options.sync_tag {
            debug!(tag, "ignoring unknown periodic sync tag");
            return 0;
        }

        let mut clients = self.clients.lock();
        clients.retain(|c| !c.sender.is_closed());

        let mut notified = 0;
        for client in clients.iter().filter(|c| c.controlled) {
            match client.sender.try_send(WorkerMessage::WeatherUpdate) {
                Ok(()) => notified += 1,
                // An update is already queued for this client
                Err(mpsc::error::TrySendError::Full(_)) => {}
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(client = client.id, "client went away during broadcast");
                }
            }
        }
        info!(notified, "broadcast weather update");
        notified
    }
}
