//! Worker task, its handle, and the periodic sync timer
//!
//! The worker owns its state inside a spawned task. The application sends
//! [`WorkerEvent`]s over a channel and awaits the reply, and receives
//! broadcasts on a [`ClientChannel`].

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    AssetRequest, AssetResponse, OfflineWorker, PermissionState, WorkerError, WorkerMessage,
    MIN_SYNC_INTERVAL,
};

/// Capacity of the event queue into the worker task
const EVENT_QUEUE: usize = 32;

/// Lifecycle and request events delivered to the worker task
enum WorkerEvent {
    Install(oneshot::Sender<Result<(), WorkerError>>),
    Activate(oneshot::Sender<Result<usize, WorkerError>>),
    Connect(oneshot::Sender<(u64, mpsc::Receiver<WorkerMessage>)>),
    Fetch(AssetRequest, oneshot::Sender<Result<AssetResponse, WorkerError>>),
    PeriodicSync(String),
}

/// Application-side handle to a running worker
///
/// Cheap to clone. The worker task exits once every handle is dropped.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    events: mpsc::Sender<WorkerEvent>,
}

impl std::fmt::Debug for WorkerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerEvent::Install(_) => f.write_str("Install"),
            WorkerEvent::Activate(_) => f.write_str("Activate"),
            WorkerEvent::Connect(_) => f.write_str("Connect"),
            WorkerEvent::Fetch(request, _) => write!(f, "Fetch({})", request.path),
            WorkerEvent::PeriodicSync(tag) => write!(f, "PeriodicSync({})", tag),
        }
    }
}

impl WorkerHandle {
    /// Moves `worker` into a background task and returns a handle to it
    ///
    /// Lifecycle events are handled one at a time in arrival order. Fetches
    /// run concurrently so a slow network request never holds up the rest.
    pub fn spawn(worker: OfflineWorker) -> Self {
        let worker = Arc::new(worker);
        let (events, mut receiver) = mpsc::channel::<WorkerEvent>(EVENT_QUEUE);

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                debug!(?event, "worker event");
                match event {
                    WorkerEvent::Install(reply) => {
                        let _ = reply.send(worker.install().await);
                    }
                    WorkerEvent::Activate(reply) => {
                        let _ = reply.send(worker.activate());
                    }
                    WorkerEvent::Connect(reply) => {
                        let _ = reply.send(worker.connect());
                    }
                    WorkerEvent::Fetch(request, reply) => {
                        let worker = Arc::clone(&worker);
                        tokio::spawn(async move {
                            let _ = reply.send(worker.handle_fetch(&request).await);
                        });
                    }
                    WorkerEvent::PeriodicSync(tag) => {
                        worker.periodic_sync(&tag);
                    }
                }
            }
            debug!("worker task stopped");
        });

        Self { events }
    }

    async fn request<T>(
        &self,
        event: impl FnOnce(oneshot::Sender<T>) -> WorkerEvent,
    ) -> Result<T, WorkerError> {
        let (reply, response) = oneshot::channel();
        self.events
            .send(event(reply))
            .await
            .map_err(|_| WorkerError::Stopped)?;
        response.await.map_err(|_| WorkerError::Stopped)
    }

    /// Pre-caches the asset manifest
    pub async fn install(&self) -> Result<(), WorkerError> {
        self.request(WorkerEvent::Install).await?
    }

    /// Activates the worker, returning how many clients it claimed
    pub async fn activate(&self) -> Result<usize, WorkerError> {
        self.request(WorkerEvent::Activate).await?
    }

    /// Connects a new application instance to the worker
    pub async fn connect(&self) -> Result<ClientChannel, WorkerError> {
        let (id, receiver) = self.request(WorkerEvent::Connect).await?;
        Ok(ClientChannel { id, receiver })
    }

    /// Routes a request through the worker
    pub async fn fetch(&self, request: AssetRequest) -> Result<AssetResponse, WorkerError> {
        self.request(|reply| WorkerEvent::Fetch(request, reply)).await?
    }

    /// Wakes the worker with a periodic sync `tag`
    pub async fn dispatch_periodic_sync(&self, tag: &str) -> Result<(), WorkerError> {
        self.events
            .send(WorkerEvent::PeriodicSync(tag.to_string()))
            .await
            .map_err(|_| WorkerError::Stopped)
    }

    /// Registers a recurring wake-up for `tag`
    ///
    /// Registration needs background sync permission and a non-zero interval.
    /// A refused registration is logged and returned as an error; the worker
    /// keeps serving requests either way. Intervals shorter than
    /// [`MIN_SYNC_INTERVAL`] are raised to it. The first wake-up happens one
    /// period after registration.
    pub fn register_periodic_sync(
        &self,
        tag: &str,
        interval: Duration,
        permission: PermissionState,
    ) -> Result<SyncRegistration, WorkerError> {
        if permission != PermissionState::Granted {
            warn!(tag, ?permission, "periodic background sync not permitted");
            return Err(WorkerError::PermissionDenied("periodic background sync"));
        }
        if interval.is_zero() {
            warn!(tag, "refusing periodic sync with zero interval");
            return Err(WorkerError::InvalidInterval);
        }

        let period = interval.max(MIN_SYNC_INTERVAL);
        if period != interval {
            debug!(
                tag,
                requested_secs = interval.as_secs(),
                period_secs = period.as_secs(),
                "raising periodic sync interval to the minimum"
            );
        }
        Ok(self.start_sync_timer(tag, period))
    }

    /// Dispatches `tag` every `period` until the registration goes away
    fn start_sync_timer(&self, tag: &str, period: Duration) -> SyncRegistration {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let handle = self.clone();
        let tag = tag.to_string();
        info!(tag = %tag, interval_secs = period.as_secs(), "registered periodic sync");

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if handle.dispatch_periodic_sync(&tag).await.is_err() {
                            debug!(tag = %tag, "worker gone, stopping periodic sync");
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        SyncRegistration { shutdown_tx }
    }
}

/// Live periodic sync timer
///
/// The timer stops when this is shut down or dropped.
#[derive(Debug)]
pub struct SyncRegistration {
    shutdown_tx: mpsc::Sender<()>,
}

impl SyncRegistration {
    /// Stops the timer
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// An application instance's end of the worker connection
#[derive(Debug)]
pub struct ClientChannel {
    id: u64,
    receiver: mpsc::Receiver<WorkerMessage>,
}

impl ClientChannel {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next broadcast; `None` once the worker is gone
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        self.receiver.recv().await
    }

    /// Returns a pending broadcast without waiting
    pub fn try_recv(&mut self) -> Option<WorkerMessage> {
        self.receiver.try_recv().ok()
    }

    /// Channel not attached to any worker, fed by the returned sender
    #[cfg(test)]
    pub(crate) fn detached() -> (mpsc::Sender<WorkerMessage>, Self) {
        let (sender, receiver) = mpsc::channel(8);
        (sender, Self { id: 0, receiver })
    }
}
