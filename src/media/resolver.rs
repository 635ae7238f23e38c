//! Upload orchestration: in-progress flag and stale-result handling

use crate::error::{Error, Result};
use crate::media::{AssetHost, LocalFile, MediaCategory, MediaReference, UploadRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Observable "uploading" flag.
///
/// The flag is raised while at least one upload is in flight and lowered
/// when the last one finishes, whichever way it finishes.
#[derive(Clone)]
pub struct UploadStatus {
    in_flight: Arc<AtomicUsize>,
    sender: Arc<watch::Sender<bool>>,
}

impl UploadStatus {
    /// Create a lowered flag
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            sender: Arc::new(sender),
        }
    }

    /// Whether an upload is currently running
    pub fn is_uploading(&self) -> bool {
        *self.sender.borrow()
    }

    /// Subscribe to flag changes
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    fn begin(&self) -> UploadGuard {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            self.sender.send_replace(true);
        }
        UploadGuard {
            status: self.clone(),
        }
    }
}

impl Default for UploadStatus {
    fn default() -> Self {
        Self::new()
    }
}

struct UploadGuard {
    status: UploadStatus,
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        if self.status.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.status.sender.send_replace(false);
        }
    }
}

/// Ticket identifying one selection made into a [`MediaSlot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTicket(u64);

#[derive(Debug, Default)]
struct SlotState {
    generation: u64,
    reference: Option<MediaReference>,
}

/// Holds the current reference for one input (attachment or logo).
///
/// Every selection takes a new ticket; results delivered with an older
/// ticket are discarded, so a slow upload can never overwrite a newer one.
#[derive(Debug, Clone, Default)]
pub struct MediaSlot {
    name: &'static str,
    state: Arc<Mutex<SlotState>>,
}

impl MediaSlot {
    /// Create an empty slot
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(Mutex::new(SlotState::default())),
        }
    }

    /// The current reference
    pub fn current(&self) -> Option<MediaReference> {
        self.lock().reference.clone()
    }

    /// Start a new selection, invalidating any in-flight one
    pub fn select(&self, clear: bool) -> SlotTicket {
        let mut state = self.lock();
        state.generation += 1;
        if clear {
            state.reference = None;
        }
        SlotTicket(state.generation)
    }

    /// Store a result if its ticket is still the latest; returns whether it was kept
    pub fn complete(&self, ticket: SlotTicket, reference: MediaReference) -> bool {
        let mut state = self.lock();
        if state.generation != ticket.0 {
            tracing::debug!(
                slot = self.name,
                url = %reference.url,
                "Discarding stale upload result"
            );
            return false;
        }
        state.reference = Some(reference);
        true
    }

    /// Drop the current reference
    pub fn clear(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.reference = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        // The state is a plain value; a poisoned lock still holds a consistent one.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Turns local files into hosted [`MediaReference`]s
#[derive(Clone)]
pub struct MediaResolver {
    host: Arc<dyn AssetHost>,
    status: UploadStatus,
}

impl MediaResolver {
    /// Create a resolver uploading to `host`
    pub fn new(host: Arc<dyn AssetHost>) -> Self {
        Self {
            host,
            status: UploadStatus::new(),
        }
    }

    /// The shared uploading flag
    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    /// Upload a selected file; `None` means nothing was selected and is a no-op.
    pub async fn resolve(&self, file: Option<LocalFile>) -> Result<Option<MediaReference>> {
        let Some(file) = file else {
            return Ok(None);
        };
        let category = file.category().inspect_err(|_| {
            tracing::error!(mime = %file.mime_type, file = %file.name, "Unsupported file type");
        })?;
        self.upload(file, category).await.map(Some)
    }

    /// Upload a file under an explicit category
    pub async fn upload(&self, file: LocalFile, category: MediaCategory) -> Result<MediaReference> {
        let mime_type = file.mime_type.clone();
        let name = file.name.clone();
        let _guard = self.status.begin();

        match self.host.upload(UploadRequest { file, category }).await {
            Ok(url) if !url.is_empty() => {
                tracing::info!(%url, category = category.as_str(), "Upload complete");
                Ok(MediaReference::new(url, mime_type))
            }
            Ok(_) => {
                tracing::error!(file = %name, "Asset host returned an empty URL");
                Err(Error::Upload("asset host returned an empty URL".to_string()))
            }
            Err(err) => {
                tracing::error!(file = %name, category = category.as_str(), "Error uploading: {err}");
                Err(err)
            }
        }
    }

    /// Select a file into a slot and upload it, storing the result unless a
    /// newer selection has been made meanwhile. A discarded result yields `None`.
    ///
    /// Attachment slots are cleared as soon as a new file is chosen.
    pub async fn resolve_into(
        &self,
        slot: &MediaSlot,
        file: Option<LocalFile>,
        clear_on_select: bool,
    ) -> Result<Option<MediaReference>> {
        if file.is_none() {
            return Ok(None);
        }
        let ticket = slot.select(clear_on_select);
        match self.resolve(file).await? {
            Some(reference) if slot.complete(ticket, reference.clone()) => Ok(Some(reference)),
            _ => Ok(None),
        }
    }
}
