use crate::{
    error::{Result, ToonifyError},
    models::{generation::check_result_url, Generation, GenerationId, GenerationStatus},
};
use futures::stream::Stream;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

const EVENT_CAPACITY: usize = 64;

/// Notification emitted after every successful store mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Inserted(Generation),
    Updated(Generation),
    Removed(GenerationId),
    Replaced { count: usize },
}

/// Shared collection of generations.
///
/// Cloning yields another handle to the same records. The lock is only ever
/// held for one synchronous mutation, so `list()` always sees a consistent
/// snapshot.
#[derive(Clone)]
pub struct GenerationStore {
    records: Arc<Mutex<Vec<Generation>>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for GenerationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            events,
        }
    }

    fn records(&self) -> MutexGuard<'_, Vec<Generation>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn insert(&self, generation: Generation) -> Result<()> {
        if generation.id.is_blank() {
            return Err(ToonifyError::InvalidInputError(
                "Generation id must not be empty".into(),
            ));
        }
        generation.check_result_invariant()?;

        {
            let mut records = self.records();
            if records.iter().any(|g| g.id == generation.id) {
                return Err(ToonifyError::DuplicateIdError(generation.id.to_string()));
            }
            records.push(generation.clone());
        }

        log::debug!("Stored generation {} ({})", generation.id, generation.status);
        self.notify(StoreEvent::Inserted(generation));
        Ok(())
    }

    /// Applies a forward status transition and returns the updated record.
    pub fn update_status(
        &self,
        id: &GenerationId,
        status: GenerationStatus,
        cartoon_image_url: Option<String>,
    ) -> Result<Generation> {
        let updated = {
            let mut records = self.records();
            let record = records
                .iter_mut()
                .find(|g| &g.id == id)
                .ok_or_else(|| ToonifyError::NotFoundError(id.to_string()))?;

            if !record.status.can_transition_to(status) {
                return Err(ToonifyError::InvalidTransitionError(format!(
                    "{}: {} -> {}",
                    id, record.status, status
                )));
            }
            check_result_url(id, status, cartoon_image_url.as_deref())?;

            if record.status == status && record.cartoon_image_url == cartoon_image_url {
                return Ok(record.clone());
            }
            record.status = status;
            record.cartoon_image_url = cartoon_image_url;
            record.clone()
        };

        log::debug!("Generation {} is now {}", id, status);
        self.notify(StoreEvent::Updated(updated.clone()));
        Ok(updated)
    }

    /// Drops a record. Callers confirm the remote delete first.
    pub fn remove(&self, id: &GenerationId) -> Result<Generation> {
        let removed = {
            let mut records = self.records();
            let index = records
                .iter()
                .position(|g| &g.id == id)
                .ok_or_else(|| ToonifyError::NotFoundError(id.to_string()))?;
            records.remove(index)
        };

        self.notify(StoreEvent::Removed(id.clone()));
        Ok(removed)
    }

    pub fn get(&self, id: &GenerationId) -> Option<Generation> {
        self.records().iter().find(|g| &g.id == id).cloned()
    }

    pub fn contains(&self, id: &GenerationId) -> bool {
        self.records().iter().any(|g| &g.id == id)
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Snapshot ordered newest first; records with equal timestamps keep
    /// their insertion order.
    pub fn list(&self) -> Vec<Generation> {
        let mut snapshot = self.records().clone();
        snapshot.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshot
    }

    /// Replaces the contents with an authoritative remote listing.
    ///
    /// Local records that are still in flight and absent from the listing are
    /// kept. A known record only takes the remote copy when that is a forward
    /// move, so statuses never regress and terminal records stay as they are.
    /// Returns the number of records afterwards.
    pub fn replace_all(&self, fetched: Vec<Generation>) -> usize {
        let count = {
            let mut records = self.records();
            let mut seen = HashSet::new();
            let mut merged = Vec::with_capacity(fetched.len());

            for remote in fetched {
                if remote.id.is_blank() || !seen.insert(remote.id.clone()) {
                    continue;
                }
                if let Err(e) = remote.check_result_invariant() {
                    log::warn!("Skipping inconsistent history entry: {}", e);
                    seen.remove(&remote.id);
                    continue;
                }
                match records.iter().find(|g| g.id == remote.id) {
                    Some(local) if !local.status.can_transition_to(remote.status) => {
                        if local.status != remote.status {
                            log::debug!(
                                "Keeping local {} for {}, history reports {}",
                                local.status,
                                local.id,
                                remote.status
                            );
                        }
                        merged.push(local.clone())
                    }
                    _ => merged.push(remote),
                }
            }

            for local in records.iter() {
                if !local.is_terminal() && !seen.contains(&local.id) {
                    merged.push(local.clone());
                }
            }

            *records = merged;
            records.len()
        };

        self.notify(StoreEvent::Replaced { count });
        count
    }

    /// Stream of mutations. A subscriber that falls behind skips the events
    /// it missed and should re-read `list()`.
    pub fn subscribe(&self) -> Pin<Box<dyn Stream<Item = StoreEvent> + Send>> {
        let stream = BroadcastStream::new(self.events.subscribe()).filter_map(|event| event.ok());
        Box::pin(stream)
    }
}
