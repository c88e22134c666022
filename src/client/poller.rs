use crate::{
    api::GenerationApi,
    client::history::HistoryFetcher,
    config::PollConfig,
    error::{Result, ToonifyError},
    models::{AuthToken, GenerationId, GenerationStatus, PollResponse},
    store::GenerationStore,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How a polling loop ended. Every variant is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Complete { cartoon_image_url: String },
    Failed { message: Option<String> },
    NotFound,
    TimedOut { attempts: u32 },
    PollError { message: String },
    Cancelled,
}

impl PollOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, PollOutcome::Complete { .. })
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            PollOutcome::Complete { .. } => "complete",
            PollOutcome::Failed { .. } => "failed",
            PollOutcome::NotFound => "not_found",
            PollOutcome::TimedOut { .. } => "timed_out",
            PollOutcome::PollError { .. } => "poll_error",
            PollOutcome::Cancelled => "cancelled",
        }
    }

    /// Message shown to the user; distinct per outcome.
    pub fn user_message(&self) -> String {
        match self {
            PollOutcome::Complete { .. } => "Generation complete".to_string(),
            PollOutcome::Failed { message: Some(m) } => format!("Generation failed: {}", m),
            PollOutcome::Failed { message: None } => "Generation failed".to_string(),
            PollOutcome::NotFound => "Generation not found".to_string(),
            PollOutcome::TimedOut { .. } => "Generation timed out".to_string(),
            PollOutcome::PollError { message } => {
                format!("Generation status check failed: {}", message)
            }
            PollOutcome::Cancelled => "Generation tracking cancelled".to_string(),
        }
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

/// Owner side of a running polling loop.
///
/// Dropping the handle cancels the loop, which is what a screen going away
/// should do. Call [`PollHandle::detach`] to let the loop run on by itself.
pub struct PollHandle {
    id: GenerationId,
    cancel: CancellationToken,
    task: JoinHandle<PollOutcome>,
    armed: bool,
}

impl PollHandle {
    pub fn id(&self) -> &GenerationId {
        &self.id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(mut self) -> PollOutcome {
        match (&mut self.task).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => PollOutcome::Cancelled,
            Err(e) => PollOutcome::PollError {
                message: format!("polling task failed: {}", e),
            },
        }
    }

    pub fn detach(mut self) {
        self.armed = false;
    }
}

impl fmt::Debug for PollHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollHandle")
            .field("id", &self.id)
            .field("armed", &self.armed)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if self.armed {
            self.cancel.cancel();
        }
    }
}

struct ActiveLoop {
    seq: u64,
    cancel: CancellationToken,
}

/// Runs one bounded, cancellable status loop per job id.
pub struct StatusPoller {
    api: Arc<dyn GenerationApi>,
    store: GenerationStore,
    history: Arc<HistoryFetcher>,
    config: PollConfig,
    active: Mutex<HashMap<GenerationId, ActiveLoop>>,
    next_seq: AtomicU64,
}

impl StatusPoller {
    pub fn new(
        api: Arc<dyn GenerationApi>,
        store: GenerationStore,
        history: Arc<HistoryFetcher>,
        config: PollConfig,
    ) -> Self {
        Self {
            api,
            store,
            history,
            config,
            active: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    fn active(&self) -> MutexGuard<'_, HashMap<GenerationId, ActiveLoop>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn is_polling(&self, id: &GenerationId) -> bool {
        self.active().contains_key(id)
    }

    pub fn active_count(&self) -> usize {
        self.active().len()
    }

    /// Cancels the loop for `id`, if any. Returns whether one was running.
    pub fn cancel(&self, id: &GenerationId) -> bool {
        match self.active().remove(id) {
            Some(running) => {
                running.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let running: Vec<ActiveLoop> = self.active().drain().map(|(_, l)| l).collect();
        for active_loop in running {
            active_loop.cancel.cancel();
        }
    }

    /// Starts polling a stored, non-terminal generation on the tokio runtime.
    pub fn start(self: &Arc<Self>, id: GenerationId, token: AuthToken) -> Result<PollHandle> {
        let current = self
            .store
            .get(&id)
            .ok_or_else(|| ToonifyError::NotFoundError(id.to_string()))?;
        if current.is_terminal() {
            return Err(ToonifyError::InvalidTransitionError(format!(
                "{} is already {}",
                id, current.status
            )));
        }

        let cancel = CancellationToken::new();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        {
            let mut active = self.active();
            if active.contains_key(&id) {
                return Err(ToonifyError::AlreadyPollingError(id.to_string()));
            }
            active.insert(
                id.clone(),
                ActiveLoop {
                    seq,
                    cancel: cancel.clone(),
                },
            );
        }

        log::info!(
            "Polling generation {} every {}ms (max {} attempts)",
            id,
            self.config.interval.as_millis(),
            self.config.max_attempts
        );

        let poller = Arc::clone(self);
        let task_id = id.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let outcome = poller.run(&task_id, &token, &task_cancel).await;
            poller.release(&task_id, seq);
            log::info!("Generation {} finished polling: {}", task_id, outcome.state_name());
            outcome
        });

        Ok(PollHandle {
            id,
            cancel,
            task,
            armed: true,
        })
    }

    /// Drops the registry entry unless a newer loop for the same id owns it.
    fn release(&self, id: &GenerationId, seq: u64) {
        let mut active = self.active();
        if active.get(id).map(|l| l.seq) == Some(seq) {
            active.remove(id);
        }
    }

    /// The loop itself. Sleeps one interval, queries once, repeats.
    /// Store writes only happen while `cancel` has not fired.
    pub async fn run(
        &self,
        id: &GenerationId,
        token: &AuthToken,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let mut attempts: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = tokio::time::sleep(self.config.interval) => {}
            }

            attempts += 1;
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                polled = self.api.poll(id, token) => polled,
            };
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }

            let response = match polled {
                Ok(response) => response,
                Err(e) => {
                    log::error!("Status check {} for {} failed: {}", attempts, id, e);
                    return PollOutcome::PollError {
                        message: e.to_string(),
                    };
                }
            };
            log::debug!(
                "Status check {}/{} for {}: {}",
                attempts,
                self.config.max_attempts,
                id,
                response.status
            );

            if let Some(outcome) = self.apply(id, response) {
                if outcome.is_complete() {
                    self.refresh_history(token, cancel).await;
                }
                return outcome;
            }

            if attempts >= self.config.max_attempts {
                log::warn!("Generation {} timed out after {} attempts", id, attempts);
                return PollOutcome::TimedOut { attempts };
            }
        }
    }

    /// Writes one poll response to the store. `None` means keep polling.
    fn apply(&self, id: &GenerationId, response: PollResponse) -> Option<PollOutcome> {
        let PollResponse {
            status,
            cartoon_image_url,
            error_message,
        } = response;

        let outcome = match status {
            GenerationStatus::Pending => return None,
            GenerationStatus::Processing => {
                return match self.store.update_status(id, status, None) {
                    Ok(_) => None,
                    Err(e) => Some(store_failure(e)),
                };
            }
            GenerationStatus::Complete => match cartoon_image_url {
                Some(url) if !url.trim().is_empty() => PollOutcome::Complete {
                    cartoon_image_url: url,
                },
                _ => {
                    return Some(PollOutcome::PollError {
                        message: format!("{} reported complete without a cartoon image url", id),
                    })
                }
            },
            GenerationStatus::Failed => PollOutcome::Failed {
                message: error_message,
            },
            GenerationStatus::NotFound => PollOutcome::NotFound,
        };

        let url = match &outcome {
            PollOutcome::Complete { cartoon_image_url } => Some(cartoon_image_url.clone()),
            _ => None,
        };
        match self.store.update_status(id, status, url) {
            Ok(_) => Some(outcome),
            // A history refresh may have recorded the same terminal status first.
            Err(ToonifyError::InvalidTransitionError(_))
                if self.store.get(id).map(|g| g.status) == Some(status) =>
            {
                Some(outcome)
            }
            Err(e) => Some(store_failure(e)),
        }
    }

    async fn refresh_history(&self, token: &AuthToken, cancel: &CancellationToken) {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {}
            refreshed = self.history.refresh(Some(token)) => {
                if let Err(e) = refreshed {
                    log::warn!("History refresh after completion failed: {}", e);
                }
            }
        }
    }
}

fn store_failure(err: ToonifyError) -> PollOutcome {
    log::error!("Could not record poll result: {}", err);
    PollOutcome::PollError {
        message: err.to_string(),
    }
}
