pub mod history;
pub mod poller;
pub mod submitter;

use crate::{
    api::{GenerationApi, HttpGenerationApi},
    config::ToonifyConfig,
    error::{Result, ToonifyError},
    models::{require_token, AuthToken, Generation, GenerationId, ImageSource, Variant},
    store::GenerationStore,
};
use std::sync::Arc;

pub use history::HistoryFetcher;
pub use poller::{PollHandle, PollOutcome, StatusPoller};
pub use submitter::JobSubmitter;

/// Entry point wiring the submitter, poller and history fetcher around one
/// shared [`GenerationStore`].
#[derive(Clone)]
pub struct ToonifyClient {
    config: ToonifyConfig,
    api: Arc<dyn GenerationApi>,
    store: GenerationStore,
    submitter: JobSubmitter,
    history: Arc<HistoryFetcher>,
    poller: Arc<StatusPoller>,
}

impl ToonifyClient {
    /// Client talking HTTP to `config.api_url` with a fresh store.
    pub fn new(config: ToonifyConfig) -> Result<Self> {
        let api = HttpGenerationApi::new(&config)?;
        Self::from_parts(config, Arc::new(api), GenerationStore::new())
    }

    /// Client over any [`GenerationApi`] with a fresh store.
    pub fn with_api(config: ToonifyConfig, api: Arc<dyn GenerationApi>) -> Result<Self> {
        Self::from_parts(config, api, GenerationStore::new())
    }

    pub fn from_parts(
        config: ToonifyConfig,
        api: Arc<dyn GenerationApi>,
        store: GenerationStore,
    ) -> Result<Self> {
        config.validate()?;

        let history = Arc::new(HistoryFetcher::new(api.clone(), store.clone()));
        let poller = Arc::new(StatusPoller::new(
            api.clone(),
            store.clone(),
            history.clone(),
            config.poll.clone(),
        ));

        Ok(Self {
            submitter: JobSubmitter::new(api.clone(), store.clone()),
            config,
            api,
            store,
            history,
            poller,
        })
    }

    pub fn config(&self) -> &ToonifyConfig {
        &self.config
    }

    pub fn store(&self) -> &GenerationStore {
        &self.store
    }

    pub async fn submit(
        &self,
        image: Option<&ImageSource>,
        variant: Variant,
        token: Option<&AuthToken>,
    ) -> Result<Generation> {
        self.submitter.submit(image, variant, token).await
    }

    /// Submits and immediately starts polling the new job.
    pub async fn submit_and_track(
        &self,
        image: Option<&ImageSource>,
        variant: Variant,
        token: Option<&AuthToken>,
    ) -> Result<(Generation, PollHandle)> {
        let generation = self.submitter.submit(image, variant, token).await?;
        let handle = self.track(&generation.id, token)?;
        Ok((generation, handle))
    }

    /// Starts polling an existing, unfinished generation.
    pub fn track(&self, id: &GenerationId, token: Option<&AuthToken>) -> Result<PollHandle> {
        let token = require_token(token)?;
        self.poller.start(id.clone(), token.clone())
    }

    pub fn is_tracking(&self, id: &GenerationId) -> bool {
        self.poller.is_polling(id)
    }

    pub fn cancel(&self, id: &GenerationId) -> bool {
        self.poller.cancel(id)
    }

    pub fn cancel_all(&self) {
        self.poller.cancel_all();
    }

    pub async fn refresh_history(&self, token: Option<&AuthToken>) -> Result<usize> {
        self.history.refresh(token).await
    }

    pub fn last_history_error(&self) -> Option<String> {
        self.history.last_error()
    }

    /// Deletes remotely, then locally. The store keeps the record unless the
    /// service confirms the delete.
    pub async fn delete(&self, id: &GenerationId, token: Option<&AuthToken>) -> Result<Generation> {
        let token = require_token(token)?;
        if !self.store.contains(id) {
            return Err(ToonifyError::NotFoundError(id.to_string()));
        }

        let response = self.api.delete(id, token).await.map_err(|e| {
            log::error!("Delete of {} failed: {}", id, e);
            e
        })?;
        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| format!("service refused to delete {}", id));
            log::warn!("Delete of {} rejected: {}", id, message);
            return Err(ToonifyError::DeleteRejectedError(message));
        }

        self.poller.cancel(id);
        let removed = self.store.remove(id)?;
        log::info!("Generation {} deleted", id);
        Ok(removed)
    }
}
