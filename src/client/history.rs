use crate::{
    api::GenerationApi,
    error::Result,
    models::AuthToken,
    store::GenerationStore,
};
use std::sync::{Arc, Mutex};

/// Reconciles the store with the remote generation history.
pub struct HistoryFetcher {
    api: Arc<dyn GenerationApi>,
    store: GenerationStore,
    last_error: Mutex<Option<String>>,
}

impl HistoryFetcher {
    pub fn new(api: Arc<dyn GenerationApi>, store: GenerationStore) -> Self {
        Self {
            api,
            store,
            last_error: Mutex::new(None),
        }
    }

    /// Fetches the history and merges it into the store, returning how many
    /// records the service reported.
    ///
    /// Without a token there is nothing to show, so this succeeds with `0`
    /// and leaves the store alone. On failure the store is untouched and the
    /// message stays available through [`HistoryFetcher::last_error`].
    pub async fn refresh(&self, token: Option<&AuthToken>) -> Result<usize> {
        let token = match token {
            Some(token) if !token.is_blank() => token,
            _ => {
                log::debug!("Skipping history refresh: not signed in");
                return Ok(0);
            }
        };

        match self.api.history(token).await {
            Ok(generations) => {
                let fetched = generations.len();
                let stored = self.store.replace_all(generations);
                self.set_last_error(None);
                log::info!("History refreshed: {} fetched, {} stored", fetched, stored);
                Ok(fetched)
            }
            Err(e) => {
                log::warn!("History refresh failed: {}", e);
                self.set_last_error(Some(e.to_string()));
                Err(e)
            }
        }
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set_last_error(&self, error: Option<String>) {
        let mut guard = self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = error;
    }
}
