use crate::{
    api::GenerationApi,
    error::{Result, ToonifyError},
    models::{
        require_token, AuthToken, Generation, GenerationStatus, ImageSource, SubmitRequest, Variant,
    },
    store::GenerationStore,
};
use chrono::Utc;
use std::sync::Arc;

/// Sends photos to the generation service and records the new job.
#[derive(Clone)]
pub struct JobSubmitter {
    api: Arc<dyn GenerationApi>,
    store: GenerationStore,
}

impl JobSubmitter {
    pub fn new(api: Arc<dyn GenerationApi>, store: GenerationStore) -> Self {
        Self { api, store }
    }

    /// Submits `image` for `variant` and inserts a `pending` record.
    ///
    /// Input and auth problems are reported before any network call. Nothing
    /// is stored unless the service hands back a job id.
    pub async fn submit(
        &self,
        image: Option<&ImageSource>,
        variant: Variant,
        token: Option<&AuthToken>,
    ) -> Result<Generation> {
        let image = match image {
            Some(image) if !image.is_empty() => image,
            Some(_) => {
                return Err(ToonifyError::InvalidInputError(
                    "Selected image is empty".into(),
                ))
            }
            None => return Err(ToonifyError::InvalidInputError("No image selected".into())),
        };
        let token = require_token(token)?;

        let response = self
            .api
            .submit(SubmitRequest::new(image, variant), token)
            .await?;

        let job_id = response
            .job_id
            .filter(|id| !id.is_blank())
            .ok_or_else(|| ToonifyError::ProtocolError("Submit response has no job id".into()))?;
        if response.status != GenerationStatus::Pending {
            log::debug!(
                "Service reported {} for new job {}, tracking as pending",
                response.status,
                job_id
            );
        }

        let original_image_url = response
            .original_image_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| image.local_reference());
        let generation = Generation::pending(
            job_id,
            original_image_url,
            response.created_at.unwrap_or_else(Utc::now),
        )
        .with_credits_used(response.credits_used);

        self.store.insert(generation.clone())?;
        log::info!("Generation {} submitted ({})", generation.id, variant);
        Ok(generation)
    }
}
