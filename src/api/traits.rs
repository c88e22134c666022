use crate::{
    error::Result,
    models::{
        AuthToken, DeleteResponse, Generation, GenerationId, PollResponse, SubmitRequest,
        SubmitResponse,
    },
};
use async_trait::async_trait;

/// Remote side of the generation workflow.
///
/// Implementations must not retry on their own; retry policy belongs to the
/// callers.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    async fn submit(&self, request: SubmitRequest, token: &AuthToken) -> Result<SubmitResponse>;

    async fn poll(&self, job_id: &GenerationId, token: &AuthToken) -> Result<PollResponse>;

    async fn history(&self, token: &AuthToken) -> Result<Vec<Generation>>;

    async fn delete(&self, job_id: &GenerationId, token: &AuthToken) -> Result<DeleteResponse>;
}
