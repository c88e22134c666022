//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::time::Instant;
use toonify::{
    AuthToken, DeleteResponse, Generation, GenerationApi, GenerationId, GenerationStatus,
    ImageSource, PollResponse, Result, SubmitRequest, SubmitResponse,
    ToonifyClient, ToonifyConfig, ToonifyError,
};

/// In-memory service with queued responses and call counters.
#[derive(Default)]
pub struct ScriptedApi {
    submits: Mutex<VecDeque<Result<SubmitResponse>>>,
    polls: Mutex<HashMap<GenerationId, VecDeque<Result<PollResponse>>>>,
    histories: Mutex<VecDeque<Result<Vec<Generation>>>>,
    deletes: Mutex<VecDeque<Result<DeleteResponse>>>,
    poll_latency: Mutex<Duration>,
    pub submitted: Mutex<Vec<SubmitRequest>>,
    pub poll_times: Mutex<Vec<(GenerationId, Instant)>>,
    pub submit_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_submit(&self, response: Result<SubmitResponse>) {
        self.submits.lock().unwrap().push_back(response);
    }

    pub fn push_polls(&self, id: &str, responses: Vec<Result<PollResponse>>) {
        self.polls
            .lock()
            .unwrap()
            .entry(GenerationId::new(id))
            .or_default()
            .extend(responses);
    }

    pub fn push_history(&self, response: Result<Vec<Generation>>) {
        self.histories.lock().unwrap().push_back(response);
    }

    pub fn push_delete(&self, response: Result<DeleteResponse>) {
        self.deletes.lock().unwrap().push_back(response);
    }

    pub fn set_poll_latency(&self, latency: Duration) {
        *self.poll_latency.lock().unwrap() = latency;
    }

    pub fn submit_count(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn history_count(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn polls_for(&self, id: &str) -> Vec<Instant> {
        self.poll_times
            .lock()
            .unwrap()
            .iter()
            .filter(|(polled, _)| polled.as_str() == id)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl GenerationApi for ScriptedApi {
    async fn submit(&self, request: SubmitRequest, _token: &AuthToken) -> Result<SubmitResponse> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(request);
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ToonifyError::TransportError("no scripted submit".into())))
    }

    async fn poll(&self, job_id: &GenerationId, _token: &AuthToken) -> Result<PollResponse> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.poll_times
            .lock()
            .unwrap()
            .push((job_id.clone(), Instant::now()));

        let latency = *self.poll_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.polls
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Ok(PollResponse::with_status(GenerationStatus::Processing)))
    }

    async fn history(&self, _token: &AuthToken) -> Result<Vec<Generation>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.histories
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn delete(&self, _job_id: &GenerationId, _token: &AuthToken) -> Result<DeleteResponse> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.deletes.lock().unwrap().pop_front().unwrap_or(Ok(DeleteResponse {
            success: true,
            message: None,
        }))
    }
}

pub fn client(api: &Arc<ScriptedApi>) -> ToonifyClient {
    ToonifyClient::with_api(ToonifyConfig::default(), api.clone())
        .expect("default config is valid")
}

pub fn token() -> AuthToken {
    AuthToken::new("test-token")
}

pub fn photo() -> ImageSource {
    ImageSource::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]).with_file_name("me.jpg")
}

pub fn stored(id: &str, status: GenerationStatus, minutes: i64) -> Generation {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
        + chrono::Duration::minutes(minutes);
    let mut generation =
        Generation::pending(id.into(), format!("https://cdn/{}.jpg", id), created_at);
    generation.status = status;
    if status == GenerationStatus::Complete {
        generation.cartoon_image_url = Some(format!("https://cdn/{}_toon.png", id));
    }
    generation
}

pub fn processing() -> Result<PollResponse> {
    Ok(PollResponse::with_status(GenerationStatus::Processing))
}
