//! Integration tests for history reconciliation and deletion.

mod common;

use std::time::Duration;

use common::{client, photo, stored, token, ScriptedApi};
use futures::StreamExt;
use toonify::{
    DeleteResponse, GenerationId, GenerationStatus, StoreEvent, SubmitResponse, ToonifyError,
    Variant,
};

#[tokio::test]
async fn refresh_fills_the_store_newest_first() {
    let api = ScriptedApi::new();
    api.push_history(Ok(vec![
        stored("old", GenerationStatus::Complete, 0),
        stored("new", GenerationStatus::Failed, 20),
        stored("mid", GenerationStatus::Complete, 10),
    ]));
    let client = client(&api);

    let fetched = client.refresh_history(Some(&token())).await.unwrap();

    assert_eq!(fetched, 3);
    let ids: Vec<String> = client
        .store()
        .list()
        .iter()
        .map(|g| g.id.to_string())
        .collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
    assert_eq!(client.store().list(), client.store().list());
    assert_eq!(client.last_history_error(), None);
}

#[tokio::test]
async fn refresh_without_token_is_a_no_op() {
    let api = ScriptedApi::new();
    let client = client(&api);
    client
        .store()
        .insert(stored("kept", GenerationStatus::Complete, 0))
        .unwrap();

    assert_eq!(client.refresh_history(None).await.unwrap(), 0);
    assert_eq!(api.history_count(), 0);
    assert_eq!(client.store().len(), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_contents() {
    let api = ScriptedApi::new();
    api.push_history(Ok(vec![stored("a", GenerationStatus::Complete, 0)]));
    api.push_history(Err(ToonifyError::TransportError("offline".into())));
    api.push_history(Ok(vec![
        stored("a", GenerationStatus::Complete, 0),
        stored("b", GenerationStatus::Complete, 5),
    ]));
    let client = client(&api);

    client.refresh_history(Some(&token())).await.unwrap();
    let before = client.store().list();

    let err = client.refresh_history(Some(&token())).await.unwrap_err();
    assert!(matches!(err, ToonifyError::TransportError(_)));
    assert_eq!(client.store().list(), before);
    let indicator = client.last_history_error().expect("error should be kept");
    assert!(indicator.contains("offline"));

    client.refresh_history(Some(&token())).await.unwrap();
    assert_eq!(client.store().len(), 2);
    assert_eq!(client.last_history_error(), None);
}

#[tokio::test]
async fn refresh_keeps_submissions_the_service_has_not_listed_yet() {
    let api = ScriptedApi::new();
    api.push_submit(Ok(SubmitResponse::accepted("fresh")));
    api.push_history(Ok(vec![stored("older", GenerationStatus::Complete, 0)]));
    let client = client(&api);

    client
        .submit(Some(&photo()), Variant::Ghiblix, Some(&token()))
        .await
        .unwrap();
    client.refresh_history(Some(&token())).await.unwrap();

    assert!(client.store().contains(&GenerationId::new("fresh")));
    assert!(client.store().contains(&GenerationId::new("older")));
}

#[tokio::test]
async fn stale_history_never_moves_a_record_backwards() {
    let api = ScriptedApi::new();
    api.push_history(Ok(vec![
        stored("running", GenerationStatus::Pending, 0),
        stored("done", GenerationStatus::Failed, 5),
    ]));
    let client = client(&api);
    client
        .store()
        .insert(stored("running", GenerationStatus::Processing, 0))
        .unwrap();
    client
        .store()
        .insert(stored("done", GenerationStatus::Complete, 5))
        .unwrap();

    client.refresh_history(Some(&token())).await.unwrap();

    let running = client.store().get(&GenerationId::new("running")).unwrap();
    assert_eq!(running.status, GenerationStatus::Processing);
    let done = client.store().get(&GenerationId::new("done")).unwrap();
    assert_eq!(done.status, GenerationStatus::Complete);
    assert_eq!(
        done.cartoon_image_url.as_deref(),
        Some("https://cdn/done_toon.png")
    );
}

#[tokio::test]
async fn delete_failure_keeps_the_record() {
    let api = ScriptedApi::new();
    api.push_delete(Err(ToonifyError::TransportError("503".into())));
    api.push_delete(Ok(DeleteResponse {
        success: false,
        message: Some("generation is locked".into()),
    }));
    let client = client(&api);
    let id = GenerationId::new("keep-me");
    client
        .store()
        .insert(stored("keep-me", GenerationStatus::Complete, 0))
        .unwrap();

    let err = client.delete(&id, Some(&token())).await.unwrap_err();
    assert!(matches!(err, ToonifyError::TransportError(_)));
    assert!(client.store().contains(&id));

    let err = client.delete(&id, Some(&token())).await.unwrap_err();
    assert_eq!(
        err,
        ToonifyError::DeleteRejectedError("generation is locked".into())
    );
    assert_eq!(err.to_string(), "Delete rejected: generation is locked");
    assert!(client.store().contains(&id));
    assert_eq!(api.delete_count(), 2);
}

#[tokio::test]
async fn confirmed_delete_removes_the_record() {
    let api = ScriptedApi::new();
    let client = client(&api);
    let id = GenerationId::new("bye");
    client
        .store()
        .insert(stored("bye", GenerationStatus::Failed, 0))
        .unwrap();
    let mut events = client.store().subscribe();

    let removed = client.delete(&id, Some(&token())).await.unwrap();

    assert_eq!(removed.id, id);
    assert!(client.store().is_empty());
    assert_eq!(events.next().await, Some(StoreEvent::Removed(id)));
}

#[tokio::test]
async fn delete_checks_token_and_presence_before_calling_the_service() {
    let api = ScriptedApi::new();
    let client = client(&api);
    client
        .store()
        .insert(stored("x", GenerationStatus::Complete, 0))
        .unwrap();

    assert!(matches!(
        client.delete(&GenerationId::new("x"), None).await,
        Err(ToonifyError::AuthError(_))
    ));
    assert!(matches!(
        client.delete(&GenerationId::new("nope"), Some(&token())).await,
        Err(ToonifyError::NotFoundError(_))
    ));
    assert_eq!(api.delete_count(), 0);
    assert_eq!(client.store().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn deleting_a_tracked_generation_stops_its_loop() {
    let api = ScriptedApi::new();
    api.push_submit(Ok(SubmitResponse::accepted("busy")));
    let client = client(&api);

    let (generation, handle) = client
        .submit_and_track(Some(&photo()), Variant::Comic, Some(&token()))
        .await
        .unwrap();
    handle.detach();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(api.poll_count(), 1);

    client.delete(&generation.id, Some(&token())).await.unwrap();
    assert!(!client.is_tracking(&generation.id));

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(api.poll_count(), 1);
    assert!(client.store().is_empty());
}
