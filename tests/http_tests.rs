// Integration tests for the HTTP control surface
//
// The router is exercised in-process with tower's oneshot; no listener is
// bound. State is built without a NATS connection, so sessions run with the
// log notifier and no bus bridge.

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use meeting_recorder::config::RecordingConfig;
use meeting_recorder::{create_router, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

fn test_recording_config(temp_dir: &TempDir) -> RecordingConfig {
    RecordingConfig {
        output_dir: temp_dir.path().to_string_lossy().into_owned(),
        sample_rate: 1000,
        channels: 1,
        watchdog_interval_secs: 10,
        idle_warning_secs: 60,
        checkpoint_interval_secs: 60,
        duration_gap_tolerance_secs: 30,
        keep_last_checkpoint: false,
    }
}

async fn send(state: &AppState, request: Request<Body>) -> axum::response::Response {
    create_router(state.clone()).oneshot(request).await.unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let state = AppState::new(test_recording_config(&temp_dir));

    let response = send(&state, get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_status_for_unknown_meeting_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let state = AppState::new(test_recording_config(&temp_dir));

    let response = send(&state, get("/meetings/no-such-meeting/status")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("no-such-meeting"));
}

#[tokio::test]
async fn test_stop_without_start_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let state = AppState::new(test_recording_config(&temp_dir));

    let response = send(
        &state,
        post_json("/meetings/record/stop/no-such-meeting", "{}"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_status_stop_flow() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let state = AppState::new(test_recording_config(&temp_dir));

    // Start a named meeting.
    let response = send(
        &state,
        post_json("/meetings/record/start", r#"{"meeting_id":"http-test"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["meeting_id"], "http-test");
    assert_eq!(body["status"], "recording");

    // The session shows up in status with no audio yet.
    let response = send(&state, get("/meetings/http-test/status")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["phase"], "recording");
    assert_eq!(status["participant_count"], 0);
    assert_eq!(status["frames_received"], 0);
    assert_eq!(status["checkpoint_count"], 0);

    // Stopping with nothing captured reports "empty" and no artifact.
    let response = send(&state, post_json("/meetings/record/stop/http-test", "{}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "empty");
    assert!(body["artifact"].is_null());

    // The meeting is gone from the registry.
    let response = send(&state, get("/meetings/http-test/status")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_starting_the_same_meeting_twice_conflicts() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let state = AppState::new(test_recording_config(&temp_dir));

    let response = send(
        &state,
        post_json("/meetings/record/start", r#"{"meeting_id":"twice"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &state,
        post_json("/meetings/record/start", r#"{"meeting_id":"twice"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("already recording"));

    Ok(())
}

#[tokio::test]
async fn test_start_generates_a_meeting_id_when_absent() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let state = AppState::new(test_recording_config(&temp_dir));

    let response = send(&state, post_json("/meetings/record/start", "{}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let meeting_id = body["meeting_id"].as_str().unwrap().to_string();
    assert!(meeting_id.starts_with("meeting-"));

    // The generated id is routable.
    let response = send(&state, get(&format!("/meetings/{}/status", meeting_id))).await;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}
