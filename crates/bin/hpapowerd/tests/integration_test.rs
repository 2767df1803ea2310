//! End-to-end tests for the full hpapowerd stack.
//!
//! Each test wires the virtual actuator, the real store, the real control
//! transaction and the real axum router over the shipped `htdocs/`, and
//! exercises the HTTP layer via `tower::ServiceExt::oneshot`. No TCP port is
//! bound.

use std::convert::Infallible;
use std::path::PathBuf;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use hpapower_adapter_http_axum::router;
use hpapower_adapter_http_axum::state::AppState;
use hpapower_adapter_virtual::{VirtualActuator, VirtualLine};
use hpapower_app::services::actuator_store::ActuatorStore;
use hpapower_app::services::transaction::ControlEndpoint;
use hpapower_domain::power::PowerState;
use tower::ServiceExt;

const CONTROL: &str = "/hpa_power_set";
const FORM: &str = "application/x-www-form-urlencoded";

struct Daemon {
    app: Router,
    store: ActuatorStore<VirtualActuator>,
    line: VirtualLine,
}

fn htdocs() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../../htdocs")
}

/// Bring up a fresh daemon the way `main` does, minus the listener.
fn daemon() -> Daemon {
    let driver = VirtualActuator::default();
    let line = driver.line();
    let store = ActuatorStore::start(driver).expect("virtual actuator should start");
    let state = AppState::new(store.clone(), ControlEndpoint::default(), htdocs());
    Daemon {
        app: router::build(state),
        store,
        line,
    }
}

fn post(content_type: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(CONTROL)
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn chunked(chunks: Vec<&'static str>) -> Body {
    Body::from_stream(tokio_stream::iter(
        chunks.into_iter().map(Ok::<_, Infallible>),
    ))
}

async fn reported_state(app: &Router, request: Request<Body>) -> bool {
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert!(response.headers().get(CONTENT_LENGTH).is_none());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    body["state"].as_bool().unwrap()
}

async fn submit(app: &Router, form: &'static str) -> bool {
    reported_state(app, post(FORM, Body::from(form))).await
}

// ---------------------------------------------------------------------------
// Control endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_start_de_energized_before_serving() {
    let daemon = daemon();

    assert!(daemon.line.is_initialized());
    assert_eq!(daemon.line.level(), Some(false));
    assert!(!reported_state(&daemon.app, get(CONTROL)).await);
}

#[tokio::test]
async fn should_report_state_after_each_submission() {
    let daemon = daemon();

    assert!(submit(&daemon.app, "state=on").await);
    assert_eq!(daemon.line.level(), Some(true));

    assert!(!submit(&daemon.app, "state=off").await);
    assert_eq!(daemon.line.level(), Some(false));
}

#[tokio::test]
async fn should_be_idempotent_for_repeated_on() {
    let daemon = daemon();

    assert!(submit(&daemon.app, "state=on").await);
    assert!(submit(&daemon.app, "state=on").await);

    assert_eq!(daemon.store.get(), PowerState::On);
    assert_eq!(daemon.line.history(), vec![false, true, true]);
    assert_eq!(daemon.line.applied(), 3);
}

#[tokio::test]
async fn should_keep_state_for_unrecognised_value() {
    let daemon = daemon();
    submit(&daemon.app, "state=on").await;

    assert!(submit(&daemon.app, "state=banana").await);
    assert!(submit(&daemon.app, "state=ON").await);
    assert!(submit(&daemon.app, "state=").await);
    assert_eq!(daemon.line.history(), vec![false, true]);
}

#[tokio::test]
async fn should_keep_state_when_field_is_absent() {
    let daemon = daemon();
    submit(&daemon.app, "state=on").await;

    assert!(submit(&daemon.app, "other=off").await);
    assert!(reported_state(&daemon.app, post(FORM, Body::empty())).await);
    assert_eq!(daemon.store.get(), PowerState::On);
}

#[tokio::test]
async fn should_decode_form_split_across_frames() {
    let daemon = daemon();

    let body = chunked(vec!["sta", "te=o", "n"]);
    assert!(reported_state(&daemon.app, post(FORM, body)).await);

    let body = chunked(vec!["state=%6", "F%66", "%66"]);
    assert!(!reported_state(&daemon.app, post(FORM, body)).await);
}

#[tokio::test]
async fn should_decode_multipart_split_across_frames() {
    let daemon = daemon();
    let body = chunked(vec![
        "--frontier\r\nContent-Disposition: form-da",
        "ta; name=\"state\"\r\n\r\no",
        "n\r\n--fron",
        "tier--\r\n",
    ]);

    let state = reported_state(
        &daemon.app,
        post("multipart/form-data; boundary=frontier", body),
    )
    .await;

    assert!(state);
    assert_eq!(daemon.line.level(), Some(true));
}

#[tokio::test]
async fn should_drop_stream_and_keep_state_for_oversized_field() {
    let daemon = daemon();
    let body = format!("state={}", "x".repeat(4096));

    let response = daemon
        .app
        .clone()
        .oneshot(post(FORM, Body::from(body)))
        .await
        .unwrap();

    assert!(response.into_body().collect().await.is_err());
    assert_eq!(daemon.store.get(), PowerState::Off);
    assert!(!reported_state(&daemon.app, get(CONTROL)).await);
}

#[tokio::test]
async fn should_force_line_off_on_shutdown() {
    let daemon = daemon();
    submit(&daemon.app, "state=on").await;

    daemon.store.force_safe().unwrap();

    assert_eq!(daemon.line.level(), Some(false));
    assert_eq!(daemon.store.get(), PowerState::Off);
}

#[tokio::test]
async fn should_not_carry_state_into_a_fresh_instance() {
    let first = daemon();
    submit(&first.app, "state=on").await;

    let second = daemon();

    assert!(!reported_state(&second.app, get(CONTROL)).await);
}

// ---------------------------------------------------------------------------
// Static page
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_serve_index_page_for_root() {
    let daemon = daemon();

    let response = daemon.app.clone().oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec(),
    )
    .unwrap();
    assert!(body.contains("index-script.js"));
}

#[tokio::test]
async fn should_serve_page_script() {
    let daemon = daemon();

    let response = daemon
        .app
        .clone()
        .oneshot(get("/index-script.js"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = String::from_utf8(
        response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec(),
    )
    .unwrap();
    assert!(body.contains(CONTROL));
}

#[tokio::test]
async fn should_return_not_found_for_unknown_path() {
    let daemon = daemon();

    let response = daemon
        .app
        .clone()
        .oneshot(get("/hpa_power_get"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn should_add_security_headers_to_control_responses() {
    let daemon = daemon();

    let response = daemon.app.clone().oneshot(get(CONTROL)).await.unwrap();

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}
