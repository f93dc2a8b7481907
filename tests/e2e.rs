//! End-to-end tests against a mock `/predict` service.
//!
//! Every test starts its own wiremock server, so they run offline and in
//! parallel:
//!
//!   cargo test --test e2e -- --nocapture

use cheque_ocr_client::{
    dispatch, submit_file, ChannelTrigger, ChequePrediction, ClientConfig, CommandTrigger,
    HandlerState, MemorySink, PathSelection, SinkEvent, SubmissionHandler, SubmitError,
};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

const IMAGE: &[u8] = b"\xff\xd8\xff\xe0 fake jpeg bytes \x00\x01\x02";

fn image_file() -> NamedTempFile {
    let mut f = tempfile::Builder::new()
        .prefix("cheque_")
        .suffix(".jpg")
        .tempfile()
        .expect("temp file");
    f.write_all(IMAGE).expect("write image");
    f
}

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::builder()
        .endpoint(server.uri())
        .build()
        .expect("valid config")
}

fn handler_for(server: &MockServer, selection: &PathSelection) -> SubmissionHandler {
    SubmissionHandler::http(config_for(server), Arc::new(selection.clone())).expect("http handler")
}

async fn mount_json(server: &MockServer, body: serde_json::Value, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
        .mount(server)
        .await;
}

async fn received(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap_or_default()
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    count(haystack, needle) > 0
}

// ── P1 / P6: no file selected ────────────────────────────────────────────────

#[tokio::test]
async fn no_file_alerts_without_request() {
    let server = MockServer::start().await;
    mount_json(&server, json!({}), Duration::ZERO).await;
    let sink = MemorySink::new();

    let result = submit_file(None, &config_for(&server), &sink).await;

    assert!(matches!(result, Err(SubmitError::NoFileSelected)));
    assert_eq!(sink.events(), vec![SinkEvent::Alert("Choose an image first".into())]);
    assert!(received(&server).await.is_empty(), "no request may be issued");
}

#[tokio::test]
async fn cleared_selection_behaves_like_no_file() {
    let server = MockServer::start().await;
    mount_json(&server, json!({"result": "OK"}), Duration::ZERO).await;
    let file = image_file();
    let selection = PathSelection::with_path(file.path());
    let handler = handler_for(&server, &selection);
    let sink = MemorySink::new();

    assert_ok!(handler.submit(&sink).await);
    selection.clear();
    let err = assert_err!(handler.submit(&sink).await);

    assert!(matches!(err, SubmitError::NoFileSelected));
    assert_eq!(sink.alerts(), vec!["Choose an image first"]);
    assert_eq!(received(&server).await.len(), 1, "stale file must not be resent");
}

// ── P2: placeholder before the response ──────────────────────────────────────

#[tokio::test]
async fn placeholder_shown_while_in_flight() {
    let server = MockServer::start().await;
    mount_json(&server, json!({"result": "OK"}), Duration::from_millis(300)).await;
    let file = image_file();
    let handler = handler_for(&server, &PathSelection::with_path(file.path()));
    let sink = MemorySink::new();

    let submit = handler.submit(&sink);
    let observe = async {
        while handler.state() != HandlerState::InFlight || sink.texts().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(sink.texts(), vec!["Processing…"]);
    };
    let (result, ()) = tokio::join!(submit, observe);

    assert_ok!(result);
    assert_eq!(sink.texts().len(), 2);
    assert_eq!(handler.state(), HandlerState::Idle);
}

// ── P3: wire format ──────────────────────────────────────────────────────────

#[tokio::test]
async fn posts_one_multipart_part_named_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    let file = image_file();
    let sink = MemorySink::new();

    assert_ok!(submit_file(Some(file.path()), &config_for(&server), &sink).await);

    let requests = received(&server).await;
    assert_eq!(requests.len(), 1);
    let req = &requests[0];

    let content_type = req
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"), "got {content_type}");

    assert_eq!(count(&req.body, b"Content-Disposition: form-data;"), 1, "exactly one part");
    assert!(contains(&req.body, b"name=\"file\""));
    assert!(contains(&req.body, IMAGE), "part must carry the file bytes verbatim");

    let name = file.path().file_name().unwrap().to_string_lossy().into_owned();
    assert!(contains(&req.body, format!("filename=\"{name}\"").as_bytes()));
}

// ── P4: rendering ────────────────────────────────────────────────────────────

#[tokio::test]
async fn renders_two_space_json_in_received_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"result": "OK", "confidence": 0.97}"#, "application/json"),
        )
        .mount(&server)
        .await;
    let file = image_file();
    let sink = MemorySink::new();

    let done = assert_ok!(submit_file(Some(file.path()), &config_for(&server), &sink).await);

    let expected = "{\n  \"result\": \"OK\",\n  \"confidence\": 0.97\n}";
    assert_eq!(done.rendered, expected);
    assert_eq!(sink.texts(), vec!["Processing…".to_string(), expected.to_string()]);
    assert!(sink.alerts().is_empty());
}

// ── P5: re-trigger race ──────────────────────────────────────────────────────

#[tokio::test]
async fn double_trigger_runs_two_requests() {
    let server = MockServer::start().await;
    mount_json(&server, json!({"result": "OK"}), Duration::from_millis(200)).await;
    let file = image_file();
    let handler = handler_for(&server, &PathSelection::with_path(file.path()));
    let sink = MemorySink::new();
    let (fire, mut triggers) = ChannelTrigger::new();

    assert!(fire.fire());
    assert!(fire.fire());
    drop(fire);

    let summary = dispatch(&handler, &mut triggers, &sink).await;

    assert_eq!(summary.triggered, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(received(&server).await.len(), 2);
    // Whichever finished last wrote last; both wrote the same body here.
    assert_eq!(sink.last_text().as_deref(), Some("{\n  \"result\": \"OK\"\n}"));
    assert_eq!(handler.state(), HandlerState::Idle);
}

#[tokio::test]
async fn single_flight_drops_second_trigger() {
    let server = MockServer::start().await;
    mount_json(&server, json!({"result": "OK"}), Duration::from_millis(200)).await;
    let file = image_file();
    let config = ClientConfig::builder()
        .endpoint(server.uri())
        .single_flight(true)
        .build()
        .unwrap();
    let handler =
        SubmissionHandler::http(config, Arc::new(PathSelection::with_path(file.path()))).unwrap();
    let sink = MemorySink::new();
    let (fire, mut triggers) = ChannelTrigger::new();

    fire.fire();
    fire.fire();
    drop(fire);

    let summary = dispatch(&handler, &mut triggers, &sink).await;

    assert_eq!(summary.ignored, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(received(&server).await.len(), 1);
}

#[tokio::test]
async fn clear_after_run_does_not_cancel_the_upload() {
    let server = MockServer::start().await;
    mount_json(&server, json!({"result": "OK"}), Duration::from_millis(50)).await;
    let file = image_file();
    let selection = PathSelection::new();
    let handler = handler_for(&server, &selection);
    let script = format!("select {}\nrun\nclear\nrun\n", file.path().display());

    for _ in 0..20 {
        let sink = MemorySink::new();
        let mut triggers = CommandTrigger::new(script.as_bytes(), selection.clone());

        let summary = dispatch(&handler, &mut triggers, &sink).await;

        assert_eq!(summary.succeeded, 1, "{summary:?}");
        assert_eq!(summary.no_file, 1, "{summary:?}");
        assert_eq!(sink.alerts(), vec!["Choose an image first"]);
    }
    let requests = received(&server).await;
    assert_eq!(requests.len(), 20);
    assert!(requests.iter().all(|r| contains(&r.body, IMAGE)));
}

#[tokio::test]
async fn reselect_after_run_uploads_both_files() {
    let server = MockServer::start().await;
    mount_json(&server, json!({"result": "OK"}), Duration::from_millis(50)).await;
    let first = image_file();
    let mut second = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    second.write_all(b"second cheque").unwrap();
    let selection = PathSelection::new();
    let handler = handler_for(&server, &selection);
    let script = format!(
        "select {}\nrun\nselect {}\nrun\n",
        first.path().display(),
        second.path().display()
    );
    let sink = MemorySink::new();
    let mut triggers = CommandTrigger::new(script.as_bytes(), selection);

    let summary = dispatch(&handler, &mut triggers, &sink).await;

    assert_eq!(summary.succeeded, 2);
    let requests = received(&server).await;
    assert_eq!(requests.iter().filter(|r| contains(&r.body, IMAGE)).count(), 1);
    assert_eq!(requests.iter().filter(|r| contains(&r.body, b"second cheque")).count(), 1);
}

// ── Failure paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn html_error_page_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;
    let file = image_file();
    let sink = MemorySink::new();

    let err = assert_err!(submit_file(Some(file.path()), &config_for(&server), &sink).await);

    assert!(matches!(err, SubmitError::Parse { status: 500, .. }), "got {err:?}");
    assert_eq!(sink.texts(), vec!["Processing…"]);
    assert_eq!(sink.failures().len(), 1);
}

#[tokio::test]
async fn json_validation_error_is_rendered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"detail": "field required"})))
        .mount(&server)
        .await;
    let file = image_file();
    let sink = MemorySink::new();

    let done = assert_ok!(submit_file(Some(file.path()), &config_for(&server), &sink).await);

    assert_eq!(done.status, 422);
    assert!(done.rendered.contains("field required"));
}

#[tokio::test]
async fn configured_timeout_expires() {
    let server = MockServer::start().await;
    mount_json(&server, json!({}), Duration::from_secs(3)).await;
    let file = image_file();
    let config = ClientConfig::builder()
        .endpoint(server.uri())
        .request_timeout_secs(1)
        .build()
        .unwrap();
    let sink = MemorySink::new();

    let err = assert_err!(submit_file(Some(file.path()), &config, &sink).await);

    assert!(matches!(err, SubmitError::Timeout { secs: 1, .. }), "got {err:?}");
}

#[tokio::test]
async fn missing_file_fails_without_request() {
    let server = MockServer::start().await;
    mount_json(&server, json!({}), Duration::ZERO).await;
    let sink = MemorySink::new();
    let gone = PathBuf::from("/definitely/not/a/cheque.jpg");

    let err = assert_err!(submit_file(Some(gone.as_path()), &config_for(&server), &sink).await);

    assert!(matches!(err, SubmitError::FileNotFound { .. }));
    assert_eq!(sink.texts(), vec!["Processing…"]);
    assert_eq!(sink.failures().len(), 1);
    assert!(received(&server).await.is_empty());
}

// ── Cheque-OCR response shape ────────────────────────────────────────────────

#[tokio::test]
async fn cheque_reply_fields_and_crops() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        json!({
            "file": "cheque.jpg",
            "predictions": {"amount": "120.00", "amount_words": "one hundred twenty", "date": "2024-05-02", "payee": "J. Smith"},
            "crops": {"amount": "data:image/png;base64,iVBORw0KGgo=", "payee": "data:image/png;base64,iVBORw0KGgo="}
        }),
        Duration::ZERO,
    )
    .await;
    let file = image_file();
    let sink = MemorySink::new();

    let done = assert_ok!(submit_file(Some(file.path()), &config_for(&server), &sink).await);

    // Rendered text keeps the service's key order.
    let text = &done.rendered;
    let file_at = text.find("\"file\"").unwrap();
    let preds_at = text.find("\"predictions\"").unwrap();
    let crops_at = text.find("\"crops\"").unwrap();
    assert!(file_at < preds_at && preds_at < crops_at);

    let cheque = ChequePrediction::from_value(&done.value).expect("cheque reply");
    assert_eq!(cheque.detected(), 4);

    let dir = tempfile::tempdir().unwrap();
    let written = assert_ok!(cheque.save_crops(dir.path()).await);
    assert_eq!(written.len(), 2);
    assert_eq!(std::fs::read(dir.path().join("payee.png")).unwrap(), b"\x89PNG\r\n\x1a\n");
}
