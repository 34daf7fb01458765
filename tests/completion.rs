use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sabnzbd::{Client, Completion, SabnzbdError, WaitOptions};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const KEY: &str = "abc";

fn client_for(server: &MockServer) -> Client {
    let addr = server.address();
    Client::new(addr.ip().to_string(), addr.port().to_string(), KEY).expect("client")
}

fn api(mode: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/sabnzbd/api"))
        .and(query_param("mode", mode))
}

fn queue_body(ids: &[&str]) -> Value {
    let slots: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "nzo_id": id, "status": "Downloading", "percentage": "10" }))
        .collect();
    let status = if ids.is_empty() { "Idle" } else { "Downloading" };
    json!({ "queue": { "status": status, "slots": slots } })
}

fn history_body(slots: &[(&str, &str)]) -> Value {
    let slots: Vec<Value> = slots
        .iter()
        .map(|(id, status)| {
            let fail = if *status == "Failed" { "Out of retention" } else { "" };
            json!({ "nzo_id": id, "status": status, "fail_message": fail })
        })
        .collect();
    json!({ "history": { "noofslots": slots.len(), "slots": slots } })
}

fn fast() -> WaitOptions {
    WaitOptions {
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

#[tokio::test]
async fn queued_job_is_not_finished_regardless_of_history() {
    let server = MockServer::start().await;
    api("queue")
        .and(query_param("nzo_ids", "a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&["a"])))
        .mount(&server)
        .await;
    api("history")
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(!client.is_download_finished(&["a"]).await.unwrap());
}

#[tokio::test]
async fn all_completed_is_finished() {
    let server = MockServer::start().await;
    api("queue")
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&[])))
        .mount(&server)
        .await;
    api("history")
        .and(query_param("nzo_ids", "a,b"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(history_body(&[("a", "Completed"), ("b", "Completed")])),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.is_download_finished(&["a", "b"]).await.unwrap());
}

#[tokio::test]
async fn partial_failure_fails_whole_batch_and_names_the_job() {
    let server = MockServer::start().await;
    api("queue")
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&[])))
        .mount(&server)
        .await;
    api("history")
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(history_body(&[("a", "Completed"), ("b", "Failed")])),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.is_download_finished(&["a", "b"]).await.unwrap_err() {
        SabnzbdError::DownloadFailed { ids, message } => {
            assert_eq!(ids, vec!["b".to_string()]);
            assert_eq!(message, "Out of retention");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn post_processing_job_is_not_finished() {
    let server = MockServer::start().await;
    api("queue")
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&[])))
        .mount(&server)
        .await;
    api("history")
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(history_body(&[("a", "Completed"), ("b", "Extracting")])),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let state = client.completion(&["a", "b"]).await.unwrap();
    assert!(matches!(state, Completion::Processing(_)));
}

#[tokio::test]
async fn job_missing_from_both_snapshots_is_not_finished() {
    let server = MockServer::start().await;
    api("queue")
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&[])))
        .mount(&server)
        .await;
    api("history")
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body(&[("a", "Completed")])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(!client.is_download_finished(&["a", "b"]).await.unwrap());
}

#[tokio::test]
async fn empty_id_set_is_rejected() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let err = client.is_download_finished::<&str>(&[]).await.unwrap_err();
    assert!(matches!(err, SabnzbdError::NoJobIds));
}

#[tokio::test]
async fn add_url_and_wait_polls_until_finished() {
    let server = MockServer::start().await;
    api("addurl")
        .and(query_param("name", "https://example.com/show.nzb"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": true, "nzo_ids": ["b", "a"] })),
        )
        .expect(1)
        .mount(&server)
        .await;
    // Two rounds with the jobs still queued, then empty.
    api("queue")
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&["b", "a"])))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    api("queue")
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&[])))
        .mount(&server)
        .await;
    // One round still unpacking, then done.
    api("history")
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(history_body(&[("b", "Extracting"), ("a", "Completed")])),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    api("history")
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(history_body(&[("b", "Completed"), ("a", "Completed")])),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let opts = WaitOptions {
        on_progress: Some(Box::new(move |_: &Completion| {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
        ..fast()
    };

    let ids = client
        .add_url_and_wait("https://example.com/show.nzb", None, Some(opts))
        .await
        .unwrap();

    assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn wait_propagates_download_failure() {
    let server = MockServer::start().await;
    api("queue")
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&[])))
        .mount(&server)
        .await;
    api("history")
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body(&[("a", "Failed")])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.wait_until_finished(&["a"], &fast()).await.unwrap_err();
    assert!(matches!(err, SabnzbdError::DownloadFailed { .. }));
}

#[tokio::test]
async fn wait_gives_up_after_timeout() {
    let server = MockServer::start().await;
    api("queue")
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&["a"])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let opts = WaitOptions {
        timeout: Duration::from_millis(50),
        ..fast()
    };
    let err = client.wait_until_finished(&["a"], &opts).await.unwrap_err();
    assert!(matches!(err, SabnzbdError::Timeout(d) if d == Duration::from_millis(50)));
}

#[tokio::test]
async fn wait_propagates_transport_errors() {
    let server = MockServer::start().await;
    api("queue")
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.wait_until_finished(&["a"], &fast()).await.unwrap_err();
    assert!(matches!(err, SabnzbdError::Api { status_code: 502, .. }));
}

/// Answers `mode=queue` with the job still queued on the first call and an
/// empty queue afterwards, recording when each call arrived.
struct QueuedOnce {
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl Respond for QueuedOnce {
    fn respond(&self, _: &Request) -> ResponseTemplate {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Instant::now());
        let ids: &[&str] = if calls.len() == 1 { &["a"] } else { &[] };
        ResponseTemplate::new(200).set_body_json(queue_body(ids))
    }
}

#[tokio::test]
async fn default_wait_polls_once_per_second() {
    let server = MockServer::start().await;
    let calls = Arc::new(Mutex::new(Vec::new()));
    api("addurl")
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": true, "nzo_ids": ["a"] })),
        )
        .mount(&server)
        .await;
    api("queue")
        .respond_with(QueuedOnce {
            calls: calls.clone(),
        })
        .mount(&server)
        .await;
    api("history")
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body(&[("a", "Completed")])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ids = client
        .add_url_and_wait("https://example.com/a.nzb", None, None)
        .await
        .unwrap();
    assert_eq!(ids, vec!["a".to_string()]);

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    let gap = calls[1] - calls[0];
    assert!(gap >= Duration::from_millis(950), "rounds only {gap:?} apart");
    assert!(gap < Duration::from_secs(3), "rounds {gap:?} apart");
}

#[tokio::test]
async fn null_display_fields_do_not_break_completion() {
    let server = MockServer::start().await;
    api("queue")
        .respond_with(ResponseTemplate::new(200).set_body_json(queue_body(&[])))
        .mount(&server)
        .await;
    api("history")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "history": {
                "noofslots": 1,
                "day_size": null,
                "slots": [{
                    "nzo_id": "a",
                    "status": "Completed",
                    "url": null,
                    "password": null,
                    "completeness": null,
                    "meta": null
                }]
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.is_download_finished(&["a"]).await.unwrap());
}

#[test]
fn default_poll_interval_is_one_second() {
    let opts = WaitOptions::default();
    assert_eq!(opts.poll_interval, Duration::from_secs(1));
    assert!(opts.on_progress.is_none());
}
