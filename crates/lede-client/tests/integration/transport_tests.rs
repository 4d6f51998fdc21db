use std::time::{Duration, Instant};

use lede_client::ReqwestTransport;
use lede_core::{ChunkStream, DocumentId, FailureReason, FetchOutcome, StopReason, Transport};

use crate::integration::common::{ACDC_PARAGRAPH, TURING_PARAGRAPH, spawn_upstream};

const TIMEOUT: Duration = Duration::from_secs(5);

fn id(raw: &str) -> DocumentId {
    DocumentId::new(raw).unwrap()
}

#[tokio::test]
async fn fetches_title_and_summary_over_http() {
    let upstream = spawn_upstream().await;

    let outcome = upstream.fetcher(TIMEOUT).fetch(&id("Turing_Award")).await;

    let result = outcome.into_result().expect("summary should be extracted");
    assert_eq!(result.title, "Turing Award");
    assert_eq!(result.summary, TURING_PARAGRAPH);
    assert_eq!(upstream.counters.hits(), 1);
}

#[tokio::test]
async fn slash_in_id_reaches_upstream_as_one_segment() {
    let upstream = spawn_upstream().await;

    let outcome = upstream.fetcher(TIMEOUT).fetch(&id("AC%2FDC")).await;

    let result = outcome.into_result().expect("summary should be extracted");
    assert_eq!(result.title, "AC/DC");
    assert_eq!(result.summary, ACDC_PARAGRAPH);
}

#[tokio::test]
async fn not_found_is_a_transport_failure() {
    let upstream = spawn_upstream().await;

    let outcome = upstream.fetcher(TIMEOUT).fetch(&id("No_Such_Page")).await;

    match outcome {
        FetchOutcome::Failure(FailureReason::Transport(message)) => {
            assert!(message.contains("404"), "unexpected message: {message}");
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn complete_body_without_summary_is_unextractable() {
    let upstream = spawn_upstream().await;

    let outcome = upstream.fetcher(TIMEOUT).fetch(&id("Stub")).await;

    assert_eq!(
        outcome,
        FetchOutcome::Failure(FailureReason::Unextractable {
            stop: StopReason::Completed
        })
    );
}

#[tokio::test]
async fn endless_body_is_abandoned_once_summary_is_found() {
    let upstream = spawn_upstream().await;

    let started = Instant::now();
    let outcome = upstream.fetcher(TIMEOUT).fetch(&id("Endless")).await;
    assert!(outcome.is_success());
    assert!(started.elapsed() < TIMEOUT, "fetch should not wait for the timeout");

    // The server stops producing shortly after the client hangs up.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let after_hangup = upstream.counters.filler_sent();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(upstream.counters.filler_sent(), after_hangup);
}

#[tokio::test]
async fn stalled_body_times_out() {
    let upstream = spawn_upstream().await;

    let started = Instant::now();
    let outcome = upstream
        .fetcher(Duration::from_millis(300))
        .fetch(&id("Stalled"))
        .await;

    assert_eq!(
        outcome,
        FetchOutcome::Failure(FailureReason::Unextractable {
            stop: StopReason::TimedOut
        })
    );
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn unreachable_upstream_is_a_transport_failure() {
    let transport = ReqwestTransport::new().unwrap();
    // Port 9 on localhost is not expected to accept connections.
    let url = url::Url::parse("http://127.0.0.1:9/page/Anything").unwrap();

    assert!(transport.open(&url).await.is_err());
}

#[tokio::test]
async fn response_chunks_end_with_none() {
    let upstream = spawn_upstream().await;
    let transport = ReqwestTransport::new().unwrap();
    let url = upstream.base_url.join("/page/Stub").unwrap();

    let mut stream = transport.open(&url).await.unwrap();
    let mut body = Vec::new();
    while let Some(chunk) = stream.next_chunk().await.unwrap() {
        body.extend(chunk);
    }

    assert_eq!(body, b"<html><body>Nothing to see here.</body></html>");
}
