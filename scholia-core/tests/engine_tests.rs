use std::time::Duration;

use base64::Engine as _;
use client::{ChatClient, IngestClient};
use scholia_core::{ChatEngine, EngineEvent};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_for(server: &MockServer) -> ChatEngine {
    ChatEngine::new(
        ChatClient::new(format!("{}/api/chat", server.uri())),
        IngestClient::new(format!("{}/api/retrieval/ingest", server.uri())),
    )
}

fn sources_header(json: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(json)
}

/// Drain events until the turn finishes, with a timeout so a wedged engine
/// fails the test instead of hanging it.
async fn wait_for_turn(engine: &mut ChatEngine) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), engine.next_event())
            .await
            .expect("timed out waiting for the turn to finish")
            .expect("engine event channel closed");
        let done = matches!(event, EngineEvent::TurnComplete);
        events.push(event);
        if done {
            return events;
        }
    }
}

async fn wait_for_ingest(engine: &mut ChatEngine) -> EngineEvent {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), engine.next_event())
            .await
            .expect("timed out waiting for ingestion")
            .expect("engine event channel closed");
        match event {
            EngineEvent::IngestComplete | EngineEvent::Error(_) => return event,
            _ => continue,
        }
    }
}

#[tokio::test]
async fn test_turn_streams_reply_and_records_sources() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("The answer.")
                .insert_header("x-sources", sources_header(r#"[{"text":"a"}]"#).as_str())
                .insert_header("x-message-index", "0"),
        )
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    engine.submit("What is the answer?");
    let events = wait_for_turn(&mut engine).await;

    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::SourcesRecorded { turn_key } if turn_key == "0")));

    let session = engine.session();
    let session = session.lock().await;
    assert_eq!(session.len(), 2);
    assert_eq!(session.messages()[0].content, "What is the answer?");
    assert_eq!(session.messages()[1].content, "The answer.");

    let sources = engine.sources();
    let sources = sources.lock().await;
    let docs = sources.lookup("0").expect("sources recorded under key 0");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].text, "a");

    assert!(!engine.is_busy());
}

#[tokio::test]
async fn test_submit_while_busy_is_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("slow reply")
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    engine.submit("first");
    // The guard is set synchronously, so this never reaches the endpoint.
    engine.submit("second");
    wait_for_turn(&mut engine).await;

    let session = engine.session();
    let session = session.lock().await;
    assert_eq!(session.len(), 2);
    assert_eq!(session.messages()[0].content, "first");
}

#[tokio::test]
async fn test_blank_submit_is_a_noop() {
    let server = MockServer::start().await;
    let mut engine = engine_for(&server);

    engine.submit("");
    engine.submit("   \n\t");

    assert!(!engine.is_busy());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(engine.try_recv().is_none());
    assert!(engine.session().lock().await.is_empty());
}

#[tokio::test]
async fn test_malformed_sources_header_keeps_reply_and_source_map() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Reply text intact.")
                .insert_header("x-sources", "%%%not-base64%%%")
                .insert_header("x-message-index", "0"),
        )
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    engine.submit("hi");
    let events = wait_for_turn(&mut engine).await;

    // Decode failure is local: no sources, no error, reply fully applied.
    assert!(!events
        .iter()
        .any(|e| matches!(e, EngineEvent::SourcesRecorded { .. } | EngineEvent::Error(_))));
    assert!(engine.sources().lock().await.is_empty());
    assert_eq!(engine.session().lock().await.messages()[1].content, "Reply text intact.");
}

#[tokio::test]
async fn test_transport_failure_keeps_partial_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    engine.submit("hello?");
    let events = wait_for_turn(&mut engine).await;

    let error = events
        .iter()
        .find_map(|e| match e {
            EngineEvent::Error(msg) => Some(msg.clone()),
            _ => None,
        })
        .expect("transport failure surfaces an error event");
    assert!(error.contains("backend down"));

    // The user message stays; no assistant message was ever opened.
    let session = engine.session();
    let session = session.lock().await;
    assert_eq!(session.len(), 1);
    assert_eq!(session.messages()[0].content, "hello?");
    assert!(!engine.is_busy());
}

#[tokio::test]
async fn test_engine_accepts_submissions_again_after_a_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(2)
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    engine.submit("one");
    wait_for_turn(&mut engine).await;
    engine.submit("two");
    wait_for_turn(&mut engine).await;

    assert_eq!(engine.session().lock().await.len(), 4);
}

#[tokio::test]
async fn test_ingest_available_only_while_transcript_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/retrieval/ingest"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    assert!(engine.ingest_available());

    engine.ingest("document body");
    assert!(matches!(
        wait_for_ingest(&mut engine).await,
        EngineEvent::IngestComplete
    ));
    // Ingestion has its own lifecycle: the transcript is untouched.
    assert!(engine.ingest_available());

    engine.submit("first question");
    wait_for_turn(&mut engine).await;
    assert!(!engine.ingest_available());
}

#[tokio::test]
async fn test_ingest_failure_surfaces_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/retrieval/ingest"))
        .respond_with(ResponseTemplate::new(422).set_body_string("document too large"))
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    engine.ingest("way too big");

    match wait_for_ingest(&mut engine).await {
        EngineEvent::Error(msg) => assert!(msg.contains("document too large")),
        other => panic!("expected an error event, got {other:?}"),
    }
    assert!(!engine.is_busy());
}

#[tokio::test]
async fn test_reset_clears_transcript_and_sources() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("cited reply")
                .insert_header("x-sources", sources_header(r#"[{"text":"s"}]"#).as_str())
                .insert_header("x-message-index", "0"),
        )
        .mount(&server)
        .await;

    let mut engine = engine_for(&server);
    engine.submit("q");
    wait_for_turn(&mut engine).await;
    assert!(!engine.sources().lock().await.is_empty());

    engine.reset();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), engine.next_event())
            .await
            .expect("timed out waiting for reset")
            .expect("engine event channel closed");
        if matches!(event, EngineEvent::SessionCleared) {
            break;
        }
    }

    assert!(engine.session().lock().await.is_empty());
    assert!(engine.sources().lock().await.is_empty());
    assert!(engine.ingest_available());
}
