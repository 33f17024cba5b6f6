use std::sync::Arc;

use serde_json::json;

use claritas::config::RunConfig;
use claritas::graphs::GraphBuilder;
use claritas::state::StateSchema;
use claritas::types::NodeKind;
use claritas::wire::{SseFrameDecoder, WireMessage};

mod common;
use common::*;

#[tokio::test]
async fn stream_delivers_updates_then_a_single_terminal() {
    let fixture = fact_check_app(sample_claims(), sample_biases(), sample_verified(), 0, 0);
    let (handle, stream) = fixture
        .app
        .invoke_streaming(fixture.app.fresh_state(), RunConfig::default());

    let messages = stream.collect_all().await;
    let state = handle.join().await.unwrap();

    let terminals = messages.iter().filter(|m| m.is_terminal()).count();
    assert_eq!(terminals, 1);
    assert_eq!(messages.last(), Some(&WireMessage::Complete));

    let steps: Vec<&str> = messages
        .iter()
        .filter_map(|m| match m {
            WireMessage::Update { step, .. } => Some(step.as_str()),
            _ => None,
        })
        .collect();
    assert!(steps.contains(&"preprocess"));
    assert!(steps.contains(&"extract_claims"));
    assert!(steps.contains(&"detect_biases"));
    assert!(steps.contains(&"verify_claims_llm"));
    assert_eq!(steps.last(), Some(&"report"));

    assert!(!messages.iter().any(|m| matches!(m, WireMessage::Token { .. })));
    assert_eq!(state.get("report"), Some(&json!("2 verified claims, 1 biases")));
}

fn two_speakers() -> Arc<claritas::app::App> {
    let schema = StateSchema::builder().list("items").build();
    let chatty = Streaming::new(vec![
        ("hel".to_string(), vec!["agent:a1".to_string()]),
        ("lo".to_string(), vec!["agent:a1".to_string()]),
    ]);
    let quiet = Streaming::new(vec![("psst".to_string(), Vec::new())]);
    Arc::new(
        GraphBuilder::new()
            .with_schema(schema)
            .add_node(NodeKind::from("chatty"), chatty)
            .add_node(NodeKind::from("quiet"), quiet)
            .add_edge(NodeKind::Start, NodeKind::from("chatty"))
            .add_edge(NodeKind::from("chatty"), NodeKind::from("quiet"))
            .add_edge(NodeKind::from("quiet"), NodeKind::End)
            .compile()
            .unwrap(),
    )
}

#[tokio::test]
async fn tokens_are_filtered_by_the_streaming_allowlist() {
    let app = two_speakers();
    let config = RunConfig::default().with_streaming_node("chatty");
    let (handle, stream) = app.invoke_streaming(app.fresh_state(), config);

    let messages = stream.collect_all().await;
    handle.join().await.unwrap();

    let tokens: Vec<&str> = messages
        .iter()
        .filter_map(|m| match m {
            WireMessage::Token { token, .. } => Some(token.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(tokens, vec!["hel", "lo"]);
    assert_eq!(messages.last(), Some(&WireMessage::Complete));
}

#[tokio::test]
async fn failed_run_ends_with_an_error_terminal() {
    let schema = StateSchema::builder().list("items").build();
    let app = Arc::new(
        GraphBuilder::new()
            .with_schema(schema)
            .add_node(NodeKind::from("a"), Writer::new("items", json!(["a"])))
            .add_node(NodeKind::from("join"), Failing::new("cannot summarize"))
            .add_edge(NodeKind::Start, NodeKind::from("a"))
            .add_edge(NodeKind::from("a"), NodeKind::from("join"))
            .add_edge(NodeKind::from("join"), NodeKind::End)
            .set_deferred(NodeKind::from("join"))
            .compile()
            .unwrap(),
    );

    let (handle, stream) = app.invoke_streaming(app.fresh_state(), RunConfig::default());
    let messages = stream.collect_all().await;
    assert!(handle.join().await.is_err());

    let terminals = messages.iter().filter(|m| m.is_terminal()).count();
    assert_eq!(terminals, 1);
    match messages.last() {
        Some(WireMessage::Error { error }) => assert!(error.contains("join")),
        other => panic!("expected error terminal, got {other:?}"),
    }
}

#[tokio::test]
async fn run_id_is_carried_on_the_handle() {
    let fixture = fact_check_app(sample_claims(), sample_biases(), sample_verified(), 0, 0);
    let config = RunConfig::default().with_run_id("run-fixed");
    let (handle, stream) = fixture
        .app
        .invoke_streaming(fixture.app.fresh_state(), config);
    assert_eq!(handle.run_id(), "run-fixed");
    stream.collect_all().await;
    handle.join().await.unwrap();
}

#[tokio::test]
async fn frames_survive_arbitrary_chunking_through_the_decoder() {
    let fixture = fact_check_app(sample_claims(), sample_biases(), sample_verified(), 0, 0);
    let (handle, stream) = fixture
        .app
        .invoke_streaming(fixture.app.fresh_state(), RunConfig::default());
    let messages = stream.collect_all().await;
    handle.join().await.unwrap();

    let mut raw = String::new();
    for message in &messages {
        raw.push_str(&message.to_sse_frame().unwrap());
    }

    // Feed the byte stream back in uneven chunks.
    let mut decoder = SseFrameDecoder::new();
    let mut decoded = Vec::new();
    let mut rest = raw.as_str();
    let mut width = 1;
    while !rest.is_empty() {
        let take = width.min(rest.len());
        let mut cut = take;
        while !rest.is_char_boundary(cut) {
            cut += 1;
        }
        let (chunk, tail) = rest.split_at(cut);
        decoded.extend(decoder.push(chunk).unwrap());
        rest = tail;
        width = (width % 7) + 1;
    }
    assert_eq!(decoded, messages);
}
