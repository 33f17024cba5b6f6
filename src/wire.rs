//! The client wire protocol: message union, SSE framing, multiplexing.
//!
//! Everything the client sees travels over ONE ordered stream of
//! [`WireMessage`]s: incremental `token`s and step `update`s interleaved in
//! arrival order, closed by exactly one `complete` or `error`. The SSE
//! framing is `data: ` + compact JSON + blank line.
//!
//! The decoder is deliberately tolerant: it accepts `stepId` as an alias
//! for `step` and skips unknown `type` values with a warning, failing the
//! stream only on malformed JSON.

use futures_util::Stream;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::app::App;
use crate::config::RunConfig;
use crate::event_bus::{ChannelSink, Event, EventBus, RunOutcome};
use crate::payloads::UpdatePayload;
use crate::runtimes::{GraphRunner, InvocationHandle};
use crate::state::VersionedState;

/// One message on the client stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireMessage {
    /// An incremental text token with attribution tags.
    Token {
        token: String,
        #[serde(default)]
        tags: Vec<String>,
    },
    /// A step finished and surfaced its payload.
    Update {
        #[serde(alias = "stepId")]
        step: String,
        payload: UpdatePayload,
    },
    /// Terminal: the run finished successfully. Nothing follows.
    Complete,
    /// Terminal: the run failed. Nothing follows.
    Error { error: String },
}

impl WireMessage {
    /// Returns `true` for `complete` and `error`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, WireMessage::Complete | WireMessage::Error { .. })
    }

    /// Encode as one SSE frame: `data: <json>\n\n`.
    pub fn to_sse_frame(&self) -> Result<String, WireError> {
        let json = serde_json::to_string(self)?;
        Ok(format!("data: {json}\n\n"))
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum WireError {
    #[error("malformed wire JSON: {0}")]
    #[diagnostic(
        code(claritas::wire::malformed),
        help("malformed frames fail the stream; only unknown `type` values are skipped")
    )]
    Serde(#[from] serde_json::Error),

    #[error("wire message has no `type` field")]
    #[diagnostic(code(claritas::wire::missing_type))]
    MissingType,
}

/// Decode one `data:` payload into a message.
///
/// Returns `Ok(None)` for an unknown `type` value (skipped with a warning,
/// for forward compatibility). Malformed JSON or a missing `type` is an
/// error: the stream is broken.
pub fn decode_data_payload(payload: &str) -> Result<Option<WireMessage>, WireError> {
    let value: serde_json::Value = serde_json::from_str(payload)?;
    match value.get("type").and_then(serde_json::Value::as_str) {
        Some("token" | "update" | "complete" | "error") => {
            Ok(Some(serde_json::from_value(value)?))
        }
        Some(other) => {
            warn!(message_type = other, "skipping unknown wire message type");
            Ok(None)
        }
        None => Err(WireError::MissingType),
    }
}

/// Incremental SSE frame decoder for the client side.
///
/// Feed it raw text chunks as they arrive; it buffers partial frames and
/// yields every complete message. Chunk boundaries may fall anywhere.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: String,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk of the SSE byte stream (as text) and return every
    /// message completed by it.
    pub fn push(&mut self, chunk: &str) -> Result<Vec<WireMessage>, WireError> {
        self.buffer.push_str(chunk);
        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..pos + 2).collect();
            // An SSE frame may hold several data lines; they concatenate.
            let mut payload = String::new();
            for line in frame.lines() {
                if let Some(rest) = line.strip_prefix("data:") {
                    if !payload.is_empty() {
                        payload.push('\n');
                    }
                    payload.push_str(rest.strip_prefix(' ').unwrap_or(rest));
                }
            }
            if payload.is_empty() {
                continue;
            }
            if let Some(message) = decode_data_payload(&payload)? {
                messages.push(message);
            }
        }
        Ok(messages)
    }
}

/// Receiving end of one run's multiplexed client stream.
///
/// Ends after the terminal message, or without one if the run was
/// cancelled or the producing task died. Consumers should treat a stream
/// that closes without a terminal as a transport failure.
pub struct WireStream {
    rx: mpsc::UnboundedReceiver<WireMessage>,
}

impl WireStream {
    pub async fn recv(&mut self) -> Option<WireMessage> {
        self.rx.recv().await
    }

    /// Adapt into a futures `Stream` of messages.
    pub fn into_stream(self) -> impl Stream<Item = WireMessage> {
        futures_util::stream::unfold(self.rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        })
    }

    /// Adapt into a stream of ready-to-write SSE frames.
    pub fn into_sse_frames(self) -> impl Stream<Item = String> {
        use futures_util::StreamExt;
        self.into_stream().filter_map(|msg| async move {
            match msg.to_sse_frame() {
                Ok(frame) => Some(frame),
                Err(err) => {
                    warn!(error = %err, "failed to encode wire frame; dropping");
                    None
                }
            }
        })
    }

    /// Drain the whole stream into a vector. Test and batch helper.
    pub async fn collect_all(mut self) -> Vec<WireMessage> {
        let mut messages = Vec::new();
        while let Some(msg) = self.rx.recv().await {
            messages.push(msg);
        }
        messages
    }
}

/// Spawn a streaming run: runner task + multiplexer task.
///
/// The multiplexer consumes the run's event bus through a channel sink and
/// forwards, in arrival order: tokens from streaming-enabled steps, step
/// updates, and the single terminal derived from the run outcome. Late
/// events after the terminal are discarded; a dropped consumer stops all
/// forwarding.
pub(crate) fn spawn_streaming_run(
    app: Arc<App>,
    initial: VersionedState,
    config: RunConfig,
) -> (InvocationHandle, WireStream) {
    let config = Arc::new(config);
    let bus = EventBus::silent();
    bus.listen_for_events();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    bus.add_sink(ChannelSink::new(event_tx));
    let (wire_tx, wire_rx) = mpsc::unbounded_channel::<WireMessage>();

    let mux_config = config.clone();
    tokio::spawn(async move {
        let mut terminal_sent = false;
        while let Some(event) = event_rx.recv().await {
            if terminal_sent {
                debug!("discarding event after terminal");
                continue;
            }
            let message = match event {
                Event::Token(t) => {
                    if mux_config.streams_tokens_from(&t.node) {
                        Some(WireMessage::Token {
                            token: t.text,
                            tags: t.tags,
                        })
                    } else {
                        None
                    }
                }
                Event::StepUpdate(u) => Some(WireMessage::Update {
                    step: u.step,
                    payload: u.payload,
                }),
                Event::Diagnostic(_) => None,
                Event::RunEnded(r) => {
                    terminal_sent = true;
                    Some(match r.outcome {
                        RunOutcome::Completed => WireMessage::Complete,
                        RunOutcome::Failed { error } => WireMessage::Error { error },
                    })
                }
            };
            if let Some(message) = message
                && wire_tx.send(message).is_err()
            {
                // Consumer went away; suppress everything else.
                break;
            }
        }
    });

    let run_id = config.run_id.clone();
    let sender = bus.get_sender();
    let run_config = config.clone();
    let handle = tokio::spawn(async move {
        let mut runner = GraphRunner::new(app, run_config.clone(), initial, sender.clone());
        let result = runner.run_until_complete().await;
        let outcome = match &result {
            Ok(_) => RunOutcome::Completed,
            Err(err) => RunOutcome::Failed {
                error: err.to_string(),
            },
        };
        let _ = sender.send(Event::run_ended(&run_config.run_id, outcome, runner.step()));
        // Drain queued events into the sinks before tearing the bus down.
        bus.stop_listener().await;
        result
    });

    (InvocationHandle::new(run_id, handle), WireStream { rx: wire_rx })
}
