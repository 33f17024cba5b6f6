//! # Claritas: Graph-driven Analysis Pipeline Engine
//!
//! Claritas runs text-analysis pipelines as workflow graphs with versioned
//! state, barrier merges, and a single multiplexed live stream to the
//! client, plus the client-side reducers that rebuild progress, speaker
//! transcripts, and annotation overlays from that stream.
//!
//! ## Core concepts
//!
//! - **Nodes**: async units of work returning typed partials
//! - **State**: schema-declared channels with per-key merge policies
//! - **Graph**: static edges, single-branch routers, joins (deferred nodes)
//! - **Wire**: one ordered SSE stream of tokens and step updates, closed by
//!   exactly one terminal
//! - **Client**: monotonic progress board, per-speaker transcript buffers,
//!   annotation overlay resolution
//!
//! ## Building a workflow
//!
//! ```
//! use claritas::{
//!     graphs::GraphBuilder,
//!     node::{Node, NodeContext, NodeError, NodePartial},
//!     payloads::UpdatePayload,
//!     state::{StateSchema, StateSnapshot},
//!     types::NodeKind,
//! };
//! use async_trait::async_trait;
//! use serde_json::json;
//!
//! struct Preprocess;
//!
//! #[async_trait]
//! impl Node for Preprocess {
//!     async fn run(
//!         &self,
//!         _snapshot: StateSnapshot,
//!         _ctx: NodeContext,
//!     ) -> Result<NodePartial, NodeError> {
//!         Ok(NodePartial::new().with_update("segments", json!([{"id": "seg-0000", "content": "…"}])))
//!     }
//! }
//!
//! let app = GraphBuilder::new()
//!     .with_schema(StateSchema::builder().list("segments").build())
//!     .add_node(NodeKind::from("preprocess"), Preprocess)
//!     .add_edge(NodeKind::Start, NodeKind::from("preprocess"))
//!     .add_edge(NodeKind::from("preprocess"), NodeKind::End)
//!     .compile()
//!     .expect("valid graph");
//! # let _ = app;
//! ```
//!
//! ## Streaming a run
//!
//! ```no_run
//! # async fn demo(app: std::sync::Arc<claritas::app::App>) {
//! use claritas::config::RunConfig;
//!
//! let config = RunConfig::default().with_streaming_node("report");
//! let initial = app.fresh_state();
//! let (handle, mut stream) = app.invoke_streaming(initial, config);
//! while let Some(message) = stream.recv().await {
//!     println!("{message:?}");
//! }
//! let final_state = handle.join().await.unwrap();
//! # let _ = final_state;
//! # }
//! ```

pub mod app;
pub mod channels;
pub mod client;
pub mod config;
pub mod event_bus;
pub mod graphs;
pub mod node;
pub mod payloads;
pub mod reducers;
pub mod runtimes;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod wire;
