//! A fact-check shaped graph wired from fake nodes, plus sample data.
//!
//! Topology: `preprocess` fans out to `extract_claims` and `detect_biases`;
//! a router on `extract_claims` picks a verification backend (or shortcuts
//! straight to the join when nothing was extracted); `report` joins all
//! branches and runs exactly once.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use serde_json::json;

use claritas::app::App;
use claritas::graphs::{GraphBuilder, RouterFn};
use claritas::node::{NodeContext, NodeError, NodePartial};
use claritas::payloads::{Bias, Claim, Segment, UpdatePayload, Verdict, VerifiedClaim};
use claritas::state::{StateSchema, StateSnapshot};
use claritas::types::NodeKind;

use super::nodes::{Counted, FnNode, Writer};

/// Run counters for every node in the fact-check fixture graph.
pub struct FactCheckCounters {
    pub preprocess: Arc<AtomicUsize>,
    pub extract: Arc<AtomicUsize>,
    pub detect: Arc<AtomicUsize>,
    pub verify_llm: Arc<AtomicUsize>,
    pub verify_web: Arc<AtomicUsize>,
    pub report: Arc<AtomicUsize>,
}

pub struct FactCheckApp {
    pub app: Arc<App>,
    pub counters: FactCheckCounters,
}

pub fn fact_check_schema() -> StateSchema {
    StateSchema::builder()
        .list("segments")
        .list("claims")
        .list("biases")
        .list("verified_claims")
        .scalar("report")
        .build()
}

/// Builds the fixture graph. `extract_delay_ms` and `detect_delay_ms`
/// control the arrival order of the two fan-out branches at the barrier.
pub fn fact_check_app(
    claims: Vec<Claim>,
    biases: Vec<Bias>,
    verified: Vec<VerifiedClaim>,
    extract_delay_ms: u64,
    detect_delay_ms: u64,
) -> FactCheckApp {
    let segments = sample_segments();
    let preprocess = Writer::new("segments", json!(segments.clone()))
        .with_payload(UpdatePayload::Segments { segments });
    let extract = Writer::new("claims", json!(claims.clone()))
        .with_delay_ms(extract_delay_ms)
        .with_payload(UpdatePayload::Claims { claims });
    let detect = Writer::new("biases", json!(biases.clone()))
        .with_delay_ms(detect_delay_ms)
        .with_payload(UpdatePayload::Biases { biases });
    let verify_llm = Writer::new("verified_claims", json!(verified.clone()))
        .with_payload(UpdatePayload::VerifiedClaims {
            claims: verified.clone(),
        });
    let verify_web = Writer::new("verified_claims", json!(verified.clone()))
        .with_payload(UpdatePayload::VerifiedClaims { claims: verified });
    let report = Counted::new(FnNode(
        |snapshot: &StateSnapshot, _ctx: &NodeContext| -> Result<NodePartial, NodeError> {
            let report = format!(
                "{} verified claims, {} biases",
                snapshot.list("verified_claims").len(),
                snapshot.list("biases").len(),
            );
            Ok(NodePartial::new()
                .with_update("report", json!(report.clone()))
                .with_event(UpdatePayload::Report { report }))
        },
    ));

    let counters = FactCheckCounters {
        preprocess: preprocess.runs(),
        extract: extract.runs(),
        detect: detect.runs(),
        verify_llm: verify_llm.runs(),
        verify_web: verify_web.runs(),
        report: report.runs(),
    };

    let route: RouterFn = Arc::new(|snapshot, config| {
        if snapshot.list("claims").is_empty() {
            "no_claims".to_string()
        } else {
            config.verification_source.branch_key().to_string()
        }
    });

    let app = GraphBuilder::new()
        .with_schema(fact_check_schema())
        .add_node(NodeKind::from("preprocess"), preprocess)
        .add_node(NodeKind::from("extract_claims"), extract)
        .add_node(NodeKind::from("detect_biases"), detect)
        .add_node(NodeKind::from("verify_claims_llm"), verify_llm)
        .add_node(NodeKind::from("verify_claims_web"), verify_web)
        .add_node(NodeKind::from("report"), report)
        .add_edge(NodeKind::Start, NodeKind::from("preprocess"))
        .add_edge(NodeKind::from("preprocess"), NodeKind::from("extract_claims"))
        .add_edge(NodeKind::from("preprocess"), NodeKind::from("detect_biases"))
        .add_router(
            NodeKind::from("extract_claims"),
            route,
            [
                ("llm", "verify_claims_llm"),
                ("web", "verify_claims_web"),
                ("no_claims", "report"),
            ],
        )
        .add_edge(NodeKind::from("verify_claims_llm"), NodeKind::from("report"))
        .add_edge(NodeKind::from("verify_claims_web"), NodeKind::from("report"))
        .add_edge(NodeKind::from("detect_biases"), NodeKind::from("report"))
        .add_edge(NodeKind::from("report"), NodeKind::End)
        .set_deferred(NodeKind::from("report"))
        .compile()
        .expect("fixture graph compiles");

    FactCheckApp {
        app: Arc::new(app),
        counters,
    }
}

pub fn sample_segments() -> Vec<Segment> {
    vec![
        Segment {
            id: "seg-0000".to_string(),
            content: "Our product is loved by everyone.".to_string(),
        },
        Segment {
            id: "seg-0001".to_string(),
            content: "The factory opened in 1999 and employs 4000 people.".to_string(),
        },
        Segment {
            id: "seg-0002".to_string(),
            content: "Independent tests prove it outperforms all competitors.".to_string(),
        },
    ]
}

pub fn sample_claims() -> Vec<Claim> {
    vec![
        Claim {
            segment_id: "seg-0001".to_string(),
            index: 0,
            content: "opened in 1999".to_string(),
            explanation: "checkable founding date".to_string(),
        },
        Claim {
            segment_id: "seg-0001".to_string(),
            index: 1,
            content: "employs 4000 people".to_string(),
            explanation: "checkable headcount".to_string(),
        },
    ]
}

pub fn sample_biases() -> Vec<Bias> {
    vec![Bias {
        segment_id: "seg-0000".to_string(),
        content: "loved by everyone".to_string(),
        bias_type: "overgeneralization".to_string(),
        explanation: "sweeping claim with no support".to_string(),
        type_explanation: "asserts universal agreement".to_string(),
    }]
}

pub fn sample_verified() -> Vec<VerifiedClaim> {
    vec![
        VerifiedClaim {
            segment_id: "seg-0001".to_string(),
            index: 0,
            content: "opened in 1999".to_string(),
            explanation: "checkable founding date".to_string(),
            verdict: Verdict::True,
            sources: vec!["https://example.com/history".to_string()],
        },
        VerifiedClaim {
            segment_id: "seg-0001".to_string(),
            index: 1,
            content: "employs 4000 people".to_string(),
            explanation: "checkable headcount".to_string(),
            verdict: Verdict::False,
            sources: Vec::new(),
        },
    ]
}
