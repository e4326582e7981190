//! End-to-end scenarios against the public API: install rules into a
//! `Bridge`, enforce an `Intent` through an `EnforcementEngine`, and check
//! the resulting decision and evidence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use bridge::{
    Bridge, Decision, EngineConfig, EngineError, Encoder, EnforcementEngine,
};

mod support {
    use super::*;
    use bridge::Embedder;

    pub const BASE_WIDTH: usize = 384;

    pub struct HashEmbedder;

    #[async_trait]
    impl Embedder for HashEmbedder {
        async fn embed(&self, text: &str) -> Result<[f32; BASE_WIDTH], EngineError> {
            let mut v = [0.0f32; BASE_WIDTH];
            let seed: u32 = text.bytes().map(|b| b as u32).sum();
            for (i, x) in v.iter_mut().enumerate() {
                *x = (((seed.wrapping_mul(2654435761).wrapping_add(i as u32)) % 11) as f32) - 5.0;
            }
            Ok(v)
        }
    }

    /// An `Embedder` that never resolves within the engine's deadline, so
    /// the deadline-expiry scenario doesn't depend on winning a race
    /// against a future that could in principle finish on its first poll.
    pub struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed(&self, _text: &str) -> Result<[f32; BASE_WIDTH], EngineError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok([0.0; BASE_WIDTH])
        }
    }
}

use support::{HashEmbedder, SlowEmbedder};

fn intent_json(tenant: &str, agent: &str, layer: &str, action: &str, sensitivity: &str) -> String {
    serde_json::json!({
        "id": format!("req-{tenant}-{agent}"),
        "timestamp": 1_700_000_000.0,
        "schemaVersion": "1.0",
        "tenantId": tenant,
        "layer": layer,
        "action": action,
        "actor": { "id": agent, "type": "agent" },
        "resource": { "type": "database", "name": "customers", "location": "cloud" },
        "data": { "sensitivity": [sensitivity], "pii": true, "volume": "bulk" },
        "risk": { "authn": "required" }
    })
    .to_string()
}

async fn matching_anchors_for(encoder: &Encoder, raw_json: &str) -> Arc<bridge::RuleAnchors> {
    let intent: bridge::Intent = serde_json::from_str(raw_json).unwrap();
    let vector = encoder.encode_intent(&intent).await.unwrap();

    let mut block = |slot: semantic_sandbox::Slot| {
        let i = slot.index() * 32;
        let mut v = [0.0f32; 32];
        v.copy_from_slice(&vector[i..i + 32]);
        bridge::AnchorBlock::new(vec![v; 1]).unwrap()
    };

    Arc::new(bridge::RuleAnchors {
        action: block(semantic_sandbox::Slot::Action),
        resource: block(semantic_sandbox::Slot::Resource),
        data: block(semantic_sandbox::Slot::Data),
        risk: block(semantic_sandbox::Slot::Risk),
    })
}

fn encoder() -> Arc<Encoder> {
    let vocab = Arc::new(bridge::VocabularyContract::v1());
    Arc::new(Encoder::new(vocab, Arc::new(HashEmbedder), 64))
}

#[tokio::test]
async fn whitelist_match_allows_the_request() {
    let enc = encoder();
    let raw = intent_json("tenant-a", "agent-1", "L4", "read", "internal");
    let anchors = matching_anchors_for(&enc, &raw).await;

    let bridge_store = Arc::new(Bridge::new());
    let rule: Arc<dyn bridge::RuleInstance> = Arc::new(
        bridge::families::ToolWhitelistRule::new("r1", "tenant-a", vec!["search".into()]),
    );
    bridge_store.install_rule(rule, anchors).unwrap();

    let engine = EnforcementEngine::new(bridge_store, enc, EngineConfig::with_defaults());
    let result = engine.enforce_json(&raw, None).await;

    assert_eq!(result.decision, Decision::Allow);
}

#[tokio::test]
async fn tenant_and_agent_scope_union_is_respected() {
    let enc = encoder();
    let raw = intent_json("tenant-a", "agent-1", "L4", "read", "internal");
    let anchors = matching_anchors_for(&enc, &raw).await;

    let bridge_store = Arc::new(Bridge::new());
    let global_rule: Arc<dyn bridge::RuleInstance> = Arc::new(
        bridge::families::ToolWhitelistRule::new("global-rule", "tenant-a", vec!["search".into()])
            .with_priority(1),
    );
    bridge_store.install_rule(global_rule, anchors.clone()).unwrap();

    // A rule scoped to a *different* tenant must never apply here.
    let other_tenant_rule: Arc<dyn bridge::RuleInstance> = Arc::new(
        bridge::families::ToolWhitelistRule::new("other-tenant-rule", "tenant-b", vec!["search".into()]),
    );
    bridge_store.install_rule(other_tenant_rule, anchors).unwrap();

    let engine = EnforcementEngine::new(bridge_store, enc, EngineConfig::with_defaults());
    let result = engine.enforce_json(&raw, None).await;

    assert_eq!(result.decision, Decision::Allow);
    assert_eq!(result.rules_evaluated, 1);
    assert_eq!(result.evidence[0].rule_id, "global-rule");
}

#[tokio::test]
async fn empty_rule_set_fails_closed_end_to_end() {
    let enc = encoder();
    let raw = intent_json("tenant-empty", "agent-1", "L4", "read", "internal");
    let bridge_store = Arc::new(Bridge::new());

    let engine = EnforcementEngine::new(bridge_store, enc, EngineConfig::with_defaults());
    let result = engine.enforce_json(&raw, None).await;

    assert_eq!(result.decision, Decision::Block);
    assert!(matches!(result.error, Some(EngineError::NoRulesConfigured)));
}

#[tokio::test]
async fn deadline_expiry_blocks_even_when_rules_would_otherwise_allow() {
    // Build the matching anchors with the fast embedder (what "would
    // otherwise allow" looks like), then swap in a slow embedder wired to
    // a short deadline so the timeout is deterministic rather than racy.
    let fast_encoder = encoder();
    let raw = intent_json("tenant-a", "agent-1", "L4", "read", "internal");
    let anchors = matching_anchors_for(&fast_encoder, &raw).await;

    let bridge_store = Arc::new(Bridge::new());
    let rule: Arc<dyn bridge::RuleInstance> = Arc::new(
        bridge::families::ToolWhitelistRule::new("r1", "tenant-a", vec!["search".into()]),
    );
    bridge_store.install_rule(rule, anchors).unwrap();

    let vocab = Arc::new(bridge::VocabularyContract::v1());
    let slow_encoder = Arc::new(Encoder::new(vocab, Arc::new(SlowEmbedder), 16));
    let config = EngineConfig::with_defaults().with_deadline(Duration::from_millis(5));
    let engine = EnforcementEngine::new(bridge_store, slow_encoder, config);
    let result = engine.enforce_json(&raw, None).await;

    assert_eq!(result.decision, Decision::Block);
    assert!(matches!(result.error, Some(EngineError::DeadlineExceeded { .. })));
}
