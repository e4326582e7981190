//! The Encoder: turns canonical text into a 128-dim intent vector, via an
//! injected `Embedder` plus the fixed per-slot sparse projections
//! (`spec.md` §4.1).

use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;

use semantic_sandbox::{Slot, SLOT_WIDTH};

use crate::error::EngineError;
use crate::intent::Intent;
use crate::projection::{ProjectionMatrix, BASE_EMBEDDING_WIDTH};
use crate::vocabulary::VocabularyContract;

/// The external text-embedding collaborator. Implementations call out to
/// whatever embedding model the deployment uses; the engine only requires
/// a fixed-width, deterministic-for-the-same-text vector back.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<[f32; BASE_EMBEDDING_WIDTH], EngineError>;
}

pub struct Encoder {
    vocab: Arc<VocabularyContract>,
    embedder: Arc<dyn Embedder>,
    projections: [ProjectionMatrix; 4],
    cache: Mutex<LruCache<String, [f32; BASE_EMBEDDING_WIDTH]>>,
}

impl Encoder {
    pub fn new(vocab: Arc<VocabularyContract>, embedder: Arc<dyn Embedder>, cache_capacity: usize) -> Self {
        let projections = [
            ProjectionMatrix::from_seed(vocab.action_seed),
            ProjectionMatrix::from_seed(vocab.resource_seed),
            ProjectionMatrix::from_seed(vocab.data_seed),
            ProjectionMatrix::from_seed(vocab.risk_seed),
        ];

        let capacity = NonZeroUsize::new(cache_capacity.max(1)).expect("capacity is at least 1");

        Encoder {
            vocab,
            embedder,
            projections,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    async fn base_embedding(&self, text: &str) -> Result<[f32; BASE_EMBEDDING_WIDTH], EngineError> {
        if let Some(cached) = self.cache.lock().get(text) {
            return Ok(*cached);
        }

        let embedding = self.embedder.embed(text).await?;
        self.cache.lock().put(text.to_string(), embedding);
        Ok(embedding)
    }

    /// Projects and L2-normalizes one slot's base embedding, substituting
    /// the vocabulary contract's canonical zero-safe vector when the
    /// projected vector's norm is (numerically) zero.
    fn project_and_normalize(&self, slot: Slot, base: &[f32; BASE_EMBEDDING_WIDTH]) -> [f32; SLOT_WIDTH] {
        let projected = self.projections[slot.index()].project(base);
        let norm: f32 = projected.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm < 1e-8 {
            self.vocab.zero_safe_vector()
        } else {
            let mut out = [0.0f32; SLOT_WIDTH];
            for (o, v) in out.iter_mut().zip(projected.iter()) {
                *o = v / norm;
            }
            out
        }
    }

    async fn encode_slot(&self, slot: Slot, text: &str) -> Result<[f32; SLOT_WIDTH], EngineError> {
        if text.trim().is_empty() {
            return Ok(self.vocab.zero_safe_vector());
        }
        let base = self.base_embedding(text).await?;
        Ok(self.project_and_normalize(slot, &base))
    }

    /// Produces the intent's 128-dim vector: four concatenated,
    /// independently L2-normalized slot blocks.
    pub async fn encode_intent(&self, intent: &Intent) -> Result<[f32; 128], EngineError> {
        intent.validate(&self.vocab)?;

        let action = self
            .encode_slot(Slot::Action, &intent.action_slot_text(&self.vocab))
            .await?;
        let resource = self
            .encode_slot(Slot::Resource, &intent.resource_slot_text(&self.vocab))
            .await?;
        let data = self
            .encode_slot(Slot::Data, &intent.data_slot_text(&self.vocab))
            .await?;
        let risk = self
            .encode_slot(Slot::Risk, &intent.risk_slot_text(&self.vocab))
            .await?;

        let mut out = [0.0f32; 128];
        out[0..32].copy_from_slice(&action);
        out[32..64].copy_from_slice(&resource);
        out[64..96].copy_from_slice(&data);
        out[96..128].copy_from_slice(&risk);
        Ok(out)
    }

    /// Encodes a single exemplar phrase into one slot's anchor vector, for
    /// use by the anchor builder when turning rule authoring text into
    /// `RuleAnchors`.
    pub async fn encode_anchor(&self, slot: Slot, exemplar_text: &str) -> Result<[f32; SLOT_WIDTH], EngineError> {
        self.encode_slot(slot, exemplar_text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Actor, Data, Resource, Risk};

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<[f32; BASE_EMBEDDING_WIDTH], EngineError> {
            let mut v = [0.0f32; BASE_EMBEDDING_WIDTH];
            let seed = text.bytes().map(|b| b as u32).sum::<u32>() as f32;
            for (i, x) in v.iter_mut().enumerate() {
                *x = ((seed + i as f32) % 7.0) - 3.0;
            }
            Ok(v)
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<[f32; BASE_EMBEDDING_WIDTH], EngineError> {
            Err(EngineError::EmbedderFailure("unreachable".into()))
        }
    }

    fn sample_intent() -> Intent {
        Intent {
            id: "req-1".into(),
            timestamp: 1_700_000_000.0,
            schema_version: "1.0".into(),
            tenant_id: "tenant-a".into(),
            layer: "L4".into(),
            action: "read".into(),
            actor: Actor {
                id: "agent-1".into(),
                actor_type: "agent".into(),
            },
            resource: Resource {
                resource_type: "database".into(),
                name: Some("customers".into()),
                location: Some("cloud".into()),
            },
            data: Data {
                sensitivity: vec!["confidential".into()],
                pii: Some(true),
                volume: Some("bulk".into()),
            },
            risk: Risk {
                authn: Some("required".into()),
            },
            rate_limit: None,
            tool_name: None,
            tool_method: None,
            tool_params: std::collections::HashMap::new(),
        }
    }

    #[tokio::test]
    async fn encode_intent_produces_per_slot_unit_norm_blocks() {
        let vocab = Arc::new(VocabularyContract::v1());
        let encoder = Encoder::new(vocab, Arc::new(FixedEmbedder), 16);
        let vector = encoder.encode_intent(&sample_intent()).await.unwrap();

        for slot in semantic_sandbox::Slot::ALL {
            let i = slot.index() * 32;
            let block = &vector[i..i + 32];
            let norm: f32 = block.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4, "slot {slot} norm was {norm}");
        }
    }

    #[tokio::test]
    async fn encode_intent_rejects_vocabulary_violations() {
        let vocab = Arc::new(VocabularyContract::v1());
        let encoder = Encoder::new(vocab, Arc::new(FixedEmbedder), 16);
        let mut intent = sample_intent();
        intent.action = "not_a_real_action".into();
        assert!(encoder.encode_intent(&intent).await.is_err());
    }

    #[tokio::test]
    async fn encode_intent_propagates_embedder_failure() {
        let vocab = Arc::new(VocabularyContract::v1());
        let encoder = Encoder::new(vocab, Arc::new(FailingEmbedder), 16);
        let result = encoder.encode_intent(&sample_intent()).await;
        assert!(matches!(result, Err(EngineError::EmbedderFailure(_))));
    }

    #[tokio::test]
    async fn repeated_text_hits_the_cache() {
        let vocab = Arc::new(VocabularyContract::v1());
        let encoder = Encoder::new(vocab, Arc::new(FixedEmbedder), 16);
        let a = encoder.encode_intent(&sample_intent()).await.unwrap();
        let b = encoder.encode_intent(&sample_intent()).await.unwrap();
        assert_eq!(a, b);
    }
}
