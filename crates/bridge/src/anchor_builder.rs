//! Turns a rule's parameters into `RuleAnchors`, via an injected LLM
//! Anchor Provider that proposes exemplar phrases per slot, then the
//! `Encoder` that turns those phrases into vectors.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use semantic_sandbox::Slot;

use crate::encoder::Encoder;
use crate::error::EngineError;
use crate::rule_anchors::{AnchorBlock, RuleAnchors};
use crate::types::RuleInstance;

/// Bounds on the anchor-phrase schema (`spec.md` §4.2): too few phrases
/// gives the kernel no spread to compare against, too many inflates the
/// comparison cost; phrases outside the word-count band are either
/// single-word keyword stuffing or full paragraphs, neither of which the
/// embedder was tuned on.
const MIN_ANCHOR_PHRASES: usize = 2;
const MAX_ANCHOR_PHRASES: usize = 4;
const MIN_PHRASE_WORDS: usize = 5;
const MAX_PHRASE_WORDS: usize = 15;

/// Exemplar phrases for each slot, as proposed by the anchor provider
/// before encoding. At least one phrase per slot is required; an empty
/// list for any slot is a hard failure (`spec.md` §4.3 anchor generation
/// policy — there is no silent fallback to a wildcard anchor).
#[derive(Debug, Clone)]
pub struct AnchorPhrases {
    pub action: Vec<String>,
    pub resource: Vec<String>,
    pub data: Vec<String>,
    pub risk: Vec<String>,
}

#[async_trait]
pub trait LLMAnchorProvider: Send + Sync {
    async fn generate_anchor_phrases(
        &self,
        family_id: &str,
        rule_payload: &serde_json::Value,
    ) -> Result<AnchorPhrases, EngineError>;
}

pub struct AnchorBuilder {
    encoder: Arc<Encoder>,
    provider: Arc<dyn LLMAnchorProvider>,
    cache: Mutex<HashMap<String, Arc<RuleAnchors>>>,
}

impl AnchorBuilder {
    pub fn new(encoder: Arc<Encoder>, provider: Arc<dyn LLMAnchorProvider>) -> Self {
        AnchorBuilder {
            encoder,
            provider,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Content-hash cache key: the family id plus the rule's management
    /// plane payload, so two rules with identical parameters (even across
    /// different `rule_id`s) share one anchor-generation round trip.
    fn content_hash(family_id: &str, payload: &serde_json::Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(family_id.as_bytes());
        hasher.update(payload.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn build_rule_anchors(
        &self,
        rule: &dyn RuleInstance,
    ) -> Result<Arc<RuleAnchors>, EngineError> {
        let family_id = rule.family_id().family_id();
        let payload = rule.management_plane_payload();
        let key = Self::content_hash(family_id, &payload);

        if let Some(cached) = self.cache.lock().get(&key) {
            return Ok(cached.clone());
        }

        let phrases = self
            .provider
            .generate_anchor_phrases(family_id, &payload)
            .await
            .map_err(|e| EngineError::AnchorGenerationFailure {
                rule_id: rule.rule_id().to_string(),
                reason: e.to_string(),
            })?;

        let anchors = Arc::new(self.encode_phrases(rule.rule_id(), &phrases).await?);
        self.cache.lock().insert(key, anchors.clone());
        Ok(anchors)
    }

    async fn encode_phrases(
        &self,
        rule_id: &str,
        phrases: &AnchorPhrases,
    ) -> Result<RuleAnchors, EngineError> {
        let action = self.encode_block(rule_id, Slot::Action, &phrases.action).await?;
        let resource = self.encode_block(rule_id, Slot::Resource, &phrases.resource).await?;
        let data = self.encode_block(rule_id, Slot::Data, &phrases.data).await?;
        let risk = self.encode_block(rule_id, Slot::Risk, &phrases.risk).await?;

        Ok(RuleAnchors {
            action,
            resource,
            data,
            risk,
        })
    }

    async fn encode_block(
        &self,
        rule_id: &str,
        slot: Slot,
        phrases: &[String],
    ) -> Result<AnchorBlock, EngineError> {
        if !(MIN_ANCHOR_PHRASES..=MAX_ANCHOR_PHRASES).contains(&phrases.len()) {
            return Err(EngineError::AnchorGenerationFailure {
                rule_id: rule_id.to_string(),
                reason: format!(
                    "slot {slot} proposed {} exemplar phrases, expected {MIN_ANCHOR_PHRASES}-{MAX_ANCHOR_PHRASES}",
                    phrases.len()
                ),
            });
        }

        for phrase in phrases {
            let words = phrase.split_whitespace().count();
            if !(MIN_PHRASE_WORDS..=MAX_PHRASE_WORDS).contains(&words) {
                return Err(EngineError::AnchorGenerationFailure {
                    rule_id: rule_id.to_string(),
                    reason: format!(
                        "slot {slot} phrase '{phrase}' has {words} words, expected {MIN_PHRASE_WORDS}-{MAX_PHRASE_WORDS}"
                    ),
                });
            }
        }

        let mut vectors = Vec::with_capacity(phrases.len());
        for phrase in phrases {
            vectors.push(self.encoder.encode_anchor(slot, phrase).await?);
        }
        AnchorBlock::new(vectors)
    }
}
