//! The enforcement engine: encodes an intent, pulls the applicable rules
//! for its layer, and evaluates them in priority order with short-circuit
//! on the first BLOCK (`spec.md` §5.2 "Evaluation Algorithm").
//!
//! Every exit path — a real error, an empty rule set, or a deadline
//! expiry — resolves to a BLOCK decision. There is no path by which an
//! `Err` anywhere in this module can surface as an ALLOW.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};

use crate::bridge::Bridge;
use crate::comparison::compare_rule;
use crate::config::EngineConfig;
use crate::encoder::Encoder;
use crate::error::EngineError;
use crate::intent::Intent;
use crate::types::{LayerId, RuleFamilyId};

/// Resolves a caller's credential into a tenant id before the intent is
/// enforced, for deployments where the request transport carries identity
/// separately from the structured intent body.
#[async_trait]
pub trait TenantIdentityProvider: Send + Sync {
    async fn resolve_tenant(&self, credential: &str) -> Result<String, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Block,
}

#[derive(Debug, Clone)]
pub struct RuleEvidence {
    pub rule_id: String,
    pub family_id: RuleFamilyId,
    pub allowed: bool,
    pub slice_similarities: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct EnforcementResult {
    pub decision: Decision,
    pub evidence: Vec<RuleEvidence>,
    pub rules_evaluated: usize,
    /// Set when the decision was forced to `Block` by a fault rather than
    /// an evaluated rule: a malformed intent, an embedder/anchor failure,
    /// an empty rule set, or a deadline expiry.
    pub error: Option<EngineError>,
    /// The originating `Intent::id`, for correlating this result back to
    /// the request that produced it. `None` only when the raw JSON could
    /// not be parsed into an `Intent` at all.
    pub intent_id: Option<String>,
}

impl EnforcementResult {
    fn blocked_with_error(error: EngineError, intent_id: Option<String>) -> Self {
        EnforcementResult {
            decision: Decision::Block,
            evidence: Vec::new(),
            rules_evaluated: 0,
            error: Some(error),
            intent_id,
        }
    }

    fn blocked_partway(evidence: Vec<RuleEvidence>, error: EngineError, intent_id: Option<String>) -> Self {
        let rules_evaluated = evidence.len();
        EnforcementResult {
            decision: Decision::Block,
            evidence,
            rules_evaluated,
            error: Some(error),
            intent_id,
        }
    }

    pub fn allowed(&self) -> bool {
        self.decision == Decision::Allow
    }
}

pub struct EnforcementEngine {
    bridge: Arc<Bridge>,
    encoder: Arc<Encoder>,
    config: EngineConfig,
    identity_provider: Option<Arc<dyn TenantIdentityProvider>>,
}

impl EnforcementEngine {
    pub fn new(bridge: Arc<Bridge>, encoder: Arc<Encoder>, config: EngineConfig) -> Self {
        EnforcementEngine {
            bridge,
            encoder,
            config,
            identity_provider: None,
        }
    }

    pub fn with_identity_provider(mut self, provider: Arc<dyn TenantIdentityProvider>) -> Self {
        self.identity_provider = Some(provider);
        self
    }

    /// Parses `raw_intent_json`, optionally resolving `tenant_id` from a
    /// transport-level credential first, then enforces it.
    pub async fn enforce_json(&self, raw_intent_json: &str, credential: Option<&str>) -> EnforcementResult {
        let mut intent: Intent = match serde_json::from_str(raw_intent_json) {
            Ok(i) => i,
            Err(e) => {
                return EnforcementResult::blocked_with_error(EngineError::MalformedIntent(e.to_string()), None)
            }
        };

        if let (Some(provider), Some(credential)) = (&self.identity_provider, credential) {
            match provider.resolve_tenant(credential).await {
                Ok(tenant_id) => intent.tenant_id = tenant_id,
                Err(e) => return EnforcementResult::blocked_with_error(e, Some(intent.id.clone())),
            }
        }

        self.enforce(&intent).await
    }

    pub async fn enforce(&self, intent: &Intent) -> EnforcementResult {
        let deadline: Duration = self.config.enforcement_deadline;
        match tokio::time::timeout(deadline, self.enforce_inner(intent)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "enforcement deadline of {}ms exceeded tenant='{}' agent='{}' layer='{}'",
                    deadline.as_millis(),
                    intent.tenant_id,
                    intent.agent_id(),
                    intent.layer
                );
                EnforcementResult::blocked_with_error(
                    EngineError::DeadlineExceeded {
                        elapsed_ms: deadline.as_millis() as u64,
                    },
                    Some(intent.id.clone()),
                )
            }
        }
    }

    async fn enforce_inner(&self, intent: &Intent) -> EnforcementResult {
        let layer = match LayerId::from_str_id(&intent.layer) {
            Some(layer) => layer,
            None => {
                return EnforcementResult::blocked_with_error(
                    EngineError::MalformedIntent(format!("unknown layer '{}'", intent.layer)),
                    Some(intent.id.clone()),
                )
            }
        };

        let vector = match self.encoder.encode_intent(intent).await {
            Ok(v) => v,
            Err(e) => return EnforcementResult::blocked_with_error(e, Some(intent.id.clone())),
        };

        let rules = self
            .bridge
            .rules_for_layer(&intent.tenant_id, layer, intent.agent_id());

        if rules.is_empty() {
            warn!(
                "no rules configured for tenant='{}' layer={} agent='{}' -- failing closed",
                intent.tenant_id,
                layer,
                intent.agent_id()
            );
            return EnforcementResult::blocked_with_error(EngineError::NoRulesConfigured, Some(intent.id.clone()));
        }

        let mut evidence = Vec::with_capacity(rules.len());
        for (rule, anchors) in &rules {
            let comparison_config = rule.comparison_config();
            match compare_rule(vector, anchors, &comparison_config) {
                Ok(result) => {
                    let allowed = result.allowed();
                    evidence.push(RuleEvidence {
                        rule_id: rule.rule_id().to_string(),
                        family_id: rule.family_id(),
                        allowed,
                        slice_similarities: result.slice_similarities,
                    });

                    if !allowed {
                        info!(
                            "rule '{}' blocked intent tenant='{}' agent='{}' layer={}",
                            rule.rule_id(),
                            intent.tenant_id,
                            intent.agent_id(),
                            layer
                        );
                        let rules_evaluated = evidence.len();
                        return EnforcementResult {
                            decision: Decision::Block,
                            evidence,
                            rules_evaluated,
                            error: None,
                            intent_id: Some(intent.id.clone()),
                        };
                    }
                }
                Err(e) => {
                    warn!("rule '{}' failed comparison: {e} -- failing closed", rule.rule_id());
                    return EnforcementResult::blocked_partway(evidence, e, Some(intent.id.clone()));
                }
            }
        }

        let rules_evaluated = evidence.len();
        EnforcementResult {
            decision: Decision::Allow,
            evidence,
            rules_evaluated,
            error: None,
            intent_id: Some(intent.id.clone()),
        }
    }
}
