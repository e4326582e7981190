//! Error taxonomy for the enforcement engine.
//!
//! Every fallible operation returns one of these variants. No error path is
//! permitted to resolve to ALLOW — callers that see an `Err` must treat the
//! request as failed, not as a passing decision.

use thiserror::Error;

use semantic_sandbox::Slot;

#[derive(Debug, Error)]
pub enum EngineError {
    /// An enumerated field held a value outside the vocabulary contract.
    #[error("vocabulary violation: field '{field}' has value '{value}'")]
    VocabularyViolation { field: String, value: String },

    /// The intent was missing a field required to resolve
    /// `(tenant_id, agent_id, layer)` or otherwise enforce.
    #[error("malformed intent: {0}")]
    MalformedIntent(String),

    /// The external Embedder was unavailable, timed out, or returned a
    /// vector of the wrong dimension.
    #[error("embedder failure: {0}")]
    EmbedderFailure(String),

    /// The external LLM Anchor Provider failed, timed out, or returned a
    /// response that didn't validate against the anchor schema.
    #[error("anchor generation failure for rule '{rule_id}': {reason}")]
    AnchorGenerationFailure { rule_id: String, reason: String },

    /// `install` was called with a `rule_id` already present in the store.
    #[error("duplicate rule id: {0}")]
    DuplicateRuleId(String),

    /// A lookup by `rule_id` found nothing.
    #[error("rule not found: {0}")]
    RuleNotFound(String),

    /// An internal invariant was violated (e.g. a listed rule has no
    /// corresponding anchors, or a slot id could not be resolved). This
    /// always short-circuits the current call as a BLOCK.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// The enforcement deadline elapsed before a decision could be reached.
    /// This is a BLOCK, not a timeout-as-error in the transport sense.
    #[error("deadline exceeded after {elapsed_ms}ms")]
    DeadlineExceeded { elapsed_ms: u64 },

    /// No rules were found for the requested `(tenant_id, agent_id, layer)`.
    /// Fail-closed: this is reported as a BLOCK decision, not a request error.
    #[error("no rules configured")]
    NoRulesConfigured,

    /// The comparison kernel refused to run because a rule's anchor count
    /// was zero for some slot.
    #[error("kernel precondition violated on slot {0}: zero anchor count")]
    KernelPrecondition(Slot),
}

impl EngineError {
    /// Stable external error code, per the spec's external interface contract.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::VocabularyViolation { .. } => "VocabularyViolation",
            EngineError::MalformedIntent(_) => "MalformedIntent",
            EngineError::EmbedderFailure(_) => "EmbedderFailure",
            EngineError::AnchorGenerationFailure { .. } => "AnchorGenerationFailure",
            EngineError::DuplicateRuleId(_) => "DuplicateRuleId",
            EngineError::RuleNotFound(_) => "RuleNotFound",
            EngineError::InternalInconsistency(_) => "InternalInconsistency",
            EngineError::DeadlineExceeded { .. } => "DeadlineExceeded",
            EngineError::NoRulesConfigured => "NoRulesConfigured",
            EngineError::KernelPrecondition(_) => "InternalInconsistency",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
