//! Layered rule storage and enforcement for semantic policy decisions.
//!
//! An [`Intent`] is encoded into a 128-dim vector by an [`Encoder`], rules
//! applicable to its `(tenant_id, layer, agent_id)` are pulled from a
//! [`Bridge`], and an [`EnforcementEngine`] compares the intent against
//! each rule's [`RuleAnchors`] via the `semantic-sandbox` kernel, in
//! priority order, short-circuiting on the first BLOCK.

pub mod anchor_builder;
pub mod bridge;
pub mod comparison;
pub mod config;
pub mod encoder;
pub mod enforcement;
pub mod error;
pub mod families;
pub mod http_collaborators;
pub mod indices;
pub mod intent;
#[cfg(feature = "persistence")]
pub mod persistence;
pub mod projection;
pub mod rule_anchors;
pub mod table;
pub mod types;
pub mod vocabulary;

pub use anchor_builder::{AnchorBuilder, AnchorPhrases, LLMAnchorProvider};
pub use bridge::{Bridge, BridgeStats, InstallRulesReport};
pub use config::EngineConfig;
pub use encoder::{Embedder, Encoder};
pub use enforcement::{Decision, EnforcementEngine, EnforcementResult, RuleEvidence, TenantIdentityProvider};
pub use error::{EngineError, Result};
pub use http_collaborators::{HttpAnchorProvider, HttpEmbedder};
pub use intent::{Actor, Data, Intent, RateLimitContext, Resource, Risk};
pub use rule_anchors::{AnchorBlock, RuleAnchors};
pub use types::{now_ms, ComparisonConfig, LayerId, RuleFamilyId, RuleInstance, RuleScope};
pub use vocabulary::VocabularyContract;

#[cfg(feature = "persistence")]
pub use persistence::{RuleMetadataStore, SqliteRuleMetadataStore};
