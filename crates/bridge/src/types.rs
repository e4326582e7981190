//! Core rule-model types: layers, rule families, scoping, and the
//! `RuleInstance` trait every family's rule struct implements.

use std::time::{SystemTime, UNIX_EPOCH};

use semantic_sandbox::DecisionMode;

/// The seven layers a request passes through, L0 (system boundary) through
/// L6 (egress). Evaluation order follows this enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    L0System,
    L1Input,
    L2Planner,
    L3ModelIo,
    L4ToolGateway,
    L5Rag,
    L6Egress,
}

impl LayerId {
    pub const ALL: [LayerId; 7] = [
        LayerId::L0System,
        LayerId::L1Input,
        LayerId::L2Planner,
        LayerId::L3ModelIo,
        LayerId::L4ToolGateway,
        LayerId::L5Rag,
        LayerId::L6Egress,
    ];

    pub fn layer_num(self) -> u8 {
        match self {
            LayerId::L0System => 0,
            LayerId::L1Input => 1,
            LayerId::L2Planner => 2,
            LayerId::L3ModelIo => 3,
            LayerId::L4ToolGateway => 4,
            LayerId::L5Rag => 5,
            LayerId::L6Egress => 6,
        }
    }

    pub fn from_str_id(s: &str) -> Option<LayerId> {
        match s {
            "L0" => Some(LayerId::L0System),
            "L1" => Some(LayerId::L1Input),
            "L2" => Some(LayerId::L2Planner),
            "L3" => Some(LayerId::L3ModelIo),
            "L4" => Some(LayerId::L4ToolGateway),
            "L5" => Some(LayerId::L5Rag),
            "L6" => Some(LayerId::L6Egress),
            _ => None,
        }
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.layer_num())
    }
}

/// The fourteen rule families, two per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleFamilyId {
    SystemBoundary,
    SystemIdentity,
    InputSanitization,
    InputSchema,
    PromptAssembly,
    PromptLength,
    ModelOutputScan,
    ModelOutputEscalate,
    ToolWhitelist,
    ToolParamConstraint,
    RagSourceTrust,
    RagDocSensitivity,
    OutputAudit,
    OutputPii,
}

impl RuleFamilyId {
    pub const ALL: [RuleFamilyId; 14] = [
        RuleFamilyId::SystemBoundary,
        RuleFamilyId::SystemIdentity,
        RuleFamilyId::InputSanitization,
        RuleFamilyId::InputSchema,
        RuleFamilyId::PromptAssembly,
        RuleFamilyId::PromptLength,
        RuleFamilyId::ModelOutputScan,
        RuleFamilyId::ModelOutputEscalate,
        RuleFamilyId::ToolWhitelist,
        RuleFamilyId::ToolParamConstraint,
        RuleFamilyId::RagSourceTrust,
        RuleFamilyId::RagDocSensitivity,
        RuleFamilyId::OutputAudit,
        RuleFamilyId::OutputPii,
    ];

    pub fn layer(self) -> LayerId {
        match self {
            RuleFamilyId::SystemBoundary | RuleFamilyId::SystemIdentity => LayerId::L0System,
            RuleFamilyId::InputSanitization | RuleFamilyId::InputSchema => LayerId::L1Input,
            RuleFamilyId::PromptAssembly | RuleFamilyId::PromptLength => LayerId::L2Planner,
            RuleFamilyId::ModelOutputScan | RuleFamilyId::ModelOutputEscalate => {
                LayerId::L3ModelIo
            }
            RuleFamilyId::ToolWhitelist | RuleFamilyId::ToolParamConstraint => {
                LayerId::L4ToolGateway
            }
            RuleFamilyId::RagSourceTrust | RuleFamilyId::RagDocSensitivity => LayerId::L5Rag,
            RuleFamilyId::OutputAudit | RuleFamilyId::OutputPii => LayerId::L6Egress,
        }
    }

    pub fn family_id(self) -> &'static str {
        match self {
            RuleFamilyId::SystemBoundary => "system_boundary",
            RuleFamilyId::SystemIdentity => "system_identity",
            RuleFamilyId::InputSanitization => "input_sanitization",
            RuleFamilyId::InputSchema => "input_schema",
            RuleFamilyId::PromptAssembly => "prompt_assembly",
            RuleFamilyId::PromptLength => "prompt_length",
            RuleFamilyId::ModelOutputScan => "model_output_scan",
            RuleFamilyId::ModelOutputEscalate => "model_output_escalate",
            RuleFamilyId::ToolWhitelist => "tool_whitelist",
            RuleFamilyId::ToolParamConstraint => "tool_param_constraint",
            RuleFamilyId::RagSourceTrust => "rag_source_trust",
            RuleFamilyId::RagDocSensitivity => "rag_doc_sensitivity",
            RuleFamilyId::OutputAudit => "output_audit",
            RuleFamilyId::OutputPii => "output_pii",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RuleFamilyId::SystemBoundary => "constrains which system prompts/roots are legal",
            RuleFamilyId::SystemIdentity => "constrains agent/tenant identity claims",
            RuleFamilyId::InputSanitization => "screens untrusted input for injected instructions",
            RuleFamilyId::InputSchema => "constrains the shape of incoming requests",
            RuleFamilyId::PromptAssembly => "constrains how a planner assembles sub-prompts",
            RuleFamilyId::PromptLength => "bounds planner prompt size",
            RuleFamilyId::ModelOutputScan => "screens model output for disallowed content",
            RuleFamilyId::ModelOutputEscalate => "routes risky model output to escalation",
            RuleFamilyId::ToolWhitelist => "constrains which tools an agent may invoke",
            RuleFamilyId::ToolParamConstraint => "constrains tool call parameters",
            RuleFamilyId::RagSourceTrust => "constrains which retrieval sources are trusted",
            RuleFamilyId::RagDocSensitivity => "constrains retrieved document sensitivity",
            RuleFamilyId::OutputAudit => "requires audit logging of egress content",
            RuleFamilyId::OutputPii => "screens egress content for PII",
        }
    }
}

impl std::fmt::Display for RuleFamilyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.family_id())
    }
}

/// Which agents (within one tenant) a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleScope {
    pub is_global: bool,
    pub agent_ids: Vec<String>,
    pub tags: Vec<String>,
}

impl RuleScope {
    pub fn global() -> Self {
        RuleScope {
            is_global: true,
            ..Default::default()
        }
    }

    pub fn for_agent(agent_id: impl Into<String>) -> Self {
        RuleScope {
            agent_ids: vec![agent_id.into()],
            ..Default::default()
        }
    }

    pub fn for_agents(agent_ids: impl IntoIterator<Item = String>) -> Self {
        RuleScope {
            agent_ids: agent_ids.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn applies_to(&self, agent_id: &str) -> bool {
        self.is_global || self.agent_ids.iter().any(|a| a == agent_id)
    }
}

/// A rule's own comparison settings: per-slot thresholds, per-slot weights,
/// which mode combines them, and the global threshold `weighted_avg` checks
/// against. Every rule carries its own copy — these are never shared engine
/// state, so two rules in the same family can disagree on how strict they
/// are (`spec.md` §3 "Rule").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonConfig {
    /// Per-slot thresholds [action, resource, data, risk], used in `Min` mode.
    pub thresholds: [f32; 4],
    /// Per-slot weights [action, resource, data, risk], used in `WeightedAvg` mode.
    pub weights: [f32; 4],
    pub mode: DecisionMode,
    /// Used only in `WeightedAvg` mode.
    pub global_threshold: f32,
}

impl ComparisonConfig {
    pub fn uniform_min(threshold: f32) -> Self {
        ComparisonConfig {
            thresholds: [threshold; 4],
            weights: [1.0; 4],
            mode: DecisionMode::Min,
            global_threshold: threshold,
        }
    }

    /// The spec's default: `{action:0.85, resource:0.80, data:0.75,
    /// risk:0.70}`, `min` mode, uniform weights. Per-rule overridable.
    pub fn default_v1() -> Self {
        ComparisonConfig {
            thresholds: [0.85, 0.80, 0.75, 0.70],
            weights: [1.0; 4],
            mode: DecisionMode::Min,
            global_threshold: 0.75,
        }
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self::default_v1()
    }
}

/// Every rule family's struct implements this, so the store and the
/// enforcement engine can treat rules uniformly regardless of family.
pub trait RuleInstance: Send + Sync {
    fn rule_id(&self) -> &str;
    fn tenant_id(&self) -> &str;
    fn priority(&self) -> i32;
    fn scope(&self) -> &RuleScope;
    fn family_id(&self) -> RuleFamilyId;
    fn layer_id(&self) -> LayerId {
        self.family_id().layer()
    }
    fn created_at_ms(&self) -> u64;
    fn description(&self) -> &str;
    fn is_enabled(&self) -> bool;
    /// This rule's own thresholds/weights/mode/global_threshold — read by
    /// the comparison kernel bridge, never by an engine-wide default.
    fn comparison_config(&self) -> ComparisonConfig;
    /// A JSON-shaped snapshot of this rule's parameters, used by whatever
    /// generated its anchors (for hashing/caching) and for introspection.
    fn management_plane_payload(&self) -> serde_json::Value;
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
