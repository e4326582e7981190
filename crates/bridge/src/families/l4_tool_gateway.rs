use serde_json::json;

use semantic_sandbox::DecisionMode;

use crate::types::{now_ms, ComparisonConfig, LayerId, RuleFamilyId, RuleInstance, RuleScope};

/// Looser on action/data/risk (tool calls are phrased tersely and the data
/// slot rarely carries much signal) but stricter on resource, since
/// mistaking one tool for another is the costliest failure mode here.
const TOOL_WHITELIST_THRESHOLDS: ComparisonConfig = ComparisonConfig {
    thresholds: [0.60, 0.88, 0.70, 0.60],
    weights: [1.0, 1.0, 1.0, 1.0],
    mode: DecisionMode::Min,
    global_threshold: 0.70,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
}

impl ParamType {
    fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Float => "float",
            ParamType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementMode {
    /// Violations block the call.
    Hard,
    /// Violations are logged but the call proceeds.
    Soft,
}

impl EnforcementMode {
    fn as_str(self) -> &'static str {
        match self {
            EnforcementMode::Hard => "hard",
            EnforcementMode::Soft => "soft",
        }
    }
}

/// Constrains which tools an agent may invoke, and at what rate.
#[derive(Debug, Clone)]
pub struct ToolWhitelistRule {
    pub rule_id: String,
    pub tenant_id: String,
    pub priority: i32,
    pub scope: RuleScope,
    pub allowed_tool_ids: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub rate_limit_per_min: Option<u32>,
    pub created_at_ms: u64,
    pub description: String,
    pub enabled: bool,
    pub comparison: ComparisonConfig,
}

impl ToolWhitelistRule {
    pub fn new(
        rule_id: impl Into<String>,
        tenant_id: impl Into<String>,
        allowed_tool_ids: Vec<String>,
    ) -> Self {
        ToolWhitelistRule {
            rule_id: rule_id.into(),
            tenant_id: tenant_id.into(),
            priority: 100,
            scope: RuleScope::global(),
            allowed_tool_ids,
            allowed_methods: Vec::new(),
            rate_limit_per_min: None,
            created_at_ms: now_ms(),
            description: String::new(),
            enabled: true,
            comparison: TOOL_WHITELIST_THRESHOLDS,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn for_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.scope = RuleScope::for_agent(agent_id);
        self
    }

    pub fn with_allowed_methods(mut self, methods: Vec<String>) -> Self {
        self.allowed_methods = methods;
        self
    }

    pub fn with_rate_limit_per_min(mut self, limit: u32) -> Self {
        self.rate_limit_per_min = Some(limit);
        self
    }

    pub fn with_comparison_config(mut self, comparison: ComparisonConfig) -> Self {
        self.comparison = comparison;
        self
    }
}

impl RuleInstance for ToolWhitelistRule {
    fn rule_id(&self) -> &str {
        &self.rule_id
    }
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
    fn priority(&self) -> i32 {
        self.priority
    }
    fn scope(&self) -> &RuleScope {
        &self.scope
    }
    fn family_id(&self) -> RuleFamilyId {
        RuleFamilyId::ToolWhitelist
    }
    fn layer_id(&self) -> LayerId {
        LayerId::L4ToolGateway
    }
    fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn is_enabled(&self) -> bool {
        self.enabled
    }
    fn comparison_config(&self) -> ComparisonConfig {
        self.comparison
    }
    fn management_plane_payload(&self) -> serde_json::Value {
        json!({
            "rule_id": self.rule_id,
            "family_id": self.family_id().family_id(),
            "allowed_tool_ids": self.allowed_tool_ids,
            "allowed_methods": self.allowed_methods,
            "rate_limit_per_min": self.rate_limit_per_min,
        })
    }
}

/// Constrains one tool call parameter's shape and allowed values.
#[derive(Debug, Clone)]
pub struct ToolParamConstraintRule {
    pub rule_id: String,
    pub tenant_id: String,
    pub priority: i32,
    pub scope: RuleScope,
    pub tool_id: String,
    pub param_name: String,
    pub param_type: ParamType,
    pub regex: Option<String>,
    pub allowed_values: Option<Vec<String>>,
    pub max_len: Option<usize>,
    pub enforcement_mode: EnforcementMode,
    pub created_at_ms: u64,
    pub description: String,
    pub enabled: bool,
    pub comparison: ComparisonConfig,
}

impl ToolParamConstraintRule {
    pub fn new(
        rule_id: impl Into<String>,
        tenant_id: impl Into<String>,
        tool_id: impl Into<String>,
        param_name: impl Into<String>,
        param_type: ParamType,
    ) -> Self {
        ToolParamConstraintRule {
            rule_id: rule_id.into(),
            tenant_id: tenant_id.into(),
            priority: 100,
            scope: RuleScope::global(),
            tool_id: tool_id.into(),
            param_name: param_name.into(),
            param_type,
            regex: None,
            allowed_values: None,
            max_len: None,
            enforcement_mode: EnforcementMode::Hard,
            created_at_ms: now_ms(),
            description: String::new(),
            enabled: true,
            comparison: ComparisonConfig::default_v1(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    pub fn with_allowed_values(mut self, values: Vec<String>) -> Self {
        self.allowed_values = Some(values);
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    pub fn with_enforcement_mode(mut self, mode: EnforcementMode) -> Self {
        self.enforcement_mode = mode;
        self
    }

    pub fn with_comparison_config(mut self, comparison: ComparisonConfig) -> Self {
        self.comparison = comparison;
        self
    }
}

impl RuleInstance for ToolParamConstraintRule {
    fn rule_id(&self) -> &str {
        &self.rule_id
    }
    fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
    fn priority(&self) -> i32 {
        self.priority
    }
    fn scope(&self) -> &RuleScope {
        &self.scope
    }
    fn family_id(&self) -> RuleFamilyId {
        RuleFamilyId::ToolParamConstraint
    }
    fn layer_id(&self) -> LayerId {
        LayerId::L4ToolGateway
    }
    fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn is_enabled(&self) -> bool {
        self.enabled
    }
    fn comparison_config(&self) -> ComparisonConfig {
        self.comparison
    }
    fn management_plane_payload(&self) -> serde_json::Value {
        json!({
            "rule_id": self.rule_id,
            "family_id": self.family_id().family_id(),
            "tool_id": self.tool_id,
            "param_name": self.param_name,
            "param_type": self.param_type.as_str(),
            "regex": self.regex,
            "allowed_values": self.allowed_values,
            "max_len": self.max_len,
            "enforcement_mode": self.enforcement_mode.as_str(),
        })
    }
}
