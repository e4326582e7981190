use serde_json::json;

use crate::types::{now_ms, ComparisonConfig, LayerId, RuleFamilyId, RuleInstance, RuleScope};

/// Screens model output for disallowed content categories.
#[derive(Debug, Clone)]
pub struct ModelOutputScanRule {
    pub rule_id: String,
    pub tenant_id: String,
    pub priority: i32,
    pub scope: RuleScope,
    pub disallowed_categories: Vec<String>,
    pub created_at_ms: u64,
    pub description: String,
    pub enabled: bool,
    pub comparison: ComparisonConfig,
}

impl ModelOutputScanRule {
    pub fn new(
        rule_id: impl Into<String>,
        tenant_id: impl Into<String>,
        disallowed_categories: Vec<String>,
    ) -> Self {
        ModelOutputScanRule {
            rule_id: rule_id.into(),
            tenant_id: tenant_id.into(),
            priority: 100,
            scope: RuleScope::global(),
            disallowed_categories,
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

    pub fn with_comparison_config(mut self, comparison: ComparisonConfig) -> Self {
        self.comparison = comparison;
        self
    }
}

impl RuleInstance for ModelOutputScanRule {
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
        RuleFamilyId::ModelOutputScan
    }
    fn layer_id(&self) -> LayerId {
        LayerId::L3ModelIo
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
            "disallowed_categories": self.disallowed_categories,
        })
    }
}

/// Routes risky model output to a named escalation target instead of
/// letting it pass straight through.
#[derive(Debug, Clone)]
pub struct ModelOutputEscalateRule {
    pub rule_id: String,
    pub tenant_id: String,
    pub priority: i32,
    pub scope: RuleScope,
    pub escalate_on_categories: Vec<String>,
    pub escalation_target: String,
    pub created_at_ms: u64,
    pub description: String,
    pub enabled: bool,
    pub comparison: ComparisonConfig,
}

impl ModelOutputEscalateRule {
    pub fn new(
        rule_id: impl Into<String>,
        tenant_id: impl Into<String>,
        escalate_on_categories: Vec<String>,
        escalation_target: impl Into<String>,
    ) -> Self {
        ModelOutputEscalateRule {
            rule_id: rule_id.into(),
            tenant_id: tenant_id.into(),
            priority: 100,
            scope: RuleScope::global(),
            escalate_on_categories,
            escalation_target: escalation_target.into(),
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

    pub fn with_comparison_config(mut self, comparison: ComparisonConfig) -> Self {
        self.comparison = comparison;
        self
    }
}

impl RuleInstance for ModelOutputEscalateRule {
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
        RuleFamilyId::ModelOutputEscalate
    }
    fn layer_id(&self) -> LayerId {
        LayerId::L3ModelIo
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
            "escalate_on_categories": self.escalate_on_categories,
            "escalation_target": self.escalation_target,
        })
    }
}
