use serde_json::json;

use crate::types::{now_ms, ComparisonConfig, LayerId, RuleFamilyId, RuleInstance, RuleScope};

/// Screens untrusted input text for injected-instruction patterns before
/// it reaches the planner.
#[derive(Debug, Clone)]
pub struct InputSanitizationRule {
    pub rule_id: String,
    pub tenant_id: String,
    pub priority: i32,
    pub scope: RuleScope,
    pub blocked_patterns: Vec<String>,
    pub created_at_ms: u64,
    pub description: String,
    pub enabled: bool,
    pub comparison: ComparisonConfig,
}

impl InputSanitizationRule {
    pub fn new(
        rule_id: impl Into<String>,
        tenant_id: impl Into<String>,
        blocked_patterns: Vec<String>,
    ) -> Self {
        InputSanitizationRule {
            rule_id: rule_id.into(),
            tenant_id: tenant_id.into(),
            priority: 100,
            scope: RuleScope::global(),
            blocked_patterns,
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

impl RuleInstance for InputSanitizationRule {
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
        RuleFamilyId::InputSanitization
    }
    fn layer_id(&self) -> LayerId {
        LayerId::L1Input
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
            "blocked_patterns": self.blocked_patterns,
        })
    }
}

/// Constrains the shape of incoming requests: required fields and a
/// maximum payload size.
#[derive(Debug, Clone)]
pub struct InputSchemaRule {
    pub rule_id: String,
    pub tenant_id: String,
    pub priority: i32,
    pub scope: RuleScope,
    pub required_fields: Vec<String>,
    pub max_payload_bytes: u64,
    pub created_at_ms: u64,
    pub description: String,
    pub enabled: bool,
    pub comparison: ComparisonConfig,
}

impl InputSchemaRule {
    pub fn new(
        rule_id: impl Into<String>,
        tenant_id: impl Into<String>,
        required_fields: Vec<String>,
        max_payload_bytes: u64,
    ) -> Self {
        InputSchemaRule {
            rule_id: rule_id.into(),
            tenant_id: tenant_id.into(),
            priority: 100,
            scope: RuleScope::global(),
            required_fields,
            max_payload_bytes,
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

impl RuleInstance for InputSchemaRule {
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
        RuleFamilyId::InputSchema
    }
    fn layer_id(&self) -> LayerId {
        LayerId::L1Input
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
            "required_fields": self.required_fields,
            "max_payload_bytes": self.max_payload_bytes,
        })
    }
}
