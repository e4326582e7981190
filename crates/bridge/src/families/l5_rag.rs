use serde_json::json;

use crate::types::{now_ms, ComparisonConfig, LayerId, RuleFamilyId, RuleInstance, RuleScope};

/// Constrains which retrieval sources are trusted for a tenant/agent.
#[derive(Debug, Clone)]
pub struct RagSourceTrustRule {
    pub rule_id: String,
    pub tenant_id: String,
    pub priority: i32,
    pub scope: RuleScope,
    pub trusted_source_ids: Vec<String>,
    pub created_at_ms: u64,
    pub description: String,
    pub enabled: bool,
    pub comparison: ComparisonConfig,
}

impl RagSourceTrustRule {
    pub fn new(
        rule_id: impl Into<String>,
        tenant_id: impl Into<String>,
        trusted_source_ids: Vec<String>,
    ) -> Self {
        RagSourceTrustRule {
            rule_id: rule_id.into(),
            tenant_id: tenant_id.into(),
            priority: 100,
            scope: RuleScope::global(),
            trusted_source_ids,
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

impl RuleInstance for RagSourceTrustRule {
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
        RuleFamilyId::RagSourceTrust
    }
    fn layer_id(&self) -> LayerId {
        LayerId::L5Rag
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
            "trusted_source_ids": self.trusted_source_ids,
        })
    }
}

/// Constrains the maximum sensitivity of documents that may be retrieved.
#[derive(Debug, Clone)]
pub struct RagDocSensitivityRule {
    pub rule_id: String,
    pub tenant_id: String,
    pub priority: i32,
    pub scope: RuleScope,
    pub max_sensitivity: String,
    pub created_at_ms: u64,
    pub description: String,
    pub enabled: bool,
    pub comparison: ComparisonConfig,
}

impl RagDocSensitivityRule {
    pub fn new(
        rule_id: impl Into<String>,
        tenant_id: impl Into<String>,
        max_sensitivity: impl Into<String>,
    ) -> Self {
        RagDocSensitivityRule {
            rule_id: rule_id.into(),
            tenant_id: tenant_id.into(),
            priority: 100,
            scope: RuleScope::global(),
            max_sensitivity: max_sensitivity.into(),
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

impl RuleInstance for RagDocSensitivityRule {
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
        RuleFamilyId::RagDocSensitivity
    }
    fn layer_id(&self) -> LayerId {
        LayerId::L5Rag
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
            "max_sensitivity": self.max_sensitivity,
        })
    }
}
