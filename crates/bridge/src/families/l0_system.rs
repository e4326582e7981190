use serde_json::json;

use crate::types::{now_ms, ComparisonConfig, LayerId, RuleFamilyId, RuleInstance, RuleScope};

/// Constrains which system prompt roots / boundary identifiers are legal
/// for a given tenant.
#[derive(Debug, Clone)]
pub struct SystemBoundaryRule {
    pub rule_id: String,
    pub tenant_id: String,
    pub priority: i32,
    pub scope: RuleScope,
    pub allowed_system_roots: Vec<String>,
    pub created_at_ms: u64,
    pub description: String,
    pub enabled: bool,
    pub comparison: ComparisonConfig,
}

impl SystemBoundaryRule {
    pub fn new(
        rule_id: impl Into<String>,
        tenant_id: impl Into<String>,
        allowed_system_roots: Vec<String>,
    ) -> Self {
        SystemBoundaryRule {
            rule_id: rule_id.into(),
            tenant_id: tenant_id.into(),
            priority: 100,
            scope: RuleScope::global(),
            allowed_system_roots,
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

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_comparison_config(mut self, comparison: ComparisonConfig) -> Self {
        self.comparison = comparison;
        self
    }
}

impl RuleInstance for SystemBoundaryRule {
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
        RuleFamilyId::SystemBoundary
    }
    fn layer_id(&self) -> LayerId {
        LayerId::L0System
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
            "allowed_system_roots": self.allowed_system_roots,
        })
    }
}

/// Constrains which actor types may claim a given identity, and whether
/// authentication is mandatory at the system boundary.
#[derive(Debug, Clone)]
pub struct SystemIdentityRule {
    pub rule_id: String,
    pub tenant_id: String,
    pub priority: i32,
    pub scope: RuleScope,
    pub allowed_actor_types: Vec<String>,
    pub require_authn: bool,
    pub created_at_ms: u64,
    pub description: String,
    pub enabled: bool,
    pub comparison: ComparisonConfig,
}

impl SystemIdentityRule {
    pub fn new(
        rule_id: impl Into<String>,
        tenant_id: impl Into<String>,
        allowed_actor_types: Vec<String>,
        require_authn: bool,
    ) -> Self {
        SystemIdentityRule {
            rule_id: rule_id.into(),
            tenant_id: tenant_id.into(),
            priority: 100,
            scope: RuleScope::global(),
            allowed_actor_types,
            require_authn,
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

    pub fn for_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.scope = RuleScope::for_agent(agent_id);
        self
    }

    pub fn with_comparison_config(mut self, comparison: ComparisonConfig) -> Self {
        self.comparison = comparison;
        self
    }
}

impl RuleInstance for SystemIdentityRule {
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
        RuleFamilyId::SystemIdentity
    }
    fn layer_id(&self) -> LayerId {
        LayerId::L0System
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
            "allowed_actor_types": self.allowed_actor_types,
            "require_authn": self.require_authn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_boundary_rule_reports_its_layer_and_family() {
        let rule = SystemBoundaryRule::new("r1", "tenant-a", vec!["root://prod".into()]);
        assert_eq!(rule.layer_id(), LayerId::L0System);
        assert_eq!(rule.family_id(), RuleFamilyId::SystemBoundary);
    }
}
