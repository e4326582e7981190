//! One rule family's table: the rules installed for a single
//! `(tenant_id, layer, family_id)` triple, plus their anchors and the
//! agent-scoped index over them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::EngineError;
use crate::indices::FamilyIndices;
use crate::rule_anchors::RuleAnchors;
use crate::types::RuleInstance;

struct Entry {
    rule: Arc<dyn RuleInstance>,
    anchors: Arc<RuleAnchors>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    indices: FamilyIndices,
}

/// `RwLock`-protected so concurrent enforcement reads never block on each
/// other; writes (install/remove) take the write half.
pub struct RuleFamilyTable {
    inner: RwLock<Inner>,
}

impl RuleFamilyTable {
    pub fn new() -> Self {
        RuleFamilyTable {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn add_rule(
        &self,
        rule: Arc<dyn RuleInstance>,
        anchors: Arc<RuleAnchors>,
    ) -> Result<(), EngineError> {
        let mut inner = self.inner.write();
        let rule_id = rule.rule_id().to_string();

        if inner.entries.contains_key(&rule_id) {
            return Err(EngineError::DuplicateRuleId(rule_id));
        }

        inner
            .indices
            .insert(&rule_id, &rule.scope().agent_ids, rule.scope().is_global);
        inner.entries.insert(rule_id, Entry { rule, anchors });
        Ok(())
    }

    /// Removes the rule and returns it, so callers that need to clean up
    /// cross-table state (e.g. `Bridge`'s per-agent reverse index) can
    /// inspect its `scope()` without a second lookup.
    pub fn remove_rule(&self, rule_id: &str) -> Result<Arc<dyn RuleInstance>, EngineError> {
        let mut inner = self.inner.write();
        let entry = inner
            .entries
            .remove(rule_id)
            .ok_or_else(|| EngineError::RuleNotFound(rule_id.to_string()))?;
        inner.indices.remove(rule_id);
        Ok(entry.rule)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.indices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Rules applicable to `agent_id` (globals plus that agent's scoped
    /// rules), ordered by descending priority with true insertion order as
    /// the tie-break for equal priorities (`spec.md` §5.2) — a single
    /// monotonic counter spans both the global and agent-scoped buckets,
    /// so a global rule installed after an agent rule never jumps ahead of
    /// it on a priority tie.
    pub fn rules_for_agent(
        &self,
        agent_id: &str,
    ) -> Vec<(Arc<dyn RuleInstance>, Arc<RuleAnchors>)> {
        let inner = self.inner.read();
        let ids = inner.indices.rule_ids_for_agent(agent_id);

        let mut found: Vec<(u64, Arc<dyn RuleInstance>, Arc<RuleAnchors>)> = ids
            .iter()
            .filter_map(|(id, seq)| {
                inner
                    .entries
                    .get(id)
                    .map(|e| (*seq, e.rule.clone(), e.anchors.clone()))
            })
            .filter(|(_, rule, _)| rule.is_enabled())
            .collect();

        found.sort_by(|a, b| b.1.priority().cmp(&a.1.priority()).then(a.0.cmp(&b.0)));

        found.into_iter().map(|(_, rule, anchors)| (rule, anchors)).collect()
    }

    /// Split of enabled rules into tenant-wide (`is_global`) vs
    /// agent-scoped, for `Bridge::stats()`'s `tenant_rules`/`agent_rules`
    /// rollup.
    pub fn count_by_scope(&self) -> (usize, usize) {
        let inner = self.inner.read();
        let mut tenant_wide = 0;
        let mut agent_scoped = 0;
        for entry in inner.entries.values() {
            if entry.rule.scope().is_global {
                tenant_wide += 1;
            } else {
                agent_scoped += 1;
            }
        }
        (tenant_wide, agent_scoped)
    }
}

impl Default for RuleFamilyTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::SystemBoundaryRule;
    use crate::rule_anchors::AnchorBlock;
    use semantic_sandbox::SLOT_WIDTH;

    fn dummy_anchors() -> Arc<RuleAnchors> {
        Arc::new(RuleAnchors {
            action: AnchorBlock::new(vec![[0.0; SLOT_WIDTH]]).unwrap(),
            resource: AnchorBlock::new(vec![[0.0; SLOT_WIDTH]]).unwrap(),
            data: AnchorBlock::new(vec![[0.0; SLOT_WIDTH]]).unwrap(),
            risk: AnchorBlock::new(vec![[0.0; SLOT_WIDTH]]).unwrap(),
        })
    }

    #[test]
    fn duplicate_rule_id_is_rejected() {
        let table = RuleFamilyTable::new();
        let rule: Arc<dyn RuleInstance> =
            Arc::new(SystemBoundaryRule::new("r1", "tenant-a", vec!["root".into()]));
        table.add_rule(rule.clone(), dummy_anchors()).unwrap();
        let err = table.add_rule(rule, dummy_anchors()).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateRuleId(_)));
    }

    #[test]
    fn rules_sort_by_descending_priority_then_insertion_order() {
        let table = RuleFamilyTable::new();
        let low: Arc<dyn RuleInstance> = Arc::new(
            SystemBoundaryRule::new("low", "tenant-a", vec!["root".into()]).with_priority(10),
        );
        let high: Arc<dyn RuleInstance> = Arc::new(
            SystemBoundaryRule::new("high", "tenant-a", vec!["root".into()]).with_priority(90),
        );
        table.add_rule(low, dummy_anchors()).unwrap();
        table.add_rule(high, dummy_anchors()).unwrap();

        let rules = table.rules_for_agent("any-agent");
        assert_eq!(rules[0].0.rule_id(), "high");
        assert_eq!(rules[1].0.rule_id(), "low");
    }

    #[test]
    fn removed_rule_no_longer_appears_in_lookups() {
        let table = RuleFamilyTable::new();
        let rule: Arc<dyn RuleInstance> =
            Arc::new(SystemBoundaryRule::new("r1", "tenant-a", vec!["root".into()]));
        table.add_rule(rule, dummy_anchors()).unwrap();
        table.remove_rule("r1").unwrap();
        assert!(table.rules_for_agent("any-agent").is_empty());
    }

    #[test]
    fn same_priority_tie_break_follows_true_install_order_across_scopes() {
        use crate::types::RuleScope;

        let table = RuleFamilyTable::new();
        let agent_rule: Arc<dyn RuleInstance> = Arc::new(
            SystemBoundaryRule::new("agent-rule", "tenant-a", vec!["root".into()])
                .with_priority(50)
                .with_scope(RuleScope::for_agent("agent-a")),
        );
        let global_rule: Arc<dyn RuleInstance> = Arc::new(
            SystemBoundaryRule::new("global-rule", "tenant-a", vec!["root".into()]).with_priority(50),
        );

        // Agent rule installed first; a same-priority global rule installed
        // second must not be placed ahead of it.
        table.add_rule(agent_rule, dummy_anchors()).unwrap();
        table.add_rule(global_rule, dummy_anchors()).unwrap();

        let rules = table.rules_for_agent("agent-a");
        assert_eq!(rules[0].0.rule_id(), "agent-rule");
        assert_eq!(rules[1].0.rule_id(), "global-rule");
    }
}
