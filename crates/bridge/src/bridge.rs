//! The `Bridge`: the layered rule store. Rules are installed per
//! `(tenant_id, layer, family_id)`, the coordinate the enforcement engine
//! queries by on every request (`spec.md` §5 "Rule Storage").

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info};
#[cfg(feature = "persistence")]
use log::warn;
use parking_lot::RwLock;

use crate::error::EngineError;
use crate::rule_anchors::RuleAnchors;
use crate::table::RuleFamilyTable;
use crate::types::{LayerId, RuleFamilyId, RuleInstance};

#[cfg(feature = "persistence")]
use crate::persistence::RuleMetadataStore;

type TableKey = (String, LayerId, RuleFamilyId);

/// Where a rule lives, for the per-agent reverse index: enough to call
/// `Bridge::remove_rule` without the caller re-deriving it.
type RuleLocator = (LayerId, RuleFamilyId, String);

#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeStats {
    pub tenant_count: usize,
    pub table_count: usize,
    pub total_rules: usize,
    /// Rules with `RuleScope::is_global` (apply to every agent in a tenant).
    pub tenant_rules: usize,
    /// Rules scoped to one or more specific agents.
    pub agent_rules: usize,
}

/// Result of a batch `install_rules` call: how many installed cleanly, and
/// the `(rule_id, error)` pairs for the ones that didn't. A partial
/// failure never rolls back the rules that did succeed.
#[derive(Debug, Default)]
pub struct InstallRulesReport {
    pub installed: usize,
    pub failures: Vec<(String, String)>,
}

pub struct Bridge {
    tables: RwLock<HashMap<TableKey, Arc<RuleFamilyTable>>>,
    /// `(tenant_id, agent_id) -> set of rule locators scoped to that agent,
    /// so `remove_agent_rules` doesn't have to scan every table
    /// (`spec.md` §4.3's reverse index).
    agent_rules: RwLock<HashMap<(String, String), HashSet<RuleLocator>>>,
    #[cfg(feature = "persistence")]
    store: Option<Arc<dyn RuleMetadataStore>>,
}

impl Bridge {
    pub fn new() -> Self {
        Bridge {
            tables: RwLock::new(HashMap::new()),
            agent_rules: RwLock::new(HashMap::new()),
            #[cfg(feature = "persistence")]
            store: None,
        }
    }

    #[cfg(feature = "persistence")]
    pub fn with_store(store: Arc<dyn RuleMetadataStore>) -> Self {
        Bridge {
            tables: RwLock::new(HashMap::new()),
            agent_rules: RwLock::new(HashMap::new()),
            store: Some(store),
        }
    }

    fn table_for(&self, tenant_id: &str, layer: LayerId, family: RuleFamilyId) -> Arc<RuleFamilyTable> {
        let key: TableKey = (tenant_id.to_string(), layer, family);
        if let Some(table) = self.tables.read().get(&key) {
            return table.clone();
        }

        let mut tables = self.tables.write();
        tables
            .entry(key)
            .or_insert_with(|| Arc::new(RuleFamilyTable::new()))
            .clone()
    }

    pub fn install_rule(
        &self,
        rule: Arc<dyn RuleInstance>,
        anchors: Arc<RuleAnchors>,
    ) -> Result<(), EngineError> {
        let tenant_id = rule.tenant_id().to_string();
        let layer = rule.layer_id();
        let family = rule.family_id();
        let rule_id = rule.rule_id().to_string();

        let table = self.table_for(&tenant_id, layer, family);
        table.add_rule(rule.clone(), anchors.clone())?;

        if !rule.scope().agent_ids.is_empty() {
            let mut agent_rules = self.agent_rules.write();
            for agent_id in &rule.scope().agent_ids {
                agent_rules
                    .entry((tenant_id.clone(), agent_id.clone()))
                    .or_default()
                    .insert((layer, family, rule_id.clone()));
            }
        }

        #[cfg(feature = "persistence")]
        if let Some(store) = &self.store {
            if let Err(e) = store.persist_rule(rule.as_ref(), &anchors) {
                warn!("rule '{rule_id}' installed in-memory but failed to persist: {e}");
            }
        }

        info!("installed rule '{rule_id}' tenant='{tenant_id}' layer={layer} family={family}");
        Ok(())
    }

    /// Installs each rule independently, continuing past individual
    /// failures rather than rolling back earlier successes
    /// (`spec.md` §6 `install_rules`).
    pub fn install_rules(
        &self,
        rules: Vec<(Arc<dyn RuleInstance>, Arc<RuleAnchors>)>,
    ) -> InstallRulesReport {
        let mut report = InstallRulesReport::default();
        for (rule, anchors) in rules {
            let rule_id = rule.rule_id().to_string();
            match self.install_rule(rule, anchors) {
                Ok(()) => report.installed += 1,
                Err(e) => report.failures.push((rule_id, e.to_string())),
            }
        }
        report
    }

    pub fn remove_rule(
        &self,
        tenant_id: &str,
        layer: LayerId,
        family: RuleFamilyId,
        rule_id: &str,
    ) -> Result<(), EngineError> {
        let table = self.table_for(tenant_id, layer, family);
        let removed = table.remove_rule(rule_id)?;

        if !removed.scope().agent_ids.is_empty() {
            let mut agent_rules = self.agent_rules.write();
            for agent_id in &removed.scope().agent_ids {
                if let Some(locators) = agent_rules.get_mut(&(tenant_id.to_string(), agent_id.clone())) {
                    locators.remove(&(layer, family, rule_id.to_string()));
                }
            }
        }

        #[cfg(feature = "persistence")]
        if let Some(store) = &self.store {
            if let Err(e) = store.delete_rule(rule_id) {
                warn!("rule '{rule_id}' removed in-memory but failed to delete from store: {e}");
            }
        }

        debug!("removed rule '{rule_id}' tenant='{tenant_id}' layer={layer} family={family}");
        Ok(())
    }

    /// Removes every rule scoped to `agent_id` within `tenant_id`, via the
    /// reverse index (`spec.md` §4.3/§6 `remove_agent_rules`), returning
    /// how many were removed. Delegates to the single-rule `remove_rule`
    /// per locator so a rule scoped to multiple agents gets its other
    /// reverse-index entries cleaned up too, not just this agent's.
    pub fn remove_agent_rules(&self, tenant_id: &str, agent_id: &str) -> usize {
        let locators: Vec<RuleLocator> = self
            .agent_rules
            .read()
            .get(&(tenant_id.to_string(), agent_id.to_string()))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();

        let mut removed = 0;
        for (layer, family, rule_id) in locators {
            if self.remove_rule(tenant_id, layer, family, &rule_id).is_ok() {
                removed += 1;
            }
        }

        info!("removed {removed} rule(s) scoped to agent='{agent_id}' tenant='{tenant_id}'");
        removed
    }

    /// Every enabled rule applicable to `agent_id` in this
    /// `(tenant_id, layer)`, across both of the layer's rule families,
    /// ordered by descending priority (ties broken by insertion order).
    pub fn rules_for_layer(
        &self,
        tenant_id: &str,
        layer: LayerId,
        agent_id: &str,
    ) -> Vec<(Arc<dyn RuleInstance>, Arc<RuleAnchors>)> {
        let families: Vec<RuleFamilyId> = RuleFamilyId::ALL
            .iter()
            .copied()
            .filter(|f| f.layer() == layer)
            .collect();

        let mut combined: Vec<(Arc<dyn RuleInstance>, Arc<RuleAnchors>)> = Vec::new();
        for family in families {
            let table = self.table_for(tenant_id, layer, family);
            combined.extend(table.rules_for_agent(agent_id));
        }

        combined.sort_by(|a, b| b.0.priority().cmp(&a.0.priority()));
        combined
    }

    pub fn stats(&self) -> BridgeStats {
        let tables = self.tables.read();
        let mut tenants = HashSet::new();
        let mut total_rules = 0;
        let mut tenant_rules = 0;
        let mut agent_rules = 0;

        for (key, table) in tables.iter() {
            tenants.insert(key.0.clone());
            total_rules += table.len();
            let (tenant_wide, scoped) = table.count_by_scope();
            tenant_rules += tenant_wide;
            agent_rules += scoped;
        }

        BridgeStats {
            tenant_count: tenants.len(),
            table_count: tables.len(),
            total_rules,
            tenant_rules,
            agent_rules,
        }
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::{SystemBoundaryRule, SystemIdentityRule};
    use crate::rule_anchors::AnchorBlock;
    use crate::types::RuleScope;
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
    fn rules_for_layer_combines_both_families_in_the_layer() {
        let bridge = Bridge::new();
        let boundary: Arc<dyn RuleInstance> =
            Arc::new(SystemBoundaryRule::new("b1", "tenant-a", vec!["root".into()]));
        let identity: Arc<dyn RuleInstance> = Arc::new(SystemIdentityRule::new(
            "i1",
            "tenant-a",
            vec!["agent".into()],
            true,
        ));
        bridge.install_rule(boundary, dummy_anchors()).unwrap();
        bridge.install_rule(identity, dummy_anchors()).unwrap();

        let rules = bridge.rules_for_layer("tenant-a", LayerId::L0System, "agent-1");
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn tenants_are_isolated_from_each_other() {
        let bridge = Bridge::new();
        let rule: Arc<dyn RuleInstance> =
            Arc::new(SystemBoundaryRule::new("b1", "tenant-a", vec!["root".into()]));
        bridge.install_rule(rule, dummy_anchors()).unwrap();

        let rules = bridge.rules_for_layer("tenant-b", LayerId::L0System, "agent-1");
        assert!(rules.is_empty());
    }

    #[test]
    fn agent_scoped_rule_does_not_leak_to_other_agents() {
        let bridge = Bridge::new();
        let rule: Arc<dyn RuleInstance> = Arc::new(
            SystemIdentityRule::new("i1", "tenant-a", vec!["agent".into()], true)
                .with_scope(RuleScope::for_agent("agent-a")),
        );
        bridge.install_rule(rule, dummy_anchors()).unwrap();

        assert_eq!(
            bridge
                .rules_for_layer("tenant-a", LayerId::L0System, "agent-a")
                .len(),
            1
        );
        assert!(bridge
            .rules_for_layer("tenant-a", LayerId::L0System, "agent-b")
            .is_empty());
    }

    #[test]
    fn install_rules_continues_past_a_duplicate_id_failure() {
        let bridge = Bridge::new();
        let first: Arc<dyn RuleInstance> =
            Arc::new(SystemBoundaryRule::new("dup", "tenant-a", vec!["root".into()]));
        bridge.install_rule(first, dummy_anchors()).unwrap();

        let dup: Arc<dyn RuleInstance> =
            Arc::new(SystemBoundaryRule::new("dup", "tenant-a", vec!["root".into()]));
        let ok: Arc<dyn RuleInstance> =
            Arc::new(SystemBoundaryRule::new("ok", "tenant-a", vec!["root".into()]));

        let report = bridge.install_rules(vec![
            (dup, dummy_anchors()),
            (ok, dummy_anchors()),
        ]);

        assert_eq!(report.installed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "dup");
    }

    #[test]
    fn remove_agent_rules_removes_only_that_agents_scoped_rules() {
        let bridge = Bridge::new();
        let scoped_a: Arc<dyn RuleInstance> = Arc::new(
            SystemIdentityRule::new("i-a", "tenant-a", vec!["agent".into()], true)
                .with_scope(RuleScope::for_agent("agent-a")),
        );
        let scoped_b: Arc<dyn RuleInstance> = Arc::new(
            SystemIdentityRule::new("i-b", "tenant-a", vec!["agent".into()], true)
                .with_scope(RuleScope::for_agent("agent-b")),
        );
        let global: Arc<dyn RuleInstance> =
            Arc::new(SystemBoundaryRule::new("global", "tenant-a", vec!["root".into()]));

        bridge.install_rule(scoped_a, dummy_anchors()).unwrap();
        bridge.install_rule(scoped_b, dummy_anchors()).unwrap();
        bridge.install_rule(global, dummy_anchors()).unwrap();

        let removed = bridge.remove_agent_rules("tenant-a", "agent-a");
        assert_eq!(removed, 1);

        assert!(bridge
            .rules_for_layer("tenant-a", LayerId::L0System, "agent-a")
            .iter()
            .all(|(rule, _)| rule.rule_id() != "i-a"));
        assert_eq!(
            bridge
                .rules_for_layer("tenant-a", LayerId::L0System, "agent-b")
                .len(),
            2
        );
    }

    #[test]
    fn remove_agent_rules_cleans_up_all_scopes_of_a_multi_agent_rule() {
        let bridge = Bridge::new();
        let shared: Arc<dyn RuleInstance> = Arc::new(
            SystemIdentityRule::new("shared", "tenant-a", vec!["agent".into()], true).with_scope(
                RuleScope::for_agents(vec!["agent-a".to_string(), "agent-b".to_string()]),
            ),
        );
        bridge.install_rule(shared, dummy_anchors()).unwrap();

        assert_eq!(bridge.remove_agent_rules("tenant-a", "agent-a"), 1);
        assert!(bridge
            .rules_for_layer("tenant-a", LayerId::L0System, "agent-b")
            .is_empty());
    }

    #[test]
    fn stats_splits_rules_by_scope() {
        let bridge = Bridge::new();
        let global: Arc<dyn RuleInstance> =
            Arc::new(SystemBoundaryRule::new("global", "tenant-a", vec!["root".into()]));
        let scoped: Arc<dyn RuleInstance> = Arc::new(
            SystemIdentityRule::new("scoped", "tenant-a", vec!["agent".into()], true)
                .with_scope(RuleScope::for_agent("agent-a")),
        );
        bridge.install_rule(global, dummy_anchors()).unwrap();
        bridge.install_rule(scoped, dummy_anchors()).unwrap();

        let stats = bridge.stats();
        assert_eq!(stats.total_rules, 2);
        assert_eq!(stats.tenant_rules, 1);
        assert_eq!(stats.agent_rules, 1);
    }
}
