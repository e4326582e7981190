//! Optional persistent rule metadata store (feature `persistence`).
//!
//! This is additive: the engine is fully correct and in-memory-only
//! without it. When enabled, every `Bridge::install_rule`/`remove_rule`
//! call is mirrored here so a process restart can replay the rule set
//! instead of requiring the management plane to re-push it.

use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::error::EngineError;
use crate::rule_anchors::RuleAnchors;
use crate::types::RuleInstance;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS rules (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    layer TEXT NOT NULL,
    family_id TEXT NOT NULL,
    priority INTEGER NOT NULL,
    rule_json TEXT NOT NULL,
    anchors_bin BLOB NOT NULL,
    status TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_rules_tenant_layer ON rules (tenant_id, layer, family_id);
";

pub trait RuleMetadataStore: Send + Sync {
    fn persist_rule(&self, rule: &dyn RuleInstance, anchors: &RuleAnchors) -> Result<(), EngineError>;
    fn delete_rule(&self, rule_id: &str) -> Result<(), EngineError>;
    /// Every row not marked removed, as `(tenant_id, layer, family_id, rule_json, anchors)`.
    fn load_all(&self) -> Result<Vec<(String, String, String, String, RuleAnchors)>, EngineError>;
}

pub struct SqliteRuleMetadataStore {
    conn: Mutex<Connection>,
}

impl SqliteRuleMetadataStore {
    pub fn open(path: &str) -> Result<Self, EngineError> {
        let conn = Connection::open(path)
            .map_err(|e| EngineError::InternalInconsistency(format!("opening rule store: {e}")))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| EngineError::InternalInconsistency(format!("initializing rule store schema: {e}")))?;
        Ok(SqliteRuleMetadataStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, EngineError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EngineError::InternalInconsistency(format!("opening in-memory rule store: {e}")))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| EngineError::InternalInconsistency(format!("initializing rule store schema: {e}")))?;
        Ok(SqliteRuleMetadataStore {
            conn: Mutex::new(conn),
        })
    }
}

impl RuleMetadataStore for SqliteRuleMetadataStore {
    fn persist_rule(&self, rule: &dyn RuleInstance, anchors: &RuleAnchors) -> Result<(), EngineError> {
        let conn = self.conn.lock();
        let rule_json = rule.management_plane_payload().to_string();
        let anchors_bin = anchors.to_wire_bytes();

        conn.execute(
            "INSERT INTO rules (id, tenant_id, layer, family_id, priority, rule_json, anchors_bin, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'active', ?8)
             ON CONFLICT(id) DO UPDATE SET
                tenant_id = excluded.tenant_id,
                layer = excluded.layer,
                family_id = excluded.family_id,
                priority = excluded.priority,
                rule_json = excluded.rule_json,
                anchors_bin = excluded.anchors_bin,
                status = 'active',
                updated_at = excluded.updated_at",
            params![
                rule.rule_id(),
                rule.tenant_id(),
                rule.layer_id().to_string(),
                rule.family_id().family_id(),
                rule.priority(),
                rule_json,
                anchors_bin,
                rule.created_at_ms() as i64,
            ],
        )
        .map_err(|e| EngineError::InternalInconsistency(format!("persisting rule '{}': {e}", rule.rule_id())))?;

        Ok(())
    }

    fn delete_rule(&self, rule_id: &str) -> Result<(), EngineError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE rules SET status = 'removed' WHERE id = ?1",
            params![rule_id],
        )
        .map_err(|e| EngineError::InternalInconsistency(format!("deleting rule '{rule_id}': {e}")))?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<(String, String, String, String, RuleAnchors)>, EngineError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT tenant_id, layer, family_id, rule_json, anchors_bin FROM rules WHERE status = 'active'")
            .map_err(|e| EngineError::InternalInconsistency(format!("preparing rule replay query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                let tenant_id: String = row.get(0)?;
                let layer: String = row.get(1)?;
                let family_id: String = row.get(2)?;
                let rule_json: String = row.get(3)?;
                let anchors_bin: Vec<u8> = row.get(4)?;
                Ok((tenant_id, layer, family_id, rule_json, anchors_bin))
            })
            .map_err(|e| EngineError::InternalInconsistency(format!("querying rule replay rows: {e}")))?;

        let mut out = Vec::new();
        for row in rows {
            let (tenant_id, layer, family_id, rule_json, anchors_bin) =
                row.map_err(|e| EngineError::InternalInconsistency(format!("reading rule replay row: {e}")))?;
            let anchors = RuleAnchors::from_wire_bytes(&anchors_bin)?;
            out.push((tenant_id, layer, family_id, rule_json, anchors));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::SystemBoundaryRule;
    use crate::rule_anchors::AnchorBlock;
    use semantic_sandbox::SLOT_WIDTH;

    fn sample_anchors() -> RuleAnchors {
        RuleAnchors {
            action: AnchorBlock::new(vec![[0.1; SLOT_WIDTH]]).unwrap(),
            resource: AnchorBlock::new(vec![[0.2; SLOT_WIDTH]]).unwrap(),
            data: AnchorBlock::new(vec![[0.3; SLOT_WIDTH]]).unwrap(),
            risk: AnchorBlock::new(vec![[0.4; SLOT_WIDTH]]).unwrap(),
        }
    }

    #[test]
    fn persisted_rule_is_replayed_on_load_all() {
        let store = SqliteRuleMetadataStore::open_in_memory().unwrap();
        let rule = SystemBoundaryRule::new("r1", "tenant-a", vec!["root".into()]);
        store.persist_rule(&rule, &sample_anchors()).unwrap();

        let rows = store.load_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "tenant-a");
    }

    #[test]
    fn deleted_rule_is_excluded_from_replay() {
        let store = SqliteRuleMetadataStore::open_in_memory().unwrap();
        let rule = SystemBoundaryRule::new("r1", "tenant-a", vec!["root".into()]);
        store.persist_rule(&rule, &sample_anchors()).unwrap();
        store.delete_rule("r1").unwrap();

        assert!(store.load_all().unwrap().is_empty());
    }
}
