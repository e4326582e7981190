//! The Vocabulary Contract (v1): the versioned, process-wide enumeration of
//! every valid value for every slot, the field order within each slot's
//! canonical text, and the projection seeds bound to each slot.
//!
//! Created once at process start and read-only thereafter (per
//! `spec.md` §3 "Ownership & Lifecycle"). Swapping it requires a restart —
//! there is deliberately no hot-reload path here.

use crate::error::EngineError;
use semantic_sandbox::{Slot, SLOT_WIDTH};

/// Field order within one slot's canonical text, fixed by the contract.
pub type SlotFields = &'static [&'static str];

#[derive(Debug, Clone)]
pub struct VocabularyContract {
    pub version: &'static str,

    pub actions: &'static [&'static str],
    pub actor_types: &'static [&'static str],
    pub resource_types: &'static [&'static str],
    pub locations: &'static [&'static str],
    pub sensitivities: &'static [&'static str],
    pub volumes: &'static [&'static str],
    pub authn_values: &'static [&'static str],
    pub layers: &'static [&'static str],

    /// Field order within each slot's canonical text (`spec.md` §4.1 step 1).
    pub action_fields: SlotFields,
    pub resource_fields: SlotFields,
    pub data_fields: SlotFields,
    pub risk_fields: SlotFields,

    /// Projection seeds bound to each slot (`spec.md` §4.1 step 3 / §6).
    pub action_seed: u64,
    pub resource_seed: u64,
    pub data_seed: u64,
    pub risk_seed: u64,

    /// Per-rule-overridable default thresholds [action, resource, data, risk].
    pub default_thresholds: [f32; 4],
}

impl VocabularyContract {
    pub fn v1() -> Self {
        VocabularyContract {
            version: "v1",
            actions: &["read", "write", "delete", "export", "execute", "update"],
            actor_types: &["user", "service", "llm", "agent"],
            resource_types: &["database", "file", "api"],
            locations: &["local", "cloud"],
            sensitivities: &["public", "internal", "confidential"],
            volumes: &["single", "bulk"],
            authn_values: &["required", "not_required"],
            layers: &["L0", "L1", "L2", "L3", "L4", "L5", "L6"],

            action_fields: &["action", "actor_type"],
            resource_fields: &["resource_type", "name", "location"],
            data_fields: &["sensitivity", "pii", "volume"],
            risk_fields: &["authn"],

            action_seed: 42,
            resource_seed: 43,
            data_seed: 44,
            risk_seed: 45,

            default_thresholds: [0.85, 0.80, 0.75, 0.70],
        }
    }

    pub fn seed_for(&self, slot: Slot) -> u64 {
        match slot {
            Slot::Action => self.action_seed,
            Slot::Resource => self.resource_seed,
            Slot::Data => self.data_seed,
            Slot::Risk => self.risk_seed,
        }
    }

    /// The canonical zero-safe unit vector substituted for a slot whose
    /// pre-normalization norm is zero (`spec.md` §4.1 step 4). Fixed as the
    /// first standard basis vector so it is deterministic and reproducible
    /// across restarts without needing extra process state.
    pub fn zero_safe_vector(&self) -> [f32; SLOT_WIDTH] {
        let mut v = [0.0f32; SLOT_WIDTH];
        v[0] = 1.0;
        v
    }

    pub fn validate_enum(
        &self,
        field: &str,
        value: &str,
        allowed: &[&str],
    ) -> Result<(), EngineError> {
        if allowed.contains(&value) {
            Ok(())
        } else {
            Err(EngineError::VocabularyViolation {
                field: field.to_string(),
                value: value.to_string(),
            })
        }
    }

    pub fn validate_action(&self, value: &str) -> Result<(), EngineError> {
        self.validate_enum("action", value, self.actions)
    }

    pub fn validate_actor_type(&self, value: &str) -> Result<(), EngineError> {
        self.validate_enum("actor.type", value, self.actor_types)
    }

    pub fn validate_resource_type(&self, value: &str) -> Result<(), EngineError> {
        self.validate_enum("resource.type", value, self.resource_types)
    }

    pub fn validate_location(&self, value: &str) -> Result<(), EngineError> {
        self.validate_enum("resource.location", value, self.locations)
    }

    pub fn validate_sensitivity(&self, value: &str) -> Result<(), EngineError> {
        self.validate_enum("data.sensitivity", value, self.sensitivities)
    }

    pub fn validate_volume(&self, value: &str) -> Result<(), EngineError> {
        self.validate_enum("data.volume", value, self.volumes)
    }

    pub fn validate_authn(&self, value: &str) -> Result<(), EngineError> {
        self.validate_enum("risk.authn", value, self.authn_values)
    }

    pub fn validate_layer(&self, value: &str) -> Result<(), EngineError> {
        self.validate_enum("layer", value, self.layers)
    }
}

impl Default for VocabularyContract {
    fn default() -> Self {
        Self::v1()
    }
}
