//! The Intent: the structured request an agent is about to take, as
//! received at one of the six enforcement layers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::vocabulary::VocabularyContract;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    #[serde(rename = "type")]
    pub actor_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Data {
    #[serde(default)]
    pub sensitivity: Vec<String>,
    #[serde(default)]
    pub pii: Option<bool>,
    #[serde(default)]
    pub volume: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    #[serde(default)]
    pub authn: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitContext {
    pub agent_id: String,
    pub window_start: u64,
    pub call_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// Opaque request correlation id, carried through to `EnforcementResult`
    /// so a decision can be joined back to the request that produced it.
    pub id: String,
    /// Seconds since the Unix epoch, as recorded by the caller.
    pub timestamp: f64,
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
    pub layer: String,
    pub action: String,
    pub actor: Actor,
    pub resource: Resource,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub risk: Risk,
    #[serde(default)]
    pub rate_limit: Option<RateLimitContext>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_method: Option<String>,
    #[serde(default)]
    pub tool_params: HashMap<String, serde_json::Value>,
}

impl Default for Data {
    fn default() -> Self {
        Data {
            sensitivity: Vec::new(),
            pii: None,
            volume: None,
        }
    }
}

impl Default for Risk {
    fn default() -> Self {
        Risk { authn: None }
    }
}

impl Intent {
    pub fn agent_id(&self) -> &str {
        &self.actor.id
    }

    /// Validates every enumerated field against the vocabulary contract and
    /// checks the fields required to route and canonicalize this intent are
    /// present. This is step 0 of `spec.md` §4.1 canonicalization and runs
    /// before any text is built.
    pub fn validate(&self, vocab: &VocabularyContract) -> Result<(), EngineError> {
        if self.tenant_id.trim().is_empty() {
            return Err(EngineError::MalformedIntent("tenantId is empty".into()));
        }
        if self.actor.id.trim().is_empty() {
            return Err(EngineError::MalformedIntent("actor.id is empty".into()));
        }

        vocab.validate_layer(&self.layer)?;
        vocab.validate_action(&self.action)?;
        vocab.validate_actor_type(&self.actor.actor_type)?;
        vocab.validate_resource_type(&self.resource.resource_type)?;

        if let Some(location) = &self.resource.location {
            vocab.validate_location(location)?;
        }
        for s in &self.data.sensitivity {
            vocab.validate_sensitivity(s)?;
        }
        if let Some(volume) = &self.data.volume {
            vocab.validate_volume(volume)?;
        }
        if let Some(authn) = &self.risk.authn {
            vocab.validate_authn(authn)?;
        }

        Ok(())
    }

    /// Builds the canonical `"field: value | field: value"` text for the
    /// action slot, fields in the order the vocabulary contract fixes.
    pub fn action_slot_text(&self, vocab: &VocabularyContract) -> String {
        vocab
            .action_fields
            .iter()
            .filter_map(|&field| match field {
                "action" => Some(format!("action: {}", self.action)),
                "actor_type" => Some(format!("actor_type: {}", self.actor.actor_type)),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn resource_slot_text(&self, vocab: &VocabularyContract) -> String {
        vocab
            .resource_fields
            .iter()
            .filter_map(|&field| match field {
                "resource_type" => Some(format!("resource_type: {}", self.resource.resource_type)),
                "name" => self
                    .resource
                    .name
                    .as_ref()
                    .map(|n| format!("name: {n}")),
                "location" => self
                    .resource
                    .location
                    .as_ref()
                    .map(|l| format!("location: {l}")),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn data_slot_text(&self, vocab: &VocabularyContract) -> String {
        vocab
            .data_fields
            .iter()
            .filter_map(|&field| match field {
                "sensitivity" => {
                    if self.data.sensitivity.is_empty() {
                        None
                    } else {
                        let mut sorted = self.data.sensitivity.clone();
                        sorted.sort();
                        Some(format!("sensitivity: {}", sorted.join(",")))
                    }
                }
                "pii" => self.data.pii.map(|p| format!("pii: {p}")),
                "volume" => self.data.volume.as_ref().map(|v| format!("volume: {v}")),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn risk_slot_text(&self, vocab: &VocabularyContract) -> String {
        vocab
            .risk_fields
            .iter()
            .filter_map(|&field| match field {
                "authn" => self.risk.authn.as_ref().map(|a| format!("authn: {a}")),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
