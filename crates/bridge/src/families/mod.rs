//! The fourteen rule families, two per layer. Each family's struct
//! implements `RuleInstance` (see `crate::types`) and carries whatever
//! parameters its layer's policy decision needs; the comparison kernel
//! never sees these fields directly; it only sees the anchors the
//! [`crate::anchor_builder`] derives from [`RuleInstance::management_plane_payload`].

mod l0_system;
mod l1_input;
mod l2_planner;
mod l3_modelio;
mod l4_tool_gateway;
mod l5_rag;
mod l6_egress;

pub use l0_system::{SystemBoundaryRule, SystemIdentityRule};
pub use l1_input::{InputSanitizationRule, InputSchemaRule};
pub use l2_planner::{PromptAssemblyRule, PromptLengthRule};
pub use l3_modelio::{ModelOutputEscalateRule, ModelOutputScanRule};
pub use l4_tool_gateway::{EnforcementMode, ParamType, ToolParamConstraintRule, ToolWhitelistRule};
pub use l5_rag::{RagDocSensitivityRule, RagSourceTrustRule};
pub use l6_egress::{OutputAuditRule, OutputPiiRule};
