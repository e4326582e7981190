//! Per-slot cosine similarity comparison kernel.
//!
//! This crate is the Comparison Kernel of the enforcement engine: given an
//! intent's 128-dimensional vector (four concatenated 32-dimensional slots)
//! and a rule's per-slot anchor arrays, it produces a per-slot similarity
//! tuple and an ALLOW/BLOCK decision for that one rule. It has no
//! dependencies and performs no I/O — every call is a handful of
//! microseconds of floating point arithmetic.

mod compare;

pub use compare::{compare, KernelError};

/// Number of floats in one slot block.
pub const SLOT_WIDTH: usize = 32;

/// Maximum number of anchor vectors stored per slot.
pub const MAX_ANCHORS_PER_SLOT: usize = 16;

/// The four semantic facets a vector is split into, in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Action,
    Resource,
    Data,
    Risk,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::Action, Slot::Resource, Slot::Data, Slot::Risk];

    pub fn index(self) -> usize {
        match self {
            Slot::Action => 0,
            Slot::Resource => 1,
            Slot::Data => 2,
            Slot::Risk => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Slot::Action => "action",
            Slot::Resource => "resource",
            Slot::Data => "data",
            Slot::Risk => "risk",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decision mode for combining per-slot similarities into a single
/// ALLOW/BLOCK verdict for one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionMode {
    /// Every slot's similarity must meet its threshold.
    Min,
    /// The weighted average of slot similarities must meet the global threshold.
    WeightedAvg,
}

/// One rule's inputs to the comparison kernel: its pre-encoded anchor
/// arrays plus thresholds/weights/mode. Padding rows beyond `count` are
/// never read.
pub struct VectorEnvelope {
    /// The intent's 128-dim vector, viewed as four 32-dim blocks.
    pub intent: [f32; 128],

    pub action_anchors: [[f32; SLOT_WIDTH]; MAX_ANCHORS_PER_SLOT],
    pub action_count: usize,
    pub resource_anchors: [[f32; SLOT_WIDTH]; MAX_ANCHORS_PER_SLOT],
    pub resource_count: usize,
    pub data_anchors: [[f32; SLOT_WIDTH]; MAX_ANCHORS_PER_SLOT],
    pub data_count: usize,
    pub risk_anchors: [[f32; SLOT_WIDTH]; MAX_ANCHORS_PER_SLOT],
    pub risk_count: usize,

    /// Per-slot thresholds [action, resource, data, risk], used in `Min` mode.
    pub thresholds: [f32; 4],
    /// Per-slot weights [action, resource, data, risk], used in `WeightedAvg` mode.
    pub weights: [f32; 4],
    pub decision_mode: DecisionMode,
    /// Used only in `WeightedAvg` mode.
    pub global_threshold: f32,
}

impl VectorEnvelope {
    fn slot_anchors(&self, slot: Slot) -> (&[[f32; SLOT_WIDTH]; MAX_ANCHORS_PER_SLOT], usize) {
        match slot {
            Slot::Action => (&self.action_anchors, self.action_count),
            Slot::Resource => (&self.resource_anchors, self.resource_count),
            Slot::Data => (&self.data_anchors, self.data_count),
            Slot::Risk => (&self.risk_anchors, self.risk_count),
        }
    }

    fn intent_slice(&self, slot: Slot) -> &[f32] {
        let i = slot.index() * SLOT_WIDTH;
        &self.intent[i..i + SLOT_WIDTH]
    }
}

/// Result of comparing one intent against one rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonResult {
    /// 1 if this rule is satisfied (permits the intent), 0 if it blocks.
    pub decision: u8,
    /// Per-slot similarities [action, resource, data, risk].
    pub slice_similarities: [f32; 4],
}

impl ComparisonResult {
    pub fn allowed(&self) -> bool {
        self.decision == 1
    }
}
