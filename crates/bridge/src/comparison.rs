//! Bridges the rule store's types to the comparison kernel: builds the
//! kernel's `VectorEnvelope` from an intent vector, one rule's anchors,
//! and that same rule's own comparison configuration.

use semantic_sandbox::{KernelError, Slot, VectorEnvelope};

use crate::error::EngineError;
use crate::rule_anchors::RuleAnchors;
use crate::types::ComparisonConfig;

pub fn compare_rule(
    intent_vector: [f32; 128],
    anchors: &RuleAnchors,
    config: &ComparisonConfig,
) -> Result<semantic_sandbox::ComparisonResult, EngineError> {
    let envelope = VectorEnvelope {
        intent: intent_vector,
        action_anchors: anchors.action.vectors,
        action_count: anchors.action.count,
        resource_anchors: anchors.resource.vectors,
        resource_count: anchors.resource.count,
        data_anchors: anchors.data.vectors,
        data_count: anchors.data.count,
        risk_anchors: anchors.risk.vectors,
        risk_count: anchors.risk.count,
        thresholds: config.thresholds,
        weights: config.weights,
        decision_mode: config.mode,
        global_threshold: config.global_threshold,
    };

    semantic_sandbox::compare(&envelope).map_err(|e| match e {
        KernelError::ZeroAnchorCount(slot) => EngineError::KernelPrecondition(slot),
    })
}

#[allow(dead_code)]
fn slot_order() -> [Slot; 4] {
    Slot::ALL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_anchors::AnchorBlock;
    use semantic_sandbox::SLOT_WIDTH;

    #[test]
    fn identical_intent_and_anchor_allows_under_min_mode() {
        let anchors = RuleAnchors {
            action: AnchorBlock::new(vec![[0.5; SLOT_WIDTH]]).unwrap(),
            resource: AnchorBlock::new(vec![[0.5; SLOT_WIDTH]]).unwrap(),
            data: AnchorBlock::new(vec![[0.5; SLOT_WIDTH]]).unwrap(),
            risk: AnchorBlock::new(vec![[0.5; SLOT_WIDTH]]).unwrap(),
        };
        let config = ComparisonConfig::uniform_min(0.9);
        let intent = [0.5f32; 128];

        let result = compare_rule(intent, &anchors, &config).unwrap();
        assert!(result.allowed());
    }

    #[test]
    fn zero_anchor_count_surfaces_as_kernel_precondition_error() {
        let anchors = RuleAnchors {
            action: AnchorBlock {
                vectors: [[0.0; SLOT_WIDTH]; semantic_sandbox::MAX_ANCHORS_PER_SLOT],
                count: 0,
            },
            resource: AnchorBlock::new(vec![[0.5; SLOT_WIDTH]]).unwrap(),
            data: AnchorBlock::new(vec![[0.5; SLOT_WIDTH]]).unwrap(),
            risk: AnchorBlock::new(vec![[0.5; SLOT_WIDTH]]).unwrap(),
        };
        let config = ComparisonConfig::uniform_min(0.9);
        let result = compare_rule([0.5f32; 128], &anchors, &config);
        assert!(matches!(result, Err(EngineError::KernelPrecondition(Slot::Action))));
    }
}
