//! Comparison logic for semantic vectors: per-slot max-of-anchors cosine
//! similarity, then a min- or weighted-average decision over the four slots.

use crate::{ComparisonResult, DecisionMode, Slot, VectorEnvelope, MAX_ANCHORS_PER_SLOT};

/// A precondition was violated before any similarity could be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// `RuleAnchors.count` was zero for this slot. Anchor arrays always
    /// carry at least one anchor by the time they reach the kernel; a zero
    /// count here means the rule was stored or passed in incorrectly.
    ZeroAnchorCount(Slot),
}

impl std::fmt::Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelError::ZeroAnchorCount(slot) => write!(f, "slot {slot} has zero anchors"),
        }
    }
}

impl std::error::Error for KernelError {}

/// Dot product of two equal-length slices.
#[inline]
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity between two vectors, clamped to `[-1, 1]`. Anchors are
/// unit-norm by construction, so only the intent slice's norm can be zero
/// (the canonical zero-safe vector case); that is handled by returning 0.0
/// rather than dividing by zero.
#[inline]
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a < 1e-8 || norm_b < 1e-8 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Maximum cosine similarity between the intent's slot slice and the
/// rule's anchors for that slot. Rows at `count..MAX_ANCHORS_PER_SLOT` are
/// padding and must never be read.
fn max_anchor_similarity(
    intent_slice: &[f32],
    anchors: &[[f32; 32]; MAX_ANCHORS_PER_SLOT],
    count: usize,
) -> f32 {
    anchors[..count]
        .iter()
        .map(|anchor| cosine_similarity(intent_slice, anchor))
        .fold(f32::NEG_INFINITY, f32::max)
}

/// Compares an intent vector against one rule's anchors, thresholds,
/// weights and decision mode.
pub fn compare(envelope: &VectorEnvelope) -> Result<ComparisonResult, KernelError> {
    let mut sims = [0.0f32; 4];

    for &slot in &Slot::ALL {
        let (anchors, count) = envelope.slot_anchors(slot);
        if count == 0 {
            return Err(KernelError::ZeroAnchorCount(slot));
        }
        sims[slot.index()] = max_anchor_similarity(envelope.intent_slice(slot), anchors, count);
    }

    let decision = match envelope.decision_mode {
        DecisionMode::Min => {
            let all_pass = sims
                .iter()
                .zip(envelope.thresholds.iter())
                .all(|(sim, thresh)| sim >= thresh);
            all_pass as u8
        }
        DecisionMode::WeightedAvg => {
            let total_weight: f32 = envelope.weights.iter().sum();
            if total_weight <= 0.0 {
                0
            } else {
                let weighted_sum: f32 = sims
                    .iter()
                    .zip(envelope.weights.iter())
                    .map(|(sim, w)| sim * w)
                    .sum();
                let weighted_avg = weighted_sum / total_weight;
                (weighted_avg >= envelope.global_threshold) as u8
            }
        }
    };

    Ok(ComparisonResult {
        decision,
        slice_similarities: sims,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope_with(
        intent: [f32; 128],
        action_anchors: [[f32; 32]; MAX_ANCHORS_PER_SLOT],
        action_count: usize,
        thresholds: [f32; 4],
        mode: DecisionMode,
        global_threshold: f32,
    ) -> VectorEnvelope {
        VectorEnvelope {
            intent,
            action_anchors,
            action_count,
            resource_anchors: [[1.0; 32]; MAX_ANCHORS_PER_SLOT],
            resource_count: 1,
            data_anchors: [[1.0; 32]; MAX_ANCHORS_PER_SLOT],
            data_count: 1,
            risk_anchors: [[1.0; 32]; MAX_ANCHORS_PER_SLOT],
            risk_count: 1,
            thresholds,
            weights: [1.0, 1.0, 1.0, 1.0],
            decision_mode: mode,
            global_threshold,
        }
    }

    #[test]
    fn dot_product_matches_hand_computation() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert_eq!(dot_product(&a, &b), 32.0);
    }

    #[test]
    fn min_mode_all_pass_allows() {
        let envelope = envelope_with(
            [0.9f32; 128],
            [[1.0; 32]; MAX_ANCHORS_PER_SLOT],
            1,
            [0.85; 4],
            DecisionMode::Min,
            0.85,
        );
        let result = compare(&envelope).unwrap();
        assert_eq!(result.decision, 1);
    }

    #[test]
    fn min_mode_one_slot_failing_blocks() {
        let mut intent = [1.0f32; 128];
        intent[0..32].fill(-1.0);
        let mut action_anchors = [[0.0f32; 32]; MAX_ANCHORS_PER_SLOT];
        action_anchors[0].fill(1.0);

        let envelope = envelope_with(
            intent,
            action_anchors,
            1,
            [0.85; 4],
            DecisionMode::Min,
            0.85,
        );
        let result = compare(&envelope).unwrap();
        assert_eq!(result.decision, 0);
    }

    #[test]
    fn weighted_avg_above_global_threshold_allows() {
        let envelope = envelope_with(
            [0.8f32; 128],
            [[1.0; 32]; MAX_ANCHORS_PER_SLOT],
            1,
            [0.0; 4],
            DecisionMode::WeightedAvg,
            0.75,
        );
        let result = compare(&envelope).unwrap();
        assert_eq!(result.decision, 1);
    }

    #[test]
    fn weighted_avg_zero_weights_blocks() {
        let mut envelope = envelope_with(
            [0.9f32; 128],
            [[1.0; 32]; MAX_ANCHORS_PER_SLOT],
            1,
            [0.0; 4],
            DecisionMode::WeightedAvg,
            0.0,
        );
        envelope.weights = [0.0; 4];
        let result = compare(&envelope).unwrap();
        assert_eq!(result.decision, 0);
    }

    #[test]
    fn identical_vectors_have_cosine_one() {
        let intent = [0.5f32; 128];
        let envelope = envelope_with(
            intent,
            [[0.5; 32]; MAX_ANCHORS_PER_SLOT],
            1,
            [0.8; 4],
            DecisionMode::Min,
            0.8,
        );
        let result = compare(&envelope).unwrap();
        for sim in result.slice_similarities {
            assert!((sim - 1.0).abs() < 0.01, "expected ~1.0, got {sim}");
        }
    }

    #[test]
    fn orthogonal_vectors_have_cosine_zero() {
        let mut intent = [0.0f32; 128];
        intent[0..16].fill(1.0);
        let mut action_anchors = [[0.0f32; 32]; MAX_ANCHORS_PER_SLOT];
        action_anchors[0][16..32].fill(1.0);

        let envelope = envelope_with(
            intent,
            action_anchors,
            1,
            [0.0; 4],
            DecisionMode::Min,
            0.0,
        );
        let result = compare(&envelope).unwrap();
        assert!(result.slice_similarities[0].abs() < 0.05);
    }

    #[test]
    fn zero_norm_intent_slot_returns_zero_not_nan() {
        let envelope = envelope_with(
            [0.0f32; 128],
            [[1.0; 32]; MAX_ANCHORS_PER_SLOT],
            1,
            [0.8; 4],
            DecisionMode::Min,
            0.8,
        );
        let result = compare(&envelope).unwrap();
        assert!(!result.slice_similarities[0].is_nan());
        assert_eq!(result.slice_similarities[0], 0.0);
    }

    #[test]
    fn max_of_anchors_finds_the_matching_exemplar() {
        let mut intent = [0.0f32; 128];
        intent[0] = 1.0;

        let mut action_anchors = [[0.0f32; 32]; MAX_ANCHORS_PER_SLOT];
        action_anchors[0][0] = 1.0; // "read"
        action_anchors[1][1] = 1.0; // "write"
        action_anchors[2][2] = 1.0; // "delete"

        let envelope = envelope_with(
            intent,
            action_anchors,
            3,
            [0.9, 0.0, 0.0, 0.0],
            DecisionMode::Min,
            0.8,
        );
        let result = compare(&envelope).unwrap();
        assert!(result.slice_similarities[0] > 0.99);
        assert_eq!(result.decision, 1);
    }

    #[test]
    fn no_anchor_match_has_low_similarity_and_blocks() {
        let mut intent = [0.0f32; 128];
        intent[3] = 1.0; // "export" — not among the anchors below

        let mut action_anchors = [[0.0f32; 32]; MAX_ANCHORS_PER_SLOT];
        action_anchors[0][0] = 1.0;
        action_anchors[1][1] = 1.0;
        action_anchors[2][2] = 1.0;

        let envelope = envelope_with(
            intent,
            action_anchors,
            3,
            [0.8, 0.0, 0.0, 0.0],
            DecisionMode::Min,
            0.8,
        );
        let result = compare(&envelope).unwrap();
        assert!(result.slice_similarities[0] < 0.1);
        assert_eq!(result.decision, 0);
    }

    #[test]
    fn zero_anchor_count_is_a_precondition_violation() {
        let envelope = envelope_with(
            [1.0f32; 128],
            [[0.0; 32]; MAX_ANCHORS_PER_SLOT],
            0,
            [0.8; 4],
            DecisionMode::Min,
            0.8,
        );
        let err = compare(&envelope).unwrap_err();
        assert_eq!(err, KernelError::ZeroAnchorCount(Slot::Action));
    }
}
