//! `RuleAnchors`: one rule's per-slot anchor vectors, padded to the
//! kernel's fixed-size arrays, plus the wire format used to persist and
//! replay them.

use semantic_sandbox::{Slot, MAX_ANCHORS_PER_SLOT, SLOT_WIDTH};

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct AnchorBlock {
    pub vectors: [[f32; SLOT_WIDTH]; MAX_ANCHORS_PER_SLOT],
    pub count: usize,
}

impl AnchorBlock {
    /// `count` must be at least 1; a zero count is a precondition
    /// violation surfaced by the kernel, not a wildcard.
    pub fn new(vectors: Vec<[f32; SLOT_WIDTH]>) -> Result<Self, EngineError> {
        if vectors.is_empty() {
            return Err(EngineError::InternalInconsistency(
                "anchor block built with zero vectors".into(),
            ));
        }
        if vectors.len() > MAX_ANCHORS_PER_SLOT {
            return Err(EngineError::InternalInconsistency(format!(
                "anchor block has {} vectors, max is {MAX_ANCHORS_PER_SLOT}",
                vectors.len()
            )));
        }

        let count = vectors.len();
        let mut padded = [[0.0f32; SLOT_WIDTH]; MAX_ANCHORS_PER_SLOT];
        for (i, v) in vectors.into_iter().enumerate() {
            padded[i] = v;
        }

        Ok(AnchorBlock {
            vectors: padded,
            count,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RuleAnchors {
    pub action: AnchorBlock,
    pub resource: AnchorBlock,
    pub data: AnchorBlock,
    pub risk: AnchorBlock,
}

impl RuleAnchors {
    pub fn block(&self, slot: Slot) -> &AnchorBlock {
        match slot {
            Slot::Action => &self.action,
            Slot::Resource => &self.resource,
            Slot::Data => &self.data,
            Slot::Risk => &self.risk,
        }
    }

    /// Row-major little-endian f32 per slot, in `Slot::ALL` order, each
    /// block followed by a trailing `u32` anchor count.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            Slot::ALL.len() * (MAX_ANCHORS_PER_SLOT * SLOT_WIDTH * 4 + 4),
        );
        for &slot in &Slot::ALL {
            let block = self.block(slot);
            for row in &block.vectors {
                for value in row {
                    out.extend_from_slice(&value.to_le_bytes());
                }
            }
            out.extend_from_slice(&(block.count as u32).to_le_bytes());
        }
        out
    }

    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        const BLOCK_BYTES: usize = MAX_ANCHORS_PER_SLOT * SLOT_WIDTH * 4 + 4;
        let expected = Slot::ALL.len() * BLOCK_BYTES;
        if bytes.len() != expected {
            return Err(EngineError::InternalInconsistency(format!(
                "rule anchor wire payload has {} bytes, expected {expected}",
                bytes.len()
            )));
        }

        let mut blocks = Vec::with_capacity(4);
        for (i, _slot) in Slot::ALL.iter().enumerate() {
            let base = i * BLOCK_BYTES;
            let mut vectors = [[0.0f32; SLOT_WIDTH]; MAX_ANCHORS_PER_SLOT];
            let mut cursor = base;
            for row in vectors.iter_mut() {
                for value in row.iter_mut() {
                    let bytes4: [u8; 4] = bytes[cursor..cursor + 4]
                        .try_into()
                        .expect("slice is exactly 4 bytes");
                    *value = f32::from_le_bytes(bytes4);
                    cursor += 4;
                }
            }
            let count_bytes: [u8; 4] = bytes[cursor..cursor + 4]
                .try_into()
                .expect("slice is exactly 4 bytes");
            let count = u32::from_le_bytes(count_bytes) as usize;

            if count == 0 || count > MAX_ANCHORS_PER_SLOT {
                return Err(EngineError::InternalInconsistency(format!(
                    "rule anchor wire payload has invalid count {count} for slot {i}"
                )));
            }

            blocks.push(AnchorBlock { vectors, count });
        }

        let mut blocks = blocks.into_iter();
        Ok(RuleAnchors {
            action: blocks.next().unwrap(),
            resource: blocks.next().unwrap(),
            data: blocks.next().unwrap(),
            risk: blocks.next().unwrap(),
        })
    }
}
