//! Deterministic sparse random projection from the 384-dim base embedding
//! down to one slot's 32-dim block (`spec.md` §4.1 step 3 / §6).
//!
//! Each projection matrix is generated once from its slot's fixed seed and
//! reused for the life of the process; the same seed always yields the
//! same matrix, so two processes with the same vocabulary contract produce
//! identical vectors for the same canonical text.

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

use semantic_sandbox::SLOT_WIDTH;

/// Dimensionality of the base embedding produced by the Embedder.
pub const BASE_EMBEDDING_WIDTH: usize = 384;

/// A `BASE_EMBEDDING_WIDTH -> SLOT_WIDTH` sparse random projection matrix,
/// stored dense for simplicity (32 * 384 f32s is a few KB).
#[derive(Debug, Clone)]
pub struct ProjectionMatrix {
    rows: [[f32; BASE_EMBEDDING_WIDTH]; SLOT_WIDTH],
}

impl ProjectionMatrix {
    /// Entries drawn from `{+sqrt(3), 0, -sqrt(3)}` with probabilities
    /// `{1/6, 2/3, 1/6}` (Achlioptas sparse random projection), seeded
    /// deterministically so the matrix is reproducible from the seed alone.
    pub fn from_seed(seed: u64) -> Self {
        let sqrt3 = 3.0f32.sqrt();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut rows = [[0.0f32; BASE_EMBEDDING_WIDTH]; SLOT_WIDTH];

        for row in rows.iter_mut() {
            for value in row.iter_mut() {
                let r: f32 = rng.gen();
                *value = if r < 1.0 / 6.0 {
                    sqrt3
                } else if r < 5.0 / 6.0 {
                    0.0
                } else {
                    -sqrt3
                };
            }
        }

        ProjectionMatrix { rows }
    }

    pub fn project(&self, base: &[f32; BASE_EMBEDDING_WIDTH]) -> [f32; SLOT_WIDTH] {
        let mut out = [0.0f32; SLOT_WIDTH];
        for (i, row) in self.rows.iter().enumerate() {
            out[i] = row.iter().zip(base.iter()).map(|(r, b)| r * b).sum();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_produces_identical_matrices() {
        let a = ProjectionMatrix::from_seed(42);
        let b = ProjectionMatrix::from_seed(42);
        let base = [0.5f32; BASE_EMBEDDING_WIDTH];
        assert_eq!(a.project(&base), b.project(&base));
    }

    #[test]
    fn different_seeds_produce_different_matrices() {
        let a = ProjectionMatrix::from_seed(42);
        let b = ProjectionMatrix::from_seed(43);
        let base = [0.5f32; BASE_EMBEDDING_WIDTH];
        assert_ne!(a.project(&base), b.project(&base));
    }

    #[test]
    fn entries_are_drawn_from_the_three_allowed_values() {
        let sqrt3 = 3.0f32.sqrt();
        let matrix = ProjectionMatrix::from_seed(99);
        for row in &matrix.rows {
            for &value in row {
                assert!(value == 0.0 || (value - sqrt3).abs() < 1e-6 || (value + sqrt3).abs() < 1e-6);
            }
        }
    }
}
