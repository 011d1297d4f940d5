//! Hybrid vector assembly.
//!
//! The stored vector is the appearance embedding followed by the geometric
//! descriptor, each scaled by its configured weight, with the cavity and
//! roughness blocks of the descriptor amplified before weighting so those
//! discriminative components dominate the cosine.

use profilex_core::{Error, Result, Vector};
use profilex_geometry::FEATURE_DIM;
use std::ops::Range;

/// Slice of the geometric descriptor holding the cavity statistics
pub const CAVITY_BLOCK: Range<usize> = 10..23;
/// Slice of the geometric descriptor holding the roughness measures
pub const ROUGHNESS_BLOCK: Range<usize> = 45..50;

/// Combines an appearance embedding and a geometric descriptor into the
/// stored hybrid vector. The assembler is configured once from the engine
/// weights and is then pure.
#[derive(Debug, Clone, Copy)]
pub struct HybridAssembler {
    embedding_dim: usize,
    ai_weight: f32,
    geo_weight: f32,
    cavity_amplification: f32,
    roughness_amplification: f32,
}

impl HybridAssembler {
    pub fn new(
        embedding_dim: usize,
        ai_weight: f32,
        geo_weight: f32,
        cavity_amplification: f32,
        roughness_amplification: f32,
    ) -> Self {
        Self {
            embedding_dim,
            ai_weight,
            geo_weight,
            cavity_amplification,
            roughness_amplification,
        }
    }

    /// Width of the assembled vector
    pub fn dimension(&self) -> usize {
        self.embedding_dim + FEATURE_DIM
    }

    /// Assemble the hybrid vector, embedding first.
    ///
    /// Fails if the embedding width differs from the configured dimension.
    pub fn assemble(&self, embedding: &[f32], descriptor: &[f32; FEATURE_DIM]) -> Result<Vector> {
        if embedding.len() != self.embedding_dim {
            return Err(Error::InvalidDimension {
                expected: self.embedding_dim,
                actual: embedding.len(),
            });
        }

        let mut data = Vec::with_capacity(self.dimension());
        data.extend(embedding.iter().map(|v| v * self.ai_weight));

        for (i, &v) in descriptor.iter().enumerate() {
            let amplified = if CAVITY_BLOCK.contains(&i) {
                v * self.cavity_amplification
            } else if ROUGHNESS_BLOCK.contains(&i) {
                v * self.roughness_amplification
            } else {
                v
            };
            data.push(amplified * self.geo_weight);
        }

        Ok(Vector::new(data))
    }
}
