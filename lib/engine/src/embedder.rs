//! Appearance embeddings.
//!
//! The engine treats the appearance model as a pluggable source behind
//! [`EmbeddingSource`]; the geometric descriptor never depends on it. The
//! built-in [`GridEmbedder`] is a deterministic downsampling embedder that
//! needs no model weights, and [`EnsembleEmbedder`] concatenates several
//! sources into one wider embedding.

use image::DynamicImage;
use profilex_core::{Error, Result};
use tracing::debug;

/// A model that maps an image to a fixed-width appearance vector.
///
/// Implementations must be pure with respect to the image: the same pixels
/// always produce the same embedding.
pub trait EmbeddingSource: Send + Sync {
    /// Width of the produced embedding
    fn dimension(&self) -> usize;

    /// Embed one image; the returned vector has exactly `dimension()` entries.
    fn extract(&self, image: &DynamicImage) -> Result<Vec<f32>>;
}

/// Downsampling embedder: resize to a fixed square grid, grayscale, scale to
/// `[0, 1]` and L2-normalize. Crude as an appearance model, but deterministic
/// and dependency-free, which makes it the default source.
#[derive(Debug, Clone, Copy)]
pub struct GridEmbedder {
    side: u32,
}

impl GridEmbedder {
    pub fn new(side: u32) -> Self {
        Self { side }
    }

    /// Build an embedder whose output width equals `dim`.
    ///
    /// Fails unless `dim` is a perfect square, since the grid is square.
    pub fn for_dimension(dim: usize) -> Result<Self> {
        let side = (dim as f64).sqrt().round() as u32;
        if side == 0 || (side * side) as usize != dim {
            return Err(Error::Embedding(format!(
                "embedding dimension {dim} is not a perfect square"
            )));
        }
        Ok(Self { side })
    }
}

impl Default for GridEmbedder {
    fn default() -> Self {
        Self { side: 16 }
    }
}

impl EmbeddingSource for GridEmbedder {
    fn dimension(&self) -> usize {
        (self.side * self.side) as usize
    }

    fn extract(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let resized = image.resize_exact(self.side, self.side, image::imageops::FilterType::Triangle);
        let gray = resized.to_luma8();

        let mut embedding: Vec<f32> = gray.pixels().map(|p| f32::from(p[0]) / 255.0).collect();

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }
        debug!(side = self.side, "Grid embedding extracted");
        Ok(embedding)
    }
}

/// Concatenation of several embedding sources into one wider vector.
pub struct EnsembleEmbedder {
    sources: Vec<Box<dyn EmbeddingSource>>,
}

impl EnsembleEmbedder {
    pub fn new(sources: Vec<Box<dyn EmbeddingSource>>) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::Embedding(
                "ensemble needs at least one source".to_string(),
            ));
        }
        Ok(Self { sources })
    }
}

impl EmbeddingSource for EnsembleEmbedder {
    fn dimension(&self) -> usize {
        self.sources.iter().map(|s| s.dimension()).sum()
    }

    fn extract(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(self.dimension());
        for source in &self.sources {
            let part = source.extract(image)?;
            if part.len() != source.dimension() {
                return Err(Error::Embedding(format!(
                    "source produced {} values, declared {}",
                    part.len(),
                    source.dimension()
                )));
            }
            out.extend(part);
        }
        Ok(out)
    }
}
