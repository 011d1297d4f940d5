//! The profilex similarity engine.
//!
//! Wires the geometric extractor, the appearance embedder and the flat index
//! into one service: [`SimilarityEngine`] builds a catalog from a directory
//! of profile images, persists it, and answers calibrated similarity queries
//! by profile code. [`EngineConfig`] carries the tunables; [`EmbeddingSource`]
//! is the seam for swapping appearance models.

pub mod assemble;
pub mod config;
pub mod embedder;
pub mod engine;

pub use assemble::HybridAssembler;
pub use config::EngineConfig;
pub use embedder::{EmbeddingSource, EnsembleEmbedder, GridEmbedder};
pub use engine::{SimilarityEngine, SimilarityResult};
