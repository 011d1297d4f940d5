//! profilex: hybrid similarity search for extrusion profile drawings.
//!
//! The workspace splits into four crates, re-exported here:
//!
//! - `profilex-geometry` - silhouette binarization, contour hierarchy and the
//!   55-component geometric descriptor
//! - `profilex-core` - vectors, the flat cosine index and score calibration
//! - `profilex-storage` - atomic index snapshots and the JSON profile catalog
//! - `profilex-engine` - the orchestrating [`SimilarityEngine`]
//!
//! [`SimilarityEngine`]: profilex_engine::SimilarityEngine

pub use profilex_core as core;
pub use profilex_engine as engine;
pub use profilex_geometry as geometry;
pub use profilex_storage as storage;

pub mod prelude {
    pub use profilex_core::{FlatIndex, ScoreCalibrator, Vector};
    pub use profilex_engine::{
        EngineConfig, GridEmbedder, SimilarityEngine, SimilarityResult,
    };
    pub use profilex_geometry::{FeatureExtractor, FEATURE_DIM};
}
