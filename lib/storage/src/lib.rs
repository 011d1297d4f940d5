//! Persistence for the profile catalog and its index.
//!
//! Two artifacts live side by side on disk: the binary index snapshot
//! ([`persistence`], bincode) and the JSON profile catalog ([`metadata`]).
//! Both are written atomically so a crash never leaves either torn; keeping
//! them consistent with each other is the engine's job.

pub mod metadata;
pub mod persistence;

pub use metadata::{CatalogMetadata, ProfileRecord};
pub use persistence::{load_index, save_index};
