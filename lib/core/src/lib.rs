//! # profilex Core
//!
//! Core library for the profilex similarity engine.
//!
//! This crate provides the numeric building blocks:
//!
//! - [`Vector`] - Dense vector with cosine similarity and L2 normalization
//! - [`FlatIndex`] - Exact inner-product index over unit-normalized vectors,
//!   keyed by profile code
//! - [`ScoreCalibrator`] - Sigmoid remapping of raw cosine similarity to a
//!   bounded, well-spread 0-100 percentage
//! - [`Error`] / [`Result`] - Shared error taxonomy for the workspace
//!
//! ## Example
//!
//! ```rust
//! use profilex_core::{FlatIndex, ScoreCalibrator, Vector};
//!
//! let mut index = FlatIndex::new(3);
//! index.build(
//!     vec![Vector::new(vec![1.0, 0.0, 0.0]), Vector::new(vec![0.0, 1.0, 0.0])],
//!     vec!["AP0001".to_string(), "AP0002".to_string()],
//! ).unwrap();
//!
//! let calibrator = ScoreCalibrator::default();
//! let hits = index
//!     .search_calibrated(&Vector::new(vec![1.0, 0.0, 0.0]), 1, &calibrator)
//!     .unwrap();
//! assert_eq!(index.code_at(hits[0].0).unwrap(), "AP0001");
//! ```

pub mod calibrate;
pub mod error;
pub mod index;
pub mod vector;

pub use calibrate::{ScoreCalibrator, DEFAULT_CALIBRATION_K, DEFAULT_CALIBRATION_THRESHOLD};
pub use error::{Error, Result};
pub use index::FlatIndex;
pub use vector::Vector;
