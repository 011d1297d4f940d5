//! Geometric feature extraction for profile silhouettes.
//!
//! The crate turns an image of a drawn profile cross-section into a
//! fixed-width, normalized descriptor: adaptive binarization ([`raster`]),
//! two-level contour extraction ([`contour`]), polygon geometry
//! ([`polyline`]), the eight feature groups ([`features`]) and fixed-range
//! normalization ([`normalize`]). [`FeatureExtractor`] ties the stages
//! together.
//!
//! ```no_run
//! use profilex_geometry::FeatureExtractor;
//!
//! let image = image::open("profile.png").unwrap();
//! let descriptor = FeatureExtractor::new().extract(&image);
//! assert_eq!(descriptor.len(), profilex_geometry::FEATURE_DIM);
//! ```

pub mod contour;
pub mod extractor;
pub mod features;
pub mod normalize;
pub mod polyline;
pub mod raster;

pub use contour::{find_contours, Contour};
pub use extractor::FeatureExtractor;
pub use features::{RawFeatures, FEATURE_DIM};
pub use normalize::normalize;
