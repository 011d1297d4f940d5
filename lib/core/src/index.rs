use crate::{Error, Result, ScoreCalibrator, Vector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Flat inner-product index over unit-normalized vectors.
///
/// Stores all vectors alongside a parallel, ordered list of profile codes:
/// slot `i` always holds the vector for `codes[i]`. Vectors are normalized to
/// unit L2 norm on insertion so that inner-product search equals cosine
/// similarity. The index is additive-only at runtime; `build` replaces it
/// wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vector>,
    codes: Vec<String>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            codes: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Replace the index contents wholesale.
    ///
    /// Fails if the vector and code counts differ or any vector has the wrong
    /// dimension; on failure the previous contents are left untouched.
    pub fn build(&mut self, vectors: Vec<Vector>, codes: Vec<String>) -> Result<()> {
        if vectors.len() != codes.len() {
            return Err(Error::LengthMismatch {
                vectors: vectors.len(),
                codes: codes.len(),
            });
        }
        for v in &vectors {
            if v.dim() != self.dimension {
                return Err(Error::InvalidDimension {
                    expected: self.dimension,
                    actual: v.dim(),
                });
            }
        }

        self.vectors = vectors.into_iter().map(|v| v.normalized()).collect();
        self.codes = codes;
        info!("Index built with {} vectors", self.vectors.len());
        Ok(())
    }

    /// Append one vector; amortized O(1), no rebalancing for a flat index.
    pub fn add(&mut self, vector: Vector, code: String) -> Result<()> {
        if vector.dim() != self.dimension {
            return Err(Error::InvalidDimension {
                expected: self.dimension,
                actual: vector.dim(),
            });
        }

        self.vectors.push(vector.normalized());
        self.codes.push(code);
        Ok(())
    }

    /// Exact nearest-neighbor search by inner product.
    ///
    /// Returns up to `k + 1` hits as `(slot, raw_similarity)` sorted by
    /// descending similarity; the extra hit covers the case where the query
    /// profile is itself in the index and must be excluded by the caller.
    /// Ties keep insertion order (the sort is stable).
    pub fn search(&self, query: &Vector, k: usize) -> Result<Vec<(usize, f32)>> {
        if self.is_empty() {
            return Err(Error::EmptyIndex);
        }
        if query.dim() != self.dimension {
            return Err(Error::InvalidDimension {
                expected: self.dimension,
                actual: query.dim(),
            });
        }

        let normalized_query = query.normalized();
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(slot, v)| (slot, v.dot(&normalized_query)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate((k + 1).min(self.vectors.len()));

        debug!(
            "Search returned {} candidates, top raw similarity {:.4}",
            scored.len(),
            scored.first().map(|(_, s)| *s).unwrap_or(0.0)
        );
        Ok(scored)
    }

    /// Search and map raw similarities to calibrated 0-100 percentages.
    pub fn search_calibrated(
        &self,
        query: &Vector,
        k: usize,
        calibrator: &ScoreCalibrator,
    ) -> Result<Vec<(usize, f32)>> {
        let hits = self.search(query, k)?;
        let raw: Vec<f32> = hits.iter().map(|(_, s)| *s).collect();
        let calibrated = calibrator.calibrate(&raw);
        Ok(hits
            .into_iter()
            .zip(calibrated)
            .map(|((slot, _), score)| (slot, score))
            .collect())
    }

    /// Profile code stored at a slot
    pub fn code_at(&self, slot: usize) -> Result<&str> {
        self.codes
            .get(slot)
            .map(String::as_str)
            .ok_or(Error::SlotOutOfRange {
                slot,
                len: self.codes.len(),
            })
    }

    /// Slot holding a profile code (exact match)
    pub fn slot_of(&self, code: &str) -> Result<usize> {
        self.codes
            .iter()
            .position(|c| c == code)
            .ok_or_else(|| Error::ProfileNotFound(code.to_string()))
    }
}
