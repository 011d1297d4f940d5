use tracing::{debug, warn};

/// Default sigmoid steepness
pub const DEFAULT_CALIBRATION_K: f32 = 20.0;
/// Default sigmoid center; raw similarity at this value maps to exactly 50%
pub const DEFAULT_CALIBRATION_THRESHOLD: f32 = 0.90;

/// Calibrated batch means above this are logged as a quality signal
const MEAN_ALERT_PERCENT: f32 = 65.0;

/// Maps raw cosine similarity to a bounded 0-100 percentage.
///
/// Raw cosine similarity on high-dimensional hybrid vectors clusters tightly
/// near 1.0, which inflates naive percentages for every pair. The steep,
/// high-threshold sigmoid
///
/// ```text
/// score = 100 / (1 + exp(-k * (raw - threshold)))
/// ```
///
/// pushes everything below ~0.85 raw similarity toward 0% and reserves the
/// upper band for genuinely close matches.
#[derive(Debug, Clone, Copy)]
pub struct ScoreCalibrator {
    k: f32,
    threshold: f32,
}

impl Default for ScoreCalibrator {
    fn default() -> Self {
        Self {
            k: DEFAULT_CALIBRATION_K,
            threshold: DEFAULT_CALIBRATION_THRESHOLD,
        }
    }
}

impl ScoreCalibrator {
    pub fn new(k: f32, threshold: f32) -> Self {
        Self { k, threshold }
    }

    pub fn k(&self) -> f32 {
        self.k
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Calibrate one raw similarity to [0, 100]
    #[inline]
    pub fn calibrate_one(&self, raw: f32) -> f32 {
        let score = 100.0 / (1.0 + (-self.k * (raw - self.threshold)).exp());
        score.clamp(0.0, 100.0)
    }

    /// Calibrate a batch of raw similarities.
    ///
    /// The batch mean is a monitoring signal: exceeding 65% is logged as a
    /// warning, never an error.
    pub fn calibrate(&self, raw: &[f32]) -> Vec<f32> {
        let calibrated: Vec<f32> = raw.iter().map(|&r| self.calibrate_one(r)).collect();

        if !calibrated.is_empty() {
            let mean = calibrated.iter().sum::<f32>() / calibrated.len() as f32;
            debug!(
                "Calibrated {} scores, mean {:.2}% (k={}, threshold={})",
                calibrated.len(),
                mean,
                self.k,
                self.threshold
            );
            if mean > MEAN_ALERT_PERCENT {
                warn!(
                    "Average calibrated similarity {:.2}% exceeds target {:.0}%; \
                     consider stronger calibration parameters",
                    mean, MEAN_ALERT_PERCENT
                );
            }
        }

        calibrated
    }
}
