//! Pieces shared by the motion/transition detectors: the post-firing cooldown
//! and the fingertip spread sample compared against a rolling baseline.

use crate::error::DetectorError;
use crate::geometry::{self, Position};
use crate::history::{HandStates, RollingHistory};
use crate::landmarks::{HandId, Landmarks};

/// Refractory period after a detector fires for a hand
#[derive(Debug, Clone)]
pub struct Cooldown {
    frames: u32,
    remaining: HandStates<u32>,
}

impl Cooldown {
    pub fn new(frames: u32) -> Self {
        Self {
            frames,
            remaining: HandStates::new(),
        }
    }

    pub fn start(&mut self, hand_id: &HandId) {
        if self.frames > 0 {
            self.remaining.insert(hand_id.clone(), self.frames);
        }
    }

    /// Count one frame off the hand's cooldown. Returns true while the
    /// detector must stay quiet; the counter is dropped when it reaches zero.
    pub fn tick(&mut self, hand_id: &HandId) -> bool {
        let Some(remaining) = self.remaining.get_mut(hand_id) else {
            return false;
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.remaining.remove(hand_id);
            false
        } else {
            true
        }
    }

    pub fn is_cooling(&self, hand_id: &HandId) -> bool {
        self.remaining.contains(hand_id)
    }

    pub fn clear(&mut self, hand_id: Option<&HandId>) {
        match hand_id {
            Some(id) => {
                self.remaining.remove(id);
            }
            None => self.remaining.clear(),
        }
    }

    pub fn hand_ids(&self) -> impl Iterator<Item = &HandId> {
        self.remaining.hand_ids()
    }
}

/// Fingertip spread measurements for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadSample {
    pub variance: f64,
    /// Thumb to pinky fingertip-to-palm distances
    pub distances: [f64; 5],
}

impl SpreadSample {
    pub fn measure(
        detector: &'static str,
        landmarks: &Landmarks,
        center: &Position,
    ) -> Result<Self, DetectorError> {
        let variance =
            DetectorError::check_finite(detector, "fingertip variance", geometry::fingertip_variance(landmarks))?;
        Ok(Self {
            variance,
            distances: geometry::fingertip_distances(landmarks, center),
        })
    }
}

/// Mean of every sample except the newest
pub fn spread_baseline(history: &RollingHistory<SpreadSample>) -> Option<SpreadSample> {
    let count = history.len().checked_sub(1).filter(|n| *n > 0)?;

    let mut baseline = SpreadSample {
        variance: 0.0,
        distances: [0.0; 5],
    };
    for sample in history.baseline() {
        baseline.variance += sample.variance;
        for (sum, d) in baseline.distances.iter_mut().zip(sample.distances) {
            *sum += d;
        }
    }

    let n = count as f64;
    baseline.variance /= n;
    for sum in baseline.distances.iter_mut() {
        *sum /= n;
    }
    Some(baseline)
}

/// Percent change of `current` relative to `baseline`
pub fn percent_change(baseline: f64, current: f64) -> f64 {
    (current - baseline) / (baseline + 1e-6) * 100.0
}
