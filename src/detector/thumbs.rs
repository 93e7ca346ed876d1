use super::static_gesture::{Classification, StaticLifecycle, StaticPolicy};
use super::{details, round2, DetectorCategory, GestureDetector};
use crate::config::ThumbsConfig;
use crate::error::DetectorError;
use crate::events::{EngineEvent, GestureEvent};
use crate::geometry::{self, Finger};
use crate::landmarks::{Hand, HandId, Landmarks, THUMB_TIP};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbDirection {
    Up,
    Down,
}

impl ThumbDirection {
    pub fn gesture_name(self) -> &'static str {
        match self {
            ThumbDirection::Up => "ThumbsUp",
            ThumbDirection::Down => "ThumbsDown",
        }
    }
}

/// Closed fist with the thumb isolated and pointing up or down
#[derive(Debug, Clone)]
pub struct ThumbsDetector {
    direction: ThumbDirection,
    config: ThumbsConfig,
    lifecycle: StaticLifecycle,
}

impl ThumbsDetector {
    pub fn new(direction: ThumbDirection, config: ThumbsConfig, output_interval: u32) -> Self {
        let lifecycle = StaticLifecycle::new(StaticPolicy {
            required_frames: config.required_frames,
            debounce_frames: config.debounce_frames,
            output_interval,
            reset_on_mismatch: config.reset_on_mismatch,
        });
        Self {
            direction,
            config,
            lifecycle,
        }
    }

    pub fn lifecycle(&self) -> &StaticLifecycle {
        &self.lifecycle
    }

    pub fn classify(&self, landmarks: &Landmarks) -> Option<Classification> {
        let reference = geometry::reference_length(landmarks);
        if geometry::is_degenerate(reference) {
            return None;
        }

        let pointing = match self.direction {
            ThumbDirection::Up => geometry::thumb_points_up(landmarks),
            ThumbDirection::Down => geometry::thumb_points_down(landmarks),
        };
        if !pointing {
            return None;
        }

        let angle = geometry::thumb_angle(landmarks);
        if angle >= self.config.thumb_angle_threshold {
            return None;
        }

        let distances = geometry::fingertip_distances(landmarks, &geometry::palm_center(landmarks));
        let thumb_ratio = distances[0] / reference;
        if thumb_ratio <= self.config.thumb_distance_threshold {
            return None;
        }

        let finger_ratios: Vec<f64> = distances[1..].iter().map(|d| d / reference).collect();
        let close_fingers = finger_ratios
            .iter()
            .filter(|&&ratio| ratio < self.config.other_fingers_threshold)
            .count();
        if close_fingers < finger_ratios.len() {
            return None;
        }

        let isolation = Finger::LONG
            .iter()
            .map(|finger| geometry::distance(&landmarks[THUMB_TIP], &landmarks[finger.pip()]))
            .fold(f64::INFINITY, f64::min)
            / reference;
        if isolation <= self.config.thumb_isolation_threshold {
            return None;
        }

        let threshold = self.config.thumb_distance_threshold;
        let mut confidence: f64 = 80.0;
        if thumb_ratio > threshold * 1.3 {
            confidence += 15.0;
        } else if thumb_ratio > threshold * 1.1 {
            confidence += 10.0;
        } else {
            confidence += 5.0;
        }

        if angle < 15.0 {
            confidence += 10.0;
        } else if angle < 25.0 {
            confidence += 5.0;
        }

        confidence += 3.0 * close_fingers as f64;

        let mean_ratio = geometry::mean(&finger_ratios);
        if mean_ratio < self.config.other_fingers_threshold * 0.8 {
            confidence += 8.0;
        } else if mean_ratio < self.config.other_fingers_threshold * 0.9 {
            confidence += 5.0;
        }

        Some(Classification {
            gesture: self.direction.gesture_name(),
            confidence: confidence.min(100.0),
            details: details([
                ("description", json!(format!("thumb pointing {:?}", self.direction).to_lowercase())),
                ("thumb_angle", json!(round2(angle))),
                ("thumb_distance_ratio", json!(round2(thumb_ratio))),
                ("fingers_close", json!(close_fingers)),
                ("thumb_isolation", json!(round2(isolation))),
            ]),
        })
    }
}

impl GestureDetector for ThumbsDetector {
    fn name(&self) -> &'static str {
        self.direction.gesture_name()
    }

    fn category(&self) -> DetectorCategory {
        DetectorCategory::Static
    }

    fn detect(&mut self, hand: &Hand) -> Result<Vec<EngineEvent>, DetectorError> {
        let classification = self.classify(&hand.landmarks);
        Ok(self
            .lifecycle
            .observe(hand, classification)
            .into_iter()
            .map(EngineEvent::from)
            .collect())
    }

    fn display_message(&self, event: &GestureEvent) -> String {
        format!("{} Hand: {}", event.hand_type, self.direction.gesture_name())
    }

    fn force_end(&mut self, hand_id: &HandId) -> Option<GestureEvent> {
        self.lifecycle.force_end(hand_id)
    }

    fn clear_detection_history(&mut self, hand_id: Option<&HandId>) {
        self.lifecycle.clear(hand_id);
    }

    fn tracked_hands(&self) -> Vec<HandId> {
        self.lifecycle.hand_ids()
    }
}
