use super::static_gesture::{Classification, StaticLifecycle, StaticPolicy};
use super::{details, DetectorCategory, GestureDetector};
use crate::config::{FingerCountConfig, PostureConfig};
use crate::error::DetectorError;
use crate::events::{EngineEvent, GestureEvent};
use crate::geometry::{self, Finger};
use crate::landmarks::{Hand, HandId, Landmarks, WRIST};
use serde_json::json;

/// Index/middle tips must be at least this far apart for a count of two
const SPREAD_RATIO: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerCount {
    One,
    Two,
    Three,
}

impl FingerCount {
    pub fn gesture_name(self) -> &'static str {
        match self {
            FingerCount::One => "FingerCountOne",
            FingerCount::Two => "FingerCountTwo",
            FingerCount::Three => "FingerCountThree",
        }
    }

    fn label(self) -> &'static str {
        match self {
            FingerCount::One => "One",
            FingerCount::Two => "Two",
            FingerCount::Three => "Three",
        }
    }
}

/// Counts of one, two or three raised fingers with the thumb tucked
#[derive(Debug, Clone)]
pub struct FingerCountDetector {
    count: FingerCount,
    config: FingerCountConfig,
    posture: PostureConfig,
    lifecycle: StaticLifecycle,
}

impl FingerCountDetector {
    pub fn new(
        count: FingerCount,
        config: FingerCountConfig,
        posture: PostureConfig,
        output_interval: u32,
    ) -> Self {
        let lifecycle = StaticLifecycle::new(StaticPolicy {
            required_frames: config.required_frames,
            debounce_frames: config.debounce_frames,
            output_interval,
            reset_on_mismatch: config.reset_on_mismatch,
        });
        Self {
            count,
            config,
            posture,
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

        let ratio = self.config.distance_threshold_percent;
        let extended = |finger| geometry::is_finger_extended(landmarks, finger, ratio);
        let bent = |finger| geometry::is_finger_bent(landmarks, finger);
        let thumb_close = geometry::is_thumb_close_to_palm(landmarks, self.posture.thumb_close_ratio);
        let below_wrist = |finger: Finger| landmarks[finger.tip()].y > landmarks[WRIST].y;
        let height = |finger| geometry::finger_height(landmarks, finger);

        let (confidence, flags) = match self.count {
            FingerCount::One => {
                if !(extended(Finger::Index)
                    && bent(Finger::Middle)
                    && bent(Finger::Ring)
                    && bent(Finger::Pinky)
                    && thumb_close)
                {
                    return None;
                }

                let mut confidence: f64 = 85.0;
                if height(Finger::Index) > reference * 0.6 {
                    confidence += 10.0;
                }
                if below_wrist(Finger::Middle) && below_wrist(Finger::Ring) && below_wrist(Finger::Pinky) {
                    confidence += 10.0;
                }
                confidence += 5.0;
                (
                    confidence,
                    details([
                        ("description", json!("index finger raised")),
                        ("index_extended", json!(true)),
                        ("others_bent", json!(true)),
                        ("thumb_close", json!(thumb_close)),
                    ]),
                )
            }
            FingerCount::Two => {
                if !(extended(Finger::Index)
                    && extended(Finger::Middle)
                    && bent(Finger::Ring)
                    && bent(Finger::Pinky)
                    && geometry::fingers_spread(landmarks, Finger::Index, Finger::Middle, SPREAD_RATIO)
                    && thumb_close)
                {
                    return None;
                }

                let mut confidence: f64 = 85.0;
                if height(Finger::Index) > reference * 0.5 && height(Finger::Middle) > reference * 0.5 {
                    confidence += 10.0;
                }
                if below_wrist(Finger::Ring) && below_wrist(Finger::Pinky) {
                    confidence += 5.0;
                }
                confidence += 5.0;
                (
                    confidence,
                    details([
                        ("description", json!("index and middle fingers raised")),
                        ("fingers_spread", json!(true)),
                        ("ring_pinky_bent", json!(true)),
                        ("thumb_close", json!(thumb_close)),
                    ]),
                )
            }
            FingerCount::Three => {
                if !(extended(Finger::Index)
                    && extended(Finger::Middle)
                    && extended(Finger::Ring)
                    && bent(Finger::Pinky)
                    && thumb_close)
                {
                    return None;
                }

                let raised = [Finger::Index, Finger::Middle, Finger::Ring];
                let mut confidence: f64 = 85.0;
                confidence += 3.0
                    * raised
                        .iter()
                        .filter(|&&finger| height(finger) > reference * 0.5)
                        .count() as f64;
                if below_wrist(Finger::Pinky) {
                    confidence += 5.0;
                }
                confidence += 5.0;

                let tips_y = raised.map(|finger| landmarks[finger.tip()].y);
                let spread = tips_y.iter().max().copied().unwrap_or(0) - tips_y.iter().min().copied().unwrap_or(0);
                if (spread as f64) < reference * 0.2 {
                    confidence += 5.0;
                }
                (
                    confidence,
                    details([
                        ("description", json!("index, middle and ring fingers raised")),
                        ("pinky_bent", json!(true)),
                        ("tip_alignment", json!(spread)),
                        ("thumb_close", json!(thumb_close)),
                    ]),
                )
            }
        };

        Some(Classification {
            gesture: self.count.gesture_name(),
            confidence: confidence.min(100.0),
            details: flags,
        })
    }
}

impl GestureDetector for FingerCountDetector {
    fn name(&self) -> &'static str {
        self.count.gesture_name()
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
        format!("{} Hand: Number {}", event.hand_type, self.count.label())
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
