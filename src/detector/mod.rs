//! Gesture detectors.
//!
//! Every detector keeps its own per-hand state and is driven one hand at a
//! time by the [`GestureManager`](crate::manager::GestureManager). The three
//! kinds of state a detector may hold (detection history, cooldown and
//! trajectory trail) are cleared through separate calls so the manager can
//! pick exactly what a lifecycle event requires.

pub mod dynamic;
pub mod finger_count;
pub mod hand_close;
pub mod hand_flip;
pub mod hand_open;
pub mod static_gesture;
pub mod swipe;
pub mod thumbs;

#[cfg(test)]
pub(crate) mod tests;

pub use finger_count::{FingerCount, FingerCountDetector};
pub use hand_close::HandCloseDetector;
pub use hand_flip::{FlipType, HandFlipDetector};
pub use hand_open::HandOpenDetector;
pub use swipe::{HandSwipeDetector, SwipeDirection, TwoFingerSwipeDetector};
pub use thumbs::{ThumbDirection, ThumbsDetector};

use crate::config::GestureEngineConfig;
use crate::error::DetectorError;
use crate::events::{Details, EngineEvent, GestureEvent};
use crate::landmarks::{Hand, HandId};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorCategory {
    /// Held posture confirmed over consecutive frames
    Static,
    /// Transition over a rolling window followed by a cooldown
    Dynamic,
    /// Dynamic detector that also owns a trajectory tracker
    Tracked,
}

pub trait GestureDetector {
    fn name(&self) -> &'static str;

    fn category(&self) -> DetectorCategory;

    /// Feed one frame of one hand
    fn detect(&mut self, hand: &Hand) -> Result<Vec<EngineEvent>, DetectorError>;

    fn display_message(&self, event: &GestureEvent) -> String;

    /// End event for a gesture still open on a hand that has disappeared
    fn force_end(&mut self, _hand_id: &HandId) -> Option<GestureEvent> {
        None
    }

    fn clear_detection_history(&mut self, hand_id: Option<&HandId>);

    fn clear_cooldown(&mut self, _hand_id: Option<&HandId>) {}

    fn clear_trail(&mut self, _hand_id: Option<&HandId>) {}

    /// Hands this detector currently holds any state for
    fn tracked_hands(&self) -> Vec<HandId>;

    fn reset(&mut self, hand_id: Option<&HandId>) {
        self.clear_detection_history(hand_id);
        self.clear_cooldown(hand_id);
        self.clear_trail(hand_id);
    }
}

/// The closed set of detectors the manager can run
#[derive(Debug, Clone)]
pub enum Detector {
    FingerCount(FingerCountDetector),
    Thumbs(ThumbsDetector),
    HandOpen(HandOpenDetector),
    HandClose(HandCloseDetector),
    HandSwipe(HandSwipeDetector),
    TwoFingerSwipe(TwoFingerSwipeDetector),
    HandFlip(HandFlipDetector),
    #[cfg(test)]
    Failing(tests::FailingDetector),
}

macro_rules! dispatch {
    ($self:expr, $d:ident => $body:expr) => {
        match $self {
            Detector::FingerCount($d) => $body,
            Detector::Thumbs($d) => $body,
            Detector::HandOpen($d) => $body,
            Detector::HandClose($d) => $body,
            Detector::HandSwipe($d) => $body,
            Detector::TwoFingerSwipe($d) => $body,
            Detector::HandFlip($d) => $body,
            #[cfg(test)]
            Detector::Failing($d) => $body,
        }
    };
}

impl Detector {
    /// Every detector, dynamic ones first, built from the configuration
    pub fn default_roster(config: &GestureEngineConfig) -> Vec<Detector> {
        let posture = &config.posture;
        let gestures = &config.gestures;
        let interval = gestures.static_gesture_output_interval;

        vec![
            Detector::HandOpen(HandOpenDetector::new(gestures.hand_open.clone())),
            Detector::HandClose(HandCloseDetector::new(
                gestures.hand_close.clone(),
                posture.clone(),
            )),
            Detector::HandSwipe(HandSwipeDetector::new(
                gestures.hand_swipe.clone(),
                posture.clone(),
            )),
            Detector::TwoFingerSwipe(TwoFingerSwipeDetector::new(
                gestures.two_finger_swipe.clone(),
                posture.clone(),
            )),
            Detector::HandFlip(HandFlipDetector::new(
                gestures.hand_flip.clone(),
                posture.clone(),
            )),
            Detector::FingerCount(FingerCountDetector::new(
                FingerCount::One,
                gestures.finger_count_one.clone(),
                posture.clone(),
                interval,
            )),
            Detector::FingerCount(FingerCountDetector::new(
                FingerCount::Two,
                gestures.finger_count_two.clone(),
                posture.clone(),
                interval,
            )),
            Detector::FingerCount(FingerCountDetector::new(
                FingerCount::Three,
                gestures.finger_count_three.clone(),
                posture.clone(),
                interval,
            )),
            Detector::Thumbs(ThumbsDetector::new(
                ThumbDirection::Up,
                gestures.thumbs_up.clone(),
                interval,
            )),
            Detector::Thumbs(ThumbsDetector::new(
                ThumbDirection::Down,
                gestures.thumbs_down.clone(),
                interval,
            )),
        ]
    }
}

impl GestureDetector for Detector {
    fn name(&self) -> &'static str {
        dispatch!(self, d => d.name())
    }

    fn category(&self) -> DetectorCategory {
        dispatch!(self, d => d.category())
    }

    fn detect(&mut self, hand: &Hand) -> Result<Vec<EngineEvent>, DetectorError> {
        dispatch!(self, d => d.detect(hand))
    }

    /// End events share one wording across detectors
    fn display_message(&self, event: &GestureEvent) -> String {
        if event.is_end() {
            return format!("{} Hand: {} ended", event.hand_type, event.gesture);
        }
        dispatch!(self, d => d.display_message(event))
    }

    fn force_end(&mut self, hand_id: &HandId) -> Option<GestureEvent> {
        dispatch!(self, d => d.force_end(hand_id))
    }

    fn clear_detection_history(&mut self, hand_id: Option<&HandId>) {
        dispatch!(self, d => d.clear_detection_history(hand_id))
    }

    fn clear_cooldown(&mut self, hand_id: Option<&HandId>) {
        dispatch!(self, d => d.clear_cooldown(hand_id))
    }

    fn clear_trail(&mut self, hand_id: Option<&HandId>) {
        dispatch!(self, d => d.clear_trail(hand_id))
    }

    fn tracked_hands(&self) -> Vec<HandId> {
        dispatch!(self, d => d.tracked_hands())
    }
}

/// Build a details map from literal entries
pub(crate) fn details<const N: usize>(entries: [(&str, Value); N]) -> Details {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
