//! Horizontal swipes of the open hand and of the two-finger pose.

use super::dynamic::Cooldown;
use super::{details, round2, DetectorCategory, GestureDetector};
use crate::config::{PostureConfig, SwipeConfig, TwoFingerSwipeConfig};
use crate::error::DetectorError;
use crate::events::{EngineEvent, GestureEvent};
use crate::geometry::{self, Position};
use crate::history::{HandStates, RollingHistory};
use crate::landmarks::{Hand, HandId};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    fn from_dx(dx: f64) -> Self {
        if dx > 0.0 {
            SwipeDirection::Right
        } else {
            SwipeDirection::Left
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Left => "left",
            SwipeDirection::Right => "right",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SwipeDirection::Left => "Left",
            SwipeDirection::Right => "Right",
        }
    }
}

/// Step-by-step summary of horizontal palm travel over a window
#[derive(Debug, Clone, PartialEq)]
pub struct HorizontalTrace {
    /// Sum of |dx| over every step
    pub travelled: f64,
    /// Newest minus oldest position
    pub displacement_x: f64,
    pub displacement_y: f64,
    /// Set by the first step larger than the step threshold
    pub direction: Option<SwipeDirection>,
    /// Significant steps agreeing with `direction`
    pub consistent_steps: u32,
    /// Significant steps against `direction`
    pub reversals: u32,
    pub positions: usize,
}

pub fn trace_horizontal(positions: &[Position], step_threshold: f64) -> HorizontalTrace {
    let mut trace = HorizontalTrace {
        travelled: 0.0,
        displacement_x: 0.0,
        displacement_y: 0.0,
        direction: None,
        consistent_steps: 0,
        reversals: 0,
        positions: positions.len(),
    };

    if let (Some(first), Some(last)) = (positions.first(), positions.last()) {
        trace.displacement_x = last.x as f64 - first.x as f64;
        trace.displacement_y = last.y as f64 - first.y as f64;
    }

    for step in positions.windows(2) {
        let dx = step[1].x as f64 - step[0].x as f64;
        trace.travelled += dx.abs();
        if dx.abs() <= step_threshold {
            continue;
        }

        let direction = SwipeDirection::from_dx(dx);
        match trace.direction {
            None => {
                trace.direction = Some(direction);
                trace.consistent_steps = 1;
            }
            Some(current) if current == direction => trace.consistent_steps += 1,
            Some(_) => trace.reversals += 1,
        }
    }

    trace
}

/// Palm position plus whether the frame held the required posture
#[derive(Debug, Clone, Copy)]
struct MotionSample {
    center: Position,
    in_pose: bool,
}

#[derive(Debug, Clone)]
struct SwipeTracker {
    history_length: usize,
    samples: HandStates<RollingHistory<MotionSample>>,
    cooldown: Cooldown,
}

impl SwipeTracker {
    fn new(history_length: usize, cooldown_frames: u32) -> Self {
        Self {
            history_length,
            samples: HandStates::new(),
            cooldown: Cooldown::new(cooldown_frames),
        }
    }

    /// None while cooling down
    fn record(&mut self, hand: &Hand, in_pose: bool) -> Option<&RollingHistory<MotionSample>> {
        if self.cooldown.tick(&hand.id) {
            return None;
        }
        let capacity = self.history_length;
        let history = self
            .samples
            .get_or_insert_with(&hand.id, || RollingHistory::new(capacity));
        history.push(MotionSample {
            center: geometry::palm_center(&hand.landmarks),
            in_pose,
        });
        Some(history)
    }

    fn fired(&mut self, hand_id: &HandId) {
        if let Some(history) = self.samples.get_mut(hand_id) {
            history.clear();
        }
        self.cooldown.start(hand_id);
    }

    fn clear_history(&mut self, hand_id: Option<&HandId>) {
        match hand_id {
            Some(id) => {
                self.samples.remove(id);
            }
            None => self.samples.clear(),
        }
    }

    fn hand_ids(&self) -> Vec<HandId> {
        let ids: BTreeSet<&HandId> = self.samples.hand_ids().chain(self.cooldown.hand_ids()).collect();
        ids.into_iter().cloned().collect()
    }
}

fn positions(history: &RollingHistory<MotionSample>) -> Vec<Position> {
    history.iter().map(|sample| sample.center).collect()
}

fn swipe_message(event: &GestureEvent, kind: &str) -> String {
    let direction = match event.details.get("direction").and_then(|v| v.as_str()) {
        Some("left") => SwipeDirection::Left.label(),
        _ => SwipeDirection::Right.label(),
    };
    let percent = event
        .details
        .get("distance_percent")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    format!("{} Hand: {} {} ({:.1}%)", event.hand_type, kind, direction, percent)
}

const HAND_SWIPE: &str = "HandSwipe";

/// Open hand moved sideways across the frame
#[derive(Debug, Clone)]
pub struct HandSwipeDetector {
    config: SwipeConfig,
    posture: PostureConfig,
    tracker: SwipeTracker,
}

impl HandSwipeDetector {
    pub fn new(config: SwipeConfig, posture: PostureConfig) -> Self {
        let tracker = SwipeTracker::new(config.history_length, config.cooldown_frames);
        Self {
            config,
            posture,
            tracker,
        }
    }

    pub fn is_cooling(&self, hand_id: &HandId) -> bool {
        self.tracker.cooldown.is_cooling(hand_id)
    }

    fn confidence(&self, travelled: f64, min_distance: f64, consistent: u32, speed: f64) -> f64 {
        let mut confidence: f64 = 70.0;
        let ratio = travelled / min_distance;
        if ratio > 2.0 {
            confidence += 20.0;
        } else if ratio > 1.5 {
            confidence += 15.0;
        } else if ratio > 1.0 {
            confidence += 10.0;
        }
        if consistent as usize >= self.config.min_movement_frames {
            confidence += 10.0;
        }
        if (5.0..=15.0).contains(&speed) {
            confidence += 5.0;
        }
        confidence.min(100.0)
    }
}

impl GestureDetector for HandSwipeDetector {
    fn name(&self) -> &'static str {
        HAND_SWIPE
    }

    fn category(&self) -> DetectorCategory {
        DetectorCategory::Dynamic
    }

    fn detect(&mut self, hand: &Hand) -> Result<Vec<EngineEvent>, DetectorError> {
        let reference = geometry::reference_length(&hand.landmarks);
        let is_open = geometry::is_hand_open(&hand.landmarks, &self.posture);
        let min_frames = self.config.min_movement_frames;

        let Some(history) = self.tracker.record(hand, is_open) else {
            return Ok(Vec::new());
        };
        if !is_open || history.len() < min_frames || geometry::is_degenerate(reference) {
            return Ok(Vec::new());
        }
        if !history.recent(min_frames).all(|sample| sample.in_pose) {
            return Ok(Vec::new());
        }

        let trace = trace_horizontal(&positions(history), reference * 0.05);
        let min_distance = reference * self.config.min_distance_percent;
        let Some(direction) = trace.direction else {
            return Ok(Vec::new());
        };
        if trace.travelled < min_distance
            || (trace.consistent_steps as f64) < min_frames as f64 * 0.6
            || trace.reversals as usize > min_frames / 3
        {
            return Ok(Vec::new());
        }

        let speed = trace.travelled / trace.positions as f64;
        let confidence = self.confidence(trace.travelled, min_distance, trace.consistent_steps, speed);
        debug!("{} {} detected for {}", HAND_SWIPE, direction.as_str(), hand.id);
        self.tracker.fired(&hand.id);

        let event = GestureEvent::new(
            hand.id.clone(),
            hand.hand_type,
            HAND_SWIPE,
            confidence,
            details([
                ("description", json!(format!("hand swiped {}", direction.as_str()))),
                ("direction", json!(direction.as_str())),
                ("total_distance", json!(round2(trace.travelled))),
                ("distance_percent", json!(round2(trace.travelled / reference * 100.0))),
                ("movement_frames", json!(trace.consistent_steps)),
                ("movement_speed", json!(round2(speed))),
            ]),
        );
        Ok(vec![event.into()])
    }

    fn display_message(&self, event: &GestureEvent) -> String {
        swipe_message(event, "Swipe")
    }

    fn clear_detection_history(&mut self, hand_id: Option<&HandId>) {
        self.tracker.clear_history(hand_id);
    }

    fn clear_cooldown(&mut self, hand_id: Option<&HandId>) {
        self.tracker.cooldown.clear(hand_id);
    }

    fn tracked_hands(&self) -> Vec<HandId> {
        self.tracker.hand_ids()
    }
}

const TWO_FINGER_SWIPE: &str = "TwoFingerSwipe";

/// Fraction of recent frames that must hold the two-finger pose
const POSE_RATE: f64 = 0.7;

/// Index and middle fingers held together and swept sideways
#[derive(Debug, Clone)]
pub struct TwoFingerSwipeDetector {
    config: TwoFingerSwipeConfig,
    posture: PostureConfig,
    tracker: SwipeTracker,
}

impl TwoFingerSwipeDetector {
    pub fn new(config: TwoFingerSwipeConfig, posture: PostureConfig) -> Self {
        let tracker = SwipeTracker::new(config.history_length, config.cooldown_frames);
        Self {
            config,
            posture,
            tracker,
        }
    }

    pub fn is_cooling(&self, hand_id: &HandId) -> bool {
        self.tracker.cooldown.is_cooling(hand_id)
    }

    fn confidence(&self, distance_ratio: f64, consistent: u32, reversals: u32, frames: usize, speed: f64) -> f64 {
        let mut confidence: f64 = 70.0;
        if distance_ratio > 2.5 {
            confidence += 25.0;
        } else if distance_ratio > 2.0 {
            confidence += 20.0;
        } else if distance_ratio > 1.5 {
            confidence += 15.0;
        } else if distance_ratio > 1.0 {
            confidence += 10.0;
        }

        let frames = frames.max(1) as f64;
        let consistency = consistent as f64 / frames;
        if consistency > 0.8 {
            confidence += 15.0;
        } else if consistency > 0.6 {
            confidence += 10.0;
        } else if consistency > 0.4 {
            confidence += 5.0;
        }

        let change_ratio = reversals as f64 / frames;
        if change_ratio > 0.3 {
            confidence -= 10.0;
        } else if change_ratio > 0.2 {
            confidence -= 5.0;
        }

        if (3.0..=20.0).contains(&speed) {
            confidence += 5.0;
        } else if speed > 25.0 {
            confidence -= 5.0;
        }

        confidence.clamp(50.0, 100.0)
    }
}

impl GestureDetector for TwoFingerSwipeDetector {
    fn name(&self) -> &'static str {
        TWO_FINGER_SWIPE
    }

    fn category(&self) -> DetectorCategory {
        DetectorCategory::Dynamic
    }

    fn detect(&mut self, hand: &Hand) -> Result<Vec<EngineEvent>, DetectorError> {
        let reference = geometry::reference_length(&hand.landmarks);
        let in_pose = geometry::is_two_finger_pose(
            &hand.landmarks,
            self.config.finger_distance_threshold,
            &self.posture,
        );
        let min_frames = self.config.min_movement_frames;

        let Some(history) = self.tracker.record(hand, in_pose) else {
            return Ok(Vec::new());
        };
        if !in_pose || history.len() < min_frames || geometry::is_degenerate(reference) {
            return Ok(Vec::new());
        }
        let posed = history.recent(min_frames).filter(|sample| sample.in_pose).count();
        if (posed as f64) < min_frames as f64 * POSE_RATE {
            return Ok(Vec::new());
        }

        let trace = trace_horizontal(&positions(history), reference * 0.03);
        if trace.displacement_y.abs() > trace.displacement_x.abs() {
            return Ok(Vec::new());
        }

        let mut direction = trace.direction;
        let mut consistent = trace.consistent_steps;
        if direction.is_none() && trace.displacement_x.abs() > reference * 0.1 {
            direction = Some(SwipeDirection::from_dx(trace.displacement_x));
            consistent = (min_frames / 2) as u32;
        }
        let Some(direction) = direction else {
            return Ok(Vec::new());
        };

        let distance = trace.travelled.max(trace.displacement_x.abs());
        let min_distance = reference * self.config.min_distance_percent;
        let consistency_needed = (min_frames as f64 * 0.4).max(3.0);
        if distance < min_distance
            || (consistent as f64) < consistency_needed
            || trace.reversals as usize > min_frames / 3
        {
            return Ok(Vec::new());
        }

        let speed = distance / trace.positions as f64;
        let confidence = self.confidence(
            distance / min_distance,
            consistent,
            trace.reversals,
            trace.positions,
            speed,
        );
        debug!("{} {} detected for {}", TWO_FINGER_SWIPE, direction.as_str(), hand.id);
        self.tracker.fired(&hand.id);

        let event = GestureEvent::new(
            hand.id.clone(),
            hand.hand_type,
            TWO_FINGER_SWIPE,
            confidence,
            details([
                ("description", json!(format!("two fingers swiped {}", direction.as_str()))),
                ("direction", json!(direction.as_str())),
                ("total_distance", json!(round2(distance))),
                ("distance_percent", json!(round2(distance / reference * 100.0))),
                ("movement_frames", json!(consistent)),
                ("movement_speed", json!(round2(speed))),
                ("direction_changes", json!(trace.reversals)),
                ("x_displacement", json!(round2(trace.displacement_x))),
            ]),
        );
        Ok(vec![event.into()])
    }

    fn display_message(&self, event: &GestureEvent) -> String {
        swipe_message(event, "Two-Finger Swipe")
    }

    fn clear_detection_history(&mut self, hand_id: Option<&HandId>) {
        self.tracker.clear_history(hand_id);
    }

    fn clear_cooldown(&mut self, hand_id: Option<&HandId>) {
        self.tracker.cooldown.clear(hand_id);
    }

    fn tracked_hands(&self) -> Vec<HandId> {
        self.tracker.hand_ids()
    }
}
