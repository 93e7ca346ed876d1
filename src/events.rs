use crate::geometry::Position;
use crate::landmarks::{HandId, HandType};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form detector details attached to a gesture event
pub type Details = serde_json::Map<String, Value>;

/// Confidence carried by every trail update
pub const TRAIL_CONFIDENCE: f64 = 100.0;

/// Seconds since the Unix epoch with microsecond resolution
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Lifecycle marker stored under `details.tag`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureTag {
    Start,
    End,
}

impl GestureTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureTag::Start => "start",
            GestureTag::End => "end",
        }
    }
}

/// A classified gesture for one hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub hand_id: HandId,
    pub gesture: String,
    pub hand_type: HandType,
    /// 0 to 100
    pub confidence: f64,
    pub details: Details,
    pub timestamp: f64,
}

impl GestureEvent {
    pub fn new<S: Into<String>>(
        hand_id: HandId,
        hand_type: HandType,
        gesture: S,
        confidence: f64,
        details: Details,
    ) -> Self {
        Self {
            hand_id,
            gesture: gesture.into(),
            hand_type,
            confidence: confidence.clamp(0.0, 100.0),
            details,
            timestamp: now_timestamp(),
        }
    }

    pub fn with_tag(mut self, tag: GestureTag) -> Self {
        self.details
            .insert("tag".to_string(), Value::String(tag.as_str().to_string()));
        self
    }

    pub fn tag(&self) -> Option<GestureTag> {
        match self.details.get("tag").and_then(Value::as_str) {
            Some("start") => Some(GestureTag::Start),
            Some("end") => Some(GestureTag::End),
            _ => None,
        }
    }

    pub fn is_end(&self) -> bool {
        self.tag() == Some(GestureTag::End)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub dx: i32,
    pub dy: i32,
    /// Euclidean length, rounded to two decimals
    pub distance: f64,
}

impl Movement {
    pub fn between(from: &Position, to: &Position) -> Self {
        let distance = from.distance_to(to);
        Self {
            dx: to.x.saturating_sub(from.x),
            dy: to.y.saturating_sub(from.y),
            distance: (distance * 100.0).round() / 100.0,
        }
    }
}

/// A threshold-gated trail delta from the trajectory tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailEvent {
    pub hand_id: HandId,
    pub hand_type: HandType,
    pub position: Position,
    pub movement: Movement,
    pub confidence: f64,
    pub timestamp: f64,
}

impl TrailEvent {
    pub fn new(hand_id: HandId, hand_type: HandType, previous: &Position, position: Position) -> Self {
        Self {
            hand_id,
            hand_type,
            movement: Movement::between(previous, &position),
            position,
            confidence: TRAIL_CONFIDENCE,
            timestamp: now_timestamp(),
        }
    }
}

/// Everything the engine hands to an output sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum EngineEvent {
    #[serde(rename = "gesture_detection")]
    Gesture(GestureEvent),
    #[serde(rename = "trail_change")]
    Trail(TrailEvent),
}

impl EngineEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::Gesture(_) => "gesture_detection",
            EngineEvent::Trail(_) => "trail_change",
        }
    }

    pub fn hand_id(&self) -> &HandId {
        match self {
            EngineEvent::Gesture(event) => &event.hand_id,
            EngineEvent::Trail(event) => &event.hand_id,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            EngineEvent::Gesture(event) => event.timestamp,
            EngineEvent::Trail(event) => event.timestamp,
        }
    }

    pub fn as_gesture(&self) -> Option<&GestureEvent> {
        match self {
            EngineEvent::Gesture(event) => Some(event),
            EngineEvent::Trail(_) => None,
        }
    }

    pub fn is_trail(&self) -> bool {
        matches!(self, EngineEvent::Trail(_))
    }

    /// Human-readable one-liner, also the console output form
    pub fn description(&self) -> String {
        match self {
            EngineEvent::Gesture(event) => format!(
                "[GESTURE_DETECTED] {} {}: {} (confidence {:.1}%)",
                event.hand_type, event.hand_id, event.gesture, event.confidence
            ),
            EngineEvent::Trail(event) => format!(
                "[TRAIL_UPDATE] {} {}: ({}, {}) moved ({}, {}) dist {:.2}",
                event.hand_type,
                event.hand_id,
                event.position.x,
                event.position.y,
                event.movement.dx,
                event.movement.dy,
                event.movement.distance
            ),
        }
    }
}

impl From<GestureEvent> for EngineEvent {
    fn from(event: GestureEvent) -> Self {
        EngineEvent::Gesture(event)
    }
}

impl From<TrailEvent> for EngineEvent {
    fn from(event: TrailEvent) -> Self {
        EngineEvent::Trail(event)
    }
}
