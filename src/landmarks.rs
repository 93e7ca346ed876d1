//! Upstream hand records and the validated 21-point landmark set.
//!
//! The landmark producer reports every visible hand once per frame as a
//! [`HandObservation`]. Observations are validated into [`Hand`] values before
//! any detector sees them, so detectors can index landmarks without bounds
//! checks.

use crate::error::LandmarkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

pub const LANDMARK_COUNT: usize = 21;

/// Largest accepted coordinate magnitude in pixels
pub const MAX_COORDINATE: i32 = 1_000_000;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Thumb first, pinky last
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// Wrist plus the five finger-base points
pub const PALM_POINTS: [usize; 6] = [WRIST, THUMB_CMC, INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];

/// Opaque per-frame hand identity assigned by the producer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandId(String);

impl HandId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Index-based identity, the common producer convention
    pub fn from_index(index: usize) -> Self {
        Self(format!("hand_{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HandId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for HandId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandType {
    Left,
    Right,
}

impl HandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandType::Left => "Left",
            HandType::Right => "Right",
        }
    }
}

impl fmt::Display for HandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One landmark in pixel space with a relative depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Landmark {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl From<[i32; 3]> for Landmark {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Exactly 21 landmarks in the fixed wrist/thumb/index/middle/ring/pinky order
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks([Landmark; LANDMARK_COUNT]);

impl Landmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.0
    }

    /// Raw `[x, y, z]` triples, the wire shape of [`HandObservation`]
    pub fn to_triples(&self) -> Vec<[i32; 3]> {
        self.0.iter().map(|p| [p.x, p.y, p.z]).collect()
    }

    /// Copy of this hand shifted by `(dx, dy)` pixels
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        let mut points = self.0;
        for point in points.iter_mut() {
            point.x += dx;
            point.y += dy;
        }
        Self(points)
    }
}

impl Index<usize> for Landmarks {
    type Output = Landmark;

    fn index(&self, index: usize) -> &Landmark {
        &self.0[index]
    }
}

impl TryFrom<&[[i32; 3]]> for Landmarks {
    type Error = LandmarkError;

    fn try_from(raw: &[[i32; 3]]) -> Result<Self, Self::Error> {
        if raw.len() != LANDMARK_COUNT {
            return Err(LandmarkError::WrongCount {
                expected: LANDMARK_COUNT,
                actual: raw.len(),
            });
        }

        let mut points = [Landmark::default(); LANDMARK_COUNT];
        for (index, (slot, triple)) in points.iter_mut().zip(raw).enumerate() {
            if let Some(&value) = triple.iter().find(|v| v.unsigned_abs() > MAX_COORDINATE as u32) {
                return Err(LandmarkError::OutOfRange {
                    index,
                    value,
                    limit: MAX_COORDINATE,
                });
            }
            *slot = Landmark::from(*triple);
        }
        Ok(Self(points))
    }
}

/// A hand as reported by the landmark producer, not yet validated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandObservation {
    pub hand_id: HandId,
    pub hand_type: HandType,
    pub landmarks: Vec<[i32; 3]>,
}

impl HandObservation {
    pub fn new(hand_id: HandId, hand_type: HandType, landmarks: &Landmarks) -> Self {
        Self {
            hand_id,
            hand_type,
            landmarks: landmarks.to_triples(),
        }
    }

    pub fn validate(&self) -> Result<Hand, LandmarkError> {
        Ok(Hand {
            id: self.hand_id.clone(),
            hand_type: self.hand_type,
            landmarks: Landmarks::try_from(self.landmarks.as_slice())?,
        })
    }
}

/// A validated hand, ready for detection
#[derive(Debug, Clone)]
pub struct Hand {
    pub id: HandId,
    pub hand_type: HandType,
    pub landmarks: Landmarks,
}

impl Hand {
    pub fn new(id: HandId, hand_type: HandType, landmarks: Landmarks) -> Self {
        Self {
            id,
            hand_type,
            landmarks,
        }
    }
}

/// One frame of producer output, one JSON object per line on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameInput {
    #[serde(default)]
    pub hands: Vec<HandObservation>,
}

impl FrameInput {
    pub fn parse_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmarks_require_exactly_21_points() {
        let short = vec![[0, 0, 0]; 20];
        assert_eq!(
            Landmarks::try_from(short.as_slice()),
            Err(LandmarkError::WrongCount {
                expected: 21,
                actual: 20
            })
        );

        let raw: Vec<[i32; 3]> = (0..21).map(|i| [i, i * 2, -i]).collect();
        let landmarks = Landmarks::try_from(raw.as_slice()).unwrap();
        assert_eq!(landmarks[PINKY_TIP], Landmark::new(20, 40, -20));
        assert_eq!(landmarks.to_triples(), raw);
    }

    #[test]
    fn test_landmarks_reject_out_of_range_coordinates() {
        let mut raw: Vec<[i32; 3]> = (0..21).map(|i| [i, i, 0]).collect();
        raw[9] = [i32::MAX, 5, 0];
        assert_eq!(
            Landmarks::try_from(raw.as_slice()),
            Err(LandmarkError::OutOfRange {
                index: 9,
                value: i32::MAX,
                limit: MAX_COORDINATE
            })
        );

        raw[9] = [0, 0, i32::MIN];
        assert!(matches!(
            Landmarks::try_from(raw.as_slice()),
            Err(LandmarkError::OutOfRange { index: 9, .. })
        ));

        raw[9] = [MAX_COORDINATE, -MAX_COORDINATE, 0];
        assert!(Landmarks::try_from(raw.as_slice()).is_ok());
    }

    #[test]
    fn test_parse_frame_line() {
        let points: Vec<String> = (0..21).map(|i| format!("[{},{},0]", i, i)).collect();
        let line = format!(
            r#"{{"hands":[{{"hand_id":"hand_0","hand_type":"Right","landmarks":[{}]}}]}}"#,
            points.join(",")
        );

        let frame = FrameInput::parse_line(&line).unwrap();
        assert_eq!(frame.hands.len(), 1);

        let hand = frame.hands[0].validate().unwrap();
        assert_eq!(hand.id, HandId::from_index(0));
        assert_eq!(hand.hand_type, HandType::Right);
        assert_eq!(hand.landmarks[WRIST], Landmark::new(0, 0, 0));
    }

    #[test]
    fn test_empty_frame_line() {
        let frame = FrameInput::parse_line("{}").unwrap();
        assert!(frame.hands.is_empty());
    }

    #[test]
    fn test_translated() {
        let raw: Vec<[i32; 3]> = (0..21).map(|i| [i, i, 0]).collect();
        let landmarks = Landmarks::try_from(raw.as_slice()).unwrap();
        let moved = landmarks.translated(10, -5);
        assert_eq!(moved[WRIST], Landmark::new(10, -5, 0));
        assert_eq!(moved[PINKY_TIP], Landmark::new(30, 15, 0));
    }
}
