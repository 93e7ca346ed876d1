//! Pure geometric measurements over a single hand's landmarks.
//!
//! Every threshold is a fraction of the hand's reference length (wrist to
//! middle-finger base) or an absolute angle, so results do not depend on the
//! camera resolution. When the reference length collapses to zero the
//! predicates answer `false` instead of failing.

use crate::config::PostureConfig;
use crate::landmarks::*;
use serde::{Deserialize, Serialize};

/// Integer pixel position, used for palm centers and trail points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        dx.hypot(dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Index through pinky
    pub const LONG: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    pub fn tip(self) -> usize {
        match self {
            Finger::Thumb => THUMB_TIP,
            Finger::Index => INDEX_TIP,
            Finger::Middle => MIDDLE_TIP,
            Finger::Ring => RING_TIP,
            Finger::Pinky => PINKY_TIP,
        }
    }

    /// Middle joint; the thumb's IP joint plays this role
    pub fn pip(self) -> usize {
        match self {
            Finger::Thumb => THUMB_IP,
            Finger::Index => INDEX_PIP,
            Finger::Middle => MIDDLE_PIP,
            Finger::Ring => RING_PIP,
            Finger::Pinky => PINKY_PIP,
        }
    }

    pub fn mcp(self) -> usize {
        match self {
            Finger::Thumb => THUMB_MCP,
            Finger::Index => INDEX_MCP,
            Finger::Middle => MIDDLE_MCP,
            Finger::Ring => RING_MCP,
            Finger::Pinky => PINKY_MCP,
        }
    }
}

/// Palm facing the camera, back of the hand facing it, or undecidable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PalmOrientation {
    Palm,
    Back,
    Uncertain,
}

impl PalmOrientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            PalmOrientation::Palm => "palm",
            PalmOrientation::Back => "back",
            PalmOrientation::Uncertain => "uncertain",
        }
    }
}

/// Planar distance between two landmarks; depth is ignored
pub fn distance(a: &Landmark, b: &Landmark) -> f64 {
    let dx = a.x as f64 - b.x as f64;
    let dy = a.y as f64 - b.y as f64;
    dx.hypot(dy)
}

fn distance_to_position(a: &Landmark, p: &Position) -> f64 {
    let dx = a.x as f64 - p.x as f64;
    let dy = a.y as f64 - p.y as f64;
    dx.hypot(dy)
}

/// Centroid of the wrist and the five finger bases, truncated to pixels
pub fn palm_center(landmarks: &Landmarks) -> Position {
    let (sum_x, sum_y) = PALM_POINTS.iter().fold((0.0, 0.0), |(sx, sy), &i| {
        (sx + landmarks[i].x as f64, sy + landmarks[i].y as f64)
    });
    let n = PALM_POINTS.len() as f64;
    Position::new((sum_x / n) as i32, (sum_y / n) as i32)
}

pub fn reference_length(landmarks: &Landmarks) -> f64 {
    distance(&landmarks[WRIST], &landmarks[MIDDLE_MCP])
}

pub fn is_degenerate(reference: f64) -> bool {
    !(reference > f64::EPSILON)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Thumb-to-pinky fingertip distances from the given palm center
pub fn fingertip_distances(landmarks: &Landmarks, center: &Position) -> [f64; 5] {
    FINGERTIPS.map(|tip| distance_to_position(&landmarks[tip], center))
}

/// Variance of the ten pairwise fingertip distances; large when the hand is spread
pub fn fingertip_variance(landmarks: &Landmarks) -> f64 {
    let mut pairwise = Vec::with_capacity(10);
    for (i, &a) in FINGERTIPS.iter().enumerate() {
        for &b in &FINGERTIPS[i + 1..] {
            pairwise.push(distance(&landmarks[a], &landmarks[b]));
        }
    }
    variance(&pairwise)
}

/// Fingertip height above the wrist in image pixels
pub fn finger_height(landmarks: &Landmarks, finger: Finger) -> f64 {
    landmarks[WRIST].y as f64 - landmarks[finger.tip()].y as f64
}

/// Tip far enough from the wrist and the finger pointing up (tip above PIP above MCP)
pub fn is_finger_extended(landmarks: &Landmarks, finger: Finger, ratio: f64) -> bool {
    let reference = reference_length(landmarks);
    if is_degenerate(reference) {
        return false;
    }

    let tip = &landmarks[finger.tip()];
    let pip = &landmarks[finger.pip()];
    let mcp = &landmarks[finger.mcp()];

    distance(tip, &landmarks[WRIST]) > reference * ratio && tip.y < pip.y && pip.y < mcp.y
}

/// Tip curled back closer to the wrist than its own PIP joint
pub fn is_finger_bent(landmarks: &Landmarks, finger: Finger) -> bool {
    if is_degenerate(reference_length(landmarks)) {
        return false;
    }
    let wrist = &landmarks[WRIST];
    distance(&landmarks[finger.tip()], wrist) < distance(&landmarks[finger.pip()], wrist)
}

/// Angle between the thumb's MCP→TIP vector and vertical, folded into [0, 90]
pub fn thumb_angle(landmarks: &Landmarks) -> f64 {
    let mcp = &landmarks[THUMB_MCP];
    let tip = &landmarks[THUMB_TIP];
    let vx = tip.x as f64 - mcp.x as f64;
    let vy = tip.y as f64 - mcp.y as f64;
    let length = vx.hypot(vy);
    if length == 0.0 {
        return 90.0;
    }

    let angle = (-vy / length).clamp(-1.0, 1.0).acos().to_degrees();
    if angle > 90.0 {
        180.0 - angle
    } else {
        angle
    }
}

pub fn thumb_points_up(landmarks: &Landmarks) -> bool {
    let (tip, ip, mcp) = (&landmarks[THUMB_TIP], &landmarks[THUMB_IP], &landmarks[THUMB_MCP]);
    tip.y < ip.y && ip.y < mcp.y
}

pub fn thumb_points_down(landmarks: &Landmarks) -> bool {
    let (tip, ip, mcp) = (&landmarks[THUMB_TIP], &landmarks[THUMB_IP], &landmarks[THUMB_MCP]);
    tip.y > ip.y && ip.y > mcp.y
}

/// Two fingertips at least `ratio` reference lengths apart
pub fn fingers_spread(landmarks: &Landmarks, a: Finger, b: Finger, ratio: f64) -> bool {
    let reference = reference_length(landmarks);
    if is_degenerate(reference) {
        return false;
    }
    distance(&landmarks[a.tip()], &landmarks[b.tip()]) > reference * ratio
}

pub fn is_thumb_close_to_palm(landmarks: &Landmarks, ratio: f64) -> bool {
    let reference = reference_length(landmarks);
    if is_degenerate(reference) {
        return false;
    }
    let center = palm_center(landmarks);
    distance_to_position(&landmarks[THUMB_TIP], &center) < reference * ratio
}

/// Index through pinky all extended
pub fn is_hand_open(landmarks: &Landmarks, posture: &PostureConfig) -> bool {
    Finger::LONG
        .iter()
        .all(|&finger| is_finger_extended(landmarks, finger, posture.extension_ratio))
}

/// Index through pinky bent and the fingertips gathered around the palm center
pub fn is_hand_closed(landmarks: &Landmarks, posture: &PostureConfig) -> bool {
    let reference = reference_length(landmarks);
    if is_degenerate(reference) {
        return false;
    }
    if !Finger::LONG.iter().all(|&finger| is_finger_bent(landmarks, finger)) {
        return false;
    }

    let distances = fingertip_distances(landmarks, &palm_center(landmarks));
    mean(&distances) / reference < posture.fist_ratio
}

/// Index and middle extended side by side, ring and pinky folded
pub fn is_two_finger_pose(
    landmarks: &Landmarks,
    together_ratio: f64,
    posture: &PostureConfig,
) -> bool {
    let reference = reference_length(landmarks);
    if is_degenerate(reference) {
        return false;
    }

    let extended = is_finger_extended(landmarks, Finger::Index, posture.extension_ratio)
        && is_finger_extended(landmarks, Finger::Middle, posture.extension_ratio);
    let together = distance(&landmarks[INDEX_TIP], &landmarks[MIDDLE_TIP]) < reference * together_ratio;
    let folded = is_finger_bent(landmarks, Finger::Ring) && is_finger_bent(landmarks, Finger::Pinky);

    extended && together && folded
}

/// Which side of the hand faces the camera.
///
/// For a right hand seen palm-on, the thumb tip lies to the right of the pinky
/// tip in image space; for a left hand it lies to the left. The index tip must
/// sit on the thumb's side of the pinky, and the thumb/pinky separation must
/// exceed `orientation_margin_ratio` reference lengths, otherwise the pose is
/// edge-on and reported as `Uncertain`.
pub fn palm_orientation(
    landmarks: &Landmarks,
    hand_type: HandType,
    posture: &PostureConfig,
) -> PalmOrientation {
    let reference = reference_length(landmarks);
    if is_degenerate(reference) {
        return PalmOrientation::Uncertain;
    }

    let pinky_x = landmarks[PINKY_TIP].x as f64;
    let lateral = landmarks[THUMB_TIP].x as f64 - pinky_x;
    let index_side = landmarks[INDEX_TIP].x as f64 - pinky_x;

    if lateral.abs() < reference * posture.orientation_margin_ratio
        || index_side == 0.0
        || index_side.signum() != lateral.signum()
    {
        return PalmOrientation::Uncertain;
    }

    let thumb_on_right = lateral > 0.0;
    match (hand_type, thumb_on_right) {
        (HandType::Right, true) | (HandType::Left, false) => PalmOrientation::Palm,
        _ => PalmOrientation::Back,
    }
}
