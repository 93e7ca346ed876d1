//! Synthetic hands shared by the unit tests.
//!
//! Every posture shares the same wrist and finger bases, so the reference
//! length is 100 px and the palm center is (302, 331).

use crate::landmarks::{Hand, HandId, HandObservation, HandType, Landmark, Landmarks};

type Joint = (i32, i32);

const WRIST: Joint = (300, 400);
const THUMB_CMC: Joint = (260, 380);
const INDEX_MCP: Joint = (270, 300);
const MIDDLE_MCP: Joint = (300, 300);
const RING_MCP: Joint = (330, 300);
const PINKY_MCP: Joint = (355, 310);

// PIP, DIP, TIP (thumb: MCP, IP, TIP)
const INDEX_EXTENDED: [Joint; 3] = [(265, 250), (262, 225), (260, 200)];
const INDEX_BESIDE_MIDDLE: [Joint; 3] = [(280, 250), (284, 225), (288, 200)];
const MIDDLE_EXTENDED: [Joint; 3] = [(300, 240), (300, 210), (300, 180)];
const RING_EXTENDED: [Joint; 3] = [(333, 250), (335, 225), (337, 200)];
const PINKY_EXTENDED: [Joint; 3] = [(362, 270), (366, 250), (370, 230)];

const INDEX_CURLED: [Joint; 3] = [(268, 265), (272, 295), (275, 320)];
const MIDDLE_CURLED: [Joint; 3] = [(300, 260), (300, 290), (300, 315)];
const RING_CURLED: [Joint; 3] = [(330, 265), (328, 295), (325, 320)];
const PINKY_CURLED: [Joint; 3] = [(352, 280), (348, 305), (340, 322)];

const THUMB_OPEN: [Joint; 3] = [(235, 355), (220, 330), (210, 305)];
const THUMB_TUCKED: [Joint; 3] = [(250, 360), (270, 345), (290, 340)];
const THUMB_UP: [Joint; 3] = [(255, 300), (250, 250), (245, 200)];
const THUMB_DOWN: [Joint; 3] = [(255, 360), (250, 410), (245, 460)];

fn build(
    thumb: [Joint; 3],
    index: [Joint; 3],
    middle: [Joint; 3],
    ring: [Joint; 3],
    pinky: [Joint; 3],
) -> Landmarks {
    let mut joints = vec![WRIST, THUMB_CMC];
    joints.extend_from_slice(&thumb);
    for (base, finger) in [(INDEX_MCP, index), (MIDDLE_MCP, middle), (RING_MCP, ring), (PINKY_MCP, pinky)] {
        joints.push(base);
        joints.extend_from_slice(&finger);
    }

    let raw: Vec<[i32; 3]> = joints.into_iter().map(|(x, y)| [x, y, 0]).collect();
    Landmarks::try_from(raw.as_slice()).unwrap()
}

pub fn open_hand() -> Landmarks {
    build(THUMB_OPEN, INDEX_EXTENDED, MIDDLE_EXTENDED, RING_EXTENDED, PINKY_EXTENDED)
}

pub fn fist() -> Landmarks {
    build(THUMB_TUCKED, INDEX_CURLED, MIDDLE_CURLED, RING_CURLED, PINKY_CURLED)
}

pub fn finger_count_one() -> Landmarks {
    build(THUMB_TUCKED, INDEX_EXTENDED, MIDDLE_CURLED, RING_CURLED, PINKY_CURLED)
}

pub fn finger_count_two() -> Landmarks {
    build(THUMB_TUCKED, INDEX_EXTENDED, MIDDLE_EXTENDED, RING_CURLED, PINKY_CURLED)
}

pub fn finger_count_three() -> Landmarks {
    build(THUMB_TUCKED, INDEX_EXTENDED, MIDDLE_EXTENDED, RING_EXTENDED, PINKY_CURLED)
}

pub fn thumbs_up() -> Landmarks {
    build(THUMB_UP, INDEX_CURLED, MIDDLE_CURLED, RING_CURLED, PINKY_CURLED)
}

pub fn thumbs_down() -> Landmarks {
    build(THUMB_DOWN, INDEX_CURLED, MIDDLE_CURLED, RING_CURLED, PINKY_CURLED)
}

pub fn two_finger_pose() -> Landmarks {
    build(THUMB_TUCKED, INDEX_BESIDE_MIDDLE, MIDDLE_EXTENDED, RING_CURLED, PINKY_CURLED)
}

/// Every landmark on one pixel
pub fn degenerate_hand() -> Landmarks {
    Landmarks::new([Landmark::new(300, 300, 0); 21])
}

/// Mirror image around x = 300, which turns the palm side into the back side
pub fn mirrored(landmarks: &Landmarks) -> Landmarks {
    let raw: Vec<[i32; 3]> = landmarks
        .points()
        .iter()
        .map(|p| [600 - p.x, p.y, p.z])
        .collect();
    Landmarks::try_from(raw.as_slice()).unwrap()
}

pub fn hand(id: &str, landmarks: Landmarks) -> Hand {
    Hand::new(HandId::from(id), HandType::Right, landmarks)
}

pub fn left_hand(id: &str, landmarks: Landmarks) -> Hand {
    Hand::new(HandId::from(id), HandType::Left, landmarks)
}

pub fn observation(id: &str, landmarks: &Landmarks) -> HandObservation {
    HandObservation::new(HandId::from(id), HandType::Right, landmarks)
}
