use super::dynamic::Cooldown;
use super::{details, round2, DetectorCategory, GestureDetector};
use crate::config::{HandFlipConfig, PostureConfig};
use crate::error::DetectorError;
use crate::events::{EngineEvent, GestureEvent};
use crate::geometry::{self, PalmOrientation, Position};
use crate::history::{HandStates, RollingHistory};
use crate::landmarks::{Hand, HandId};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::debug;

const NAME: &str = "HandFlip";

/// Share of window frames that must show an open hand
const OPEN_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipType {
    PalmToBack,
    BackToPalm,
}

impl FlipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlipType::PalmToBack => "palm_to_back",
            FlipType::BackToPalm => "back_to_palm",
        }
    }

    fn short(&self) -> &'static str {
        match self {
            FlipType::PalmToBack => "palm2back",
            FlipType::BackToPalm => "back2palm",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FlipSample {
    center: Position,
    orientation: PalmOrientation,
    open: bool,
}

/// Majority orientation of a segment, None on a tie
fn dominant(segment: &[PalmOrientation]) -> Option<PalmOrientation> {
    let palm = segment.iter().filter(|o| **o == PalmOrientation::Palm).count();
    let back = segment.iter().filter(|o| **o == PalmOrientation::Back).count();
    match palm.cmp(&back) {
        std::cmp::Ordering::Greater => Some(PalmOrientation::Palm),
        std::cmp::Ordering::Less => Some(PalmOrientation::Back),
        std::cmp::Ordering::Equal => None,
    }
}

/// Compare the dominant orientation of the first and last few certain frames
pub fn orientation_flip(orientations: &[PalmOrientation], min_frames: usize) -> Option<FlipType> {
    if orientations.len() < min_frames {
        return None;
    }
    let valid: Vec<PalmOrientation> = orientations
        .iter()
        .copied()
        .filter(|o| *o != PalmOrientation::Uncertain)
        .collect();
    if valid.len() < min_frames / 2 {
        return None;
    }

    let segment = (valid.len() / 3).min(3);
    if segment == 0 {
        return None;
    }
    let start = dominant(&valid[..segment])?;
    let end = dominant(&valid[valid.len() - segment..])?;

    match (start, end) {
        (PalmOrientation::Palm, PalmOrientation::Back) => Some(FlipType::PalmToBack),
        (PalmOrientation::Back, PalmOrientation::Palm) => Some(FlipType::BackToPalm),
        _ => None,
    }
}

/// How cleanly the window moves from one orientation to the other, 0 to 1
pub fn orientation_consistency(orientations: &[PalmOrientation]) -> f64 {
    if orientations.len() < 3 {
        return 1.0;
    }
    let valid: Vec<PalmOrientation> = orientations
        .iter()
        .copied()
        .filter(|o| *o != PalmOrientation::Uncertain)
        .collect();
    if valid.len() < 3 {
        return 0.5;
    }

    let palm = valid.iter().filter(|o| **o == PalmOrientation::Palm).count();
    let back = valid.len() - palm;
    if palm == 0 || back == 0 {
        return 0.3;
    }

    let transition_quality = palm.min(back) as f64 / valid.len() as f64;
    (transition_quality * 0.7 + 0.3).min(1.0)
}

/// Open hand turned over in place
#[derive(Debug, Clone)]
pub struct HandFlipDetector {
    config: HandFlipConfig,
    posture: PostureConfig,
    history: HandStates<RollingHistory<FlipSample>>,
    cooldown: Cooldown,
}

impl HandFlipDetector {
    pub fn new(config: HandFlipConfig, posture: PostureConfig) -> Self {
        let cooldown = Cooldown::new(config.cooldown_frames);
        Self {
            config,
            posture,
            history: HandStates::new(),
            cooldown,
        }
    }

    pub fn is_cooling(&self, hand_id: &HandId) -> bool {
        self.cooldown.is_cooling(hand_id)
    }
}

impl GestureDetector for HandFlipDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn category(&self) -> DetectorCategory {
        DetectorCategory::Dynamic
    }

    fn detect(&mut self, hand: &Hand) -> Result<Vec<EngineEvent>, DetectorError> {
        if self.cooldown.tick(&hand.id) {
            return Ok(Vec::new());
        }

        let reference = geometry::reference_length(&hand.landmarks);
        let sample = FlipSample {
            center: geometry::palm_center(&hand.landmarks),
            orientation: geometry::palm_orientation(&hand.landmarks, hand.hand_type, &self.posture),
            open: geometry::is_hand_open(&hand.landmarks, &self.posture),
        };

        let capacity = self.config.history_length;
        let history = self
            .history
            .get_or_insert_with(&hand.id, || RollingHistory::new(capacity));
        history.push(sample);

        let min_frames = self.config.min_flip_frames;
        if history.len() < min_frames || geometry::is_degenerate(reference) {
            return Ok(Vec::new());
        }

        let open_ratio = history.iter().filter(|s| s.open).count() as f64 / history.len() as f64;
        if open_ratio < OPEN_RATIO {
            return Ok(Vec::new());
        }

        let movement = match (history.oldest(), history.newest()) {
            (Some(first), Some(last)) => first.center.distance_to(&last.center),
            _ => 0.0,
        };
        let movement_ratio = movement / reference;
        if movement_ratio > self.config.max_movement_percent {
            return Ok(Vec::new());
        }

        let orientations: Vec<PalmOrientation> = history.iter().map(|s| s.orientation).collect();
        let Some(flip) = orientation_flip(&orientations, min_frames) else {
            return Ok(Vec::new());
        };
        let frames = history.len();

        let mut confidence: f64 = 75.0 + 15.0;
        if open_ratio >= 0.95 {
            confidence += 10.0;
        } else if open_ratio >= 0.85 {
            confidence += 5.0;
        }
        if movement_ratio < 0.05 {
            confidence += 10.0;
        } else if movement_ratio < 0.10 {
            confidence += 5.0;
        }
        let consistency = orientation_consistency(&orientations);
        if consistency > 0.8 {
            confidence += 10.0;
        } else if consistency > 0.6 {
            confidence += 5.0;
        }

        debug!("{} {} detected for {}", NAME, flip.as_str(), hand.id);
        history.clear();
        self.cooldown.start(&hand.id);

        let event = GestureEvent::new(
            hand.id.clone(),
            hand.hand_type,
            NAME,
            confidence.min(100.0),
            details([
                ("description", json!(flip.short())),
                ("flip_type", json!(flip.as_str())),
                ("flip_description", json!(flip.short())),
                ("movement_distance", json!(round2(movement))),
                ("movement_percent", json!(round2(movement_ratio * 100.0))),
                ("frames_analyzed", json!(frames)),
            ]),
        );
        Ok(vec![event.into()])
    }

    fn display_message(&self, event: &GestureEvent) -> String {
        let flip = event
            .details
            .get("flip_description")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let percent = event
            .details
            .get("movement_percent")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        format!("{} Hand: {} ({:.1}%)", event.hand_type, flip, percent)
    }

    fn clear_detection_history(&mut self, hand_id: Option<&HandId>) {
        match hand_id {
            Some(id) => {
                self.history.remove(id);
            }
            None => self.history.clear(),
        }
    }

    fn clear_cooldown(&mut self, hand_id: Option<&HandId>) {
        self.cooldown.clear(hand_id);
    }

    fn tracked_hands(&self) -> Vec<HandId> {
        let ids: BTreeSet<&HandId> = self.history.hand_ids().chain(self.cooldown.hand_ids()).collect();
        ids.into_iter().cloned().collect()
    }
}
