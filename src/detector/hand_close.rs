use super::dynamic::{percent_change, spread_baseline, Cooldown, SpreadSample};
use super::{details, round2, DetectorCategory, GestureDetector};
use crate::config::{HandCloseConfig, PostureConfig};
use crate::error::DetectorError;
use crate::events::{Details, EngineEvent, GestureEvent, GestureTag};
use crate::geometry::{self, Position};
use crate::history::{HandStates, RollingHistory};
use crate::landmarks::{Hand, HandId, HandType};
use crate::trajectory::{TrackPhase, TrajectoryTracker};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::debug;

const NAME: &str = "HandClose";

#[derive(Debug, Clone)]
struct CloseState {
    hand_type: HandType,
    history: RollingHistory<SpreadSample>,
    /// Phase A passed; waiting for the fist to be held
    closing_detected: bool,
    fist_frames: u32,
    jitter_frames: u32,
}

impl CloseState {
    fn new(hand_type: HandType, history_length: usize) -> Self {
        Self {
            hand_type,
            history: RollingHistory::new(history_length),
            closing_detected: false,
            fist_frames: 0,
            jitter_frames: 0,
        }
    }

    fn reset_hold(&mut self) {
        self.closing_detected = false;
        self.fist_frames = 0;
        self.jitter_frames = 0;
    }
}

/// Open hand closing into a held fist. Firing arms a trajectory tracker that
/// follows the palm for as long as the fist is held.
#[derive(Debug, Clone)]
pub struct HandCloseDetector {
    config: HandCloseConfig,
    posture: PostureConfig,
    hands: HandStates<CloseState>,
    cooldown: Cooldown,
    tracker: TrajectoryTracker,
}

impl HandCloseDetector {
    pub fn new(config: HandCloseConfig, posture: PostureConfig) -> Self {
        let cooldown = Cooldown::new(config.cooldown_frames);
        let tracker = TrajectoryTracker::new(config.tracking.clone(), config.smoothing.clone());
        Self {
            config,
            posture,
            hands: HandStates::new(),
            cooldown,
            tracker,
        }
    }

    pub fn tracker(&self) -> &TrajectoryTracker {
        &self.tracker
    }

    pub fn is_cooling(&self, hand_id: &HandId) -> bool {
        self.cooldown.is_cooling(hand_id)
    }

    /// Phase A (closing transition) and phase B (fist hold) for one frame.
    /// A hold completed while the trail is still live ends it first, so
    /// every start is paired with an end.
    fn detect_closing(
        &mut self,
        hand: &Hand,
        center: &Position,
        is_fist: bool,
    ) -> Result<Vec<GestureEvent>, DetectorError> {
        let sample = SpreadSample::measure(NAME, &hand.landmarks, center)?;
        let history_length = self.config.history_length;
        let state = self
            .hands
            .get_or_insert_with(&hand.id, || CloseState::new(hand.hand_type, history_length));
        state.hand_type = hand.hand_type;
        state.history.push(sample);

        let mut variance_decrease = None;
        if !state.closing_detected {
            if !state.history.is_full() || !is_fist {
                return Ok(Vec::new());
            }
            let Some(baseline) = spread_baseline(&state.history) else {
                return Ok(Vec::new());
            };

            let decrease = -percent_change(baseline.variance, sample.variance);
            let drawn_in = sample
                .distances
                .iter()
                .zip(baseline.distances)
                .all(|(current, base)| *current < base * self.config.distance_multiplier);
            if decrease <= self.config.variance_change_percent || !drawn_in {
                return Ok(Vec::new());
            }

            debug!("Closing transition for {} (variance -{:.1}%)", hand.id, decrease);
            state.closing_detected = true;
            state.fist_frames = 1;
            state.jitter_frames = 0;
            variance_decrease = Some(decrease);
        } else if is_fist {
            state.fist_frames += 1;
            state.jitter_frames = 0;
        } else {
            state.jitter_frames += 1;
            if state.jitter_frames > self.config.jitter_tolerance_frames {
                debug!("Fist hold lost for {} after {} frames", hand.id, state.fist_frames);
                state.reset_hold();
            }
            return Ok(Vec::new());
        }

        if state.fist_frames < self.config.fist_hold_frames {
            return Ok(Vec::new());
        }

        let fist_frames = state.fist_frames;
        state.reset_hold();
        state.history.clear();

        let mut events = Vec::new();
        if self.tracker.is_triggered(&hand.id) {
            debug!("Fist hold completed again for {}, restarting trail", hand.id);
            events.push(self.release_event(&hand.id, hand.hand_type, "rearmed"));
            self.tracker.clear_trail(Some(&hand.id));
        }
        self.tracker.trigger(&hand.id);
        self.cooldown.start(&hand.id);

        let mut details = details([
            ("fist_hold_frames", json!(fist_frames)),
            ("required_frames", json!(self.config.fist_hold_frames)),
            ("tracking_active", json!(self.tracker.is_enabled())),
        ]);
        if let Some(decrease) = variance_decrease {
            details.insert("variance_decrease".to_string(), json!(round2(decrease)));
        }

        events.push(
            GestureEvent::new(
                hand.id.clone(),
                hand.hand_type,
                NAME,
                (70.0 + fist_frames as f64).min(100.0),
                details,
            )
            .with_tag(GestureTag::Start),
        );
        Ok(events)
    }

    fn release_event(&self, hand_id: &HandId, hand_type: HandType, reason: &str) -> GestureEvent {
        let mut details = Details::new();
        details.insert("reason".to_string(), json!(reason));
        details.insert("trail_points".to_string(), json!(self.tracker.trail(hand_id).len()));
        GestureEvent::new(hand_id.clone(), hand_type, NAME, 100.0, details).with_tag(GestureTag::End)
    }
}

impl GestureDetector for HandCloseDetector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn category(&self) -> DetectorCategory {
        DetectorCategory::Tracked
    }

    fn detect(&mut self, hand: &Hand) -> Result<Vec<EngineEvent>, DetectorError> {
        let mut events = Vec::new();
        let center = geometry::palm_center(&hand.landmarks);
        let is_fist = geometry::is_hand_closed(&hand.landmarks, &self.posture);

        if !self.cooldown.tick(&hand.id) {
            let closing = self.detect_closing(hand, &center, is_fist)?;
            events.extend(closing.into_iter().map(EngineEvent::from));
        }

        let update = self.tracker.update(&hand.id, hand.hand_type, center, is_fist);
        if let Some(trail) = update.trail {
            events.push(trail.into());
        }
        if update.disarmed {
            events.push(self.release_event(&hand.id, hand.hand_type, "released").into());
        }

        Ok(events)
    }

    fn display_message(&self, event: &GestureEvent) -> String {
        let held = event
            .details
            .get("fist_hold_frames")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        format!("{} Hand: Closing to Fist (Held: {} frames)", event.hand_type, held)
    }

    /// A hand that disappears while its trail is live ends the gesture
    fn force_end(&mut self, hand_id: &HandId) -> Option<GestureEvent> {
        if self.tracker.phase(hand_id) == TrackPhase::Disarmed {
            return None;
        }
        let hand_type = self.hands.get(hand_id)?.hand_type;
        let event = self.release_event(hand_id, hand_type, "hand_lost");
        self.tracker.clear_trail(Some(hand_id));
        Some(event)
    }

    fn clear_detection_history(&mut self, hand_id: Option<&HandId>) {
        match hand_id {
            Some(id) => {
                self.hands.remove(id);
            }
            None => self.hands.clear(),
        }
    }

    fn clear_cooldown(&mut self, hand_id: Option<&HandId>) {
        self.cooldown.clear(hand_id);
    }

    fn clear_trail(&mut self, hand_id: Option<&HandId>) {
        self.tracker.clear_trail(hand_id);
    }

    fn tracked_hands(&self) -> Vec<HandId> {
        let tracked = self.tracker.tracked_hands();
        let ids: BTreeSet<&HandId> = self
            .hands
            .hand_ids()
            .chain(self.cooldown.hand_ids())
            .chain(tracked.iter())
            .collect();
        ids.into_iter().cloned().collect()
    }
}
