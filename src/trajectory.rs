//! Smoothed position trails for a hand while an owning gesture holds.
//!
//! A tracker does nothing for a hand until its owning detector calls
//! [`TrajectoryTracker::trigger`]. From then on every frame where the
//! activation predicate holds appends a smoothed palm position to the trail
//! and may emit a [`TrailEvent`]; a run of `debounce_frames` inactive frames
//! drops the trail and disarms the tracker again.

use crate::config::{SmoothingConfig, TrackingConfig};
use crate::events::TrailEvent;
use crate::geometry::Position;
use crate::history::{HandStates, RollingHistory};
use crate::landmarks::{HandId, HandType};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackPhase {
    Disarmed,
    /// Triggered, waiting for the activation predicate
    Armed,
    Active,
    /// Predicate lost, trail kept while the exit debounce runs
    Exiting,
}

/// Result of feeding one frame to the tracker
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrackingUpdate {
    pub trail: Option<TrailEvent>,
    /// The exit debounce completed on this frame
    pub disarmed: bool,
}

#[derive(Debug, Clone)]
struct TrackState {
    triggered: bool,
    active: bool,
    exit_debounce: u32,
    trail: RollingHistory<Position>,
    raw_window: RollingHistory<Position>,
    smoothed: Option<(f64, f64)>,
    last_emitted: Option<Position>,
    frames_since_emit: u32,
}

impl TrackState {
    fn new(tracking: &TrackingConfig, smoothing: &SmoothingConfig) -> Self {
        Self {
            triggered: false,
            active: false,
            exit_debounce: 0,
            trail: RollingHistory::new(tracking.max_trail_points),
            raw_window: RollingHistory::new(smoothing.smoothing_window),
            smoothed: None,
            last_emitted: None,
            frames_since_emit: 0,
        }
    }

    fn reset_smoothing(&mut self) {
        self.smoothed = None;
        self.raw_window.clear();
    }

    fn reset_output(&mut self) {
        self.last_emitted = None;
        self.frames_since_emit = 0;
    }

    /// Exponential filter seeded with the first sample. A window full of
    /// identical raw samples snaps the filter onto that position.
    fn smooth(&mut self, raw: Position, smoothing: &SmoothingConfig) -> Position {
        if !smoothing.enable_smoothing {
            return raw;
        }

        self.raw_window.push(raw);
        let (rx, ry) = (raw.x as f64, raw.y as f64);
        let settled = self.raw_window.is_full() && self.raw_window.iter().all(|p| *p == raw);

        let next = match self.smoothed {
            Some((sx, sy)) if !settled => {
                let w = smoothing.smoothing_weight;
                (sx * (1.0 - w) + rx * w, sy * (1.0 - w) + ry * w)
            }
            _ => (rx, ry),
        };
        self.smoothed = Some(next);
        Position::new(next.0.round() as i32, next.1.round() as i32)
    }
}

#[derive(Debug, Clone)]
pub struct TrajectoryTracker {
    tracking: TrackingConfig,
    smoothing: SmoothingConfig,
    hands: HandStates<TrackState>,
}

impl TrajectoryTracker {
    pub fn new(tracking: TrackingConfig, smoothing: SmoothingConfig) -> Self {
        Self {
            tracking,
            smoothing,
            hands: HandStates::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tracking.enable_tracking
    }

    /// Arm tracking for a hand; any previous trail is discarded
    pub fn trigger(&mut self, hand_id: &HandId) {
        if !self.tracking.enable_tracking {
            return;
        }

        let (tracking, smoothing) = (&self.tracking, &self.smoothing);
        let state = self
            .hands
            .get_or_insert_with(hand_id, || TrackState::new(tracking, smoothing));
        state.triggered = true;
        state.trail.clear();
        debug!("Trajectory tracking armed for {}", hand_id);
    }

    pub fn update(
        &mut self,
        hand_id: &HandId,
        hand_type: HandType,
        position: Position,
        is_active: bool,
    ) -> TrackingUpdate {
        let mut update = TrackingUpdate::default();
        if !self.tracking.enable_tracking {
            return update;
        }

        let Some(state) = self.hands.get_mut(hand_id) else {
            return update;
        };
        if !state.triggered {
            return update;
        }

        if is_active {
            if !state.active {
                state.active = true;
                state.reset_output();
                debug!("Trajectory tracking active for {}", hand_id);
            }
            state.exit_debounce = 0;

            let smoothed = state.smooth(position, &self.smoothing);
            state.trail.push(smoothed);

            match state.last_emitted {
                None => state.last_emitted = Some(smoothed),
                Some(last) => {
                    state.frames_since_emit += 1;
                    if state.frames_since_emit >= self.tracking.output_interval_frames {
                        state.frames_since_emit = 0;
                        if last.distance_to(&smoothed) >= self.tracking.movement_threshold {
                            state.last_emitted = Some(smoothed);
                            update.trail =
                                Some(TrailEvent::new(hand_id.clone(), hand_type, &last, smoothed));
                        }
                    }
                }
            }
        } else if state.active {
            state.exit_debounce += 1;
            if state.exit_debounce >= self.tracking.debounce_frames {
                self.hands.remove(hand_id);
                update.disarmed = true;
                debug!("Trajectory tracking stopped for {}, trail cleared", hand_id);
            }
        }

        update
    }

    pub fn phase(&self, hand_id: &HandId) -> TrackPhase {
        match self.hands.get(hand_id) {
            Some(state) if state.active && state.exit_debounce > 0 => TrackPhase::Exiting,
            Some(state) if state.active => TrackPhase::Active,
            Some(state) if state.triggered => TrackPhase::Armed,
            _ => TrackPhase::Disarmed,
        }
    }

    pub fn is_triggered(&self, hand_id: &HandId) -> bool {
        self.hands.get(hand_id).map_or(false, |state| state.triggered)
    }

    /// Oldest first
    pub fn trail(&self, hand_id: &HandId) -> Vec<Position> {
        self.hands
            .get(hand_id)
            .map(|state| state.trail.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn smoothed_position(&self, hand_id: &HandId) -> Option<Position> {
        self.hands
            .get(hand_id)
            .and_then(|state| state.smoothed)
            .map(|(x, y)| Position::new(x.round() as i32, y.round() as i32))
    }

    pub fn tracked_hands(&self) -> Vec<HandId> {
        self.hands.hand_ids().cloned().collect()
    }

    /// Drop trail, smoothing and arming for one hand, or for all hands
    pub fn clear_trail(&mut self, hand_id: Option<&HandId>) {
        match hand_id {
            Some(id) => {
                self.hands.remove(id);
            }
            None => self.hands.clear(),
        }
    }
}
