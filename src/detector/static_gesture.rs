//! Confirmation, hold and end-debounce bookkeeping shared by the static
//! (held posture) detectors.

use crate::events::{Details, GestureEvent, GestureTag};
use crate::history::HandStates;
use crate::landmarks::{Hand, HandId, HandType};
use serde_json::json;
use tracing::debug;

/// One frame's posture match from a static detector
#[derive(Debug, Clone)]
pub struct Classification {
    pub gesture: &'static str,
    pub confidence: f64,
    pub details: Details,
}

#[derive(Debug, Clone, Copy)]
pub struct StaticPolicy {
    pub required_frames: u32,
    pub debounce_frames: u32,
    /// Hold updates every this many frames while active; 0 disables them
    pub output_interval: u32,
    /// Drop the confirmation streak on the first non-matching frame
    pub reset_on_mismatch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticPhase {
    Idle,
    Confirming,
    Active,
    Ending,
}

#[derive(Debug, Clone)]
struct Streak {
    gesture: &'static str,
    count: u32,
}

#[derive(Debug, Clone)]
struct ActiveGesture {
    gesture: &'static str,
    confidence: f64,
    frames_held: u32,
}

#[derive(Debug, Clone)]
struct StaticHandState {
    hand_type: HandType,
    streak: Option<Streak>,
    active: Option<ActiveGesture>,
    end_debounce: u32,
    output_counter: u32,
}

impl StaticHandState {
    fn new(hand_type: HandType) -> Self {
        Self {
            hand_type,
            streak: None,
            active: None,
            end_debounce: 0,
            output_counter: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaticLifecycle {
    policy: StaticPolicy,
    hands: HandStates<StaticHandState>,
}

impl StaticLifecycle {
    pub fn new(policy: StaticPolicy) -> Self {
        Self {
            policy,
            hands: HandStates::new(),
        }
    }

    /// Advance one hand by one frame. End events come before start events.
    pub fn observe(&mut self, hand: &Hand, classification: Option<Classification>) -> Vec<GestureEvent> {
        let policy = self.policy;
        let state = self
            .hands
            .get_or_insert_with(&hand.id, || StaticHandState::new(hand.hand_type));
        state.hand_type = hand.hand_type;

        let mut events = Vec::new();
        let matched = classification.as_ref().map(|c| c.gesture);

        if let Some(active) = &state.active {
            if matched == Some(active.gesture) {
                state.end_debounce = 0;
            } else {
                state.end_debounce += 1;
                if state.end_debounce >= policy.debounce_frames {
                    events.push(end_event(&hand.id, state.hand_type, active, "debounce"));
                    *state = StaticHandState::new(hand.hand_type);
                }
            }
        }

        let Some(classification) = classification else {
            if state.active.is_none() && policy.reset_on_mismatch {
                state.streak = None;
            }
            return events;
        };

        let count = match state.streak.as_mut() {
            Some(streak) if streak.gesture == classification.gesture => {
                streak.count += 1;
                streak.count
            }
            _ => {
                state.streak = Some(Streak {
                    gesture: classification.gesture,
                    count: 1,
                });
                1
            }
        };

        match state.active.as_mut() {
            None => {
                if count >= policy.required_frames {
                    debug!(
                        "{} confirmed for {} after {} frames",
                        classification.gesture, hand.id, count
                    );
                    let mut details = classification.details;
                    details.insert("frames_detected".to_string(), json!(count));
                    events.push(
                        GestureEvent::new(
                            hand.id.clone(),
                            hand.hand_type,
                            classification.gesture,
                            classification.confidence,
                            details,
                        )
                        .with_tag(GestureTag::Start),
                    );
                    state.active = Some(ActiveGesture {
                        gesture: classification.gesture,
                        confidence: classification.confidence,
                        frames_held: count,
                    });
                    state.end_debounce = 0;
                    state.output_counter = 0;
                }
            }
            Some(active) if active.gesture == classification.gesture => {
                active.frames_held += 1;
                active.confidence = classification.confidence;

                if policy.output_interval > 0 {
                    state.output_counter += 1;
                    if state.output_counter >= policy.output_interval {
                        state.output_counter = 0;
                        let mut details = classification.details;
                        details.insert("frames_detected".to_string(), json!(active.frames_held));
                        events.push(GestureEvent::new(
                            hand.id.clone(),
                            hand.hand_type,
                            classification.gesture,
                            classification.confidence,
                            details,
                        ));
                    }
                }
            }
            Some(_) => {}
        }

        events
    }

    /// Close an active gesture for a hand that is no longer visible
    pub fn force_end(&mut self, hand_id: &HandId) -> Option<GestureEvent> {
        let state = self.hands.get_mut(hand_id)?;
        let active = state.active.take()?;
        state.end_debounce = 0;
        Some(end_event(hand_id, state.hand_type, &active, "hand_lost"))
    }

    pub fn clear(&mut self, hand_id: Option<&HandId>) {
        match hand_id {
            Some(id) => {
                self.hands.remove(id);
            }
            None => self.hands.clear(),
        }
    }

    pub fn phase(&self, hand_id: &HandId) -> StaticPhase {
        match self.hands.get(hand_id) {
            Some(state) if state.active.is_some() && state.end_debounce > 0 => StaticPhase::Ending,
            Some(state) if state.active.is_some() => StaticPhase::Active,
            Some(state) if state.streak.is_some() => StaticPhase::Confirming,
            _ => StaticPhase::Idle,
        }
    }

    /// Current consecutive-match count
    pub fn streak(&self, hand_id: &HandId) -> u32 {
        self.hands
            .get(hand_id)
            .and_then(|state| state.streak.as_ref())
            .map_or(0, |streak| streak.count)
    }

    pub fn hand_ids(&self) -> Vec<HandId> {
        self.hands.hand_ids().cloned().collect()
    }
}

fn end_event(hand_id: &HandId, hand_type: HandType, active: &ActiveGesture, reason: &str) -> GestureEvent {
    let mut details = Details::new();
    details.insert("frames_held".to_string(), json!(active.frames_held));
    details.insert("reason".to_string(), json!(reason));
    GestureEvent::new(
        hand_id.clone(),
        hand_type,
        active.gesture,
        active.confidence,
        details,
    )
    .with_tag(GestureTag::End)
}
