//! Frame router and hand lifecycle.
//!
//! The manager owns the detector roster and the output sink. Each frame it
//! validates the visible hands, closes gestures on hands that disappeared
//! since the previous frame, then feeds every remaining hand through every
//! detector. A failing detector is logged and skipped for that hand only.

use crate::config::GestureEngineConfig;
use crate::detector::{Detector, GestureDetector};
use crate::events::{EngineEvent, GestureEvent};
use crate::landmarks::{Hand, HandId, HandObservation};
use crate::output::EventSink;
use crate::stats::EngineStats;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

pub struct GestureManager {
    detectors: Vec<Detector>,
    sink: Arc<dyn EventSink>,
    visible: BTreeSet<HandId>,
    stats: EngineStats,
}

impl GestureManager {
    pub fn new(detectors: Vec<Detector>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            detectors,
            sink,
            visible: BTreeSet::new(),
            stats: EngineStats::new(),
        }
    }

    /// Manager running the default roster
    pub fn from_config(config: &GestureEngineConfig, sink: Arc<dyn EventSink>) -> Self {
        let detectors = Detector::default_roster(config);
        info!("Gesture manager started with {} detectors", detectors.len());
        Self::new(detectors, sink)
    }

    pub fn add_detector(&mut self, detector: Detector) {
        debug!("Adding detector {}", detector.name());
        self.detectors.push(detector);
    }

    /// Remove every detector with this name; returns how many were removed
    pub fn remove_detector(&mut self, name: &str) -> usize {
        let before = self.detectors.len();
        self.detectors.retain(|detector| detector.name() != name);
        before - self.detectors.len()
    }

    pub fn detector(&self, name: &str) -> Option<&Detector> {
        self.detectors.iter().find(|detector| detector.name() == name)
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Hands seen in the last processed frame
    pub fn visible_hands(&self) -> impl Iterator<Item = &HandId> {
        self.visible.iter()
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Display line for an event, worded by the detector that produced it
    pub fn display_message_for(&self, event: &GestureEvent) -> Option<String> {
        self.detector(&event.gesture)
            .map(|detector| detector.display_message(event))
    }

    /// Route one frame. Every returned event has already been emitted to the
    /// sink, forced end events for lost hands first.
    pub fn process_frame(&mut self, observations: &[HandObservation]) -> Vec<EngineEvent> {
        self.stats.record_frame(observations.len());

        let mut hands = Vec::with_capacity(observations.len());
        let mut current = BTreeSet::new();
        for observation in observations {
            // A malformed record still counts as present so its gestures stay open
            current.insert(observation.hand_id.clone());
            match observation.validate() {
                Ok(hand) => hands.push(hand),
                Err(err) => {
                    warn!("Skipping hand {}: {}", observation.hand_id, err);
                    self.stats.record_malformed_hand();
                }
            }
        }

        let mut events = Vec::new();
        if current.is_empty() && !self.visible.is_empty() {
            events.extend(self.on_all_hands_lost());
        } else {
            let lost: Vec<HandId> = self.visible.difference(&current).cloned().collect();
            for hand_id in &lost {
                events.extend(self.on_hand_lost(hand_id));
            }
        }
        self.visible = current;

        for hand in &hands {
            let hand_events = self.detect_hand(hand);
            for event in &hand_events {
                self.record(event);
            }
            events.extend(hand_events);
        }

        events
    }

    /// Close whatever is still open on a hand that left the frame, then drop
    /// all of its per-hand state in every detector
    pub fn on_hand_lost(&mut self, hand_id: &HandId) -> Vec<EngineEvent> {
        info!("Hand {} lost", hand_id);
        self.stats.record_hand_lost();

        let mut ended = Vec::new();
        for detector in &mut self.detectors {
            if let Some(end) = detector.force_end(hand_id) {
                ended.push(EngineEvent::from(end));
            }
        }
        for event in &ended {
            self.record(event);
        }

        for detector in &mut self.detectors {
            detector.reset(Some(hand_id));
        }
        ended
    }

    /// Close every open gesture on every tracked hand, then reset all
    /// detector state
    pub fn on_all_hands_lost(&mut self) -> Vec<EngineEvent> {
        info!("All hands lost");
        for _ in &self.visible {
            self.stats.record_hand_lost();
        }

        let mut tracked = BTreeSet::new();
        for detector in &self.detectors {
            tracked.extend(detector.tracked_hands());
        }
        tracked.extend(self.visible.iter().cloned());

        let mut ended = Vec::new();
        for hand_id in &tracked {
            for detector in &mut self.detectors {
                if let Some(end) = detector.force_end(hand_id) {
                    ended.push(EngineEvent::from(end));
                }
            }
        }
        for event in &ended {
            self.record(event);
        }

        for detector in &mut self.detectors {
            detector.reset(None);
        }
        ended
    }

    fn detect_hand(&mut self, hand: &Hand) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        for detector in &mut self.detectors {
            match detector.detect(hand) {
                Ok(found) => events.extend(found),
                Err(err) => {
                    warn!("Detector {} failed on hand {}: {}", detector.name(), hand.id, err);
                    self.stats.record_detector_failure();
                }
            }
        }

        // Ends before starts, otherwise in roster order
        events.sort_by_key(|event| !event.as_gesture().is_some_and(GestureEvent::is_end));
        events
    }

    fn record(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::Gesture(gesture) => {
                self.stats.record_gesture();
                if let Some(message) = self.display_message_for(gesture) {
                    debug!("{}", message);
                }
            }
            EngineEvent::Trail(_) => self.stats.record_trail(),
        }
        self.sink.emit(event);
    }
}
