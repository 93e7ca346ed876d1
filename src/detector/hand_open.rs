use super::dynamic::{percent_change, spread_baseline, Cooldown, SpreadSample};
use super::{details, round2, DetectorCategory, GestureDetector};
use crate::config::HandOpenConfig;
use crate::error::DetectorError;
use crate::events::{EngineEvent, GestureEvent};
use crate::geometry;
use crate::history::{HandStates, RollingHistory};
use crate::landmarks::{Hand, HandId};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::debug;

const NAME: &str = "HandOpen";

/// Fist spreading out into an open hand
#[derive(Debug, Clone)]
pub struct HandOpenDetector {
    config: HandOpenConfig,
    history: HandStates<RollingHistory<SpreadSample>>,
    cooldown: Cooldown,
}

impl HandOpenDetector {
    pub fn new(config: HandOpenConfig) -> Self {
        let cooldown = Cooldown::new(config.cooldown_frames);
        Self {
            config,
            history: HandStates::new(),
            cooldown,
        }
    }

    pub fn is_cooling(&self, hand_id: &HandId) -> bool {
        self.cooldown.is_cooling(hand_id)
    }
}

impl GestureDetector for HandOpenDetector {
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

        let center = geometry::palm_center(&hand.landmarks);
        let sample = SpreadSample::measure(NAME, &hand.landmarks, &center)?;

        let capacity = self.config.history_length;
        let history = self
            .history
            .get_or_insert_with(&hand.id, || RollingHistory::new(capacity));
        history.push(sample);
        if !history.is_full() {
            return Ok(Vec::new());
        }
        let Some(baseline) = spread_baseline(history) else {
            return Ok(Vec::new());
        };

        let change = percent_change(baseline.variance, sample.variance);
        let spread_out = sample
            .distances
            .iter()
            .zip(baseline.distances)
            .all(|(current, base)| *current > base * self.config.distance_multiplier);

        if change <= self.config.variance_change_percent || !spread_out {
            return Ok(Vec::new());
        }

        debug!("{} detected for {} (variance +{:.1}%)", NAME, hand.id, change);
        history.clear();
        self.cooldown.start(&hand.id);

        let event = GestureEvent::new(
            hand.id.clone(),
            hand.hand_type,
            NAME,
            change.min(100.0),
            details([
                ("variance_change", json!(round2(change))),
                ("baseline_variance", json!(round2(baseline.variance))),
                ("current_variance", json!(round2(sample.variance))),
            ]),
        );
        Ok(vec![event.into()])
    }

    fn display_message(&self, event: &GestureEvent) -> String {
        let change = event
            .details
            .get("variance_change")
            .and_then(|v| v.as_f64())
            .unwrap_or(event.confidence);
        format!("{} Hand: Opening (Var: {:.1}%)", event.hand_type, change)
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
