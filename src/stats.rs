use std::time::Instant;

/// Frames between frame-rate recalculations
pub const FPS_UPDATE_INTERVAL: u64 = 10;

/// Engine throughput counters
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub frames_processed: u64,
    pub hands_observed: u64,
    pub gesture_events: u64,
    pub trail_events: u64,
    pub detector_failures: u64,
    pub malformed_hands: u64,
    pub hands_lost: u64,
    pub current_fps: f64,
    pub average_fps: f64,
    started: Instant,
    window_start: Instant,
    window_frames: u64,
}

impl Default for EngineStats {
    fn default() -> Self {
        let now = Instant::now();
        Self {
            frames_processed: 0,
            hands_observed: 0,
            gesture_events: 0,
            trail_events: 0,
            detector_failures: 0,
            malformed_hands: 0,
            hands_lost: 0,
            current_fps: 0.0,
            average_fps: 0.0,
            started: now,
            window_start: now,
            window_frames: 0,
        }
    }
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&mut self, hands: usize) {
        self.frames_processed += 1;
        self.hands_observed += hands as u64;
        self.window_frames += 1;

        if self.window_frames >= FPS_UPDATE_INTERVAL {
            let elapsed = self.window_start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                self.current_fps = self.window_frames as f64 / elapsed;
            }
            self.window_start = Instant::now();
            self.window_frames = 0;

            let total = self.started.elapsed().as_secs_f64();
            if total > 0.0 {
                self.average_fps = self.frames_processed as f64 / total;
            }
        }
    }

    pub fn record_gesture(&mut self) {
        self.gesture_events += 1;
    }

    pub fn record_trail(&mut self) {
        self.trail_events += 1;
    }

    pub fn record_detector_failure(&mut self) {
        self.detector_failures += 1;
    }

    pub fn record_malformed_hand(&mut self) {
        self.malformed_hands += 1;
    }

    pub fn record_hand_lost(&mut self) {
        self.hands_lost += 1;
    }

    pub fn events_per_frame(&self) -> f64 {
        if self.frames_processed == 0 {
            0.0
        } else {
            (self.gesture_events + self.trail_events) as f64 / self.frames_processed as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
