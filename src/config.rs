use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GestureEngineConfig {
    #[serde(default)]
    pub posture: PostureConfig,
    #[serde(default)]
    pub gestures: GesturesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Shared posture thresholds, as fractions of the reference length
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PostureConfig {
    /// Minimum tip-to-wrist distance for an extended finger
    #[serde(default = "default_extension_ratio")]
    pub extension_ratio: f64,

    /// Maximum thumb-tip-to-palm distance for a tucked thumb
    #[serde(default = "default_thumb_close_ratio")]
    pub thumb_close_ratio: f64,

    /// Maximum mean fingertip-to-palm distance for a fist
    #[serde(default = "default_fist_ratio")]
    pub fist_ratio: f64,

    /// Minimum thumb/pinky lateral separation before palm orientation is decided
    #[serde(default = "default_orientation_margin_ratio")]
    pub orientation_margin_ratio: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GesturesConfig {
    /// Frames between repeated outputs of a held static gesture (0 disables)
    #[serde(default = "default_static_output_interval")]
    pub static_gesture_output_interval: u32,

    #[serde(default)]
    pub hand_open: HandOpenConfig,
    #[serde(default)]
    pub hand_close: HandCloseConfig,
    #[serde(default)]
    pub hand_swipe: SwipeConfig,
    #[serde(default)]
    pub two_finger_swipe: TwoFingerSwipeConfig,
    #[serde(default)]
    pub hand_flip: HandFlipConfig,
    #[serde(default)]
    pub finger_count_one: FingerCountConfig,
    #[serde(default)]
    pub finger_count_two: FingerCountConfig,
    #[serde(default)]
    pub finger_count_three: FingerCountConfig,
    #[serde(default)]
    pub thumbs_up: ThumbsConfig,
    #[serde(default)]
    pub thumbs_down: ThumbsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HandOpenConfig {
    /// Rolling history length in frames
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    /// Minimum fingertip variance increase over the baseline, in percent
    #[serde(default = "default_variance_change_percent")]
    pub variance_change_percent: f64,

    /// Every fingertip must move out past baseline distance times this
    #[serde(default = "default_open_distance_multiplier")]
    pub distance_multiplier: f64,

    #[serde(default = "default_cooldown_frames")]
    pub cooldown_frames: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HandCloseConfig {
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    /// Minimum fingertip variance decrease below the baseline, in percent
    #[serde(default = "default_variance_change_percent")]
    pub variance_change_percent: f64,

    /// Every fingertip must move in below baseline distance times this
    #[serde(default = "default_close_distance_multiplier")]
    pub distance_multiplier: f64,

    /// Frames the fist must be held after the closing transition
    #[serde(default = "default_fist_hold_frames")]
    pub fist_hold_frames: u32,

    /// Consecutive non-fist frames tolerated while holding
    #[serde(default = "default_jitter_tolerance_frames")]
    pub jitter_tolerance_frames: u32,

    #[serde(default = "default_cooldown_frames")]
    pub cooldown_frames: u32,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub smoothing: SmoothingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrackingConfig {
    #[serde(default = "default_true")]
    pub enable_tracking: bool,

    /// Trail capacity; oldest points are evicted
    #[serde(default = "default_max_trail_points")]
    pub max_trail_points: usize,

    /// Inactive frames before the trail is dropped
    #[serde(default = "default_tracking_debounce_frames")]
    pub debounce_frames: u32,

    /// Emit at most one trail update per this many frames
    #[serde(default = "default_output_interval_frames")]
    pub output_interval_frames: u32,

    /// Minimum displacement in pixels since the last emitted position
    #[serde(default = "default_movement_threshold")]
    pub movement_threshold: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SmoothingConfig {
    #[serde(default = "default_true")]
    pub enable_smoothing: bool,

    /// Weight of the newest sample in the exponential filter, in (0, 1]
    #[serde(default = "default_smoothing_weight")]
    pub smoothing_weight: f64,

    /// Raw samples kept to detect a settled position
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SwipeConfig {
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    /// Minimum horizontal travel as a fraction of the reference length
    #[serde(default = "default_min_distance_percent")]
    pub min_distance_percent: f64,

    #[serde(default = "default_min_movement_frames")]
    pub min_movement_frames: usize,

    #[serde(default = "default_cooldown_frames")]
    pub cooldown_frames: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TwoFingerSwipeConfig {
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    #[serde(default = "default_min_distance_percent")]
    pub min_distance_percent: f64,

    #[serde(default = "default_min_movement_frames")]
    pub min_movement_frames: usize,

    /// Maximum index/middle tip separation as a fraction of the reference length
    #[serde(default = "default_finger_distance_threshold")]
    pub finger_distance_threshold: f64,

    #[serde(default = "default_cooldown_frames")]
    pub cooldown_frames: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HandFlipConfig {
    #[serde(default = "default_history_length")]
    pub history_length: usize,

    /// Maximum palm travel during the flip as a fraction of the reference length
    #[serde(default = "default_max_movement_percent")]
    pub max_movement_percent: f64,

    #[serde(default = "default_min_flip_frames")]
    pub min_flip_frames: usize,

    #[serde(default = "default_cooldown_frames")]
    pub cooldown_frames: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FingerCountConfig {
    /// Extension threshold as a fraction of the reference length
    #[serde(default = "default_extension_ratio")]
    pub distance_threshold_percent: f64,

    /// Consecutive matching frames before the gesture starts
    #[serde(default = "default_required_frames")]
    pub required_frames: u32,

    /// Consecutive mismatching frames before an active gesture ends
    #[serde(default = "default_static_debounce_frames")]
    pub debounce_frames: u32,

    /// Drop the confirmation streak on the first mismatching frame
    #[serde(default = "default_true")]
    pub reset_on_mismatch: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ThumbsConfig {
    /// Minimum thumb-tip-to-palm distance as a fraction of the reference length
    #[serde(default = "default_thumb_distance_threshold")]
    pub thumb_distance_threshold: f64,

    /// Maximum distance of the other fingertips to the palm
    #[serde(default = "default_other_fingers_threshold")]
    pub other_fingers_threshold: f64,

    /// Maximum deviation of the thumb from vertical, in degrees
    #[serde(default = "default_thumb_angle_threshold")]
    pub thumb_angle_threshold: f64,

    /// Minimum thumb-tip distance to every other finger's PIP joint
    #[serde(default = "default_thumb_isolation_threshold")]
    pub thumb_isolation_threshold: f64,

    #[serde(default = "default_required_frames")]
    pub required_frames: u32,

    #[serde(default = "default_static_debounce_frames")]
    pub debounce_frames: u32,

    #[serde(default = "default_true")]
    pub reset_on_mismatch: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    /// Pipe-delimited text
    Simple,
    /// Compact single-line JSON
    Json,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// Log every event through the console sink
    #[serde(default = "default_true")]
    pub console_output: bool,

    #[serde(default = "default_console_format")]
    pub console_format: MessageFormat,

    /// Forward events to the TCP consumer
    #[serde(default)]
    pub socket_output: bool,

    #[serde(default = "default_socket_format")]
    pub socket_format: MessageFormat,

    #[serde(default = "default_socket_host")]
    pub host: String,

    #[serde(default = "default_socket_port")]
    pub port: u16,

    /// Pending trail updates kept for the transport worker before dropping
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl GestureEngineConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("output.console_output", default_true())?
            .set_default("output.console_format", "simple")?
            .set_default("output.socket_output", false)?
            .set_default("output.socket_format", "json")?
            .set_default("output.host", default_socket_host())?
            .set_default("output.port", default_socket_port() as i64)?
            .set_default("output.queue_capacity", default_queue_capacity() as i64)?
            .set_default(
                "output.max_reconnect_attempts",
                default_max_reconnect_attempts() as i64,
            )?
            .set_default("output.reconnect_delay_ms", default_reconnect_delay_ms() as i64)?
            .set_default("output.connect_timeout_ms", default_connect_timeout_ms() as i64)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // GESTURE_OUTPUT__PORT=7000 style overrides
            .add_source(
                Environment::with_prefix("GESTURE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: GestureEngineConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Render as TOML, the format `load_from_file` reads
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let posture = &self.posture;
        for (name, value) in [
            ("posture.extension_ratio", posture.extension_ratio),
            ("posture.thumb_close_ratio", posture.thumb_close_ratio),
            ("posture.fist_ratio", posture.fist_ratio),
        ] {
            require_positive(name, value)?;
        }
        if posture.orientation_margin_ratio < 0.0 {
            return Err(ConfigError::Message(
                "posture.orientation_margin_ratio must not be negative".to_string(),
            ));
        }

        let g = &self.gestures;

        require_nonzero("hand_open.history_length", g.hand_open.history_length)?;
        require_positive("hand_open.distance_multiplier", g.hand_open.distance_multiplier)?;

        let close = &g.hand_close;
        require_nonzero("hand_close.history_length", close.history_length)?;
        require_positive("hand_close.distance_multiplier", close.distance_multiplier)?;
        require_nonzero("hand_close.fist_hold_frames", close.fist_hold_frames as usize)?;
        require_nonzero("hand_close.tracking.max_trail_points", close.tracking.max_trail_points)?;
        require_nonzero("hand_close.tracking.debounce_frames", close.tracking.debounce_frames as usize)?;
        require_nonzero(
            "hand_close.tracking.output_interval_frames",
            close.tracking.output_interval_frames as usize,
        )?;
        require_nonzero("hand_close.smoothing.smoothing_window", close.smoothing.smoothing_window)?;
        if !(close.smoothing.smoothing_weight > 0.0 && close.smoothing.smoothing_weight <= 1.0) {
            return Err(ConfigError::Message(
                "hand_close.smoothing.smoothing_weight must be in (0, 1]".to_string(),
            ));
        }

        for (name, history, min_frames, distance) in [
            (
                "hand_swipe",
                g.hand_swipe.history_length,
                g.hand_swipe.min_movement_frames,
                g.hand_swipe.min_distance_percent,
            ),
            (
                "two_finger_swipe",
                g.two_finger_swipe.history_length,
                g.two_finger_swipe.min_movement_frames,
                g.two_finger_swipe.min_distance_percent,
            ),
        ] {
            require_nonzero(&format!("{}.min_movement_frames", name), min_frames)?;
            require_positive(&format!("{}.min_distance_percent", name), distance)?;
            if min_frames > history {
                return Err(ConfigError::Message(format!(
                    "{}.min_movement_frames must not exceed history_length",
                    name
                )));
            }
        }
        require_positive(
            "two_finger_swipe.finger_distance_threshold",
            g.two_finger_swipe.finger_distance_threshold,
        )?;

        require_nonzero("hand_flip.min_flip_frames", g.hand_flip.min_flip_frames)?;
        if g.hand_flip.min_flip_frames > g.hand_flip.history_length {
            return Err(ConfigError::Message(
                "hand_flip.min_flip_frames must not exceed history_length".to_string(),
            ));
        }

        for (name, counts) in [
            ("finger_count_one", &g.finger_count_one),
            ("finger_count_two", &g.finger_count_two),
            ("finger_count_three", &g.finger_count_three),
        ] {
            require_nonzero(&format!("{}.required_frames", name), counts.required_frames as usize)?;
            require_nonzero(&format!("{}.debounce_frames", name), counts.debounce_frames as usize)?;
            require_positive(
                &format!("{}.distance_threshold_percent", name),
                counts.distance_threshold_percent,
            )?;
        }

        for (name, thumbs) in [("thumbs_up", &g.thumbs_up), ("thumbs_down", &g.thumbs_down)] {
            require_nonzero(&format!("{}.required_frames", name), thumbs.required_frames as usize)?;
            require_nonzero(&format!("{}.debounce_frames", name), thumbs.debounce_frames as usize)?;
        }

        if self.output.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "output.queue_capacity must be greater than 0".to_string(),
            ));
        }

        if self.output.socket_output && self.output.port == 0 {
            return Err(ConfigError::Message(
                "output.port must be greater than 0 when socket output is enabled".to_string(),
            ));
        }

        Ok(())
    }
}

fn require_nonzero(name: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Message(format!(
            "{} must be greater than 0",
            name
        )));
    }
    Ok(())
}

fn require_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0) {
        return Err(ConfigError::Message(format!(
            "{} must be greater than 0",
            name
        )));
    }
    Ok(())
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            extension_ratio: default_extension_ratio(),
            thumb_close_ratio: default_thumb_close_ratio(),
            fist_ratio: default_fist_ratio(),
            orientation_margin_ratio: default_orientation_margin_ratio(),
        }
    }
}

impl Default for GesturesConfig {
    fn default() -> Self {
        Self {
            static_gesture_output_interval: default_static_output_interval(),
            hand_open: HandOpenConfig::default(),
            hand_close: HandCloseConfig::default(),
            hand_swipe: SwipeConfig::default(),
            two_finger_swipe: TwoFingerSwipeConfig::default(),
            hand_flip: HandFlipConfig::default(),
            finger_count_one: FingerCountConfig::default(),
            finger_count_two: FingerCountConfig::default(),
            finger_count_three: FingerCountConfig::default(),
            thumbs_up: ThumbsConfig::default(),
            thumbs_down: ThumbsConfig::default(),
        }
    }
}

impl Default for HandOpenConfig {
    fn default() -> Self {
        Self {
            history_length: default_history_length(),
            variance_change_percent: default_variance_change_percent(),
            distance_multiplier: default_open_distance_multiplier(),
            cooldown_frames: default_cooldown_frames(),
        }
    }
}

impl Default for HandCloseConfig {
    fn default() -> Self {
        Self {
            history_length: default_history_length(),
            variance_change_percent: default_variance_change_percent(),
            distance_multiplier: default_close_distance_multiplier(),
            fist_hold_frames: default_fist_hold_frames(),
            jitter_tolerance_frames: default_jitter_tolerance_frames(),
            cooldown_frames: default_cooldown_frames(),
            tracking: TrackingConfig::default(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enable_tracking: true,
            max_trail_points: default_max_trail_points(),
            debounce_frames: default_tracking_debounce_frames(),
            output_interval_frames: default_output_interval_frames(),
            movement_threshold: default_movement_threshold(),
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enable_smoothing: true,
            smoothing_weight: default_smoothing_weight(),
            smoothing_window: default_smoothing_window(),
        }
    }
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            history_length: default_history_length(),
            min_distance_percent: default_min_distance_percent(),
            min_movement_frames: default_min_movement_frames(),
            cooldown_frames: default_cooldown_frames(),
        }
    }
}

impl Default for TwoFingerSwipeConfig {
    fn default() -> Self {
        Self {
            history_length: default_history_length(),
            min_distance_percent: default_min_distance_percent(),
            min_movement_frames: default_min_movement_frames(),
            finger_distance_threshold: default_finger_distance_threshold(),
            cooldown_frames: default_cooldown_frames(),
        }
    }
}

impl Default for HandFlipConfig {
    fn default() -> Self {
        Self {
            history_length: default_history_length(),
            max_movement_percent: default_max_movement_percent(),
            min_flip_frames: default_min_flip_frames(),
            cooldown_frames: default_cooldown_frames(),
        }
    }
}

impl Default for FingerCountConfig {
    fn default() -> Self {
        Self {
            distance_threshold_percent: default_extension_ratio(),
            required_frames: default_required_frames(),
            debounce_frames: default_static_debounce_frames(),
            reset_on_mismatch: true,
        }
    }
}

impl Default for ThumbsConfig {
    fn default() -> Self {
        Self {
            thumb_distance_threshold: default_thumb_distance_threshold(),
            other_fingers_threshold: default_other_fingers_threshold(),
            thumb_angle_threshold: default_thumb_angle_threshold(),
            thumb_isolation_threshold: default_thumb_isolation_threshold(),
            required_frames: default_required_frames(),
            debounce_frames: default_static_debounce_frames(),
            reset_on_mismatch: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            console_output: true,
            console_format: default_console_format(),
            socket_output: false,
            socket_format: default_socket_format(),
            host: default_socket_host(),
            port: default_socket_port(),
            queue_capacity: default_queue_capacity(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_extension_ratio() -> f64 {
    0.6
}
fn default_thumb_close_ratio() -> f64 {
    0.5
}
fn default_fist_ratio() -> f64 {
    0.5
}
fn default_orientation_margin_ratio() -> f64 {
    0.1
}

fn default_static_output_interval() -> u32 {
    30
}
fn default_static_debounce_frames() -> u32 {
    5
}
fn default_required_frames() -> u32 {
    15
}

fn default_history_length() -> usize {
    10
}
fn default_variance_change_percent() -> f64 {
    50.0
}
fn default_open_distance_multiplier() -> f64 {
    1.5
}
fn default_close_distance_multiplier() -> f64 {
    0.7
}
fn default_cooldown_frames() -> u32 {
    30
}
fn default_fist_hold_frames() -> u32 {
    10
}
fn default_jitter_tolerance_frames() -> u32 {
    3
}

fn default_max_trail_points() -> usize {
    64
}
fn default_tracking_debounce_frames() -> u32 {
    5
}
fn default_output_interval_frames() -> u32 {
    3
}
fn default_movement_threshold() -> f64 {
    5.0
}
fn default_smoothing_weight() -> f64 {
    0.3
}
fn default_smoothing_window() -> usize {
    5
}

fn default_min_distance_percent() -> f64 {
    0.5
}
fn default_min_movement_frames() -> usize {
    5
}
fn default_finger_distance_threshold() -> f64 {
    0.3
}
fn default_max_movement_percent() -> f64 {
    0.3
}
fn default_min_flip_frames() -> usize {
    8
}

fn default_thumb_distance_threshold() -> f64 {
    0.6
}
fn default_other_fingers_threshold() -> f64 {
    0.45
}
fn default_thumb_angle_threshold() -> f64 {
    45.0
}
fn default_thumb_isolation_threshold() -> f64 {
    0.5
}

fn default_console_format() -> MessageFormat {
    MessageFormat::Simple
}
fn default_socket_format() -> MessageFormat {
    MessageFormat::Json
}
fn default_socket_host() -> String {
    "127.0.0.1".to_string()
}
fn default_socket_port() -> u16 {
    65432
}
fn default_queue_capacity() -> usize {
    256
}
fn default_max_reconnect_attempts() -> u32 {
    3
}
fn default_reconnect_delay_ms() -> u64 {
    1000
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
