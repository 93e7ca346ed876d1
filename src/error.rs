use thiserror::Error;

#[derive(Error, Debug)]
pub enum GestureError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Landmark error: {0}")]
    Landmark(#[from] LandmarkError),

    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("System error: {message}")]
    System { message: String },
}

impl GestureError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Upstream landmark records that violate the 21-point contract
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LandmarkError {
    #[error("expected {expected} landmarks, got {actual}")]
    WrongCount { expected: usize, actual: usize },

    #[error("landmark {index} coordinate {value} outside +/-{limit}")]
    OutOfRange { index: usize, value: i32, limit: i32 },
}

/// Failures raised inside a single detector's per-frame logic
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("{detector}: non-finite {metric}")]
    NonFinite {
        detector: &'static str,
        metric: &'static str,
    },

    #[error("{detector}: {details}")]
    Internal {
        detector: &'static str,
        details: String,
    },
}

impl DetectorError {
    pub fn internal<S: Into<String>>(detector: &'static str, details: S) -> Self {
        Self::Internal {
            detector,
            details: details.into(),
        }
    }

    /// Fails with `NonFinite` unless `value` is a real number
    pub fn check_finite(
        detector: &'static str,
        metric: &'static str,
        value: f64,
    ) -> std::result::Result<f64, DetectorError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::NonFinite { detector, metric })
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport is disabled")]
    Disabled,

    #[error("failed to connect to {address}: {details}")]
    ConnectFailed { address: String, details: String },

    #[error("reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GestureError>;
