pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod geometry;
pub mod history;
pub mod landmarks;
pub mod manager;
pub mod output;
pub mod stats;
pub mod trajectory;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{GestureEngineConfig, MessageFormat, OutputConfig};
pub use detector::{Detector, DetectorCategory, GestureDetector};
pub use error::{DetectorError, GestureError, LandmarkError, Result, TransportError};
pub use events::{EngineEvent, GestureEvent, GestureTag, TrailEvent};
pub use landmarks::{FrameInput, Hand, HandId, HandObservation, HandType, Landmark, Landmarks};
pub use manager::GestureManager;
pub use output::{CapturingSink, ConsoleSink, EventSink, OutputDispatcher, SocketClient, Transport};
pub use stats::EngineStats;
pub use trajectory::{TrackPhase, TrajectoryTracker};
