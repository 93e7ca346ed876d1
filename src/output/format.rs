use crate::config::MessageFormat;
use crate::events::EngineEvent;

/// Tag field for gesture events that carry no lifecycle tag
const UNTAGGED: &str = "hold";

/// Serialize one event for the wire.
///
/// `Json` is a single compact line carrying every field; `Simple` is the
/// pipe-delimited form `GESTURE|hand_type|hand_id|gesture|confidence|tag` or
/// `TRAIL|hand_id|x|y`.
pub fn format_message(event: &EngineEvent, format: MessageFormat) -> Result<String, serde_json::Error> {
    match format {
        MessageFormat::Json => serde_json::to_string(event),
        MessageFormat::Simple => Ok(simple_message(event)),
    }
}

fn simple_message(event: &EngineEvent) -> String {
    match event {
        EngineEvent::Gesture(gesture) => format!(
            "GESTURE|{}|{}|{}|{:.1}|{}",
            gesture.hand_type,
            gesture.hand_id,
            gesture.gesture,
            gesture.confidence,
            gesture.tag().map_or(UNTAGGED, |tag| tag.as_str()),
        ),
        EngineEvent::Trail(trail) => format!(
            "TRAIL|{}|{}|{}",
            trail.hand_id, trail.position.x, trail.position.y
        ),
    }
}
