use super::*;
use crate::config::{FingerCountConfig, HandOpenConfig, PostureConfig, ThumbsConfig};
use crate::detector::tests::FailingDetector;
use crate::detector::{FingerCount, FingerCountDetector, HandOpenDetector, ThumbDirection, ThumbsDetector};
use crate::events::GestureTag;
use crate::landmarks::HandType;
use crate::output::CapturingSink;
use crate::testing::*;

fn default_manager() -> (GestureManager, Arc<CapturingSink>) {
    let sink = Arc::new(CapturingSink::new());
    let manager = GestureManager::from_config(&GestureEngineConfig::default(), sink.clone());
    (manager, sink)
}

fn pointing_detector(required_frames: u32) -> Detector {
    Detector::FingerCount(FingerCountDetector::new(
        FingerCount::One,
        FingerCountConfig {
            required_frames,
            ..Default::default()
        },
        PostureConfig::default(),
        30,
    ))
}

fn thumbs_up_detector(required_frames: u32) -> Detector {
    Detector::Thumbs(ThumbsDetector::new(
        ThumbDirection::Up,
        ThumbsConfig {
            required_frames,
            ..Default::default()
        },
        30,
    ))
}

fn run(manager: &mut GestureManager, frame: &[HandObservation], count: usize) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    for _ in 0..count {
        events.extend(manager.process_frame(frame));
    }
    events
}

fn named<'a>(events: &'a [EngineEvent], gesture: &str) -> Vec<&'a GestureEvent> {
    events
        .iter()
        .filter_map(EngineEvent::as_gesture)
        .filter(|event| event.gesture == gesture)
        .collect()
}

#[test]
fn test_lost_hand_gets_end_event_before_state_is_cleared() {
    let (mut manager, sink) = default_manager();
    let pointing = observation("h1", &finger_count_one());
    let other = observation("h2", &open_hand());

    let events = run(&mut manager, &[pointing.clone(), other.clone()], 15);
    let starts = named(&events, "FingerCountOne");
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].tag(), Some(GestureTag::Start));

    sink.take();
    let events = manager.process_frame(&[other.clone()]);
    let ends = named(&events, "FingerCountOne");
    assert_eq!(ends.len(), 1);
    assert!(ends[0].is_end());
    assert_eq!(ends[0].hand_id, HandId::from("h1"));
    assert_eq!(ends[0].details["reason"], "hand_lost");

    assert_eq!(sink.gestures(), vec![ends[0].clone()]);
    let h1 = HandId::from("h1");
    assert!(manager.detectors().iter().all(|d| !d.tracked_hands().contains(&h1)));
    assert_eq!(manager.stats().hands_lost, 1);

    // A returning hand has to confirm the posture from scratch
    let events = run(&mut manager, &[pointing.clone(), other.clone()], 14);
    assert!(named(&events, "FingerCountOne").is_empty());
    let events = manager.process_frame(&[pointing, other]);
    assert_eq!(named(&events, "FingerCountOne").len(), 1);
}

#[test]
fn test_lost_hand_cooldown_is_cleared() {
    let sink = Arc::new(CapturingSink::new());
    let hand_open = Detector::HandOpen(HandOpenDetector::new(HandOpenConfig {
        history_length: 2,
        ..Default::default()
    }));
    let mut manager = GestureManager::new(vec![hand_open], sink);
    let other = observation("h2", &open_hand());
    let closed = [observation("h1", &fist()), other.clone()];
    let opened = [observation("h1", &open_hand()), other.clone()];

    assert!(manager.process_frame(&closed).is_empty());
    assert_eq!(named(&manager.process_frame(&opened), "HandOpen").len(), 1);

    manager.process_frame(&[other]);
    let h1 = HandId::from("h1");
    match manager.detector("HandOpen") {
        Some(Detector::HandOpen(detector)) => {
            assert!(!detector.is_cooling(&h1));
            assert!(!detector.tracked_hands().contains(&h1));
        }
        other => panic!("unexpected detector: {:?}", other),
    }

    // Back well inside the old 30-frame cooldown
    assert!(manager.process_frame(&closed).is_empty());
    assert_eq!(named(&manager.process_frame(&opened), "HandOpen").len(), 1);
}

#[test]
fn test_all_hands_lost_closes_everything_and_resets() {
    let (mut manager, sink) = default_manager();
    let frame = [observation("h1", &thumbs_up()), observation("h2", &finger_count_two())];

    let events = run(&mut manager, &frame, 15);
    assert_eq!(named(&events, "ThumbsUp").len(), 1);
    assert_eq!(named(&events, "FingerCountTwo").len(), 1);

    sink.take();
    let events = manager.process_frame(&[]);
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .filter_map(EngineEvent::as_gesture)
        .all(|event| event.is_end() && event.details["reason"] == "hand_lost"));
    assert_eq!(sink.len(), 2);

    assert!(manager.detectors().iter().all(|d| d.tracked_hands().is_empty()));
    assert_eq!(manager.visible_hands().count(), 0);
    assert_eq!(manager.stats().hands_lost, 2);

    // Empty frames after that are quiet
    assert!(manager.process_frame(&[]).is_empty());
    assert_eq!(manager.stats().hands_lost, 2);
}

#[test]
fn test_failing_detector_does_not_stop_the_others() {
    let sink = Arc::new(CapturingSink::new());
    let mut manager = GestureManager::new(
        vec![Detector::Failing(FailingDetector), pointing_detector(15)],
        sink.clone(),
    );

    let events = run(&mut manager, &[observation("h1", &finger_count_one())], 15);
    assert_eq!(named(&events, "FingerCountOne").len(), 1);
    assert_eq!(sink.gestures().len(), 1);
    assert_eq!(manager.stats().detector_failures, 15);
}

#[test]
fn test_malformed_hand_is_skipped_not_the_frame() {
    let (mut manager, _sink) = default_manager();
    let broken = HandObservation {
        hand_id: HandId::from("h9"),
        hand_type: HandType::Left,
        landmarks: vec![[0, 0, 0]; 20],
    };
    let pointing = observation("h1", &finger_count_one());

    let events = run(&mut manager, &[broken, pointing], 15);
    assert_eq!(named(&events, "FingerCountOne").len(), 1);
    assert!(events.iter().all(|event| event.hand_id() == &HandId::from("h1")));

    let stats = manager.stats();
    assert_eq!(stats.malformed_hands, 15);
    assert_eq!(stats.hands_observed, 30);
    assert_eq!(stats.hands_lost, 0);
    assert!(manager.visible_hands().any(|id| id == &HandId::from("h9")));
}

#[test]
fn test_extreme_coordinates_skip_the_hand_only() {
    let (mut manager, _sink) = default_manager();
    let mut extreme = observation("h9", &open_hand());
    extreme.landmarks[0] = [i32::MIN, i32::MIN, 0];
    extreme.landmarks[9] = [i32::MAX, i32::MAX, 0];
    let pointing = observation("h1", &finger_count_one());

    let events = run(&mut manager, &[extreme, pointing], 15);
    assert_eq!(named(&events, "FingerCountOne").len(), 1);
    assert!(events.iter().all(|event| event.hand_id() == &HandId::from("h1")));
    assert_eq!(manager.stats().malformed_hands, 15);
    assert_eq!(manager.stats().detector_failures, 0);
}

#[test]
fn test_end_is_emitted_before_start_in_the_same_frame() {
    let sink = Arc::new(CapturingSink::new());
    let mut manager = GestureManager::new(vec![pointing_detector(5), thumbs_up_detector(3)], sink.clone());

    let events = run(&mut manager, &[observation("h1", &thumbs_up())], 3);
    assert_eq!(named(&events, "ThumbsUp").len(), 1);

    let pointing = [observation("h1", &finger_count_one())];
    assert!(run(&mut manager, &pointing, 4).is_empty());

    sink.take();
    let events = manager.process_frame(&pointing);
    let order: Vec<(&str, Option<GestureTag>)> = events
        .iter()
        .filter_map(EngineEvent::as_gesture)
        .map(|event| (event.gesture.as_str(), event.tag()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("ThumbsUp", Some(GestureTag::End)),
            ("FingerCountOne", Some(GestureTag::Start)),
        ]
    );
    assert_eq!(sink.events(), events);
}

#[test]
fn test_hand_close_round_trip_through_manager() {
    let (mut manager, sink) = default_manager();
    let mut events = run(&mut manager, &[observation("h1", &open_hand())], 10);
    // The fist drifts right while held, then opens where it stopped
    for step in 0..30 {
        let closed = fist().translated(3 * step, 0);
        events.extend(manager.process_frame(&[observation("h1", &closed)]));
    }
    let reopened = open_hand().translated(90, 0);
    events.extend(run(&mut manager, &[observation("h1", &reopened)], 30));

    let closes = named(&events, "HandClose");
    assert_eq!(closes.len(), 2);
    assert_eq!(closes[0].tag(), Some(GestureTag::Start));
    assert_eq!(closes[1].tag(), Some(GestureTag::End));
    assert_eq!(closes[1].details["reason"], "released");

    let trails = events.iter().filter(|event| event.is_trail()).count();
    assert!(trails > 0);
    assert_eq!(manager.stats().trail_events, trails as u64);
    assert_eq!(sink.len(), events.len());

    match manager.detector("HandClose") {
        Some(Detector::HandClose(detector)) => {
            assert!(detector.tracker().trail(&HandId::from("h1")).is_empty());
        }
        other => panic!("unexpected detector: {:?}", other),
    }
}

#[test]
fn test_roster_management() {
    let (mut manager, _sink) = default_manager();
    assert_eq!(manager.detectors().len(), 10);

    assert_eq!(manager.remove_detector("ThumbsUp"), 1);
    assert!(manager.detector("ThumbsUp").is_none());
    assert_eq!(manager.remove_detector("ThumbsUp"), 0);

    manager.add_detector(thumbs_up_detector(15));
    assert_eq!(manager.detectors().len(), 10);
    assert_eq!(manager.detectors().last().map(|d| d.name()), Some("ThumbsUp"));
}

#[test]
fn test_display_message_uses_the_producing_detector() {
    let (manager, _sink) = default_manager();
    let event = GestureEvent::new(
        HandId::from("h1"),
        HandType::Right,
        "FingerCountOne",
        95.0,
        Default::default(),
    )
    .with_tag(GestureTag::Start);

    assert_eq!(
        manager.display_message_for(&event).as_deref(),
        Some("Right Hand: Number One")
    );

    let unknown = GestureEvent::new(HandId::from("h1"), HandType::Right, "Wave", 90.0, Default::default());
    assert!(manager.display_message_for(&unknown).is_none());
}

#[test]
fn test_reset_stats() {
    let (mut manager, _sink) = default_manager();
    run(&mut manager, &[observation("h1", &open_hand())], 3);
    assert_eq!(manager.stats().frames_processed, 3);

    manager.reset_stats();
    assert_eq!(manager.stats().frames_processed, 0);
}
