use super::static_gesture::StaticPhase;
use super::*;
use crate::config::{FingerCountConfig, HandOpenConfig, PostureConfig};
use crate::events::GestureTag;
use crate::landmarks::Landmarks;
use crate::testing::*;
use crate::trajectory::TrackPhase;

/// Always fails; used to check that one broken detector cannot stall the others
#[derive(Debug, Clone)]
pub struct FailingDetector;

impl GestureDetector for FailingDetector {
    fn name(&self) -> &'static str {
        "Failing"
    }

    fn category(&self) -> DetectorCategory {
        DetectorCategory::Dynamic
    }

    fn detect(&mut self, _hand: &Hand) -> Result<Vec<EngineEvent>, DetectorError> {
        Err(DetectorError::internal("Failing", "synthetic failure"))
    }

    fn display_message(&self, event: &GestureEvent) -> String {
        event.gesture.clone()
    }

    fn clear_detection_history(&mut self, _hand_id: Option<&HandId>) {}

    fn tracked_hands(&self) -> Vec<HandId> {
        Vec::new()
    }
}

fn gestures(events: &[EngineEvent]) -> Vec<&GestureEvent> {
    events.iter().filter_map(EngineEvent::as_gesture).collect()
}

fn feed<D: GestureDetector>(detector: &mut D, hand: &Hand, frames: usize) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    for _ in 0..frames {
        events.extend(detector.detect(hand).unwrap());
    }
    events
}

fn finger_count_one_detector() -> FingerCountDetector {
    FingerCountDetector::new(
        FingerCount::One,
        FingerCountConfig::default(),
        PostureConfig::default(),
        30,
    )
}

#[test]
fn test_static_start_fires_on_exact_required_frame() {
    let mut detector = finger_count_one_detector();
    let pointing = hand("h1", finger_count_one());
    let closed = hand("h1", fist());

    assert!(feed(&mut detector, &pointing, 14).is_empty());
    assert!(feed(&mut detector, &closed, 1).is_empty());
    assert_eq!(detector.lifecycle().streak(&pointing.id), 0);

    assert!(feed(&mut detector, &pointing, 14).is_empty());
    let events = feed(&mut detector, &pointing, 1);
    let started = gestures(&events);
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].gesture, "FingerCountOne");
    assert_eq!(started[0].tag(), Some(GestureTag::Start));
    assert_eq!(started[0].details["frames_detected"], 15);
    assert_eq!(started[0].confidence, 100.0);
}

#[test]
fn test_static_end_is_debounced() {
    let mut detector = finger_count_one_detector();
    let pointing = hand("h1", finger_count_one());
    let closed = hand("h1", fist());

    assert_eq!(feed(&mut detector, &pointing, 15).len(), 1);

    assert!(feed(&mut detector, &closed, 4).is_empty());
    assert_eq!(detector.lifecycle().phase(&pointing.id), StaticPhase::Ending);
    assert!(feed(&mut detector, &pointing, 1).is_empty());
    assert_eq!(detector.lifecycle().phase(&pointing.id), StaticPhase::Active);
    assert!(detector.lifecycle().streak(&pointing.id) > 0);

    let events = feed(&mut detector, &closed, 5);
    let ended = gestures(&events);
    assert_eq!(ended.len(), 1);
    assert!(ended[0].is_end());
    assert_eq!(ended[0].details["reason"], "debounce");
    assert_eq!(detector.lifecycle().phase(&pointing.id), StaticPhase::Idle);
}

#[test]
fn test_static_hold_updates_follow_output_interval() {
    let mut detector = FingerCountDetector::new(
        FingerCount::One,
        FingerCountConfig::default(),
        PostureConfig::default(),
        10,
    );
    let pointing = hand("h1", finger_count_one());

    let events = feed(&mut detector, &pointing, 15 + 20);
    let emitted = gestures(&events);
    assert_eq!(emitted.len(), 3);
    assert_eq!(emitted[0].tag(), Some(GestureTag::Start));
    assert!(emitted[1..].iter().all(|event| event.tag().is_none()));
}

#[test]
fn test_static_force_end_closes_active_gesture() {
    let mut detector = finger_count_one_detector();
    let pointing = hand("h1", finger_count_one());
    feed(&mut detector, &pointing, 15);

    let ended = detector.force_end(&pointing.id).unwrap();
    assert!(ended.is_end());
    assert_eq!(ended.details["reason"], "hand_lost");
    assert!(detector.force_end(&pointing.id).is_none());
}

#[test]
fn test_static_postures_are_mutually_exclusive() {
    let config = GestureEngineConfig::default();
    let postures: [(&str, Landmarks); 7] = [
        ("FingerCountOne", finger_count_one()),
        ("FingerCountTwo", finger_count_two()),
        ("FingerCountThree", finger_count_three()),
        ("ThumbsUp", thumbs_up()),
        ("ThumbsDown", thumbs_down()),
        ("", open_hand()),
        ("", fist()),
    ];

    for (expected, landmarks) in postures {
        let mut matched = Vec::new();
        for detector in Detector::default_roster(&config) {
            let classified = match &detector {
                Detector::FingerCount(d) => d.classify(&landmarks),
                Detector::Thumbs(d) => d.classify(&landmarks),
                _ => None,
            };
            if let Some(classification) = classified {
                matched.push(classification.gesture);
            }
        }

        if expected.is_empty() {
            assert!(matched.is_empty(), "unexpected {:?}", matched);
        } else {
            assert_eq!(matched, vec![expected]);
        }
    }
}

#[test]
fn test_thumbs_down_confidence() {
    let detector = ThumbsDetector::new(ThumbDirection::Down, Default::default(), 30);
    let classification = detector.classify(&thumbs_down()).unwrap();
    assert_eq!(classification.gesture, "ThumbsDown");
    assert_eq!(classification.confidence, 100.0);
    assert!(detector.classify(&thumbs_up()).is_none());
}

#[test]
fn test_degenerate_hand_never_classifies() {
    let config = GestureEngineConfig::default();
    let flat = hand("h1", degenerate_hand());
    for mut detector in Detector::default_roster(&config) {
        assert!(feed(&mut detector, &flat, 20).is_empty(), "{}", detector.name());
    }
}

#[test]
fn test_hand_open_fires_then_cools_down() {
    let config = HandOpenConfig {
        history_length: 2,
        cooldown_frames: 3,
        ..Default::default()
    };
    let mut detector = HandOpenDetector::new(config);
    let closed = hand("h1", fist());
    let open = hand("h1", open_hand());

    assert!(feed(&mut detector, &closed, 1).is_empty());
    let events = feed(&mut detector, &open, 1);
    let opened = gestures(&events);
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].gesture, "HandOpen");
    assert_eq!(opened[0].confidence, 100.0);
    assert!(detector.is_cooling(&open.id));

    // cooldown_frames - 1 quiet frames
    assert!(feed(&mut detector, &closed, 1).is_empty());
    assert!(feed(&mut detector, &open, 1).is_empty());

    assert!(feed(&mut detector, &closed, 1).is_empty());
    assert!(!detector.is_cooling(&open.id));
    assert_eq!(feed(&mut detector, &open, 1).len(), 1);
}

#[test]
fn test_hand_open_ignores_a_steady_hand() {
    let mut detector = HandOpenDetector::new(HandOpenConfig::default());
    assert!(feed(&mut detector, &hand("h1", open_hand()), 30).is_empty());
}

#[test]
fn test_hand_swipe_right_and_left() {
    for (step, direction) in [(10, "right"), (-10, "left")] {
        let mut detector = HandSwipeDetector::new(Default::default(), PostureConfig::default());
        let base = open_hand();
        let mut events = Vec::new();
        for frame in 0..6 {
            let moved = hand("h1", base.translated(step * frame, 0));
            events.extend(detector.detect(&moved).unwrap());
            if frame < 5 {
                assert!(events.is_empty());
            }
        }

        let swiped = gestures(&events);
        assert_eq!(swiped.len(), 1);
        assert_eq!(swiped[0].gesture, "HandSwipe");
        assert_eq!(swiped[0].details["direction"], direction);
        assert_eq!(swiped[0].details["total_distance"], 50.0);
        assert_eq!(swiped[0].confidence, 85.0);
        assert!(detector.is_cooling(&HandId::from("h1")));
    }
}

#[test]
fn test_hand_swipe_needs_open_hand() {
    let mut detector = HandSwipeDetector::new(Default::default(), PostureConfig::default());
    let base = fist();
    for frame in 0..10 {
        let moved = hand("h1", base.translated(10 * frame, 0));
        assert!(detector.detect(&moved).unwrap().is_empty());
    }
}

#[test]
fn test_two_finger_swipe() {
    let mut two_finger = TwoFingerSwipeDetector::new(Default::default(), PostureConfig::default());
    let mut open_swipe = HandSwipeDetector::new(Default::default(), PostureConfig::default());
    let base = two_finger_pose();

    let mut events = Vec::new();
    for frame in 0..6 {
        let moved = hand("h1", base.translated(10 * frame, 0));
        events.extend(two_finger.detect(&moved).unwrap());
        assert!(open_swipe.detect(&moved).unwrap().is_empty());
    }

    let swiped = gestures(&events);
    assert_eq!(swiped.len(), 1);
    assert_eq!(swiped[0].gesture, "TwoFingerSwipe");
    assert_eq!(swiped[0].details["direction"], "right");
    assert_eq!(swiped[0].confidence, 90.0);
    assert_eq!(
        two_finger.display_message(swiped[0]),
        "Right Hand: Two-Finger Swipe Right (50.0%)"
    );
}

#[test]
fn test_two_finger_swipe_rejects_vertical_motion() {
    let mut detector = TwoFingerSwipeDetector::new(Default::default(), PostureConfig::default());
    let base = two_finger_pose();
    for frame in 0..10 {
        let moved = hand("h1", base.translated(3 * frame, -12 * frame));
        assert!(detector.detect(&moved).unwrap().is_empty());
    }
}

#[test]
fn test_hand_flip_palm_to_back() {
    let mut detector = HandFlipDetector::new(Default::default(), PostureConfig::default());
    let palm = left_hand("h1", open_hand());
    let back = left_hand("h1", mirrored(&open_hand()));

    assert!(feed(&mut detector, &palm, 5).is_empty());
    assert!(feed(&mut detector, &back, 2).is_empty());
    let events = feed(&mut detector, &back, 1);

    let flipped = gestures(&events);
    assert_eq!(flipped.len(), 1);
    assert_eq!(flipped[0].gesture, "HandFlip");
    assert_eq!(flipped[0].details["flip_type"], "palm_to_back");
    assert_eq!(flipped[0].confidence, 100.0);
    assert!(detector.is_cooling(&palm.id));
}

#[test]
fn test_hand_flip_ignores_still_hand() {
    let mut detector = HandFlipDetector::new(Default::default(), PostureConfig::default());
    assert!(feed(&mut detector, &left_hand("h1", open_hand()), 30).is_empty());
}

#[test]
fn test_hand_close_round_trip() {
    let mut detector = HandCloseDetector::new(Default::default(), PostureConfig::default());
    let open = hand("h1", open_hand());
    let closed = hand("h1", fist());

    let mut starts = 0;
    let mut ends = 0;
    let mut frame = 0;
    let mut run = |detector: &mut HandCloseDetector, hand: &Hand, count: usize| {
        for _ in 0..count {
            frame += 1;
            for event in detector.detect(hand).unwrap() {
                if let Some(gesture) = event.as_gesture() {
                    match gesture.tag() {
                        Some(GestureTag::Start) => {
                            starts += 1;
                            assert_eq!(frame, 20);
                            assert_eq!(gesture.details["fist_hold_frames"], 10);
                            assert_eq!(gesture.confidence, 80.0);
                        }
                        Some(GestureTag::End) => {
                            ends += 1;
                            assert_eq!(frame, 45);
                            assert_eq!(gesture.details["reason"], "released");
                        }
                        None => panic!("untagged HandClose event"),
                    }
                }
            }
        }
    };

    run(&mut detector, &open, 10);
    run(&mut detector, &closed, 30);
    assert_eq!(detector.tracker().phase(&open.id), TrackPhase::Active);
    assert!(!detector.tracker().trail(&open.id).is_empty());

    run(&mut detector, &open, 4);
    assert_eq!(detector.tracker().phase(&open.id), TrackPhase::Exiting);
    run(&mut detector, &open, 26);

    assert_eq!(starts, 1);
    assert_eq!(ends, 1);
    assert_eq!(detector.tracker().phase(&open.id), TrackPhase::Disarmed);
    assert!(detector.tracker().trail(&open.id).is_empty());
}

#[test]
fn test_hand_close_refire_while_tracking_ends_the_old_trail() {
    let mut detector = HandCloseDetector::new(Default::default(), PostureConfig::default());
    let open = hand("h1", open_hand());
    let closed = hand("h1", fist());

    let mut events = feed(&mut detector, &open, 10);
    events.extend(feed(&mut detector, &closed, 50));
    // Shorter than the exit debounce, so the first trail is still live
    events.extend(feed(&mut detector, &open, 4));
    assert_eq!(detector.tracker().phase(&open.id), TrackPhase::Exiting);
    events.extend(feed(&mut detector, &closed, 20));

    let closes = gestures(&events);
    let tags: Vec<Option<GestureTag>> = closes.iter().map(|event| event.tag()).collect();
    assert_eq!(
        tags,
        vec![Some(GestureTag::Start), Some(GestureTag::End), Some(GestureTag::Start)]
    );
    assert_eq!(closes[1].details["reason"], "rearmed");
    assert!(detector.tracker().is_triggered(&open.id));
}

#[test]
fn test_hand_close_tolerates_brief_jitter() {
    let mut detector = HandCloseDetector::new(Default::default(), PostureConfig::default());
    let open = hand("h1", open_hand());
    let closed = hand("h1", fist());

    feed(&mut detector, &open, 10);
    assert!(feed(&mut detector, &closed, 5).is_empty());
    assert!(feed(&mut detector, &open, 3).is_empty());
    assert!(feed(&mut detector, &closed, 4).is_empty());
    assert_eq!(gestures(&feed(&mut detector, &closed, 1)).len(), 1);
}

#[test]
fn test_hand_close_resets_after_long_jitter() {
    let mut detector = HandCloseDetector::new(Default::default(), PostureConfig::default());
    let open = hand("h1", open_hand());
    let closed = hand("h1", fist());

    feed(&mut detector, &open, 10);
    feed(&mut detector, &closed, 5);
    feed(&mut detector, &open, 4);
    assert!(feed(&mut detector, &closed, 5).is_empty());
    assert!(!detector.is_cooling(&open.id));
}

#[test]
fn test_hand_close_force_end_while_tracking() {
    let mut detector = HandCloseDetector::new(Default::default(), PostureConfig::default());
    let open = hand("h1", open_hand());
    let closed = hand("h1", fist());

    assert!(detector.force_end(&open.id).is_none());
    feed(&mut detector, &open, 10);
    feed(&mut detector, &closed, 12);

    let ended = detector.force_end(&open.id).unwrap();
    assert!(ended.is_end());
    assert_eq!(ended.details["reason"], "hand_lost");
    assert_eq!(detector.tracker().phase(&open.id), TrackPhase::Disarmed);
}

#[test]
fn test_reset_clears_every_state_category() {
    let mut detector = Detector::HandClose(HandCloseDetector::new(
        Default::default(),
        PostureConfig::default(),
    ));
    let open = hand("h1", open_hand());
    let closed = hand("h1", fist());
    feed(&mut detector, &open, 10);
    feed(&mut detector, &closed, 10);
    assert_eq!(detector.tracked_hands(), vec![open.id.clone()]);
    assert_eq!(detector.category(), DetectorCategory::Tracked);

    detector.reset(Some(&open.id));
    assert!(detector.tracked_hands().is_empty());
}

#[test]
fn test_end_events_share_display_wording() {
    let detector = Detector::FingerCount(finger_count_one_detector());
    let pointing = hand("h1", finger_count_one());
    let start = GestureEvent::new(
        pointing.id.clone(),
        pointing.hand_type,
        "FingerCountOne",
        95.0,
        Details::new(),
    );
    assert_eq!(detector.display_message(&start), "Right Hand: Number One");

    let end = start.with_tag(GestureTag::End);
    assert_eq!(detector.display_message(&end), "Right Hand: FingerCountOne ended");
}

#[test]
fn test_default_roster_order() {
    let names: Vec<&str> = Detector::default_roster(&GestureEngineConfig::default())
        .iter()
        .map(|d| d.name())
        .collect();
    assert_eq!(
        names,
        vec![
            "HandOpen",
            "HandClose",
            "HandSwipe",
            "TwoFingerSwipe",
            "HandFlip",
            "FingerCountOne",
            "FingerCountTwo",
            "FingerCountThree",
            "ThumbsUp",
            "ThumbsDown",
        ]
    );
}

#[test]
fn test_failing_detector_reports_error() {
    let mut detector = Detector::Failing(FailingDetector);
    assert!(detector.detect(&hand("h1", open_hand())).is_err());
}
