//! End-to-end scenarios over synthetic sessions

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::config::EngineConfig;
use crate::engine::BehaviorEngine;
use crate::landmarks::{LandmarkFrame, LandmarkTopology};
use crate::synthetic::{Scenario, SyntheticFace};
use crate::types::{Alert, Metrics};

fn render(face: SyntheticFace) -> LandmarkFrame {
    face.render(&LandmarkTopology::default())
}

fn run(engine: &mut BehaviorEngine, faces: impl IntoIterator<Item = SyntheticFace>) -> Vec<Metrics> {
    faces
        .into_iter()
        .map(|face| engine.process_landmarks(&render(face)))
        .collect()
}

fn assert_in_range(m: &Metrics) {
    for (name, value) in [
        ("eye_contact_pct", m.eye_contact_pct),
        ("head_stability_pct", m.head_stability_pct),
        ("nervousness", m.nervousness),
        ("confidence", m.confidence),
        ("session_eye_contact_pct", m.session_eye_contact_pct),
    ] {
        assert!(
            value.is_finite() && (0.0..=100.0).contains(&value),
            "{name} out of range: {value}"
        );
    }
    assert!(m.blink_rate.is_finite() && m.blink_rate >= 0.0);
    assert!(m.head_yaw_deg.is_finite());
    assert!(m.head_pitch_deg.is_finite());
}

#[test]
fn test_centered_session_converges_to_full_confidence() {
    let mut engine = BehaviorEngine::new();
    let metrics = run(&mut engine, std::iter::repeat(SyntheticFace::default()).take(120));

    for m in &metrics[90..] {
        assert!((m.confidence - 100.0).abs() < 1e-6, "confidence {}", m.confidence);
        assert!((m.head_stability_pct - 100.0).abs() < 1e-6);
        assert_eq!(m.nervousness, 0.0);
        assert_eq!(m.eye_contact_pct, 100.0);
        assert_eq!(m.alert, None);
    }
}

#[test]
fn test_looking_away_drops_eye_contact_and_alerts() {
    let mut engine = BehaviorEngine::new();
    let metrics = run(
        &mut engine,
        (0..120).map(|i| Scenario::LookingAway.face(i)),
    );

    let last = metrics.last().unwrap();
    assert_eq!(last.eye_contact_pct, 0.0);
    assert_eq!(last.alert, Some(Alert::LookAtCamera));
    // The first couple of frames still read as contact while the EMA warms up
    assert!(last.session_eye_contact_pct > 0.0);
    assert!(last.session_eye_contact_pct < 5.0);
}

#[test]
fn test_single_blink_counts_once() {
    for closed_frames in [1, 2, 3] {
        let mut engine = BehaviorEngine::new();
        let faces = (0..60).map(|i| {
            if (30..30 + closed_frames).contains(&i) {
                SyntheticFace::default().with_eye_openness(0.05)
            } else {
                SyntheticFace::default()
            }
        });
        let last = run(&mut engine, faces).pop().unwrap();
        assert_eq!(last.blink_count, 1, "closed for {closed_frames} frames");
        // Blink rate counts closed frames over the 10 s window
        assert_eq!(last.blink_rate, closed_frames as f64 * 6.0);
    }
}

fn nods_at(onsets: &[usize], frames: usize) -> impl Iterator<Item = SyntheticFace> + '_ {
    (0..frames).map(move |i| {
        if onsets.iter().any(|&o| (o..o + 3).contains(&i)) {
            SyntheticFace::default().with_pitch(0.5)
        } else {
            SyntheticFace::default()
        }
    })
}

#[test]
fn test_close_nods_merge() {
    for gap in [5, 10] {
        let mut engine = BehaviorEngine::new();
        let onsets = [60, 60 + gap];
        let last = run(&mut engine, nods_at(&onsets, 150)).pop().unwrap();
        assert_eq!(last.nod_count, 1, "nods {gap} frames apart");
        assert_eq!(last.shake_count, 0);
    }
}

#[test]
fn test_spaced_nods_count_separately() {
    for gap in [20, 25, 40] {
        let mut engine = BehaviorEngine::new();
        let onsets = [60, 60 + gap];
        let last = run(&mut engine, nods_at(&onsets, 150)).pop().unwrap();
        assert_eq!(last.nod_count, 2, "nods {gap} frames apart");
    }
}

#[test]
fn test_nod_still_moving_when_cooldown_expires_counts_again() {
    // Onsets 19 frames apart: the second nod is still rising on the frame the
    // 20-frame cooldown runs out, so it fires
    let mut engine = BehaviorEngine::new();
    let last = run(&mut engine, nods_at(&[60, 79], 150)).pop().unwrap();
    assert_eq!(last.nod_count, 2);
}

#[test]
fn test_shake_detected_from_yaw_swing() {
    let mut engine = BehaviorEngine::new();
    let faces = (0..100).map(|i| {
        if (50..53).contains(&i) {
            SyntheticFace::default().with_yaw(0.5)
        } else {
            SyntheticFace::default()
        }
    });
    let last = run(&mut engine, faces).pop().unwrap();
    assert_eq!(last.shake_count, 1);
    assert_eq!(last.nod_count, 0);
}

#[test]
fn test_session_eye_contact_is_exact_ratio() {
    let mut engine = BehaviorEngine::new();
    let mut with_contact = 0u64;
    let mut last = Metrics::default();

    // Gaze bouncing in and out of contact
    for i in 0..200u64 {
        let gaze = if (i / 20) % 2 == 0 { 0.0 } else { 0.6 };
        last = engine.process_landmarks(&render(SyntheticFace::default().with_gaze_deviation(gaze)));
        if engine.state().gaze_smoothed() < 0.18 {
            with_contact += 1;
        }
        assert_eq!(
            last.session_eye_contact_pct,
            with_contact as f64 / (i + 1) as f64 * 100.0
        );
    }

    assert_eq!(last.frames_processed, 200);
    assert_eq!(engine.state().session().frames_with_eye_contact(), with_contact);
}

#[test]
fn test_session_counters_ignore_skipped_frames() {
    let mut engine = BehaviorEngine::new();
    run(&mut engine, std::iter::repeat(SyntheticFace::default()).take(10));
    for _ in 0..5 {
        engine.process_frame(None);
    }
    let truncated = LandmarkFrame::from_flat(&[0.5; 300]);
    engine.process_frame(Some(&truncated));

    assert_eq!(engine.state().session().frames_processed(), 10);
    assert_eq!(engine.last_metrics().frames_processed, 10);
}

#[test]
fn test_overflowing_frame_does_not_poison_state() {
    let topology = LandmarkTopology::default();
    let mut engine = BehaviorEngine::new();
    let mut frame = render(SyntheticFace::default());
    frame.points_mut()[topology.left_ear_tragus].y = 1.7e308;
    frame.points_mut()[topology.right_ear_tragus].y = 1.7e308;

    let skipped = engine.process_landmarks(&frame);
    assert_eq!(skipped.frames_processed, 0);
    assert_eq!(skipped, Metrics::default());

    let metrics = run(&mut engine, std::iter::repeat(SyntheticFace::default()).take(300));
    for m in &metrics {
        assert_in_range(m);
    }
    let last = metrics.last().unwrap();
    assert!(engine.state().pitch_smoothed().is_finite());
    assert!((last.head_stability_pct - 100.0).abs() < 1e-6);
    assert!((last.confidence - 100.0).abs() < 1e-6);
}

#[test]
fn test_replay_is_deterministic() {
    let sequence: Vec<Option<LandmarkFrame>> = (0..300)
        .map(|i| (i % 37 != 0).then(|| render(Scenario::Mixed.face(i))))
        .collect();

    let replay = || {
        let mut engine = BehaviorEngine::new();
        sequence
            .iter()
            .map(|frame| engine.process_frame(frame.as_ref()))
            .collect::<Vec<_>>()
    };

    let first = replay();
    let second = replay();
    assert_eq!(first, second);
}

#[test]
fn test_mixed_session_end_to_end() {
    let mut engine = BehaviorEngine::new();
    let metrics = run(&mut engine, (0..300).map(|i| Scenario::Mixed.face(i)));

    for m in &metrics {
        assert_in_range(m);
    }
    // 54 of the last 90 frames hold contact at worst
    for m in &metrics[90..] {
        assert!(
            m.eye_contact_pct >= 60.0,
            "eye contact fell to {}",
            m.eye_contact_pct
        );
    }
    let last = metrics.last().unwrap();
    assert!(last.nod_count < 10);
    assert!(last.shake_count < 10);
    assert!(last.head_yaw_deg.abs() < 3.0);
    assert_eq!(last.frames_processed, 300);
}

#[test]
fn test_iris_fallback_reads_as_centered() {
    let mut engine = BehaviorEngine::new();
    let faces = (0..120).map(|i| Scenario::LookingAway.face(i).without_iris());
    let last = run(&mut engine, faces).pop().unwrap();

    // Without iris points the gaze cannot leave center
    assert_eq!(last.eye_contact_pct, 100.0);
    assert_eq!(last.alert, None);
}

#[test]
fn test_turned_head_alerts_center_head() {
    let mut engine = BehaviorEngine::new();
    let faces = std::iter::repeat(SyntheticFace::default().with_yaw(0.5)).take(60);
    let last = run(&mut engine, faces).pop().unwrap();

    // 0.5 * 45 = 22.5 degrees
    assert!((last.head_yaw_deg - 22.5).abs() < 0.1);
    assert_eq!(last.alert, Some(Alert::CenterHead));
    assert!(last.head_stability_pct < 100.0);
}

#[test]
fn test_rapid_blinking_alerts_slow_down() {
    let mut engine = BehaviorEngine::new();
    // Closed one frame in three: 100 closed frames in the 300-frame window
    let faces = (0..300).map(|i| {
        if i % 3 == 0 {
            SyntheticFace::default().with_eye_openness(0.05)
        } else {
            SyntheticFace::default()
        }
    });
    let last = run(&mut engine, faces).pop().unwrap();

    assert_eq!(last.blink_rate, 600.0);
    assert_eq!(last.nervousness, 100.0);
    assert_eq!(last.alert, Some(Alert::SlowDown));
}

#[test]
fn test_rescaled_config_preserves_nod_spacing_in_time() {
    let config = EngineConfig::default().rescaled_for_frame_rate(60.0).unwrap();
    let mut engine = BehaviorEngine::with_config(config).unwrap();
    // 25 frames apart at 60 fps is well inside the 40-frame cooldown
    let last = run(&mut engine, nods_at(&[60, 85], 200)).pop().unwrap();
    assert_eq!(last.nod_count, 1);
}

fn arb_face() -> impl Strategy<Value = Option<SyntheticFace>> {
    (
        -1.0f64..1.0,
        -1.0f64..1.0,
        0.0f64..0.6,
        0.0f64..1.0,
        0.0f64..0.1,
        any::<bool>(),
        0u8..10,
    )
        .prop_map(|(yaw, pitch, openness, gaze, mouth, iris, face_roll)| {
            let face = SyntheticFace::default()
                .with_yaw(yaw)
                .with_pitch(pitch)
                .with_eye_openness(openness)
                .with_gaze_deviation(gaze)
                .with_mouth_aperture(mouth);
            let face = if iris { face } else { face.without_iris() };
            // Roughly one callback in ten has no face
            (face_roll != 0).then_some(face)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_metrics_stay_in_range(faces in prop::collection::vec(arb_face(), 1..200)) {
        let mut engine = BehaviorEngine::new();
        for face in faces {
            let frame = face.map(render);
            let m = engine.process_frame(frame.as_ref());
            assert_in_range(&m);
        }
    }

    #[test]
    fn prop_replay_is_bit_identical(faces in prop::collection::vec(arb_face(), 1..120)) {
        let frames: Vec<Option<LandmarkFrame>> = faces.into_iter().map(|f| f.map(render)).collect();
        let replay = || {
            let mut engine = BehaviorEngine::new();
            frames.iter().map(|f| engine.process_frame(f.as_ref())).collect::<Vec<_>>()
        };
        prop_assert_eq!(replay(), replay());
    }

    #[test]
    fn prop_session_counters_monotonic(faces in prop::collection::vec(arb_face(), 1..120)) {
        let mut engine = BehaviorEngine::new();
        let mut previous = (0u64, 0u64);
        for face in faces {
            let frame = face.map(render);
            engine.process_frame(frame.as_ref());
            let session = engine.state().session();
            let current = (session.frames_processed(), session.frames_with_eye_contact());
            prop_assert!(current.0 >= previous.0);
            prop_assert!(current.1 >= previous.1);
            prop_assert!(current.1 <= current.0);
            previous = current;
        }
    }
}
