// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use castplay_frames::*;
use castplay_test_utils::{logged_assert, logged_assert_eq, logged_test};
use pretty_assertions::assert_eq;

/// A recording with bursts, idle gaps and repeated timestamps.
fn session_events() -> Vec<CastEvent> {
    let mut events = Vec::new();
    let mut time = 0.0;
    for i in 0..97 {
        time += match i % 11 {
            0 => 2.5,
            3 | 4 => 0.0,
            _ => 0.125,
        };
        let data = if i % 7 == 0 {
            format!("\x1b[1mline {i}\x1b[0m\r\n")
        } else {
            format!("{i} ")
        };
        events.push(CastEvent::output(time, data));
    }
    events
}

fn build(events: &[CastEvent], step: usize) -> FrameQueue {
    let duration = events.last().map(|e| e.time).unwrap_or(0.0);
    let mut cast = Cast::from_events(CastHeader::new(120, 40, duration), events.to_vec())
        .expect("valid recording");
    FrameQueue::new(&mut cast, FrameQueueConfig::default().with_step(step))
        .expect("queue builds")
}

fn concat_where(events: &[CastEvent], keep: impl Fn(f64) -> bool) -> String {
    events.iter().filter(|e| keep(e.time)).map(|e| e.data.as_str()).collect()
}

fn probe_times(events: &[CastEvent]) -> Vec<f64> {
    let last = events.last().map(|e| e.time).unwrap_or(0.0);
    let mut times: Vec<f64> = events.iter().map(|e| e.time).collect();
    times.extend((0..=((last + 2.0) * 16.0) as usize).map(|i| i as f64 / 16.0));
    times.push(last + 100.0);
    times
}

#[logged_test]
fn test_frame_count_follows_step() {
    let events = session_events();
    for (step, expected) in [(1, 97), (2, 49), (30, 4), (1000, 1)] {
        let queue = build(&events, step);
        logged_assert_eq!(logger, queue.len(), expected);
    }
}

#[logged_test]
fn test_lookup_trichotomy() {
    let events = session_events();
    for step in [1, 3, 30] {
        let queue = build(&events, step);
        let end = queue.end_frame().unwrap();
        let last_content_end = end.start_time().min(events.last().unwrap().time);

        for time in probe_times(&events) {
            let frame = queue.frame(time).unwrap();
            match frame.kind() {
                FrameKind::Content => assert!(
                    frame.start_time() <= time && time < frame.end_time(),
                    "step {step}: {time} outside {frame:?}"
                ),
                FrameKind::End => {
                    assert!(queue.is_end(&frame));
                    assert!(time >= last_content_end, "step {step}: early end at {time}");
                }
                FrameKind::Null => {
                    assert!(time < last_content_end);
                    // A gap: no content frame may cover this time.
                    for other in probe_times(&events) {
                        let covering = queue.frame(other).unwrap();
                        if covering.kind() == FrameKind::Content {
                            assert!(
                                !(covering.start_time() <= time && time < covering.end_time()),
                                "step {step}: {time} is covered by {covering:?}"
                            );
                        }
                    }
                }
                FrameKind::Start => panic!("lookup returned the start sentinel"),
            }
        }
    }
}

#[logged_test]
fn test_end_snapshot_is_independent_of_step() {
    let events = session_events();
    let full = concat_where(&events, |_| true);

    for step in [1, 2, 30, 1000] {
        let queue = build(&events, step);
        let end = queue.frame(1e9).unwrap();
        logged_assert!(logger, queue.is_end(&end), format!("step {step} end lookup"));
        assert_eq!(&*end.snapshot(), full.as_str());
    }
}

#[logged_test]
fn test_snapshot_at_matches_prefix_for_every_time() {
    let events = session_events();
    let queues: Vec<FrameQueue> = [1, 2, 30, 1000].iter().map(|s| build(&events, *s)).collect();

    for time in probe_times(&events) {
        let expected = concat_where(&events, |t| t <= time);
        for queue in &queues {
            assert_eq!(queue.snapshot_at(time).unwrap(), expected, "at {time}");
        }
    }
}

#[logged_test]
fn test_frame_snapshot_ends_at_frame_end() {
    let events = session_events();
    let queue = build(&events, 7);

    for time in probe_times(&events) {
        let frame = queue.frame(time).unwrap();
        if frame.kind() == FrameKind::Content {
            // Events sharing the end timestamp may continue in the next frame.
            let end = frame.end_time();
            let snapshot = frame.snapshot();
            let before = concat_where(&events, |t| t < end);
            let through = concat_where(&events, |t| t <= end);
            assert!(snapshot.len() > before.len());
            assert!(snapshot.starts_with(before.as_str()));
            assert!(through.starts_with(&*snapshot));
        }
    }
}

#[logged_test]
fn test_data_delta_additivity() {
    let events = session_events();
    let queue = build(&events, 30);

    let mut checked = 0;
    for t0 in probe_times(&events) {
        for t1 in probe_times(&events) {
            if t0 >= t1 {
                continue;
            }
            let first = queue.frame(t0).unwrap();
            let second = queue.frame(t1).unwrap();
            if first.kind() != FrameKind::Content
                || second.kind() != FrameKind::Content
                || first.start_time() != second.start_time()
            {
                continue;
            }

            let prefix = first.data(t0, None).unwrap();
            let delta = first.data(t1, Some(t0)).unwrap();
            assert_eq!(format!("{prefix}{delta}"), first.data(t1, None).unwrap());
            assert_eq!(delta, concat_where(&events, |t| t0 < t && t <= t1 && t >= first.start_time()));
            checked += 1;
        }
    }
    logged_assert!(logger, checked > 100, format!("checked {checked} pairs"));
}

#[logged_test]
fn test_queue_delta_is_independent_of_step() {
    let events = session_events();
    let queues: Vec<FrameQueue> = [1, 2, 30, 1000].iter().map(|s| build(&events, *s)).collect();
    let times = probe_times(&events);

    for window in times.windows(2) {
        let (t0, t1) = (window[0].min(window[1]), window[0].max(window[1]));
        let expected = concat_where(&events, |t| t0 < t && t <= t1);
        for queue in &queues {
            assert_eq!(queue.delta(t0, t1).unwrap(), expected, "({t0}, {t1}]");
        }
    }

    for queue in &queues {
        assert_eq!(queue.delta(-1.0, 1e9).unwrap(), concat_where(&events, |_| true));
    }
}

#[logged_test]
fn test_data_rejects_times_outside_frame() {
    let events = session_events();
    let queue = build(&events, 30);
    let frame = queue.frame(3.0).unwrap();
    assert_eq!(frame.kind(), FrameKind::Content);

    let below = frame.start_time() - 0.01;
    let at_end = frame.end_time();
    for time in [below, at_end, at_end + 5.0] {
        assert_eq!(
            frame.data(time, None).unwrap_err(),
            FrameError::OutOfRange {
                time,
                start_time: frame.start_time(),
                end_time: frame.end_time(),
            }
        );
    }
}

#[logged_test]
fn test_gap_example_resolves_to_null_frame() {
    let mut cast = Cast::from_events(
        CastHeader::new(80, 24, 12.0),
        vec![
            CastEvent::output(0.0, "a"),
            CastEvent::output(5.0, "b"),
            CastEvent::output(12.0, "c"),
        ],
    )
    .unwrap();
    let queue = FrameQueue::new(&mut cast, FrameQueueConfig::default().with_step(2)).unwrap();

    assert_eq!(queue.len(), 2);
    let gap = queue.frame(7.0).unwrap();
    assert!(gap.is_null());
    assert_eq!(gap.duration(), 0.0);
    assert_eq!(gap.data(7.0, None).unwrap(), "");
    assert_eq!(&*gap.snapshot(), "");
    assert_eq!(&*queue.end_frame().unwrap().snapshot(), "abc");
}

#[logged_test]
fn test_strip_transform_caches_printable_text() {
    let events = session_events();
    let duration = events.last().unwrap().time;
    let mut cast = Cast::from_events(CastHeader::new(120, 40, duration), events.clone()).unwrap();
    let queue = FrameQueue::new(
        &mut cast,
        FrameQueueConfig::default()
            .with_step(10)
            .with_snapshot_transform(SnapshotTransform::strip_control_sequences()),
    )
    .unwrap();

    let snapshot = queue.end_frame().unwrap().snapshot();
    assert!(!snapshot.contains('\x1b'));
    assert_eq!(&*snapshot, strip_control_sequences(&concat_where(&events, |_| true)));
}

#[logged_test]
fn test_deep_chain_resolves_from_the_end() {
    let events: Vec<CastEvent> =
        (0..5_000).map(|i| CastEvent::output(i as f64 * 0.001, "x")).collect();
    let queue = build(&events, 1);

    assert_eq!(queue.len(), 5_000);
    let end = queue.end_frame().unwrap();
    assert_eq!(end.snapshot().len(), 5_000);
    assert_eq!(queue.snapshot_at(2.5).unwrap().len(), 2_501);
}
