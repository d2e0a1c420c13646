// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use castplay_frames::*;
use castplay_test_utils::{logged_assert_eq, logged_test};

fn live_with(events: Vec<CastEvent>) -> LiveCast {
    let mut live = LiveCast::new(CastHeader::live(80, 24));
    live.append(events).expect("ordered events");
    live
}

fn record_durations(queue: &FrameQueue) -> (Rc<RefCell<Vec<f64>>>, Subscription) {
    let durations = Rc::new(RefCell::new(Vec::new()));
    let sink = durations.clone();
    let subscription = queue.on_duration_changed(move |d| sink.borrow_mut().push(*d));
    (durations, subscription)
}

#[logged_test]
fn test_growth_notifies_once_per_round() {
    let mut live = live_with(vec![CastEvent::output(0.0, "boot\r\n")]);
    let queue = FrameQueue::new(&mut live, FrameQueueConfig::default().with_step(3)).unwrap();
    let (durations, _subscription) = record_durations(&queue);
    assert!(durations.borrow().is_empty(), "construction must not notify");

    let mut expected_text = String::from("boot\r\n");
    for round in 1..=5 {
        let batch: Vec<CastEvent> = (0..4)
            .map(|i| CastEvent::output(round as f64 + i as f64 * 0.1, format!("r{round}e{i} ")))
            .collect();
        for event in &batch {
            expected_text.push_str(&event.data);
        }
        live.append(batch).unwrap();

        logger.log(&format!("round {round}: {} frames", queue.len())).unwrap();
        assert_eq!(durations.borrow().len(), round);
    }

    logged_assert_eq!(logger, queue.len(), 1 + 5 * 2);
    assert_eq!(*durations.borrow(), vec![1.3, 2.3, 3.3, 4.3, 5.3]);
    assert_eq!(queue.duration(), 5.3);
    assert_eq!(&*queue.end_frame().unwrap().snapshot(), expected_text.as_str());
}

#[logged_test]
fn test_rounds_without_new_time_do_not_notify() {
    let mut live = live_with(vec![CastEvent::output(1.0, "a")]);
    let queue = FrameQueue::new(&mut live, FrameQueueConfig::default()).unwrap();
    let (durations, _subscription) = record_durations(&queue);

    live.append(Vec::new()).unwrap();
    live.append(vec![CastEvent::output(1.0, "b")]).unwrap();
    assert!(durations.borrow().is_empty());

    live.append(vec![CastEvent::output(1.5, "c")]).unwrap();
    assert_eq!(*durations.borrow(), vec![1.5]);
}

#[logged_test]
fn test_held_frames_survive_growth() {
    let mut live = live_with(
        (0..6).map(|i| CastEvent::output(i as f64, i.to_string())).collect(),
    );
    let queue = FrameQueue::new(&mut live, FrameQueueConfig::default().with_step(3)).unwrap();

    let held = queue.frame(0.5).unwrap();
    assert_eq!(held.kind(), FrameKind::Content);
    let range = (held.start_time(), held.end_time());
    let snapshot = held.snapshot();
    let old_end = queue.end_frame().unwrap();

    live.append((6..20).map(|i| CastEvent::output(i as f64, i.to_string())))
        .unwrap();

    assert_eq!((held.start_time(), held.end_time()), range);
    assert_eq!(held.data(1.0, None).unwrap(), "01");
    assert!(Rc::ptr_eq(&snapshot, &held.snapshot()), "memoized snapshot is reused");

    assert!(!queue.is_end(&old_end));
    assert_eq!(&*old_end.snapshot(), "012345");
    assert_eq!(old_end.end_time(), 5.0);

    let new_end = queue.frame(19.0).unwrap();
    assert!(queue.is_end(&new_end));
    assert_eq!(new_end.end_time(), 19.0);
    assert_eq!(queue.snapshot_at(7.0).unwrap(), "01234567");
}

#[logged_test]
fn test_handler_may_query_the_queue() {
    let mut live = live_with(vec![CastEvent::output(0.0, "$ ")]);
    let queue = Rc::new(FrameQueue::new(&mut live, FrameQueueConfig::default()).unwrap());

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let weak = Rc::downgrade(&queue);
    let _subscription = queue.on_duration_changed(move |duration| {
        let Some(queue) = weak.upgrade() else {
            return;
        };
        let end = queue.frame(*duration).unwrap();
        assert!(queue.is_end(&end));
        sink.borrow_mut().push(end.snapshot().to_string());
    });

    live.append(vec![CastEvent::output(0.4, "echo hi\r\n")]).unwrap();
    live.append(vec![CastEvent::output(0.9, "hi\r\n")]).unwrap();

    assert_eq!(*seen.borrow(), vec!["$ echo hi\r\n", "$ echo hi\r\nhi\r\n"]);
}

#[logged_test]
fn test_unsubscribed_handler_is_not_called() {
    let mut live = live_with(vec![CastEvent::output(0.0, "a")]);
    let queue = FrameQueue::new(&mut live, FrameQueueConfig::default()).unwrap();

    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    let subscription = queue.on_duration_changed(move |_| counter.set(counter.get() + 1));

    live.append(vec![CastEvent::output(1.0, "b")]).unwrap();
    subscription.unsubscribe();
    live.append(vec![CastEvent::output(2.0, "c")]).unwrap();

    assert_eq!(hits.get(), 1);
    assert_eq!(queue.len(), 3);
}

#[logged_test]
fn test_queue_starts_empty_for_a_fresh_live_recording() {
    let mut live = LiveCast::new(CastHeader::live(80, 24));
    let queue = FrameQueue::new(&mut live, FrameQueueConfig::default()).unwrap();
    let (durations, _subscription) = record_durations(&queue);

    assert_eq!(queue.frame(0.0).unwrap_err(), FrameError::EmptyQueue);
    assert_eq!(queue.snapshot_at(10.0).unwrap(), "");

    live.append(vec![CastEvent::output(0.0, "first")]).unwrap();
    assert_eq!(queue.len(), 1);
    assert!(durations.borrow().is_empty(), "duration stayed at zero");
    assert!(queue.is_end(&queue.frame(0.0).unwrap()));

    live.append(vec![CastEvent::output(0.25, "second")]).unwrap();
    assert_eq!(*durations.borrow(), vec![0.25]);
}

#[logged_test]
fn test_dispose_stops_feeding() {
    let mut live = live_with(vec![CastEvent::output(0.0, "a"), CastEvent::output(1.0, "b")]);
    let queue = FrameQueue::new(&mut live, FrameQueueConfig::default()).unwrap();
    let (durations, _subscription) = record_durations(&queue);

    queue.dispose();
    queue.dispose();
    live.append(vec![CastEvent::output(2.0, "c")]).unwrap();

    assert!(durations.borrow().is_empty());
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.end_frame().unwrap_err(), FrameError::Disposed);
    assert_eq!(queue.delta(0.0, 2.0).unwrap_err(), FrameError::Disposed);
}

#[logged_test]
fn test_dropped_queue_leaves_recording_usable() {
    let mut live = live_with(vec![CastEvent::output(0.0, "a")]);
    {
        let _queue = FrameQueue::new(&mut live, FrameQueueConfig::default()).unwrap();
    }
    assert!(live.has_feeder());
    assert_eq!(live.append(vec![CastEvent::output(1.0, "b")]), Ok(1));
    assert_eq!(live.events().len(), 2);
}
