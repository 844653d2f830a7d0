use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use presenter::{FrameGate, Presented, ProducerFlags, SkipReason, SyncPolicy};

fn double_buffered_gate() -> Arc<FrameGate<u64>> {
    Arc::new(FrameGate::new(
        0,
        ProducerFlags {
            double_buffered: true,
            ..ProducerFlags::default()
        },
    ))
}

fn spawn_consumer(gate: &Arc<FrameGate<u64>>) -> mpsc::Receiver<Presented<u64>> {
    let (tx, rx) = mpsc::channel();
    let gate = Arc::clone(gate);
    thread::spawn(move || {
        let presented = gate.present(|value| *value);
        let _ = tx.send(presented);
    });
    rx
}

#[test]
fn speed_modified_mid_session_stops_waiting() {
    let gate = double_buffered_gate();
    gate.publish(|value| *value = 7);
    match gate.present(|value| *value) {
        Presented::Rendered(frame) => {
            assert_eq!(frame.value, 7);
            assert_eq!(frame.policy, SyncPolicy::DoubleBuffered);
        }
        other => panic!("expected a rendered frame, got {other:?}"),
    }

    // No new frame: the consumer blocks until speed mode flips.
    let rx = spawn_consumer(&gate);
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    gate.set_speed_modified(true);
    let presented = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("consumer still blocked after speed toggle");
    match presented {
        Presented::Rendered(frame) => {
            assert_eq!(frame.policy, SyncPolicy::SpeedModified);
            assert_eq!(frame.value, 7);
        }
        other => panic!("expected a rendered frame, got {other:?}"),
    }

    // Every further tick renders without any producer signal.
    for _ in 0..10 {
        let presented = gate.present(|value| *value);
        assert!(presented.is_rendered());
        if let Presented::Rendered(frame) = presented {
            assert_eq!(frame.policy, SyncPolicy::SpeedModified);
            assert_eq!(frame.generation, 1);
        }
    }

    gate.set_speed_modified(false);
    assert_eq!(gate.policy(), SyncPolicy::DoubleBuffered);
}

#[test]
fn pausing_releases_a_blocked_consumer() {
    let gate = double_buffered_gate();
    let rx = spawn_consumer(&gate);
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

    gate.set_paused(true);
    let presented = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("pause did not wake the consumer");
    assert_eq!(presented.skip_reason(), Some(SkipReason::Paused));

    // While paused the consumer idles instead of blocking.
    assert_eq!(
        gate.present(|value| *value).skip_reason(),
        Some(SkipReason::Paused)
    );

    // A frame finished before the pause still gets shown.
    gate.set_paused(false);
    gate.publish(|value| *value = 1);
    gate.set_paused(true);
    assert!(gate.present(|value| *value).is_rendered());
}

#[test]
fn shutdown_releases_consumer_and_producer() {
    let gate = double_buffered_gate();
    gate.publish(|value| *value = 1);

    // Producer blocks on back-pressure because frame 1 was never shown.
    let (tx, rx) = mpsc::channel();
    let producer_gate = Arc::clone(&gate);
    thread::spawn(move || {
        let published = producer_gate.publish(|value| *value = 2);
        let _ = tx.send(published.is_some());
    });
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

    gate.shutdown();
    let published = rx
        .recv_timeout(Duration::from_secs(2))
        .expect("shutdown did not release the producer");
    assert!(!published);
    assert_eq!(
        gate.present(|value| *value).skip_reason(),
        Some(SkipReason::ShutDown)
    );
}

#[test]
fn wait_timeout_bounds_consumer_stall() {
    let gate = Arc::new(
        FrameGate::new(
            0u64,
            ProducerFlags {
                double_buffered: true,
                ..ProducerFlags::default()
            },
        )
        .with_wait_timeout(Some(Duration::from_millis(10))),
    );
    assert_eq!(
        gate.present(|value| *value).skip_reason(),
        Some(SkipReason::TimedOut)
    );
}

#[test]
fn single_locked_renders_current_content_every_tick() {
    let gate = FrameGate::new(3u64, ProducerFlags::default());
    assert_eq!(gate.policy(), SyncPolicy::SingleLocked);
    for _ in 0..3 {
        match gate.present(|value| *value) {
            Presented::Rendered(frame) => {
                assert_eq!(frame.value, 3);
                assert_eq!(frame.policy, SyncPolicy::SingleLocked);
            }
            other => panic!("expected a rendered frame, got {other:?}"),
        }
    }
}
