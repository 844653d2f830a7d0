use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use presenter::{FrameGate, Presented, ProducerFlags, SkipReason, SyncPolicy};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Schedule {
    frames: u64,
    producer_delay_us: u64,
    consumer_delay_us: u64,
    flags: ProducerFlags,
    timeout_ms: Option<u64>,
}

fn schedule() -> impl Strategy<Value = Schedule> {
    (
        1u64..80,
        0u64..300,
        0u64..300,
        any::<bool>(),
        prop::option::of(1u64..10),
    )
        .prop_map(
            |(frames, producer_delay_us, consumer_delay_us, cpu_double_buffered, timeout_ms)| {
                Schedule {
                    frames,
                    producer_delay_us,
                    consumer_delay_us,
                    flags: ProducerFlags {
                        double_buffered: cpu_double_buffered,
                        renders_via_legacy: !cpu_double_buffered,
                        speed_modified: false,
                    },
                    timeout_ms,
                }
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_generation_is_rendered_at_most_once(schedule in schedule()) {
        let timeout = schedule.timeout_ms.map(Duration::from_millis);
        let gate = Arc::new(FrameGate::new(0u64, schedule.flags).with_wait_timeout(timeout));
        prop_assert_eq!(gate.policy(), SyncPolicy::DoubleBuffered);

        let producer = {
            let gate = Arc::clone(&gate);
            let frames = schedule.frames;
            let delay = Duration::from_micros(schedule.producer_delay_us);
            thread::spawn(move || {
                for frame in 1..=frames {
                    if gate.publish(|content| *content = frame).is_none() {
                        break;
                    }
                    thread::sleep(delay);
                }
            })
        };

        let deadline = Instant::now() + Duration::from_secs(20);
        let consumer_delay = Duration::from_micros(schedule.consumer_delay_us);
        let mut last = 0u64;
        let mut rendered = 0u64;
        let mut superseded = 0u64;
        let mut stalled = false;
        while last < schedule.frames {
            if Instant::now() > deadline {
                stalled = true;
                break;
            }
            match gate.present(|content| *content) {
                Presented::Rendered(frame) => {
                    prop_assert!(frame.generation > last, "generation {} rendered twice", frame.generation);
                    // Content and generation move together under the content lock.
                    prop_assert_eq!(frame.value, frame.generation);
                    superseded += frame.superseded;
                    rendered += 1;
                    last = frame.generation;
                }
                Presented::Skipped(reason) => {
                    prop_assert_eq!(reason, SkipReason::TimedOut);
                }
            }
            thread::sleep(consumer_delay);
        }

        gate.shutdown();
        producer.join().unwrap();
        prop_assert!(!stalled, "consumer stalled at generation {}", last);
        prop_assert_eq!(rendered + superseded, schedule.frames);
        if schedule.flags.double_buffered && schedule.timeout_ms.is_none() {
            // Back-pressure without a timeout never lets the producer overwrite.
            prop_assert_eq!(superseded, 0);
        }
    }
}
