use std::sync::Arc;
use std::thread;
use std::time::Duration;

use libex10::device::{EventFifoQueue, FifoBufferPool, FifoEvent};
use libex10::protocol::PacketType;
use libex10::test_support::{fast_config, initialized_sim_device};
use libex10::{Outcome, StopReason};
use proptest::prelude::*;

use crate::common::{custom_packet, custom_stream, init_logging};

#[test]
fn data_under_threshold_stays_in_the_device() {
    init_logging();
    let (device, sim, gpio) = initialized_sim_device(fast_config()).unwrap();
    let small = custom_stream(4);
    sim.push_event_bytes(&small);

    assert!(gpio.fire_irq());
    assert!(device.event_queue().is_empty());
    assert_eq!(sim.event_fifo_len(), small.len());

    // crossing the threshold drains everything that accumulated
    for _ in 0..10 {
        sim.push_event_bytes(&custom_packet(0xee, &[0u8; 200]));
    }
    assert!(gpio.fire_irq());
    assert_eq!(sim.event_fifo_len(), 0);
    assert_eq!(device.event_queue().len(), 1);

    let mut tags = Vec::new();
    let outcome = device.event_queue().drain_with(|p| {
        tags.push(p.static_data[0]);
        Outcome::Ok(())
    });
    assert_eq!(outcome, Outcome::Ok(14));
    assert_eq!(&tags[..5], &[0, 1, 2, 3, 0xee]);
}

#[test]
fn consumer_thread_sees_packets_until_idle() {
    let (device, sim, gpio) = initialized_sim_device(fast_config().with_event_fifo_threshold(0))
        .unwrap();
    let queue = Arc::clone(device.event_queue());
    let consumer = thread::spawn(move || {
        let mut seen = 0usize;
        let outcome = queue.drain_until_idle(Duration::from_millis(200), |p| {
            assert_eq!(p.packet_type, PacketType::Custom);
            seen += 1;
            if seen == 6 {
                Outcome::StopRequested(StopReason::ConsumerDone)
            } else {
                Outcome::Ok(())
            }
        });
        (outcome, seen)
    });

    for burst in 0..3u8 {
        sim.push_event_bytes(&custom_packet(burst, &[]));
        sim.push_event_bytes(&custom_packet(burst, &[1, 2, 3]));
        assert!(gpio.fire_irq());
    }

    let (outcome, seen) = consumer.join().unwrap();
    assert_eq!(outcome, Outcome::StopRequested(StopReason::ConsumerDone));
    assert_eq!(seen, 6);
}

#[test]
fn exhausted_pool_reports_an_error_event() {
    let config = fast_config().with_event_fifo_threshold(0).with_fifo_buffers(1, 4096);
    let (device, sim, gpio) = initialized_sim_device(config).unwrap();

    sim.push_event_bytes(&custom_packet(1, &[]));
    assert!(gpio.fire_irq());
    sim.push_event_bytes(&custom_packet(2, &[]));
    assert!(gpio.fire_irq());

    // one buffer queued, then the pool ran dry
    assert_eq!(device.event_queue().len(), 2);
    let outcome = device.event_queue().drain_with(|_| Outcome::Ok(()));
    assert!(outcome.is_error());
    assert_eq!(device.protocol().pool().free_count(), 1);
}

#[derive(Debug, Clone)]
enum PoolStep {
    Acquire,
    Release(prop::sample::Index),
    Queue,
    Drain,
}

fn pool_step() -> impl Strategy<Value = PoolStep> {
    prop_oneof![
        Just(PoolStep::Acquire),
        any::<prop::sample::Index>().prop_map(PoolStep::Release),
        Just(PoolStep::Queue),
        Just(PoolStep::Drain),
    ]
}

proptest! {
    // Buffers held by the caller, buffers held by the queue and free
    // buffers always add up to the pool size.
    #[test]
    fn pool_stays_balanced(steps in proptest::collection::vec(pool_step(), 0..64)) {
        const COUNT: usize = 4;
        let pool = FifoBufferPool::new(COUNT, 4096).unwrap();
        let queue = EventFifoQueue::new();
        let packet = custom_packet(9, &[]);
        let mut held = Vec::new();

        for step in steps {
            match step {
                PoolStep::Acquire => held.extend(pool.acquire()),
                PoolStep::Release(i) if !held.is_empty() => {
                    let idx = i.index(held.len());
                    held.swap_remove(idx);
                }
                PoolStep::Release(_) => {}
                PoolStep::Queue => {
                    if let Some(mut node) = pool.acquire() {
                        node.raw_mut()[..packet.len()].copy_from_slice(&packet);
                        node.set_len(packet.len()).unwrap();
                        queue.push(FifoEvent::Data(node));
                    }
                }
                PoolStep::Drain => {
                    let _ = queue.drain_with(|_| Outcome::Ok(()));
                }
            }
            prop_assert_eq!(pool.free_count() + held.len() + queue.len(), COUNT);
        }
        drop(held);
        queue.clear();
        prop_assert_eq!(pool.free_count(), COUNT);
    }
}

#[derive(Debug, Clone)]
enum IrqStep {
    Push(u8),
    Fire,
    FailFifoRead,
    FailHostRead,
    Hold,
    Release(prop::sample::Index),
    Drain,
}

fn irq_step() -> impl Strategy<Value = IrqStep> {
    prop_oneof![
        3 => any::<u8>().prop_map(IrqStep::Push),
        3 => Just(IrqStep::Fire),
        1 => Just(IrqStep::FailFifoRead),
        1 => Just(IrqStep::FailHostRead),
        1 => Just(IrqStep::Hold),
        1 => any::<prop::sample::Index>().prop_map(IrqStep::Release),
        2 => Just(IrqStep::Drain),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Same balance, with buffers filled by the interrupt handler while
    // host and fifo reads fail at random points.
    #[test]
    fn pool_stays_balanced_across_interrupts(
        steps in proptest::collection::vec(irq_step(), 0..48)
    ) {
        const COUNT: usize = 3;
        let config = fast_config()
            .with_event_fifo_threshold(0)
            .with_fifo_buffers(COUNT, 4096);
        let (device, sim, gpio) = initialized_sim_device(config).unwrap();
        let pool = Arc::clone(device.protocol().pool());
        let queue = Arc::clone(device.event_queue());
        let mut held = Vec::new();

        for step in steps {
            match step {
                IrqStep::Push(tag) => sim.push_event_bytes(&custom_packet(tag, &[tag; 12])),
                IrqStep::Fire => {
                    gpio.fire_irq();
                }
                IrqStep::FailFifoRead => sim.fail_fifo_reads(1),
                IrqStep::FailHostRead => sim.fail_reads(1, -5),
                IrqStep::Hold => held.extend(pool.acquire()),
                IrqStep::Release(i) => {
                    if !held.is_empty() {
                        let idx = i.index(held.len());
                        held.swap_remove(idx);
                    }
                }
                IrqStep::Drain => {
                    let _ = queue.drain_with(|_| Outcome::Ok(()));
                }
            }
            prop_assert_eq!(
                pool.free_count() + held.len() + queue.buffer_count(),
                COUNT
            );
        }

        drop(held);
        queue.clear();
        prop_assert_eq!(pool.free_count(), COUNT);
    }
}
