//! Channel tests
//!
//! Capacity accounting, keep-alive blocking, interruption and concurrent
//! producers/consumers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use spool_metrics::MetricsRegistry;
use spool_protocol::Event;

use crate::{Channel, ChannelConfig, ChannelError};

fn fail_fast(capacity: usize, transaction_capacity: usize) -> Channel {
    Channel::new(
        "mem",
        ChannelConfig::default()
            .with_capacity(capacity)
            .with_transaction_capacity(transaction_capacity)
            .fail_fast(),
    )
    .unwrap()
}

fn put_all(ch: &Channel, bodies: &[&'static str]) -> crate::Result<()> {
    let mut tx = ch.transaction();
    tx.begin()?;
    for body in bodies {
        tx.put(Event::new(*body))?;
    }
    tx.commit()
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_invalid_config_rejected() {
    let zero = ChannelConfig::default().with_capacity(0);
    assert!(matches!(
        Channel::new("bad", zero),
        Err(ChannelError::InvalidConfig { .. })
    ));

    let oversized = ChannelConfig::default()
        .with_capacity(5)
        .with_transaction_capacity(10);
    let err = Channel::new("bad", oversized).unwrap_err();
    assert!(err.to_string().contains("must not exceed capacity"));

    let zero_bytes = ChannelConfig::default().with_byte_capacity(0);
    assert!(Channel::new("bad", zero_bytes).is_err());
}

#[test]
fn test_defaults() {
    let ch = Channel::new("mem", ChannelConfig::default()).unwrap();
    assert_eq!(ch.name(), "mem");
    assert_eq!(ch.capacity(), 100);
    assert_eq!(ch.transaction_capacity(), 100);
    assert_eq!(ch.keep_alive(), Duration::from_secs(3));
    assert_eq!(ch.config(), ChannelConfig::default());
    assert!(ch.is_empty());
}

#[test]
fn test_clones_share_queue() {
    let ch = fail_fast(10, 10);
    let clone = ch.clone();
    put_all(&ch, &["a"]).unwrap();

    assert_eq!(clone.len(), 1);
    assert_eq!(ch, clone);
    assert_ne!(ch, fail_fast(10, 10));
}

// =============================================================================
// Capacity
// =============================================================================

#[test]
fn test_full_then_take_frees_slot() {
    let ch = fail_fast(2, 2);
    put_all(&ch, &["a", "b"]).unwrap();

    // Channel is full: the next put is rejected
    let mut tx = ch.transaction();
    tx.begin().unwrap();
    let err = tx.put(Event::new("c")).unwrap_err();
    assert_eq!(err, ChannelError::full("mem", 2));
    assert!(err.is_recoverable());
    tx.rollback().unwrap();
    tx.close();

    // Consume "a"
    let mut tx = ch.transaction();
    tx.begin().unwrap();
    assert_eq!(tx.take().unwrap().unwrap().body().as_ref(), b"a");
    tx.commit().unwrap();
    tx.close();

    // Now "c" fits
    put_all(&ch, &["c"]).unwrap();
    assert_eq!(ch.len(), 2);

    let mut tx = ch.transaction();
    tx.begin().unwrap();
    assert_eq!(tx.take().unwrap().unwrap().body().as_ref(), b"b");
    assert_eq!(tx.take().unwrap().unwrap().body().as_ref(), b"c");
    tx.commit().unwrap();
}

#[test]
fn test_uncommitted_take_keeps_slot() {
    let ch = fail_fast(1, 1);
    put_all(&ch, &["a"]).unwrap();

    let mut consumer = ch.transaction();
    consumer.begin().unwrap();
    consumer.take().unwrap().unwrap();

    // The slot is still held by the uncommitted take
    assert!(matches!(
        put_all(&ch, &["b"]),
        Err(ChannelError::Full { .. })
    ));

    consumer.commit().unwrap();
    put_all(&ch, &["b"]).unwrap();
}

#[test]
fn test_own_take_frees_slot_for_own_put() {
    let ch = fail_fast(1, 1);
    put_all(&ch, &["a"]).unwrap();

    let mut relay = ch.transaction();
    relay.begin().unwrap();
    assert_eq!(relay.take().unwrap().unwrap().body().as_ref(), b"a");
    relay.put(Event::new("b")).unwrap();

    // Other transactions still see a full channel
    assert!(matches!(
        put_all(&ch, &["c"]),
        Err(ChannelError::Full { .. })
    ));

    relay.commit().unwrap();
    relay.close();
    assert_eq!(ch.len(), 1);
    assert_eq!(ch.remaining_capacity(), 0);

    let mut tx = ch.transaction();
    tx.begin().unwrap();
    assert_eq!(tx.take().unwrap().unwrap().body().as_ref(), b"b");
    tx.commit().unwrap();
}

#[test]
fn test_take_credit_covers_only_own_takes() {
    let ch = fail_fast(2, 2);
    put_all(&ch, &["a", "b"]).unwrap();

    let mut tx = ch.transaction();
    tx.begin().unwrap();
    tx.take().unwrap().unwrap();
    tx.put(Event::new("c")).unwrap();
    // One take credits one put
    assert!(matches!(
        tx.put(Event::new("d")),
        Err(ChannelError::Full { .. })
    ));
    tx.rollback().unwrap();
    tx.close();

    assert_eq!(ch.len(), 2);
    assert_eq!(ch.remaining_capacity(), 0);
}

#[test]
fn test_reservations_from_concurrent_transactions_count() {
    let ch = fail_fast(3, 2);

    let mut first = ch.transaction();
    first.begin().unwrap();
    first.put(Event::new("1")).unwrap();
    first.put(Event::new("2")).unwrap();

    let mut second = ch.transaction();
    second.begin().unwrap();
    second.put(Event::new("3")).unwrap();
    assert!(matches!(
        second.put(Event::new("4")),
        Err(ChannelError::Full { .. })
    ));

    first.commit().unwrap();
    second.commit().unwrap();
    assert_eq!(ch.len(), 3);
}

#[test]
fn test_byte_capacity() {
    let config = ChannelConfig::default()
        .with_capacity(10)
        .with_transaction_capacity(10)
        .with_byte_capacity(10)
        .fail_fast();
    let ch = Channel::new("bytes", config).unwrap();

    put_all(&ch, &["12345", "678"]).unwrap();
    assert_eq!(ch.bytes_used(), 8);

    let err = put_all(&ch, &["abc"]).unwrap_err();
    assert_eq!(err, ChannelError::byte_capacity("bytes", 3, 2));
    assert_eq!(ch.bytes_used(), 8);

    // Taking releases bytes only once the take commits
    let mut tx = ch.transaction();
    tx.begin().unwrap();
    tx.take().unwrap().unwrap();
    assert_eq!(ch.bytes_used(), 8);
    tx.commit().unwrap();
    assert_eq!(ch.bytes_used(), 3);

    put_all(&ch, &["abc"]).unwrap();
}

#[test]
fn test_event_larger_than_byte_capacity_fails_without_waiting() {
    let config = ChannelConfig::default()
        .with_capacity(10)
        .with_transaction_capacity(10)
        .with_byte_capacity(4)
        .with_keep_alive(Duration::from_secs(30));
    let ch = Channel::new("bytes", config).unwrap();

    let start = Instant::now();
    assert!(matches!(
        put_all(&ch, &["too large"]),
        Err(ChannelError::ByteCapacityExceeded { .. })
    ));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_resize_grow_and_shrink() {
    let ch = fail_fast(2, 2);
    put_all(&ch, &["a", "b"]).unwrap();

    ch.resize(4).unwrap();
    put_all(&ch, &["c"]).unwrap();
    assert_eq!(ch.remaining_capacity(), 1);

    // Cannot shrink below what is resident
    assert!(matches!(
        ch.resize(2),
        Err(ChannelError::InvalidConfig { .. })
    ));
    // Cannot go below the transaction capacity
    assert!(ch.resize(1).is_err());
    ch.resize(3).unwrap();
    assert_eq!(ch.capacity(), 3);
}

#[test]
fn test_commit_fails_after_shrink_and_rollback_recovers() {
    let ch = fail_fast(4, 2);
    put_all(&ch, &["a", "b"]).unwrap();

    let mut tx = ch.transaction();
    tx.begin().unwrap();
    tx.put(Event::new("c")).unwrap();
    tx.put(Event::new("d")).unwrap();

    ch.resize(2).unwrap();

    let err = tx.commit().unwrap_err();
    assert_eq!(err, ChannelError::full("mem", 2));
    assert_eq!(tx.pending_puts(), 2);

    tx.rollback().unwrap();
    tx.close();
    assert_eq!(ch.len(), 2);
    assert_eq!(ch.remaining_capacity(), 0);
}

// =============================================================================
// Keep-alive and interruption
// =============================================================================

#[test]
fn test_take_times_out_with_none() {
    let ch = Channel::new(
        "mem",
        ChannelConfig::default().with_keep_alive(Duration::from_millis(50)),
    )
    .unwrap();

    let mut tx = ch.transaction();
    tx.begin().unwrap();
    let start = Instant::now();
    assert!(tx.take().unwrap().is_none());
    assert!(start.elapsed() >= Duration::from_millis(50));
    tx.commit().unwrap();
}

#[test]
fn test_put_times_out_with_full() {
    let ch = Channel::new(
        "mem",
        ChannelConfig::default()
            .with_capacity(1)
            .with_transaction_capacity(1)
            .with_keep_alive(Duration::from_millis(50)),
    )
    .unwrap();
    put_all(&ch, &["a"]).unwrap();

    let start = Instant::now();
    assert!(matches!(
        put_all(&ch, &["b"]),
        Err(ChannelError::Full { .. })
    ));
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[test]
fn test_blocked_take_wakes_on_commit() {
    let ch = Channel::new(
        "mem",
        ChannelConfig::default().with_keep_alive(Duration::from_secs(10)),
    )
    .unwrap();

    let consumer = {
        let ch = ch.clone();
        thread::spawn(move || {
            let mut tx = ch.transaction();
            tx.begin().unwrap();
            let event = tx.take().unwrap();
            tx.commit().unwrap();
            event
        })
    };

    thread::sleep(Duration::from_millis(50));
    put_all(&ch, &["wake"]).unwrap();

    let event = consumer.join().unwrap().unwrap();
    assert_eq!(event.body().as_ref(), b"wake");
}

#[test]
fn test_blocked_put_wakes_when_space_frees() {
    let ch = Channel::new(
        "mem",
        ChannelConfig::default()
            .with_capacity(1)
            .with_transaction_capacity(1)
            .with_keep_alive(Duration::from_secs(10)),
    )
    .unwrap();
    put_all(&ch, &["a"]).unwrap();

    let producer = {
        let ch = ch.clone();
        thread::spawn(move || put_all(&ch, &["b"]))
    };

    thread::sleep(Duration::from_millis(50));
    let mut tx = ch.transaction();
    tx.begin().unwrap();
    tx.take().unwrap().unwrap();
    tx.commit().unwrap();
    tx.close();

    producer.join().unwrap().unwrap();
    assert_eq!(ch.len(), 1);
}

#[test]
fn test_interrupt_releases_blocked_take() {
    let ch = Channel::new(
        "mem",
        ChannelConfig::default().with_keep_alive(Duration::from_secs(30)),
    )
    .unwrap();

    let consumer = {
        let ch = ch.clone();
        thread::spawn(move || {
            let mut tx = ch.transaction();
            tx.begin().unwrap();
            let start = Instant::now();
            let event = tx.take().unwrap();
            tx.commit().unwrap();
            (event, start.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(50));
    ch.interrupt_takers();

    let (event, waited) = consumer.join().unwrap();
    assert!(event.is_none());
    assert!(waited < Duration::from_secs(10));
}

#[test]
fn test_interrupt_applies_to_takes_started_later() {
    let ch = Channel::new(
        "mem",
        ChannelConfig::default().with_keep_alive(Duration::from_secs(30)),
    )
    .unwrap();
    ch.interrupt_takers();
    assert!(ch.takers_interrupted());

    // Queued events are still handed out, an empty queue returns at once
    put_all(&ch, &["a"]).unwrap();
    let mut tx = ch.transaction();
    tx.begin().unwrap();
    let start = Instant::now();
    assert!(tx.take().unwrap().is_some());
    assert!(tx.take().unwrap().is_none());
    assert!(start.elapsed() < Duration::from_secs(10));
    tx.commit().unwrap();
    tx.close();

    ch.resume_takers();
    assert!(!ch.takers_interrupted());
}

#[test]
fn test_resumed_takers_wait_for_events_again() {
    let ch = Channel::new(
        "mem",
        ChannelConfig::default().with_keep_alive(Duration::from_millis(100)),
    )
    .unwrap();
    ch.interrupt_takers();
    ch.resume_takers();

    let mut tx = ch.transaction();
    tx.begin().unwrap();
    let start = Instant::now();
    assert!(tx.take().unwrap().is_none());
    assert!(start.elapsed() >= Duration::from_millis(100));
    tx.commit().unwrap();
}

// =============================================================================
// Counters
// =============================================================================

#[test]
fn test_injected_counters() {
    let registry = MetricsRegistry::new();
    let ch = Channel::with_counters(
        "mem",
        ChannelConfig::default().fail_fast(),
        registry.channel("mem"),
    )
    .unwrap();

    put_all(&ch, &["a", "b"]).unwrap();
    let mut tx = ch.transaction();
    tx.begin().unwrap();
    tx.take().unwrap();
    tx.rollback().unwrap();
    tx.close();

    let s = registry.snapshot().channels["mem"];
    assert_eq!(s.put_attempts, 2);
    assert_eq!(s.put_success, 2);
    assert_eq!(s.take_attempts, 1);
    assert_eq!(s.take_success, 0);
    assert_eq!(s.commits, 1);
    assert_eq!(s.rollbacks, 1);
    assert_eq!(s.size, 2);
}

#[test]
fn test_empty_commit_is_not_counted() {
    let registry = MetricsRegistry::new();
    let ch = Channel::with_counters(
        "mem",
        ChannelConfig::default().fail_fast(),
        registry.channel("mem"),
    )
    .unwrap();

    let mut tx = ch.transaction();
    tx.begin().unwrap();
    assert!(tx.take().unwrap().is_none());
    tx.commit().unwrap();
    tx.close();
    assert_eq!(registry.snapshot().channels["mem"].commits, 0);

    put_all(&ch, &["a"]).unwrap();
    assert_eq!(registry.snapshot().channels["mem"].commits, 1);
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_producers_and_consumers_respect_capacity() {
    const CAPACITY: usize = 8;
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 200;

    let ch = Channel::new(
        "mem",
        ChannelConfig::default()
            .with_capacity(CAPACITY)
            .with_transaction_capacity(4)
            .with_keep_alive(Duration::from_millis(20)),
    )
    .unwrap();

    let consumed = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));
    let violations = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let ch = ch.clone();
            thread::spawn(move || {
                let mut sent = 0;
                while sent < PER_PRODUCER {
                    let mut tx = ch.transaction();
                    tx.begin().unwrap();
                    let batch = (PER_PRODUCER - sent).min(2);
                    let mut ok = true;
                    for i in 0..batch {
                        if tx.put(Event::new(format!("{p}-{}", sent + i))).is_err() {
                            ok = false;
                            break;
                        }
                    }
                    if ok && tx.commit().is_ok() {
                        sent += batch;
                    } else {
                        tx.rollback().unwrap();
                    }
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let ch = ch.clone();
            let consumed = Arc::clone(&consumed);
            let done = Arc::clone(&done);
            let violations = Arc::clone(&violations);
            thread::spawn(move || {
                loop {
                    let mut tx = ch.transaction();
                    tx.begin().unwrap();
                    let mut taken = 0;
                    while taken < 3 {
                        match tx.take().unwrap() {
                            Some(_) => taken += 1,
                            None => break,
                        }
                    }
                    tx.commit().unwrap();
                    consumed.fetch_add(taken, Ordering::SeqCst);
                    if ch.len() > CAPACITY {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                    if taken == 0 && done.load(Ordering::SeqCst) {
                        break;
                    }
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    for consumer in consumers {
        consumer.join().unwrap();
    }

    assert_eq!(consumed.load(Ordering::SeqCst), PRODUCERS * PER_PRODUCER);
    assert_eq!(violations.load(Ordering::SeqCst), 0);
    assert!(ch.is_empty());
    assert_eq!(ch.remaining_capacity(), CAPACITY);
}

#[test]
fn test_single_producer_order_is_fifo() {
    let ch = fail_fast(100, 10);
    for chunk in (0..50).collect::<Vec<_>>().chunks(10) {
        let mut tx = ch.transaction();
        tx.begin().unwrap();
        for i in chunk {
            tx.put(Event::new(i.to_string())).unwrap();
        }
        tx.commit().unwrap();
    }

    let mut seen = Vec::new();
    loop {
        let mut tx = ch.transaction();
        tx.begin().unwrap();
        let mut batch = Vec::new();
        while batch.len() < 7 {
            match tx.take().unwrap() {
                Some(e) => batch.push(String::from_utf8(e.body().to_vec()).unwrap()),
                None => break,
            }
        }
        tx.commit().unwrap();
        if batch.is_empty() {
            break;
        }
        seen.extend(batch);
    }

    let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
    assert_eq!(seen, expected);
}
