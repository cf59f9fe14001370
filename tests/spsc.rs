#![cfg(not(loom))]

mod common;

use lf_ring::{AcquireError, SpscQueue};
use std::sync::Arc;
use std::thread;

// cargo test --package lf-ring --test spsc -- test_fifo --exact --nocapture
#[test]
fn test_fifo() {
    common::init_tracing();

    const COUNT: usize = 100_000;
    let queue = SpscQueue::new(16);

    thread::scope(|s| {
        let mut writer = queue.writer().unwrap();
        s.spawn(move || {
            for i in 0..COUNT {
                writer.push(i);
            }
        });

        let mut reader = queue.reader().unwrap();
        for i in 0..COUNT {
            assert_eq!(reader.pop(), Some(i));
        }
        assert_eq!(reader.pop(), None);
        assert!(!reader.is_live());
    });
}

// cargo test --package lf-ring --test spsc -- test_capacity_is_exact --exact --nocapture
#[test]
fn test_capacity_is_exact() {
    let queue = SpscQueue::new(3);
    let mut writer = queue.writer().unwrap();
    let mut reader = queue.reader().unwrap();

    for i in 0..3 {
        assert!(writer.try_push(i).is_ok());
    }
    assert_eq!(writer.try_push(3), Err(3));
    assert_eq!(queue.state().len_hint, Some(3));

    assert_eq!(reader.try_pop(), Some(0));
    assert!(writer.try_push(3).is_ok());
    assert_eq!(writer.try_push(4), Err(4));

    for i in 1..=3 {
        assert_eq!(reader.try_pop(), Some(i));
    }
    assert_eq!(reader.try_pop(), None);
}

// cargo test --package lf-ring --test spsc -- test_single_writer_and_reader --exact --nocapture
#[test]
fn test_single_writer_and_reader() {
    let queue = SpscQueue::<u32>::new(4);

    let writer = queue.writer().unwrap();
    assert_eq!(queue.writer().unwrap_err(), AcquireError::TooManyWriters);

    let reader = queue.reader().unwrap();
    assert_eq!(queue.reader().unwrap_err(), AcquireError::TooManyReaders);
    assert_eq!(
        AcquireError::TooManyReaders.to_string(),
        "queue already has a reader"
    );

    let state = queue.state();
    assert_eq!((state.readers, state.writers), (1, 1));

    drop(reader);
    assert!(queue.reader().is_ok());

    drop(writer);
    assert!(queue.writer().is_ok());
}

// cargo test --package lf-ring --test spsc -- test_acquisition_race --exact --nocapture
#[test]
fn test_acquisition_race() {
    let queue = SpscQueue::<u32>::new(4);
    let barrier = std::sync::Barrier::new(8);

    let (writers, readers) = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = &queue;
                let barrier = &barrier;
                s.spawn(move || {
                    let writer = queue.writer();
                    let reader = queue.reader();
                    // Hold on to whatever we got until everyone tried.
                    let _ = barrier.wait();
                    (usize::from(writer.is_ok()), usize::from(reader.is_ok()))
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .fold((0, 0), |(w, r), (dw, dr)| (w + dw, r + dr))
    });

    assert_eq!(writers, 1);
    assert_eq!(readers, 1);
}

// cargo test --package lf-ring --test spsc -- test_handles_resume_cursors --exact --nocapture
#[test]
fn test_handles_resume_cursors() {
    let queue = SpscQueue::new(4);

    {
        let mut writer = queue.writer().unwrap();
        for i in 0..3 {
            writer.push(i);
        }
    }
    {
        let mut reader = queue.reader().unwrap();
        assert_eq!(reader.try_pop(), Some(0));
        assert_eq!(reader.try_pop(), Some(1));
    }

    // A second writer continues after the items of the first one.
    {
        let mut writer = queue.writer().unwrap();
        for i in 3..6 {
            assert!(writer.try_push(i).is_ok());
        }
        assert_eq!(writer.try_push(6), Err(6));
    }

    let reader = queue.reader().unwrap();
    assert!(reader.eq(2..6));
}

// cargo test --package lf-ring --test spsc -- test_closed_queue_converges --exact --nocapture
#[test]
fn test_closed_queue_converges() {
    let queue = SpscQueue::new(8);
    let mut reader = queue.reader().unwrap();

    let mut writer = queue.writer().unwrap();
    writer.push('a');
    writer.push('b');
    assert!(reader.is_live());
    drop(writer);

    assert!(queue.is_closed());
    assert!(reader.is_live());
    assert_eq!(reader.pop(), Some('a'));
    assert_eq!(reader.pop(), Some('b'));
    assert!(!reader.is_live());
    assert_eq!(reader.pop(), None);
}

// cargo test --package lf-ring --test spsc -- test_drop_releases_items --exact --nocapture
#[test]
fn test_drop_releases_items() {
    let item = Arc::new(());

    {
        let queue = SpscQueue::new(4);
        let mut writer = queue.writer().unwrap();
        for _ in 0..4 {
            writer.push(Arc::clone(&item));
        }
        let mut reader = queue.reader().unwrap();
        drop(reader.try_pop());
        assert_eq!(Arc::strong_count(&item), 4);
    }

    assert_eq!(Arc::strong_count(&item), 1);
}

// cargo test --package lf-ring --test spsc -- test_state --exact --nocapture
#[test]
fn test_state() {
    common::init_tracing();

    let mut queue = SpscQueue::default();
    assert_eq!(queue.capacity(), 2048);

    queue.writer().unwrap().push(42u64);
    assert_eq!(
        queue.state().to_string(),
        "len: 1 | closed: true | readers: 0 | writers: 0"
    );

    queue.trace_state();
    queue.debug_ring();
}

// cargo test --package lf-ring --test spsc -- test_leaked_handles --exact --nocapture
#[test]
fn test_leaked_handles() {
    let item = Arc::new(());

    {
        let queue = SpscQueue::new(4);
        let mut writer = queue.writer().unwrap();
        for _ in 0..3 {
            writer.push(Arc::clone(&item));
        }
        std::mem::forget(writer);

        let mut reader = queue.reader().unwrap();
        drop(reader.pop());
        std::mem::forget(reader);

        assert_eq!(queue.reader().unwrap_err(), AcquireError::TooManyReaders);
        assert_eq!(queue.writer().unwrap_err(), AcquireError::TooManyWriters);
        assert!(!queue.is_closed());
        assert_eq!(Arc::strong_count(&item), 3);
    }

    assert_eq!(Arc::strong_count(&item), 1);
}
