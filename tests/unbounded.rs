#![cfg(not(loom))]

mod common;

use lf_ring::{AcquireError, UnboundedConfig, UnboundedQueue};
use std::sync::Arc;
use std::thread;

fn small(chunk_size: usize, free_blocks: usize) -> UnboundedQueue<usize> {
    UnboundedQueue::with_config(
        UnboundedConfig::new()
            .chunk_size(chunk_size)
            .free_blocks(free_blocks),
    )
}

// cargo test --package lf-ring --test unbounded -- test_growth --exact --nocapture
#[test]
fn test_growth() {
    common::init_tracing();

    let queue = small(2, 1);
    let mut writer = queue.writer().unwrap();
    let mut reader = queue.reader().unwrap();

    for i in 1..=10 {
        assert!(writer.try_push(i).is_ok());
    }
    assert_eq!(queue.block_count(), 5);

    for i in 1..=10 {
        assert_eq!(reader.try_pop(), Some(i));
    }
    assert_eq!(reader.try_pop(), None);

    // Four blocks were drained but only one fits in the recycler.
    assert!(queue.block_count() <= 2);
    queue.trace_state();
}

// cargo test --package lf-ring --test unbounded -- test_recycling_bounds_memory --exact --nocapture
#[test]
fn test_recycling_bounds_memory() {
    let queue = small(4, 2);
    let mut writer = queue.writer().unwrap();
    let mut reader = queue.reader().unwrap();

    // Never more than two blocks in flight: the drained one is reused by the writer.
    for i in 0..1_000 {
        writer.push(i);
        writer.push(i + 1);
        assert_eq!(reader.try_pop(), Some(i));
        assert_eq!(reader.try_pop(), Some(i + 1));
    }

    assert!(queue.block_count() <= 3, "{} blocks", queue.block_count());
}

// cargo test --package lf-ring --test unbounded -- test_without_recycler --exact --nocapture
#[test]
fn test_without_recycler() {
    let queue = small(2, 0);
    let mut writer = queue.writer().unwrap();
    let mut reader = queue.reader().unwrap();

    for i in 0..9 {
        writer.push(i);
    }
    assert_eq!(queue.block_count(), 5);

    for i in 0..9 {
        assert_eq!(reader.try_pop(), Some(i));
    }
    assert_eq!(queue.block_count(), 1);
}

// cargo test --package lf-ring --test unbounded -- test_fifo --exact --nocapture
#[test]
fn test_fifo() {
    const COUNT: usize = 100_000;
    let queue = small(64, 4);

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
    });
}

// cargo test --package lf-ring --test unbounded -- test_liveness_across_blocks --exact --nocapture
#[test]
fn test_liveness_across_blocks() {
    let queue = small(2, 1);
    let mut reader = queue.reader().unwrap();

    {
        let mut writer = queue.writer().unwrap();
        writer.push(0);
        writer.push(1);
        writer.push(2);
    }

    assert_eq!(reader.try_pop(), Some(0));
    assert_eq!(reader.try_pop(), Some(1));
    // The reader stands at the end of its block; the next item is in the following one.
    assert!(reader.is_live());
    assert_eq!(reader.try_pop(), Some(2));
    assert!(!reader.is_live());
}

// cargo test --package lf-ring --test unbounded -- test_single_writer_and_reader --exact --nocapture
#[test]
fn test_single_writer_and_reader() {
    let queue = UnboundedQueue::<u8>::default();

    let _writer = queue.writer().unwrap();
    let _reader = queue.reader().unwrap();

    assert_eq!(queue.writer().unwrap_err(), AcquireError::TooManyWriters);
    assert_eq!(queue.reader().unwrap_err(), AcquireError::TooManyReaders);
}

// cargo test --package lf-ring --test unbounded -- test_handles_resume_cursors --exact --nocapture
#[test]
fn test_handles_resume_cursors() {
    let queue = small(2, 1);

    for round in 0..5 {
        let mut writer = queue.writer().unwrap();
        writer.push(2 * round);
        writer.push(2 * round + 1);
        drop(writer);

        let mut reader = queue.reader().unwrap();
        assert_eq!(reader.pop(), Some(2 * round));
        assert_eq!(reader.pop(), Some(2 * round + 1));
    }
}

// cargo test --package lf-ring --test unbounded -- test_drop_releases_items_and_blocks --exact --nocapture
#[test]
fn test_drop_releases_items_and_blocks() {
    let item = Arc::new(());

    {
        let queue = UnboundedQueue::with_config(UnboundedConfig::new().chunk_size(3));
        let mut writer = queue.writer().unwrap();
        let mut reader = queue.reader().unwrap();

        for _ in 0..10 {
            writer.push(Arc::clone(&item));
        }
        for _ in 0..4 {
            drop(reader.try_pop());
        }
        assert_eq!(Arc::strong_count(&item), 7);
    }

    assert_eq!(Arc::strong_count(&item), 1);
}

// cargo test --package lf-ring --test unbounded -- test_with_pool_size --exact --nocapture
#[test]
fn test_with_pool_size() {
    let mut queue = UnboundedQueue::with_pool_size(0);
    assert_eq!(queue.chunk_size(), 1024);

    queue.writer().unwrap().push("x");
    assert_eq!(
        queue.state().to_string(),
        "closed: true | readers: 0 | writers: 0"
    );

    queue.debug_ring();
    assert!(format!("{:?}", queue).starts_with("UnboundedQueue"));
}

// cargo test --package lf-ring --test unbounded -- test_leaked_reader_keeps_queue_sound --exact --nocapture
#[test]
fn test_leaked_reader_keeps_queue_sound() {
    common::init_tracing();

    let item = Arc::new(());

    {
        let mut queue =
            UnboundedQueue::with_config(UnboundedConfig::new().chunk_size(2).free_blocks(0));
        let mut writer = queue.writer().unwrap();
        for _ in 0..6 {
            writer.push(Arc::clone(&item));
        }
        drop(writer);

        // The reader moves into the second block, freeing the first, then leaks.
        let mut reader = queue.reader().unwrap();
        for _ in 0..3 {
            drop(reader.pop());
        }
        std::mem::forget(reader);
        assert_eq!(Arc::strong_count(&item), 4);

        // The seat stays taken.
        assert_eq!(queue.reader().unwrap_err(), AcquireError::TooManyReaders);

        // Walks the chain from the block the leaked reader moved to.
        queue.debug_ring();
        assert_eq!(queue.block_count(), 2);
    }

    assert_eq!(Arc::strong_count(&item), 1);
}

// cargo test --package lf-ring --test unbounded -- test_leaked_writer_keeps_queue_sound --exact --nocapture
#[test]
fn test_leaked_writer_keeps_queue_sound() {
    let item = Arc::new(());

    {
        let queue =
            UnboundedQueue::with_config(UnboundedConfig::new().chunk_size(2).free_blocks(1));
        let mut writer = queue.writer().unwrap();
        let mut reader = queue.reader().unwrap();

        // Drained blocks go through the recycler and come back to the writer.
        for _ in 0..7 {
            writer.push(Arc::clone(&item));
            drop(reader.try_pop());
        }
        writer.push(Arc::clone(&item));
        std::mem::forget(writer);
        drop(reader);

        // A leaked writer never closes the queue.
        assert!(!queue.is_closed());
        assert_eq!(queue.writer().unwrap_err(), AcquireError::TooManyWriters);

        // The next reader sees the item pushed last by the leaked writer.
        let mut reader = queue.reader().unwrap();
        assert!(reader.try_pop().is_some());
        assert!(reader.try_pop().is_none());
        assert!(reader.is_live());
    }

    assert_eq!(Arc::strong_count(&item), 1);
}
