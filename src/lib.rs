#![deny(
    warnings,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_op_in_unsafe_fn,
    unused_crate_dependencies,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    rust_2018_idioms
)]

//! Lock-free ring-buffer queues with scoped reader and writer handles.
//!
//! Three flavors share one slot-claim protocol:
//!
//! - [`BoundedQueue`]: fixed capacity, any number of producers and consumers. Slots carry
//!   double-epoch tags so that a thread working on an outdated index never touches a slot
//!   that wrapped around the ring.
//! - [`SpscQueue`]: fixed capacity, one producer and one consumer. Each side has a cursor
//!   of its own, advanced without any compare-and-swap.
//! - [`UnboundedQueue`]: one producer and one consumer, growing by chained blocks that are
//!   recycled once drained.
//!
//! Producers use a [`Writer`], consumers a [`Reader`]. Dropping the last writer closes the
//! queue; readers then drain what is left and stop.
//!
//! # Examples
//!
//! Single Producer - Single Consumer:
//!
//! ```
//! use lf_ring::SpscQueue;
//! use std::thread;
//!
//! const COUNT: usize = 1_000;
//! let queue = SpscQueue::new(64);
//!
//! thread::scope(|s| {
//!     let mut writer = queue.writer().unwrap();
//!     s.spawn(move || {
//!         for i in 0..COUNT {
//!             writer.push(i);
//!         }
//!     });
//!
//!     let mut reader = queue.reader().unwrap();
//!     for i in 0..COUNT {
//!         assert_eq!(reader.pop(), Some(i));
//!     }
//!     assert_eq!(reader.pop(), None);
//! });
//! ```
//!
//! Multi Producer - Single Consumer:
//!
//! ```
//! use lf_ring::BoundedQueue;
//! use std::thread;
//!
//! const COUNT: usize = 1_000;
//! const CONCURRENCY: usize = 4;
//!
//! let queue = BoundedQueue::<_>::new(128);
//!
//! let received = thread::scope(|s| {
//!     let writers: Vec<_> = (0..CONCURRENCY).map(|_| queue.writer()).collect();
//!     for mut writer in writers {
//!         s.spawn(move || {
//!             for i in 0..COUNT {
//!                 writer.push(i);
//!             }
//!         });
//!     }
//!
//!     let mut reader = queue.reader();
//!     (0..COUNT * CONCURRENCY).filter_map(|_| reader.pop()).count()
//! });
//!
//! assert_eq!(received, COUNT * CONCURRENCY);
//! assert!(queue.try_pop().is_none());
//! ```
//!
//! Unbounded:
//!
//! ```
//! use lf_ring::UnboundedQueue;
//!
//! let queue = UnboundedQueue::with_pool_size(2);
//! let mut writer = queue.writer()?;
//! let mut reader = queue.reader()?;
//!
//! for i in 0..10_000 {
//!     writer.push(i);
//! }
//! for i in 0..10_000 {
//!     assert_eq!(reader.try_pop(), Some(i));
//! }
//! assert!(reader.is_live());
//!
//! drop(writer);
//! assert!(!reader.is_live());
//! # Ok::<(), lf_ring::AcquireError>(())
//! ```

mod backoff;
mod bounded;
mod config;
mod diag;
mod error;
mod handle;
mod spsc;
mod unbounded;

pub(crate) mod block;
pub(crate) mod cache_pad;
pub(crate) mod cursor;
pub(crate) mod ring;
pub(crate) mod slot;
pub(crate) mod tag;
pub(crate) mod variant;

pub use backoff::Backoff;
pub use bounded::BoundedQueue;
pub use cache_pad::CACHE_LINE_SIZE;
pub use config::UnboundedConfig;
pub use diag::QueueState;
pub use error::AcquireError;
pub use handle::{Endpoint, Reader, Writer};
pub use spsc::SpscQueue;
pub use tag::TagWidth;
pub use unbounded::UnboundedQueue;

// Only used by the integration tests, which share the dev-dependencies of the unit tests.
#[cfg(test)]
use tracing_subscriber as _;
