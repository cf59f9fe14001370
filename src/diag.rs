//! Advisory snapshots of a queue, for debugging.
//!
//! Snapshots read the shared atomics without any synchronization beyond what the queues
//! already do, so under load the fields may not be mutually consistent.

use std::fmt;

/// A snapshot of the bookkeeping of a queue.
///
/// Returned by the `state` method of every queue and emitted as a `tracing` event by
/// `trace_state`.
///
/// # Examples
///
/// ```
/// use lf_ring::BoundedQueue;
///
/// let queue = BoundedQueue::<u32>::new(8);
/// let _writer = queue.writer();
/// queue.push(7);
///
/// let state = queue.state();
/// assert_eq!(state.writers, 1);
/// assert_eq!(state.len_hint, Some(1));
/// assert_eq!(state.to_string(), "[0 -> 1] len: 1 | closed: false | readers: 0 | writers: 1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueState {
    /// The consumer cursor, when it is shared and thus observable.
    pub read_from: Option<usize>,
    /// The producer cursor, when it is shared and thus observable.
    pub write_to: Option<usize>,
    /// Approximate number of items in flight, when the queue can tell.
    pub len_hint: Option<usize>,
    /// Whether the queue has been closed.
    pub closed: bool,
    /// Number of live readers.
    pub readers: usize,
    /// Number of live writers.
    pub writers: usize,
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(read_from), Some(write_to)) = (self.read_from, self.write_to) {
            write!(f, "[{} -> {}] ", read_from, write_to)?;
        }
        if let Some(len) = self.len_hint {
            write!(f, "len: {} | ", len)?;
        }
        write!(
            f,
            "closed: {} | readers: {} | writers: {}",
            self.closed, self.readers, self.writers
        )
    }
}

/// Emits `state` as a `debug` event tagged with the queue `kind`.
pub(crate) fn trace_state(kind: &'static str, state: &QueueState) {
    tracing::debug!(
        queue = kind,
        read_from = ?state.read_from,
        write_to = ?state.write_to,
        len_hint = ?state.len_hint,
        closed = state.closed,
        readers = state.readers,
        writers = state.writers,
        "queue state"
    );
}
