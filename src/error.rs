use thiserror::Error;

/// Errors returned when acquiring a handle on a single-ended queue.
///
/// A [`SpscQueue`] or an [`UnboundedQueue`] serves exactly one [`Writer`] and one
/// [`Reader`] at a time. Asking for a second one while the first is alive is a usage error
/// and is reported here instead of being silently allowed. Dropping the live handle makes the
/// role available again.
///
/// [`SpscQueue`]: crate::SpscQueue
/// [`UnboundedQueue`]: crate::UnboundedQueue
/// [`Writer`]: crate::Writer
/// [`Reader`]: crate::Reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AcquireError {
    /// The queue already has a live reader.
    #[error("queue already has a reader")]
    TooManyReaders,
    /// The queue already has a live writer.
    #[error("queue already has a writer")]
    TooManyWriters,
}
