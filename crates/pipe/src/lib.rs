//! The token pipe: a buffer of XML node events decoupling a push-side
//! producer (the transformation engine driving a writer sink) from the
//! pull-side consumer (the reader facade).
//!
//! Two variants share one contract. [`BufferedPipe`] is the single-threaded
//! one: the whole transformation runs to completion before the first read,
//! so the buffer only ever appends. [`ThreadedPipe`] is a bounded ring for
//! the producer/consumer configuration: the producer blocks when the ring is
//! full, the consumer blocks when it is empty, and a producer-side failure
//! is transported to the consumer and re-raised from its next `read`.

mod buffered;
mod threaded;
mod token;

pub use buffered::BufferedPipe;
pub use threaded::ThreadedPipe;
pub use token::{NodeKind, XmlToken};

use std::sync::Arc;

use xslpull_qname::QName;
use xslpull_traits::{TransformError, WriteError};

/// The pipe contract shared by both threading variants.
///
/// Cursor semantics: tokens between the free cursor and the write cursor are
/// live. `read` hands out the next unread live token in strict write order.
/// `free_tokens` releases the oldest `count` live tokens and rewinds the
/// read cursor to the new start, so the first unfreed token is read again;
/// this is what lets the consumer re-inspect an element's attribute run via
/// `get_token` without consuming it.
pub trait TokenPipe: Send + Sync {
    /// Appends a token. Never loses a token: the single-threaded variant
    /// grows, the threaded variant blocks until space is freed (or grows
    /// when no written token is still awaiting delivery).
    fn write(&self, kind: NodeKind, name: Option<Arc<QName>>, value: Arc<str>)
    -> Result<(), WriteError>;

    /// Returns the next unread token, blocking in the threaded variant. A
    /// transported producer-side failure is re-raised here.
    fn read(&self) -> Result<XmlToken, TransformError>;

    /// Releases the oldest `count` live tokens and rewinds the read cursor.
    fn free_tokens(&self, count: usize);

    /// Random access into the live window: `offset` 0 is the oldest unfreed
    /// token. Returns `None` outside the window.
    fn get_token(&self, offset: usize) -> Option<XmlToken>;

    /// Writes the end-of-stream sentinel.
    fn close(&self) -> Result<(), WriteError>;

    /// Transports a producer-side failure to the consumer.
    fn write_error(&self, error: TransformError);

    /// Clears cursors, buffered tokens and any transported error so the pipe
    /// can serve a fresh transformation run.
    fn reset(&self);

    /// Makes every current and future producer `write` fail with
    /// [`WriteError::Cancelled`], waking a blocked producer.
    fn cancel(&self);
}
