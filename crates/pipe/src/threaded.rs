use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use log::{debug, trace};
use xslpull_qname::QName;
use xslpull_traits::{TransformError, WriteError};

use crate::token::{NodeKind, XmlToken};
use crate::TokenPipe;

const DEFAULT_CAPACITY: usize = 256;

/// Cross-thread pipe: a power-of-two ring with mask indexing.
///
/// The producer blocks when the ring is full and some written token is still
/// awaiting delivery; when every written token has been handed out (but not
/// necessarily freed), the ring doubles instead, remapping the live window
/// from the old mask to the new one. The consumer blocks when no unread
/// token exists. One mutex/condvar pair guards the cursors; neither side
/// holds the lock while doing engine work or I/O.
///
/// The producer only notifies the consumer once the ring fills (plus on
/// close and on error), which keeps hand-offs coarse. The two sides can
/// never both be waiting: the consumer waits only on an empty window, the
/// producer only on a full one.
pub struct ThreadedPipe {
    state: Mutex<Ring>,
    cond: Condvar,
}

struct Ring {
    slots: Vec<Option<XmlToken>>,
    mask: usize,
    write_pos: usize,
    read_start: usize,
    read_end: usize,
    error: Option<TransformError>,
    failed: bool,
    cancelled: bool,
}

impl Ring {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.write_pos == self.read_start + self.capacity()
    }

    /// Doubles the ring, remapping every live token from old-mask to
    /// new-mask indexing. Only sound while no written token is awaiting
    /// delivery (`write_pos == read_end`), which the callers guarantee.
    fn grow(&mut self) {
        let new_mask = (self.mask << 1) | 1;
        let mut slots = vec![None; new_mask + 1];
        for index in self.read_start..self.write_pos {
            slots[index & new_mask] = self.slots[index & self.mask].take();
        }
        self.slots = slots;
        self.mask = new_mask;
        debug!("token ring grown to {} slots", self.capacity());
    }
}

impl ThreadedPipe {
    /// `initial_capacity` is rounded up to the next power of two; values
    /// below 2 fall back to the default of 256.
    pub fn new(initial_capacity: usize) -> Self {
        let capacity = if initial_capacity < 2 {
            DEFAULT_CAPACITY
        } else {
            initial_capacity.next_power_of_two()
        };
        Self {
            state: Mutex::new(Ring {
                slots: vec![None; capacity],
                mask: capacity - 1,
                write_pos: 0,
                read_start: 0,
                read_end: 0,
                error: None,
                failed: false,
                cancelled: false,
            }),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Ring>) -> MutexGuard<'a, Ring> {
        self.cond
            .wait(guard)
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenPipe for ThreadedPipe {
    fn write(
        &self,
        kind: NodeKind,
        name: Option<Arc<QName>>,
        value: Arc<str>,
    ) -> Result<(), WriteError> {
        let mut ring = self.lock();
        loop {
            if ring.cancelled {
                return Err(WriteError::Cancelled);
            }
            if !ring.is_full() {
                break;
            }
            if ring.write_pos == ring.read_end {
                // Every written token has been delivered; growing cannot
                // disturb an in-flight index.
                ring.grow();
                break;
            }
            trace!("producer waiting: ring full, {} unread", ring.write_pos - ring.read_end);
            ring = self.wait(ring);
        }
        let mask = ring.mask;
        let slot = ring.write_pos & mask;
        ring.slots[slot] = Some(XmlToken::new(kind, name, value));
        ring.write_pos += 1;
        if ring.is_full() {
            // Wake the consumer only once a full ring's worth is available,
            // keeping producer/consumer hand-offs coarse.
            self.cond.notify_all();
        }
        Ok(())
    }

    fn read(&self) -> Result<XmlToken, TransformError> {
        let mut ring = self.lock();
        loop {
            if let Some(error) = ring.error.take() {
                ring.failed = true;
                self.cond.notify_all();
                return Err(error);
            }
            if ring.failed {
                return Err(TransformError::Engine(
                    "transformation already failed".to_string(),
                ));
            }
            if ring.read_end < ring.write_pos {
                break;
            }
            if ring.read_end == ring.read_start + ring.capacity() {
                // The whole ring is one undelivered element start tag; the
                // producer cannot continue and neither can we. Make room.
                ring.grow();
                self.cond.notify_all();
            }
            trace!("consumer waiting: ring empty at {}", ring.read_end);
            ring = self.wait(ring);
        }
        let slot = ring.read_end & ring.mask;
        let token = match ring.slots[slot].clone() {
            Some(token) => token,
            None => XmlToken::sentinel(),
        };
        ring.read_end += 1;
        Ok(token)
    }

    fn free_tokens(&self, count: usize) {
        let mut ring = self.lock();
        ring.read_start += count;
        ring.read_end = ring.read_start;
        self.cond.notify_all();
    }

    fn get_token(&self, offset: usize) -> Option<XmlToken> {
        let ring = self.lock();
        let index = ring.read_start + offset;
        if index < ring.read_end {
            ring.slots[index & ring.mask].clone()
        } else {
            None
        }
    }

    fn close(&self) -> Result<(), WriteError> {
        self.write(NodeKind::None, None, Arc::from(""))?;
        self.cond.notify_all();
        Ok(())
    }

    fn write_error(&self, error: TransformError) {
        let mut ring = self.lock();
        ring.error = Some(error);
        self.cond.notify_all();
    }

    fn reset(&self) {
        let mut ring = self.lock();
        for slot in ring.slots.iter_mut() {
            *slot = None;
        }
        ring.write_pos = 0;
        ring.read_start = 0;
        ring.read_end = 0;
        ring.error = None;
        ring.failed = false;
        ring.cancelled = false;
    }

    fn cancel(&self) {
        let mut ring = self.lock();
        ring.cancelled = true;
        self.cond.notify_all();
    }
}
