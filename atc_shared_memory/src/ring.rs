//! Cross-process command ring (bounded FIFO).
//!
//! Fixed-capacity circular buffer of [`CommandRecord`]s guarded by the
//! segment lock word. `head` is the next slot to dequeue, `tail` the
//! next free slot: empty iff `head == tail`, full iff
//! `(tail + 1) % N == head`, so usable capacity is `N - 1`. The producer
//! (analyzer) only advances `tail`, the consumer (relay) only advances
//! `head`; both under the lock.

use crate::error::{ShmError, ShmResult};
use crate::segment::Segment;
use atc::consts::MAX_COMMANDS;
use atc::wire::CommandRecord;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::error;

/// Ring indices at the head of the payload.
#[repr(C)]
struct RingState {
    head: AtomicU32,
    tail: AtomicU32,
}

/// Payload size: indices followed by the slot array.
const RING_PAYLOAD_SIZE: usize = core::mem::size_of::<RingState>()
    + core::mem::size_of::<[CommandRecord; MAX_COMMANDS]>();

/// Handle on the shared command ring.
pub struct CommandRing {
    segment: Segment,
}

impl CommandRing {
    /// Usable capacity: one slot is sacrificed to distinguish full from
    /// empty.
    pub const CAPACITY: usize = MAX_COMMANDS - 1;

    /// Create a fresh, empty ring segment.
    pub fn create(name: &str) -> ShmResult<Self> {
        let segment = Segment::create(name, RING_PAYLOAD_SIZE)?;
        Ok(Self { segment })
    }

    /// Attach to an existing ring segment.
    pub fn attach(name: &str) -> ShmResult<Self> {
        let segment = Segment::attach(name)?;
        Self::from_segment(segment)
    }

    /// Attach with bounded retry.
    pub fn attach_with_retry(name: &str, attempts: u32, interval: Duration) -> ShmResult<Self> {
        let segment = Segment::attach_with_retry(name, attempts, interval)?;
        Self::from_segment(segment)
    }

    fn from_segment(segment: Segment) -> ShmResult<Self> {
        if segment.payload_size() < RING_PAYLOAD_SIZE {
            return Err(ShmError::PayloadTooSmall {
                name: segment.name().to_string(),
                expected: RING_PAYLOAD_SIZE,
                actual: segment.payload_size(),
            });
        }
        Ok(Self { segment })
    }

    #[inline]
    fn state(&self) -> &RingState {
        unsafe { &*(self.segment.payload_ptr() as *const RingState) }
    }

    #[inline]
    fn slot_ptr(&self, index: usize) -> *mut CommandRecord {
        unsafe {
            (self
                .segment
                .payload_ptr()
                .add(core::mem::size_of::<RingState>()) as *mut CommandRecord)
                .add(index)
        }
    }

    /// Load indices under the lock, repairing out-of-range values.
    ///
    /// A corrupt index would otherwise walk past the slot array; the
    /// offending state is discarded and the ring reset to empty.
    fn indices(&self) -> (usize, usize) {
        let state = self.state();
        let head = state.head.load(Ordering::Relaxed) as usize;
        let tail = state.tail.load(Ordering::Relaxed) as usize;
        if head >= MAX_COMMANDS || tail >= MAX_COMMANDS {
            error!(
                ring = self.segment.name(),
                head, tail, "command ring indices out of range, resetting to empty"
            );
            state.head.store(0, Ordering::Relaxed);
            state.tail.store(0, Ordering::Relaxed);
            return (0, 0);
        }
        (head, tail)
    }

    /// Push a command. Surfaces [`ShmError::QueueFull`] without blocking.
    pub fn enqueue(&self, command: &CommandRecord) -> ShmResult<()> {
        let _guard = self.segment.lock();
        let (head, tail) = self.indices();

        let next = (tail + 1) % MAX_COMMANDS;
        if next == head {
            return Err(ShmError::QueueFull);
        }

        unsafe { self.slot_ptr(tail).write(*command) };
        self.state().tail.store(next as u32, Ordering::Release);
        Ok(())
    }

    /// Pop the oldest command, if any.
    pub fn dequeue(&self) -> Option<CommandRecord> {
        let _guard = self.segment.lock();
        let (head, tail) = self.indices();

        if head == tail {
            return None;
        }

        let command = unsafe { self.slot_ptr(head).read() };
        let next = (head + 1) % MAX_COMMANDS;
        self.state().head.store(next as u32, Ordering::Release);
        Some(command)
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        let _guard = self.segment.lock();
        let (head, tail) = self.indices();
        (tail + MAX_COMMANDS - head) % MAX_COMMANDS
    }

    /// Whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Segment name.
    pub fn name(&self) -> &str {
        self.segment.name()
    }
}
