//! Single-writer multi-reader snapshot slot (seqlock).
//!
//! The writer bumps the header's `write_seq` to odd, copies the payload,
//! then bumps to even. Readers copy the payload between two even,
//! identical sequence reads; a mismatch means a concurrent write and the
//! copy is discarded. Sequence numbers only grow, so a completed read is
//! never older than any earlier completed read in the same task.

use crate::error::{ShmError, ShmResult};
use crate::segment::{read_payload, write_payload, Segment};
use std::marker::PhantomData;
use std::sync::atomic::{fence, Ordering};
use std::time::Duration;

/// Retries before a read reports [`ShmError::VersionConflict`]. A
/// conflict requires colliding with a writer this many times in a row;
/// in practice the copy is microseconds and the writer ticks at 1 Hz.
const MAX_READ_RETRIES: u32 = 64;

/// Exclusive writing end of a snapshot slot.
pub struct SlotWriter<T: Copy> {
    segment: Segment,
    _marker: PhantomData<T>,
}

impl<T: Copy> SlotWriter<T> {
    /// Create a fresh slot segment sized for `T`.
    pub fn create(name: &str) -> ShmResult<Self> {
        let segment = Segment::create(name, core::mem::size_of::<T>())?;
        Ok(Self {
            segment,
            _marker: PhantomData,
        })
    }

    /// Attach to a pre-created slot segment (supervisor owns creation).
    pub fn attach(name: &str) -> ShmResult<Self> {
        let segment = Segment::attach(name)?;
        segment.require_payload::<T>()?;
        Ok(Self {
            segment,
            _marker: PhantomData,
        })
    }

    /// Attach with bounded retry.
    pub fn attach_with_retry(name: &str, attempts: u32, interval: Duration) -> ShmResult<Self> {
        let segment = Segment::attach_with_retry(name, attempts, interval)?;
        segment.require_payload::<T>()?;
        Ok(Self {
            segment,
            _marker: PhantomData,
        })
    }

    /// Atomically replace the slot contents.
    pub fn publish(&mut self, value: &T) {
        let seq = &self.segment.header().write_seq;

        // Begin write: odd sequence tells readers to retry.
        let current = seq.load(Ordering::Relaxed);
        seq.store(current + 1, Ordering::Release);
        fence(Ordering::Release);

        unsafe { write_payload(self.segment.payload_ptr(), value) };

        // Commit: even sequence, strictly greater than any prior commit.
        fence(Ordering::Release);
        seq.store(current + 2, Ordering::Release);
    }

    /// Current committed sequence number.
    pub fn version(&self) -> u64 {
        self.segment.header().write_seq.load(Ordering::Acquire)
    }

    /// Segment name.
    pub fn name(&self) -> &str {
        self.segment.name()
    }
}

/// Reading end of a snapshot slot. One instance per reading thread.
pub struct SlotReader<T: Copy> {
    segment: Segment,
    last_version: u64,
    _marker: PhantomData<T>,
}

impl<T: Copy> SlotReader<T> {
    /// Attach to an existing slot segment.
    pub fn attach(name: &str) -> ShmResult<Self> {
        let segment = Segment::attach(name)?;
        segment.require_payload::<T>()?;
        Ok(Self {
            segment,
            last_version: 0,
            _marker: PhantomData,
        })
    }

    /// Attach with bounded retry.
    pub fn attach_with_retry(name: &str, attempts: u32, interval: Duration) -> ShmResult<Self> {
        let segment = Segment::attach_with_retry(name, attempts, interval)?;
        segment.require_payload::<T>()?;
        Ok(Self {
            segment,
            last_version: 0,
            _marker: PhantomData,
        })
    }

    /// Copy out a coherent value.
    pub fn read(&mut self) -> ShmResult<T> {
        let seq = &self.segment.header().write_seq;

        for _ in 0..MAX_READ_RETRIES {
            let before = seq.load(Ordering::Acquire);
            if before & 1 != 0 {
                core::hint::spin_loop();
                continue;
            }

            let value = unsafe { read_payload::<T>(self.segment.payload_ptr()) };

            fence(Ordering::Acquire);
            let after = seq.load(Ordering::Acquire);
            if before == after {
                self.last_version = after;
                return Ok(value);
            }
        }

        Err(ShmError::VersionConflict {
            name: self.segment.name().to_string(),
        })
    }

    /// Whether a commit newer than the last successful read exists.
    pub fn has_changed(&self) -> bool {
        let seq = self.segment.header().write_seq.load(Ordering::Acquire);
        seq & 1 == 0 && seq != self.last_version
    }

    /// Sequence number of the last successful read.
    pub fn version(&self) -> u64 {
        self.last_version
    }
}
