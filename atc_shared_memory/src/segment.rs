//! Shared memory segment structure and lifecycle.
//!
//! Every ATC segment starts with a cache-line-aligned [`SegmentHeader`]
//! followed by the protocol payload. The header's `write_seq` drives the
//! snapshot seqlock (odd = write in progress, even = committed) and the
//! `lock_word` provides the cross-process spinlock used by the command
//! ring and registry.

use crate::error::{ShmError, ShmResult};
use crate::platform::{
    attach_segment_mmap, create_segment_mmap, current_pid, unlink_segment,
};
use memmap2::MmapMut;
use static_assertions::const_assert_eq;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Magic number identifying a valid ATC segment: `"ATCSHM01"`.
pub const ATC_SHM_MAGIC: u64 = u64::from_le_bytes(*b"ATCSHM01");

/// Smallest accepted payload.
pub const PAYLOAD_MIN_SIZE: usize = 8;

/// Largest accepted payload. Every ATC payload is under a page; this cap
/// exists to catch corrupted size fields, not to ration memory.
pub const PAYLOAD_MAX_SIZE: usize = 1024 * 1024;

/// Segment header with cache-line alignment.
#[repr(C, align(64))]
pub struct SegmentHeader {
    /// Magic number for validation.
    pub magic: u64,
    /// Seqlock word. Odd = write in progress, even = committed.
    pub write_seq: AtomicU64,
    /// Creator process ID.
    pub creator_pid: AtomicU32,
    /// Cross-process spinlock word (0 = free, 1 = held).
    pub lock_word: AtomicU32,
    /// Payload section size in bytes.
    pub payload_size: u64,
    /// Creation timestamp [ns since epoch].
    pub created_ts: u64,
    _padding: [u8; 24],
}

const_assert_eq!(core::mem::size_of::<SegmentHeader>(), 64);
const_assert_eq!(core::mem::align_of::<SegmentHeader>(), 64);

impl SegmentHeader {
    fn init(&mut self, payload_size: usize) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        self.magic = ATC_SHM_MAGIC;
        self.write_seq = AtomicU64::new(0);
        self.creator_pid = AtomicU32::new(current_pid());
        self.lock_word = AtomicU32::new(0);
        self.payload_size = payload_size as u64;
        self.created_ts = now;
        self._padding = [0; 24];
    }

    /// Validate header magic.
    pub fn validate(&self, name: &str) -> ShmResult<()> {
        if self.magic != ATC_SHM_MAGIC {
            return Err(ShmError::InvalidMagic {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

/// An mmap-backed shared memory segment: header + payload.
///
/// The base pointer is cached at map time so header and payload access
/// work through `&self`; all mutation goes through atomics or a protocol
/// layer that provides its own exclusion (seqlock, lock word, mailbox
/// sequence pair).
pub struct Segment {
    name: String,
    payload_size: usize,
    base: *mut u8,
    /// Keeps the mapping alive; never accessed directly after init.
    _mmap: MmapMut,
    /// Creator unlinks the backing file on drop.
    owned: bool,
}

// Access to the raw base pointer is mediated by the atomic protocols
// layered on top (seqlock / lock word / sequence pair), so handles may
// move between and be shared across threads.
unsafe impl Send for Segment {}
unsafe impl Sync for Segment {}

impl Segment {
    /// Create a new segment and zero-fill its payload.
    pub fn create(name: &str, payload_size: usize) -> ShmResult<Self> {
        validate_payload_size(payload_size)?;

        let total_size = core::mem::size_of::<SegmentHeader>() + payload_size;
        let mut mmap = create_segment_mmap(name, total_size)?;
        let base = mmap.as_mut_ptr();

        // Backing file starts zero-filled; only the header needs writing.
        let header = unsafe { &mut *(base as *mut SegmentHeader) };
        header.init(payload_size);

        Ok(Self {
            name: name.to_string(),
            payload_size,
            base,
            _mmap: mmap,
            owned: true,
        })
    }

    /// Attach to an existing segment, validating magic and size.
    pub fn attach(name: &str) -> ShmResult<Self> {
        let mut mmap = attach_segment_mmap(name)?;
        let header_size = core::mem::size_of::<SegmentHeader>();
        if mmap.len() < header_size {
            return Err(ShmError::PayloadTooSmall {
                name: name.to_string(),
                expected: header_size,
                actual: mmap.len(),
            });
        }

        let base = mmap.as_mut_ptr();
        let header = unsafe { &*(base as *const SegmentHeader) };
        header.validate(name)?;

        let payload_size = header.payload_size as usize;
        if header_size + payload_size > mmap.len() {
            return Err(ShmError::PayloadTooSmall {
                name: name.to_string(),
                expected: header_size + payload_size,
                actual: mmap.len(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            payload_size,
            base,
            _mmap: mmap,
            owned: false,
        })
    }

    /// Attach with bounded retry, for peers that may start first.
    pub fn attach_with_retry(name: &str, attempts: u32, interval: Duration) -> ShmResult<Self> {
        let mut last = ShmError::NotFound {
            name: name.to_string(),
        };
        for attempt in 0..attempts.max(1) {
            match Self::attach(name) {
                Ok(segment) => return Ok(segment),
                Err(e @ ShmError::NotFound { .. }) | Err(e @ ShmError::Io { .. }) => {
                    tracing::warn!(
                        segment = name,
                        attempt = attempt + 1,
                        attempts,
                        "segment not available yet: {e}"
                    );
                    last = e;
                    std::thread::sleep(interval);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last)
    }

    /// Segment header.
    #[inline]
    pub fn header(&self) -> &SegmentHeader {
        unsafe { &*(self.base as *const SegmentHeader) }
    }

    /// Start of the payload section.
    #[inline]
    pub fn payload_ptr(&self) -> *mut u8 {
        unsafe { self.base.add(core::mem::size_of::<SegmentHeader>()) }
    }

    /// Payload section size.
    #[inline]
    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Segment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Require the payload to hold at least a `T`.
    pub fn require_payload<T>(&self) -> ShmResult<()> {
        let need = core::mem::size_of::<T>();
        if self.payload_size < need {
            return Err(ShmError::PayloadTooSmall {
                name: self.name.clone(),
                expected: need,
                actual: self.payload_size,
            });
        }
        Ok(())
    }

    // ─── Cross-process spinlock over the header lock word ───────────

    /// Acquire the segment lock word. Critical sections in this codebase
    /// are O(ring capacity) at worst, so a spin-then-yield loop is
    /// sufficient.
    pub fn lock(&self) -> SegmentLockGuard<'_> {
        let word = &self.header().lock_word;
        let mut spins: u32 = 0;
        while word
            .compare_exchange_weak(0, 1, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spins = spins.wrapping_add(1);
            if spins < 64 {
                core::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
        SegmentLockGuard { segment: self }
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        if self.owned {
            unlink_segment(&self.name);
        }
    }
}

/// RAII guard for the segment lock word.
pub struct SegmentLockGuard<'a> {
    segment: &'a Segment,
}

impl Drop for SegmentLockGuard<'_> {
    fn drop(&mut self) {
        self.segment
            .header()
            .lock_word
            .store(0, Ordering::Release);
    }
}

/// Validate payload size constraints.
pub fn validate_payload_size(size: usize) -> ShmResult<()> {
    if !(PAYLOAD_MIN_SIZE..=PAYLOAD_MAX_SIZE).contains(&size) {
        return Err(ShmError::InvalidSize { size });
    }
    Ok(())
}

// ─── Payload copy helpers ───────────────────────────────────────────

/// Copy a value into a payload pointer byte-wise.
///
/// # Safety
/// `dst` must point at a writable region of at least `size_of::<T>()`
/// bytes; exclusion against concurrent readers is the caller's protocol.
#[inline]
pub(crate) unsafe fn write_payload<T: Copy>(dst: *mut u8, value: &T) {
    core::ptr::copy_nonoverlapping(
        value as *const T as *const u8,
        dst,
        core::mem::size_of::<T>(),
    );
}

/// Copy a value out of a payload pointer byte-wise.
///
/// # Safety
/// `src` must point at a readable region of at least `size_of::<T>()`
/// bytes. `T` must be valid for every bit pattern (all ATC wire structs
/// are numeric-only), since the copy may race with a writer and be
/// discarded by the seqlock check afterwards.
#[inline]
pub(crate) unsafe fn read_payload<T: Copy>(src: *const u8) -> T {
    let mut out = core::mem::MaybeUninit::<T>::uninit();
    core::ptr::copy_nonoverlapping(
        src,
        out.as_mut_ptr() as *mut u8,
        core::mem::size_of::<T>(),
    );
    out.assume_init()
}
