//! Synchronous single-client single-server rendezvous mailbox.
//!
//! Two monotone sequence words drive the exchange: the client writes its
//! request and bumps `req_seq`; the server answers and sets `rsp_seq` to
//! match. `req_seq == rsp_seq` means idle, `req_seq == rsp_seq + 1`
//! means a request is in flight. Exactly one reply per request; the
//! client waits with a bounded timeout and never retries in-line.
//!
//! Layout: header | seq pair (one cache line) | request | response.

use crate::error::{ShmError, ShmResult};
use crate::segment::{read_payload, write_payload, Segment};
use std::marker::PhantomData;
use std::sync::atomic::{fence, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Sequence pair at the head of the payload, padded to a cache line.
#[repr(C, align(64))]
struct MailboxState {
    req_seq: AtomicU64,
    rsp_seq: AtomicU64,
}

const STATE_SIZE: usize = core::mem::size_of::<MailboxState>();

/// Interval between reply polls on the client side.
const CLIENT_POLL: Duration = Duration::from_millis(1);

/// Default reply deadline. Server loops poll every few milliseconds, so
/// an unanswered second means the peer is wedged or gone.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_millis(800);

const fn round_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

const fn req_offset() -> usize {
    STATE_SIZE
}

const fn rsp_offset<Req>() -> usize {
    STATE_SIZE + round_up(core::mem::size_of::<Req>(), 64)
}

const fn payload_size<Req, Rsp>() -> usize {
    rsp_offset::<Req>() + round_up(core::mem::size_of::<Rsp>(), 64)
}

// ─── Client ─────────────────────────────────────────────────────────

/// Requesting end of a mailbox. Exclusive use; wrap in a mutex when
/// several threads share one channel.
pub struct MailboxClient<Req: Copy, Rsp: Copy> {
    segment: Segment,
    timeout: Duration,
    _marker: PhantomData<(Req, Rsp)>,
}

impl<Req: Copy, Rsp: Copy> MailboxClient<Req, Rsp> {
    /// Attach to a server-created mailbox segment.
    pub fn attach(name: &str) -> ShmResult<Self> {
        let segment = Segment::attach(name)?;
        Self::from_segment(segment)
    }

    /// Attach with bounded retry, for servers that are still starting.
    pub fn attach_with_retry(name: &str, attempts: u32, interval: Duration) -> ShmResult<Self> {
        let segment = Segment::attach_with_retry(name, attempts, interval)?;
        Self::from_segment(segment)
    }

    fn from_segment(segment: Segment) -> ShmResult<Self> {
        if segment.payload_size() < payload_size::<Req, Rsp>() {
            return Err(ShmError::PayloadTooSmall {
                name: segment.name().to_string(),
                expected: payload_size::<Req, Rsp>(),
                actual: segment.payload_size(),
            });
        }
        Ok(Self {
            segment,
            timeout: DEFAULT_CALL_TIMEOUT,
            _marker: PhantomData,
        })
    }

    /// Override the reply deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[inline]
    fn state(&self) -> &MailboxState {
        unsafe { &*(self.segment.payload_ptr() as *const MailboxState) }
    }

    /// Send one request and wait for its reply.
    ///
    /// # Errors
    /// - [`ShmError::Busy`] if an earlier request is still unanswered
    ///   (clears itself once the server catches up).
    /// - [`ShmError::Timeout`] if no reply arrives within the deadline.
    pub fn call(&mut self, request: &Req) -> ShmResult<Rsp> {
        let state = self.state();
        let req_seq = state.req_seq.load(Ordering::Acquire);
        let rsp_seq = state.rsp_seq.load(Ordering::Acquire);
        if req_seq != rsp_seq {
            return Err(ShmError::Busy {
                name: self.segment.name().to_string(),
            });
        }

        unsafe { write_payload(self.segment.payload_ptr().add(req_offset()), request) };
        fence(Ordering::Release);
        state.req_seq.store(req_seq + 1, Ordering::Release);

        let deadline = Instant::now() + self.timeout;
        loop {
            if state.rsp_seq.load(Ordering::Acquire) == req_seq + 1 {
                fence(Ordering::Acquire);
                let response = unsafe {
                    read_payload::<Rsp>(self.segment.payload_ptr().add(rsp_offset::<Req>()))
                };
                return Ok(response);
            }
            if Instant::now() >= deadline {
                return Err(ShmError::Timeout {
                    name: self.segment.name().to_string(),
                });
            }
            std::thread::sleep(CLIENT_POLL);
        }
    }

    /// Segment name.
    pub fn name(&self) -> &str {
        self.segment.name()
    }
}

// ─── Server ─────────────────────────────────────────────────────────

/// Serving end of a mailbox. The server creates its own segment at
/// startup; failure to do so is fatal for the subsystem.
pub struct MailboxServer<Req: Copy, Rsp: Copy> {
    segment: Segment,
    _marker: PhantomData<(Req, Rsp)>,
}

impl<Req: Copy, Rsp: Copy> MailboxServer<Req, Rsp> {
    /// Create the mailbox segment for this server.
    pub fn create(name: &str) -> ShmResult<Self> {
        let segment = Segment::create(name, payload_size::<Req, Rsp>())?;
        Ok(Self {
            segment,
            _marker: PhantomData,
        })
    }

    #[inline]
    fn state(&self) -> &MailboxState {
        unsafe { &*(self.segment.payload_ptr() as *const MailboxState) }
    }

    /// Take the pending request, if one is in flight.
    pub fn try_receive(&mut self) -> Option<Req> {
        let state = self.state();
        let req_seq = state.req_seq.load(Ordering::Acquire);
        let rsp_seq = state.rsp_seq.load(Ordering::Acquire);
        if req_seq == rsp_seq {
            return None;
        }

        fence(Ordering::Acquire);
        let request = unsafe { read_payload::<Req>(self.segment.payload_ptr().add(req_offset())) };
        Some(request)
    }

    /// Answer the request taken by the last `try_receive`.
    pub fn reply(&mut self, response: &Rsp) {
        let state = self.state();
        unsafe {
            write_payload(
                self.segment.payload_ptr().add(rsp_offset::<Req>()),
                response,
            )
        };
        fence(Ordering::Release);
        let req_seq = state.req_seq.load(Ordering::Acquire);
        state.rsp_seq.store(req_seq, Ordering::Release);
    }

    /// Segment name.
    pub fn name(&self) -> &str {
        self.segment.name()
    }
}
