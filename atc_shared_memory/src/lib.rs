//! # ATC Shared Memory Fabric
//!
//! Typed shared-memory primitives tying the ATC subsystem processes
//! together. Four protocols, all built on mmap-backed segments under
//! `/dev/shm` with a cache-line-aligned atomic header:
//!
//! - **Snapshot slot** ([`slot`]) — single-writer multi-reader seqlock
//!   (odd = write in progress, even = committed). Carries the fleet
//!   snapshot; readers never observe a torn or stale-ordered value.
//! - **Command ring** ([`ring`]) — bounded FIFO guarded by a
//!   cross-process lock word. Single producer (analyzer), single
//!   consumer (relay); full ring is surfaced, never blocks.
//! - **Mailbox** ([`mailbox`]) — single-client single-server synchronous
//!   rendezvous with one reply per request, used for the operator,
//!   display and logger channels.
//! - **Registry** ([`registry`]) — subsystem discovery table mapping
//!   identity → (channel id, pid), populated by servers at startup and
//!   polled by clients with bounded retry.
//!
//! ## Thread safety
//!
//! - `SlotWriter` is single-writer; `SlotReader` instances are cheap,
//!   one per reading thread.
//! - `CommandRing` handles may be shared; all mutation happens under
//!   the segment lock word.
//! - `MailboxClient` is exclusive-use (wrap in a mutex to share);
//!   `MailboxServer` belongs to its serving thread.

pub mod error;
pub mod mailbox;
pub mod platform;
pub mod registry;
pub mod ring;
pub mod segment;
pub mod slot;

pub use error::{ShmError, ShmResult};
pub use mailbox::{MailboxClient, MailboxServer};
pub use registry::SubsystemRegistry;
pub use ring::CommandRing;
pub use segment::{Segment, SegmentHeader};
pub use slot::{SlotReader, SlotWriter};
