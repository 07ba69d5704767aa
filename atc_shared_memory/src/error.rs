//! Error types for shared memory operations

use thiserror::Error;

/// Errors that can occur during shared memory operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// Segment already exists
    #[error("segment already exists: {name}")]
    AlreadyExists {
        /// Segment name
        name: String,
    },

    /// Segment not found
    #[error("segment not found: {name}")]
    NotFound {
        /// Segment name
        name: String,
    },

    /// Invalid segment payload size
    #[error("invalid segment payload size: {size} bytes")]
    InvalidSize {
        /// Attempted size in bytes
        size: usize,
    },

    /// Segment header failed magic validation
    #[error("invalid segment magic on '{name}'")]
    InvalidMagic {
        /// Segment name
        name: String,
    },

    /// Segment data too small for the expected payload type
    #[error("payload too small on '{name}': need {expected} bytes, got {actual}")]
    PayloadTooSmall {
        /// Segment name
        name: String,
        /// Expected minimum size
        expected: usize,
        /// Actual payload size
        actual: usize,
    },

    /// Snapshot read kept colliding with concurrent writes
    #[error("version conflict reading '{name}' - retry recommended")]
    VersionConflict {
        /// Segment name
        name: String,
    },

    /// Mailbox has an unanswered outstanding request
    #[error("mailbox '{name}' busy: previous request not yet answered")]
    Busy {
        /// Segment name
        name: String,
    },

    /// Mailbox reply did not arrive in time
    #[error("timed out waiting for reply on mailbox '{name}'")]
    Timeout {
        /// Segment name
        name: String,
    },

    /// Command ring is at capacity
    #[error("command queue full")]
    QueueFull,

    /// Registry never reached the required population
    #[error("subsystem registry incomplete: missing {missing}")]
    RegistryIncomplete {
        /// Names of the absent subsystems
        missing: String,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("system call error: {source}")]
    Nix {
        /// Source nix error
        #[from]
        source: nix::Error,
    },
}

/// Result type for shared memory operations
pub type ShmResult<T> = Result<T, ShmError>;
