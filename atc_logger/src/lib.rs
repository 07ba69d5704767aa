//! # ATC Airspace Logger
//!
//! Server process appending timestamped fleet snapshots, shipped by the
//! analyzer every 20 s, to the append-only history log.

pub mod history;
