//! # ATC Operator Console
//!
//! Server process for the human controller: a stdin reader parses the
//! command grammar into a bounded FIFO, and the mailbox server answers
//! the analyzer's polls with the oldest pending command (or none) and
//! acknowledges incoming separation alerts.

pub mod console;
pub mod parser;
