//! # ATC Data Display
//!
//! Server process rendering analyzer records for the human controller:
//! single-plane info lines, fleet tables, and the 25×25 airspace grid.
//! `LOG` records carry the same content but land in the airspace log
//! file instead of the console.

pub mod grid;
pub mod server;
