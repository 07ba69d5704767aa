//! ATC Common Library
//!
//! This crate provides shared constants, wire-layout data structures and
//! configuration loading utilities for all ATC workspace crates.
//!
//! # Module Structure
//!
//! - [`clock`] - Simulated-time base and wall-clock stamps
//! - [`consts`] - System-wide constants (airspace box, fleet caps, cadences)
//! - [`geometry`] - Minimal 3-D vector type used by kinematics and prediction
//! - [`wire`] - `#[repr(C)]` wire-layout structs shared across processes
//! - [`config`] - TOML configuration loading and validation
//! - [`logging`] - Per-subsystem tracing initialization
//! - [`shutdown`] - Signal-driven shutdown and emergency flags

pub mod clock;
pub mod config;
pub mod consts;
pub mod geometry;
pub mod logging;
pub mod shutdown;
pub mod wire;
