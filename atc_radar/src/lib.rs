//! # ATC Radar Process
//!
//! Owns the live aircraft: one integrator thread per plane advances
//! position along its velocity vector, the radar publisher collects a
//! coherent fleet snapshot every second and publishes it to the shared
//! airspace store, and the command relay applies operator-issued
//! mutations from the shared command ring back onto the aircraft.
//!
//! ## Threads
//!
//! - One integrator per tracked aircraft (~1 s sleep between steps).
//! - The radar publisher tick loop (1 s period).
//! - The relay loop (sleeps ~100 ms when the ring is empty).

pub mod fleet;
pub mod loader;
pub mod plane;
pub mod radar;
pub mod relay;
