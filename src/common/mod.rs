//! Shared configuration
//!
//! Configuration types, loading and validation used by the engine and the simulator.

pub mod config;
