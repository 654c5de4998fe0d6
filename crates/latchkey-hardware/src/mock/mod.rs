//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware.

pub mod contact;
pub mod strike;

// Re-export commonly used types
pub use contact::{MockContactHandle, MockContactSensor};
pub use strike::{MockStrike, MockStrikeHandle, StrikeEvent};
