pub mod constants;
pub mod door_state;
pub mod error;
pub mod types;

pub use door_state::{DoorStateRecord, wall_clock_seconds};
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
