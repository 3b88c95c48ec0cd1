//! Core data types for the coinwatch alert engine.

pub mod snapshot;
pub mod threshold;
pub mod window;

pub use snapshot::*;
pub use threshold::*;
pub use window::*;
