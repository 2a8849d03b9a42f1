//! Utility helpers: generational arenas, frame math, and logging.

pub mod allocator;
pub mod logging;
pub mod math;

pub use allocator::{Arena, ArenaHandle, BodyHandle, GenerationalId, JointHandle};
pub use math::Frame;
