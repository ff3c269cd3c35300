//! Frame timing for render loops.
//!
//! One [`FrameClock`] per loop; call `tick()` once per presented frame.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
