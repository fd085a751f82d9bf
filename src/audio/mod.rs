//! Audio collaborator interface: playback position and file inspection.
//!
//! The scheduler never owns audio output. It only reads where playback is
//! through [`PlaybackClock`], which a real player or [`SimulatedPlayback`]
//! implements.

pub mod clock;
pub mod decode;

pub use clock::{PlaybackClock, SimulatedPlayback};
pub use decode::probe_duration_ms;
