//! Playback of synthesized replies
//!
//! At most one clip plays at a time. `PlaybackController` owns the handle;
//! `AudioOutput` implementations do the actual playing: `TimedOutput`
//! headless, `SpeakerOutput` on the default device (`devices` feature).

mod controller;
mod output;
#[cfg(feature = "devices")]
mod speaker;

pub use controller::{PlaybackController, PlaybackState};
pub use output::{AudioOutput, PlaybackEvent, PlaybackHandle, PlaybackId, TimedOutput};
#[cfg(feature = "devices")]
pub use speaker::SpeakerOutput;
