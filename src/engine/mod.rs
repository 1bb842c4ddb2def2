//! Audio engine for the station
//!
//! Device-facing pieces: clip playback, streaming output lines, and WAV
//! decoding and recording.

pub mod clip;
pub mod decode;
pub mod line;
pub mod output;
mod recorder;

pub use clip::{Clip, ClipDriver, CompletionListener, CpalClipDriver};
pub use line::{CpalLineProvider, LineProvider, OutputLine};
pub use recorder::{Recorder, WavLineProvider};
