//! Audio recording for interview answers.
//!
//! Provides microphone capture, artifact encoding, and the segment lifecycle
//! controller that ties capture, encoding, and upload together.

pub mod audio;
pub mod controller;
pub mod encoder;

pub use audio::{AudioCapture, CpalCapture};
pub use controller::{RecorderPhase, RecordingController, StopOutcome};
pub use encoder::{find_ffmpeg, ArtifactEncoder, AudioArtifact, AudioEncoding, SegmentEncoder};
