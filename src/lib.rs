//! # speechpipe
//!
//! A Rust library that streams text-to-speech engine output into files,
//! in-memory buffers and network bodies, with optional on-the-fly encoding.
//!
//! ## Features
//!
//! - **Streaming**: frames go to the sink as the engine produces them
//! - **Voices**: built-in voices from a build-time table, or voice files
//! - **Voice cache**: load each voice once, share it across requests
//! - **Output types**: WAV and raw PCM always, MP3 with the `mp3` feature
//! - **Playback**: play through the speakers with the `playback` feature
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! speechpipe = { version = "2026.2", features = ["flite", "mp3"] }
//! ```
//!
//! ```ignore
//! use std::sync::Arc;
//! use speechpipe::{engines::flite::FliteEngine, OutputFormat, StreamSink, SynthesisContext};
//!
//! let engine = Arc::new(FliteEngine::new());
//! let context = SynthesisContext::new(Arc::clone(&engine), engine.registry())?;
//!
//! let mut body = StreamSink::new(std::io::stdout());
//! let stats = context.synthesize_to_sink("Hello, world!", Some("slt"), &OutputFormat::wav(), &mut body)?;
//! eprintln!("{:.2}s of audio", stats.duration_secs());
//! # Ok::<(), speechpipe::SynthesisError>(())
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod driver;
pub mod encoder;
pub mod engine;
pub mod engines;
pub mod error;
#[cfg(feature = "playback")]
pub mod playback;
pub mod registry;
pub mod sink;
pub mod voice;

pub use cache::VoiceCache;
pub use config::{SynthesisConfig, SynthesisConfigBuilder};
pub use context::SynthesisContext;
pub use driver::{synthesize_with_voice, DriverState, SynthesisDriver, SynthesisStats};
pub use encoder::{
    supported_audio_types, AudioType, EncoderOptions, EncoderSession, HeaderPatch, OutputFormat,
};
pub use engine::SynthesisEngine;
pub use error::{Result, SynthesisError};
#[cfg(feature = "playback")]
pub use playback::PlaybackSink;
pub use registry::{BuiltinVoice, VoiceDescriptor, VoiceRegistry, VoiceSource};
pub use sink::{BufferSink, ChannelSink, FileSink, Sink, StreamSink};
pub use voice::{Utterance, Voice};

use std::time::Duration;

/// A chunk of 16-bit PCM produced while synthesizing one utterance.
///
/// Samples are interleaved when `channels > 1`. All frames of one
/// utterance share `sample_rate` and `channels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn samples_per_channel(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Duration of the frame.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples_per_channel() as f64 / f64::from(self.sample_rate))
    }

    /// Samples as little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}
