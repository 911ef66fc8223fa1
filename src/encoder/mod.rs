//! Frame transforms applied between the engine and the sink.
//!
//! # Available Formats
//!
//! | Type  | Bridge            | Availability          |
//! |-------|-------------------|-----------------------|
//! | `wav` | pass-through      | always                |
//! | `raw` | pass-through      | always                |
//! | `mp3` | compressing codec | `mp3` Cargo feature   |
//!
//! A format that was not compiled in is rejected with
//! [`SynthesisError::UnsupportedFormat`] when a session is opened, so callers
//! can probe [`supported_audio_types`] first.

#[cfg(feature = "mp3")]
mod lame;
pub mod mp3;
pub mod wav;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthesisError};
use crate::AudioFrame;

/// Container/codec of the bytes delivered to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioType {
    /// RIFF/WAVE header followed by 16-bit PCM.
    Wav,
    /// Headerless little-endian 16-bit PCM.
    Raw,
    /// MPEG-1/2 Layer III.
    Mp3,
}

impl AudioType {
    pub fn mime_type(self) -> &'static str {
        match self {
            AudioType::Wav => "audio/wav",
            AudioType::Raw => "application/octet-stream",
            AudioType::Mp3 => "audio/mpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AudioType::Wav => "wav",
            AudioType::Raw => "raw",
            AudioType::Mp3 => "mp3",
        }
    }

    /// Whether bytes go through a compressing encoder rather than pass-through.
    pub fn is_compressed(self) -> bool {
        matches!(self, AudioType::Mp3)
    }
}

impl fmt::Display for AudioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioType {
    type Err = SynthesisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioType::Wav),
            "raw" => Ok(AudioType::Raw),
            "mp3" => Ok(AudioType::Mp3),
            _ => Err(SynthesisError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Audio types this build can produce.
pub fn supported_audio_types() -> BTreeSet<AudioType> {
    let mut types = BTreeSet::from([AudioType::Wav, AudioType::Raw]);
    if cfg!(feature = "mp3") {
        types.insert(AudioType::Mp3);
    }
    types
}

/// Codec options as string key/value pairs, validated by the codec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderOptions(BTreeMap<String, String>);

impl EncoderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Reject any key not in `known`.
    pub(crate) fn check_keys(&self, format: AudioType, known: &[&str]) -> Result<()> {
        match self.0.keys().find(|k| !known.contains(&k.as_str())) {
            Some(option) => Err(SynthesisError::UnsupportedOption {
                format: format.to_string(),
                option: option.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl From<BTreeMap<String, String>> for EncoderOptions {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// Requested output: an audio type plus its codec options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFormat {
    pub audio_type: AudioType,
    pub options: EncoderOptions,
}

impl OutputFormat {
    pub fn new(audio_type: AudioType, options: EncoderOptions) -> Self {
        Self {
            audio_type,
            options,
        }
    }

    pub fn wav() -> Self {
        Self::new(AudioType::Wav, EncoderOptions::new())
    }

    pub fn raw() -> Self {
        Self::new(AudioType::Raw, EncoderOptions::new())
    }

    pub fn mp3(options: EncoderOptions) -> Self {
        Self::new(AudioType::Mp3, options)
    }

    /// Open an encoder session for one request.
    pub fn open_session(&self) -> Result<Box<dyn EncoderSession>> {
        if !supported_audio_types().contains(&self.audio_type) {
            return Err(SynthesisError::UnsupportedFormat(format!(
                "{} (not compiled into this build)",
                self.audio_type
            )));
        }
        match self.audio_type {
            AudioType::Wav | AudioType::Raw => Ok(Box::new(wav::PassThrough::new(
                self.audio_type,
                &self.options,
            )?)),
            AudioType::Mp3 => mp3::open_session(&self.options),
        }
    }
}

impl From<AudioType> for OutputFormat {
    fn from(audio_type: AudioType) -> Self {
        Self::new(audio_type, EncoderOptions::new())
    }
}

/// Bytes to overwrite at a fixed offset once the stream has ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPatch {
    pub offset: u64,
    pub bytes: Vec<u8>,
}

/// Stateful encoder bound to exactly one request.
///
/// Frames arrive in production order. Each call may append zero or more
/// bytes to `out`; the caller forwards them unchanged and in order.
pub trait EncoderSession: Send {
    /// Whether this session compresses (as opposed to passing PCM through).
    fn is_compressing(&self) -> bool;

    /// Feed one frame.
    fn encode(&mut self, frame: &AudioFrame, out: &mut Vec<u8>) -> Result<()>;

    /// Flush trailing bytes into `out`. Consumes the session, so it runs
    /// exactly once. Returned patches fix up headers written before the
    /// stream length was known.
    fn finish(self: Box<Self>, out: &mut Vec<u8>) -> Result<Vec<HeaderPatch>>;
}

/// Stream parameters fixed by the first frame of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamFormat {
    pub(crate) fn of(frame: &AudioFrame) -> Self {
        Self {
            sample_rate: frame.sample_rate,
            channels: frame.channels,
        }
    }

    /// Fail if `frame` does not match the format fixed earlier.
    pub(crate) fn check(&self, frame: &AudioFrame) -> Result<()> {
        if frame.sample_rate != self.sample_rate || frame.channels != self.channels {
            return Err(SynthesisError::InconsistentFrame {
                expected_rate: self.sample_rate,
                expected_channels: self.channels,
                rate: frame.sample_rate,
                channels: frame.channels,
            });
        }
        Ok(())
    }
}
