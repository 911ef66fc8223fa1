use std::path::PathBuf;

/// Errors produced while resolving voices, synthesizing and delivering audio.
#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("Voice '{0}' not found. Call list_available() to see built-in voices.")]
    NotFound(String),
    #[error("Failed to load voice '{voice}': {reason}")]
    EngineLoad { voice: String, reason: String },
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("Option '{option}' is not supported by the {format} encoder")]
    UnsupportedOption { format: String, option: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Voice '{0}' was released")]
    UseAfterRelease(String),
    #[error("Sink is closed")]
    SinkClosed,
    #[error("Synthesis failed: {0}")]
    Synthesis(String),
    #[error("Encoder error: {0}")]
    Encode(String),
    #[error(
        "Frame format changed mid-utterance: expected {expected_rate}Hz/{expected_channels}ch, \
         got {rate}Hz/{channels}ch"
    )]
    InconsistentFrame {
        expected_rate: u32,
        expected_channels: u16,
        rate: u32,
        channels: u16,
    },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Audio playback failed: {0}")]
    Playback(String),
}

impl SynthesisError {
    pub(crate) fn missing_file(path: PathBuf) -> Self {
        SynthesisError::NotFound(path.display().to_string())
    }
}

pub type Result<T> = std::result::Result<T, SynthesisError>;
