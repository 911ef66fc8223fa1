use std::path::Path;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::encoder::{AudioType, EncoderOptions, OutputFormat};
use crate::error::{Result, SynthesisError};

/// Settings for a [`crate::SynthesisContext`].
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "default_voice": "slt", "audio_type": "mp3", "encoder_options": { "bitrate": "96" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(default)]
#[builder(default, setter(into))]
pub struct SynthesisConfig {
    /// Voice used when a request names none.
    pub default_voice: String,
    /// Output type used by requests that do not pick one.
    pub audio_type: AudioType,
    /// Codec options for `audio_type`.
    pub encoder_options: EncoderOptions,
    /// Voices loaded into the cache when the context is created.
    pub preload_voices: Vec<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            default_voice: "kal".to_string(),
            audio_type: AudioType::Wav,
            encoder_options: EncoderOptions::new(),
            preload_voices: Vec::new(),
        }
    }
}

impl SynthesisConfig {
    pub fn builder() -> SynthesisConfigBuilder {
        SynthesisConfigBuilder::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SynthesisError::Config(format!("Failed to parse JSON: {e}")))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        log::info!("Loading synthesis config from {}", path.display());
        Self::from_json_str(&content)
    }

    /// Output format described by `audio_type` and `encoder_options`.
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::new(self.audio_type, self.encoder_options.clone())
    }
}
