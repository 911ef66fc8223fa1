use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::cache::VoiceCache;
use crate::config::SynthesisConfig;
use crate::driver::{SynthesisDriver, SynthesisStats};
use crate::encoder::{supported_audio_types, AudioType, OutputFormat};
use crate::engine::SynthesisEngine;
use crate::error::Result;
use crate::registry::{VoiceDescriptor, VoiceRegistry};
use crate::sink::{BufferSink, FileSink, Sink};
use crate::voice::Voice;

/// Caller-owned synthesis state: a voice cache, a default voice and the
/// output format requests use when they do not name one.
///
/// A server can share one context across connections or keep one per
/// connection; nothing here is process-global.
pub struct SynthesisContext<E: SynthesisEngine> {
    cache: VoiceCache<E>,
    default_voice: RwLock<Arc<Voice<E>>>,
    default_format: OutputFormat,
    audio_types: BTreeSet<AudioType>,
}

impl<E: SynthesisEngine> SynthesisContext<E> {
    /// Create a context with the default [`SynthesisConfig`].
    pub fn new(engine: Arc<E>, registry: VoiceRegistry) -> Result<Self> {
        Self::with_config(engine, registry, &SynthesisConfig::default())
    }

    /// Create a context, loading the default voice and any preload voices.
    pub fn with_config(
        engine: Arc<E>,
        registry: VoiceRegistry,
        config: &SynthesisConfig,
    ) -> Result<Self> {
        let cache = VoiceCache::new(engine, registry);
        for name in &config.preload_voices {
            cache.get_or_load(name)?;
        }
        let default_voice = cache.get_or_load(&config.default_voice)?;
        Ok(Self {
            cache,
            default_voice: RwLock::new(default_voice),
            default_format: config.output_format(),
            audio_types: supported_audio_types(),
        })
    }

    pub fn cache(&self) -> &VoiceCache<E> {
        &self.cache
    }

    /// Built-in voices of the engine this context was created with.
    pub fn list_available(&self) -> Vec<VoiceDescriptor> {
        self.cache.registry().list_available()
    }

    /// Audio types this build can produce.
    pub fn supported_audio_types(&self) -> &BTreeSet<AudioType> {
        &self.audio_types
    }

    pub fn default_format(&self) -> &OutputFormat {
        &self.default_format
    }

    pub fn default_voice(&self) -> Arc<Voice<E>> {
        let voice = self.default_voice.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*voice)
    }

    /// Make `name` the default voice, loading it through the cache.
    pub fn set_default_voice(&self, name: &str) -> Result<Arc<Voice<E>>> {
        let voice = self.cache.get_or_load(name)?;
        *self.default_voice.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&voice);
        log::info!("Default voice is now '{name}'");
        Ok(voice)
    }

    /// The cached voice for `name`, or the default voice for `None`.
    pub fn voice(&self, name: Option<&str>) -> Result<Arc<Voice<E>>> {
        match name {
            Some(name) => self.cache.get_or_load(name),
            None => Ok(self.default_voice()),
        }
    }

    /// Synthesize `text` with the named (or default) voice into `sink`.
    pub fn synthesize_to_sink<S: Sink + ?Sized>(
        &self,
        text: &str,
        voice_name: Option<&str>,
        format: &OutputFormat,
        sink: &mut S,
    ) -> Result<SynthesisStats> {
        let voice = self.voice(voice_name)?;
        SynthesisDriver::new(format)?.run(&voice, text, sink)
    }

    /// Synthesize with the default voice and format and return the bytes.
    pub fn speak(&self, text: &str) -> Result<Vec<u8>> {
        let mut sink = BufferSink::new();
        self.synthesize_to_sink(text, None, &self.default_format, &mut sink)?;
        Ok(sink.into_inner())
    }

    /// Synthesize into memory as `audio_type` (no codec options).
    pub fn to_speech(
        &self,
        text: &str,
        voice_name: Option<&str>,
        audio_type: AudioType,
    ) -> Result<Vec<u8>> {
        let mut sink = BufferSink::new();
        self.synthesize_to_sink(text, voice_name, &OutputFormat::from(audio_type), &mut sink)?;
        Ok(sink.into_inner())
    }

    /// Synthesize and play through the default audio device, returning
    /// once playback has finished.
    #[cfg(feature = "playback")]
    pub fn speak_aloud(&self, text: &str, voice_name: Option<&str>) -> Result<SynthesisStats> {
        let voice = self.voice(voice_name)?;
        let mut driver = SynthesisDriver::new(&OutputFormat::wav())?;
        let mut speaker = crate::playback::PlaybackSink::open()?;
        driver.run(&voice, text, &mut speaker)
    }

    /// Synthesize into a file, replacing it if it exists.
    ///
    /// The voice and the output format are checked before the file is
    /// touched, so a request rejected up front leaves an existing file as
    /// it was.
    pub fn speak_to_file(
        &self,
        text: &str,
        voice_name: Option<&str>,
        path: &Path,
        format: &OutputFormat,
    ) -> Result<SynthesisStats> {
        let voice = self.voice(voice_name)?;
        let mut driver = SynthesisDriver::new(format)?;
        let mut sink = FileSink::create(path)?;
        driver.run(&voice, text, &mut sink)
    }
}
