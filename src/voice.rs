use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::engine::SynthesisEngine;
use crate::error::{Result, SynthesisError};
use crate::registry::{VoiceDescriptor, VoiceSource};
use crate::AudioFrame;

enum VoiceState<H> {
    Unloaded,
    Loaded(H),
    Released,
}

/// What the engine reports about a voice once it is loaded. Kept outside
/// the voice lock so it can be read while an utterance is in flight.
#[derive(Debug, Default)]
struct VoiceMetadata {
    engine_name: Option<String>,
    pathname: Option<String>,
}

/// A voice descriptor plus the engine handle it owns once loaded.
///
/// Loading is lazy and idempotent. The handle is freed exactly once, either
/// by [`Voice::release`] or on drop. Synthesis is serialized per voice: each
/// [`Utterance`] holds the voice lock until it is dropped, so `release`
/// waits for in-flight synthesis instead of racing it. Metadata accessors
/// (`is_loaded`, `pathname`, `engine_name`, `Debug`) never take that lock.
pub struct Voice<E: SynthesisEngine> {
    descriptor: VoiceDescriptor,
    engine: Arc<E>,
    loaded: AtomicBool,
    metadata: OnceLock<VoiceMetadata>,
    state: Mutex<VoiceState<E::Handle>>,
}

impl<E: SynthesisEngine> Voice<E> {
    /// Create an unloaded voice.
    pub fn new(descriptor: VoiceDescriptor, engine: Arc<E>) -> Self {
        Self {
            descriptor,
            engine,
            loaded: AtomicBool::new(false),
            metadata: OnceLock::new(),
            state: Mutex::new(VoiceState::Unloaded),
        }
    }

    /// Create and load a voice in one step.
    pub fn load_new(descriptor: VoiceDescriptor, engine: Arc<E>) -> Result<Self> {
        let voice = Self::new(descriptor, engine);
        voice.load()?;
        Ok(voice)
    }

    pub fn descriptor(&self) -> &VoiceDescriptor {
        &self.descriptor
    }

    /// The name this voice was requested by: a built-in name or a path.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// The engine's own name for the voice, known once it has been loaded.
    pub fn engine_name(&self) -> Option<String> {
        self.metadata.get().and_then(|m| m.engine_name.clone())
    }

    /// Path of the voice file, or the engine-reported path; `None` for built-ins.
    pub fn pathname(&self) -> Option<String> {
        if let VoiceSource::File(path) = &self.descriptor.source {
            return Some(path.display().to_string());
        }
        self.metadata.get().and_then(|m| m.pathname.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Load the engine voice. A second call on a loaded voice is a no-op.
    pub fn load(&self) -> Result<()> {
        let mut state = self.lock();
        self.ensure_loaded(&mut state)
    }

    /// Synthesize `text`, yielding frames as the engine produces them.
    ///
    /// Loads the voice first if needed. Empty text produces an empty
    /// utterance without involving the engine. The returned utterance keeps
    /// this voice locked until it is dropped.
    pub fn synthesize(&self, text: &str) -> Result<Utterance<'_, E>> {
        let mut state = self.lock();
        self.ensure_loaded(&mut state)?;

        let frames = if text.is_empty() {
            None
        } else {
            match &*state {
                VoiceState::Loaded(handle) => Some(self.engine.synthesize(handle, text)?),
                _ => return Err(SynthesisError::UseAfterRelease(self.name().to_string())),
            }
        };

        Ok(Utterance {
            frames,
            _state: state,
        })
    }

    /// Free the engine handle. Later `synthesize`/`load` calls fail with
    /// [`SynthesisError::UseAfterRelease`]; releasing twice is a no-op.
    pub fn release(&self) {
        let mut state = self.lock();
        if let VoiceState::Loaded(handle) =
            std::mem::replace(&mut *state, VoiceState::Released)
        {
            log::info!("Unloading voice {}", self.descriptor);
            self.loaded.store(false, Ordering::Release);
            self.engine.unload(handle);
        }
    }

    fn ensure_loaded(&self, state: &mut VoiceState<E::Handle>) -> Result<()> {
        match state {
            VoiceState::Loaded(_) => Ok(()),
            VoiceState::Released => Err(SynthesisError::UseAfterRelease(self.name().to_string())),
            VoiceState::Unloaded => {
                if matches!(self.descriptor.source, VoiceSource::File(_))
                    && !self.engine.supports_voice_files()
                {
                    return Err(SynthesisError::EngineLoad {
                        voice: self.name().to_string(),
                        reason: "engine was built without voice file support".to_string(),
                    });
                }
                log::info!("Loading voice {}", self.descriptor);
                let handle = self
                    .engine
                    .load_voice(&self.descriptor.name, &self.descriptor.source)?;
                let _ = self.metadata.set(VoiceMetadata {
                    engine_name: self.engine.voice_name(&handle),
                    pathname: self.engine.pathname(&handle),
                });
                *state = VoiceState::Loaded(handle);
                self.loaded.store(true, Ordering::Release);
                Ok(())
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, VoiceState<E::Handle>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: SynthesisEngine> Drop for Voice<E> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<E: SynthesisEngine> std::fmt::Debug for Voice<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voice")
            .field("descriptor", &self.descriptor)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Frames of one utterance. Finite and not restartable.
///
/// Dropping an utterance early releases the engine's synthesis state and
/// then unlocks the voice.
pub struct Utterance<'v, E: SynthesisEngine> {
    // Declared before the guard so engine frames drop while the voice is
    // still locked.
    frames: Option<E::Frames>,
    _state: MutexGuard<'v, VoiceState<E::Handle>>,
}

impl<E: SynthesisEngine> Iterator for Utterance<'_, E> {
    type Item = Result<AudioFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.frames.as_mut()?.next();
        if item.is_none() {
            // Exhausted: free engine-side state right away.
            self.frames = None;
        }
        item
    }
}
