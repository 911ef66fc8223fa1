//! The capability contract every synthesis engine provides.

use crate::error::Result;
use crate::registry::VoiceSource;
use crate::AudioFrame;

/// Common interface for text-to-speech synthesis engines.
///
/// An engine loads voices into opaque handles and turns text into a lazy
/// sequence of PCM frames. Handles are owned by [`crate::Voice`]; nothing
/// else touches them.
///
/// # Reentrancy
///
/// The crate never runs two syntheses on the same handle at once: a
/// [`crate::Voice`] holds its lock for the lifetime of each utterance.
/// Engines therefore only need to be safe for concurrent use across
/// *different* handles.
pub trait SynthesisEngine: Send + Sync + 'static {
    /// Loaded voice owned exclusively by one [`crate::Voice`].
    type Handle: Send + 'static;
    /// Frames of one utterance, in production order.
    ///
    /// Dropping the iterator before it is exhausted must release any
    /// engine-side synthesis state.
    type Frames: Iterator<Item = Result<AudioFrame>> + Send;

    /// Load a voice from a built-in loader or a voice file.
    fn load_voice(&self, name: &str, source: &VoiceSource) -> Result<Self::Handle>;

    /// Start synthesizing `text` with a loaded voice.
    fn synthesize(&self, handle: &Self::Handle, text: &str) -> Result<Self::Frames>;

    /// Free a voice handle. Called exactly once per loaded handle.
    fn unload(&self, handle: Self::Handle);

    /// Whether voices can be loaded from files at runtime.
    fn supports_voice_files(&self) -> bool {
        true
    }

    /// The file a loaded voice came from, if the engine records one.
    fn pathname(&self, _handle: &Self::Handle) -> Option<String> {
        None
    }

    /// The name the engine itself gives a loaded voice. For voice files this
    /// usually differs from the path it was requested by.
    fn voice_name(&self, _handle: &Self::Handle) -> Option<String> {
        None
    }
}
