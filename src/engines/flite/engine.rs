use std::ffi::{CStr, CString};
use std::os::raw::{c_int, c_void};
use std::ptr::NonNull;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Once;
use std::thread::{self, JoinHandle};

use super::ffi::{self, CstAudioStreamingInfo, CstVoice, CstWave};
use super::voices::{builtin_voice_table, loaders};
use crate::engine::SynthesisEngine;
use crate::error::{Result, SynthesisError};
use crate::registry::{VoiceRegistry, VoiceSource};
use crate::AudioFrame;

/// Frames buffered between the synthesis thread and the consumer.
const FRAME_QUEUE_DEPTH: usize = 8;

static FLITE_INIT: Once = Once::new();

/// A loaded `cst_voice`, owned by one [`crate::Voice`].
pub struct FliteVoice {
    ptr: NonNull<CstVoice>,
}

// Safety: a cst_voice is only used by one thread at a time; `Voice` holds its
// lock for the whole synthesis.
unsafe impl Send for FliteVoice {}

struct SendPtr(NonNull<CstVoice>);

// Safety: see `FliteVoice`.
unsafe impl Send for SendPtr {}

/// CMU Flite synthesis engine.
///
/// Built-in voices are whatever `build.rs` linked (see `FLITE_VOICES`);
/// other voices load from `.flitevox` files.
///
/// # Quick Start
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use speechpipe::{engines::flite::FliteEngine, SynthesisContext};
///
/// let engine = Arc::new(FliteEngine::new());
/// let context = SynthesisContext::new(Arc::clone(&engine), engine.registry())?;
/// let wav = context.speak("Hello, world!")?;
/// # Ok::<(), speechpipe::SynthesisError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FliteEngine {
    _init: (),
}

impl Default for FliteEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FliteEngine {
    /// Initialize libflite (once per process) and register English support
    /// for voice files.
    pub fn new() -> Self {
        FLITE_INIT.call_once(|| unsafe {
            ffi::flite_init();
            ffi::flite_add_lang(c"eng".as_ptr(), ffi::usenglish_init, ffi::cmulex_init);
            ffi::flite_add_lang(c"usenglish".as_ptr(), ffi::usenglish_init, ffi::cmulex_init);
            #[cfg(flite_lang_indic)]
            ffi::flite_add_lang(
                c"cmu_indic_lang".as_ptr(),
                ffi::cmu_indic_lang_init,
                ffi::cmu_indic_lex_init,
            );
            #[cfg(flite_lang_grapheme)]
            ffi::flite_add_lang(
                c"cmu_grapheme_lang".as_ptr(),
                ffi::cmu_grapheme_lang_init,
                ffi::cmu_grapheme_lex_init,
            );
            log::info!(
                "Initialized Flite {} with {} built-in voices",
                super::CMU_FLITE_VERSION.unwrap_or("(unknown version)"),
                loaders().len()
            );
        });
        Self { _init: () }
    }

    /// Registry over the built-in voices linked into this build.
    pub fn registry(&self) -> VoiceRegistry {
        VoiceRegistry::new(builtin_voice_table())
    }
}

impl SynthesisEngine for FliteEngine {
    type Handle = FliteVoice;
    type Frames = FliteFrames;

    fn load_voice(&self, name: &str, source: &VoiceSource) -> Result<FliteVoice> {
        let raw = match source {
            VoiceSource::BuiltIn(stem) => {
                let loader = loaders()
                    .into_iter()
                    .find(|l| l.voice.loader == *stem)
                    .ok_or_else(|| SynthesisError::EngineLoad {
                        voice: name.to_string(),
                        reason: format!("{stem} is not linked into this build"),
                    })?;
                unsafe { (loader.register)() }
            }
            VoiceSource::File(path) => load_voice_file(name, path)?,
        };

        let ptr = NonNull::new(raw).ok_or_else(|| SynthesisError::EngineLoad {
            voice: name.to_string(),
            reason: "flite returned no voice".to_string(),
        })?;
        Ok(FliteVoice { ptr })
    }

    fn synthesize(&self, handle: &FliteVoice, text: &str) -> Result<FliteFrames> {
        let text = CString::new(text)
            .map_err(|_| SynthesisError::Synthesis("text contains a NUL byte".to_string()))?;
        FliteFrames::start(SendPtr(handle.ptr), text)
    }

    fn unload(&self, handle: FliteVoice) {
        unsafe { ffi::delete_voice(handle.ptr.as_ptr()) };
    }

    fn supports_voice_files(&self) -> bool {
        cfg!(not(flite_no_voice_load))
    }

    fn pathname(&self, handle: &FliteVoice) -> Option<String> {
        let path = unsafe {
            let features = (*handle.ptr.as_ptr()).features;
            CStr::from_ptr(ffi::get_param_string(features, c"pathname".as_ptr(), c"".as_ptr()))
        };
        let path = path.to_string_lossy();
        (!path.is_empty()).then(|| path.into_owned())
    }

    fn voice_name(&self, handle: &FliteVoice) -> Option<String> {
        let name = unsafe { (*handle.ptr.as_ptr()).name };
        if name.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
    }
}

#[cfg(not(flite_no_voice_load))]
fn load_voice_file(name: &str, path: &std::path::Path) -> Result<*mut CstVoice> {
    let c_path = CString::new(path.to_string_lossy().into_owned()).map_err(|_| {
        SynthesisError::EngineLoad {
            voice: name.to_string(),
            reason: "path contains a NUL byte".to_string(),
        }
    })?;
    Ok(unsafe { ffi::flite_voice_load(c_path.as_ptr()) })
}

#[cfg(flite_no_voice_load)]
fn load_voice_file(name: &str, _path: &std::path::Path) -> Result<*mut CstVoice> {
    Err(SynthesisError::EngineLoad {
        voice: name.to_string(),
        reason: "libflite was built without flite_voice_load".to_string(),
    })
}

struct StreamState {
    tx: SyncSender<Result<AudioFrame>>,
}

/// Frames of one Flite utterance.
///
/// Flite pushes audio through a callback, so each utterance spawns one
/// `flite-synth` thread that feeds a bounded channel. This is the only
/// thread the crate starts on its own; there is no pool, and the thread
/// never outlives its `FliteFrames`. Dropping the frames early makes the
/// callback return `CST_AUDIO_STREAM_STOP` and joins the worker.
///
/// A negative result from `flite_text_to_speech` arrives as a final
/// [`SynthesisError::Synthesis`] item.
pub struct FliteFrames {
    rx: Option<Receiver<Result<AudioFrame>>>,
    worker: Option<JoinHandle<()>>,
}

impl FliteFrames {
    fn start(voice: SendPtr, text: CString) -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel(FRAME_QUEUE_DEPTH);
        let worker = thread::Builder::new()
            .name("flite-synth".to_string())
            .spawn(move || run_synthesis(voice, text, tx))?;
        Ok(Self {
            rx: Some(rx),
            worker: Some(worker),
        })
    }
}

impl Iterator for FliteFrames {
    type Item = Result<AudioFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.as_ref()?.recv().ok()
    }
}

impl Drop for FliteFrames {
    fn drop(&mut self) {
        self.rx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("Flite synthesis thread panicked");
            }
        }
    }
}

fn run_synthesis(voice: SendPtr, text: CString, tx: SyncSender<Result<AudioFrame>>) {
    let voice = voice.0.as_ptr();
    let state = Box::new(StreamState { tx });

    unsafe {
        let asi = ffi::new_audio_streaming_info();
        if asi.is_null() {
            let _ = state.tx.send(Err(SynthesisError::Synthesis(
                "failed to allocate audio_streaming_info".to_string(),
            )));
            return;
        }
        (*asi).asc = Some(stream_chunk);
        (*asi).userdata = &*state as *const StreamState as *mut c_void;

        let features = (*voice).features;
        // The feature list takes ownership of `asi`.
        ffi::feat_set(
            features,
            c"streaming_info".as_ptr(),
            ffi::audio_streaming_info_val(asi),
        );
        let duration = ffi::flite_text_to_speech(text.as_ptr(), voice, c"stream".as_ptr());
        ffi::flite_feat_remove(features, c"streaming_info".as_ptr());
        if let Some(err) = synthesis_failure(duration) {
            let _ = state.tx.send(Err(err));
        }
    }
}

/// `flite_text_to_speech` returns the utterance length in seconds, or a
/// negative value when synthesis failed.
fn synthesis_failure(duration: f32) -> Option<SynthesisError> {
    (duration < 0.0 || duration.is_nan()).then(|| {
        SynthesisError::Synthesis(format!("flite_text_to_speech returned {duration}"))
    })
}

unsafe extern "C" fn stream_chunk(
    w: *const CstWave,
    start: c_int,
    size: c_int,
    _last: c_int,
    asi: *mut CstAudioStreamingInfo,
) -> c_int {
    let (state, wave) = unsafe { (&*((*asi).userdata as *const StreamState), &*w) };
    if size <= 0 || start < 0 {
        return ffi::CST_AUDIO_STREAM_CONT;
    }

    let samples =
        unsafe { std::slice::from_raw_parts(wave.samples.add(start as usize), size as usize) };
    let frame = AudioFrame::new(
        samples.to_vec(),
        wave.sample_rate as u32,
        wave.num_channels.max(1) as u16,
    );

    match state.tx.send(Ok(frame)) {
        Ok(()) => ffi::CST_AUDIO_STREAM_CONT,
        Err(_) => ffi::CST_AUDIO_STREAM_STOP,
    }
}
