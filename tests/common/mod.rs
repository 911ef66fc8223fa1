//! Shared fixtures: a deterministic, resource-tracking fake engine.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use speechpipe::{
    AudioFrame, BuiltinVoice, Result, Sink, SynthesisEngine, SynthesisError, VoiceRegistry,
    VoiceSource,
};

pub const SAMPLES_PER_FRAME: usize = 160;
pub const KAL_RATE: u32 = 8000;
pub const WIDE_RATE: u32 = 16000;

pub const BUILTIN_VOICES: &[BuiltinVoice] = &[
    BuiltinVoice { name: "kal", loader: "cmu_us_kal" },
    BuiltinVoice { name: "kal16", loader: "cmu_us_kal16" },
    BuiltinVoice { name: "slt", loader: "cmu_us_slt" },
];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn registry() -> VoiceRegistry {
    VoiceRegistry::new(BUILTIN_VOICES.iter().copied())
}

/// Counters shared between the engine and the frames it hands out.
#[derive(Debug, Default)]
pub struct Tracker {
    pub loads: AtomicUsize,
    pub unloads: AtomicUsize,
    pub streams_started: AtomicUsize,
    pub open_streams: AtomicUsize,
    pub max_open_streams: AtomicUsize,
}

impl Tracker {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn open_handles(&self) -> usize {
        self.loads.load(Ordering::SeqCst) - self.unloads.load(Ordering::SeqCst)
    }

    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    pub fn streams_started(&self) -> usize {
        self.streams_started.load(Ordering::SeqCst)
    }

    pub fn max_open_streams(&self) -> usize {
        self.max_open_streams.load(Ordering::SeqCst)
    }
}

/// One word becomes one frame of `SAMPLES_PER_FRAME` samples derived from
/// the word, so outputs are reproducible and ordering mistakes show up.
pub struct FakeEngine {
    pub tracker: Arc<Tracker>,
    pub voice_files: bool,
    /// Yield an engine error instead of this (0-based) frame.
    pub fail_at_frame: Option<usize>,
    /// Sleep per frame, to widen race windows in concurrency tests.
    pub frame_delay: Option<Duration>,
    /// Sleep inside every voice load.
    pub load_delay: Option<Duration>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            tracker: Arc::new(Tracker::default()),
            voice_files: true,
            fail_at_frame: None,
            frame_delay: None,
            load_delay: None,
        }
    }
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[derive(Debug)]
pub struct FakeHandle {
    pub name: String,
    pub engine_name: String,
    pub sample_rate: u32,
    pub path: Option<String>,
}

impl SynthesisEngine for FakeEngine {
    type Handle = FakeHandle;
    type Frames = FakeFrames;

    fn load_voice(&self, name: &str, source: &VoiceSource) -> Result<FakeHandle> {
        if let Some(delay) = self.load_delay {
            std::thread::sleep(delay);
        }
        let (sample_rate, engine_name, path) = match source {
            VoiceSource::BuiltIn(stem) => {
                let rate = if *stem == "cmu_us_kal" { KAL_RATE } else { WIDE_RATE };
                (rate, stem.to_string(), None)
            }
            VoiceSource::File(path) => {
                let content = std::fs::read_to_string(path)?;
                let Some(voice_name) = content.strip_prefix("FAKEVOX") else {
                    return Err(SynthesisError::EngineLoad {
                        voice: name.to_string(),
                        reason: "not a voice file".to_string(),
                    });
                };
                (WIDE_RATE, voice_name.trim().to_string(), Some(path.display().to_string()))
            }
        };
        self.tracker.loads.fetch_add(1, Ordering::SeqCst);
        Ok(FakeHandle {
            name: name.to_string(),
            engine_name,
            sample_rate,
            path,
        })
    }

    fn synthesize(&self, handle: &FakeHandle, text: &str) -> Result<FakeFrames> {
        self.tracker.streams_started.fetch_add(1, Ordering::SeqCst);
        let open = self.tracker.open_streams.fetch_add(1, Ordering::SeqCst) + 1;
        self.tracker.max_open_streams.fetch_max(open, Ordering::SeqCst);
        Ok(FakeFrames {
            words: text.split_whitespace().map(str::to_string).collect(),
            sample_rate: handle.sample_rate,
            index: 0,
            fail_at: self.fail_at_frame,
            delay: self.frame_delay,
            tracker: Arc::clone(&self.tracker),
        })
    }

    fn unload(&self, _handle: FakeHandle) {
        self.tracker.unloads.fetch_add(1, Ordering::SeqCst);
    }

    fn supports_voice_files(&self) -> bool {
        self.voice_files
    }

    fn pathname(&self, handle: &FakeHandle) -> Option<String> {
        handle.path.clone()
    }

    fn voice_name(&self, handle: &FakeHandle) -> Option<String> {
        Some(handle.engine_name.clone())
    }
}

pub struct FakeFrames {
    words: VecDeque<String>,
    sample_rate: u32,
    index: usize,
    fail_at: Option<usize>,
    delay: Option<Duration>,
    tracker: Arc<Tracker>,
}

impl Iterator for FakeFrames {
    type Item = Result<AudioFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let word = self.words.pop_front()?;
        let index = self.index;
        self.index += 1;
        if self.fail_at == Some(index) {
            return Some(Err(SynthesisError::Synthesis(format!("fake failure at frame {index}"))));
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        Some(Ok(AudioFrame::new(
            word_samples(&word, index),
            self.sample_rate,
            1,
        )))
    }
}

impl Drop for FakeFrames {
    fn drop(&mut self) {
        self.tracker.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Samples the fake engine produces for `word` at frame `index`.
pub fn word_samples(word: &str, index: usize) -> Vec<i16> {
    let seed = word
        .bytes()
        .fold(index as i32 * 7919, |acc, b| acc.wrapping_mul(31).wrapping_add(b as i32));
    (0..SAMPLES_PER_FRAME)
        .map(|n| (seed.wrapping_add(n as i32 * 97) % 30000) as i16)
        .collect()
}

/// All samples the fake engine produces for `text`.
pub fn expected_samples(text: &str) -> Vec<i16> {
    text.split_whitespace()
        .enumerate()
        .flat_map(|(i, word)| word_samples(word, i))
        .collect()
}

/// Buffer sink that fails on its `fail_on`-th (1-based) accept.
#[derive(Debug, Default)]
pub struct FlakySink {
    pub fail_on: usize,
    pub accepts: usize,
    pub data: Vec<u8>,
    pub finalized: bool,
}

impl FlakySink {
    pub fn failing_on(fail_on: usize) -> Self {
        Self {
            fail_on,
            ..Self::default()
        }
    }
}

impl Sink for FlakySink {
    fn accept(&mut self, bytes: &[u8]) -> Result<()> {
        self.accepts += 1;
        if self.accepts == self.fail_on {
            return Err(SynthesisError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "peer went away",
            )));
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.finalized = true;
        Ok(())
    }
}

/// Decode little-endian 16-bit PCM.
pub fn decode_pcm(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}
