use std::time::Duration;

use crate::encoder::{EncoderSession, OutputFormat};
use crate::engine::SynthesisEngine;
use crate::error::{Result, SynthesisError};
use crate::sink::Sink;
use crate::voice::Voice;

/// Where a request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    /// Pulling frames from the engine.
    Synthesizing,
    /// Feeding a frame to, or flushing, a compressing encoder.
    Encoding,
    /// Handing bytes to the sink.
    Delivering,
    Complete,
    Failed,
}

/// Totals for one completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SynthesisStats {
    /// Bytes accepted by the sink, headers and trailers included.
    pub bytes_written: u64,
    /// Frames produced by the engine.
    pub frames: usize,
    /// Interleaved samples across all frames.
    pub samples: u64,
    /// Sample rate of the utterance (0 when no frames were produced).
    pub sample_rate: u32,
    /// Channel count of the utterance (0 when no frames were produced).
    pub channels: u16,
}

impl SynthesisStats {
    /// Audio duration of the utterance.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let per_channel = self.samples / u64::from(self.channels);
        Duration::from_secs_f64(per_channel as f64 / f64::from(self.sample_rate))
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration().as_secs_f64()
    }
}

/// Runs one request: voice frames -> encoder session -> sink.
///
/// The request completes only after the frames are exhausted, the encoder
/// is flushed and the sink is finalized. On any error the utterance is
/// dropped first, which releases the engine's synthesis state, and the
/// error is returned as-is. The sink may then hold partial output (a
/// truncated file, a half-sent body); it is not finalized.
pub struct SynthesisDriver {
    session: Option<Box<dyn EncoderSession>>,
    state: DriverState,
}

impl SynthesisDriver {
    /// Open a driver for the requested output format.
    pub fn new(format: &OutputFormat) -> Result<Self> {
        Ok(Self::with_session(format.open_session()?))
    }

    /// Use a caller-built encoder session.
    pub fn with_session(session: Box<dyn EncoderSession>) -> Self {
        Self {
            session: Some(session),
            state: DriverState::Idle,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Synthesize `text` with `voice` into `sink`. A driver runs once.
    pub fn run<E, S>(&mut self, voice: &Voice<E>, text: &str, sink: &mut S) -> Result<SynthesisStats>
    where
        E: SynthesisEngine,
        S: Sink + ?Sized,
    {
        let session = self.session.take().ok_or_else(|| {
            SynthesisError::Synthesis("synthesis driver has already run".to_string())
        })?;

        match self.drive(session, voice, text, sink) {
            Ok(stats) => {
                self.state = DriverState::Complete;
                log::debug!(
                    "Synthesized {:.2}s with '{}': {} frames, {} bytes",
                    stats.duration_secs(),
                    voice.name(),
                    stats.frames,
                    stats.bytes_written
                );
                Ok(stats)
            }
            Err(e) => {
                let failed_in = self.state;
                self.state = DriverState::Failed;
                log::warn!("Synthesis with '{}' failed while {failed_in:?}: {e}", voice.name());
                Err(e)
            }
        }
    }

    fn drive<E, S>(
        &mut self,
        session: Box<dyn EncoderSession>,
        voice: &Voice<E>,
        text: &str,
        sink: &mut S,
    ) -> Result<SynthesisStats>
    where
        E: SynthesisEngine,
        S: Sink + ?Sized,
    {
        let mut session = session;
        let compressing = session.is_compressing();
        let mut stats = SynthesisStats::default();
        let mut out = Vec::new();

        self.state = DriverState::Synthesizing;
        let mut utterance = voice.synthesize(text)?;

        for frame in utterance.by_ref() {
            let frame = frame?;
            if stats.frames == 0 {
                stats.sample_rate = frame.sample_rate;
                stats.channels = frame.channels;
            }
            stats.frames += 1;
            stats.samples += frame.samples.len() as u64;

            if compressing {
                self.state = DriverState::Encoding;
            }
            session.encode(&frame, &mut out)?;
            self.deliver(sink, &mut out, &mut stats)?;
            self.state = DriverState::Synthesizing;
        }
        // Unlock the voice before the flush so queued requests can start.
        drop(utterance);

        if compressing {
            self.state = DriverState::Encoding;
        }
        let patches = session.finish(&mut out)?;
        self.deliver(sink, &mut out, &mut stats)?;

        self.state = DriverState::Delivering;
        for patch in &patches {
            if !sink.rewrite(patch.offset, &patch.bytes)? {
                log::debug!("Sink cannot rewrite; keeping streaming header");
                break;
            }
        }
        sink.finalize()?;
        Ok(stats)
    }

    fn deliver<S: Sink + ?Sized>(
        &mut self,
        sink: &mut S,
        out: &mut Vec<u8>,
        stats: &mut SynthesisStats,
    ) -> Result<()> {
        if out.is_empty() {
            return Ok(());
        }
        self.state = DriverState::Delivering;
        sink.accept(out)?;
        stats.bytes_written += out.len() as u64;
        out.clear();
        Ok(())
    }
}

/// Synthesize `text` with `voice` into `sink` in the requested format.
pub fn synthesize_with_voice<E, S>(
    voice: &Voice<E>,
    text: &str,
    format: &OutputFormat,
    sink: &mut S,
) -> Result<SynthesisStats>
where
    E: SynthesisEngine,
    S: Sink + ?Sized,
{
    SynthesisDriver::new(format)?.run(voice, text, sink)
}
