//! Speaker output through rodio.
//!
//! [`PlaybackSink`] takes the WAV byte stream the driver produces and plays
//! it on the default output device while synthesis is still running:
//! once the header is in, every chunk of samples is queued on a
//! `rodio::Sink` as it arrives. `finalize` blocks until playback ends.

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder};

use crate::encoder::wav::WAV_HEADER_LEN;
use crate::error::{Result, SynthesisError};
use crate::sink::Sink;

/// Plays a streamed WAV body on the default audio device.
///
/// Only 16-bit PCM WAV input is understood, so pair it with
/// [`crate::OutputFormat::wav`]. Header size fields are ignored; the
/// streaming placeholder is fine.
pub struct PlaybackSink {
    // Must outlive `player`.
    _stream: OutputStream,
    player: rodio::Sink,
    reader: WavChunks,
    closed: bool,
}

impl PlaybackSink {
    /// Open the default output device.
    pub fn open() -> Result<Self> {
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| SynthesisError::Playback(e.to_string()))?;
        let player = rodio::Sink::connect_new(stream.mixer());
        log::debug!("Opened default audio output");
        Ok(Self {
            _stream: stream,
            player,
            reader: WavChunks::default(),
            closed: false,
        })
    }

    pub fn set_volume(&self, volume: f32) {
        self.player.set_volume(volume);
    }
}

impl Sink for PlaybackSink {
    fn accept(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(SynthesisError::SinkClosed);
        }
        if let Some(chunk) = self.reader.push(bytes)? {
            self.player
                .append(SamplesBuffer::new(chunk.channels, chunk.sample_rate, chunk.samples));
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.reader.pending_len() > 0 {
            log::warn!("Dropping {} trailing bytes of audio", self.reader.pending_len());
        }
        self.player.sleep_until_end();
        Ok(())
    }
}

/// Samples ready for playback.
#[derive(Debug, Clone, PartialEq)]
struct PcmChunk {
    channels: u16,
    sample_rate: u32,
    samples: Vec<f32>,
}

/// Splits a streamed 16-bit PCM WAV body into playable chunks.
#[derive(Debug, Default)]
struct WavChunks {
    format: Option<(u16, u32)>,
    pending: Vec<u8>,
}

impl WavChunks {
    fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn push(&mut self, bytes: &[u8]) -> Result<Option<PcmChunk>> {
        self.pending.extend_from_slice(bytes);

        let (channels, sample_rate) = match self.format {
            Some(format) => format,
            None => {
                if self.pending.len() < WAV_HEADER_LEN {
                    return Ok(None);
                }
                let format = parse_header(&self.pending[..WAV_HEADER_LEN])?;
                self.pending.drain(..WAV_HEADER_LEN);
                self.format = Some(format);
                format
            }
        };

        // Whole frames only; an odd trailing byte waits for the next chunk.
        let frame_bytes = 2 * usize::from(channels);
        let usable = self.pending.len() - self.pending.len() % frame_bytes;
        if usable == 0 {
            return Ok(None);
        }
        let samples = self
            .pending
            .drain(..usable)
            .collect::<Vec<u8>>()
            .chunks_exact(2)
            .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0)
            .collect();
        Ok(Some(PcmChunk {
            channels,
            sample_rate,
            samples,
        }))
    }
}

fn parse_header(header: &[u8]) -> Result<(u16, u32)> {
    let field_u16 = |at: usize| u16::from_le_bytes([header[at], header[at + 1]]);
    if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" || &header[36..40] != b"data" {
        return Err(SynthesisError::Playback(
            "playback needs a WAV stream".to_string(),
        ));
    }
    if field_u16(20) != 1 || field_u16(34) != 16 {
        return Err(SynthesisError::Playback(
            "playback needs 16-bit PCM".to_string(),
        ));
    }
    let channels = field_u16(22);
    let sample_rate = u32::from_le_bytes([header[24], header[25], header[26], header[27]]);
    if channels == 0 || sample_rate == 0 {
        return Err(SynthesisError::Playback(format!(
            "bad WAV format: {channels} channels at {sample_rate}Hz"
        )));
    }
    Ok((channels, sample_rate))
}
