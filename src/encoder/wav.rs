use super::{AudioType, EncoderOptions, EncoderSession, HeaderPatch, StreamFormat};
use crate::error::Result;
use crate::AudioFrame;

/// Size of the canonical 44-byte RIFF/WAVE header.
pub const WAV_HEADER_LEN: usize = 44;

/// Size written into RIFF/data length fields while the final length is
/// unknown. Readers of live streams treat it as "until end of stream".
const STREAMING_LEN: u32 = u32::MAX;

/// Forwards 16-bit PCM unchanged, optionally behind a WAV header.
///
/// The header is emitted with the first frame. Its size fields start as
/// placeholders and are patched by the driver after the stream ends when
/// the sink supports rewriting. Empty utterances produce no bytes at all.
#[derive(Debug)]
pub struct PassThrough {
    with_header: bool,
    format: Option<StreamFormat>,
    data_len: u64,
}

impl PassThrough {
    /// `Wav` and `Raw` accept no options.
    pub fn new(audio_type: AudioType, options: &EncoderOptions) -> Result<Self> {
        options.check_keys(audio_type, &[])?;
        Ok(Self {
            with_header: audio_type == AudioType::Wav,
            format: None,
            data_len: 0,
        })
    }
}

impl EncoderSession for PassThrough {
    fn is_compressing(&self) -> bool {
        false
    }

    fn encode(&mut self, frame: &AudioFrame, out: &mut Vec<u8>) -> Result<()> {
        match self.format {
            Some(format) => format.check(frame)?,
            None => {
                let format = StreamFormat::of(frame);
                if self.with_header {
                    out.extend_from_slice(&wav_header(&wav_spec(format), STREAMING_LEN));
                }
                self.format = Some(format);
            }
        }

        out.reserve(frame.samples.len() * 2);
        for sample in &frame.samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        self.data_len += frame.samples.len() as u64 * 2;
        Ok(())
    }

    fn finish(self: Box<Self>, _out: &mut Vec<u8>) -> Result<Vec<HeaderPatch>> {
        if !self.with_header || self.format.is_none() {
            return Ok(Vec::new());
        }
        let data_len = u32::try_from(self.data_len).unwrap_or(STREAMING_LEN);
        let riff_len = data_len.saturating_add(WAV_HEADER_LEN as u32 - 8);
        Ok(vec![
            HeaderPatch {
                offset: 4,
                bytes: riff_len.to_le_bytes().to_vec(),
            },
            HeaderPatch {
                offset: 40,
                bytes: data_len.to_le_bytes().to_vec(),
            },
        ])
    }
}

fn wav_spec(format: StreamFormat) -> hound::WavSpec {
    hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Canonical PCM header for `spec` with `data_len` bytes of samples.
pub fn wav_header(spec: &hound::WavSpec, data_len: u32) -> [u8; WAV_HEADER_LEN] {
    let block_align = spec.channels * (spec.bits_per_sample / 8);
    let byte_rate = spec.sample_rate * u32::from(block_align);
    let riff_len = data_len.saturating_add(WAV_HEADER_LEN as u32 - 8);

    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_len.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&spec.channels.to_le_bytes());
    header[24..28].copy_from_slice(&spec.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&spec.bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    header
}
