//! MP3 output through LAME.
//!
//! Option parsing is always available so requests can be validated; the
//! encoder itself needs the `mp3` Cargo feature (links `libmp3lame`).
//!
//! Recognized options:
//!
//! | Key       | Values                                   | Default |
//! |-----------|------------------------------------------|---------|
//! | `bitrate` | kbps, one of 8 16 24 32 40 48 56 64 80 96 112 128 160 192 224 256 320 | 64 |
//! | `quality` | 0 (best, slowest) ..= 9 (worst, fastest) | 5       |

use super::{AudioType, EncoderOptions, EncoderSession};
use crate::error::{Result, SynthesisError};

/// Bitrates LAME accepts for constant-bitrate encoding.
pub const BITRATES: &[u32] = &[
    8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320,
];

/// Validated MP3 encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp3Settings {
    /// Constant bitrate in kbps.
    pub bitrate: u32,
    /// LAME algorithm quality (0 = best).
    pub quality: u8,
}

impl Default for Mp3Settings {
    fn default() -> Self {
        Self {
            bitrate: 64,
            quality: 5,
        }
    }
}

impl Mp3Settings {
    pub fn from_options(options: &EncoderOptions) -> Result<Self> {
        options.check_keys(AudioType::Mp3, &["bitrate", "quality"])?;

        let mut settings = Self::default();
        if let Some(value) = options.get("bitrate") {
            let kbps: u32 = value
                .trim()
                .trim_end_matches("k")
                .parse()
                .map_err(|_| invalid("bitrate", value))?;
            if !BITRATES.contains(&kbps) {
                return Err(invalid("bitrate", value));
            }
            settings.bitrate = kbps;
        }
        if let Some(value) = options.get("quality") {
            let quality: u8 = value.trim().parse().map_err(|_| invalid("quality", value))?;
            if quality > 9 {
                return Err(invalid("quality", value));
            }
            settings.quality = quality;
        }
        Ok(settings)
    }
}

fn invalid(option: &str, value: &str) -> SynthesisError {
    SynthesisError::Encode(format!("mp3: invalid {option} '{value}'"))
}

#[cfg(feature = "mp3")]
pub(crate) fn open_session(options: &EncoderOptions) -> Result<Box<dyn EncoderSession>> {
    Ok(Box::new(Mp3Session::new(Mp3Settings::from_options(options)?)))
}

#[cfg(not(feature = "mp3"))]
pub(crate) fn open_session(options: &EncoderOptions) -> Result<Box<dyn EncoderSession>> {
    Mp3Settings::from_options(options)?;
    Err(SynthesisError::UnsupportedFormat(
        "mp3 (build with the `mp3` feature)".to_string(),
    ))
}

#[cfg(feature = "mp3")]
pub use session::Mp3Session;

#[cfg(feature = "mp3")]
mod session {
    use std::os::raw::c_int;
    use std::ptr;

    use super::super::lame::{self, LameGlobalFlags};
    use super::super::{EncoderSession, HeaderPatch, StreamFormat};
    use super::Mp3Settings;
    use crate::error::{Result, SynthesisError};
    use crate::AudioFrame;

    /// LAME needs 1.25 * samples + 7200 bytes of output space per call.
    fn output_bound(samples_per_channel: usize) -> usize {
        samples_per_channel * 5 / 4 + 7200
    }

    /// Compressing session. LAME buffers internally, so a frame may yield
    /// no bytes; everything left is emitted by `finish`.
    pub struct Mp3Session {
        settings: Mp3Settings,
        lame: *mut LameGlobalFlags,
        format: Option<StreamFormat>,
        mp3buf: Vec<u8>,
    }

    // Safety: the LAME handle is owned by this session and only used through
    // `&mut self`.
    unsafe impl Send for Mp3Session {}

    impl Mp3Session {
        pub fn new(settings: Mp3Settings) -> Self {
            Self {
                settings,
                lame: ptr::null_mut(),
                format: None,
                mp3buf: Vec::new(),
            }
        }

        /// Initialize LAME with the stream format of the first frame.
        fn init(&mut self, format: StreamFormat) -> Result<()> {
            if format.channels != 1 && format.channels != 2 {
                return Err(SynthesisError::Encode(format!(
                    "mp3: unsupported channel count {}",
                    format.channels
                )));
            }

            let gf = unsafe { lame::lame_init() };
            if gf.is_null() {
                return Err(SynthesisError::Encode("mp3: lame_init failed".to_string()));
            }

            let ok = unsafe {
                lame::lame_set_in_samplerate(gf, format.sample_rate as c_int);
                lame::lame_set_num_channels(gf, c_int::from(format.channels));
                lame::lame_set_mode(
                    gf,
                    if format.channels == 1 {
                        lame::MONO
                    } else {
                        lame::JOINT_STEREO
                    },
                );
                lame::lame_set_VBR(gf, lame::VBR_OFF);
                lame::lame_set_brate(gf, self.settings.bitrate as c_int);
                lame::lame_set_quality(gf, c_int::from(self.settings.quality));
                lame::lame_init_params(gf) >= 0
            };
            if !ok {
                unsafe { lame::lame_close(gf) };
                return Err(SynthesisError::Encode(
                    "mp3: lame_init_params rejected the stream parameters".to_string(),
                ));
            }

            log::debug!(
                "LAME initialized: {}Hz {}ch {}kbps q{}",
                format.sample_rate,
                format.channels,
                self.settings.bitrate,
                self.settings.quality
            );
            self.lame = gf;
            self.format = Some(format);
            Ok(())
        }
    }

    impl Drop for Mp3Session {
        fn drop(&mut self) {
            if !self.lame.is_null() {
                unsafe { lame::lame_close(self.lame) };
                self.lame = ptr::null_mut();
            }
        }
    }

    impl EncoderSession for Mp3Session {
        fn is_compressing(&self) -> bool {
            true
        }

        fn encode(&mut self, frame: &AudioFrame, out: &mut Vec<u8>) -> Result<()> {
            match self.format {
                Some(format) => format.check(frame)?,
                None => self.init(StreamFormat::of(frame))?,
            }

            let per_channel = frame.samples_per_channel();
            if per_channel == 0 {
                return Ok(());
            }
            let bound = output_bound(per_channel);
            if self.mp3buf.len() < bound {
                self.mp3buf.resize(bound, 0);
            }

            let encoded = unsafe {
                if frame.channels == 2 {
                    lame::lame_encode_buffer_interleaved(
                        self.lame,
                        frame.samples.as_ptr() as *mut i16,
                        per_channel as c_int,
                        self.mp3buf.as_mut_ptr(),
                        self.mp3buf.len() as c_int,
                    )
                } else {
                    lame::lame_encode_buffer(
                        self.lame,
                        frame.samples.as_ptr(),
                        ptr::null(),
                        per_channel as c_int,
                        self.mp3buf.as_mut_ptr(),
                        self.mp3buf.len() as c_int,
                    )
                }
            };
            if encoded < 0 {
                return Err(SynthesisError::Encode(format!(
                    "mp3: lame_encode_buffer returned {encoded}"
                )));
            }
            out.extend_from_slice(&self.mp3buf[..encoded as usize]);
            Ok(())
        }

        fn finish(mut self: Box<Self>, out: &mut Vec<u8>) -> Result<Vec<HeaderPatch>> {
            if self.lame.is_null() {
                return Ok(Vec::new());
            }
            // LAME wants at least 7200 bytes for the final frames.
            if self.mp3buf.len() < 7200 {
                self.mp3buf.resize(7200, 0);
            }
            let encoded = unsafe {
                lame::lame_encode_flush(
                    self.lame,
                    self.mp3buf.as_mut_ptr(),
                    self.mp3buf.len() as c_int,
                )
            };
            if encoded < 0 {
                return Err(SynthesisError::Encode(format!(
                    "mp3: lame_encode_flush returned {encoded}"
                )));
            }
            out.extend_from_slice(&self.mp3buf[..encoded as usize]);
            Ok(Vec::new())
        }
    }
}
