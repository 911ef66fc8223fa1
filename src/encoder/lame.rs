//! FFI bindings for the parts of LAME the MP3 session uses.

use std::os::raw::{c_int, c_short, c_uchar};

/// Opaque LAME global flags.
pub enum LameGlobalFlags {}

pub const MONO: c_int = 3;
pub const JOINT_STEREO: c_int = 1;

pub const VBR_OFF: c_int = 0;

extern "C" {
    pub fn lame_init() -> *mut LameGlobalFlags;
    pub fn lame_close(gf: *mut LameGlobalFlags) -> c_int;

    pub fn lame_set_in_samplerate(gf: *mut LameGlobalFlags, rate: c_int) -> c_int;
    pub fn lame_set_num_channels(gf: *mut LameGlobalFlags, channels: c_int) -> c_int;
    pub fn lame_set_mode(gf: *mut LameGlobalFlags, mode: c_int) -> c_int;
    pub fn lame_set_VBR(gf: *mut LameGlobalFlags, vbr_mode: c_int) -> c_int;
    pub fn lame_set_brate(gf: *mut LameGlobalFlags, brate: c_int) -> c_int;
    pub fn lame_set_quality(gf: *mut LameGlobalFlags, quality: c_int) -> c_int;

    pub fn lame_init_params(gf: *mut LameGlobalFlags) -> c_int;

    pub fn lame_encode_buffer(
        gf: *mut LameGlobalFlags,
        pcm_l: *const c_short,
        pcm_r: *const c_short,
        nsamples: c_int,
        mp3buf: *mut c_uchar,
        mp3buf_size: c_int,
    ) -> c_int;

    pub fn lame_encode_buffer_interleaved(
        gf: *mut LameGlobalFlags,
        pcm: *mut c_short,
        nsamples: c_int,
        mp3buf: *mut c_uchar,
        mp3buf_size: c_int,
    ) -> c_int;

    pub fn lame_encode_flush(
        gf: *mut LameGlobalFlags,
        mp3buf: *mut c_uchar,
        mp3buf_size: c_int,
    ) -> c_int;
}
