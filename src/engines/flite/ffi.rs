//! FFI bindings for the parts of CMU Flite (2.x) the engine uses.

use std::os::raw::{c_char, c_float, c_int, c_void};

/// Opaque feature list.
pub enum CstFeatures {}
/// Opaque value cell.
pub enum CstVal {}

/// Leading fields of `cst_voice`; only `name` and `features` are accessed.
#[repr(C)]
pub struct CstVoice {
    pub name: *const c_char,
    pub features: *mut CstFeatures,
    pub ffunctions: *mut CstFeatures,
}

#[repr(C)]
pub struct CstWave {
    pub type_: *const c_char,
    pub sample_rate: c_int,
    pub num_samples: c_int,
    pub num_channels: c_int,
    pub samples: *mut i16,
}

pub type CstAudioStreamCallback = unsafe extern "C" fn(
    w: *const CstWave,
    start: c_int,
    size: c_int,
    last: c_int,
    asi: *mut CstAudioStreamingInfo,
) -> c_int;

#[repr(C)]
pub struct CstAudioStreamingInfo {
    pub min_buffsize: c_int,
    pub asc: Option<CstAudioStreamCallback>,
    pub utt: *const c_void,
    pub item: *const c_void,
    pub userdata: *mut c_void,
}

pub const CST_AUDIO_STREAM_STOP: c_int = -1;
pub const CST_AUDIO_STREAM_CONT: c_int = 0;

pub type LangInitFn = unsafe extern "C" fn(v: *mut CstVoice);
pub type LexInitFn = unsafe extern "C" fn() -> *mut c_void;

extern "C" {
    pub fn flite_init() -> c_int;
    pub fn flite_add_lang(langname: *const c_char, lang_init: LangInitFn, lex_init: LexInitFn) -> c_int;
    pub fn usenglish_init(v: *mut CstVoice);
    pub fn cmulex_init() -> *mut c_void;
    #[cfg(flite_lang_indic)]
    pub fn cmu_indic_lang_init(v: *mut CstVoice);
    #[cfg(flite_lang_indic)]
    pub fn cmu_indic_lex_init() -> *mut c_void;
    #[cfg(flite_lang_grapheme)]
    pub fn cmu_grapheme_lang_init(v: *mut CstVoice);
    #[cfg(flite_lang_grapheme)]
    pub fn cmu_grapheme_lex_init() -> *mut c_void;

    pub fn flite_text_to_speech(text: *const c_char, voice: *mut CstVoice, outtype: *const c_char) -> c_float;
    #[cfg(not(flite_no_voice_load))]
    pub fn flite_voice_load(voice_filename: *const c_char) -> *mut CstVoice;
    pub fn delete_voice(v: *mut CstVoice);

    pub fn new_audio_streaming_info() -> *mut CstAudioStreamingInfo;
    pub fn audio_streaming_info_val(asi: *const CstAudioStreamingInfo) -> *const CstVal;

    pub fn feat_set(f: *mut CstFeatures, name: *const c_char, v: *const CstVal);
    pub fn flite_feat_remove(f: *mut CstFeatures, name: *const c_char) -> c_int;
    pub fn get_param_string(f: *const CstFeatures, name: *const c_char, def: *const c_char) -> *const c_char;
}
