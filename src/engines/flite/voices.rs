//! Built-in voice table.
//!
//! `build.rs` emits a `flite_voice_<name>` cfg for every voice it linked, so
//! the table only lists voices that are actually present in this binary.

use std::ptr;

use super::ffi::CstVoice;
use crate::registry::BuiltinVoice;

/// A linked voice and the function that instantiates it.
pub(crate) struct FliteLoader {
    pub voice: BuiltinVoice,
    pub register: unsafe fn() -> *mut CstVoice,
}

macro_rules! flite_voices {
    ($($module:ident: $cfg:ident, $name:literal, $stem:literal, $register:ident, $cached:ident;)*) => {
        $(
            #[cfg($cfg)]
            mod $module {
                use super::*;

                extern "C" {
                    fn $register(voxdir: *const std::os::raw::c_char) -> *mut CstVoice;
                    static mut $cached: *mut CstVoice;
                }

                /// Register a fresh voice. libflite caches the first voice in
                /// a global; clearing it keeps every handle independently owned.
                pub(super) unsafe fn register() -> *mut CstVoice {
                    unsafe {
                        $cached = ptr::null_mut();
                        $register(ptr::null())
                    }
                }
            }
        )*

        pub(crate) fn loaders() -> Vec<FliteLoader> {
            #[allow(unused_mut)]
            let mut table = Vec::new();
            $(
                #[cfg($cfg)]
                table.push(FliteLoader {
                    voice: BuiltinVoice { name: $name, loader: $stem },
                    register: $module::register,
                });
            )*
            table
        }
    };
}

flite_voices! {
    kal: flite_voice_kal, "kal", "cmu_us_kal", register_cmu_us_kal, cmu_us_kal_diphone;
    awb_time: flite_voice_awb_time, "awb_time", "cmu_time_awb", register_cmu_time_awb, cmu_time_awb_ldom;
    kal16: flite_voice_kal16, "kal16", "cmu_us_kal16", register_cmu_us_kal16, cmu_us_kal16_diphone;
    awb: flite_voice_awb, "awb", "cmu_us_awb", register_cmu_us_awb, cmu_us_awb_cg;
    rms: flite_voice_rms, "rms", "cmu_us_rms", register_cmu_us_rms, cmu_us_rms_cg;
    slt: flite_voice_slt, "slt", "cmu_us_slt", register_cmu_us_slt, cmu_us_slt_cg;
}

/// Built-in voices linked into this build, in table order.
pub fn builtin_voice_table() -> Vec<BuiltinVoice> {
    loaders().into_iter().map(|l| l.voice).collect()
}
