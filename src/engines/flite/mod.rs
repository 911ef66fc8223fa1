//! CMU Flite synthesis engine.
//!
//! Flite is a small C synthesis library with voices either linked in at
//! build time or loaded from `.flitevox` files.
//!
//! # System Requirements
//!
//! libflite (2.x) and its voice libraries must be installed:
//! - **Linux**: `sudo apt-get install flite1-dev`
//! - **macOS**: `brew install flite`
//!
//! # Build Configuration
//!
//! | Variable              | Meaning                                            |
//! |-----------------------|----------------------------------------------------|
//! | `FLITE_VOICES`        | Comma-separated voices to link (default: all below) |
//! | `FLITE_LIB_DIR`       | Extra library search path                          |
//! | `FLITE_NO_VOICE_LOAD` | Set when libflite lacks `flite_voice_load`         |
//! | `FLITE_LANGS`         | Extra languages: `indic`, `grapheme` (default: probed) |
//! | `FLITE_INCLUDE_DIR`   | Where to find `flite_version.h`                    |
//!
//! # Built-in Voices
//!
//! | Name       | Library            | Notes                    |
//! |------------|--------------------|--------------------------|
//! | `kal`      | `cmu_us_kal`       | 8kHz diphone             |
//! | `kal16`    | `cmu_us_kal16`     | 16kHz diphone            |
//! | `awb_time` | `cmu_time_awb`     | limited domain: time     |
//! | `awb`      | `cmu_us_awb`       | clustergen               |
//! | `rms`      | `cmu_us_rms`       | clustergen               |
//! | `slt`      | `cmu_us_slt`       | clustergen               |

pub mod engine;
mod ffi;
pub mod voices;

pub use engine::{FliteEngine, FliteFrames, FliteVoice};

/// `FLITE_PROJECT_VERSION` of the headers found at build time.
pub const CMU_FLITE_VERSION: Option<&str> = option_env!("FLITE_PROJECT_VERSION");
pub use voices::builtin_voice_table;
