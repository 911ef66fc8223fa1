//! Speech synthesis engines.
//!
//! This module contains implementations of [`crate::SynthesisEngine`].
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `flite` - CMU Flite (links libflite and its voice libraries)

#[cfg(feature = "flite")]
pub mod flite;
