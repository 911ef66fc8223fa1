use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, SynthesisError};

/// One row of the built-in voice table produced at build time.
///
/// `loader` is engine specific; for Flite it is the voice library stem
/// (e.g. `cmu_us_kal`) whose `register_*` function creates the voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinVoice {
    pub name: &'static str,
    pub loader: &'static str,
}

/// Where a voice comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VoiceSource {
    /// Compiled into the engine; carries the engine-specific loader id.
    BuiltIn(&'static str),
    /// Loaded at runtime from a voice file.
    File(PathBuf),
}

/// Immutable description of a resolvable voice. Identity is the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoiceDescriptor {
    pub name: String,
    pub source: VoiceSource,
}

impl VoiceDescriptor {
    pub fn builtin(voice: &BuiltinVoice) -> Self {
        Self {
            name: voice.name.to_string(),
            source: VoiceSource::BuiltIn(voice.loader),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            source: VoiceSource::File(path),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.source, VoiceSource::BuiltIn(_))
    }
}

impl fmt::Display for VoiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            VoiceSource::BuiltIn(loader) => write!(f, "{} (built-in {loader})", self.name),
            VoiceSource::File(path) => write!(f, "{} (file {})", self.name, path.display()),
        }
    }
}

/// Lookup table of voices known to this process.
///
/// The built-in rows are plain data handed in by whoever discovered them
/// (the engine's build-time table, or a test fixture). Names that are not
/// built-in are tried as voice file paths.
#[derive(Debug, Clone, Default)]
pub struct VoiceRegistry {
    builtins: Vec<BuiltinVoice>,
}

impl VoiceRegistry {
    pub fn new(builtins: impl IntoIterator<Item = BuiltinVoice>) -> Self {
        let mut table: Vec<BuiltinVoice> = Vec::new();
        for voice in builtins {
            if table.iter().any(|v| v.name == voice.name) {
                log::warn!("Duplicate built-in voice '{}' ignored", voice.name);
                continue;
            }
            table.push(voice);
        }
        Self { builtins: table }
    }

    /// Built-in voices in table order.
    pub fn list_available(&self) -> Vec<VoiceDescriptor> {
        self.builtins.iter().map(VoiceDescriptor::builtin).collect()
    }

    /// Built-in voice names in table order.
    pub fn builtin_names(&self) -> Vec<&'static str> {
        self.builtins.iter().map(|v| v.name).collect()
    }

    /// Resolve a name: exact built-in match first, then a voice file path.
    ///
    /// A name is only treated as a path when it looks like one (contains a
    /// path separator or a `.`), and the file has to exist.
    pub fn resolve(&self, name: &str) -> Result<VoiceDescriptor> {
        if let Some(voice) = self.builtins.iter().find(|v| v.name == name) {
            return Ok(VoiceDescriptor::builtin(voice));
        }

        if !looks_like_path(name) {
            return Err(SynthesisError::NotFound(name.to_string()));
        }

        let path = Path::new(name);
        if !path.is_file() {
            return Err(SynthesisError::missing_file(path.to_path_buf()));
        }
        log::debug!("Resolved '{name}' as a voice file");
        Ok(VoiceDescriptor::file(path))
    }
}

fn looks_like_path(name: &str) -> bool {
    name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) || name.contains('.')
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    const TABLE: &[BuiltinVoice] = &[
        BuiltinVoice { name: "kal", loader: "cmu_us_kal" },
        BuiltinVoice { name: "slt", loader: "cmu_us_slt" },
        BuiltinVoice { name: "kal", loader: "cmu_us_kal_dup" },
    ];

    #[test]
    fn test_list_available_keeps_order_and_dedups() {
        let registry = VoiceRegistry::new(TABLE.iter().copied());
        let names: Vec<_> = registry.list_available().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["kal", "slt"]);
        assert_eq!(registry.builtin_names(), vec!["kal", "slt"]);
    }

    #[test]
    fn test_resolve_builtin() {
        let registry = VoiceRegistry::new(TABLE.iter().copied());
        let desc = registry.resolve("slt").unwrap();
        assert_eq!(desc.source, VoiceSource::BuiltIn("cmu_us_slt"));
        assert!(desc.is_builtin());
    }

    #[test]
    fn test_resolve_unknown_name() {
        let registry = VoiceRegistry::new(TABLE.iter().copied());
        assert!(matches!(registry.resolve("awb"), Err(SynthesisError::NotFound(_))));
        assert!(matches!(
            registry.resolve("no/such/voice.flitevox"),
            Err(SynthesisError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.flitevox");
        std::fs::write(&path, b"voice").unwrap();

        let registry = VoiceRegistry::new(TABLE.iter().copied());
        let desc = registry.resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(desc.source, VoiceSource::File(path.clone()));
        assert_eq!(desc.name, path.display().to_string());
    }
}
