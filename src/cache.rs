use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::engine::SynthesisEngine;
use crate::error::Result;
use crate::registry::VoiceRegistry;
use crate::voice::Voice;

/// Loaded voices by name, shared across requests.
///
/// Lookups and inserts on the map are mutually exclusive, but voices load
/// outside the map lock: a miss takes a per-name load gate, so a name is
/// never loaded twice while hits on other names go through untouched.
/// Entries are never evicted. Synthesis on a cached voice is serialized by
/// the voice itself, so concurrent requests for one name queue up while
/// different names proceed in parallel.
pub struct VoiceCache<E: SynthesisEngine> {
    engine: Arc<E>,
    registry: VoiceRegistry,
    voices: Mutex<HashMap<String, Arc<Voice<E>>>>,
    loading: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<E: SynthesisEngine> VoiceCache<E> {
    pub fn new(engine: Arc<E>, registry: VoiceRegistry) -> Self {
        Self {
            engine,
            registry,
            voices: Mutex::new(HashMap::new()),
            loading: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &VoiceRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Return the cached voice for `name`, loading it on first use.
    pub fn get_or_load(&self, name: &str) -> Result<Arc<Voice<E>>> {
        if let Some(voice) = self.lock().get(name) {
            return Ok(Arc::clone(voice));
        }

        let gate = {
            let mut loading = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(loading.entry(name.to_string()).or_default())
        };
        let _loading = gate.lock().unwrap_or_else(PoisonError::into_inner);

        // Another request may have finished loading while we waited.
        if let Some(voice) = self.lock().get(name) {
            return Ok(Arc::clone(voice));
        }

        let descriptor = self.registry.resolve(name)?;
        let voice = Arc::new(Voice::load_new(descriptor, Arc::clone(&self.engine))?);
        let cached = {
            let mut voices = self.lock();
            voices.insert(name.to_string(), Arc::clone(&voice));
            voices.len()
        };
        // Later requests hit the map; waiters on this gate re-check it.
        // A gate is only dropped after a successful load.
        self.loading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        log::debug!("Cached voice '{name}' ({cached} cached)");
        Ok(voice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Release every cached voice and empty the cache.
    ///
    /// Meant for process shutdown. Each release waits for that voice's
    /// in-flight synthesis; callers still holding a voice get
    /// `UseAfterRelease` on their next request.
    pub fn shutdown(&self) {
        let voices: Vec<_> = self.lock().drain().map(|(_, voice)| voice).collect();
        for voice in &voices {
            voice.release();
        }
        log::info!("Voice cache shut down ({} voices released)", voices.len());
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Voice<E>>>> {
        self.voices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
