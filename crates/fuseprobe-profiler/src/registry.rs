//! Backend registry.
//!
//! Maps a backend name to a constructor. [`BackendRegistry::with_builtin`]
//! holds `command` and `simulated`; callers may register more before
//! connecting.

use fuseprobe_common::{BackendConfig, ProfileError};
use indexmap::IndexMap;

use crate::command::CommandProfiler;
use crate::profiler::Profiler;
use crate::simulated::SimulatedProfiler;

/// Constructs a profiler from `[backend]`.
pub type BackendFactory = fn(&BackendConfig) -> Result<Box<dyn Profiler>, ProfileError>;

struct BackendEntry {
    description: &'static str,
    factory: BackendFactory,
}

/// Name → constructor table for profiling backends.
pub struct BackendRegistry {
    entries: IndexMap<String, BackendEntry>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl BackendRegistry {
    /// A registry with no backends.
    pub fn empty() -> Self {
        Self { entries: IndexMap::new() }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("command", "runs an external profiling command per model", |config| {
            Ok(Box::new(CommandProfiler::from_config(config)?))
        });
        registry.register(
            "simulated",
            "deterministic cost model over descriptor artifacts, no device needed",
            |config| Ok(Box::new(SimulatedProfiler::from_config(config)?)),
        );
        registry
    }

    /// Add or replace a backend.
    pub fn register(&mut self, name: impl Into<String>, description: &'static str, factory: BackendFactory) {
        self.entries.insert(name.into(), BackendEntry { description, factory });
    }

    /// `(name, description)` in registration order.
    pub fn list(&self) -> Vec<(&str, &'static str)> {
        self.entries.iter().map(|(name, e)| (name.as_str(), e.description)).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Construct the backend named by `config.name` without touching the device.
    pub fn create(&self, config: &BackendConfig) -> Result<Box<dyn Profiler>, ProfileError> {
        let entry = self
            .entries
            .get(&config.name)
            .ok_or_else(|| ProfileError::UnknownBackend(config.name.clone()))?;
        (entry.factory)(config)
    }

    /// Construct the backend and check its device connection.
    pub fn connect(&self, config: &BackendConfig) -> Result<Box<dyn Profiler>, ProfileError> {
        let mut profiler = self.create(config)?;
        profiler.check_connection(config.timeout())?;
        tracing::info!(backend = %config.name, "backend connected");
        Ok(profiler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedProfiler;
    use crate::profiler::ProfileSample;

    #[test]
    fn test_builtin_backends() {
        let registry = BackendRegistry::with_builtin();
        let names: Vec<_> = registry.list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["command", "simulated"]);

        let profiler = registry.connect(&BackendConfig::default()).unwrap();
        assert_eq!(profiler.name(), "simulated");
    }

    #[test]
    fn test_unknown_backend() {
        let config = BackendConfig { name: "tflite".into(), ..BackendConfig::default() };
        let err = BackendRegistry::with_builtin().create(&config).err().unwrap();
        assert_eq!(err, ProfileError::UnknownBackend("tflite".into()));
    }

    #[test]
    fn test_register_custom_backend() {
        let mut registry = BackendRegistry::empty();
        registry.register("scripted", "test double", |_| {
            Ok(Box::new(ScriptedProfiler::constant(ProfileSample::new(1.0, 0.0, 1))))
        });
        let config = BackendConfig { name: "scripted".into(), ..BackendConfig::default() };
        assert!(registry.contains("scripted"));
        assert_eq!(registry.connect(&config).unwrap().name(), "scripted");
    }
}
