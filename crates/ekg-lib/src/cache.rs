use crate::{
    config::AnalysisConfig,
    error::Result,
    pipeline::{analyze, AnalysisResult},
};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Entries kept by [`AnalysisCache::new`].
pub const DEFAULT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: u64,
    len: usize,
    sampling_rate: u32,
    config: [u64; 11],
}

impl CacheKey {
    fn new(signal: &[f64], sampling_rate: u32, cfg: &AnalysisConfig) -> Self {
        Self {
            fingerprint: signal_fingerprint(signal, sampling_rate),
            len: signal.len(),
            sampling_rate,
            config: cfg.key_bits(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    result: AnalysisResult,
    last_used: u64,
}

/// Memoizes [`analyze`] by signal fingerprint, sampling rate and config,
/// holding at most `capacity` results and evicting the least recently used.
///
/// Analysis is deterministic, so a hit is indistinguishable from a fresh run.
/// Errors are not cached.
#[derive(Debug)]
pub struct AnalysisCache {
    entries: HashMap<CacheKey, CacheEntry>,
    capacity: usize,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` results (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
            tick: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_analyze(
        &mut self,
        signal: &[f64],
        sampling_rate: u32,
        cfg: &AnalysisConfig,
    ) -> Result<&AnalysisResult> {
        let key = CacheKey::new(signal, sampling_rate, cfg);
        self.tick += 1;
        if let Some(entry) = self.entries.get_mut(&key) {
            self.hits += 1;
            entry.last_used = self.tick;
            log::debug!("analysis cache hit ({} samples)", signal.len());
        } else {
            self.misses += 1;
            let result = analyze(signal, sampling_rate, cfg)?;
            if self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
            self.entries.insert(
                key,
                CacheEntry {
                    result,
                    last_used: self.tick,
                },
            );
        }
        Ok(&self.entries[&key].result)
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            self.entries.remove(&key);
            log::debug!("analysis cache evicted {:016x}", key.fingerprint);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Stable fingerprint of a recording, for cache keys, logging and file naming.
pub fn signal_fingerprint(signal: &[f64], sampling_rate: u32) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    sampling_rate.hash(&mut hasher);
    signal.len().hash(&mut hasher);
    for x in signal {
        x.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::{simulate, SimulationConfig};

    fn recording() -> Vec<f64> {
        simulate(&SimulationConfig {
            duration_s: 4.0,
            ..SimulationConfig::default()
        })
        .unwrap()
        .data
    }

    #[test]
    fn identical_request_hits() {
        let signal = recording();
        let cfg = AnalysisConfig::default();
        let mut cache = AnalysisCache::new();
        let first = cache.get_or_analyze(&signal, 1000, &cfg).unwrap().clone();
        let second = cache.get_or_analyze(&signal, 1000, &cfg).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn any_key_change_misses() {
        let signal = recording();
        let cfg = AnalysisConfig::default();
        let mut cache = AnalysisCache::new();
        cache.get_or_analyze(&signal, 1000, &cfg).unwrap();
        cache.get_or_analyze(&signal, 500, &cfg).unwrap();
        let tweaked = AnalysisConfig {
            qt_high_ms: 440.0,
            ..cfg
        };
        cache.get_or_analyze(&signal, 1000, &tweaked).unwrap();
        let mut shifted = signal.clone();
        shifted[0] += 1e-9;
        cache.get_or_analyze(&shifted, 1000, &cfg).unwrap();
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.hits(), 0);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_bounds_entries_and_evicts_least_recent() {
        let base = recording();
        let signals: Vec<Vec<f64>> = (0..3)
            .map(|k| base.iter().map(|x| x + k as f64 * 1e-6).collect())
            .collect();
        let cfg = AnalysisConfig::default();
        let mut cache = AnalysisCache::with_capacity(2);
        cache.get_or_analyze(&signals[0], 1000, &cfg).unwrap();
        cache.get_or_analyze(&signals[1], 1000, &cfg).unwrap();
        // touch the first so the second becomes the oldest
        cache.get_or_analyze(&signals[0], 1000, &cfg).unwrap();
        cache.get_or_analyze(&signals[2], 1000, &cfg).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!((cache.hits(), cache.misses()), (1, 3));

        cache.get_or_analyze(&signals[0], 1000, &cfg).unwrap();
        assert_eq!(cache.hits(), 2);
        cache.get_or_analyze(&signals[1], 1000, &cfg).unwrap();
        assert_eq!(cache.misses(), 4);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let mut cache = AnalysisCache::with_capacity(0);
        assert_eq!(cache.capacity(), 1);
        cache
            .get_or_analyze(&recording(), 1000, &AnalysisConfig::default())
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(AnalysisCache::new().capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn errors_are_not_stored() {
        let mut cache = AnalysisCache::new();
        assert!(cache
            .get_or_analyze(&[0.0; 100], 80, &AnalysisConfig::default())
            .is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn fingerprint_tracks_rate_and_samples() {
        let signal = [0.1, 0.2, 0.3];
        assert_eq!(signal_fingerprint(&signal, 250), signal_fingerprint(&signal, 250));
        assert_ne!(signal_fingerprint(&signal, 250), signal_fingerprint(&signal, 500));
        assert_ne!(signal_fingerprint(&signal, 250), signal_fingerprint(&[0.1, 0.2], 250));
    }
}
