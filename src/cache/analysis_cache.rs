use crate::models::{CacheEntry, CacheStats, Recommendation, SymbolSummary};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CacheError {
    #[error("analysis cache lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Thread-safe in-memory store of the latest analysis per symbol
///
/// A single lock guards the map and is held only for the map operation
/// itself. Concurrent analyses of the same symbol are not serialized; the
/// last `put` wins.
#[derive(Clone, Default)]
pub struct AnalysisCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CacheEntry>>, CacheError> {
        self.entries
            .lock()
            .map_err(|e| CacheError::LockPoisoned(e.to_string()))
    }

    /// Store a fresh entry for `symbol`, replacing any previous one
    pub fn put(
        &self,
        symbol: &str,
        recommendation: Recommendation,
        spikes_analyzed: usize,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            symbol: symbol.to_string(),
            recommendation,
            spikes_analyzed,
            last_analysis: Utc::now(),
        };

        self.lock()?.insert(symbol.to_string(), entry);
        Ok(())
    }

    /// Latest entry for `symbol`, or None if never analyzed (or cleared)
    pub fn get(&self, symbol: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.lock()?.get(symbol).cloned())
    }

    /// Remove every entry, returning how many were dropped
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut entries = self.lock()?;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = self.lock()?;

        Ok(CacheStats {
            count: entries.len(),
            symbols: entries
                .iter()
                .map(|(symbol, entry)| {
                    (
                        symbol.clone(),
                        SymbolSummary {
                            spikes_analyzed: entry.spikes_analyzed,
                            last_analysis: entry.last_analysis,
                        },
                    )
                })
                .collect(),
        })
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.lock()?.is_empty())
    }
}
