use dashmap::DashMap;

use super::strategies::StrategyKind;

/// Last strategy that succeeded, per hostname. Last write wins.
#[derive(Debug, Default)]
pub struct SiteStrategyCache {
    entries: DashMap<String, StrategyKind>,
}

impl SiteStrategyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hostname: &str) -> Option<StrategyKind> {
        self.entries.get(hostname).map(|entry| *entry)
    }

    pub fn remember(&self, hostname: &str, kind: StrategyKind) {
        self.entries.insert(hostname.to_string(), kind);
    }

    pub fn forget(&self, hostname: &str) {
        self.entries.remove(hostname);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
