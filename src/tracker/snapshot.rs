use std::collections::BTreeMap;

use crate::compiler::Stats;
use crate::core::route_from_entry_name;

/// Route → chunk hash, kept per target from the last successful pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkHashSnapshot {
    pages: BTreeMap<String, String>,
}

impl ChunkHashSnapshot {
    /// Keep only route-shaped chunks (`pages/...`).
    pub fn from_stats(stats: &Stats) -> Self {
        let pages = stats
            .chunks
            .iter()
            .filter_map(|c| Some((route_from_entry_name(&c.name)?, c.hash.clone())))
            .collect();
        Self { pages }
    }

    pub fn get(&self, route: &str) -> Option<&str> {
        self.pages.get(route).map(String::as_str)
    }

    pub fn contains(&self, route: &str) -> bool {
        self.pages.contains_key(route)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pages.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pages.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ChunkHashSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
