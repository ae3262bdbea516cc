//! Per-key synthesis records.

use std::collections::BTreeMap;

use crate::key::{ResourceKey, ResourceRecord, Tier};
use crate::manifest::ResourceManifest;

/// Manifest keys that have no record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} manifest key(s) have no usable record: {}", .keys.len(), join_keys(.keys))]
pub struct MissingResources {
    pub keys: Vec<ResourceKey>,
}

fn join_keys(keys: &[ResourceKey]) -> String {
    keys.iter()
        .map(ResourceKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Records produced by the synthesizer, one per key.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    records: BTreeMap<ResourceKey, ResourceRecord>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, returning the one it replaced.
    pub fn insert(&mut self, record: ResourceRecord) -> Option<ResourceRecord> {
        self.records.insert(record.key.clone(), record)
    }

    pub fn get(&self, key: &str) -> Option<&ResourceRecord> {
        self.records.get(&ResourceKey::from(key))
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ResourceRecord> {
        self.records.remove(&ResourceKey::from(key))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in key order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.records.values()
    }

    /// Tier reached by `key`.
    pub fn tier_of(&self, key: &str) -> Option<Tier> {
        self.get(key).map(|r| r.tier)
    }

    /// Manifest keys without a record, in manifest order.
    pub fn missing(&self, manifest: &ResourceManifest) -> Vec<ResourceKey> {
        manifest
            .keys()
            .filter(|key| !self.records.contains_key(*key))
            .cloned()
            .collect()
    }

    /// Check that every manifest key resolved to some record.
    pub fn verify(&self, manifest: &ResourceManifest) -> Result<(), MissingResources> {
        let keys = self.missing(manifest);
        if keys.is_empty() {
            Ok(())
        } else {
            Err(MissingResources { keys })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{ResourceHandle, ResourceKind, TextureId};

    fn record(key: &str, tier: Tier) -> ResourceRecord {
        ResourceRecord {
            key: key.into(),
            kind: ResourceKind::Texture {
                width: 1,
                height: 1,
            },
            tier,
            handle: ResourceHandle::Texture(TextureId(0)),
        }
    }

    #[test]
    fn verify_lists_missing_keys_in_manifest_order() {
        let manifest = ResourceManifest::standard();
        let mut registry = ResourceRegistry::new();
        for key in manifest.keys() {
            if !matches!(key.as_str(), "coin" | "music") {
                registry.insert(record(key.as_str(), Tier::Primary));
            }
        }
        let err = registry.verify(&manifest).unwrap_err();
        assert_eq!(err.keys, vec![ResourceKey::from("coin"), ResourceKey::from("music")]);
        assert_eq!(
            err.to_string(),
            "2 manifest key(s) have no usable record: coin, music"
        );
    }

    #[test]
    fn insert_replaces_previous_record() {
        let mut registry = ResourceRegistry::new();
        assert!(registry.insert(record("player", Tier::Fallback)).is_none());
        let old = registry.insert(record("player", Tier::Primary));
        assert_eq!(old.map(|r| r.tier), Some(Tier::Fallback));
        assert_eq!(registry.tier_of("player"), Some(Tier::Primary));
        assert_eq!(registry.len(), 1);
    }
}
