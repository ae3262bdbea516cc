//! The fixed resource manifest.
//!
//! [`ResourceManifest::standard`] lists every texture and sound the game
//! touches, with the exact dimensions the backend must receive. The manifest
//! is immutable once built and iterates in declaration order so synthesis
//! logs and reports are stable.

use std::time::Duration;

use crate::key::{ResourceKey, ResourceSpec};

/// Key names shared with the backend cache.
pub mod keys {
    pub const LOGO: &str = "logo";
    pub const BACKGROUND: &str = "background";
    pub const LOADING_BACKGROUND: &str = "loading-background";
    pub const GROUND: &str = "ground";
    pub const PLATFORM: &str = "platform";
    pub const COIN: &str = "coin";
    pub const OBSTACLE: &str = "obstacle";
    pub const PLAYER: &str = "player";
    pub const PLAYER_LEFT: &str = "player-left";
    pub const PLAYER_RIGHT: &str = "player-right";
    pub const LOADING_BAR_BG: &str = "loading-bar-bg";
    pub const LOADING_BAR: &str = "loading-bar";

    pub const JUMP: &str = "jump";
    pub const COLLECT: &str = "collect";
    pub const HIT: &str = "hit";
    pub const MUSIC: &str = "music";
}

/// Length of the silent placeholder clips: 4410 frames at 44.1 kHz.
pub const PLACEHOLDER_SOUND_LENGTH: Duration = Duration::from_millis(100);

/// Ordered, immutable mapping from key to required resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceManifest {
    entries: Vec<(ResourceKey, ResourceSpec)>,
}

impl ResourceManifest {
    /// Build a manifest from explicit entries.
    ///
    /// # Panics
    ///
    /// Panics if a key appears twice.
    pub fn from_entries(entries: impl IntoIterator<Item = (ResourceKey, ResourceSpec)>) -> Self {
        let mut out: Vec<(ResourceKey, ResourceSpec)> = Vec::new();
        for (key, spec) in entries {
            assert!(
                !out.iter().any(|(k, _)| *k == key),
                "duplicate manifest key: {key}"
            );
            out.push((key, spec));
        }
        Self { entries: out }
    }

    /// The manifest the game ships with.
    pub fn standard() -> Self {
        use keys::*;
        Self::from_entries([
            (LOGO.into(), ResourceSpec::texture(200, 100)),
            (BACKGROUND.into(), ResourceSpec::essential_texture(800, 450)),
            (LOADING_BACKGROUND.into(), ResourceSpec::texture(800, 450)),
            (GROUND.into(), ResourceSpec::essential_texture(64, 32)),
            (PLATFORM.into(), ResourceSpec::texture(200, 32)),
            (COIN.into(), ResourceSpec::texture(32, 32)),
            (OBSTACLE.into(), ResourceSpec::texture(32, 32)),
            (PLAYER.into(), ResourceSpec::essential_texture(32, 48)),
            (PLAYER_LEFT.into(), ResourceSpec::texture(32, 48)),
            (PLAYER_RIGHT.into(), ResourceSpec::texture(32, 48)),
            (LOADING_BAR_BG.into(), ResourceSpec::texture(400, 30)),
            (LOADING_BAR.into(), ResourceSpec::texture(400, 30)),
            (JUMP.into(), ResourceSpec::sound(PLACEHOLDER_SOUND_LENGTH)),
            (COLLECT.into(), ResourceSpec::sound(PLACEHOLDER_SOUND_LENGTH)),
            (HIT.into(), ResourceSpec::sound(PLACEHOLDER_SOUND_LENGTH)),
            (MUSIC.into(), ResourceSpec::sound(PLACEHOLDER_SOUND_LENGTH)),
        ])
    }

    /// Keys the Loading scene draws its progress bar with.
    pub fn loading_bar_keys() -> [ResourceKey; 2] {
        [keys::LOADING_BAR_BG.into(), keys::LOADING_BAR.into()]
    }

    /// Look up the spec for a key.
    pub fn get(&self, key: &str) -> Option<&ResourceSpec> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, spec)| spec)
    }

    /// Whether the manifest names `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKey, &ResourceSpec)> {
        self.entries.iter().map(|(k, s)| (k, s))
    }

    /// All keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::ResourceKind;

    #[test]
    fn standard_manifest_names_all_sixteen_keys() {
        let manifest = ResourceManifest::standard();
        assert_eq!(manifest.len(), 16);
        let names: Vec<&str> = manifest.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "logo",
                "background",
                "loading-background",
                "ground",
                "platform",
                "coin",
                "obstacle",
                "player",
                "player-left",
                "player-right",
                "loading-bar-bg",
                "loading-bar",
                "jump",
                "collect",
                "hit",
                "music",
            ]
        );
    }

    #[test]
    fn only_player_background_ground_are_load_bearing() {
        let manifest = ResourceManifest::standard();
        let bearing: Vec<&str> = manifest
            .iter()
            .filter(|(_, s)| s.load_bearing)
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(bearing, vec!["background", "ground", "player"]);
    }

    #[test]
    fn texture_dimensions_match_backend_contract() {
        let manifest = ResourceManifest::standard();
        assert_eq!(
            manifest.get("platform").map(|s| s.kind),
            Some(ResourceKind::Texture {
                width: 200,
                height: 32
            })
        );
        assert!(manifest.get("music").is_some_and(|s| s.kind.is_sound()));
        assert!(manifest.get("unknown").is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate manifest key")]
    fn duplicate_keys_panic() {
        ResourceManifest::from_entries([
            ("coin".into(), ResourceSpec::texture(1, 1)),
            ("coin".into(), ResourceSpec::texture(2, 2)),
        ]);
    }
}
