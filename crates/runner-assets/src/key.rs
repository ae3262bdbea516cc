//! Resource identifiers, kinds, and the per-key synthesis record.
//!
//! A [`ResourceKey`] is the bit-exact string the backend cache is keyed by
//! (`"player"`, `"coin"`, `"jump"`, ...). Every key in the manifest ends up
//! with exactly one [`ResourceRecord`] once synthesis has run, tagged with the
//! [`Tier`] that actually produced it.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ResourceKey
// ---------------------------------------------------------------------------

/// String identifier of a texture or sound in the backend cache.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Construct a key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as it is stored in the backend cache.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKey({:?})", self.0)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ResourceKind / ResourceSpec
// ---------------------------------------------------------------------------

/// What a resource is and the dimensions it must have.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ResourceKind {
    /// An RGBA texture of exactly `width` x `height` pixels.
    Texture {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// A sound clip of the given duration.
    Sound {
        /// Clip length. Dummy sounds carry [`Duration::ZERO`].
        duration: Duration,
    },
}

impl ResourceKind {
    /// `true` for textures.
    pub fn is_texture(&self) -> bool {
        matches!(self, ResourceKind::Texture { .. })
    }

    /// `true` for sounds.
    pub fn is_sound(&self) -> bool {
        matches!(self, ResourceKind::Sound { .. })
    }
}

/// Manifest entry: the required kind plus whether the key is load-bearing for
/// basic playability (and therefore eligible for the Emergency tier).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Required kind and dimensions.
    pub kind: ResourceKind,
    /// Whether an Emergency single-colour stand-in may be produced.
    pub load_bearing: bool,
}

impl ResourceSpec {
    /// A non-load-bearing texture spec.
    pub const fn texture(width: u32, height: u32) -> Self {
        Self {
            kind: ResourceKind::Texture { width, height },
            load_bearing: false,
        }
    }

    /// A load-bearing texture spec (player, background, ground).
    pub const fn essential_texture(width: u32, height: u32) -> Self {
        Self {
            kind: ResourceKind::Texture { width, height },
            load_bearing: true,
        }
    }

    /// A sound spec.
    pub const fn sound(duration: Duration) -> Self {
        Self {
            kind: ResourceKind::Sound { duration },
            load_bearing: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// The synthesis tier a record was produced by, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Full procedural generation (layered shapes, gradients where supported).
    Primary,
    /// Flat fills only.
    Fallback,
    /// Single-colour rectangle of the exact size; load-bearing keys only.
    Emergency,
    /// Non-functional, crash-safe stand-in.
    Dummy,
}

impl Tier {
    /// All tiers in escalation order.
    pub const ALL: [Tier; 4] = [Tier::Primary, Tier::Fallback, Tier::Emergency, Tier::Dummy];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Primary => "primary",
            Tier::Fallback => "fallback",
            Tier::Emergency => "emergency",
            Tier::Dummy => "dummy",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Backend-assigned texture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureId(pub u32);

/// Backend-assigned sound slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoundId(pub u32);

/// Opaque handle into the backend cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceHandle {
    /// Uploaded pixel data.
    Texture(TextureId),
    /// Uploaded sample data.
    Sound(SoundId),
    /// Registered stand-in with no payload. For sounds this is the
    /// "already decoded, zero duration" marker; playing it is a no-op.
    Stub,
}

// ---------------------------------------------------------------------------
// ResourceRecord
// ---------------------------------------------------------------------------

/// The outcome of synthesizing one manifest key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Cache key.
    pub key: ResourceKey,
    /// Kind actually produced. Dummy sounds report a zero duration.
    pub kind: ResourceKind,
    /// Tier that produced this record.
    pub tier: Tier,
    /// Handle into the backend cache.
    pub handle: ResourceHandle,
}

impl ResourceRecord {
    /// Whether the record carries real payload (anything but a stub).
    pub fn is_functional(&self) -> bool {
        !matches!(self.handle, ResourceHandle::Stub)
    }
}
