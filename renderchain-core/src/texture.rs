//! # Texture Model
//!
//! Sizes, formats and channel masks shared by every filter, plus the
//! texture handles a host hands back while a chain renders.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Sizes
// ============================================================================

/// Width × height of a texture in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextureSize {
    pub width: u32,
    pub height: u32,
}

impl TextureSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Parse `1920x1080` (also accepts `X` and `×`)
    pub fn parse(text: &str) -> Option<Self> {
        let (w, h) = text
            .split_once(|c| matches!(c, 'x' | 'X' | '×'))
            .map(|(w, h)| (w.trim(), h.trim()))?;
        Some(Self::new(w.parse().ok()?, h.parse().ok()?))
    }

    /// Size of a 4:2:0 chroma plane for a frame of this size
    pub fn half(&self) -> Self {
        Self::new(self.width.div_ceil(2), self.height.div_ceil(2))
    }
}

impl fmt::Display for TextureSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ============================================================================
// Formats
// ============================================================================

/// Texel storage format of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFormat {
    #[default]
    Unorm8,
    Unorm10,
    Unorm16,
    Float16,
    Float32,
}

// ============================================================================
// Channel mask
// ============================================================================

bitflags::bitflags! {
    /// Subset of luma/chroma channels an operation touches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TextureChannels: u8 {
        const LUMA = 0b001;
        const CHROMA_U = 0b010;
        const CHROMA_V = 0b100;
        const CHROMA = Self::CHROMA_U.bits() | Self::CHROMA_V.bits();
        const ALL = Self::LUMA.bits() | Self::CHROMA.bits();
    }
}

impl Default for TextureChannels {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for TextureChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if *self == Self::ALL {
            "all"
        } else if *self == Self::LUMA {
            "luma"
        } else if *self == Self::CHROMA {
            "chroma"
        } else if *self == Self::CHROMA_U {
            "u"
        } else if *self == Self::CHROMA_V {
            "v"
        } else {
            return write!(f, "{:#05b}", self.bits());
        };
        f.write_str(name)
    }
}

/// Sub-pixel offset applied while scaling
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

// ============================================================================
// Host textures
// ============================================================================

/// Opaque host-side texture identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureId(pub u64);

/// 2-D texture, usable as a render target and as a sampled input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture2D {
    pub id: TextureId,
    pub size: TextureSize,
    pub format: TextureFormat,
}

/// 3-D texture (lookup tables and the like)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture3D {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: TextureFormat,
}

/// Any texture a host may hand to a filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Texture {
    Planar(Texture2D),
    Volume(Texture3D),
}

impl Texture {
    pub fn id(&self) -> TextureId {
        match self {
            Texture::Planar(t) => t.id,
            Texture::Volume(t) => t.id,
        }
    }

    pub fn as_planar(&self) -> Option<&Texture2D> {
        match self {
            Texture::Planar(t) => Some(t),
            Texture::Volume(_) => None,
        }
    }
}

/// The only 2-D texture in `inputs`, or `None` when there is not exactly one
pub fn single_planar(inputs: &[Texture]) -> Option<&Texture2D> {
    let mut planar = inputs.iter().filter_map(Texture::as_planar);
    let first = planar.next()?;
    match planar.next() {
        Some(_) => None,
        None => Some(first),
    }
}
