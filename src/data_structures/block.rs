use serde::{Deserialize, Serialize};

/// Closed set of block kinds the backend can place.
///
/// The discriminants are the ids used on the wire. `0` is air and is never
/// rendered, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum BlockKind {
    Stone = 1,
    Grass = 2,
    Dirt = 3,
}

impl BlockKind {
    pub const ALL: [BlockKind; 3] = [BlockKind::Stone, BlockKind::Grass, BlockKind::Dirt];

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(Self::Stone),
            2 => Some(Self::Grass),
            3 => Some(Self::Dirt),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    /// Texture file name, relative to the configured asset prefix.
    pub fn texture_name(self) -> &'static str {
        match self {
            Self::Stone => "stone.png",
            Self::Grass => "grass.png",
            Self::Dirt => "dirt.png",
        }
    }

    /// Dense index used for texture slots.
    pub fn slot(self) -> usize {
        self as usize - 1
    }
}

/// Grid coordinate of a block. Equality is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl From<(i32, i32, i32)> for BlockCoord {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self { x, y, z }
    }
}

impl From<BlockCoord> for cgmath::Vector3<f32> {
    fn from(c: BlockCoord) -> Self {
        cgmath::Vector3::new(c.x as f32, c.y as f32, c.z as f32)
    }
}

/// Axis-aligned inclusive box of grid coordinates.
///
/// Corners may be given in any order; each axis is normalized on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    min: BlockCoord,
    max: BlockCoord,
}

impl Bounds {
    /// Builds the box from `(x0, x1, y0, y1, z0, z1)`, the argument order of
    /// the backend's range-removal call.
    pub fn new(x0: i32, x1: i32, y0: i32, y1: i32, z0: i32, z1: i32) -> Self {
        Self {
            min: BlockCoord::new(x0.min(x1), y0.min(y1), z0.min(z1)),
            max: BlockCoord::new(x0.max(x1), y0.max(y1), z0.max(z1)),
        }
    }

    pub fn from_corners(a: BlockCoord, b: BlockCoord) -> Self {
        Self::new(a.x, b.x, a.y, b.y, a.z, b.z)
    }

    pub fn min(&self) -> BlockCoord {
        self.min
    }

    pub fn max(&self) -> BlockCoord {
        self.max
    }

    pub fn contains(&self, c: BlockCoord) -> bool {
        (self.min.x..=self.max.x).contains(&c.x)
            && (self.min.y..=self.max.y).contains(&c.y)
            && (self.min.z..=self.max.z).contains(&c.z)
    }
}
