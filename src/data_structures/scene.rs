//! Coordinate-keyed store of placed blocks.

use std::collections::HashMap;

use crate::data_structures::{
    block::{BlockCoord, Bounds},
    shape::{Material, Shape},
};

/// Outcome of [`SceneStore::add_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Placed,
    /// A block already sits at the coordinate and was kept.
    Occupied,
}

/// At most one shape per grid coordinate.
#[derive(Debug, Default, Clone)]
pub struct SceneStore {
    blocks: HashMap<BlockCoord, Shape>,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, coord: BlockCoord, material: Material) -> Placement {
        if self.blocks.contains_key(&coord) {
            log::debug!("block at {coord:?} already placed, keeping it");
            return Placement::Occupied;
        }
        self.blocks.insert(coord, Shape::cube(coord.into(), material));
        Placement::Placed
    }

    /// Same as [`SceneStore::add_block`] with a raw block id.
    pub fn add_block_id(&mut self, x: i32, y: i32, z: i32, id: u32) -> Placement {
        self.add_block(BlockCoord::new(x, y, z), Material::from_id(id))
    }

    pub fn remove_block(&mut self, coord: BlockCoord) -> Option<Shape> {
        self.blocks.remove(&coord)
    }

    /// Removes every block inside `bounds` and returns how many went away.
    pub fn remove_blocks_in_area(&mut self, bounds: Bounds) -> usize {
        let before = self.blocks.len();
        self.blocks.retain(|coord, _| !bounds.contains(*coord));
        let removed = before - self.blocks.len();
        log::trace!("removed {removed} blocks in {bounds:?}");
        removed
    }

    pub fn get(&self, coord: BlockCoord) -> Option<&Shape> {
        self.blocks.get(&coord)
    }

    pub fn contains(&self, coord: BlockCoord) -> bool {
        self.blocks.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockCoord, &Shape)> {
        self.blocks.iter()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}
