//! Scene data: block kinds and coordinates, placed shapes, the block store,
//! geometry constants, instance records and textures.

pub mod block;
pub mod geometry;
pub mod instance;
pub mod scene;
pub mod shape;
pub mod texture;
