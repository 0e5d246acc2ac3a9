//! Placed shapes and the materials they are drawn with.

use cgmath::{Matrix4, Rad, Vector3};

use crate::data_structures::{block::BlockKind, geometry};

/// Shared geometry a shape refers to. The buffers behind each id are owned
/// by the renderer; a shape only names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mesh {
    Cube,
    Crosshair,
}

impl Mesh {
    pub fn index_count(self) -> u32 {
        match self {
            Self::Cube => geometry::CUBE_INDICES.len() as u32,
            Self::Crosshair => geometry::CROSSHAIR_INDICES.len() as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
    /// Vertex colours only.
    Untextured,
    Textured(BlockKind),
}

impl Material {
    /// Maps a raw block id. Ids without a known kind fall back to
    /// [`Material::Untextured`].
    pub fn from_id(id: u32) -> Self {
        match BlockKind::from_id(id) {
            Some(kind) => Self::Textured(kind),
            None => {
                log::debug!("block id {id} has no texture, drawing untextured");
                Self::Untextured
            }
        }
    }

    pub fn kind(self) -> Option<BlockKind> {
        match self {
            Self::Textured(kind) => Some(kind),
            Self::Untextured => None,
        }
    }
}

/// One placed instance of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub position: Vector3<f32>,
    pub scale: f32,
    /// Unit rotation axis.
    pub axis: Vector3<f32>,
    pub angle: Rad<f32>,
    pub mesh: Mesh,
    pub index_count: u32,
    pub material: Material,
}

impl Shape {
    pub fn new(mesh: Mesh, position: Vector3<f32>, material: Material) -> Self {
        Self {
            position,
            scale: 1.0,
            axis: Vector3::unit_y(),
            angle: Rad(0.0),
            mesh,
            index_count: mesh.index_count(),
            material,
        }
    }

    /// A unit cube with its minimum corner at `position`.
    pub fn cube(position: Vector3<f32>, material: Material) -> Self {
        Self::new(Mesh::Cube, position, material)
    }

    /// `T(position) · R(axis, angle) · S(scale)`.
    pub fn world_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_axis_angle(self.axis, self.angle)
            * Matrix4::from_scale(self.scale)
    }
}
