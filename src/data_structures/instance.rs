//! Per-draw instance records.
//!
//! Each shape is drawn with one instance record that carries its world
//! matrix and whether its texture should be sampled. The records of a frame
//! are uploaded together and each draw call selects its own record through
//! the instance range.

use std::mem;

use cgmath::Matrix4;

use crate::{
    data_structures::shape::Shape,
    gpu::{AttributeDescriptor, VertexLayout},
};

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub world: [[f32; 4]; 4],
    /// `1.0` samples the bound texture, `0.0` uses the vertex colour.
    pub use_texture: f32,
}

impl InstanceRaw {
    pub const STRIDE: wgpu::BufferAddress = mem::size_of::<InstanceRaw>() as wgpu::BufferAddress;

    /// A mat4 takes four vertex slots, one per column.
    pub const ATTRIBUTES: [AttributeDescriptor; 5] = [
        AttributeDescriptor::float("i_world_0", 5, 4, 0),
        AttributeDescriptor::float("i_world_1", 6, 4, mem::size_of::<[f32; 4]>() as u64),
        AttributeDescriptor::float("i_world_2", 7, 4, mem::size_of::<[f32; 8]>() as u64),
        AttributeDescriptor::float("i_world_3", 8, 4, mem::size_of::<[f32; 12]>() as u64),
        AttributeDescriptor::float("i_use_texture", 9, 1, mem::size_of::<[f32; 16]>() as u64),
    ];

    pub fn new(world: Matrix4<f32>, use_texture: bool) -> Self {
        Self {
            world: world.into(),
            use_texture: if use_texture { 1.0 } else { 0.0 },
        }
    }

    pub fn from_shape(shape: &Shape, use_texture: bool) -> Self {
        Self::new(shape.world_matrix(), use_texture)
    }

    pub fn textured(&self) -> bool {
        self.use_texture != 0.0
    }

    pub fn desc() -> Result<VertexLayout, String> {
        VertexLayout::new(Self::STRIDE, wgpu::VertexStepMode::Instance, &Self::ATTRIBUTES)
    }
}
