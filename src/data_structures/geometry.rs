//! Geometry constants: the unit cube every block shares and the crosshair.
//!
//! Faces wind counter-clockwise when seen from outside, matching the
//! pipeline's `FrontFace::Ccw` with back-face culling.

use std::mem;

use crate::gpu::AttributeDescriptor;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub const STRIDE: wgpu::BufferAddress = mem::size_of::<Vertex>() as wgpu::BufferAddress;

    pub const ATTRIBUTES: [AttributeDescriptor; 3] = [
        AttributeDescriptor::float("a_position", 0, 3, 0),
        AttributeDescriptor::float("a_color", 1, 3, mem::size_of::<[f32; 3]>() as u64),
        AttributeDescriptor::float("a_tex_coords", 2, 2, mem::size_of::<[f32; 6]>() as u64),
    ];
}

const fn v(position: [f32; 3], color: [f32; 3], tex_coords: [f32; 2]) -> Vertex {
    Vertex {
        position,
        color,
        tex_coords,
    }
}

// Per-face shading so untextured cubes still read as solids.
const TOP: [f32; 3] = [0.95, 0.95, 0.95];
const SIDE_X: [f32; 3] = [0.80, 0.80, 0.80];
const SIDE_Z: [f32; 3] = [0.70, 0.70, 0.70];
const BOTTOM: [f32; 3] = [0.50, 0.50, 0.50];

/// Unit cube spanning `[0, 1]` on every axis, four vertices per face.
#[rustfmt::skip]
pub const CUBE_VERTICES: [Vertex; 24] = [
    // +X
    v([1.0, 0.0, 1.0], SIDE_X, [0.0, 1.0]),
    v([1.0, 0.0, 0.0], SIDE_X, [1.0, 1.0]),
    v([1.0, 1.0, 0.0], SIDE_X, [1.0, 0.0]),
    v([1.0, 1.0, 1.0], SIDE_X, [0.0, 0.0]),
    // -X
    v([0.0, 0.0, 0.0], SIDE_X, [0.0, 1.0]),
    v([0.0, 0.0, 1.0], SIDE_X, [1.0, 1.0]),
    v([0.0, 1.0, 1.0], SIDE_X, [1.0, 0.0]),
    v([0.0, 1.0, 0.0], SIDE_X, [0.0, 0.0]),
    // +Y
    v([0.0, 1.0, 1.0], TOP, [0.0, 1.0]),
    v([1.0, 1.0, 1.0], TOP, [1.0, 1.0]),
    v([1.0, 1.0, 0.0], TOP, [1.0, 0.0]),
    v([0.0, 1.0, 0.0], TOP, [0.0, 0.0]),
    // -Y
    v([0.0, 0.0, 0.0], BOTTOM, [0.0, 1.0]),
    v([1.0, 0.0, 0.0], BOTTOM, [1.0, 1.0]),
    v([1.0, 0.0, 1.0], BOTTOM, [1.0, 0.0]),
    v([0.0, 0.0, 1.0], BOTTOM, [0.0, 0.0]),
    // +Z
    v([0.0, 0.0, 1.0], SIDE_Z, [0.0, 1.0]),
    v([1.0, 0.0, 1.0], SIDE_Z, [1.0, 1.0]),
    v([1.0, 1.0, 1.0], SIDE_Z, [1.0, 0.0]),
    v([0.0, 1.0, 1.0], SIDE_Z, [0.0, 0.0]),
    // -Z
    v([1.0, 0.0, 0.0], SIDE_Z, [0.0, 1.0]),
    v([0.0, 0.0, 0.0], SIDE_Z, [1.0, 1.0]),
    v([0.0, 1.0, 0.0], SIDE_Z, [1.0, 0.0]),
    v([1.0, 1.0, 0.0], SIDE_Z, [0.0, 0.0]),
];

#[rustfmt::skip]
pub const CUBE_INDICES: [u16; 36] = [
    0, 1, 2, 0, 2, 3,
    4, 5, 6, 4, 6, 7,
    8, 9, 10, 8, 10, 11,
    12, 13, 14, 12, 14, 15,
    16, 17, 18, 16, 18, 19,
    20, 21, 22, 20, 22, 23,
];

const CROSSHAIR_LEN: f32 = 0.03;
const CROSSHAIR_WIDTH: f32 = 0.004;
const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// Two thin quads in clip space, proportioned for a square viewport. The
/// overlay instance corrects for the actual aspect ratio.
#[rustfmt::skip]
pub const CROSSHAIR_VERTICES: [Vertex; 8] = [
    v([-CROSSHAIR_LEN, -CROSSHAIR_WIDTH, 0.0], WHITE, [0.0, 0.0]),
    v([ CROSSHAIR_LEN, -CROSSHAIR_WIDTH, 0.0], WHITE, [0.0, 0.0]),
    v([ CROSSHAIR_LEN,  CROSSHAIR_WIDTH, 0.0], WHITE, [0.0, 0.0]),
    v([-CROSSHAIR_LEN,  CROSSHAIR_WIDTH, 0.0], WHITE, [0.0, 0.0]),
    v([-CROSSHAIR_WIDTH, -CROSSHAIR_LEN, 0.0], WHITE, [0.0, 0.0]),
    v([ CROSSHAIR_WIDTH, -CROSSHAIR_LEN, 0.0], WHITE, [0.0, 0.0]),
    v([ CROSSHAIR_WIDTH,  CROSSHAIR_LEN, 0.0], WHITE, [0.0, 0.0]),
    v([-CROSSHAIR_WIDTH,  CROSSHAIR_LEN, 0.0], WHITE, [0.0, 0.0]),
];

#[rustfmt::skip]
pub const CROSSHAIR_INDICES: [u16; 12] = [
    0, 1, 2, 0, 2, 3,
    4, 5, 6, 4, 6, 7,
];
