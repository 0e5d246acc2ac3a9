//! Frame composition.
//!
//! A frame is planned before anything is encoded: [`compose`] turns the
//! camera, the projection and the scene store into a [`FramePlan`], an owned
//! snapshot of every draw call in order. Encoding then walks the plan, so
//! the store can change between frames without ever being observed half way
//! through one.

use cgmath::Matrix4;

use crate::{
    camera::{Camera, CameraUniform, Projection},
    data_structures::{
        block::{BlockCoord, BlockKind},
        instance::InstanceRaw,
        scene::SceneStore,
        shape::{Material, Mesh},
        texture::TextureSet,
    },
    gpu::{Program, VertexArray},
};

/// One indexed draw of one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub coord: BlockCoord,
    pub mesh: Mesh,
    pub index_count: u32,
    pub material: Material,
    pub instance: InstanceRaw,
}

impl DrawCall {
    pub fn world(&self) -> Matrix4<f32> {
        self.instance.world.into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub mesh: Mesh,
    pub index_count: u32,
    pub instance: InstanceRaw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub view_proj: Matrix4<f32>,
    /// Sorted by coordinate, so equal scenes give equal plans.
    pub draws: Vec<DrawCall>,
    pub overlay: Option<Overlay>,
}

impl FramePlan {
    /// Instance records in draw order, overlay last.
    pub fn instances(&self) -> Vec<InstanceRaw> {
        self.draws
            .iter()
            .map(|d| d.instance)
            .chain(self.overlay.iter().map(|o| o.instance))
            .collect()
    }

    pub fn camera_uniform(&self) -> CameraUniform {
        self.view_proj.into()
    }
}

/// Plans one frame. `loaded` reports whether a kind's real texture is bound;
/// shapes whose texture is still the placeholder draw untextured.
pub fn compose(
    camera: &Camera,
    projection: &Projection,
    scene: &SceneStore,
    loaded: impl Fn(BlockKind) -> bool,
    crosshair: bool,
) -> FramePlan {
    let view_proj = projection.calc_matrix() * camera.calc_matrix();

    let mut draws: Vec<DrawCall> = scene
        .iter()
        .map(|(coord, shape)| {
            let use_texture = shape.material.kind().is_some_and(&loaded);
            DrawCall {
                coord: *coord,
                mesh: shape.mesh,
                index_count: shape.index_count,
                material: shape.material,
                instance: InstanceRaw::from_shape(shape, use_texture),
            }
        })
        .collect();
    draws.sort_by_key(|d| d.coord);

    let overlay = crosshair.then(|| Overlay {
        mesh: Mesh::Crosshair,
        index_count: Mesh::Crosshair.index_count(),
        instance: InstanceRaw::new(overlay_transform(projection.aspect()), false),
    });

    FramePlan {
        view_proj,
        draws,
        overlay,
    }
}

/// Squeezes clip-space overlay geometry horizontally so it keeps its shape
/// on a viewport of `aspect` (width over height).
pub fn overlay_transform(aspect: f32) -> Matrix4<f32> {
    Matrix4::from_nonuniform_scale(1.0 / aspect, 1.0, 1.0)
}

/// GPU objects a planned frame is encoded against.
pub struct FrameResources<'a> {
    pub block: &'a Program,
    pub overlay: &'a Program,
    pub cube: &'a VertexArray,
    pub crosshair: &'a VertexArray,
    pub camera: &'a wgpu::BindGroup,
    pub textures: &'a TextureSet,
    /// Holds [`FramePlan::instances`] for this frame.
    pub instances: &'a wgpu::Buffer,
}

impl FrameResources<'_> {
    fn vertex_array(&self, mesh: Mesh) -> &VertexArray {
        match mesh {
            Mesh::Cube => self.cube,
            Mesh::Crosshair => self.crosshair,
        }
    }
}

/// Records the planned draws into `pass`.
pub fn encode(pass: &mut wgpu::RenderPass<'_>, plan: &FramePlan, res: &FrameResources<'_>) {
    pass.set_vertex_buffer(1, res.instances.slice(..));

    if !plan.draws.is_empty() {
        pass.set_pipeline(res.block.pipeline());
        pass.set_bind_group(crate::pipelines::block::CAMERA_GROUP, res.camera, &[]);

        let mut bound_mesh = None;
        let mut bound_material = None;
        for (i, draw) in plan.draws.iter().enumerate() {
            if bound_mesh != Some(draw.mesh) {
                res.vertex_array(draw.mesh).bind(pass);
                bound_mesh = Some(draw.mesh);
            }
            if bound_material != Some(draw.material) {
                let group = match draw.material {
                    Material::Textured(kind) => res.textures.get(kind).0,
                    Material::Untextured => res.textures.placeholder(),
                };
                pass.set_bind_group(crate::pipelines::block::TEXTURE_GROUP, group, &[]);
                bound_material = Some(draw.material);
            }
            let i = i as u32;
            pass.draw_indexed(0..draw.index_count, 0, i..i + 1);
        }
    }

    if let Some(overlay) = &plan.overlay {
        let i = plan.draws.len() as u32;
        pass.set_pipeline(res.overlay.pipeline());
        res.vertex_array(overlay.mesh).bind(pass);
        pass.draw_indexed(0..overlay.index_count, 0, i..i + 1);
    }
}
