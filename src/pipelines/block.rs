use wgpu::util::DeviceExt;

use crate::{
    camera::CameraUniform,
    data_structures::{geometry::Vertex, instance::InstanceRaw, texture::Texture},
    gpu::{GpuError, PipelineTargets, Program, ProgramSource, ShaderInterface, VertexLayout},
    pipelines::basic::{depth_ignored, depth_tested},
};

/// Bind-group slot of the block texture.
pub const TEXTURE_GROUP: u32 = 0;
/// Bind-group slot of the view-projection uniform.
pub const CAMERA_GROUP: u32 = 1;

const BLOCK_VERTEX: &str = include_str!("block.vert.wgsl");
const BLOCK_FRAGMENT: &str = include_str!("block.frag.wgsl");
const OVERLAY_VERTEX: &str = include_str!("overlay.vert.wgsl");
const OVERLAY_FRAGMENT: &str = include_str!("overlay.frag.wgsl");

/// Names the block shaders declare, read from their source.
pub fn block_interface() -> Result<ShaderInterface, GpuError> {
    ShaderInterface::reflect("block", BLOCK_VERTEX, BLOCK_FRAGMENT)
}

/// Names the overlay shaders declare. Attributes only, no bindings.
pub fn overlay_interface() -> Result<ShaderInterface, GpuError> {
    ShaderInterface::reflect("overlay", OVERLAY_VERTEX, OVERLAY_FRAGMENT)
}

/// The uniform buffer holding the composed view-projection matrix.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Writes the matrix once per frame.
    pub fn upload(&mut self, queue: &wgpu::Queue, uniform: CameraUniform) {
        self.uniform = uniform;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

fn vertex_layouts() -> Result<(VertexLayout, VertexLayout), GpuError> {
    let invalid = |label: &str| {
        let label = label.to_string();
        move |reason| GpuError::VertexArray { label, reason }
    };
    let vertex = VertexLayout::new(
        Vertex::STRIDE,
        wgpu::VertexStepMode::Vertex,
        &Vertex::ATTRIBUTES,
    )
    .map_err(invalid("vertex"))?;
    let instance = InstanceRaw::desc().map_err(invalid("instance"))?;
    Ok((vertex, instance))
}

/// Links the textured block program. Attribute and uniform names are
/// resolved against the shader source before anything is compiled.
pub async fn mk_block_program(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    texture_layout: &wgpu::BindGroupLayout,
    camera_layout: &wgpu::BindGroupLayout,
) -> Result<Program, GpuError> {
    let interface = block_interface()?;
    interface.resolve(&Vertex::ATTRIBUTES)?;
    interface.resolve(&InstanceRaw::ATTRIBUTES)?;

    // The layout order must agree with the interface's uniform slots.
    let mut groups: [Option<&wgpu::BindGroupLayout>; 2] = [None, None];
    for (name, layout) in [("u_texture", texture_layout), ("u_view_proj", camera_layout)] {
        let slot = groups
            .get_mut(interface.uniform_group(name)? as usize)
            .ok_or_else(|| GpuError::Unresolved(name.to_string()))?;
        *slot = Some(layout);
    }
    let [Some(first), Some(second)] = groups else {
        return Err(GpuError::Unresolved("u_texture/u_view_proj".to_string()));
    };

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Block Pipeline Layout"),
        bind_group_layouts: &[first, second],
        immediate_size: 0,
    });
    let (vertex, instance) = vertex_layouts()?;

    Program::link(
        device,
        ProgramSource {
            label: "block",
            vertex: BLOCK_VERTEX,
            fragment: BLOCK_FRAGMENT,
            interface,
        },
        PipelineTargets {
            layout: &layout,
            color_format,
            depth: Some(depth_tested(Texture::DEPTH_FORMAT)),
            vertex_layouts: &[vertex.desc(), instance.desc()],
        },
    )
    .await
}

/// Links the screen-space overlay program used for the crosshair.
pub async fn mk_overlay_program(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
) -> Result<Program, GpuError> {
    let interface = overlay_interface()?;
    interface.resolve(&Vertex::ATTRIBUTES)?;
    interface.resolve(&InstanceRaw::ATTRIBUTES)?;

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Overlay Pipeline Layout"),
        bind_group_layouts: &[],
        immediate_size: 0,
    });
    let (vertex, instance) = vertex_layouts()?;

    Program::link(
        device,
        ProgramSource {
            label: "overlay",
            vertex: OVERLAY_VERTEX,
            fragment: OVERLAY_FRAGMENT,
            interface,
        },
        PipelineTargets {
            layout: &layout,
            color_format,
            depth: Some(depth_ignored(Texture::DEPTH_FORMAT)),
            vertex_layouts: &[vertex.desc(), instance.desc()],
        },
    )
    .await
}
