//! The renderer: scene, camera and the GPU state they are drawn with.
//!
//! A [`Renderer`] exists before it can draw. Scene commands are accepted in
//! every [`Phase`]; the GPU half is attached once the asynchronous context
//! setup finishes, and only then does [`Renderer::render`] produce frames.

use std::{iter, sync::Arc};

use cgmath::Deg;
use image::RgbaImage;
use instant::{Duration, Instant};
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    window::Window,
};

use crate::{
    camera::{Camera, Projection},
    config::RendererConfig,
    context::Context,
    data_structures::{
        block::{BlockCoord, BlockKind, Bounds},
        geometry::{CROSSHAIR_INDICES, CROSSHAIR_VERTICES, CUBE_INDICES, CUBE_VERTICES, Vertex},
        instance::InstanceRaw,
        scene::{Placement, SceneStore},
        shape::Material,
        texture::{TextureSet, texture_layout},
    },
    gpu::{
        GpuError, Program, VertexArray, create_static_index_buffer,
        create_static_vertex_buffer,
    },
    pipelines::block::{CameraResources, mk_block_program, mk_overlay_program},
    render::{self, FramePlan, FrameResources},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Running,
}

/// A change to the scene or camera requested by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCommand {
    AddBlock { coord: BlockCoord, id: u32 },
    RemoveBlock(BlockCoord),
    RemoveBlocksInArea(Bounds),
    UpdateCamera {
        x: f32,
        y: f32,
        z: f32,
        yaw: f32,
        pitch: f32,
    },
}

/// Measures the time between consecutive frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    last: Option<Instant>,
    delta: Duration,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            last: None,
            delta: Duration::ZERO,
        }
    }
}

impl FrameClock {
    /// Records a frame at `now` and returns the time since the previous one.
    pub fn tick(&mut self, now: Instant) -> Duration {
        self.delta = self
            .last
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last = Some(now);
        self.delta
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }
}

/// Something that can be asked for another frame.
pub trait RequestRedraw {
    fn request_redraw(&self);
}

impl RequestRedraw for Window {
    fn request_redraw(&self) {
        Window::request_redraw(self);
    }
}

/// Asks for the next frame, then draws this one. A failed draw therefore
/// never stops the loop.
pub fn schedule_then_draw<E>(
    window: &impl RequestRedraw,
    draw: impl FnOnce() -> Result<(), E>,
) -> Result<(), E> {
    window.request_redraw();
    draw()
}

/// Backing-store size for a logical size at `scale_factor`, rounded and at
/// least one pixel on each side.
pub fn backing_size(logical: LogicalSize<f64>, scale_factor: f64) -> PhysicalSize<u32> {
    let scale = |v: f64| ((v * scale_factor).round().max(1.0)) as u32;
    PhysicalSize::new(scale(logical.width), scale(logical.height))
}

/// Everything that lives on the GPU.
#[derive(Debug)]
pub struct GpuState {
    ctx: Context,
    block: Program,
    overlay: Program,
    cube: VertexArray,
    crosshair: VertexArray,
    camera: CameraResources,
    textures: TextureSet,
    instances: wgpu::Buffer,
    instance_capacity: usize,
}

impl GpuState {
    /// Acquires a context and builds every GPU object the renderer needs.
    /// Any failure aborts the whole setup.
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        let device = &ctx.device;

        let cube = mk_vertex_array(device, "cube", &CUBE_VERTICES, &CUBE_INDICES)?;
        let crosshair =
            mk_vertex_array(device, "crosshair", &CROSSHAIR_VERTICES, &CROSSHAIR_INDICES)?;

        let camera = CameraResources::new(device);
        let textures = TextureSet::new(device, &ctx.queue, texture_layout(device));
        let block = mk_block_program(
            device,
            ctx.config.format,
            textures.layout(),
            &camera.bind_group_layout,
        )
        .await?;
        let overlay = mk_overlay_program(device, ctx.config.format).await?;

        let instance_capacity = 64;
        let instances = mk_instance_buffer(device, instance_capacity);

        log::info!("GPU state ready");
        Ok(Self {
            ctx,
            block,
            overlay,
            cube,
            crosshair,
            camera,
            textures,
            instances,
            instance_capacity,
        })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn textures(&self) -> &TextureSet {
        &self.textures
    }

    fn upload_instances(&mut self, records: &[InstanceRaw]) {
        if records.len() > self.instance_capacity {
            self.instance_capacity = records.len().next_power_of_two();
            self.instances = mk_instance_buffer(&self.ctx.device, self.instance_capacity);
            log::debug!("instance buffer grown to {}", self.instance_capacity);
        }
        if !records.is_empty() {
            self.ctx
                .queue
                .write_buffer(&self.instances, 0, bytemuck::cast_slice(records));
        }
    }

    fn draw(&mut self, plan: &FramePlan, clear: wgpu::Color) -> Result<(), wgpu::SurfaceError> {
        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.camera.upload(&self.ctx.queue, plan.camera_uniform());
        self.upload_instances(&plan.instances());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            render::encode(
                &mut render_pass,
                plan,
                &FrameResources {
                    block: &self.block,
                    overlay: &self.overlay,
                    cube: &self.cube,
                    crosshair: &self.crosshair,
                    camera: &self.camera.bind_group,
                    textures: &self.textures,
                    instances: &self.instances,
                },
            );
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn mk_vertex_array(
    device: &wgpu::Device,
    label: &str,
    vertices: &[Vertex],
    indices: &[u16],
) -> Result<VertexArray, GpuError> {
    let vertex = create_static_vertex_buffer(device, &format!("{label} vertices"), vertices)?;
    let index = create_static_index_buffer(device, &format!("{label} indices"), indices)?;
    VertexArray::new(
        label,
        vertex,
        index,
        wgpu::IndexFormat::Uint16,
        indices.len() as u32,
        Vertex::STRIDE,
        &Vertex::ATTRIBUTES,
    )
}

fn mk_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: InstanceRaw::STRIDE * capacity.max(1) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[derive(Debug)]
pub struct Renderer {
    phase: Phase,
    config: RendererConfig,
    scene: SceneStore,
    camera: Camera,
    projection: Projection,
    gpu: Option<GpuState>,
    clock: FrameClock,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        let (x, y, z, yaw, pitch) = config.initial_pose;
        let projection = Projection::new(1, 1, Deg(config.fovy), config.znear, config.zfar);
        Self {
            phase: Phase::Uninitialized,
            camera: Camera::new(x, y, z, yaw, pitch),
            projection,
            config,
            scene: SceneStore::new(),
            gpu: None,
            clock: FrameClock::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneStore {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn gpu(&self) -> Option<&GpuState> {
        self.gpu.as_ref()
    }

    /// Marks the start of the asynchronous GPU setup.
    pub fn begin_init(&mut self) {
        if self.phase == Phase::Uninitialized {
            self.phase = Phase::Initializing;
        }
    }

    /// Installs the GPU state, sizes it and starts producing frames.
    pub fn attach(&mut self, gpu: GpuState, size: PhysicalSize<u32>) {
        self.gpu = Some(gpu);
        self.resize(size);
        self.phase = Phase::Running;
        log::info!("renderer running with {} blocks", self.scene.len());
    }

    pub fn add_block(&mut self, coord: BlockCoord, id: u32) -> Placement {
        self.scene.add_block(coord, Material::from_id(id))
    }

    pub fn remove_block(&mut self, coord: BlockCoord) -> bool {
        self.scene.remove_block(coord).is_some()
    }

    pub fn remove_blocks_in_area(&mut self, bounds: Bounds) -> usize {
        self.scene.remove_blocks_in_area(bounds)
    }

    pub fn update_camera(&mut self, x: f32, y: f32, z: f32, yaw: f32, pitch: f32) {
        self.camera.update(x, y, z, yaw, pitch);
    }

    pub fn apply(&mut self, command: SceneCommand) {
        match command {
            SceneCommand::AddBlock { coord, id } => {
                self.add_block(coord, id);
            }
            SceneCommand::RemoveBlock(coord) => {
                self.remove_block(coord);
            }
            SceneCommand::RemoveBlocksInArea(bounds) => {
                self.remove_blocks_in_area(bounds);
            }
            SceneCommand::UpdateCamera {
                x,
                y,
                z,
                yaw,
                pitch,
            } => self.update_camera(x, y, z, yaw, pitch),
        }
    }

    /// Follows a new backing size. Only the surface, the depth attachment
    /// and the aspect ratio change.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.projection.resize(size.width, size.height);
        if let Some(gpu) = &mut self.gpu {
            gpu.ctx.resize(size.width, size.height);
        }
    }

    /// Plans the next frame from the current state.
    pub fn plan(&self) -> FramePlan {
        let loaded = |kind: BlockKind| {
            self.gpu
                .as_ref()
                .is_some_and(|gpu| gpu.textures.get(kind).1)
        };
        render::compose(
            &self.camera,
            &self.projection,
            &self.scene,
            loaded,
            self.config.crosshair,
        )
    }

    /// Asks for the next frame and draws this one. A no-op outside
    /// [`Phase::Running`].
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if self.phase != Phase::Running {
            return Ok(());
        }
        let dt = self.clock.tick(Instant::now());
        log::trace!("frame after {dt:?}");

        let plan = self.plan();
        let clear = self.config.clear_colour;
        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };
        let window = gpu.ctx.window.clone();
        schedule_then_draw(window.as_ref(), || gpu.draw(&plan, clear))
    }

    /// Reconfigures after the surface was lost or went stale.
    pub fn recover_surface(&mut self) {
        if let Some(gpu) = &self.gpu {
            let size = gpu.ctx.window.inner_size();
            self.resize(size);
        }
    }

    /// Installs or rejects a finished texture load. Returns `true` when this
    /// was the last texture to settle.
    pub fn texture_loaded(&mut self, kind: BlockKind, image: Result<RgbaImage, String>) -> bool {
        let Some(gpu) = &mut self.gpu else {
            log::warn!("texture {} arrived before the GPU was ready", kind.texture_name());
            return false;
        };
        match image {
            Ok(image) => {
                let done = gpu
                    .textures
                    .install(&gpu.ctx.device, &gpu.ctx.queue, kind, &image);
                if gpu.textures.get(kind).1 {
                    log::info!(
                        "loaded texture {} ({}x{})",
                        kind.texture_name(),
                        image.width(),
                        image.height()
                    );
                }
                done
            }
            Err(e) => {
                log::error!("failed to load texture {}: {e}", kind.texture_name());
                gpu.textures.fail(kind)
            }
        }
    }

    pub fn frame_delta(&self) -> Duration {
        self.clock.delta()
    }
}
