use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{data_structures::texture::Texture, gpu::GpuError};

/// Surface, device and queue bound to one window, plus the depth attachment
/// that tracks the surface size.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub backend: wgpu::Backend,
}

/// Backends in the order they are tried.
pub fn preferred_backends() -> [wgpu::Backends; 2] {
    #[cfg(target_arch = "wasm32")]
    {
        [wgpu::Backends::BROWSER_WEBGPU, wgpu::Backends::GL]
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        [wgpu::Backends::PRIMARY, wgpu::Backends::GL]
    }
}

impl Context {
    /// Tries every backend of [`preferred_backends`] in turn and keeps the
    /// first one that yields a device. Fails with [`GpuError::NoContext`]
    /// when none does.
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let mut tried = Vec::new();
        for backends in preferred_backends() {
            #[cfg(target_arch = "wasm32")]
            if backends == wgpu::Backends::BROWSER_WEBGPU
                && !wgpu::util::is_browser_webgpu_supported().await
            {
                log::info!("WebGPU is not available in this browser, skipping");
                tried.push(format!("{backends:?}"));
                continue;
            }
            match Self::with_backends(window.clone(), backends).await {
                Ok(ctx) => {
                    log::info!("Rendering through {:?}", ctx.backend);
                    return Ok(ctx);
                }
                Err(e) => {
                    log::warn!("No usable {backends:?} context: {e:#}");
                    tried.push(format!("{backends:?}"));
                }
            }
        }
        Err(GpuError::NoContext {
            tried: tried.join(", "),
        }
        .into())
    }

    async fn with_backends(window: Arc<Window>, backends: wgpu::Backends) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("creating the surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("requesting an adapter")?;
        let backend = adapter.get_info().backend;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("voxel-canvas device"),
                required_features: wgpu::Features::empty(),
                // WebGL2 cannot offer the default limits.
                required_limits: if backend == wgpu::Backend::Gl {
                    wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
                } else {
                    wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits())
                },
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("requesting a device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Textures are uploaded as sRGB, so prefer an sRGB surface.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            backend,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Reconfigures the surface and depth attachment for a new backing size.
    /// Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        true
    }
}
