//! Application event loop and entry points.
//!
//! Everything happens on the `winit` event loop: window and device events
//! feed the input relay, finished async work (GPU setup, texture loads) and
//! host commands arrive as [`AppEvent`]s through the loop's proxy, and every
//! redraw renders one frame. Host commands are therefore applied between
//! frames, never while one is being planned.
//!
//! # Entry points
//!
//! - [`run`] (desktop) blocks on the event loop and hands the caller a
//!   [`CommandSender`] before it starts.
//! - `start` (browser) binds to a canvas by id and returns a `VoxelCanvas`
//!   handle for the page's scripts.

use std::{fmt::Debug, sync::Arc};

use image::RgbaImage;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{Key, NamedKey},
    window::{CursorGrabMode, Window, WindowId},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::{
    config::{Config, init_logging},
    data_structures::block::{BlockCoord, BlockKind, Bounds},
    input::{HttpSink, InputEvent, InputRelay},
    renderer::{GpuState, Renderer, SceneCommand, backing_size},
    resources::texture::spawn_texture_loads,
    runtime::Spawner,
};

pub enum AppEvent {
    /// Result of the GPU setup spawned on the browser's executor.
    #[cfg(target_arch = "wasm32")]
    Initialized(anyhow::Result<Box<GpuState>>),
    TextureLoaded {
        kind: BlockKind,
        image: Result<RgbaImage, String>,
    },
    Command(SceneCommand),
}

impl Debug for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(result) => f
                .debug_tuple("Initialized")
                .field(&result.as_ref().map(|_| "GpuState"))
                .finish(),
            Self::TextureLoaded { kind, image } => f
                .debug_struct("TextureLoaded")
                .field("kind", kind)
                .field("image", &image.as_ref().map(|i| i.dimensions()))
                .finish(),
            Self::Command(command) => f.debug_tuple("Command").field(command).finish(),
        }
    }
}

/// Queues scene commands onto a running event loop. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CommandSender {
    proxy: EventLoopProxy<AppEvent>,
}

impl CommandSender {
    pub fn send(&self, command: SceneCommand) -> anyhow::Result<()> {
        self.proxy
            .send_event(AppEvent::Command(command))
            .map_err(|_| anyhow::anyhow!("the event loop has shut down"))
    }

    pub fn add_block(&self, x: i32, y: i32, z: i32, id: u32) -> anyhow::Result<()> {
        self.send(SceneCommand::AddBlock {
            coord: BlockCoord::new(x, y, z),
            id,
        })
    }

    pub fn remove_block(&self, x: i32, y: i32, z: i32) -> anyhow::Result<()> {
        self.send(SceneCommand::RemoveBlock(BlockCoord::new(x, y, z)))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn remove_blocks_in_area(
        &self,
        x0: i32,
        x1: i32,
        y0: i32,
        y1: i32,
        z0: i32,
        z1: i32,
    ) -> anyhow::Result<()> {
        self.send(SceneCommand::RemoveBlocksInArea(Bounds::new(
            x0, x1, y0, y1, z0, z1,
        )))
    }

    pub fn update_camera(&self, x: f32, y: f32, z: f32, yaw: f32, pitch: f32) -> anyhow::Result<()> {
        self.send(SceneCommand::UpdateCamera {
            x,
            y,
            z,
            yaw,
            pitch,
        })
    }
}

/// DOM numbering of a pointer button.
pub fn dom_button(button: MouseButton) -> u16 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
        MouseButton::Back => 3,
        MouseButton::Forward => 4,
        MouseButton::Other(n) => n,
    }
}

/// Text a key produces, as the relay's whitelist expects it.
fn key_text(key: &Key) -> Option<String> {
    match key {
        Key::Character(s) => Some(s.to_string()),
        Key::Named(NamedKey::Space) => Some(" ".to_string()),
        _ => None,
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<AppEvent>,
    spawner: Spawner,
    config: Config,
    renderer: Renderer,
    relay: Option<InputRelay<HttpSink>>,
    window: Option<Arc<Window>>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(event_loop: &EventLoop<AppEvent>, config: Config) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        #[cfg(not(target_arch = "wasm32"))]
        let spawner = Spawner::new(async_runtime.handle().clone());
        #[cfg(target_arch = "wasm32")]
        let spawner = Spawner::local();

        let relay = match HttpSink::from_config(&config.input, spawner.clone()) {
            Ok(sink) => Some(InputRelay::new(sink, config.input.clone())),
            Err(e) => {
                log::warn!("Input relay disabled: {e}");
                None
            }
        };

        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            spawner,
            renderer: Renderer::new(config.renderer.clone()),
            config,
            relay,
            window: None,
            failure: None,
        })
    }

    pub fn command_sender(&self) -> CommandSender {
        CommandSender {
            proxy: self.proxy.clone(),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("Renderer initialization failed: {error:#}");
        self.failure = Some(error);
        event_loop.exit();
    }

    fn relay(&mut self, event: InputEvent) {
        if let Some(relay) = &mut self.relay {
            relay.on_event(event, Instant::now());
        }
    }

    /// Texture loads start, the surface is sized and the first frame is
    /// requested, in that order.
    fn on_gpu_ready(&mut self, gpu: GpuState) {
        let proxy = self.proxy.clone();
        spawn_texture_loads(
            &self.spawner,
            &self.config.renderer.asset_prefix,
            move |kind, image| {
                if proxy
                    .send_event(AppEvent::TextureLoaded { kind, image })
                    .is_err()
                {
                    log::warn!("texture {} finished after shutdown", kind.texture_name());
                }
            },
        );

        let window = gpu.context().window().clone();
        let scale_factor = window.scale_factor();
        let size = backing_size(window.inner_size().to_logical(scale_factor), scale_factor);
        self.renderer.attach(gpu, size);
        window.request_redraw();
    }

    fn request_pointer_lock(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        match grabbed {
            Ok(()) => {
                window.set_cursor_visible(false);
                self.relay(InputEvent::PointerLock(true));
            }
            Err(e) => log::error!("Pointer lock failed: {e}"),
        }
    }

    fn release_pointer_lock(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
            log::warn!("Could not release the pointer: {e}");
        }
        window.set_cursor_visible(true);
        self.relay(InputEvent::PointerLock(false));
    }

    fn pointer_locked(&self) -> bool {
        self.relay.as_ref().is_some_and(|r| r.pointer_locked())
    }

    fn keyboard(&mut self, event: KeyEvent) {
        if event.state == ElementState::Pressed && event.logical_key == Key::Named(NamedKey::Escape) {
            self.release_pointer_lock();
            return;
        }
        let Some(key) = key_text(&event.logical_key) else {
            return;
        };
        match event.state {
            ElementState::Pressed => self.relay(InputEvent::KeyDown {
                key,
                repeat: event.repeat,
            }),
            ElementState::Released => self.relay(InputEvent::KeyUp { key }),
        }
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("voxel-canvas");

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas_id = &self.config.renderer.canvas_id;
            let canvas = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.get_element_by_id(canvas_id))
                .and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok());
            match canvas {
                Some(canvas) => window_attributes = window_attributes.with_canvas(Some(canvas)),
                None => {
                    self.fail(
                        event_loop,
                        anyhow::anyhow!("no canvas element with id `{canvas_id}`"),
                    );
                    return;
                }
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, e.into());
                return;
            }
        };
        self.window = Some(window.clone());
        self.renderer.begin_init();

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(GpuState::new(window)) {
                Ok(gpu) => self.on_gpu_ready(gpu),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = GpuState::new(window).await.map(Box::new);
                if proxy.send_event(AppEvent::Initialized(result)).is_err() {
                    log::error!("Event loop closed before the renderer was ready");
                }
            });
        }
    }

    fn user_event(&mut self, #[allow(unused)] event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            AppEvent::Initialized(result) => match result {
                Ok(gpu) => self.on_gpu_ready(*gpu),
                Err(e) => self.fail(event_loop, e),
            },
            AppEvent::TextureLoaded { kind, image } => {
                if self.renderer.texture_loaded(kind, image) {
                    log::info!("All textures settled");
                    if let Some(relay) = &mut self.relay {
                        relay.notify_textures_loaded();
                    }
                }
            }
            AppEvent::Command(command) => {
                log::trace!("{command:?}");
                self.renderer.apply(command);
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.relay(InputEvent::MouseMove { dx, dy });
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => self.renderer.resize(size),
            WindowEvent::RedrawRequested => match self.renderer.render() {
                Ok(()) => {}
                // Reconfigure the surface if it's lost or outdated
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    self.renderer.recover_surface();
                }
                Err(e) => log::error!("Unable to render {e}"),
            },
            WindowEvent::KeyboardInput { event, .. } => self.keyboard(event),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button,
                ..
            } => {
                if self.pointer_locked() {
                    self.relay(InputEvent::MouseDown(dom_button(button)));
                } else {
                    self.request_pointer_lock();
                }
            }
            WindowEvent::Focused(false) => {
                if self.pointer_locked() {
                    self.release_pointer_lock();
                } else if let Some(relay) = &mut self.relay {
                    relay.flush();
                }
            }
            _ => {}
        }
    }

    /// Flushes a due input window and sleeps no longer than the next one.
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(relay) = &mut self.relay else {
            return;
        };
        let now = Instant::now();
        relay.poll(now);
        let control_flow = match relay.deadline() {
            Some(deadline) => ControlFlow::wait_duration(deadline.saturating_duration_since(now)),
            None => ControlFlow::Wait,
        };
        event_loop.set_control_flow(control_flow);
    }
}

/// Runs the renderer on the current thread until its window closes.
///
/// `on_ready` receives the command handle before the loop starts; commands
/// sent before the GPU is ready are applied to the scene right away and
/// drawn once it is.
pub fn run(config: Config, on_ready: impl FnOnce(CommandSender)) -> anyhow::Result<()> {
    init_logging(&config.logging);

    let event_loop: EventLoop<AppEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    on_ready(app.command_sender());

    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Handle the page's scripts drive the scene through.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub struct VoxelCanvas {
    commands: CommandSender,
}

#[cfg(target_arch = "wasm32")]
fn report(result: anyhow::Result<()>) {
    if let Err(e) = result {
        log::error!("{e:#}");
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl VoxelCanvas {
    #[wasm_bindgen(js_name = addBlock)]
    pub fn add_block(&self, x: i32, y: i32, z: i32, id: u32) {
        report(self.commands.add_block(x, y, z, id));
    }

    #[wasm_bindgen(js_name = removeBlock)]
    pub fn remove_block(&self, x: i32, y: i32, z: i32) {
        report(self.commands.remove_block(x, y, z));
    }

    #[wasm_bindgen(js_name = removeBlocksInArea)]
    #[allow(clippy::too_many_arguments)]
    pub fn remove_blocks_in_area(&self, x0: i32, x1: i32, y0: i32, y1: i32, z0: i32, z1: i32) {
        report(self.commands.remove_blocks_in_area(x0, x1, y0, y1, z0, z1));
    }

    #[wasm_bindgen(js_name = updateCamera)]
    pub fn update_camera(&self, x: f32, y: f32, z: f32, yaw: f32, pitch: f32) {
        report(self.commands.update_camera(x, y, z, yaw, pitch));
    }
}

/// Binds the renderer to the canvas with id `canvas_id` and starts it.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn start(canvas_id: String) -> Result<VoxelCanvas, JsValue> {
    let mut config = Config::default();
    config.renderer.canvas_id = canvas_id;
    start_with(config).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}

#[cfg(target_arch = "wasm32")]
pub fn start_with(config: Config) -> anyhow::Result<VoxelCanvas> {
    use winit::platform::web::EventLoopExtWebSys;

    init_logging(&config.logging);

    let event_loop: EventLoop<AppEvent> = EventLoop::with_user_event().build()?;
    let app = App::new(&event_loop, config)?;
    let commands = app.command_sender();
    event_loop.spawn_app(app);

    Ok(VoxelCanvas { commands })
}
