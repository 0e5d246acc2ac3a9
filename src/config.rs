//! Runtime configuration.
//!
//! Every knob has a default suited to the stock web client: a 45° camera at
//! `(0, 101.62, 0)` looking down +Z, textures served from the page origin
//! and input flushed every 64 ms.

use std::sync::Once;

use instant::Duration;

/// Top-level configuration handed to [`crate::flow::run`] or
/// [`crate::flow::start`].
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub renderer: RendererConfig,
    pub input: RelayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub clear_colour: wgpu::Color,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    /// Initial pose as `(x, y, z, yaw°, pitch°)`.
    pub initial_pose: (f32, f32, f32, f32, f32),
    pub crosshair: bool,
    /// DOM id of the canvas the surface binds to (browser only).
    pub canvas_id: String,
    /// Prefix joined in front of every texture name when fetching it.
    pub asset_prefix: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_colour: wgpu::Color {
                r: 0.53,
                g: 0.81,
                b: 0.92,
                a: 1.0,
            },
            fovy: 45.0,
            znear: 0.1,
            zfar: 1000.0,
            initial_pose: (0.0, 101.62, 0.0, 0.0, 0.0),
            crosshair: true,
            canvas_id: "canvas".to_string(),
            asset_prefix: "textures/".to_string(),
        }
    }
}

/// Batching policy and destination of the input relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Overrides the backend origin. In the browser the page's own host and
    /// port are used when this is `None`.
    pub base_url: Option<String>,
    /// Length of one coalescing window.
    pub flush_interval: Duration,
    /// Number of discrete events that forces an early flush.
    pub max_batch: usize,
    /// Send each window as a single `/mnkevent` message instead of one
    /// message per event.
    pub combined: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            flush_interval: Duration::from_millis(64),
            max_batch: 32,
            combined: false,
        }
    }
}

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. `"info"` or
/// `"voxel_canvas=debug,wgpu=warn"`). Ignored in the browser, where the
/// console logger runs at `level`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub level: log::Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            level: log::Level::Info,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the platform logger. Subsequent calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    INIT.call_once(|| {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let mut builder = env_logger::Builder::new();
            if let Some(filter) = &config.env_filter {
                builder.parse_filters(filter);
            } else if let Ok(filter) = std::env::var("RUST_LOG") {
                builder.parse_filters(&filter);
            } else {
                builder.filter_level(config.level.to_level_filter());
            }
            if let Err(e) = builder.try_init() {
                println!("Warning: Could not initialize logger: {}", e);
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            if console_log::init_with_level(config.level).is_err() {
                log::warn!("console logger was already installed");
            }
        }

        log::debug!("logging initialized");
    });
}
