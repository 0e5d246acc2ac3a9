//! voxel-canvas
//!
//! A voxel-world renderer built for the browser, also runnable as a desktop
//! window. A backend drives what is shown by placing and removing blocks and
//! moving the camera; the keyboard and pointer are relayed back to that
//! backend in small batches over HTTP.
//!
//! High-level modules
//! - `camera`: camera basis, projection and the view-projection uniform
//! - `config`: runtime configuration and logger setup
//! - `context`: surface, device and queue bound to the window
//! - `data_structures`: block kinds, shapes, the block store, geometry, textures
//! - `flow`: event loop, host commands and the entry points
//! - `gpu`: buffers, programs and vertex-array layouts with typed errors
//! - `input`: input capture, batching and the HTTP sink
//! - `pipelines`: render pipeline definitions (block, overlay)
//! - `render`: frame planning and encoding
//! - `renderer`: the renderer state machine
//! - `resources`: asset fetching and texture decoding
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod gpu;
pub mod input;
pub mod pipelines;
pub mod render;
pub mod renderer;
pub mod resources;
pub mod runtime;

pub use config::Config;
pub use data_structures::block::{BlockCoord, BlockKind, Bounds};
pub use flow::{CommandSender, run};
pub use renderer::{Renderer, SceneCommand};

#[cfg(target_arch = "wasm32")]
pub use flow::{VoxelCanvas, start};
