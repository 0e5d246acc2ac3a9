//! Render pipelines: the shared pipeline builder and the block and overlay
//! programs.

pub mod basic;
pub mod block;
