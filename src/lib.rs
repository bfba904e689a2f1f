use godot::prelude::*;

pub mod brush_painter;
pub mod brush_sampler;
mod carver_node;
pub mod config;
pub mod coordinate_frame;
pub mod debug_log;
pub mod error;
pub mod height_field;
pub mod host;
pub mod region_painter;
pub mod region_selector;
pub mod session;

struct PixyCarveExtension;

#[gdextension]
unsafe impl ExtensionLibrary for PixyCarveExtension {}
