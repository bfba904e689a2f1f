//! Interfaces to the host application.
//!
//! The engine never talks to a camera, a physics world or a mesh directly.
//! It asks the host where the pointer lands, whether a cell carries a
//! decoration and whether the pointer is over UI, and it hands merged
//! heights to a [`TerrainSink`].

use crate::coordinate_frame::WorldPoint;

/// Tag attached to decoration objects that rotated carves raise terrain under.
pub const DECAL_TAG: &str = "Decal";

/// Input already classified by the host for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Abort the active tool. Checked before anything else.
    pub cancel: bool,
    /// Pointer went down this tick.
    pub pointer_pressed: bool,
    /// Pointer is held down this tick.
    pub pointer_held: bool,
    /// Switch between the default and the rotated frame.
    pub toggle_rotation: bool,
}

impl TickInput {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn cancel() -> Self {
        Self {
            cancel: true,
            ..Self::default()
        }
    }

    pub fn press() -> Self {
        Self {
            pointer_pressed: true,
            pointer_held: true,
            ..Self::default()
        }
    }

    pub fn hold() -> Self {
        Self {
            pointer_held: true,
            ..Self::default()
        }
    }

    pub fn toggle_rotation() -> Self {
        Self {
            toggle_rotation: true,
            ..Self::default()
        }
    }
}

/// What a pick query should resolve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PickTarget {
    /// Wherever the pointer currently is.
    Pointer,
    /// Straight down onto the ground at a world XZ position.
    Vertical { x: f32, z: f32 },
}

/// Result of a successful pick.
#[derive(Clone, Debug, PartialEq)]
pub struct PickHit {
    pub point: WorldPoint,
    pub tag: Option<String>,
}

impl PickHit {
    pub fn new(point: WorldPoint) -> Self {
        Self { point, tag: None }
    }

    pub fn tagged(point: WorldPoint, tag: impl Into<String>) -> Self {
        Self {
            point,
            tag: Some(tag.into()),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag.as_deref() == Some(tag)
    }
}

pub trait PickQuery {
    fn pick(&self, target: PickTarget) -> Option<PickHit>;
}

pub trait DecorationQuery {
    /// True when the height sample at `(x, z)` sits under a placed decoration.
    fn is_decorated(&self, x: i32, z: i32) -> bool;
}

pub trait UiOcclusion {
    fn is_over_ui(&self) -> bool;
}

/// Everything the engine asks of its host during a tick.
pub trait TerrainHost: PickQuery + DecorationQuery + UiOcclusion {}

impl<T: PickQuery + DecorationQuery + UiOcclusion> TerrainHost for T {}

/// Receives merged height rectangles, row-major by z.
pub trait TerrainSink {
    fn write_heights(
        &mut self,
        origin_x: i32,
        origin_z: i32,
        width: usize,
        depth: usize,
        values: &[f32],
    );
}

/// One batched write received by a [`RecordingSink`].
#[derive(Clone, Debug, PartialEq)]
pub struct HeightWrite {
    pub origin_x: i32,
    pub origin_z: i32,
    pub width: usize,
    pub depth: usize,
    pub values: Vec<f32>,
}

/// Sink that keeps every write, drained by the caller.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub writes: Vec<HeightWrite>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, HeightWrite> {
        self.writes.drain(..)
    }
}

impl TerrainSink for RecordingSink {
    fn write_heights(
        &mut self,
        origin_x: i32,
        origin_z: i32,
        width: usize,
        depth: usize,
        values: &[f32],
    ) {
        self.writes.push(HeightWrite {
            origin_x,
            origin_z,
            width,
            depth,
            values: values.to_vec(),
        });
    }
}
