//! World ↔ grid conversion for the two selection frames.
//!
//! The default frame is axis aligned; the rotated frame turns the world −45°
//! about the vertical axis so diagonal selections become rectangles. Both
//! snap picks onto an even lattice, since two cells is the smallest region
//! or brush tile the tools produce.

use std::f32::consts::FRAC_1_SQRT_2;

/// A point in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPoint {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A 2D cell position on the terrain (XZ plane)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct CellXZ {
    pub x: i32,
    pub z: i32,
}

impl CellXZ {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Cell nearest to a world position (ties to even).
    pub fn nearest(x: f32, z: f32) -> Self {
        Self::new(round_to_int(x), round_to_int(z))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Frame {
    #[default]
    Default,
    Rotated,
}

impl Frame {
    pub fn from_rotated(rotated: bool) -> Self {
        if rotated {
            Frame::Rotated
        } else {
            Frame::Default
        }
    }

    pub fn is_rotated(self) -> bool {
        self == Frame::Rotated
    }

    pub fn toggled(self) -> Self {
        Self::from_rotated(!self.is_rotated())
    }

    /// Horizontal offset added to lattice cells: `(x, z)`.
    pub fn offset(self) -> (f32, f32) {
        match self {
            Frame::Default => (0.5, 0.5),
            Frame::Rotated => (1.0, 1.0),
        }
    }

    /// Rotate a world point into this frame's grid orientation.
    pub fn rotate_into(self, p: WorldPoint) -> WorldPoint {
        match self {
            Frame::Default => p,
            // −45° about +Y
            Frame::Rotated => WorldPoint::new(
                (p.x - p.z) * FRAC_1_SQRT_2,
                p.y,
                (p.x + p.z) * FRAC_1_SQRT_2,
            ),
        }
    }

    /// Undo [`Frame::rotate_into`].
    pub fn rotate_out_of(self, p: WorldPoint) -> WorldPoint {
        match self {
            Frame::Default => p,
            Frame::Rotated => WorldPoint::new(
                (p.x + p.z) * FRAC_1_SQRT_2,
                p.y,
                (p.z - p.x) * FRAC_1_SQRT_2,
            ),
        }
    }
}

/// A pick snapped onto a frame's lattice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridAnchor {
    /// Even lattice cell in frame space.
    pub cell: CellXZ,
    /// `cell + frame.offset()`, the anchor the selection grows from.
    pub x: f32,
    pub z: f32,
}

impl GridAnchor {
    pub fn new(cell: CellXZ, frame: Frame) -> Self {
        let (ox, oz) = frame.offset();
        Self {
            cell,
            x: cell.x as f32 + ox,
            z: cell.z as f32 + oz,
        }
    }
}

/// Nearest integer with ties to even, the rounding the pick snapping uses.
pub fn round_to_int(v: f32) -> i32 {
    v.round_ties_even() as i32
}

/// Snap an integer down onto the even lattice.
pub fn snap_even(n: i32) -> i32 {
    n.div_euclid(2) * 2
}

pub fn to_grid_space(point: WorldPoint, frame: Frame) -> GridAnchor {
    let local = frame.rotate_into(point);
    let cell = CellXZ::new(
        snap_even(round_to_int(local.x)),
        snap_even(round_to_int(local.z)),
    );
    GridAnchor::new(cell, frame)
}

/// World position of a lattice cell's anchor, at height `y`.
pub fn to_world_space(cell: CellXZ, y: f32, frame: Frame) -> WorldPoint {
    let anchor = GridAnchor::new(cell, frame);
    frame.rotate_out_of(WorldPoint::new(anchor.x, y, anchor.z))
}
