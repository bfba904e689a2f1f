//! Region selection state machine.
//!
//! While idle the selector follows the pointer with a preview anchor. A
//! pointer press fixes the anchor and the selection grows toward the
//! pointer, in steps of two cells, until the pointer is released and a
//! [`RegionCommit`] is handed to the painters.

use crate::coordinate_frame::{round_to_int, to_grid_space, Frame, GridAnchor, WorldPoint};
use crate::host::TickInput;

/// Smallest region extent along either axis.
pub const MIN_REGION_EXTENT: i32 = 2;

/// Largest half extent a user can set; twice this still fits an `i32`.
pub const MAX_SCALE_LIMIT: i32 = i32::MAX / 2;

/// Current phase of region selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionPhase {
    /// Following the pointer, nothing anchored
    #[default]
    Idle,
    /// Anchor fixed, extent follows the pointer while it is held
    Growing,
}

/// A finished selection, ready to paint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionCommit {
    pub anchor: GridAnchor,
    /// Extent in cells along frame x and z, even, at least 2.
    pub scale: (i32, i32),
    /// The pointer ended on the negative x side of the anchor.
    pub flip_x: bool,
    /// The pointer ended on the negative z side of the anchor.
    pub flip_z: bool,
    pub rotated: bool,
}

impl RegionCommit {
    pub fn frame(&self) -> Frame {
        Frame::from_rotated(self.rotated)
    }

    /// Low corner of the selection in frame space, before rounding.
    pub fn low_corner(&self) -> (f32, f32) {
        let low = |anchor: f32, scale: i32, flip: bool| {
            if flip {
                anchor - scale as f32 + 0.5
            } else {
                anchor - 1.5
            }
        };
        (
            low(self.anchor.x, self.scale.0, self.flip_x),
            low(self.anchor.z, self.scale.1, self.flip_z),
        )
    }

    /// First height sample covered by the selection in frame space.
    pub fn origin(&self) -> (i32, i32) {
        let (x, z) = self.low_corner();
        (round_to_int(x), round_to_int(z))
    }

    /// The four rectangle corners in frame space.
    pub fn corners(&self) -> [(f32, f32); 4] {
        let (lx, lz) = self.low_corner();
        let hx = lx + self.scale.0 as f32;
        let hz = lz + self.scale.1 as f32;
        [(lx, lz), (hx, lz), (lx, hz), (hx, hz)]
    }
}

#[derive(Clone, Debug)]
pub struct RegionSelector {
    phase: SelectionPhase,
    frame: Frame,
    preview: Option<GridAnchor>,
    anchor: Option<GridAnchor>,
    scale: (i32, i32),
    flip_x: bool,
    flip_z: bool,
    min_scale: i32,
    /// User-facing half extents; the real bound is twice this.
    scale_limit: (i32, i32),
}

impl RegionSelector {
    pub fn new(min_scale: i32, default_limit: i32) -> Self {
        let min_scale = min_scale.clamp(1, MAX_SCALE_LIMIT);
        let limit = default_limit.clamp(min_scale, MAX_SCALE_LIMIT);
        Self {
            phase: SelectionPhase::Idle,
            frame: Frame::Default,
            preview: None,
            anchor: None,
            scale: (MIN_REGION_EXTENT, MIN_REGION_EXTENT),
            flip_x: false,
            flip_z: false,
            min_scale,
            scale_limit: (limit, limit),
        }
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn is_growing(&self) -> bool {
        self.phase == SelectionPhase::Growing
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn is_rotated(&self) -> bool {
        self.frame.is_rotated()
    }

    pub fn preview_anchor(&self) -> Option<GridAnchor> {
        self.preview
    }

    pub fn anchor(&self) -> Option<GridAnchor> {
        self.anchor
    }

    pub fn scale(&self) -> (i32, i32) {
        self.scale
    }

    pub fn scale_limit(&self) -> (i32, i32) {
        self.scale_limit
    }

    /// Largest extent a selection may reach along x and z.
    pub fn max_extent(&self) -> (i32, i32) {
        (
            self.scale_limit.0.saturating_mul(2),
            self.scale_limit.1.saturating_mul(2),
        )
    }

    /// Presentation rotation of the selection box in degrees: `(x, z)`.
    /// A negative z drag turns the box 180° about x and vice versa.
    pub fn rotation_degrees(&self) -> (f32, f32) {
        let degrees = |flip: bool| if flip { 180.0 } else { 0.0 };
        (degrees(self.flip_z), degrees(self.flip_x))
    }

    /// Set the x half extent, clamped to `[min, MAX_SCALE_LIMIT]`. Returns
    /// the stored value.
    pub fn set_scale_limit_x(&mut self, value: i32) -> i32 {
        self.scale_limit.0 = value.clamp(self.min_scale, MAX_SCALE_LIMIT);
        self.scale_limit.0
    }

    pub fn set_scale_limit_z(&mut self, value: i32) -> i32 {
        self.scale_limit.1 = value.clamp(self.min_scale, MAX_SCALE_LIMIT);
        self.scale_limit.1
    }

    /// Advance one tick. Returns a commit when the pointer is released
    /// after growing.
    pub fn tick(
        &mut self,
        input: &TickInput,
        pick: Option<WorldPoint>,
        over_ui: bool,
    ) -> Option<RegionCommit> {
        if input.cancel {
            self.cancel();
            return None;
        }

        match self.phase {
            SelectionPhase::Idle => {
                self.update_preview(pick);
                if input.pointer_pressed && !over_ui {
                    self.begin();
                } else if input.toggle_rotation {
                    self.toggle_rotation();
                }
                None
            }
            SelectionPhase::Growing => {
                if input.pointer_held {
                    if let Some(point) = pick {
                        self.grow(point);
                    }
                    None
                } else {
                    self.release()
                }
            }
        }
    }

    /// Track the pointer while idle.
    pub fn update_preview(&mut self, pick: Option<WorldPoint>) {
        if self.phase != SelectionPhase::Idle {
            return;
        }
        if let Some(point) = pick {
            self.preview = Some(to_grid_space(point, self.frame));
        }
    }

    /// Fix the anchor at the preview position. Needs a preview.
    pub fn begin(&mut self) -> bool {
        if self.phase != SelectionPhase::Idle {
            return false;
        }
        let Some(anchor) = self.preview else {
            return false;
        };

        self.anchor = Some(anchor);
        self.scale = (MIN_REGION_EXTENT, MIN_REGION_EXTENT);
        self.flip_x = false;
        self.flip_z = false;
        self.phase = SelectionPhase::Growing;
        true
    }

    /// Stretch the selection toward `point`.
    pub fn grow(&mut self, point: WorldPoint) {
        let Some(anchor) = self.anchor else {
            return;
        };
        if self.phase != SelectionPhase::Growing {
            return;
        }

        let local = self.frame.rotate_into(point);
        let dx = round_to_int(local.x - anchor.x);
        let dz = round_to_int(local.z - anchor.z);
        let (max_x, max_z) = self.max_extent();

        self.flip_x = dx < 0;
        self.flip_z = dz < 0;
        self.scale = (even_extent(dx, max_x), even_extent(dz, max_z));
    }

    /// Finish growing and hand out the selection.
    pub fn release(&mut self) -> Option<RegionCommit> {
        if self.phase != SelectionPhase::Growing {
            return None;
        }
        let commit = self.anchor.map(|anchor| RegionCommit {
            anchor,
            scale: self.scale,
            flip_x: self.flip_x,
            flip_z: self.flip_z,
            rotated: self.frame.is_rotated(),
        });
        self.reset();
        commit
    }

    /// Switch frames. Ignored while growing.
    pub fn toggle_rotation(&mut self) -> bool {
        if self.phase != SelectionPhase::Idle {
            return false;
        }
        self.frame = self.frame.toggled();
        self.preview = None;
        true
    }

    /// Drop any selection in progress.
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.phase = SelectionPhase::Idle;
        self.preview = None;
        self.anchor = None;
        self.scale = (MIN_REGION_EXTENT, MIN_REGION_EXTENT);
        self.flip_x = false;
        self.flip_z = false;
    }
}

/// `|delta|` rounded down to even, kept within `[2, max]`.
fn even_extent(delta: i32, max: i32) -> i32 {
    let even = i32::try_from(delta.unsigned_abs() / 2 * 2).unwrap_or(i32::MAX);
    even.clamp(MIN_REGION_EXTENT, max.max(MIN_REGION_EXTENT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate_frame::CellXZ;

    fn anchored_at_10() -> RegionSelector {
        let mut selector = RegionSelector::new(2, 20);
        selector.tick(&TickInput::idle(), Some(WorldPoint::new(10.2, 0.0, 10.3)), false);
        assert!(selector.begin());
        selector
    }

    #[test]
    fn test_selector_default() {
        let selector = RegionSelector::new(2, 10);
        assert_eq!(selector.phase(), SelectionPhase::Idle);
        assert_eq!(selector.frame(), Frame::Default);
        assert_eq!(selector.max_extent(), (20, 20));
        assert!(selector.preview_anchor().is_none());
    }

    #[test]
    fn test_idle_tick_tracks_preview() {
        let mut selector = RegionSelector::new(2, 10);
        selector.tick(&TickInput::idle(), Some(WorldPoint::new(5.4, 0.0, 8.6)), false);
        let preview = selector.preview_anchor().unwrap();
        assert_eq!(preview.cell, CellXZ::new(4, 8));

        // A missed pick keeps the last preview.
        selector.tick(&TickInput::idle(), None, false);
        assert_eq!(selector.preview_anchor().unwrap().cell, CellXZ::new(4, 8));
        assert_eq!(selector.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn test_drag_scale_floors_and_flips() {
        let mut selector = anchored_at_10();
        assert_eq!(selector.anchor().unwrap().cell, CellXZ::new(10, 10));

        // Anchor sits at (10.5, 10.5); drag by (7, -3).
        selector.tick(&TickInput::hold(), Some(WorldPoint::new(17.5, 0.0, 7.5)), false);
        assert_eq!(selector.scale(), (6, 2));
        assert_eq!(selector.rotation_degrees(), (180.0, 0.0));

        let commit = selector.tick(&TickInput::idle(), None, false).unwrap();
        assert_eq!(commit.scale, (6, 2));
        assert!(!commit.flip_x);
        assert!(commit.flip_z);
        assert!(!commit.rotated);
        assert_eq!(selector.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn test_scale_is_clamped_to_limits() {
        let mut selector = anchored_at_10();
        selector.set_scale_limit_x(3);
        selector.grow(WorldPoint::new(90.0, 0.0, 10.5));
        assert_eq!(selector.scale(), (6, 2));

        selector.grow(WorldPoint::new(10.5, 0.0, -200.0));
        assert_eq!(selector.scale(), (2, 40));
    }

    #[test]
    fn test_scale_always_even_and_bounded() {
        let mut selector = anchored_at_10();
        let (max_x, max_z) = selector.max_extent();
        for i in -60..60 {
            let t = i as f32 * 0.73;
            selector.grow(WorldPoint::new(10.5 + t, 0.0, 10.5 - t * 1.3));
            let (sx, sz) = selector.scale();
            assert_eq!(sx % 2, 0);
            assert_eq!(sz % 2, 0);
            assert!((2..=max_x).contains(&sx));
            assert!((2..=max_z).contains(&sz));
        }
    }

    #[test]
    fn test_begin_blocked_over_ui() {
        let mut selector = RegionSelector::new(2, 10);
        selector.tick(&TickInput::press(), Some(WorldPoint::new(3.0, 0.0, 3.0)), true);
        assert_eq!(selector.phase(), SelectionPhase::Idle);

        selector.tick(&TickInput::press(), Some(WorldPoint::new(3.0, 0.0, 3.0)), false);
        assert_eq!(selector.phase(), SelectionPhase::Growing);
    }

    #[test]
    fn test_begin_needs_preview() {
        let mut selector = RegionSelector::new(2, 10);
        selector.tick(&TickInput::press(), None, false);
        assert_eq!(selector.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn test_cancel_discards_selection() {
        let mut selector = anchored_at_10();
        selector.grow(WorldPoint::new(20.0, 0.0, 20.0));

        assert!(selector.tick(&TickInput::cancel(), None, false).is_none());
        assert_eq!(selector.phase(), SelectionPhase::Idle);
        assert!(selector.anchor().is_none());
        assert_eq!(selector.scale(), (2, 2));
        // Releasing afterwards commits nothing.
        assert!(selector.release().is_none());
    }

    #[test]
    fn test_toggle_rotation_only_when_idle() {
        let mut selector = RegionSelector::new(2, 10);
        selector.tick(&TickInput::toggle_rotation(), None, false);
        assert!(selector.is_rotated());

        selector.tick(&TickInput::idle(), Some(WorldPoint::new(6.0, 0.0, 6.0)), false);
        selector.begin();
        assert!(!selector.toggle_rotation());
        assert!(selector.is_rotated());

        let commit = selector.release().unwrap();
        assert!(commit.rotated);
        assert_eq!(commit.frame(), Frame::Rotated);
    }

    #[test]
    fn test_rotated_frame_grows_along_diagonal() {
        let mut selector = RegionSelector::new(2, 20);
        selector.toggle_rotation();
        selector.update_preview(Some(WorldPoint::new(10.0, 0.0, 10.0)));
        selector.begin();
        let anchor = selector.anchor().unwrap();

        // Move along the rotated frame's +x axis (world +x, -z diagonal).
        let target = Frame::Rotated.rotate_out_of(WorldPoint::new(anchor.x + 8.0, 0.0, anchor.z));
        selector.grow(target);
        assert_eq!(selector.scale(), (8, 2));
        assert_eq!(selector.rotation_degrees(), (0.0, 0.0));
    }

    #[test]
    fn test_commit_origin_follows_flip() {
        let anchor = GridAnchor::new(CellXZ::new(10, 10), Frame::Default);
        let mut commit = RegionCommit {
            anchor,
            scale: (6, 4),
            flip_x: false,
            flip_z: false,
            rotated: false,
        };
        assert_eq!(commit.origin(), (9, 9));

        commit.flip_x = true;
        commit.flip_z = true;
        // 10.5 - 6 + 0.5 = 5, 10.5 - 4 + 0.5 = 7
        assert_eq!(commit.origin(), (5, 7));
    }

    #[test]
    fn test_huge_scale_limit_does_not_overflow() {
        let mut selector = anchored_at_10();
        assert_eq!(selector.set_scale_limit_x(1_500_000_000), MAX_SCALE_LIMIT);
        assert_eq!(selector.set_scale_limit_z(i32::MAX), MAX_SCALE_LIMIT);
        assert_eq!(selector.max_extent(), (i32::MAX - 1, i32::MAX - 1));

        selector.grow(WorldPoint::new(30.0, 0.0, 30.0));
        assert_eq!(selector.scale(), (20, 20));

        let selector = RegionSelector::new(2, i32::MAX);
        assert_eq!(selector.scale_limit(), (MAX_SCALE_LIMIT, MAX_SCALE_LIMIT));
    }

    #[test]
    fn test_far_pick_stays_in_bounds() {
        let mut selector = anchored_at_10();
        selector.grow(WorldPoint::new(-3.0e9, 0.0, 10.0));
        assert_eq!(selector.scale(), (40, 2));
        assert_eq!(selector.rotation_degrees(), (0.0, 180.0));

        selector.set_scale_limit_x(MAX_SCALE_LIMIT);
        selector.grow(WorldPoint::new(-3.0e9, 0.0, 3.0e9));
        let (sx, sz) = selector.scale();
        assert_eq!(sx % 2, 0);
        assert!((2..=selector.max_extent().0).contains(&sx));
        assert_eq!(sz, 40);
    }

    #[test]
    fn test_scale_limit_setters_clamp() {
        let mut selector = RegionSelector::new(2, 10);
        assert_eq!(selector.set_scale_limit_x(-4), 2);
        assert_eq!(selector.set_scale_limit_z(15), 15);
        assert_eq!(selector.max_extent(), (4, 30));
    }
}
