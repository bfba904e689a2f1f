//! Raises a committed region.
//!
//! Axis-aligned regions raise their whole footprint. Rotated regions only
//! raise samples that sit under a placed decoration; the rest of their
//! bounding box is left as it is. With a brush mixed in, the region is
//! covered by 2×2 tiles instead, each stamped where the ground is picked.

use std::ops::RangeInclusive;

use crate::brush_painter;
use crate::brush_sampler::ResampledBrush;
use crate::coordinate_frame::{round_to_int, CellXZ, Frame, WorldPoint};
use crate::debug_log::{debug_log, describe_rect};
use crate::error::{CarveError, CarveResult};
use crate::height_field::{HeightField, HeightPatch};
use crate::host::{DecorationQuery, PickQuery, PickTarget, TerrainHost, TerrainSink};
use crate::region_selector::RegionCommit;

/// Cells per tile along each axis of a brush-tiled region.
pub const TILE_STRIDE: i32 = 2;

/// Outcome of painting one region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegionPaintReport {
    /// Patches merged into the field.
    pub writes: usize,
    /// Samples raised under decorations (rotated uniform regions only).
    pub decorated: usize,
    /// Tiles skipped because the pick missed or the stamp left the field.
    pub skipped: usize,
}

/// Inclusive sample bounds `(min_x, min_z, max_x, max_z)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleBounds {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl SampleBounds {
    pub fn width(&self) -> usize {
        (i64::from(self.max_x) - i64::from(self.min_x) + 1).max(0) as usize
    }

    pub fn depth(&self) -> usize {
        (i64::from(self.max_z) - i64::from(self.min_z) + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.depth() == 0
    }

    /// Intersection with the field's extents.
    pub fn clipped_to(&self, field: &HeightField) -> SampleBounds {
        SampleBounds {
            min_x: self.min_x.max(0),
            min_z: self.min_z.max(0),
            max_x: self.max_x.min(field.width() - 1),
            max_z: self.max_z.min(field.depth() - 1),
        }
    }
}

/// Paint a committed region. `tile` is the mixed-in brush, if any.
pub fn paint_region<H: TerrainHost + ?Sized>(
    commit: &RegionCommit,
    tile: Option<&ResampledBrush>,
    height_scale: f32,
    field: &mut HeightField,
    host: &H,
    sink: &mut dyn TerrainSink,
) -> CarveResult<RegionPaintReport> {
    match (tile, commit.rotated) {
        (Some(tile), _) => Ok(paint_tiled(commit, tile, height_scale, field, host, sink)),
        (None, false) => {
            paint_uniform_axis(commit, height_scale, field, sink)?;
            Ok(RegionPaintReport {
                writes: 1,
                ..Default::default()
            })
        }
        (None, true) => paint_uniform_rotated(commit, height_scale, field, host, sink),
    }
}

/// Footprint of an axis-aligned region: `scale + 1` samples per axis,
/// starting at the commit origin.
pub fn axis_footprint(commit: &RegionCommit) -> SampleBounds {
    let (x, z) = commit.origin();
    SampleBounds {
        min_x: x,
        min_z: z,
        max_x: x.saturating_add(commit.scale.0),
        max_z: z.saturating_add(commit.scale.1),
    }
}

pub fn paint_uniform_axis(
    commit: &RegionCommit,
    height_scale: f32,
    field: &mut HeightField,
    sink: &mut dyn TerrainSink,
) -> CarveResult<()> {
    let bounds = axis_footprint(commit);
    // Reject before allocating a patch the size of the selection.
    field.check_rect(bounds.min_x, bounds.min_z, bounds.width(), bounds.depth())?;
    let value = height_scale / field.height_scale_y();
    let patch = HeightPatch::filled(bounds.width(), bounds.depth(), value);
    field.apply_patch(bounds.min_x, bounds.min_z, &patch, sink)
}

/// World-space bounding box of a rotated region, rounded to samples and
/// widened by one sample on the low side.
pub fn rotated_bounds(commit: &RegionCommit) -> SampleBounds {
    let frame = commit.frame();
    let mut min = (f32::MAX, f32::MAX);
    let mut max = (f32::MIN, f32::MIN);
    for (x, z) in commit.corners() {
        let world = frame.rotate_out_of(WorldPoint::new(x, 0.0, z));
        min = (min.0.min(world.x), min.1.min(world.z));
        max = (max.0.max(world.x), max.1.max(world.z));
    }

    SampleBounds {
        min_x: round_to_int(min.0).saturating_sub(1),
        min_z: round_to_int(min.1).saturating_sub(1),
        max_x: round_to_int(max.0),
        max_z: round_to_int(max.1),
    }
}

/// Raise only the decorated samples inside the rotated region's bounding
/// box. The box is clipped to the field, since samples beyond its edge can
/// never carry a decoration.
pub fn paint_uniform_rotated<D: DecorationQuery + ?Sized>(
    commit: &RegionCommit,
    height_scale: f32,
    field: &mut HeightField,
    decorations: &D,
    sink: &mut dyn TerrainSink,
) -> CarveResult<RegionPaintReport> {
    let bounds = rotated_bounds(commit).clipped_to(field);
    if bounds.is_empty() {
        return Ok(RegionPaintReport::default());
    }

    let raised = height_scale / field.height_scale_y();
    let mut decorated = 0;
    let patch = HeightPatch::from_fn(bounds.width(), bounds.depth(), |x, z| {
        let (cx, cz) = (bounds.min_x + x as i32, bounds.min_z + z as i32);
        if decorations.is_decorated(cx, cz) {
            decorated += 1;
            raised
        } else {
            // Clipped bounds, so the sample always exists.
            field.sample(cx, cz).unwrap_or(0.0)
        }
    });

    field.apply_patch(bounds.min_x, bounds.min_z, &patch, sink)?;
    debug_log(&format!(
        "rotated region {} raised {} decorated samples",
        describe_rect(bounds.min_x, bounds.min_z, bounds.width(), bounds.depth()),
        decorated
    ));
    Ok(RegionPaintReport {
        writes: 1,
        decorated,
        skipped: 0,
    })
}

/// Frame-space centres of the region's tiles, mapped back to world space.
///
/// Axis-aligned tiles are probed half a sample further out than rotated
/// ones; the hit is rounded to a cell either way. Tiles whose centre lies
/// more than a tile away from the field are left out.
pub fn tile_centres(commit: &RegionCommit, field: &HeightField) -> Vec<WorldPoint> {
    let frame = commit.frame();
    let (sx, sz) = commit.origin();
    let offset = if commit.rotated { 1.0 } else { 1.5 };
    let (low, high) = field_frame_box(field, frame);

    let xs = tile_range(sx, commit.scale.0 / TILE_STRIDE, offset, low.0, high.0);
    let zs = tile_range(sz, commit.scale.1 / TILE_STRIDE, offset, low.1, high.1);

    let mut centres = Vec::new();
    for i in xs {
        for j in zs.clone() {
            let local = WorldPoint::new(
                (f64::from(sx) + f64::from(TILE_STRIDE) * i as f64 + offset) as f32,
                0.0,
                (f64::from(sz) + f64::from(TILE_STRIDE) * j as f64 + offset) as f32,
            );
            centres.push(frame.rotate_out_of(local));
        }
    }
    centres
}

/// Frame-space bounding box of the field, padded by one tile.
fn field_frame_box(field: &HeightField, frame: Frame) -> ((f64, f64), (f64, f64)) {
    let (w, d) = ((field.width() - 1) as f32, (field.depth() - 1) as f32);
    let pad = f64::from(TILE_STRIDE);
    let mut low = (f64::MAX, f64::MAX);
    let mut high = (f64::MIN, f64::MIN);
    for (x, z) in [(0.0, 0.0), (w, 0.0), (0.0, d), (w, d)] {
        let local = frame.rotate_into(WorldPoint::new(x, 0.0, z));
        low = (low.0.min(f64::from(local.x)), low.1.min(f64::from(local.z)));
        high = (high.0.max(f64::from(local.x)), high.1.max(f64::from(local.z)));
    }
    ((low.0 - pad, low.1 - pad), (high.0 + pad, high.1 + pad))
}

/// Tile indices in `0..tiles` whose centre `start + offset + 2i` lies in
/// `[low, high]`.
fn tile_range(
    start: i32,
    tiles: i32,
    offset: f64,
    low: f64,
    high: f64,
) -> RangeInclusive<i64> {
    let step = f64::from(TILE_STRIDE);
    let base = f64::from(start) + offset;
    let first = ((low - base) / step).ceil().max(0.0);
    let last = ((high - base) / step).floor().min(f64::from(tiles) - 1.0);
    (first as i64)..=(last as i64)
}

/// Stamp `tile` at every tile centre the ground pick resolves. Misses and
/// stamps that leave the field are skipped; the rest of the region still
/// paints.
pub fn paint_tiled<P: PickQuery + ?Sized>(
    commit: &RegionCommit,
    tile: &ResampledBrush,
    height_scale: f32,
    field: &mut HeightField,
    picker: &P,
    sink: &mut dyn TerrainSink,
) -> RegionPaintReport {
    let mut report = RegionPaintReport::default();

    for centre in tile_centres(commit, field) {
        let Some(hit) = picker.pick(PickTarget::Vertical {
            x: centre.x,
            z: centre.z,
        }) else {
            report.skipped += 1;
            continue;
        };

        let cell = CellXZ::nearest(hit.point.x, hit.point.z);
        match brush_painter::paint(cell, tile, height_scale, field, sink) {
            Ok(()) => report.writes += 1,
            Err(err @ CarveError::OutOfBounds { .. }) => {
                debug_log(&format!("tile at {:?} skipped: {}", cell, err));
                report.skipped += 1;
            }
            Err(err) => {
                debug_log(&format!("tile at {:?} failed: {}", cell, err));
                report.skipped += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush_sampler::{resample_unclamped, SourceBrush};
    use crate::coordinate_frame::GridAnchor;
    use crate::host::{PickHit, RecordingSink, UiOcclusion};
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// Flat ground that records every vertical pick.
    #[derive(Default)]
    struct FlatGround {
        decals: HashSet<(i32, i32)>,
        picks: RefCell<Vec<(f32, f32)>>,
        miss_beyond_x: Option<f32>,
    }

    impl PickQuery for FlatGround {
        fn pick(&self, target: PickTarget) -> Option<PickHit> {
            match target {
                PickTarget::Vertical { x, z } => {
                    self.picks.borrow_mut().push((x, z));
                    if self.miss_beyond_x.is_some_and(|limit| x > limit) {
                        return None;
                    }
                    Some(PickHit::new(WorldPoint::new(x, 0.0, z)))
                }
                PickTarget::Pointer => None,
            }
        }
    }

    impl DecorationQuery for FlatGround {
        fn is_decorated(&self, x: i32, z: i32) -> bool {
            self.decals.contains(&(x, z))
        }
    }

    impl UiOcclusion for FlatGround {
        fn is_over_ui(&self) -> bool {
            false
        }
    }

    fn commit(cell: (i32, i32), scale: (i32, i32), rotated: bool) -> RegionCommit {
        let frame = Frame::from_rotated(rotated);
        RegionCommit {
            anchor: GridAnchor::new(CellXZ::new(cell.0, cell.1), frame),
            scale,
            flip_x: false,
            flip_z: false,
            rotated,
        }
    }

    fn field() -> HeightField {
        HeightField::new(32, 32, 8.0, 0.0).unwrap()
    }

    #[test]
    fn test_axis_region_raises_full_footprint() {
        let mut field = field();
        let mut sink = RecordingSink::new();
        let host = FlatGround::default();
        let region = commit((10, 10), (4, 2), false);

        let report = paint_region(&region, None, 2.0, &mut field, &host, &mut sink).unwrap();
        assert_eq!(report.writes, 1);

        // Origin (9, 9), 5 x 3 samples.
        for z in 0..32 {
            for x in 0..32 {
                let inside = (9..=13).contains(&x) && (9..=11).contains(&z);
                let expected = if inside { 0.25 } else { 0.0 };
                assert_eq!(field.sample(x, z).unwrap(), expected, "({x}, {z})");
            }
        }
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_axis_region_flipped_extends_backwards() {
        let mut region = commit((10, 10), (4, 4), false);
        region.flip_x = true;
        let bounds = axis_footprint(&region);
        assert_eq!((bounds.min_x, bounds.max_x), (7, 11));
        assert_eq!((bounds.min_z, bounds.max_z), (9, 13));
    }

    #[test]
    fn test_axis_region_out_of_bounds_is_rejected() {
        let mut field = field();
        let mut sink = RecordingSink::new();
        let host = FlatGround::default();
        let region = commit((0, 0), (4, 4), false);

        let result = paint_region(&region, None, 2.0, &mut field, &host, &mut sink);
        assert!(matches!(result, Err(CarveError::OutOfBounds { .. })));
        assert!(sink.is_empty());
        assert!(field.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_rotated_region_only_raises_decorated_samples() {
        let mut field = field();
        let mut sink = RecordingSink::new();
        let region = commit((0, 20), (6, 6), true);
        let bounds = rotated_bounds(&region);

        let inside = (bounds.min_x + 2, bounds.min_z + 2);
        let host = FlatGround {
            decals: [inside, (0, 0)].into_iter().collect(),
            ..Default::default()
        };

        let report = paint_region(&region, None, 4.0, &mut field, &host, &mut sink).unwrap();
        assert_eq!(report.decorated, 1);
        assert_eq!(field.sample(inside.0, inside.1).unwrap(), 0.5);
        // Decal outside the box is ignored.
        assert_eq!(field.sample(0, 0).unwrap(), 0.0);
        let raised = field.samples().iter().filter(|&&s| s > 0.0).count();
        assert_eq!(raised, 1);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_rotated_bounds_cover_diamond() {
        let region = commit((0, 20), (4, 4), true);
        let bounds = rotated_bounds(&region);
        for (x, z) in region.corners() {
            let world = Frame::Rotated.rotate_out_of(WorldPoint::new(x, 0.0, z));
            assert!(world.x >= bounds.min_x as f32 && world.x <= bounds.max_x as f32 + 0.5);
            assert!(world.z >= bounds.min_z as f32 && world.z <= bounds.max_z as f32 + 0.5);
        }
        assert!(bounds.width() > 4);
    }

    #[test]
    fn test_rotated_region_without_decals_changes_nothing() {
        let mut field = field();
        let mut sink = RecordingSink::new();
        let host = FlatGround::default();
        let region = commit((0, 20), (4, 4), true);

        let report = paint_region(&region, None, 4.0, &mut field, &host, &mut sink).unwrap();
        assert_eq!(report.decorated, 0);
        assert!(field.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_far_and_huge_regions_are_rejected() {
        let mut field = field();
        let mut sink = RecordingSink::new();
        let host = FlatGround::default();

        let far = commit((i32::MAX - 1, 10), (4, 4), false);
        let result = paint_region(&far, None, 2.0, &mut field, &host, &mut sink);
        assert!(matches!(result, Err(CarveError::OutOfBounds { .. })));

        let huge = commit((10, 10), (i32::MAX - 1, i32::MAX - 1), false);
        let result = paint_region(&huge, None, 2.0, &mut field, &host, &mut sink);
        assert!(matches!(result, Err(CarveError::OutOfBounds { .. })));

        let far_rotated = commit((i32::MAX - 1, i32::MAX - 1), (4, 4), true);
        let report = paint_region(&far_rotated, None, 2.0, &mut field, &host, &mut sink).unwrap();
        assert_eq!(report, RegionPaintReport::default());

        assert!(sink.is_empty());
        assert!(field.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_huge_tiled_region_only_probes_near_field() {
        let mut field = field();
        let mut sink = RecordingSink::new();
        let host = FlatGround::default();
        let tile = resample_unclamped(&SourceBrush::solid(2), 2, 2);
        let huge = commit((10, 10), (i32::MAX - 1, i32::MAX - 1), false);

        let report = paint_region(&huge, Some(&tile), 8.0, &mut field, &host, &mut sink).unwrap();
        // Probes at 10.5 ..= 32.5 on each axis.
        assert_eq!(host.picks.borrow().len(), 12 * 12);
        assert_eq!(report.writes + report.skipped, 12 * 12);
        assert!(report.writes > 0);
        assert_eq!(field.sample(30, 30).unwrap(), 1.0);
        // The last probe rounds to 32 and its stamp leaves the field.
        assert_eq!(field.sample(31, 31).unwrap(), 0.0);
    }

    #[test]
    fn test_tile_centres_axis_aligned() {
        let region = commit((10, 10), (4, 6), false);
        let centres = tile_centres(&region, &field());
        assert_eq!(centres.len(), 2 * 3);
        // Origin (9, 9): probes at 10.5 and 12.5 on x, 10.5 to 14.5 on z.
        assert_eq!(centres[0], WorldPoint::new(10.5, 0.0, 10.5));
        assert_eq!(centres[5], WorldPoint::new(12.5, 0.0, 14.5));
    }

    #[test]
    fn test_tiled_region_stamps_each_tile() {
        let mut field = field();
        let mut sink = RecordingSink::new();
        let host = FlatGround::default();
        let tile = resample_unclamped(&SourceBrush::solid(4), 2, 2);
        let region = commit((10, 10), (4, 4), false);

        let report = paint_region(&region, Some(&tile), 8.0, &mut field, &host, &mut sink).unwrap();
        assert_eq!(report.writes, 4);
        assert_eq!(report.skipped, 0);
        assert_eq!(host.picks.borrow().len(), 4);
        // Probes at 10.5 and 12.5 round to cells 10 and 12, covering 9..=12.
        assert_eq!(field.sample(9, 9).unwrap(), 1.0);
        assert_eq!(field.sample(12, 12).unwrap(), 1.0);
        assert_eq!(field.sample(13, 13).unwrap(), 0.0);
    }

    #[test]
    fn test_tiled_region_skips_misses_and_edges() {
        let mut field = field();
        let mut sink = RecordingSink::new();
        let host = FlatGround {
            miss_beyond_x: Some(11.0),
            ..Default::default()
        };
        let tile = resample_unclamped(&SourceBrush::solid(2), 2, 2);
        let region = commit((10, 10), (4, 2), false);

        let report = paint_tiled(&region, &tile, 8.0, &mut field, &host, &mut sink);
        assert_eq!(report.writes, 1);
        assert_eq!(report.skipped, 1);

        // A region hanging off the field edge paints what fits.
        let region = commit((0, 10), (4, 2), false);
        let ground = FlatGround::default();
        let report = paint_tiled(&region, &tile, 8.0, &mut field, &ground, &mut sink);
        assert_eq!(report.writes + report.skipped, 2);
        assert!(report.skipped >= 1);
    }

    #[test]
    fn test_tiled_rotated_region_picks_in_world_space() {
        let mut field = field();
        let mut sink = RecordingSink::new();
        let host = FlatGround::default();
        let tile = resample_unclamped(&SourceBrush::solid(2), 2, 2);
        let region = commit((0, 22), (2, 2), true);

        paint_tiled(&region, &tile, 8.0, &mut field, &host, &mut sink);
        let picks = host.picks.borrow();
        assert_eq!(picks.len(), 1);

        let (sx, sz) = region.origin();
        let expected = Frame::Rotated
            .rotate_out_of(WorldPoint::new((sx + 1) as f32, 0.0, (sz + 1) as f32));
        assert!((picks[0].0 - expected.x).abs() < 1e-5);
        assert!((picks[0].1 - expected.z).abs() < 1e-5);
    }
}
