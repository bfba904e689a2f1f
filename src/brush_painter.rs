//! Stamps a resampled brush onto the height field.

use crate::brush_sampler::ResampledBrush;
use crate::coordinate_frame::CellXZ;
use crate::error::CarveResult;
use crate::height_field::{HeightField, HeightPatch};
use crate::host::TerrainSink;

/// Build the patch a brush contributes: `alpha(x, z) * height_scale`,
/// normalized by the field's vertical scale. Brush column `x` maps to field
/// x and brush row `z` to field z.
pub fn brush_patch(brush: &ResampledBrush, height_scale: f32, height_scale_y: f32) -> HeightPatch {
    let factor = height_scale / height_scale_y;
    HeightPatch::from_fn(brush.width(), brush.height(), |x, z| brush.alpha(x, z) * factor)
}

/// Top-left sample of a brush centred on `center`. Saturates for centres
/// near the `i32` limits; the field rejects those footprints anyway.
pub fn brush_origin(center: CellXZ, brush: &ResampledBrush) -> (i32, i32) {
    (
        center.x.saturating_sub(brush.width() as i32 / 2),
        center.z.saturating_sub(brush.height() as i32 / 2),
    )
}

/// Max-merge `brush` centred on `center`. A footprint that leaves the field
/// is rejected with `OutOfBounds` and nothing is written.
pub fn paint(
    center: CellXZ,
    brush: &ResampledBrush,
    height_scale: f32,
    field: &mut HeightField,
    sink: &mut dyn TerrainSink,
) -> CarveResult<()> {
    let (origin_x, origin_z) = brush_origin(center, brush);
    let patch = brush_patch(brush, height_scale, field.height_scale_y());
    field.apply_patch(origin_x, origin_z, &patch, sink)
}
