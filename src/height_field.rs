//! Normalized height samples and the max-merge write path.
//!
//! Every edit goes through [`HeightField::apply_patch`]: a stored sample is
//! only ever replaced by a larger one, so terrain can be raised but never
//! erased. A successful patch is forwarded to the [`TerrainSink`] as a
//! single batched rectangle.

use crate::debug_log::{debug_log, describe_rect};
use crate::error::{CarveError, CarveResult};
use crate::host::TerrainSink;

/// Rectangle of proposed heights, row-major by z: `values[z * width + x]`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightPatch {
    width: usize,
    depth: usize,
    values: Vec<f32>,
}

impl HeightPatch {
    pub fn filled(width: usize, depth: usize, value: f32) -> Self {
        Self {
            width,
            depth,
            values: vec![value; width * depth],
        }
    }

    pub fn from_fn(width: usize, depth: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut values = Vec::with_capacity(width * depth);
        for z in 0..depth {
            for x in 0..width {
                values.push(f(x, z));
            }
        }
        Self {
            width,
            depth,
            values,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.values[z * self.width + x]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct HeightField {
    width: i32,
    depth: i32,
    height_scale_y: f32,
    samples: Vec<f32>,
}

impl HeightField {
    /// Build a field filled with `base_height / height_scale_y`.
    pub fn new(width: i32, depth: i32, height_scale_y: f32, base_height: f32) -> CarveResult<Self> {
        if width <= 0 || depth <= 0 {
            return Err(CarveError::InvalidDimensions { width, depth });
        }
        if !(height_scale_y.is_finite() && height_scale_y > 0.0) {
            return Err(CarveError::config(format!(
                "height scale must be positive, got {height_scale_y}"
            )));
        }

        let base = base_height / height_scale_y;
        Ok(Self {
            width,
            depth,
            height_scale_y,
            samples: vec![base; width as usize * depth as usize],
        })
    }

    /// Replace every sample with a new uniform base height.
    pub fn reinitialize(&mut self, base_height: f32) {
        let base = base_height / self.height_scale_y;
        self.samples.fill(base);
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn height_scale_y(&self) -> f32 {
        self.height_scale_y
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= 0 && z >= 0 && x < self.width && z < self.depth
    }

    pub fn sample(&self, x: i32, z: i32) -> CarveResult<f32> {
        if !self.contains(x, z) {
            return Err(self.out_of_bounds(x, z));
        }
        Ok(self.samples[self.index(x, z)])
    }

    /// Sample converted back to world units.
    pub fn sample_world(&self, x: i32, z: i32) -> CarveResult<f32> {
        Ok(self.sample(x, z)? * self.height_scale_y)
    }

    /// Max-merge `patch` into the field at `(origin_x, origin_z)` and send
    /// the merged rectangle to `sink`.
    ///
    /// The whole footprint is checked before anything is written: a patch
    /// that does not fit leaves the field untouched and the sink silent.
    pub fn apply_patch(
        &mut self,
        origin_x: i32,
        origin_z: i32,
        patch: &HeightPatch,
        sink: &mut dyn TerrainSink,
    ) -> CarveResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        if let Err(err) = self.check_rect(origin_x, origin_z, patch.width(), patch.depth()) {
            debug_log(&format!(
                "apply_patch rejected {}",
                describe_rect(origin_x, origin_z, patch.width(), patch.depth())
            ));
            return Err(err);
        }

        let mut merged = Vec::with_capacity(patch.values().len());
        for z in 0..patch.depth() {
            for x in 0..patch.width() {
                let index = self.index(origin_x + x as i32, origin_z + z as i32);
                let value = self.samples[index].max(patch.get(x, z));
                self.samples[index] = value;
                merged.push(value);
            }
        }

        sink.write_heights(origin_x, origin_z, patch.width(), patch.depth(), &merged);
        Ok(())
    }

    /// Check that a `width x depth` rectangle at the origin lies inside the
    /// field. The far corner is computed in `i64`, so origins near the `i32`
    /// limits are rejected instead of wrapping.
    pub fn check_rect(
        &self,
        origin_x: i32,
        origin_z: i32,
        width: usize,
        depth: usize,
    ) -> CarveResult<()> {
        let end_x = i64::from(origin_x) + width as i64 - 1;
        let end_z = i64::from(origin_z) + depth as i64 - 1;
        for (x, z) in [(i64::from(origin_x), i64::from(origin_z)), (end_x, end_z)] {
            let inside =
                x >= 0 && z >= 0 && x < i64::from(self.width) && z < i64::from(self.depth);
            if !inside {
                return Err(self.out_of_bounds(saturate(x), saturate(z)));
            }
        }
        Ok(())
    }

    fn index(&self, x: i32, z: i32) -> usize {
        z as usize * self.width as usize + x as usize
    }

    fn out_of_bounds(&self, x: i32, z: i32) -> CarveError {
        CarveError::OutOfBounds {
            x,
            z,
            width: self.width,
            depth: self.depth,
        }
    }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
