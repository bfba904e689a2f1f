//! Brush sources and bilinear resampling.
//!
//! Source brushes are immutable alpha images. Tools never paint with a
//! source directly; they ask for a [`ResampledBrush`] at the size they
//! need and keep it until the size or the selected source changes.

use rayon::prelude::*;

use crate::config::BrushLimits;
use crate::error::{CarveError, CarveResult};

/// Immutable alpha image, row-major: `alpha[row * width + column]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceBrush {
    width: usize,
    height: usize,
    alpha: Vec<f32>,
}

impl SourceBrush {
    /// Alpha values are clamped to `[0, 1]`.
    pub fn new(width: usize, height: usize, alpha: Vec<f32>) -> CarveResult<Self> {
        if alpha.len() != width * height {
            return Err(CarveError::config(format!(
                "brush source has {} alpha values, expected {}x{}",
                alpha.len(),
                width,
                height
            )));
        }
        let alpha = alpha.into_iter().map(|a| a.clamp(0.0, 1.0)).collect();
        Ok(Self {
            width,
            height,
            alpha,
        })
    }

    /// Fully opaque square brush.
    pub fn solid(size: usize) -> Self {
        Self {
            width: size,
            height: size,
            alpha: vec![1.0; size * size],
        }
    }

    /// Round brush fading linearly from the centre to the edge.
    pub fn radial(size: usize) -> Self {
        let center = size as f32 * 0.5;
        let mut alpha = Vec::with_capacity(size * size);
        for row in 0..size {
            for col in 0..size {
                let dx = col as f32 + 0.5 - center;
                let dz = row as f32 + 0.5 - center;
                let dist = (dx * dx + dz * dz).sqrt() / center.max(f32::EPSILON);
                alpha.push((1.0 - dist).clamp(0.0, 1.0));
            }
        }
        Self {
            width: size,
            height: size,
            alpha,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn texel(&self, col: usize, row: usize) -> f32 {
        self.alpha[row * self.width + col]
    }

    /// Bilinear sample at normalized `(u, v)`, texel centres at `i + 0.5`,
    /// clamped at the edges.
    pub fn sample_bilinear(&self, u: f32, v: f32) -> f32 {
        if self.alpha.is_empty() {
            return 0.0;
        }

        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        let max_x = self.width as i64 - 1;
        let max_y = self.height as i64 - 1;
        let cx0 = (x0 as i64).clamp(0, max_x) as usize;
        let cx1 = (x0 as i64 + 1).clamp(0, max_x) as usize;
        let cy0 = (y0 as i64).clamp(0, max_y) as usize;
        let cy1 = (y0 as i64 + 1).clamp(0, max_y) as usize;

        let top = lerp(self.texel(cx0, cy0), self.texel(cx1, cy0), tx);
        let bottom = lerp(self.texel(cx0, cy1), self.texel(cx1, cy1), tx);
        lerp(top, bottom, ty)
    }
}

/// A source brush resampled to a target size, row-major like its source.
#[derive(Clone, Debug, PartialEq)]
pub struct ResampledBrush {
    width: usize,
    height: usize,
    alpha: Vec<f32>,
}

impl ResampledBrush {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn alpha(&self, x: usize, z: usize) -> f32 {
        self.alpha[z * self.width + x]
    }

    pub fn values(&self) -> &[f32] {
        &self.alpha
    }
}

/// Resample `source` to the requested size after clamping each dimension
/// to `limits`. Requests outside the limits are clamped, never rejected.
pub fn resample(
    source: &SourceBrush,
    target_width: i32,
    target_height: i32,
    limits: &BrushLimits,
) -> ResampledBrush {
    let (width, height) = limits.clamp(target_width, target_height);
    resample_unclamped(source, width.max(1) as usize, height.max(1) as usize)
}

/// Resample to an exact size. Destination pixel `(px, pz)` samples the
/// source at `(px / width, pz / height)`.
pub fn resample_unclamped(source: &SourceBrush, width: usize, height: usize) -> ResampledBrush {
    let mut alpha = vec![0.0f32; width * height];
    let inc_u = 1.0 / width as f32;
    let inc_v = 1.0 / height as f32;

    alpha
        .par_chunks_mut(width.max(1))
        .enumerate()
        .for_each(|(pz, row)| {
            let v = inc_v * pz as f32;
            for (px, out) in row.iter_mut().enumerate() {
                *out = source.sample_bilinear(inc_u * px as f32, v);
            }
        });

    ResampledBrush {
        width,
        height,
        alpha,
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
