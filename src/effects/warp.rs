//! Quadrilateral perspective warps.
//!
//! A side image is squeezed so that its far edge shrinks horizontally by `h_inset` and
//! vertically by `v_inset` on each end, while the near edge stays put. The output keeps the
//! source bounding box; pixels outside the warped quad are transparent.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::foundation::core::{Point, Surface};
use crate::foundation::error::{CoverflowError, CoverflowResult};

/// Row-major 3x3 projective matrix.
pub type Matrix3 = [[f64; 3]; 3];

/// Which vertical edge recedes from the viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FarEdge {
    /// Image left of center: its left edge is far.
    Left,
    /// Image right of center: its right edge is far.
    Right,
}

impl FarEdge {
    /// Far edge for a signed slot angle.
    pub fn for_angle(angle: f64) -> Self {
        if angle < 0.0 { Self::Left } else { Self::Right }
    }
}

/// Cache key: everything that determines a warp matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WarpKey {
    /// Scaled image width.
    pub width: u32,
    /// Scaled image height.
    pub height: u32,
    /// Horizontal inset of the far edge.
    pub h_inset: u32,
    /// Vertical inset at each end of the far edge.
    pub v_inset: u32,
    /// Receding edge.
    pub far: FarEdge,
}

impl WarpKey {
    /// Source rectangle corners: top-left, top-right, bottom-right, bottom-left.
    pub fn src_quad(&self) -> [Point; 4] {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        [
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ]
    }

    /// Destination quad corners in the same order as [`WarpKey::src_quad`].
    pub fn dst_quad(&self) -> [Point; 4] {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let hi = f64::from(self.h_inset);
        let vi = f64::from(self.v_inset);
        match self.far {
            FarEdge::Left => [
                Point::new(hi, vi),
                Point::new(w, 0.0),
                Point::new(w, h),
                Point::new(hi, h - vi),
            ],
            FarEdge::Right => [
                Point::new(0.0, 0.0),
                Point::new(w - hi, vi),
                Point::new(w - hi, h - vi),
                Point::new(0.0, h),
            ],
        }
    }

    /// Matrix mapping destination pixels back into the source image.
    pub fn inverse_matrix(&self) -> Option<Matrix3> {
        homography(&self.dst_quad(), &self.src_quad())
    }
}

/// Solve the projective transform that maps `from[i]` onto `to[i]`.
///
/// Returns `None` for degenerate quads.
pub fn homography(from: &[Point; 4], to: &[Point; 4]) -> Option<Matrix3> {
    // Unknowns a..h with the bottom-right entry fixed to 1.
    let mut m = [[0.0f64; 9]; 8];
    for i in 0..4 {
        let (x, y) = (from[i].x, from[i].y);
        let (u, v) = (to[i].x, to[i].y);
        m[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u, u];
        m[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v, v];
    }

    for col in 0..8 {
        let pivot = (col..8).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        let p = m[col][col];
        for k in col..9 {
            m[col][k] /= p;
        }
        for row in 0..8 {
            if row != col {
                let f = m[row][col];
                if f != 0.0 {
                    for k in col..9 {
                        m[row][k] -= f * m[col][k];
                    }
                }
            }
        }
    }

    let s = |i: usize| m[i][8];
    Some([[s(0), s(1), s(2)], [s(3), s(4), s(5)], [s(6), s(7), 1.0]])
}

/// Apply a projective matrix to a point. `None` when the point maps to infinity.
pub fn map_point(m: &Matrix3, p: Point) -> Option<Point> {
    let w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
    if w.abs() < 1e-12 {
        return None;
    }
    Some(Point::new(
        (m[0][0] * p.x + m[0][1] * p.y + m[0][2]) / w,
        (m[1][0] * p.x + m[1][1] * p.y + m[1][2]) / w,
    ))
}

/// Memo of inverse warp matrices shared by every frame of a run.
///
/// Inserts are idempotent, so concurrent misses on the same key are harmless.
#[derive(Debug, Default)]
pub struct PerspectiveCache {
    map: RwLock<HashMap<WarpKey, Matrix3>>,
}

impl PerspectiveCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached matrix for `key`, computing it on a miss.
    pub fn inverse_for(&self, key: WarpKey) -> CoverflowResult<Matrix3> {
        if let Some(m) = self
            .map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(*m);
        }
        let m = key.inverse_matrix().ok_or_else(|| {
            CoverflowError::render(format!("degenerate perspective quad for {key:?}"))
        })?;
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, m);
        Ok(m)
    }

    /// Number of cached matrices.
    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Return `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Warp `src` into a same-sized surface using a destination-to-source matrix.
///
/// Each destination pixel center is mapped back and sampled bilinearly; samples outside the
/// source read as transparent.
pub fn warp_perspective(src: &Surface, inverse: &Matrix3) -> Surface {
    let mut out = Surface::new(src.width, src.height);
    let w = src.width as usize;
    for y in 0..src.height {
        for x in 0..src.width {
            let p = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let Some(s) = map_point(inverse, p) else {
                continue;
            };
            let px = sample_bilinear(src, s.x - 0.5, s.y - 0.5);
            let i = ((y as usize) * w + x as usize) * 4;
            out.data[i..i + 4].copy_from_slice(&px);
        }
    }
    out
}

fn sample_bilinear(src: &Surface, fx: f64, fy: f64) -> [u8; 4] {
    let w = i64::from(src.width);
    let h = i64::from(src.height);
    if fx <= -1.0 || fy <= -1.0 || fx >= w as f64 || fy >= h as f64 {
        return [0; 4];
    }
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let fetch = |x: i64, y: i64| -> [f64; 4] {
        if x < 0 || y < 0 || x >= w || y >= h {
            return [0.0; 4];
        }
        let i = ((y * w + x) * 4) as usize;
        [
            f64::from(src.data[i]),
            f64::from(src.data[i + 1]),
            f64::from(src.data[i + 2]),
            f64::from(src.data[i + 3]),
        ]
    };
    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1, y0);
    let p01 = fetch(x0, y0 + 1);
    let p11 = fetch(x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] + (p10[c] - p00[c]) * tx;
        let bottom = p01[c] + (p11[c] - p01[c]) * tx;
        out[c] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/effects/warp.rs"]
mod tests;
