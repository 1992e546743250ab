//! Coverage masks: anti-aliased glyph coverage in surface coordinates.
//!
//! A mask covers a rectangle of the destination surface starting at
//! `(origin_x, origin_y)`. Values are coverage in `[0.0, 1.0]`; writes outside
//! the rectangle are dropped, which is also how field clipping works.

use image::GrayImage;
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Mask {
    pub fn new(origin_x: i32, origin_y: i32, width: usize, height: usize) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Empty mask with the same geometry.
    pub fn blank_like(&self) -> Self {
        Self::new(self.origin_x, self.origin_y, self.width, self.height)
    }

    /// Accumulate coverage at a surface coordinate (clamped to 1.0).
    #[inline]
    pub fn add(&mut self, x: i32, y: i32, coverage: f32) {
        let lx = x - self.origin_x;
        let ly = y - self.origin_y;
        if lx < 0 || ly < 0 || lx as usize >= self.width || ly as usize >= self.height {
            return;
        }
        let idx = ly as usize * self.width + lx as usize;
        self.data[idx] = (self.data[idx] + coverage).min(1.0);
    }

    /// Coverage at a surface coordinate (0.0 outside the mask).
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> f32 {
        let lx = x - self.origin_x;
        let ly = y - self.origin_y;
        if lx < 0 || ly < 0 || lx as usize >= self.width || ly as usize >= self.height {
            return 0.0;
        }
        self.data[ly as usize * self.width + lx as usize]
    }

    /// Fill an axis-aligned rectangle (underline, strike-through).
    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let left = (x as i64).max(self.origin_x as i64);
        let right = (x as i64 + width as i64).min(self.origin_x as i64 + self.width as i64);
        let top = (y as i64).max(self.origin_y as i64);
        let bottom = (y as i64 + height as i64).min(self.origin_y as i64 + self.height as i64);
        for py in top..bottom {
            for px in left..right {
                self.add(px as i32, py as i32, 1.0);
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&v| v <= 0.0)
    }

    /// Per-pixel maximum of two masks with identical geometry.
    pub fn union(&self, other: &Mask) -> Mask {
        debug_assert_eq!(
            (self.origin_x, self.origin_y, self.width, self.height),
            (other.origin_x, other.origin_y, other.width, other.height)
        );
        let mut out = self.clone();
        for (dst, &src) in out.data.iter_mut().zip(&other.data) {
            *dst = dst.max(src);
        }
        out
    }

    /// Grow coverage outward by `radius` pixels (stroke outline).
    ///
    /// Pixels at least half covered seed a Euclidean distance transform; each
    /// output pixel is covered by `radius + 1 - distance` (clamped), so the
    /// outline edge is anti-aliased over one pixel. Cost is linear in the mask
    /// size whatever the radius. Rows and columns are processed in parallel.
    pub fn dilate(&self, radius: f32) -> Mask {
        if radius <= 0.0 || self.width == 0 || self.height == 0 {
            return self.clone();
        }

        let distances = self.seed_distances();
        let mut out = self.blank_like();
        out.data
            .par_iter_mut()
            .zip(self.data.par_iter())
            .zip(distances.par_iter())
            .for_each(|((slot, &own), &dist_sq)| {
                let outline = (radius as f64 + 1.0 - dist_sq.sqrt()).clamp(0.0, 1.0) as f32;
                *slot = own.max(outline);
            });
        out
    }

    /// Squared distance from every pixel to the nearest half-covered pixel.
    fn seed_distances(&self) -> Vec<f64> {
        let (width, height) = (self.width, self.height);
        let mut grid: Vec<f64> = self
            .data
            .iter()
            .map(|&v| if v >= 0.5 { 0.0 } else { FAR })
            .collect();

        grid.par_chunks_mut(width).for_each(distance_1d);

        let mut columns = vec![0.0f64; width * height];
        for (y, row) in grid.chunks(width).enumerate() {
            for (x, &v) in row.iter().enumerate() {
                columns[x * height + y] = v;
            }
        }
        columns.par_chunks_mut(height).for_each(distance_1d);

        for (x, column) in columns.chunks(height).enumerate() {
            for (y, &v) in column.iter().enumerate() {
                grid[y * width + x] = v;
            }
        }
        grid
    }

    /// Gaussian blur with canvas `shadowBlur` semantics (sigma = blur / 2).
    pub fn blur(&self, shadow_blur: f32) -> Mask {
        if shadow_blur <= 0.0 || self.width == 0 || self.height == 0 {
            return self.clone();
        }
        // Past the mask size a wider kernel only flattens the result further.
        let sigma = (shadow_blur / 2.0).min(self.width.max(self.height) as f32);

        let bytes: Vec<u8> = self
            .data
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect();
        let Some(gray) = GrayImage::from_raw(self.width as u32, self.height as u32, bytes) else {
            return self.clone();
        };
        let blurred = image::imageops::blur(&gray, sigma);

        let mut out = self.blank_like();
        for (dst, px) in out.data.iter_mut().zip(blurred.pixels()) {
            *dst = px[0] as f32 / 255.0;
        }
        out
    }
}

/// Stand-in for "no seed on this line" in the distance transform.
const FAR: f64 = 1e20;

/// In-place 1D squared Euclidean distance transform (lower envelope of
/// parabolas rooted at every sample).
fn distance_1d(f: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    let src = f.to_vec();
    let mut roots = vec![0usize; n];
    let mut bounds = vec![0.0f64; n + 1];
    let mut k = 0usize;
    bounds[0] = f64::NEG_INFINITY;
    bounds[1] = f64::INFINITY;

    for q in 1..n {
        let qf = q as f64;
        let s = loop {
            let r = roots[k] as f64;
            let s = ((src[q] + qf * qf) - (src[roots[k]] + r * r)) / (2.0 * qf - 2.0 * r);
            if k > 0 && s <= bounds[k] {
                k -= 1;
            } else {
                break s;
            }
        };
        k += 1;
        roots[k] = q;
        bounds[k] = s;
        bounds[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, slot) in f.iter_mut().enumerate() {
        let qf = q as f64;
        while bounds[k + 1] < qf {
            k += 1;
        }
        let r = roots[k] as f64;
        *slot = (qf - r) * (qf - r) + src[roots[k]];
    }
}

/// Padding needed around drawn text so stroke and shadow are not cut off.
pub fn effect_padding(stroke_width: Option<f32>, shadow_blur: Option<f32>) -> i32 {
    let stroke = stroke_width.map(|w| ((w / 2.0).ceil() as i32).saturating_add(1)).unwrap_or(0);
    let shadow = shadow_blur.map(|b| ((b * 1.5).ceil() as i32).saturating_add(1)).unwrap_or(0);
    stroke.saturating_add(shadow).saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_clips_outside() {
        let mut mask = Mask::new(10, 10, 4, 4);
        mask.add(9, 10, 1.0);
        mask.add(14, 10, 1.0);
        assert!(mask.is_blank());
        mask.add(10, 10, 0.6);
        mask.add(10, 10, 0.6);
        assert_eq!(mask.get(10, 10), 1.0);
        assert_eq!(mask.get(0, 0), 0.0);
    }

    #[test]
    fn test_dilate_grows_coverage() {
        let mut mask = Mask::new(0, 0, 9, 9);
        mask.add(4, 4, 1.0);
        let grown = mask.dilate(2.0);
        assert_eq!(grown.get(4, 4), 1.0);
        assert_eq!(grown.get(6, 4), 1.0);
        assert_eq!(grown.get(4, 2), 1.0);
        assert_eq!(grown.get(0, 0), 0.0);
    }

    #[test]
    fn test_dilate_matches_disc_distance() {
        let mut mask = Mask::new(0, 0, 31, 17);
        mask.add(5, 8, 1.0);
        mask.add(25, 3, 1.0);
        let grown = mask.dilate(3.0);
        for y in 0..17 {
            for x in 0..31 {
                let d = [(5, 8), (25, 3)]
                    .iter()
                    .map(|&(sx, sy): &(i32, i32)| (((x - sx).pow(2) + (y - sy).pow(2)) as f32).sqrt())
                    .fold(f32::INFINITY, f32::min);
                let expected = (4.0 - d).clamp(0.0, 1.0);
                assert!(
                    (grown.get(x, y) - expected).abs() < 1e-4,
                    "pixel {},{}: {} vs {}",
                    x,
                    y,
                    grown.get(x, y),
                    expected
                );
            }
        }
    }

    #[test]
    fn test_dilate_keeps_faint_coverage_and_blank_stays_blank() {
        let mut mask = Mask::new(0, 0, 5, 5);
        mask.add(2, 2, 0.3);
        let grown = mask.dilate(2.0);
        assert_eq!(grown.get(2, 2), 0.3);
        assert_eq!(grown.get(3, 2), 0.0);
        assert!(Mask::new(0, 0, 6, 4).dilate(5.0).is_blank());
    }

    #[test]
    fn test_huge_radius_fills_without_blowing_up() {
        let mut mask = Mask::new(0, 0, 200, 120);
        mask.add(10, 10, 1.0);
        let start = std::time::Instant::now();
        let grown = mask.dilate(50_000.0);
        assert!(start.elapsed() < std::time::Duration::from_secs(2));
        assert!(grown.data.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_dilate_zero_radius_is_identity() {
        let mut mask = Mask::new(0, 0, 3, 3);
        mask.add(1, 1, 0.5);
        assert_eq!(mask.dilate(0.0), mask);
    }

    #[test]
    fn test_blur_spreads_and_conserves_position() {
        let mut mask = Mask::new(0, 0, 21, 21);
        mask.fill_rect(8, 8, 5, 5);
        let blurred = mask.blur(4.0);
        assert!(blurred.get(10, 10) > 0.5);
        assert!(blurred.get(6, 10) > 0.0);
        assert!(blurred.get(6, 10) < 1.0);
    }

    #[test]
    fn test_fill_rect_clips_to_mask() {
        let mut mask = Mask::new(2, 2, 4, 3);
        mask.fill_rect(-1_000_000, 3, i32::MAX, 1);
        assert_eq!(mask.data, vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_union_takes_max() {
        let mut a = Mask::new(0, 0, 2, 1);
        let mut b = Mask::new(0, 0, 2, 1);
        a.add(0, 0, 0.3);
        b.add(0, 0, 0.7);
        b.add(1, 0, 0.2);
        let u = a.union(&b);
        assert_eq!(u.data, vec![0.7, 0.2]);
    }

    #[test]
    fn test_effect_padding() {
        assert_eq!(effect_padding(None, None), 1);
        assert!(effect_padding(Some(4.0), Some(4.0)) >= 10);
    }
}
