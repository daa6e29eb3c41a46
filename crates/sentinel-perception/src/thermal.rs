//! False-colour "thermal" rendering.
//!
//! grayscale → Gaussian blur → CLAHE → jet palette × gain
//!
//! Every step is integer or single-pass floating point over fixed inputs,
//! so the same frame always renders to the same bytes.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use image::{Rgb, RgbImage};
//! use sentinel_perception::ThermalRenderer;
//! use sentinel_types::{CameraSource, Frame};
//!
//! let frame = Frame::new(
//!     RgbImage::from_pixel(32, 24, Rgb([200, 40, 40])),
//!     CameraSource::BackFisheye,
//!     Utc::now(),
//! );
//! let thermal = ThermalRenderer::default().render(&frame);
//! assert_eq!((thermal.width(), thermal.height()), (32, 24));
//! ```

use image::{GrayImage, Luma, Rgb, RgbImage};
use sentinel_types::Frame;

/// Tuning for [`ThermalRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalConfig {
    /// Side of the square Gaussian kernel; forced odd.
    pub blur_kernel: usize,
    /// CLAHE clip limit, as a multiple of the uniform bin height.
    pub clip_limit: f64,
    /// CLAHE tiles across and down.
    pub tile_grid: (u32, u32),
    /// Intensity scale applied after palette mapping, saturating at 255.
    pub gain: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 9,
            clip_limit: 3.0,
            tile_grid: (8, 8),
            gain: 1.2,
        }
    }
}

/// Deterministic grayscale → enhanced → false-colour transform.
#[derive(Debug, Clone)]
pub struct ThermalRenderer {
    config: ThermalConfig,
    palette: [[u8; 3]; 256],
}

impl Default for ThermalRenderer {
    fn default() -> Self {
        Self::new(ThermalConfig::default())
    }
}

impl ThermalRenderer {
    pub fn new(config: ThermalConfig) -> Self {
        let palette = jet_palette(config.gain);
        Self { config, palette }
    }

    pub fn config(&self) -> &ThermalConfig {
        &self.config
    }

    /// Render `frame`; metadata is carried over to the result.
    pub fn render(&self, frame: &Frame) -> Frame {
        let gray = grayscale(frame.pixels());
        let blurred = gaussian_blur(&gray, self.config.blur_kernel);
        let enhanced = clahe(&blurred, self.config.clip_limit, self.config.tile_grid);

        let mut out = RgbImage::new(enhanced.width(), enhanced.height());
        for (dst, src) in out.pixels_mut().zip(enhanced.pixels()) {
            *dst = Rgb(self.palette[src[0] as usize]);
        }
        frame.derive(out)
    }
}

/// ITU-R BT.601 luma in 14-bit fixed point.
pub fn grayscale(img: &RgbImage) -> GrayImage {
    let mut out = GrayImage::new(img.width(), img.height());
    for (dst, px) in out.pixels_mut().zip(img.pixels()) {
        let y = (u32::from(px[0]) * 4899 + u32::from(px[1]) * 9617 + u32::from(px[2]) * 1868
            + 8192)
            >> 14;
        *dst = Luma([y.min(255) as u8]);
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Gaussian blur
// ────────────────────────────────────────────────────────────────────────────

/// Normalised 1-D Gaussian taps with σ derived from the kernel size.
fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    let sigma = 0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (ksize / 2) as f64;
    let raw: Vec<f64> = (0..ksize)
        .map(|i| {
            let d = i as f64 - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.iter().map(|v| (v / sum) as f32).collect()
}

/// Mirror `i` into `[0, n)` without repeating the edge pixel.
fn reflect_101(i: i64, n: i64) -> usize {
    if n <= 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let i = i.rem_euclid(period);
    (if i >= n { period - i } else { i }) as usize
}

/// Separable Gaussian blur with a `ksize × ksize` kernel.
pub fn gaussian_blur(img: &GrayImage, ksize: usize) -> GrayImage {
    let ksize = ksize | 1;
    if ksize == 1 || img.width() == 0 || img.height() == 0 {
        return img.clone();
    }
    let kernel = gaussian_kernel(ksize);
    let half = (ksize / 2) as i64;
    let (w, h) = (img.width() as usize, img.height() as usize);
    let src = img.as_raw();

    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            horizontal[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, tap)| {
                    let sx = reflect_101(x as i64 + k as i64 - half, w as i64);
                    tap * f32::from(row[sx])
                })
                .sum();
        }
    }

    let mut out = GrayImage::new(img.width(), img.height());
    for y in 0..h {
        for x in 0..w {
            let v: f32 = kernel
                .iter()
                .enumerate()
                .map(|(k, tap)| {
                    let sy = reflect_101(y as i64 + k as i64 - half, h as i64);
                    tap * horizontal[sy * w + x]
                })
                .sum();
            out.put_pixel(x as u32, y as u32, Luma([v.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

// ────────────────────────────────────────────────────────────────────────────
// CLAHE
// ────────────────────────────────────────────────────────────────────────────

/// Contrast-limited adaptive histogram equalisation over a
/// `grid.0 × grid.1` tile grid, bilinearly blending neighbouring tile LUTs.
pub fn clahe(img: &GrayImage, clip_limit: f64, grid: (u32, u32)) -> GrayImage {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 {
        return img.clone();
    }
    let tile_w = w.div_ceil(grid.0.max(1) as usize);
    let tile_h = h.div_ceil(grid.1.max(1) as usize);
    let cols = w.div_ceil(tile_w);
    let rows = h.div_ceil(tile_h);

    let mut luts = vec![[0u8; 256]; cols * rows];
    for ty in 0..rows {
        for tx in 0..cols {
            let (x0, y0) = (tx * tile_w, ty * tile_h);
            let (x1, y1) = ((x0 + tile_w).min(w), (y0 + tile_h).min(h));
            let area = (x1 - x0) * (y1 - y0);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[img.get_pixel(x as u32, y as u32)[0] as usize] += 1;
                }
            }
            if clip_limit > 0.0 {
                let limit = ((clip_limit * area as f64 / 256.0) as u32).max(1);
                clip_histogram(&mut hist, limit);
            }
            luts[ty * cols + tx] = equalising_lut(&hist, area);
        }
    }

    let centre_x = |tx: usize| (tx as f32 + 0.5) * tile_w as f32;
    let centre_y = |ty: usize| (ty as f32 + 0.5) * tile_h as f32;

    let mut out = GrayImage::new(img.width(), img.height());
    for y in 0..h {
        let fy = y as f32 / tile_h as f32 - 0.5;
        let ty0 = (fy.floor().max(0.0) as usize).min(rows - 1);
        let ty1 = (ty0 + 1).min(rows - 1);
        let ay = if ty0 == ty1 {
            0.0
        } else {
            ((y as f32 - centre_y(ty0)) / (centre_y(ty1) - centre_y(ty0))).clamp(0.0, 1.0)
        };

        for x in 0..w {
            let fx = x as f32 / tile_w as f32 - 0.5;
            let tx0 = (fx.floor().max(0.0) as usize).min(cols - 1);
            let tx1 = (tx0 + 1).min(cols - 1);
            let ax = if tx0 == tx1 {
                0.0
            } else {
                ((x as f32 - centre_x(tx0)) / (centre_x(tx1) - centre_x(tx0))).clamp(0.0, 1.0)
            };

            let v = img.get_pixel(x as u32, y as u32)[0] as usize;
            let v00 = f32::from(luts[ty0 * cols + tx0][v]);
            let v10 = f32::from(luts[ty0 * cols + tx1][v]);
            let v01 = f32::from(luts[ty1 * cols + tx0][v]);
            let v11 = f32::from(luts[ty1 * cols + tx1][v]);
            let blended = v00 * (1.0 - ax) * (1.0 - ay)
                + v10 * ax * (1.0 - ay)
                + v01 * (1.0 - ax) * ay
                + v11 * ax * ay;
            out.put_pixel(
                x as u32,
                y as u32,
                Luma([blended.round().clamp(0.0, 255.0) as u8]),
            );
        }
    }
    out
}

/// Clip every bin at `limit` and spread the excess evenly.
fn clip_histogram(hist: &mut [u32; 256], limit: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let per_bin = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in hist.iter_mut().enumerate() {
        *bin += per_bin + u32::from(i < remainder);
    }
}

fn equalising_lut(hist: &[u32; 256], area: usize) -> [u8; 256] {
    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        cdf += count;
        *entry = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

// ────────────────────────────────────────────────────────────────────────────
// Palette
// ────────────────────────────────────────────────────────────────────────────

/// Jet gradient (blue → cyan → green → yellow → red) with `gain` folded in.
pub fn jet_palette(gain: f64) -> [[u8; 3]; 256] {
    let channel = |v: f64, centre: f64| {
        let level = (1.5 - (4.0 * v - centre).abs()).clamp(0.0, 1.0);
        (level * 255.0 * gain).round().clamp(0.0, 255.0) as u8
    };
    let mut palette = [[0u8; 3]; 256];
    for (i, entry) in palette.iter_mut().enumerate() {
        let v = i as f64 / 255.0;
        *entry = [channel(v, 3.0), channel(v, 2.0), channel(v, 1.0)];
    }
    palette
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sentinel_types::CameraSource;

    fn gradient_frame() -> Frame {
        let img = RgbImage::from_fn(97, 61, |x, y| {
            Rgb([(x * 2) as u8, (y * 4) as u8, ((x + y) % 256) as u8])
        });
        Frame::new(img, CameraSource::FrontRightFisheye, Utc::now())
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = ThermalRenderer::default();
        let frame = gradient_frame();
        let a = renderer.render(&frame);
        let b = renderer.render(&frame);
        assert_eq!(a.pixels().as_raw(), b.pixels().as_raw());
        assert_eq!((a.width(), a.height()), (97, 61));
        assert_eq!(a.source(), CameraSource::FrontRightFisheye);
    }

    #[test]
    fn uniform_frame_renders_uniformly() {
        let frame = Frame::new(
            RgbImage::from_pixel(64, 48, Rgb([90, 90, 90])),
            CameraSource::LeftFisheye,
            Utc::now(),
        );
        let out = ThermalRenderer::default().render(&frame);
        let first = *out.pixels().get_pixel(0, 0);
        assert!(out.pixels().pixels().all(|p| *p == first));
    }

    #[test]
    fn palette_runs_from_blue_to_red_with_gain() {
        let p = jet_palette(1.2);
        assert_eq!(p[0], [0, 0, 153]);
        assert_eq!(p[255], [153, 0, 0]);
        // Mid-range is dominated by green, saturated by the gain.
        assert_eq!(p[128][1], 255);
    }

    #[test]
    fn grayscale_uses_luma_weights() {
        let img = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([255, 255, 255]),
        });
        let gray = grayscale(&img);
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn blur_preserves_flat_regions_and_softens_edges() {
        let img = GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 0 } else { 200 }]));
        let out = gaussian_blur(&img, 9);
        assert_eq!(out.get_pixel(0, 5)[0], 0);
        assert_eq!(out.get_pixel(19, 5)[0], 200);
        let edge = out.get_pixel(10, 5)[0];
        assert!(edge > 0 && edge < 200);
    }

    #[test]
    fn gaussian_taps_sum_to_one() {
        let k = gaussian_kernel(9);
        assert_eq!(k.len(), 9);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(k[4] > k[0]);
    }

    #[test]
    fn clahe_stretches_low_contrast_input() {
        let img = GrayImage::from_fn(64, 64, |x, y| Luma([100 + ((x + y) % 8) as u8]));
        let out = clahe(&img, 3.0, (8, 8));
        let (lo, hi) = out
            .pixels()
            .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
        assert!(hi - lo > 7);
    }
}
