//! Colour-space conversion and hue-band masking.
//!
//! HSV values use the 8-bit convention common to vision libraries:
//! hue in `[0, 180)` (degrees halved), saturation and value in `[0, 255]`.

use image::RgbImage;

use crate::morphology::Mask;

/// An 8-bit HSV triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

/// Convert one RGB pixel to 8-bit HSV.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = max - min;

    let s = if max > 0.0 { diff * 255.0 / max } else { 0.0 };

    let mut h = if diff == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / diff
    } else if max == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    Hsv {
        h: ((h / 2.0).round() as u16 % 180) as u8,
        s: s.round().clamp(0.0, 255.0) as u8,
        v: max as u8,
    }
}

/// Inclusive HSV range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl HsvRange {
    pub fn contains(&self, px: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&px.h)
            && (self.lower.s..=self.upper.s).contains(&px.s)
            && (self.lower.v..=self.upper.v).contains(&px.v)
    }
}

/// Minimum saturation and value for a pixel to count as a light source
/// (about 39 % of full scale).
pub const MIN_SATURATION: u8 = 100;
pub const MIN_VALUE: u8 = 100;

/// The two hue bands that together make up "red": one just above 0°, one
/// just below 360°.
pub const RED_BANDS: [HsvRange; 2] = [
    HsvRange {
        lower: Hsv {
            h: 0,
            s: MIN_SATURATION,
            v: MIN_VALUE,
        },
        upper: Hsv {
            h: 10,
            s: 255,
            v: 255,
        },
    },
    HsvRange {
        lower: Hsv {
            h: 160,
            s: MIN_SATURATION,
            v: MIN_VALUE,
        },
        upper: Hsv {
            h: 180,
            s: 255,
            v: 255,
        },
    },
];

/// Mask of every pixel falling into any of `bands`.
pub fn band_mask(img: &RgbImage, bands: &[HsvRange]) -> Mask {
    let mut mask = Mask::new(img.width() as usize, img.height() as usize);
    for (x, y, px) in img.enumerate_pixels() {
        let hsv = rgb_to_hsv(px[0], px[1], px[2]);
        if bands.iter().any(|band| band.contains(hsv)) {
            mask.set(x as usize, y as usize, true);
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn primary_colours_map_to_expected_hues() {
        assert_eq!(rgb_to_hsv(255, 0, 0), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(0, 255, 0).h, 60);
        assert_eq!(rgb_to_hsv(0, 0, 255).h, 120);
    }

    #[test]
    fn grey_has_zero_saturation() {
        let hsv = rgb_to_hsv(128, 128, 128);
        assert_eq!(hsv.s, 0);
        assert_eq!(hsv.v, 128);
    }

    #[test]
    fn magenta_red_falls_into_upper_band() {
        // Hue ≈ 340° → 170 in 8-bit units.
        let hsv = rgb_to_hsv(255, 0, 85);
        assert!(hsv.h >= 160, "hue {} should wrap near 180", hsv.h);
        assert!(RED_BANDS[1].contains(hsv));
    }

    #[test]
    fn dim_or_washed_out_red_is_rejected() {
        // Too dark.
        assert!(!RED_BANDS.iter().any(|b| b.contains(rgb_to_hsv(80, 0, 0))));
        // Too pale.
        assert!(!RED_BANDS.iter().any(|b| b.contains(rgb_to_hsv(255, 200, 200))));
    }

    #[test]
    fn band_mask_selects_red_only() {
        let mut img = RgbImage::new(3, 1);
        img.put_pixel(0, 0, Rgb([250, 10, 10]));
        img.put_pixel(1, 0, Rgb([10, 250, 10]));
        img.put_pixel(2, 0, Rgb([10, 10, 250]));
        let mask = band_mask(&img, &RED_BANDS);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(!mask.get(2, 0));
    }
}
