//! Binary masks and 3×3 morphological erosion / dilation.
//!
//! Out-of-bounds neighbours never influence the result: erosion treats them
//! as set and dilation treats them as clear, so objects touching the border
//! are not eaten away by the frame edge.

/// A row-major binary image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl Mask {
    /// All-clear mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x]
    }

    /// Bounds-checked read; `false` outside the mask.
    pub fn get_signed(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.get(x as usize, y as usize)
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        self.data[y * self.width + x] = value;
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    /// Apply `iterations` passes of 3×3 erosion.
    pub fn eroded(&self, iterations: usize) -> Mask {
        (0..iterations).fold(self.clone(), |m, _| m.neighbourhood_pass(true))
    }

    /// Apply `iterations` passes of 3×3 dilation.
    pub fn dilated(&self, iterations: usize) -> Mask {
        (0..iterations).fold(self.clone(), |m, _| m.neighbourhood_pass(false))
    }

    /// One 3×3 pass.  `all == true` keeps a pixel only if every in-bounds
    /// neighbour is set (erosion); otherwise sets it if any is (dilation).
    fn neighbourhood_pass(&self, all: bool) -> Mask {
        let mut out = Mask::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let mut hit = all;
                'window: for ny in y.saturating_sub(1)..=(y + 1).min(self.height - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(self.width - 1) {
                        let v = self.get(nx, ny);
                        if all && !v {
                            hit = false;
                            break 'window;
                        }
                        if !all && v {
                            hit = true;
                            break 'window;
                        }
                    }
                }
                out.set(x, y, hit);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: usize, x0: usize, y0: usize, side: usize) -> Mask {
        let mut m = Mask::new(size, size);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                m.set(x, y, true);
            }
        }
        m
    }

    #[test]
    fn erosion_removes_isolated_speckle() {
        let mut m = Mask::new(9, 9);
        m.set(4, 4, true);
        assert_eq!(m.eroded(1).count(), 0);
    }

    #[test]
    fn erosion_shrinks_square_by_one_per_pass() {
        let m = square(20, 5, 5, 7);
        assert_eq!(m.eroded(1).count(), 25);
        assert_eq!(m.eroded(2).count(), 9);
    }

    #[test]
    fn dilation_grows_square_by_one_per_pass() {
        let m = square(20, 8, 8, 3);
        assert_eq!(m.dilated(1).count(), 25);
        assert_eq!(m.dilated(2).count(), 49);
    }

    #[test]
    fn opening_restores_large_square() {
        let m = square(30, 10, 10, 9);
        let opened = m.eroded(2).dilated(2);
        assert_eq!(opened, m);
    }

    #[test]
    fn border_does_not_erode_objects() {
        let m = square(10, 0, 0, 4);
        // Corner pixel keeps all its in-bounds neighbours set.
        assert!(m.eroded(1).get(0, 0));
    }

    #[test]
    fn empty_mask_is_stable() {
        let m = Mask::new(0, 0);
        assert_eq!(m.eroded(2).count(), 0);
        assert_eq!(m.dilated(2).count(), 0);
    }
}
