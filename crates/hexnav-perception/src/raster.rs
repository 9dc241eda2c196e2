//! Raster primitives for the detection band.
//!
//! Two owned buffer types, both row-major with `stride == width`:
//!
//! | Type      | Pixel | Role                                             |
//! |-----------|-------|--------------------------------------------------|
//! | [`Plane`] | `u8`  | single-channel intensity (gray, saturation, …)   |
//! | [`Mask`]  | bool  | binary hazard map produced by a signal extractor |
//!
//! Neighbourhood operations clamp coordinates at the border (replicate
//! padding), so a uniform input always yields a uniform output.

use hexnav_types::Frame;

// ────────────────────────────────────────────────────────────────────────────
// Plane
// ────────────────────────────────────────────────────────────────────────────

/// Owned single-channel 8-bit image.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
    w: usize,
    h: usize,
    data: Vec<u8>,
}

impl Plane {
    /// Zero-filled plane of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0; w * h],
        }
    }

    /// Build a plane by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        Self { w, h, data }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.w + x]
    }

    /// Value at `(x, y)` with coordinates clamped into the plane.
    #[inline]
    fn clamped(&self, x: isize, y: isize) -> u8 {
        let cx = x.clamp(0, self.w as isize - 1) as usize;
        let cy = y.clamp(0, self.h as isize - 1) as usize;
        self.data[cy * self.w + cx]
    }

    /// Apply a 3×3 integer kernel and return the raw signed responses.
    pub fn convolve3(&self, kernel: &Kernel3) -> Vec<i32> {
        let mut out = vec![0i32; self.w * self.h];
        if self.w == 0 || self.h == 0 {
            return out;
        }
        for y in 0..self.h {
            for x in 0..self.w {
                let mut sum = 0i32;
                for (ky, row) in kernel.iter().enumerate() {
                    for (kx, k) in row.iter().enumerate() {
                        if *k == 0 {
                            continue;
                        }
                        let v = self.clamped(x as isize + kx as isize - 1, y as isize + ky as isize - 1);
                        sum += *k * v as i32;
                    }
                }
                out[y * self.w + x] = sum;
            }
        }
        out
    }

    /// Separable Gaussian blur with an odd `ksize`; `ksize <= 1` is a copy.
    ///
    /// Sigma follows the usual derivation from the aperture:
    /// `σ = 0.3 · ((ksize − 1) / 2 − 1) + 0.8`.
    pub fn gaussian_blur(&self, ksize: usize) -> Plane {
        if ksize <= 1 || self.w == 0 || self.h == 0 {
            return self.clone();
        }
        let weights = gaussian_weights(ksize);
        let r = (ksize / 2) as isize;

        let mut horizontal = vec![0f32; self.w * self.h];
        for y in 0..self.h {
            for x in 0..self.w {
                let mut acc = 0f32;
                for (i, w) in weights.iter().enumerate() {
                    acc += w * self.clamped(x as isize + i as isize - r, y as isize) as f32;
                }
                horizontal[y * self.w + x] = acc;
            }
        }

        let mut out = Plane::new(self.w, self.h);
        let h_max = self.h as isize - 1;
        for y in 0..self.h {
            for x in 0..self.w {
                let mut acc = 0f32;
                for (i, w) in weights.iter().enumerate() {
                    let yy = (y as isize + i as isize - r).clamp(0, h_max) as usize;
                    acc += w * horizontal[yy * self.w + x];
                }
                out.data[y * self.w + x] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
        out
    }

    /// Flag every pixel strictly above `threshold`.
    pub fn threshold(&self, threshold: u32) -> Mask {
        Mask {
            w: self.w,
            h: self.h,
            data: self.data.iter().map(|&v| v as u32 > threshold).collect(),
        }
    }
}

/// A 3×3 integer convolution kernel, indexed `[row][col]`.
pub type Kernel3 = [[i32; 3]; 3];

/// Second-derivative operator (4-neighbour Laplacian).
pub const LAPLACIAN: Kernel3 = [[0, 1, 0], [1, -4, 1], [0, 1, 0]];
/// Horizontal Sobel derivative.
pub const SOBEL_X: Kernel3 = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
/// Vertical Sobel derivative.
pub const SOBEL_Y: Kernel3 = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

fn gaussian_weights(ksize: usize) -> Vec<f32> {
    let sigma = 0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let r = (ksize / 2) as f32;
    let mut weights: Vec<f32> = (0..ksize)
        .map(|i| {
            let d = i as f32 - r;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

// ────────────────────────────────────────────────────────────────────────────
// Band extraction
// ────────────────────────────────────────────────────────────────────────────

/// Luma (BT.601) of frame rows `y_start..y_end`.
pub fn gray_band(frame: &Frame, y_start: u32, y_end: u32) -> Plane {
    let w = frame.width() as usize;
    let h = y_end.saturating_sub(y_start) as usize;
    Plane::from_fn(w, h, |x, y| {
        let [r, g, b] = frame.pixel(x as u32, y_start + y as u32);
        (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32)
            .round()
            .clamp(0.0, 255.0) as u8
    })
}

/// HSV saturation (0–255 scale) of frame rows `y_start..y_end`.
pub fn saturation_band(frame: &Frame, y_start: u32, y_end: u32) -> Plane {
    let w = frame.width() as usize;
    let h = y_end.saturating_sub(y_start) as usize;
    Plane::from_fn(w, h, |x, y| {
        let [r, g, b] = frame.pixel(x as u32, y_start + y as u32);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        if max == 0 {
            0
        } else {
            ((max - min) as f32 * 255.0 / max as f32).round() as u8
        }
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Mask
// ────────────────────────────────────────────────────────────────────────────

/// Owned binary image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    w: usize,
    h: usize,
    data: Vec<bool>,
}

impl Mask {
    /// All-clear mask of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![false; w * h],
        }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    /// Total number of pixels.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: bool) {
        self.data[y * self.w + x] = v;
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Clear every pixel.
    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|v| *v = false);
    }

    /// Pixel-wise OR with a mask of the same size.
    pub fn union_with(&mut self, other: &Mask) {
        debug_assert_eq!((self.w, self.h), (other.w, other.h));
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a |= *b;
        }
    }

    /// Square-kernel dilation (`ksize` odd).
    pub fn dilate(&self, ksize: usize) -> Mask {
        self.morph(ksize, true)
    }

    /// Square-kernel erosion (`ksize` odd).
    pub fn erode(&self, ksize: usize) -> Mask {
        self.morph(ksize, false)
    }

    /// Dilate then erode: bridges small gaps between fragments.
    pub fn close(&self, ksize: usize) -> Mask {
        self.dilate(ksize).erode(ksize)
    }

    /// Erode then dilate: removes specks smaller than the kernel.
    pub fn open(&self, ksize: usize) -> Mask {
        self.erode(ksize).dilate(ksize)
    }

    /// Separable square structuring element: a horizontal pass then a
    /// vertical pass, each taking the max (dilate) or min (erode).
    fn morph(&self, ksize: usize, dilate: bool) -> Mask {
        if ksize <= 1 || self.w == 0 || self.h == 0 {
            return self.clone();
        }
        let r = (ksize / 2) as isize;
        let (w, h) = (self.w as isize, self.h as isize);

        let mut pass = vec![false; self.data.len()];
        for y in 0..h {
            for x in 0..w {
                let mut acc = !dilate;
                for dx in -r..=r {
                    let v = self.data[(y * w + (x + dx).clamp(0, w - 1)) as usize];
                    if dilate { acc |= v } else { acc &= v }
                }
                pass[(y * w + x) as usize] = acc;
            }
        }

        let mut out = Mask::new(self.w, self.h);
        for y in 0..h {
            for x in 0..w {
                let mut acc = !dilate;
                for dy in -r..=r {
                    let v = pass[((y + dy).clamp(0, h - 1) * w + x) as usize];
                    if dilate { acc |= v } else { acc &= v }
                }
                out.data[(y * w + x) as usize] = acc;
            }
        }
        out
    }

    /// Set every clear pixel that cannot reach the mask border through
    /// clear pixels (4-connectivity), i.e. fill enclosed holes.
    pub fn fill_holes(&self) -> Mask {
        let (w, h) = (self.w, self.h);
        let mut outside = vec![false; w * h];
        let mut stack: Vec<usize> = Vec::new();

        let seed = |x: usize, y: usize, outside: &mut Vec<bool>, stack: &mut Vec<usize>| {
            let i = y * w + x;
            if !self.data[i] && !outside[i] {
                outside[i] = true;
                stack.push(i);
            }
        };
        for x in 0..w {
            seed(x, 0, &mut outside, &mut stack);
            if h > 1 {
                seed(x, h - 1, &mut outside, &mut stack);
            }
        }
        for y in 0..h {
            seed(0, y, &mut outside, &mut stack);
            if w > 1 {
                seed(w - 1, y, &mut outside, &mut stack);
            }
        }

        while let Some(i) = stack.pop() {
            let (x, y) = (i % w, i / w);
            let neighbours = [
                (x > 0).then(|| i - 1),
                (x + 1 < w).then(|| i + 1),
                (y > 0).then(|| i - w),
                (y + 1 < h).then(|| i + w),
            ];
            for n in neighbours.into_iter().flatten() {
                if !self.data[n] && !outside[n] {
                    outside[n] = true;
                    stack.push(n);
                }
            }
        }

        Mask {
            w,
            h,
            data: outside.into_iter().map(|o| !o).collect(),
        }
    }
}
