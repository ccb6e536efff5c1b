//! Image ingress and binarization
//!
//! [`ImageView`] is a borrowed view of the caller's pixel buffer in one
//! of the supported memory layouts. The first decode step converts it to
//! a luminance plane and thresholds that into a [`BitMatrix`] using the
//! configured [`Binarizer`](crate::options::Binarizer).

use crate::bits::BitMatrix;
use crate::error::{Error, Result};
use crate::options::Binarizer;

/// Pixel memory layout of an [`ImageView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// 8-bit luminance.
    Lum,
    /// Luminance + alpha, alpha ignored.
    LumA,
    RGB,
    BGR,
    RGBA,
    ARGB,
    BGRA,
    ABGR,
}

impl ImageFormat {
    fn pixel_width(self) -> usize {
        match self {
            Self::Lum => 1,
            Self::LumA => 2,
            Self::RGB | Self::BGR => 3,
            Self::RGBA | Self::ARGB | Self::BGRA | Self::ABGR => 4,
        }
    }

    /// Byte offsets of (r, g, b) within one pixel; `None` for luminance.
    fn rgb_offsets(self) -> Option<(usize, usize, usize)> {
        match self {
            Self::Lum | Self::LumA => None,
            Self::RGB | Self::RGBA => Some((0, 1, 2)),
            Self::BGR | Self::BGRA => Some((2, 1, 0)),
            Self::ARGB => Some((1, 2, 3)),
            Self::ABGR => Some((3, 2, 1)),
        }
    }
}

/// A non-owning description of the caller's pixel buffer.
#[derive(Clone, Copy)]
pub struct ImageView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    format: ImageFormat,
    row_stride: usize,
    pix_stride: usize,
}

impl<'a> ImageView<'a> {
    /// A tightly packed buffer in the given format.
    pub fn new(data: &'a [u8], width: usize, height: usize, format: ImageFormat) -> Result<Self> {
        Self::with_strides(data, width, height, format, width * format.pixel_width(), 0)
    }

    /// A buffer with explicit row stride and pixel stride in bytes
    /// (pixel stride 0 means tightly packed).
    pub fn with_strides(
        data: &'a [u8],
        width: usize,
        height: usize,
        format: ImageFormat,
        row_stride: usize,
        pix_stride: usize,
    ) -> Result<Self> {
        let pix_stride = if pix_stride == 0 {
            format.pixel_width()
        } else {
            pix_stride
        };
        if width == 0 || height == 0 {
            return Err(Error::InvalidImageData);
        }
        let needed = (height - 1) * row_stride + (width - 1) * pix_stride + format.pixel_width();
        if data.len() < needed {
            return Err(Error::InvalidImageData);
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            row_stride,
            pix_stride,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Luminance of one pixel (ITU-R BT.601 weights for color formats).
    #[inline]
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        let p = y * self.row_stride + x * self.pix_stride;
        match self.format.rgb_offsets() {
            None => self.data[p],
            Some((r, g, b)) => {
                let r = u32::from(self.data[p + r]);
                let g = u32::from(self.data[p + g]);
                let b = u32::from(self.data[p + b]);
                ((r * 299 + g * 587 + b * 114) / 1000) as u8
            }
        }
    }

    /// The full luminance plane, row-major.
    pub fn to_luma_plane(&self) -> Vec<u8> {
        let mut plane = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                plane.push(self.luma(x, y));
            }
        }
        plane
    }
}

/// Threshold a luminance plane into a bit matrix (true = dark).
pub fn binarize(luma: &[u8], width: usize, height: usize, method: Binarizer) -> BitMatrix {
    match method {
        Binarizer::FixedThreshold => threshold_fixed(luma, width, height, 127),
        Binarizer::PassThrough => threshold_fixed(luma, width, height, 127),
        Binarizer::GlobalHistogram => {
            let t = histogram_threshold(luma);
            threshold_fixed(luma, width, height, t)
        }
        Binarizer::LocalAverage => local_average(luma, width, height),
    }
}

fn threshold_fixed(luma: &[u8], width: usize, height: usize, threshold: u8) -> BitMatrix {
    BitMatrix::from_fn(width, height, |x, y| luma[y * width + x] <= threshold)
}

/// Split point between the two dominant luminance populations: midway
/// between the darkest and brightest bucket peaks, biased toward the
/// larger valley.
fn histogram_threshold(luma: &[u8]) -> u8 {
    let mut buckets = [0u32; 32];
    for &v in luma {
        buckets[(v >> 3) as usize] += 1;
    }
    let first = buckets.iter().position(|&c| c > 0).unwrap_or(0);
    let last = buckets.iter().rposition(|&c| c > 0).unwrap_or(31);
    if last <= first {
        return 127;
    }
    // Best valley: maximise distance-from-peaks weighted by emptiness.
    let mut best_score = 0u64;
    let mut valley = (first + last) / 2;
    for i in first + 1..last {
        let from_ends = ((i - first) * (last - i)) as u64;
        let emptiness = u64::from(u32::MAX - buckets[i].min(u32::MAX - 1));
        let score = from_ends * (emptiness >> 16);
        if score > best_score {
            best_score = score;
            valley = i;
        }
    }
    ((valley << 3) + 4) as u8
}

/// Adaptive threshold against the mean of a sliding window, the shape
/// that survives uneven illumination. Window is 1/8 of the smaller image
/// dimension, at least 3 pixels.
fn local_average(luma: &[u8], width: usize, height: usize) -> BitMatrix {
    // Integral image so each window mean is O(1).
    let mut integral = vec![0u64; (width + 1) * (height + 1)];
    for y in 0..height {
        let mut row_sum = 0u64;
        for x in 0..width {
            row_sum += u64::from(luma[y * width + x]);
            integral[(y + 1) * (width + 1) + x + 1] = integral[y * (width + 1) + x + 1] + row_sum;
        }
    }
    let radius = (width.min(height) / 16).max(2);
    BitMatrix::from_fn(width, height, |x, y| {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius + 1).min(width);
        let y1 = (y + radius + 1).min(height);
        let sum = integral[y1 * (width + 1) + x1] + integral[y0 * (width + 1) + x0]
            - integral[y0 * (width + 1) + x1]
            - integral[y1 * (width + 1) + x0];
        let count = ((x1 - x0) * (y1 - y0)) as u64;
        let mean = sum / count;
        // A small bias keeps flat white areas from speckling.
        u64::from(luma[y * width + x]) * 100 < mean * 97
    })
}

/// Average-pool the luminance plane by 2 in each direction, for the
/// `try_downscale` pyramid.
pub fn downscale_by_2(luma: &[u8], width: usize, height: usize) -> (Vec<u8>, usize, usize) {
    let (w2, h2) = (width / 2, height / 2);
    let mut out = Vec::with_capacity(w2 * h2);
    for y in 0..h2 {
        for x in 0..w2 {
            let a = u32::from(luma[(2 * y) * width + 2 * x]);
            let b = u32::from(luma[(2 * y) * width + 2 * x + 1]);
            let c = u32::from(luma[(2 * y + 1) * width + 2 * x]);
            let d = u32::from(luma[(2 * y + 1) * width + 2 * x + 1]);
            out.push(((a + b + c + d) / 4) as u8);
        }
    }
    (out, w2, h2)
}

/// 3x3 majority filter over the bit matrix, closing pinholes in dotted
/// prints (`try_denoise`).
pub fn denoise(matrix: &BitMatrix) -> BitMatrix {
    let (w, h) = (matrix.width(), matrix.height());
    BitMatrix::from_fn(w, h, |x, y| {
        let mut dark = 0;
        let mut total = 0;
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                let (nx, ny) = (x as i32 + dx, y as i32 + dy);
                if nx >= 0 && ny >= 0 && (nx as usize) < w && (ny as usize) < h {
                    total += 1;
                    dark += i32::from(matrix.get(nx as usize, ny as usize));
                }
            }
        }
        dark * 2 > total
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_view_validation() {
        let buf = [0u8; 12];
        assert!(ImageView::new(&buf, 4, 3, ImageFormat::Lum).is_ok());
        assert!(ImageView::new(&buf, 4, 4, ImageFormat::Lum).is_err());
        assert!(ImageView::new(&buf, 2, 2, ImageFormat::RGB).is_ok());
    }

    #[test]
    fn test_luma_conversion() {
        let buf = [255, 0, 0, 0, 255, 0, 0, 0, 255];
        let view = ImageView::new(&buf, 3, 1, ImageFormat::RGB).unwrap();
        assert_eq!(view.luma(0, 0), 76); // red
        assert_eq!(view.luma(1, 0), 149); // green
        assert_eq!(view.luma(2, 0), 29); // blue
        let bgr = ImageView::new(&buf, 3, 1, ImageFormat::BGR).unwrap();
        assert_eq!(bgr.luma(0, 0), 29);
    }

    #[test]
    fn test_fixed_binarize() {
        let luma = [0u8, 200, 90, 255];
        let m = binarize(&luma, 4, 1, Binarizer::FixedThreshold);
        assert!(m.get(0, 0));
        assert!(!m.get(1, 0));
        assert!(m.get(2, 0));
        assert!(!m.get(3, 0));
    }

    #[test]
    fn test_local_average_handles_gradient() {
        // Dark bar on a brightness gradient: global threshold would lose
        // one end, local average must keep both.
        let (w, h) = (64, 16);
        let mut luma = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let base = 100 + x as i32;
                let v = if (8..12).contains(&(y % 16)) && x % 8 < 3 {
                    base - 80
                } else {
                    base + 60
                };
                luma[y * w + x] = v.clamp(0, 255) as u8;
            }
        }
        let m = binarize(&luma, w, h, Binarizer::LocalAverage);
        assert!(m.get(1, 9));
        assert!(m.get(57, 9));
        assert!(!m.get(5, 2));
    }

    #[test]
    fn test_downscale() {
        let luma = [10u8, 30, 50, 70, 20, 40, 60, 80];
        let (out, w, h) = downscale_by_2(&luma, 4, 2);
        assert_eq!((w, h), (2, 1));
        assert_eq!(out, vec![25, 65]);
    }
}
