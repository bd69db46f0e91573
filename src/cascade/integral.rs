//! Summed-area tables for O(1) rectangle sums.

use image::GrayImage;

/// Sum and squared-sum integral images of a grayscale bitmap.
///
/// Both tables are `(width + 1) × (height + 1)` with a zero first row and
/// column, so `table[y][x]` is the sum over `[0, x) × [0, y)`.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
}

impl IntegralImage {
    pub fn new(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let stride = width as usize + 1;
        let mut sum = vec![0u64; stride * (height as usize + 1)];
        let mut sq_sum = vec![0u64; stride * (height as usize + 1)];

        for (y, row) in gray.as_raw().chunks_exact(width.max(1) as usize).enumerate() {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            let above = y * stride;
            let here = (y + 1) * stride;
            for (x, &v) in row.iter().enumerate() {
                let v = v as u64;
                row_sum += v;
                row_sq += v * v;
                sum[here + x + 1] = sum[above + x + 1] + row_sum;
                sq_sum[here + x + 1] = sq_sum[above + x + 1] + row_sq;
            }
        }

        Self {
            width,
            sum,
            sq_sum,
        }
    }

    /// Sum of pixels in `[x, x+w) × [y, y+h)`. The rectangle must fit.
    #[inline]
    pub fn rect_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::lookup(&self.sum, self.width, x, y, w, h)
    }

    /// Sum of squared pixels in `[x, x+w) × [y, y+h)`. The rectangle must fit.
    #[inline]
    pub fn rect_sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::lookup(&self.sq_sum, self.width, x, y, w, h)
    }

    #[inline]
    fn lookup(table: &[u64], width: u32, x: u32, y: u32, w: u32, h: u32) -> u64 {
        let stride = width as usize + 1;
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let a = table[y0 * stride + x0];
        let b = table[y0 * stride + x1];
        let c = table[y1 * stride + x0];
        let d = table[y1 * stride + x1];
        (d + a) - (b + c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn ramp(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([(x + 10 * y) as u8]))
    }

    fn brute_sum(img: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> (u64, u64) {
        let mut s = 0u64;
        let mut sq = 0u64;
        for yy in y..y + h {
            for xx in x..x + w {
                let v = img.get_pixel(xx, yy)[0] as u64;
                s += v;
                sq += v * v;
            }
        }
        (s, sq)
    }

    #[test]
    fn rect_sums_match_brute_force() {
        let img = ramp(7, 5);
        let ii = IntegralImage::new(&img);
        for &(x, y, w, h) in &[(0, 0, 7, 5), (1, 1, 3, 2), (6, 4, 1, 1), (2, 0, 5, 5), (3, 3, 0, 2)] {
            let (s, sq) = brute_sum(&img, x, y, w, h);
            assert_eq!(ii.rect_sum(x, y, w, h), s, "sum at {x},{y},{w},{h}");
            assert_eq!(ii.rect_sq_sum(x, y, w, h), sq, "sq at {x},{y},{w},{h}");
        }
    }

    #[test]
    fn empty_image_has_trivial_tables() {
        let ii = IntegralImage::new(&GrayImage::new(0, 0));
        assert_eq!(ii.sum, vec![0]);
        assert_eq!(ii.sq_sum, vec![0]);
        assert_eq!(ii.rect_sum(0, 0, 0, 0), 0);
    }

    #[test]
    fn saturated_page_does_not_overflow() {
        let img = GrayImage::from_pixel(500, 400, Luma([255]));
        let ii = IntegralImage::new(&img);
        assert_eq!(ii.rect_sum(0, 0, 500, 400), 255 * 500 * 400);
        assert_eq!(ii.rect_sq_sum(0, 0, 500, 400), 255 * 255 * 500 * 400);
    }
}
