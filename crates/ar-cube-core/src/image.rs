use serde::{Deserialize, Serialize};

/// Pixel dimensions of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

impl ImageSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Centre of the pixel grid, `((W - 1) / 2, (H - 1) / 2)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.width as f64 - 1.0) * 0.5,
            (self.height as f64 - 1.0) * 0.5,
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl<'a> GrayImageView<'a> {
    /// Wrap a row-major buffer. Returns `None` if the length does not match.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Option<Self> {
        (width.checked_mul(height)? == data.len()).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Pixel lookup with coordinates clamped to the image border.
    #[inline]
    pub fn get_clamped(&self, x: i64, y: i64) -> u8 {
        let xc = x.clamp(0, self.width as i64 - 1) as usize;
        let yc = y.clamp(0, self.height as i64 - 1) as usize;
        self.data[yc * self.width + xc]
    }
}

impl GrayImage {
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rejects_wrong_length() {
        let buf = [0u8; 11];
        assert!(GrayImageView::new(4, 3, &buf).is_none());
        let buf = [0u8; 12];
        assert!(GrayImageView::new(4, 3, &buf).is_some());
    }

    #[test]
    fn clamped_lookup_replicates_border() {
        let img = GrayImage {
            width: 3,
            height: 2,
            data: vec![1, 2, 3, 4, 5, 6],
        };
        let v = img.view();
        assert_eq!(v.get_clamped(-5, 0), 1);
        assert_eq!(v.get_clamped(10, 0), 3);
        assert_eq!(v.get_clamped(1, 7), 5);
        assert_eq!(v.get_clamped(-1, -1), 1);
    }

    #[test]
    fn size_center_is_pixel_grid_center() {
        let size = GrayImage::filled(400, 300, 0).view().size();
        assert_eq!(size, ImageSize::new(400, 300));
        assert_eq!(size.center(), (199.5, 149.5));
        assert!(ImageSize::new(0, 3).is_empty());
    }
}
