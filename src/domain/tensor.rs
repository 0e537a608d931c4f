//! Normalized image tensor handed to the disease model.
//!
//! Layout is NHWC with a leading batch dimension of 1, pixel intensities
//! scaled into `[0, 1]`, channels in RGB order. This layout is part of the
//! model contract: the weights were exported against exactly this
//! preprocessing, and any deviation degrades accuracy without raising an
//! error.

use image::RgbImage;

/// Divisor used to scale 8-bit pixel intensities into `[0, 1]`.
pub const INTENSITY_DIVISOR: f32 = 255.0;

/// A fixed-size normalized image tensor (batch size 1, NHWC, RGB).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    height: u32,
    width: u32,
}

impl ImageTensor {
    /// Number of color channels (RGB).
    pub const CHANNELS: u32 = 3;

    /// Build a tensor from a decoded RGB image, scaling intensities by
    /// `1 / 255`.
    #[must_use]
    pub fn from_rgb(image: &RgbImage) -> Self {
        let data = image
            .pixels()
            .flat_map(|p| p.0)
            .map(|v| f32::from(v) / INTENSITY_DIVISOR)
            .collect();

        Self {
            data,
            height: image.height(),
            width: image.width(),
        }
    }

    /// Tensor shape as `[batch, height, width, channels]`.
    #[must_use]
    pub fn shape(&self) -> [usize; 4] {
        [
            1,
            self.height as usize,
            self.width as usize,
            Self::CHANNELS as usize,
        ]
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Normalized intensity at `(y, x, channel)`.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    #[must_use]
    pub fn get(&self, y: u32, x: u32, channel: u32) -> f32 {
        debug_assert!(y < self.height && x < self.width && channel < Self::CHANNELS);
        let index = ((y * self.width + x) * Self::CHANNELS + channel) as usize;
        self.data[index]
    }

    /// Flat NHWC view of the tensor data.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_shape_has_unit_batch_dimension() {
        let image = RgbImage::new(4, 2);
        let tensor = ImageTensor::from_rgb(&image);
        assert_eq!(tensor.shape(), [1, 2, 4, 3]);
        assert_eq!(tensor.as_slice().len(), 2 * 4 * 3);
    }

    #[test]
    fn test_intensities_are_scaled() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([255, 0, 51]));
        let tensor = ImageTensor::from_rgb(&image);

        assert!((tensor.get(0, 0, 0) - 1.0).abs() < f32::EPSILON);
        assert!(tensor.get(0, 0, 1).abs() < f32::EPSILON);
        assert!((tensor.get(0, 0, 2) - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_channel_order_is_rgb() {
        let mut image = RgbImage::new(1, 1);
        image.put_pixel(0, 0, Rgb([10, 20, 30]));
        let tensor = ImageTensor::from_rgb(&image);

        let slice = tensor.as_slice();
        assert!(slice[0] < slice[1] && slice[1] < slice[2]);
    }
}
