// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interoperability conversions between the image and matrix types.

use image::RgbImage;
use nalgebra::DMatrix;

/// Convert an `RgbImage` into a grayscale `u8` matrix with BT.601 luma
/// weights.
///
/// Performs a transposition to accomodate for the
/// row major image into the column major matrix.
#[allow(clippy::cast_possible_truncation)]
pub fn gray_matrix_from_rgb(img: &RgbImage) -> DMatrix<u8> {
    let (width, height) = img.dimensions();
    DMatrix::from_fn(height as usize, width as usize, |i, j| {
        let p = img.get_pixel(j as u32, i as u32);
        let luma =
            0.299 * f32::from(p[0]) + 0.587 * f32::from(p[1]) + 0.114 * f32::from(p[2]);
        luma.round() as u8
    })
}

#[cfg(test)]
mod tests {

    use super::*;
    use image::Rgb;

    #[test]
    fn gray_levels_pass_through() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        let mat = gray_matrix_from_rgb(&img);
        assert_eq!((1, 2), mat.shape());
        assert_eq!(0, mat[(0, 0)]);
        assert_eq!(255, mat[(0, 1)]);
    }

    #[test]
    fn luma_weights_follow_bt601() {
        let mut img = RgbImage::new(1, 1);
        img.put_pixel(0, 0, Rgb([100, 0, 0]));
        let mat = gray_matrix_from_rgb(&img);
        assert_eq!(30, mat[(0, 0)]); // 0.299 * 100, rounded
    }
}
