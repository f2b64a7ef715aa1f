// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Miscellaneous helper functions that didn't fit elsewhere.

use nalgebra::{DMatrix, Scalar};

/// Bilinear interpolation of the matrix at `(x, y)` in pixel units,
/// `x` running along columns and `y` along rows.
///
/// Returns `None` outside of the image domain. Exact integer
/// coordinates return the pixel value itself, including on the last
/// row and column.
pub fn sample_bilinear<T>(mat: &DMatrix<T>, x: f32, y: f32) -> Option<f32>
where
    T: Scalar + Copy + Into<f32>,
{
    let (rows, cols) = mat.shape();
    if rows == 0 || cols == 0 {
        return None;
    }
    // Negated comparison so that NaN coordinates also land outside.
    if !(x >= 0.0 && y >= 0.0 && x <= (cols - 1) as f32 && y <= (rows - 1) as f32) {
        return None;
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    // Clamp the far neighbors so that integer coordinates on the last
    // row/column stay valid: their weight is zero there anyway.
    let x1 = (x0 + 1).min(cols - 1);
    let y1 = (y0 + 1).min(rows - 1);
    let a = x - x0 as f32;
    let b = y - y0 as f32;
    let v00: f32 = mat[(y0, x0)].into();
    let v01: f32 = mat[(y0, x1)].into();
    let v10: f32 = mat[(y1, x0)].into();
    let v11: f32 = mat[(y1, x1)].into();
    Some((1.0 - b) * ((1.0 - a) * v00 + a * v01) + b * ((1.0 - a) * v10 + a * v11))
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn integer_coordinates_are_exact() {
        let mat = DMatrix::from_row_slice(2, 2, &[10u8, 20, 30, 40]);
        assert_eq!(Some(10.0), sample_bilinear(&mat, 0.0, 0.0));
        assert_eq!(Some(20.0), sample_bilinear(&mat, 1.0, 0.0));
        assert_eq!(Some(30.0), sample_bilinear(&mat, 0.0, 1.0));
        assert_eq!(Some(40.0), sample_bilinear(&mat, 1.0, 1.0));
    }

    #[test]
    fn midpoint_is_the_mean() {
        let mat = DMatrix::from_row_slice(2, 2, &[0u8, 100, 100, 200]);
        assert_eq!(Some(100.0), sample_bilinear(&mat, 0.5, 0.5));
    }

    #[test]
    fn outside_the_image_is_none() {
        let mat = DMatrix::from_row_slice(2, 2, &[0u8, 0, 0, 0]);
        assert_eq!(None, sample_bilinear(&mat, -0.1, 0.0));
        assert_eq!(None, sample_bilinear(&mat, 0.0, 1.1));
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn interpolation_stays_within_pixel_bounds(x: f32, y: f32) -> bool {
        let mat = DMatrix::from_row_slice(3, 3, &[5u8, 50, 5, 50, 200, 50, 5, 50, 5]);
        match sample_bilinear(&mat, x, y) {
            None => true,
            Some(v) => (5.0..=200.0).contains(&v),
        }
    }
}
