use imfilt_image::{Image, ImageError};

use super::kernels::validate_kernel_size;
use crate::parallel::{for_each_row, ExecutionStrategy};

/// Compute the summed-area table of an image.
///
/// The table has `(H + 1) x (W + 1)` entries per channel, interleaved like the image. Entry
/// `(r, c)` holds the sum of all pixels above and left of `(r, c)`, so the first row and column
/// are zero. Sums are accumulated in `f64` to keep large images exact enough.
pub fn integral_image<const C: usize>(src: &Image<f32, C>) -> Vec<f64> {
    let (rows, cols) = (src.rows(), src.cols());
    let stride = (cols + 1) * C;
    let mut table = vec![0.0f64; (rows + 1) * stride];
    let src_data = src.as_slice();

    for r in 0..rows {
        let mut row_sum = [0.0f64; C];
        for c in 0..cols {
            let src_offset = (r * cols + c) * C;
            let above = r * stride + (c + 1) * C;
            let here = (r + 1) * stride + (c + 1) * C;
            for ch in 0..C {
                row_sum[ch] += src_data[src_offset + ch] as f64;
                table[here + ch] = table[above + ch] + row_sum[ch];
            }
        }
    }

    table
}

/// Box mean filter computed through a summed-area table.
///
/// Each window sum costs four table lookups regardless of `kernel_size`. Windows are clipped to
/// the image but always divided by `kernel_size²`, which is the same as reading zeros outside the
/// image. The result therefore matches [`super::spatial_convolution`] with
/// [`super::kernels::box_kernel_2d`].
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The side of the box window, must be odd.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn sat_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: usize,
) -> Result<(), ImageError> {
    validate_kernel_size(kernel_size)?;

    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let (rows, cols) = (src.rows(), src.cols());
    let half = kernel_size / 2;
    let norm = 1.0 / (kernel_size * kernel_size) as f64;

    let table = integral_image(src);
    let table_stride = (cols + 1) * C;

    for_each_row(
        dst.as_slice_mut(),
        cols * C,
        src.size().area(),
        ExecutionStrategy::Auto,
        |r, dst_row| {
            // half-open window bounds in table coordinates
            let top = r.saturating_sub(half) * table_stride;
            let bottom = (r + half + 1).min(rows) * table_stride;
            for (c, dst_pixel) in dst_row.chunks_exact_mut(C).enumerate() {
                let left = c.saturating_sub(half) * C;
                let right = (c + half + 1).min(cols) * C;
                for (ch, d) in dst_pixel.iter_mut().enumerate() {
                    let sum = table[bottom + right + ch] - table[top + right + ch]
                        - table[bottom + left + ch]
                        + table[top + left + ch];
                    *d = (sum * norm) as f32;
                }
            }
        },
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{kernels::box_kernel_2d, spatial_convolution};
    use approx::assert_relative_eq;
    use imfilt_image::ImageSize;

    #[test]
    fn test_integral_image() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 3,
            height: 2,
        };
        let src = Image::<f32, 1>::new(size, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;

        let table = integral_image(&src);

        #[rustfmt::skip]
        assert_eq!(
            table,
            vec![
                0.0, 0.0, 0.0, 0.0,
                0.0, 1.0, 3.0, 6.0,
                0.0, 5.0, 12.0, 21.0,
            ]
        );

        Ok(())
    }

    #[test]
    fn test_sat_filter_matches_box_convolution() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 9,
            height: 7,
        };
        let src = Image::<f32, 2>::from_fn(size, |r, c, ch| ((r * 13 + c * 7 + ch * 3) % 10) as f32);

        for kernel_size in [1, 3, 5, 11] {
            let mut sat = Image::<f32, 2>::from_size_val(size, 0.0)?;
            sat_filter(&src, &mut sat, kernel_size)?;

            let mut spatial = Image::<f32, 2>::from_size_val(size, 0.0)?;
            spatial_convolution(&src, &mut spatial, &box_kernel_2d(kernel_size)?)?;

            for (&a, &b) in sat.as_slice().iter().zip(spatial.as_slice()) {
                assert_relative_eq!(a, b, epsilon = 1e-4);
            }
        }

        Ok(())
    }

    #[test]
    fn test_sat_filter_invalid() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val([4, 4].into(), 1.0)?;
        let mut dst = Image::<f32, 1>::from_size_val([4, 4].into(), 0.0)?;
        assert_eq!(
            sat_filter(&src, &mut dst, 2),
            Err(ImageError::InvalidKernelSize(2))
        );

        let mut wrong = Image::<f32, 1>::from_size_val([4, 3].into(), 0.0)?;
        assert_eq!(
            sat_filter(&src, &mut wrong, 3),
            Err(ImageError::InvalidImageSize(4, 4, 4, 3))
        );
        Ok(())
    }
}
