use imfilt_image::{Image, ImageError};

use super::kernels::Kernel2d;
use crate::padding::{spatial_padding, Padding2D, PaddingMode};
use crate::parallel::{for_each_row, ExecutionStrategy};

/// Convolve an image with a 2D kernel in the spatial domain.
///
/// Uses `ExecutionStrategy::Auto`. For explicit control, use
/// [`spatial_convolution_with_strategy`].
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel` - The filter kernel.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn spatial_convolution<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel: &Kernel2d,
) -> Result<(), ImageError> {
    spatial_convolution_with_strategy(src, dst, kernel, ExecutionStrategy::Auto)
}

/// Convolve an image with a 2D kernel in the spatial domain with execution strategy control.
///
/// The image is zero padded by half the kernel extent on every side and the kernel is rotated by
/// 180 degrees, so this is a true convolution rather than a correlation. Pixels near the border
/// see the implicit zeros, which dims the edge response. Each channel is filtered independently.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel` - The filter kernel.
/// * `strategy` - Execution strategy: `Serial`, `Parallel`, or `Auto`.
///
/// # Example
///
/// ```
/// use imfilt_image::{Image, ImageSize};
/// use imfilt_imgproc::filter::{kernels::box_kernel_2d, spatial_convolution};
///
/// let src = Image::<f32, 1>::from_size_val(ImageSize { width: 5, height: 5 }, 1.0).unwrap();
/// let mut dst = Image::<f32, 1>::from_size_val(src.size(), 0.0).unwrap();
///
/// spatial_convolution(&src, &mut dst, &box_kernel_2d(3).unwrap()).unwrap();
///
/// assert!((dst.as_slice()[12] - 1.0).abs() < 1e-6);
/// assert!((dst.as_slice()[0] - 4.0 / 9.0).abs() < 1e-6);
/// ```
pub fn spatial_convolution_with_strategy<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel: &Kernel2d,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let padding = Padding2D::symmetric(kernel.rows() / 2, kernel.cols() / 2);
    let mut padded = Image::<f32, C>::from_size_val(padding.padded_size(src.size()), 0.0)?;
    spatial_padding(src, &mut padded, padding, PaddingMode::Constant, [0.0; C])?;

    let flipped = kernel.flipped();
    let weights = flipped.as_slice();
    let (kernel_rows, kernel_cols) = (flipped.rows(), flipped.cols());

    let cols = src.cols();
    let padded_stride = padded.cols() * C;
    let padded_data = padded.as_slice();

    for_each_row(
        dst.as_slice_mut(),
        cols * C,
        src.size().area(),
        strategy,
        |r, dst_row| {
            for (c, dst_pixel) in dst_row.chunks_exact_mut(C).enumerate() {
                let mut acc = [0.0f32; C];
                for kr in 0..kernel_rows {
                    let row_offset = (r + kr) * padded_stride;
                    let kernel_row = &weights[kr * kernel_cols..(kr + 1) * kernel_cols];
                    for (kc, &w) in kernel_row.iter().enumerate() {
                        let offset = row_offset + (c + kc) * C;
                        acc.iter_mut()
                            .zip(&padded_data[offset..offset + C])
                            .for_each(|(a, &p)| *a += p * w);
                    }
                }
                dst_pixel.copy_from_slice(&acc);
            }
        },
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::kernels::{box_kernel_2d, gaussian_kernel_2d};
    use approx::assert_relative_eq;
    use imfilt_image::ImageSize;

    #[test]
    fn test_spatial_convolution_identity() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 4,
            height: 3,
        };
        let src = Image::<f32, 2>::from_fn(size, |r, c, ch| (r * 7 + c * 3 + ch) as f32 * 0.1);
        let mut dst = Image::<f32, 2>::from_size_val(size, -1.0)?;

        for kernel_size in [1, 3, 5] {
            spatial_convolution(&src, &mut dst, &Kernel2d::identity(kernel_size)?)?;
            assert_eq!(dst.as_slice(), src.as_slice());
        }

        Ok(())
    }

    #[test]
    fn test_spatial_convolution_box_ones() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 5,
            height: 5,
        };
        let src = Image::<f32, 1>::from_size_val(size, 1.0)?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        spatial_convolution(&src, &mut dst, &box_kernel_2d(3)?)?;

        let (corner, edge, inner) = (4.0 / 9.0, 6.0 / 9.0, 1.0);
        #[rustfmt::skip]
        let expected = [
            corner, edge, edge, edge, corner,
            edge, inner, inner, inner, edge,
            edge, inner, inner, inner, edge,
            edge, inner, inner, inner, edge,
            corner, edge, edge, edge, corner,
        ];

        for (&d, &e) in dst.as_slice().iter().zip(expected.iter()) {
            assert_relative_eq!(d, e, epsilon = 1e-6);
        }

        Ok(())
    }

    #[test]
    fn test_spatial_convolution_flips_kernel() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 3,
            height: 3,
        };
        #[rustfmt::skip]
        let src = Image::<f32, 1>::new(size, vec![
            0.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            0.0, 0.0, 0.0,
        ])?;
        #[rustfmt::skip]
        let kernel = Kernel2d::new(3, 3, vec![
            1.0, 2.0, 3.0,
            4.0, 5.0, 6.0,
            7.0, 8.0, 9.0,
        ])?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        spatial_convolution(&src, &mut dst, &kernel)?;

        // the impulse response of a convolution is the kernel itself
        assert_eq!(dst.as_slice(), kernel.as_slice());

        Ok(())
    }

    #[test]
    fn test_spatial_convolution_rectangular_kernel() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 4,
            height: 2,
        };
        let src = Image::<f32, 1>::new(size, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])?;
        let kernel = Kernel2d::new(1, 3, vec![1.0, 0.0, -1.0])?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        spatial_convolution(&src, &mut dst, &kernel)?;

        // out(c) = src(c + 1) - src(c - 1)
        assert_eq!(dst.as_slice(), &[2.0, 2.0, 2.0, -3.0, 6.0, 2.0, 2.0, -7.0]);

        Ok(())
    }

    #[test]
    fn test_spatial_convolution_serial_parallel_agree() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 9,
            height: 7,
        };
        let src = Image::<f32, 3>::from_fn(size, |r, c, ch| ((r * 31 + c * 17 + ch * 5) % 11) as f32);
        let kernel = gaussian_kernel_2d(5)?;

        let mut serial = Image::<f32, 3>::from_size_val(size, 0.0)?;
        spatial_convolution_with_strategy(&src, &mut serial, &kernel, ExecutionStrategy::Serial)?;

        let mut parallel = Image::<f32, 3>::from_size_val(size, 0.0)?;
        spatial_convolution_with_strategy(
            &src,
            &mut parallel,
            &kernel,
            ExecutionStrategy::Parallel,
        )?;

        assert_eq!(serial.as_slice(), parallel.as_slice());

        Ok(())
    }

    #[test]
    fn test_spatial_convolution_size_mismatch() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val([3, 3].into(), 0.0)?;
        let mut dst = Image::<f32, 1>::from_size_val([4, 3].into(), 0.0)?;
        assert_eq!(
            spatial_convolution(&src, &mut dst, &Kernel2d::identity(3)?),
            Err(ImageError::InvalidImageSize(3, 3, 4, 3))
        );
        Ok(())
    }
}
