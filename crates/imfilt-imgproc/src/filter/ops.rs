use imfilt_image::{Image, ImageError};

use super::{kernels, separable_filter_with_border, spatial_convolution};
use crate::padding::PaddingMode;
use crate::parallel::ExecutionStrategy;

/// Blur an image using a box (average) filter.
///
/// Every output pixel is the mean of the `kernel_size x kernel_size` window around it, with
/// samples outside the image read as zero.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel, must be odd.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn box_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: usize,
) -> Result<(), ImageError> {
    let kernel = kernels::box_kernel_2d(kernel_size)?;
    spatial_convolution(src, dst, &kernel)
}

/// Blur an image using a gaussian blur filter
///
/// Samples outside the image are read as zero, so the result equals a spatial convolution with
/// the outer product of the 1D kernel with itself.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel, must be odd.
/// * `sigma` - The sigma of the gaussian kernel.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn gaussian_blur<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: usize,
    sigma: f32,
) -> Result<(), ImageError> {
    let kernel = kernels::gaussian_kernel_1d_with_sigma(kernel_size, sigma)?;
    separable_filter_with_border(
        src,
        dst,
        &kernel,
        &kernel,
        PaddingMode::Constant,
        ExecutionStrategy::Auto,
    )
}
