use imfilt_image::{Image, ImageError};

use super::kernels::validate_kernel_size;
use crate::padding::PaddingMode;
use crate::parallel::{for_each_row, ExecutionStrategy};

/// A separable 2D filter that applies horizontal and vertical 1D convolutions sequentially.
///
/// This struct caches the kernel data and precomputed offsets for efficient filtering.
struct SeparableFilter<'a> {
    kernel_x: &'a [f32],
    kernel_y: &'a [f32],
    offsets_x: Vec<isize>,
    offsets_y: Vec<isize>,
    border: PaddingMode,
}

impl<'a> SeparableFilter<'a> {
    /// Create a new separable filter with the given kernels.
    ///
    /// The offsets are those of a convolution: weight `i` is applied to the sample
    /// `half - i` pixels away, i.e. the kernel is flipped.
    fn new(kernel_x: &'a [f32], kernel_y: &'a [f32], border: PaddingMode) -> Self {
        let offsets = |len: usize| {
            let half = (len / 2) as isize;
            (0..len).map(|i| half - i as isize).collect()
        };

        Self {
            kernel_x,
            kernel_y,
            offsets_x: offsets(kernel_x.len()),
            offsets_y: offsets(kernel_y.len()),
            border,
        }
    }

    /// Apply the filter to an image.
    ///
    /// Performs horizontal filtering followed by vertical filtering using a temporary buffer.
    fn apply<const C: usize>(
        &self,
        src: &Image<f32, C>,
        dst: &mut Image<f32, C>,
        strategy: ExecutionStrategy,
    ) {
        let rows = src.rows();
        let cols = src.cols();
        let num_pixels = src.size().area();
        let stride = cols * C;

        let src_data = src.as_slice();
        let mut temp = vec![0.0f32; src_data.len()];

        // horizontal
        for_each_row(&mut temp, stride, num_pixels, strategy, |r, temp_row| {
            let row_offset = r * stride;
            for (c, temp_pixel) in temp_row.chunks_exact_mut(C).enumerate() {
                let mut acc = [0.0f32; C];
                for (&k, &off) in self.kernel_x.iter().zip(self.offsets_x.iter()) {
                    if let Some(x) = self.border.map_index_checked(c as isize + off, cols) {
                        let idx = row_offset + x * C;
                        acc.iter_mut()
                            .zip(&src_data[idx..idx + C])
                            .for_each(|(a, &v)| *a += v * k);
                    }
                }
                temp_pixel.copy_from_slice(&acc);
            }
        });

        // vertical
        let temp = temp.as_slice();
        for_each_row(dst.as_slice_mut(), stride, num_pixels, strategy, |r, dst_row| {
            for (c, dst_pixel) in dst_row.chunks_exact_mut(C).enumerate() {
                let mut acc = [0.0f32; C];
                for (&k, &off) in self.kernel_y.iter().zip(self.offsets_y.iter()) {
                    if let Some(y) = self.border.map_index_checked(r as isize + off, rows) {
                        let idx = y * stride + c * C;
                        acc.iter_mut()
                            .zip(&temp[idx..idx + C])
                            .for_each(|(a, &v)| *a += v * k);
                    }
                }
                dst_pixel.copy_from_slice(&acc);
            }
        });
    }
}

/// Apply a separable filter with border and execution strategy control.
///
/// Each row is convolved with `kernel_x`, then each column of the result with `kernel_y`.
/// For a rank-1 kernel `K = kernel_y^T * kernel_x` this costs `O(kx + ky)` per pixel instead of
/// `O(kx * ky)`. With [`PaddingMode::Constant`] the result matches
/// [`super::spatial_convolution`] with that kernel.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel, odd length.
/// * `kernel_y` - The vertical kernel, odd length.
/// * `border` - How samples outside the image are obtained.
/// * `strategy` - Execution strategy: `Serial`, `Parallel`, or `Auto`.
pub fn separable_filter_with_border<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
    border: PaddingMode,
    strategy: ExecutionStrategy,
) -> Result<(), ImageError> {
    if kernel_x.is_empty() || kernel_y.is_empty() {
        return Err(ImageError::InvalidKernelLength(
            kernel_x.len(),
            kernel_y.len(),
        ));
    }
    validate_kernel_size(kernel_x.len())?;
    validate_kernel_size(kernel_y.len())?;

    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let filter = SeparableFilter::new(kernel_x, kernel_y, border);
    filter.apply(src, dst, strategy);

    Ok(())
}

/// Apply a separable filter to an image.
///
/// Samples outside the image are reflected including the edge pixel (`c b a | a b c`), and
/// `ExecutionStrategy::Auto` is used. Note this border differs from the zero padding of
/// [`super::spatial_convolution`] and [`super::frequency_convolution`], so results only agree
/// away from the image border. For explicit control, use [`separable_filter_with_border`].
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
pub fn separable_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
) -> Result<(), ImageError> {
    separable_filter_with_border(
        src,
        dst,
        kernel_x,
        kernel_y,
        PaddingMode::Reflect,
        ExecutionStrategy::Auto,
    )
}
