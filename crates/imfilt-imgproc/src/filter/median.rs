use imfilt_image::{Image, ImageError};

use super::kernels::validate_kernel_size;
use crate::padding::{spatial_padding, Padding2D, PaddingMode};
use crate::parallel::{for_each_row, ExecutionStrategy};

/// Replace every pixel with the median of its `kernel_size x kernel_size` neighbourhood.
///
/// The image is zero padded, so windows that cross the border include zeros. The window values
/// are ordered and element `kernel_size² / 2` is written out. Each channel is filtered
/// independently.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The side of the window, must be odd.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn median_filter<const C: usize>(
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

    let half = kernel_size / 2;
    let padding = Padding2D::symmetric(half, half);
    let mut padded = Image::<f32, C>::from_size_val(padding.padded_size(src.size()), 0.0)?;
    spatial_padding(src, &mut padded, padding, PaddingMode::Constant, [0.0; C])?;

    let padded_stride = padded.cols() * C;
    let padded_data = padded.as_slice();
    let window_len = kernel_size * kernel_size;

    for_each_row(
        dst.as_slice_mut(),
        src.cols() * C,
        src.size().area(),
        ExecutionStrategy::Auto,
        |r, dst_row| {
            let mut window = Vec::with_capacity(window_len);
            for (c, dst_pixel) in dst_row.chunks_exact_mut(C).enumerate() {
                for (ch, d) in dst_pixel.iter_mut().enumerate() {
                    window.clear();
                    for kr in 0..kernel_size {
                        let row_offset = (r + kr) * padded_stride;
                        window.extend(
                            (0..kernel_size).map(|kc| padded_data[row_offset + (c + kc) * C + ch]),
                        );
                    }
                    let (_, median, _) =
                        window.select_nth_unstable_by(window_len / 2, |a, b| a.total_cmp(b));
                    *d = *median;
                }
            }
        },
    );

    Ok(())
}
