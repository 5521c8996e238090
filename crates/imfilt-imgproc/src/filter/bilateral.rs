use imfilt_image::{Image, ImageError};

use super::kernels::validate_kernel_size;
use crate::padding::{spatial_padding, Padding2D, PaddingMode};
use crate::parallel::{for_each_row, ExecutionStrategy};

/// Edge preserving smoothing with a bilateral filter.
///
/// Each neighbour `q` of `p` in the `kernel_size x kernel_size` window is weighted by
///
/// `w = exp(-(dx² + dy²) / (2 σs²)) * exp(-(I(p) - I(q))² / (2 σr²))`
///
/// and the output is `Σ w I(q) / Σ w`. The centre always has weight one so the sum never
/// vanishes. The image is zero padded and each channel is filtered independently. As `σr` grows
/// the filter tends to a gaussian blur with sigma `σs`.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The side of the window, must be odd.
/// * `sigma_spatial` - Spread of the distance term, must be positive.
/// * `sigma_radiometric` - Spread of the intensity term, must be positive.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn bilateral_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: usize,
    sigma_spatial: f32,
    sigma_radiometric: f32,
) -> Result<(), ImageError> {
    validate_kernel_size(kernel_size)?;
    if sigma_spatial.is_nan() || sigma_spatial <= 0.0 {
        return Err(ImageError::InvalidParameter("sigma_spatial", sigma_spatial));
    }
    if sigma_radiometric.is_nan() || sigma_radiometric <= 0.0 {
        return Err(ImageError::InvalidParameter(
            "sigma_radiometric",
            sigma_radiometric,
        ));
    }

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

    // the distance term only depends on the offset
    let spatial_denom = 2.0 * sigma_spatial * sigma_spatial;
    let spatial_weights = (0..kernel_size * kernel_size)
        .map(|i| {
            let dy = (i / kernel_size) as f32 - half as f32;
            let dx = (i % kernel_size) as f32 - half as f32;
            (-(dx * dx + dy * dy) / spatial_denom).exp()
        })
        .collect::<Vec<_>>();
    let range_denom = 2.0 * sigma_radiometric * sigma_radiometric;

    let padded_stride = padded.cols() * C;
    let padded_data = padded.as_slice();
    let src_data = src.as_slice();
    let cols = src.cols();

    for_each_row(
        dst.as_slice_mut(),
        cols * C,
        src.size().area(),
        ExecutionStrategy::Auto,
        |r, dst_row| {
            for (c, dst_pixel) in dst_row.chunks_exact_mut(C).enumerate() {
                let centre = &src_data[(r * cols + c) * C..(r * cols + c + 1) * C];
                let mut acc = [0.0f32; C];
                let mut norm = [0.0f32; C];
                for kr in 0..kernel_size {
                    let row_offset = (r + kr) * padded_stride;
                    for kc in 0..kernel_size {
                        let ws = spatial_weights[kr * kernel_size + kc];
                        let offset = row_offset + (c + kc) * C;
                        let neighbour = &padded_data[offset..offset + C];
                        for ch in 0..C {
                            let diff = centre[ch] - neighbour[ch];
                            let w = ws * (-(diff * diff) / range_denom).exp();
                            acc[ch] += w * neighbour[ch];
                            norm[ch] += w;
                        }
                    }
                }
                dst_pixel
                    .iter_mut()
                    .zip(acc.iter().zip(norm.iter()))
                    .for_each(|(d, (&a, &n))| *d = a / n);
            }
        },
    );

    Ok(())
}
