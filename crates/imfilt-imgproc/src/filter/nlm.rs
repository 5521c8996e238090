use imfilt_image::{Image, ImageError};

use super::kernels::validate_kernel_size;
use crate::padding::{spatial_padding, Padding2D, PaddingMode};
use crate::parallel::{for_each_row, ExecutionStrategy};

/// Parameters of the non-local means filter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NlmConfig {
    /// Side of the square window searched for similar patches, must be odd.
    pub search_size: usize,
    /// Side of the square patches being compared, must be odd.
    pub patch_size: usize,
    /// Filtering strength. Larger values average over less similar patches.
    pub h: f32,
}

impl Default for NlmConfig {
    fn default() -> Self {
        Self {
            search_size: 11,
            patch_size: 5,
            h: 0.1,
        }
    }
}

/// Denoise an image with non-local means.
///
/// For every pixel `p`, each pixel `q` of the search window around it is weighted by
/// `exp(-d² / h²)`, where `d²` is the mean squared difference between the patches centred on `p`
/// and `q` taken over all channels. The output is `Σ w I(q) / Σ w`. Samples outside the image
/// are mirrored including the edge pixel.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `config` - Window sizes and filtering strength.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn nlm_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    config: &NlmConfig,
) -> Result<(), ImageError> {
    validate_kernel_size(config.search_size)?;
    validate_kernel_size(config.patch_size)?;
    if config.h.is_nan() || config.h <= 0.0 {
        return Err(ImageError::InvalidParameter("h", config.h));
    }

    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let search_half = config.search_size / 2;
    let patch_half = config.patch_size / 2;
    let border = search_half + patch_half;

    let padding = Padding2D::symmetric(border, border);
    let mut padded = Image::<f32, C>::from_size_val(padding.padded_size(src.size()), 0.0)?;
    spatial_padding(src, &mut padded, padding, PaddingMode::Reflect, [0.0; C])?;

    log::debug!(
        "nlm_filter: search {} patch {} h {}",
        config.search_size,
        config.patch_size,
        config.h
    );

    let padded_stride = padded.cols() * C;
    let padded_data = padded.as_slice();
    let inv_h_sq = 1.0 / (config.h * config.h);
    let inv_patch_len = 1.0 / (config.patch_size * config.patch_size * C) as f32;

    // mean squared difference of the patches centred on two padded coordinates
    let patch_distance = |(pr, pc): (usize, usize), (qr, qc): (usize, usize)| {
        let mut sum = 0.0f32;
        for dr in 0..config.patch_size {
            let p_row = (pr + dr - patch_half) * padded_stride;
            let q_row = (qr + dr - patch_half) * padded_stride;
            let p_start = p_row + (pc - patch_half) * C;
            let q_start = q_row + (qc - patch_half) * C;
            let len = config.patch_size * C;
            sum += padded_data[p_start..p_start + len]
                .iter()
                .zip(&padded_data[q_start..q_start + len])
                .map(|(&a, &b)| (a - b) * (a - b))
                .sum::<f32>();
        }
        sum * inv_patch_len
    };

    for_each_row(
        dst.as_slice_mut(),
        src.cols() * C,
        src.size().area(),
        ExecutionStrategy::Auto,
        |r, dst_row| {
            for (c, dst_pixel) in dst_row.chunks_exact_mut(C).enumerate() {
                let p = (r + border, c + border);
                let mut acc = [0.0f32; C];
                let mut norm = 0.0f32;
                for sr in 0..config.search_size {
                    for sc in 0..config.search_size {
                        let q = (r + patch_half + sr, c + patch_half + sc);
                        let w = (-patch_distance(p, q) * inv_h_sq).exp();
                        let offset = q.0 * padded_stride + q.1 * C;
                        acc.iter_mut()
                            .zip(&padded_data[offset..offset + C])
                            .for_each(|(a, &v)| *a += w * v);
                        norm += w;
                    }
                }
                // the centre patch has distance zero, so `norm >= 1`
                dst_pixel
                    .iter_mut()
                    .zip(acc.iter())
                    .for_each(|(d, &a)| *d = a / norm);
            }
        },
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use imfilt_image::ImageSize;

    #[test]
    fn test_nlm_constant_image() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 6,
            height: 5,
        };
        let src = Image::<f32, 3>::from_size_val(size, 0.3)?;
        let mut dst = Image::<f32, 3>::from_size_val(size, 0.0)?;

        nlm_filter(&src, &mut dst, &NlmConfig::default())?;

        for &v in dst.as_slice() {
            assert_relative_eq!(v, 0.3, epsilon = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_nlm_single_pixel_search_is_identity() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 4,
            height: 4,
        };
        let src = Image::<f32, 1>::from_fn(size, |r, c, _| (r * 4 + c) as f32 / 16.0);
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        let config = NlmConfig {
            search_size: 1,
            patch_size: 3,
            h: 0.5,
        };
        nlm_filter(&src, &mut dst, &config)?;

        assert_eq!(dst.as_slice(), src.as_slice());
        Ok(())
    }

    #[test]
    fn test_nlm_smooths_outlier() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 9,
            height: 9,
        };
        let mut src = Image::<f32, 1>::from_size_val(size, 0.5)?;
        src.set_pixel(4, 4, 0, 1.0)?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        let config = NlmConfig {
            search_size: 7,
            patch_size: 3,
            h: 0.5,
        };
        nlm_filter(&src, &mut dst, &config)?;

        let centre = *dst.get_pixel(4, 4, 0)?;
        assert!(centre < 1.0 && centre > 0.5);
        Ok(())
    }

    #[test]
    fn test_nlm_invalid_config() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val([4, 4].into(), 0.0)?;
        let mut dst = src.clone();

        let even = NlmConfig {
            patch_size: 4,
            ..Default::default()
        };
        assert_eq!(
            nlm_filter(&src, &mut dst, &even),
            Err(ImageError::InvalidKernelSize(4))
        );

        let zero_h = NlmConfig {
            h: 0.0,
            ..Default::default()
        };
        assert_eq!(
            nlm_filter(&src, &mut dst, &zero_h),
            Err(ImageError::InvalidParameter("h", 0.0))
        );
        Ok(())
    }
}
