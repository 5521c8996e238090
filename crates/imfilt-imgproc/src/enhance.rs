use imfilt_image::{Image, ImageError};

use crate::parallel;
use crate::smooth::{smooth_image, FilterMode};

/// Parameters of [`unsharp_mask`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnsharpMaskConfig {
    /// Smoothing strategy used to build the blurred copy.
    pub mode: FilterMode,
    /// Size of the smoothing kernel, must be odd.
    pub size: usize,
    /// Mask entries whose magnitude is below this value are ignored.
    pub thresh: f32,
    /// Gain applied to the mask before adding it back.
    pub scale: f32,
    /// Whether to clamp the output to the [0.0, 1.0] range.
    pub clip_output: bool,
}

impl Default for UnsharpMaskConfig {
    fn default() -> Self {
        Self {
            mode: FilterMode::SpatialConvolution,
            size: 5,
            thresh: 0.0,
            scale: 1.0,
            clip_output: false,
        }
    }
}

/// Sharpen an image with an unsharp mask.
///
/// The image is smoothed with `config.mode`, and the difference
/// `mask = src - smooth(src)` holds the high frequencies. Entries with `|mask| < thresh` are set
/// to zero to avoid amplifying noise, then
///
/// dst(x,y,c) = src(x,y,c) + scale * mask(x,y,c)
///
/// The result is clamped to the range [0.0, 1.0] if `clip_output` is true.
///
/// # Arguments
///
/// * `src` - The input image.
/// * `dst` - The output image to store the result.
/// * `config` - Smoothing, threshold and gain parameters.
///
/// # Errors
///
/// Returns an error if the sizes of `src` and `dst` do not match, or if the smoothing step fails.
pub fn unsharp_mask<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    config: &UnsharpMaskConfig,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.width(),
            src.height(),
            dst.width(),
            dst.height(),
        ));
    }

    let mut smoothed = Image::<f32, C>::from_size_val(src.size(), 0.0)?;
    smooth_image(src, &mut smoothed, config.size, config.mode)?;

    let UnsharpMaskConfig {
        thresh,
        scale,
        clip_output,
        ..
    } = *config;

    parallel::par_iter_rows_val_two(src, &smoothed, dst, |&src_pixel, &smooth_pixel, dst_pixel| {
        let mut mask = src_pixel - smooth_pixel;
        if mask.abs() < thresh {
            mask = 0.0;
        }
        let val = src_pixel + scale * mask;
        if clip_output {
            *dst_pixel = val.clamp(0.0, 1.0);
        } else {
            *dst_pixel = val;
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use imfilt_image::ImageSize;

    #[test]
    fn test_unsharp_mask_large_threshold_is_identity() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 6,
            height: 6,
        };
        let src = Image::<f32, 1>::from_fn(size, |r, c, _| ((r + c) % 3) as f32 / 3.0);
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        for mode in FilterMode::ALL {
            let config = UnsharpMaskConfig {
                mode,
                size: 3,
                thresh: 10.0,
                scale: 4.0,
                clip_output: false,
            };
            unsharp_mask(&src, &mut dst, &config)?;
            assert_eq!(dst.as_slice(), src.as_slice());
        }

        Ok(())
    }

    #[test]
    fn test_unsharp_mask_boosts_edges() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 8,
            height: 4,
        };
        let src = Image::<f32, 1>::from_fn(size, |_, c, _| if c < 4 { 0.25 } else { 0.75 });
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        let config = UnsharpMaskConfig {
            mode: FilterMode::SeparableFilter,
            size: 3,
            scale: 2.0,
            ..Default::default()
        };
        unsharp_mask(&src, &mut dst, &config)?;

        // overshoot on both sides of the step
        assert!(*dst.get_pixel(3, 1, 0)? < 0.25);
        assert!(*dst.get_pixel(4, 1, 0)? > 0.75);

        Ok(())
    }

    #[test]
    fn test_unsharp_mask_clip_output() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 5,
            height: 5,
        };
        let mut src = Image::<f32, 1>::from_size_val(size, 0.0)?;
        src.set_pixel(2, 2, 0, 1.0)?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        let mut config = UnsharpMaskConfig {
            size: 3,
            scale: 5.0,
            ..Default::default()
        };
        unsharp_mask(&src, &mut dst, &config)?;
        assert!(dst.as_slice().iter().any(|&v| !(0.0..=1.0).contains(&v)));

        config.clip_output = true;
        unsharp_mask(&src, &mut dst, &config)?;
        assert!(dst.as_slice().iter().all(|&v| (0.0..=1.0).contains(&v)));

        Ok(())
    }

    #[test]
    fn test_unsharp_mask_propagates_smoothing_error() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val([4, 4].into(), 0.5)?;
        let mut dst = src.clone();
        let config = UnsharpMaskConfig {
            size: 4,
            ..Default::default()
        };
        assert_eq!(
            unsharp_mask(&src, &mut dst, &config),
            Err(ImageError::InvalidKernelSize(4))
        );
        Ok(())
    }
}
