use std::fmt;
use std::str::FromStr;

use imfilt_image::{Image, ImageError};

use crate::filter::{
    frequency_convolution, kernels, sat_filter, separable_filter, spatial_convolution,
};

/// Strategy used by [`smooth_image`] to apply a gaussian-like low-pass filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FilterMode {
    /// Direct 2D convolution with a gaussian kernel.
    #[default]
    SpatialConvolution,
    /// 2D convolution through multiplication in the frequency domain.
    FrequencyConvolution,
    /// Two 1D gaussian passes, one per axis.
    SeparableFilter,
    /// Box mean computed from a summed-area table.
    IntegralImage,
}

impl FilterMode {
    /// Every mode, in declaration order.
    pub const ALL: [FilterMode; 4] = [
        FilterMode::SpatialConvolution,
        FilterMode::FrequencyConvolution,
        FilterMode::SeparableFilter,
        FilterMode::IntegralImage,
    ];

    const NAMES: [&'static str; 4] = [
        "FM_SPATIAL_CONVOLUTION",
        "FM_FREQUENCY_CONVOLUTION",
        "FM_SEPARABLE_FILTER",
        "FM_INTEGRAL_IMAGE",
    ];

    /// The display name of the mode, e.g. `FM_SPATIAL_CONVOLUTION`.
    pub fn as_str(&self) -> &'static str {
        Self::NAMES[*self as usize]
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = ImageError;

    /// Parse a display name. The historical misspelling `FM_SEPERABLE_FILTER` is accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "FM_SEPERABLE_FILTER" {
            return Ok(FilterMode::SeparableFilter);
        }
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ImageError::UnhandledFilterMode(s.to_string()))
    }
}

/// Smooth an image with the selected filter mode.
///
/// The gaussian modes use a kernel of side `kernel_size` with `sigma = kernel_size / 5`:
///
/// - [`FilterMode::SpatialConvolution`]: [`spatial_convolution`] with [`kernels::gaussian_kernel_2d`].
/// - [`FilterMode::FrequencyConvolution`]: [`frequency_convolution`] with the same kernel.
/// - [`FilterMode::SeparableFilter`]: [`separable_filter`] with [`kernels::gaussian_kernel_1d`]
///   on both axes. Its border is mirrored, so it only matches the two modes above in the
///   interior.
/// - [`FilterMode::IntegralImage`]: [`sat_filter`], a `kernel_size` box mean.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_size` - The size of the kernel, must be odd.
/// * `mode` - The smoothing strategy.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn smooth_image<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_size: usize,
    mode: FilterMode,
) -> Result<(), ImageError> {
    log::debug!("smooth_image: {mode} kernel_size={kernel_size}");

    match mode {
        FilterMode::SpatialConvolution => {
            spatial_convolution(src, dst, &kernels::gaussian_kernel_2d(kernel_size)?)
        }
        FilterMode::FrequencyConvolution => {
            frequency_convolution(src, dst, &kernels::gaussian_kernel_2d(kernel_size)?)
        }
        FilterMode::SeparableFilter => {
            let kernel = kernels::gaussian_kernel_1d(kernel_size)?;
            separable_filter(src, dst, &kernel, &kernel)
        }
        FilterMode::IntegralImage => sat_filter(src, dst, kernel_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use imfilt_image::ImageSize;

    #[test]
    fn test_filter_mode_names() -> Result<(), ImageError> {
        for mode in FilterMode::ALL {
            assert_eq!(mode.to_string().parse::<FilterMode>()?, mode);
        }
        assert_eq!(
            FilterMode::FrequencyConvolution.to_string(),
            "FM_FREQUENCY_CONVOLUTION"
        );
        assert_eq!(
            "FM_SEPERABLE_FILTER".parse::<FilterMode>()?,
            FilterMode::SeparableFilter
        );
        assert_eq!(
            "FM_MEDIAN".parse::<FilterMode>(),
            Err(ImageError::UnhandledFilterMode("FM_MEDIAN".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_smooth_image_modes_agree_in_interior() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 16,
            height: 12,
        };
        let src = Image::<f32, 1>::from_fn(size, |r, c, _| ((r * 7 + c * 11) % 13) as f32 / 13.0);

        let mut spatial = Image::<f32, 1>::from_size_val(size, 0.0)?;
        smooth_image(&src, &mut spatial, 5, FilterMode::SpatialConvolution)?;

        let mut frequency = Image::<f32, 1>::from_size_val(size, 0.0)?;
        smooth_image(&src, &mut frequency, 5, FilterMode::FrequencyConvolution)?;

        let mut separable = Image::<f32, 1>::from_size_val(size, 0.0)?;
        smooth_image(&src, &mut separable, 5, FilterMode::SeparableFilter)?;

        for (&f, &s) in frequency.as_slice().iter().zip(spatial.as_slice()) {
            assert_relative_eq!(f, s, epsilon = 1e-3);
        }

        for r in 2..size.height - 2 {
            for c in 2..size.width - 2 {
                let i = r * size.width + c;
                assert_relative_eq!(separable.as_slice()[i], spatial.as_slice()[i], epsilon = 1e-5);
            }
        }

        Ok(())
    }

    #[test]
    fn test_smooth_image_integral_is_box_mean() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 5,
            height: 5,
        };
        let src = Image::<f32, 1>::from_size_val(size, 1.0)?;
        let mut dst = Image::<f32, 1>::from_size_val(size, 0.0)?;

        smooth_image(&src, &mut dst, 3, FilterMode::IntegralImage)?;

        assert_relative_eq!(dst.as_slice()[0], 4.0 / 9.0, epsilon = 1e-6);
        assert_relative_eq!(dst.as_slice()[12], 1.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_smooth_image_even_size() -> Result<(), ImageError> {
        let src = Image::<f32, 1>::from_size_val([4, 4].into(), 1.0)?;
        let mut dst = src.clone();
        for mode in FilterMode::ALL {
            assert_eq!(
                smooth_image(&src, &mut dst, 4, mode),
                Err(ImageError::InvalidKernelSize(4))
            );
        }
        Ok(())
    }
}
