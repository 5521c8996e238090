use imfilt_image::ImageError;

/// Check that a kernel extent is odd and non-zero so the kernel has a centre pixel.
pub(crate) fn validate_kernel_size(kernel_size: usize) -> Result<(), ImageError> {
    if kernel_size % 2 == 0 {
        return Err(ImageError::InvalidKernelSize(kernel_size));
    }
    Ok(())
}

/// A dense 2D filter kernel stored row-major.
///
/// Both extents are odd so the kernel is aligned on its centre element.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel2d {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Kernel2d {
    /// Create a kernel from row-major weights.
    ///
    /// # Errors
    ///
    /// Returns an error if an extent is even or zero, or if `data` does not hold `rows * cols`
    /// weights.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, ImageError> {
        validate_kernel_size(rows)?;
        validate_kernel_size(cols)?;
        if data.len() != rows * cols {
            return Err(ImageError::InvalidChannelShape(data.len(), rows * cols));
        }
        Ok(Self { rows, cols, data })
    }

    /// The identity kernel: a single 1 at the centre.
    pub fn identity(kernel_size: usize) -> Result<Self, ImageError> {
        validate_kernel_size(kernel_size)?;
        let mut data = vec![0.0; kernel_size * kernel_size];
        data[(kernel_size / 2) * kernel_size + kernel_size / 2] = 1.0;
        Ok(Self {
            rows: kernel_size,
            cols: kernel_size,
            data,
        })
    }

    /// The rank-1 kernel `kernel_y^T * kernel_x`.
    ///
    /// # Arguments
    ///
    /// * `kernel_x` - The horizontal factor, one weight per column.
    /// * `kernel_y` - The vertical factor, one weight per row.
    pub fn outer(kernel_x: &[f32], kernel_y: &[f32]) -> Result<Self, ImageError> {
        let data = kernel_y
            .iter()
            .flat_map(|&ky| kernel_x.iter().map(move |&kx| ky * kx))
            .collect();
        Self::new(kernel_y.len(), kernel_x.len(), data)
    }

    /// Number of kernel rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of kernel columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The weights in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// The weight at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.data[row * self.cols + col])
    }

    /// The kernel rotated by 180 degrees.
    pub fn flipped(&self) -> Self {
        // reversing a row-major buffer flips both axes at once
        let data = self.data.iter().rev().copied().collect();
        Self {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }
}

/// Create a box blur kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel, must be odd.
///
/// # Returns
///
/// A vector of `kernel_size` weights equal to `1 / kernel_size`.
pub fn box_kernel_1d(kernel_size: usize) -> Result<Vec<f32>, ImageError> {
    validate_kernel_size(kernel_size)?;
    Ok(vec![1.0 / kernel_size as f32; kernel_size])
}

/// Create a square box (moving average) kernel with all weights equal to `1 / kernel_size²`.
pub fn box_kernel_2d(kernel_size: usize) -> Result<Kernel2d, ImageError> {
    validate_kernel_size(kernel_size)?;
    let weight = 1.0 / (kernel_size * kernel_size) as f32;
    Kernel2d::new(
        kernel_size,
        kernel_size,
        vec![weight; kernel_size * kernel_size],
    )
}

/// Create a gaussian kernel whose standard deviation is derived from its size.
///
/// Entry `i` is proportional to the normal density at `i - kernel_size / 2` with
/// `sigma = kernel_size / 5`; the weights sum to one.
///
/// # Errors
///
/// Returns [`ImageError::InvalidKernelSize`] if `kernel_size` is even or zero.
pub fn gaussian_kernel_1d(kernel_size: usize) -> Result<Vec<f32>, ImageError> {
    gaussian_kernel_1d_with_sigma(kernel_size, kernel_size as f32 / 5.0)
}

/// Create a gaussian blur kernel with an explicit sigma.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel, must be odd.
/// * `sigma` - The sigma of the gaussian kernel, must be positive.
///
/// # Returns
///
/// A vector of the normalized kernel.
pub fn gaussian_kernel_1d_with_sigma(
    kernel_size: usize,
    sigma: f32,
) -> Result<Vec<f32>, ImageError> {
    validate_kernel_size(kernel_size)?;
    if sigma.is_nan() || sigma <= 0.0 {
        return Err(ImageError::InvalidParameter("sigma", sigma));
    }

    let center = (kernel_size / 2) as f32;
    let sigma_sq = sigma * sigma;

    // compute the kernel
    let mut kernel = (0..kernel_size)
        .map(|i| {
            let x = i as f32 - center;
            (-(x * x) / (2.0 * sigma_sq)).exp()
        })
        .collect::<Vec<_>>();

    // normalize the kernel
    let norm = kernel.iter().sum::<f32>();
    kernel.iter_mut().for_each(|k| *k /= norm);

    log::trace!("gaussian_kernel_1d size={kernel_size} sigma={sigma}");

    Ok(kernel)
}

/// Create a square gaussian kernel with `sigma = kernel_size / 5`, normalized to sum to one.
///
/// # Errors
///
/// Returns [`ImageError::InvalidKernelSize`] if `kernel_size` is even or zero.
pub fn gaussian_kernel_2d(kernel_size: usize) -> Result<Kernel2d, ImageError> {
    validate_kernel_size(kernel_size)?;

    let sigma = kernel_size as f32 / 5.0;
    let center = (kernel_size / 2) as f32;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut data = Vec::with_capacity(kernel_size * kernel_size);
    for i in 0..kernel_size {
        for j in 0..kernel_size {
            let x = i as f32 - center;
            let y = j as f32 - center;
            data.push((-(x * x + y * y) / two_sigma_sq).exp());
        }
    }

    let norm = data.iter().sum::<f32>();
    data.iter_mut().for_each(|k| *k /= norm);

    Kernel2d::new(kernel_size, kernel_size, data)
}
