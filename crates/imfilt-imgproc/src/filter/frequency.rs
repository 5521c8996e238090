use std::sync::Arc;

use imfilt_image::{Image, ImageError, ImageSize};
use rustfft::{num_complex::Complex, Fft, FftDirection, FftPlanner};

use super::kernels::Kernel2d;
use crate::padding::PaddingMode;

/// Smallest transform length `>= n` whose only prime factors are 2, 3 and 5.
///
/// Mixed radix transforms of such lengths are nearly as fast as powers of two while wasting far
/// less padding.
///
/// # Example
///
/// ```
/// use imfilt_imgproc::filter::optimal_dft_size;
///
/// assert_eq!(optimal_dft_size(7), 8);
/// assert_eq!(optimal_dft_size(11), 12);
/// assert_eq!(optimal_dft_size(31), 32);
/// assert_eq!(optimal_dft_size(97), 100);
/// ```
pub fn optimal_dft_size(n: usize) -> usize {
    let is_5_smooth = |mut m: usize| {
        for p in [2, 3, 5] {
            while m % p == 0 {
                m /= p;
            }
        }
        m == 1
    };

    (n.max(1)..)
        .find(|&m| is_5_smooth(m))
        .unwrap_or(n)
}

/// Circularly shift an image by `dx` columns and `dy` rows.
///
/// The pixel at `(row, col)` lands on `((row + dy) mod H, (col + dx) mod W)`; negative shifts wrap
/// around to the opposite side.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `dx` - Horizontal shift in pixels.
/// * `dy` - Vertical shift in pixels.
pub fn circ_shift<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    dx: isize,
    dy: isize,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let (rows, cols) = (src.rows(), src.cols());
    if rows == 0 || cols == 0 {
        return Ok(());
    }

    let src_data = src.as_slice();
    for (r, dst_row) in dst.as_slice_mut().chunks_exact_mut(cols * C).enumerate() {
        let sr = PaddingMode::Wrap.map_index(r as isize - dy, rows);
        for (c, dst_pixel) in dst_row.chunks_exact_mut(C).enumerate() {
            let sc = PaddingMode::Wrap.map_index(c as isize - dx, cols);
            let offset = (sr * cols + sc) * C;
            dst_pixel.copy_from_slice(&src_data[offset..offset + C]);
        }
    }

    Ok(())
}

/// Row-column 2D transform over a `rows x cols` row-major buffer.
struct Fft2d {
    rows: usize,
    cols: usize,
    row_fft: Arc<dyn Fft<f32>>,
    col_fft: Arc<dyn Fft<f32>>,
}

impl Fft2d {
    fn new(planner: &mut FftPlanner<f32>, size: ImageSize, direction: FftDirection) -> Self {
        Self {
            rows: size.height,
            cols: size.width,
            row_fft: planner.plan_fft(size.width, direction),
            col_fft: planner.plan_fft(size.height, direction),
        }
    }

    fn process(&self, data: &mut Vec<Complex<f32>>) {
        // the buffer holds `rows` consecutive transforms of length `cols`
        self.row_fft.process(data);

        let mut transposed = transpose(data, self.rows, self.cols);
        self.col_fft.process(&mut transposed);
        *data = transpose(&transposed, self.cols, self.rows);
    }
}

fn transpose(data: &[Complex<f32>], rows: usize, cols: usize) -> Vec<Complex<f32>> {
    let mut out = vec![Complex::new(0.0, 0.0); data.len()];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = data[r * cols + c];
        }
    }
    out
}

/// Convolve an image with a 2D kernel through the frequency domain.
///
/// Image and kernel are zero padded to [`optimal_dft_size`] of `extent + kernel_extent - 1` per
/// axis, so the circular convolution computed by the transform equals the linear one. The kernel
/// is circularly shifted by half its extent so its centre sits at the origin, both spectra are
/// multiplied point-wise and the inverse transform is cropped to the top-left `H x W` region.
///
/// The result matches [`super::spatial_convolution`] (zero border) up to floating point error.
/// Each channel is filtered independently.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel` - The filter kernel.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn frequency_convolution<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel: &Kernel2d,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let (rows, cols) = (src.rows(), src.cols());
    if rows == 0 || cols == 0 {
        return Ok(());
    }

    let padded_size = ImageSize {
        width: optimal_dft_size(cols + kernel.cols() - 1),
        height: optimal_dft_size(rows + kernel.rows() - 1),
    };
    log::debug!(
        "frequency_convolution: image {}x{} kernel {}x{} dft {}x{}",
        cols,
        rows,
        kernel.cols(),
        kernel.rows(),
        padded_size.width,
        padded_size.height
    );

    // kernel anchored at the origin, then centred on it
    let mut kernel_padded = Image::<f32, 1>::from_size_val(padded_size, 0.0)?;
    let padded_cols = padded_size.width;
    for (r, kernel_row) in kernel.as_slice().chunks_exact(kernel.cols()).enumerate() {
        kernel_padded.as_slice_mut()[r * padded_cols..r * padded_cols + kernel.cols()]
            .copy_from_slice(kernel_row);
    }
    let mut kernel_shifted = Image::<f32, 1>::from_size_val(padded_size, 0.0)?;
    circ_shift(
        &kernel_padded,
        &mut kernel_shifted,
        -((kernel.cols() / 2) as isize),
        -((kernel.rows() / 2) as isize),
    )?;

    let mut planner = FftPlanner::new();
    let forward = Fft2d::new(&mut planner, padded_size, FftDirection::Forward);
    let inverse = Fft2d::new(&mut planner, padded_size, FftDirection::Inverse);

    let mut kernel_spectrum: Vec<Complex<f32>> = kernel_shifted
        .as_slice()
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .collect();
    forward.process(&mut kernel_spectrum);

    let norm = 1.0 / padded_size.area() as f32;
    let src_data = src.as_slice();

    for ch in 0..C {
        let mut spectrum = vec![Complex::new(0.0f32, 0.0); padded_size.area()];
        for r in 0..rows {
            for c in 0..cols {
                spectrum[r * padded_cols + c].re = src_data[(r * cols + c) * C + ch];
            }
        }

        forward.process(&mut spectrum);
        spectrum
            .iter_mut()
            .zip(kernel_spectrum.iter())
            .for_each(|(s, &k)| *s = *s * k);
        inverse.process(&mut spectrum);

        let dst_data = dst.as_slice_mut();
        for r in 0..rows {
            for c in 0..cols {
                dst_data[(r * cols + c) * C + ch] = spectrum[r * padded_cols + c].re * norm;
            }
        }
    }

    Ok(())
}
