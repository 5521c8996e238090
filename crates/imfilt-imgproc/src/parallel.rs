use imfilt_image::Image;
use rayon::prelude::*;

/// Images with at least this many pixels are processed in parallel by [`ExecutionStrategy::Auto`].
pub const AUTO_PARALLEL_MIN_PIXELS: usize = 100_000;

/// Controls how row-wise filter loops are executed.
///
/// Every output pixel is computed from read-only inputs, so the strategy only affects speed,
/// never the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or when the overhead of parallelization
    /// outweighs the benefits.
    Serial,

    /// Use the global Rayon thread pool to process rows in parallel.
    Parallel,

    /// Parallel for images with at least [`AUTO_PARALLEL_MIN_PIXELS`] pixels, serial otherwise.
    #[default]
    Auto,
}

impl ExecutionStrategy {
    /// Whether an image with `num_pixels` pixels should be processed in parallel.
    pub fn is_parallel(&self, num_pixels: usize) -> bool {
        match self {
            ExecutionStrategy::Serial => false,
            ExecutionStrategy::Parallel => true,
            ExecutionStrategy::Auto => num_pixels >= AUTO_PARALLEL_MIN_PIXELS,
        }
    }
}

/// Run `f(row_index, row)` over every `row_stride`-long row of `data`.
///
/// Rows are dispatched to the Rayon pool when `strategy` selects parallel execution for
/// `num_pixels`.
pub(crate) fn for_each_row<T, F>(
    data: &mut [T],
    row_stride: usize,
    num_pixels: usize,
    strategy: ExecutionStrategy,
    f: F,
) where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    if row_stride == 0 {
        return;
    }

    if strategy.is_parallel(num_pixels) {
        data.par_chunks_exact_mut(row_stride)
            .enumerate()
            .for_each(|(r, row)| f(r, row));
    } else {
        data.chunks_exact_mut(row_stride)
            .enumerate()
            .for_each(|(r, row)| f(r, row));
    }
}

/// Apply a function to each element of the image in parallel with a value.
///
/// PRECONDITION: `src` and `dst` must have the same shape.
pub fn par_iter_rows_val<T1, T2, const C: usize>(
    src: &Image<T1, C>,
    dst: &mut Image<T2, C>,
    f: impl Fn(&T1, &mut T2) + Send + Sync,
) where
    T1: Send + Sync,
    T2: Send + Sync,
{
    let stride = C * src.cols();
    if stride == 0 {
        return;
    }

    src.as_slice()
        .par_chunks_exact(stride)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(stride))
        .for_each(|(src_chunk, dst_chunk)| {
            src_chunk
                .iter()
                .zip(dst_chunk.iter_mut())
                .for_each(|(src_pixel, dst_pixel)| {
                    f(src_pixel, dst_pixel);
                });
        });
}

/// Apply a function to each element of two images in parallel.
///
/// PRECONDITION: `src1`, `src2` and `dst` must have the same shape.
pub fn par_iter_rows_val_two<T1, T2, T3, const C: usize>(
    src1: &Image<T1, C>,
    src2: &Image<T2, C>,
    dst: &mut Image<T3, C>,
    f: impl Fn(&T1, &T2, &mut T3) + Send + Sync,
) where
    T1: Send + Sync,
    T2: Send + Sync,
    T3: Send + Sync,
{
    let stride = C * src1.cols();
    if stride == 0 {
        return;
    }

    src1.as_slice()
        .par_chunks_exact(stride)
        .zip(src2.as_slice().par_chunks_exact(stride))
        .zip(dst.as_slice_mut().par_chunks_exact_mut(stride))
        .for_each(|((src1_chunk, src2_chunk), dst_chunk)| {
            src1_chunk
                .iter()
                .zip(src2_chunk.iter())
                .zip(dst_chunk.iter_mut())
                .for_each(|((src1_pixel, src2_pixel), dst_pixel)| {
                    f(src1_pixel, src2_pixel, dst_pixel);
                });
        });
}
