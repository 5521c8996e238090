//! Filter operations
//!
//! Convolution engines, kernel builders and the denoising filters built on top of them.

/// Filter kernels
pub mod kernels;

/// Spatial domain convolution
mod convolution;
pub use convolution::*;

/// Separable filter operations
mod separable_filter;
pub use separable_filter::*;

/// Frequency domain convolution
mod frequency;
pub use frequency::*;

/// Summed-area table filtering
mod integral;
pub use integral::*;

/// Filter operations
mod ops;
pub use ops::*;

mod median;
pub use median::*;

mod bilateral;
pub use bilateral::*;

/// Non-local means denoising
mod nlm;
pub use nlm::*;
