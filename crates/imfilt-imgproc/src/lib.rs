#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// image enhancement module.
pub mod enhance;

/// image filtering module.
pub mod filter;

/// module containing parallelization utilities.
pub mod parallel;

/// image border padding module.
pub mod padding;

/// smoothing strategy selection.
pub mod smooth;
