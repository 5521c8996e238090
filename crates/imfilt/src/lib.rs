#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use imfilt_image as image;

#[doc(inline)]
pub use imfilt_imgproc as imgproc;
