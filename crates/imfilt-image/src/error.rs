/// An error type for the image and filtering crates.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when the image sizes do not match.
    #[error("Image size ({0}x{1}) does not match the expected size ({2}x{3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when a pixel index is out of bounds.
    #[error("Pixel index ({0}, {1}) is out of bounds ({2}x{3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when a channel index is out of bounds.
    #[error("Channel index ({0}) is out of bounds ({1})")]
    ChannelIndexOutOfBounds(usize, usize),

    /// Error when the pixel data cannot be cast to the target type.
    #[error("Failed to cast image data to {0}")]
    CastError(String),

    /// Error when the kernel extent is zero or even.
    #[error("Kernel size must be odd and non-zero, got {0}")]
    InvalidKernelSize(usize),

    /// Error when a separable kernel is empty.
    #[error("Invalid kernel length: kernel_x={0}, kernel_y={1}")]
    InvalidKernelLength(usize, usize),

    /// Error when a scalar filter parameter is out of range.
    #[error("Invalid value for parameter `{0}`: {1}")]
    InvalidParameter(&'static str, f32),

    /// Error when a filter mode name is not recognized.
    #[error("Unhandled filter type: {0}")]
    UnhandledFilterMode(String),
}
