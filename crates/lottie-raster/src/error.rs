use lottie_core::LottieError;

pub type Result<T> = std::result::Result<T, RasterError>;

#[derive(thiserror::Error, Debug)]
pub enum RasterError {
    #[error("cannot allocate a {width}x{height} pixmap")]
    Allocation { width: u32, height: u32 },

    #[error("image `{id}` could not be decoded: {source}")]
    Decode {
        id: String,
        #[source]
        source: image::ImageError,
    },

    #[error("png encoding failed: {0}")]
    Encode(String),

    #[error(transparent)]
    Lottie(#[from] LottieError),
}
