pub mod errors;
pub mod types;

pub use errors::{CompressionError, Result};
pub use types::{BitPix, PixelData};
