//! FITS tiled image compression.
//!
//! `celestial-tilecomp` implements the tile codecs of the FITS tiled image
//! convention along with the float quantizer and the machinery that splits
//! an image into tiles and stores them as rows of a compressed table.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`compression`] | Algorithm names, parameter validation, the codec registry |
//! | [`gzip`] | `GZIP_1` and byte-shuffled `GZIP_2` |
//! | [`ricecomp`] | `RICE_1` adaptive Rice coding of 8, 16 and 32-bit pixels |
//! | [`plio`] | `PLIO_1` line-list coding of non-negative integer masks |
//! | [`hcompress`] | `HCOMPRESS_1` H-transform with quadtree coding |
//! | [`quantize`] | Float to integer quantization with subtractive dithering |
//! | [`tiled`] | Tiling, per-tile quantization and the compressed table layout |
//! | [`header`] | `Z*` header keywords |
//! | [`core`] | [`CompressionError`], [`BitPix`] and [`PixelData`] |
//!
//! # Single tiles
//!
//! ```
//! use celestial_tilecomp::compression::{compress_tile, decompress_tile, Parameters};
//!
//! let pixels: Vec<u8> = (0..100i16).flat_map(|v| v.to_be_bytes()).collect();
//! let params = Parameters::new().with("bytepix", 2).with("tilesize", 100);
//! let packed = compress_tile(&pixels, "RICE_1", &params).unwrap();
//! assert_eq!(decompress_tile(&packed, "RICE_1", &params).unwrap(), pixels);
//! ```

pub mod bitbuffer;
pub mod compression;
pub mod core;
pub mod gzip;
pub mod hcompress;
pub mod header;
pub mod plio;
pub mod quantize;
pub mod ricecomp;
pub mod tiled;

pub use crate::core::{BitPix, CompressionError, PixelData, Result};
pub use compression::{
    compress_tile, decompress_tile, CodecRegistry, CompressionAlgorithm, Parameters, TileCodec,
};
pub use quantize::{DitherMethod, Quantize, QuantizedTile};
pub use tiled::{
    compress_image, decompress_image, CompressedImage, CompressionConfig, CompressionHeader, Image,
};
