//! Tiling of an N-dimensional image, first axis varying fastest.

use crate::core::{CompressionError, Result};

/// One tile: its raster index, the pixel it starts at and its (possibly
/// truncated) extent along every axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRegion {
    pub index: usize,
    pub origin: Vec<usize>,
    pub extent: Vec<usize>,
}

impl TileRegion {
    pub fn len(&self) -> usize {
        self.extent.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the first axis and the product of the rest, the 2-D view
    /// used by the noise estimator and HCOMPRESS.
    pub fn plane_dims(&self) -> (usize, usize) {
        let nx = self.extent.first().copied().unwrap_or(1);
        let ny = self.extent.iter().skip(1).product();
        (nx, ny)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    shape: Vec<usize>,
    tile_shape: Vec<usize>,
    counts: Vec<usize>,
}

impl TileGrid {
    pub fn new(shape: &[usize], tile_shape: &[usize]) -> Result<Self> {
        if shape.is_empty() || shape.len() != tile_shape.len() {
            return Err(CompressionError::params(format!(
                "tile shape {:?} does not match image shape {:?}",
                tile_shape, shape
            )));
        }
        if shape.contains(&0) || tile_shape.contains(&0) {
            return Err(CompressionError::params(format!(
                "image {:?} and tile {:?} dimensions must be positive",
                shape, tile_shape
            )));
        }
        let counts = shape
            .iter()
            .zip(tile_shape)
            .map(|(&n, &t)| n.div_ceil(t))
            .collect();
        Ok(Self {
            shape: shape.to_vec(),
            tile_shape: tile_shape.to_vec(),
            counts,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn tile_shape(&self) -> &[usize] {
        &self.tile_shape
    }

    /// Number of tiles along each axis.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn tile_count(&self) -> usize {
        self.counts.iter().product()
    }

    pub fn pixel_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn tile(&self, index: usize) -> Result<TileRegion> {
        if index >= self.tile_count() {
            return Err(CompressionError::params(format!(
                "tile index {} out of range (0..{})",
                index,
                self.tile_count()
            )));
        }
        let mut rest = index;
        let mut origin = Vec::with_capacity(self.shape.len());
        let mut extent = Vec::with_capacity(self.shape.len());
        for axis in 0..self.shape.len() {
            let position = rest % self.counts[axis];
            rest /= self.counts[axis];
            let start = position * self.tile_shape[axis];
            origin.push(start);
            extent.push(self.tile_shape[axis].min(self.shape[axis] - start));
        }
        Ok(TileRegion {
            index,
            origin,
            extent,
        })
    }

    pub fn tiles(&self) -> impl Iterator<Item = TileRegion> + '_ {
        (0..self.tile_count()).filter_map(move |i| self.tile(i).ok())
    }

    /// Calls `f(image_offset, tile_offset, run)` for every contiguous run of
    /// pixels along the first axis, in element units.
    fn for_each_run(&self, region: &TileRegion, mut f: impl FnMut(usize, usize, usize)) {
        let ndim = self.shape.len();
        let run = region.extent[0];
        let rows: usize = region.extent[1..].iter().product();
        let mut counter = vec![0usize; ndim];

        for row in 0..rows {
            let mut offset = 0;
            let mut stride = 1;
            for axis in 0..ndim {
                offset += (region.origin[axis] + counter[axis]) * stride;
                stride *= self.shape[axis];
            }
            f(offset, row * run, run);

            for axis in 1..ndim {
                counter[axis] += 1;
                if counter[axis] < region.extent[axis] {
                    break;
                }
                counter[axis] = 0;
            }
        }
    }

    /// Copy a tile out of a flat image of `elem`-byte pixels.
    pub fn extract(&self, image: &[u8], elem: usize, region: &TileRegion) -> Vec<u8> {
        let mut tile = vec![0u8; region.len() * elem];
        self.for_each_run(region, |src, dst, run| {
            tile[dst * elem..(dst + run) * elem]
                .copy_from_slice(&image[src * elem..(src + run) * elem]);
        });
        tile
    }

    /// Copy a tile back into a flat image of `elem`-byte pixels.
    pub fn insert(&self, image: &mut [u8], elem: usize, region: &TileRegion, tile: &[u8]) {
        self.for_each_run(region, |dst, src, run| {
            image[dst * elem..(dst + run) * elem]
                .copy_from_slice(&tile[src * elem..(src + run) * elem]);
        });
    }
}
