// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to write and read a [`CfStore2`] to and from a cache directory.
//!
//! A cache directory holds an index (`cfstore.json`) and one sub-directory per
//! bucket. Each bucket directory has the buffer's axes and the metadata of
//! every cell in `buffer.json`, and the pixels of the filled cells in
//! `cells.bin`. The weight store lives beside the signal store with every
//! name prefixed by [`WEIGHT_QUALIFIER`].
//!
//! Rotated cells are written as they were computed, so that the pixels on disk
//! always belong to the parallactic angle in their metadata.
//!
//! `cells.bin` is little endian: the 8 ASCII bytes "AWCFCELL", a u32 count of
//! kernels, then for each kernel a u32 for each dimension followed by the
//! (real, imag) f64 pairs in row-major order.

use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Read, Write},
    path::Path,
    sync::Arc,
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, trace};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use super::{buffer::CfBufferAxes, CfBuffer, CfCell, CfCellInfo, CfStore2, PersistError};
use crate::{c64, coord::ImageGeometry, vis::BaselineType};

/// The prefix given to the files of a weight store.
pub const WEIGHT_QUALIFIER: &str = "WT";

const INDEX_FILE: &str = "cfstore.json";
const BUFFER_FILE: &str = "buffer.json";
const CELL_BLOB: &str = "cells.bin";
const BLOB_MAGIC: &str = "AWCFCELL";
const UV_GRID_FILE: &str = "uvgrid.json";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoreIndex {
    version: u32,
    d_pa: f64,
    pa_values: Vec<f64>,
    baseline_types: Vec<BaselineType>,
    buckets: Vec<BucketEntry>,
}

#[derive(Serialize, Deserialize)]
struct BucketEntry {
    index: [usize; 2],
    dir: String,
}

#[derive(Serialize, Deserialize)]
struct BufferFile {
    axes: CfBufferAxes,
    cells: Vec<CellEntry>,
}

#[derive(Serialize, Deserialize)]
struct CellEntry {
    index: [usize; 3],
    info: CfCellInfo,
    has_pixels: bool,
}

fn write_json<T: Serialize>(path: &Path, thing: &T) -> Result<(), PersistError> {
    let mut f = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut f, thing)?;
    f.flush()?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, PersistError> {
    let f = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(f)?)
}

impl CfStore2 {
    /// Does `dir` hold a store with this qualifier?
    pub fn exists(dir: &Path, qualifier: &str) -> bool {
        dir.join(format!("{qualifier}{INDEX_FILE}")).exists()
    }

    /// Write every bucket of this store under `dir`. Cells without pixels are
    /// written as metadata only.
    pub fn make_persistent(&self, dir: &Path, qualifier: &str) -> Result<(), PersistError> {
        std::fs::create_dir_all(dir)?;
        let mut buckets = vec![];
        for ([i_pa, i_bl], buffer) in self.buffers() {
            let name = format!("{qualifier}CFS_{i_pa}_{i_bl}");
            write_buffer(&dir.join(&name), buffer)?;
            buckets.push(BucketEntry {
                index: [i_pa, i_bl],
                dir: name,
            });
        }
        let index = StoreIndex {
            version: FORMAT_VERSION,
            d_pa: self.d_pa,
            pa_values: self.pa_values.clone(),
            baseline_types: self.baseline_types.clone(),
            buckets,
        };
        write_json(&dir.join(format!("{qualifier}{INDEX_FILE}")), &index)?;
        debug!(
            "Wrote {}CF store with {} buckets to {}",
            qualifier,
            index.buckets.len(),
            dir.display()
        );
        Ok(())
    }

    /// Read a store from `dir`. If `with_pixels` is false, only the metadata
    /// is read and every cell comes back without pixels.
    pub fn load(dir: &Path, qualifier: &str, with_pixels: bool) -> Result<CfStore2, PersistError> {
        let index_path = dir.join(format!("{qualifier}{INDEX_FILE}"));
        if !index_path.exists() {
            return Err(PersistError::MissingIndex(index_path));
        }
        let index: StoreIndex = read_json(&index_path)?;
        let mut store = CfStore2 {
            pa_values: index.pa_values,
            d_pa: index.d_pa,
            baseline_types: index.baseline_types,
            buffers: vec![],
        };
        let [n_pa, n_bl] = store.shape();
        store.buffers = vec![None; n_pa * n_bl];
        for entry in index.buckets {
            let [i_pa, i_bl] = entry.index;
            if i_pa >= n_pa || i_bl >= n_bl {
                return Err(PersistError::BadBucket {
                    file: index_path.display().to_string(),
                    index: entry.index,
                    shape: [n_pa, n_bl],
                });
            }
            let buffer = read_buffer(&dir.join(&entry.dir), with_pixels)?;
            store.buffers[i_pa * n_bl + i_bl] = Some(Arc::new(buffer));
        }
        debug!(
            "Read {}CF store of shape {:?} from {}",
            qualifier,
            store.shape(),
            dir.display()
        );
        Ok(store)
    }
}

fn write_buffer(dir: &Path, buffer: &CfBuffer) -> Result<(), PersistError> {
    std::fs::create_dir_all(dir)?;
    let filled: Vec<&Array2<c64>> = buffer
        .cells()
        .filter_map(|(_, c)| c.unrotated_pixels())
        .collect();

    let mut bin = BufWriter::new(File::create(dir.join(CELL_BLOB))?);
    bin.write_all(BLOB_MAGIC.as_bytes())?;
    bin.write_u32::<LittleEndian>(filled.len() as u32)?;
    for pixels in filled {
        let (nx, ny) = pixels.dim();
        bin.write_u32::<LittleEndian>(nx as u32)?;
        bin.write_u32::<LittleEndian>(ny as u32)?;
        for v in pixels.iter() {
            bin.write_f64::<LittleEndian>(v.re)?;
            bin.write_f64::<LittleEndian>(v.im)?;
        }
    }
    bin.flush()?;

    let file = BufferFile {
        axes: buffer.axes(),
        cells: buffer
            .cells()
            .map(|(index, c)| CellEntry {
                index,
                info: c.info.clone(),
                has_pixels: c.unrotated_pixels().is_some(),
            })
            .collect(),
    };
    write_json(&dir.join(BUFFER_FILE), &file)?;
    trace!("Wrote CF bucket {}", dir.display());
    Ok(())
}

fn read_buffer(dir: &Path, with_pixels: bool) -> Result<CfBuffer, PersistError> {
    let file: BufferFile = read_json(&dir.join(BUFFER_FILE))?;
    let mut buffer = CfBuffer::from_axes(file.axes);

    let blob_path = dir.join(CELL_BLOB);
    let blob_str = blob_path.display().to_string();
    let mut bin = if with_pixels {
        let mut bin = BufReader::new(File::open(&blob_path)?);
        let mut magic = [0; 8];
        bin.read_exact(&mut magic)?;
        if magic != BLOB_MAGIC.as_bytes() {
            return Err(PersistError::BadMagic {
                file: blob_str,
                expected: BLOB_MAGIC,
                got: String::from_utf8_lossy(&magic).to_string(),
            });
        }
        let _num_kernels = bin.read_u32::<LittleEndian>()?;
        Some(bin)
    } else {
        None
    };

    for entry in file.cells {
        let mut cell = CfCell::new(entry.info);
        if let (true, Some(bin)) = (entry.has_pixels, bin.as_mut()) {
            if cell.info.shape.is_none() {
                return Err(PersistError::NoShape {
                    file: blob_str,
                    index: entry.index,
                });
            }
            cell.pixels = Some(read_kernel(bin, &blob_str)?);
        }
        if buffer.set_cell(entry.index, cell).is_err() {
            return Err(PersistError::BadCell {
                file: dir.join(BUFFER_FILE).display().to_string(),
                index: entry.index,
            });
        }
    }
    Ok(buffer)
}

fn read_kernel<R: Read>(bin: &mut R, file: &str) -> Result<Array2<c64>, PersistError> {
    let nx = bin.read_u32::<LittleEndian>()? as usize;
    let ny = bin.read_u32::<LittleEndian>()? as usize;
    let mut raw = vec![0.0; 2 * nx * ny];
    bin.read_f64_into::<LittleEndian>(&mut raw).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            PersistError::Truncated {
                file: file.to_string(),
                expected: nx * ny,
            }
        } else {
            PersistError::IO(e)
        }
    })?;
    let values: Vec<c64> = raw.chunks_exact(2).map(|c| c64::new(c[0], c[1])).collect();
    // The length is right by construction.
    Array2::from_shape_vec((nx, ny), values).map_err(|_| PersistError::Truncated {
        file: file.to_string(),
        expected: nx * ny,
    })
}

/// Save the sky image geometry that a cache was made for.
pub fn save_uv_grid(dir: &Path, image: &ImageGeometry) -> Result<(), PersistError> {
    std::fs::create_dir_all(dir)?;
    write_json(&dir.join(UV_GRID_FILE), image)
}

/// Read the sky image geometry that a cache was made for.
pub fn load_uv_grid(dir: &Path) -> Result<ImageGeometry, PersistError> {
    let path = dir.join(UV_GRID_FILE);
    if !path.exists() {
        return Err(PersistError::MissingIndex(path));
    }
    read_json(&path)
}
