/*! FIFF (Functional Imaging File Format) reader and writer
 *
 * Pure Rust implementation of the tagged binary container used by
 * Neuromag/Elekta MEG systems and the MNE toolchain for multichannel
 * recordings: channel metadata, calibration, coordinate transforms,
 * projection and compensation matrices and continuous raw data.
 *
 * # Layout
 *
 * A FIFF file is a flat chain of 16-byte tag headers (`kind`, `type`,
 * `size`, `next`, all big-endian) each followed by its payload. Nesting is
 * expressed with `FIFF_BLOCK_START` / `FIFF_BLOCK_END` marker tags, so the
 * logical tree has to be rebuilt from the flat directory.
 *
 * # Public API
 *
 * ## Reading
 * - [`open_fiff`] / [`FiffFile::open`]: build the directory (from the index
 *   tag when present, otherwise by walking the chain) and the block tree
 * - [`Tree`]: arena of [`Block`]s with kind-indexed lookup
 * - [`MeasInfo::read`]: channels, calibration, transforms, projections
 * - [`open_raw`] / [`RawData`]: calibrated random access to raw samples
 *
 * ## Writing
 * - [`start_file`] / [`FiffWriter`]: tags, blocks, matrices, structures
 * - [`start_writing_raw`] / [`RawWriter`]: chunked raw data buffers
 *
 * ## Constants
 * All FIFF constants are re-exported from the [`constants`] module:
 * block kinds (FIFFB_*), tag kinds (FIFF_*), data types (FIFFT_*) and
 * values (FIFFV_*).
 *
 * Diagnostics go through the `log` facade; install any logger to see them.
 */

// Submodules
pub mod constants;
pub mod directory;
pub mod error;
pub mod file;
pub mod info;
pub mod matrix;
pub mod raw;
pub mod tag;
pub mod tree;
pub mod types;
pub mod writer;

// Re-exports: Public API
pub use constants::*;
pub use directory::{build_directory, DirectoryStrategy};
pub use error::{Error, Result};
pub use file::FiffFile;
pub use info::{CtfComp, MeasInfo, Projection};
pub use matrix::{FloatMatrix, NamedMatrix};
pub use raw::{RawBuffer, RawData, RawWriter, RawWriterOptions, DEFAULT_MAX_BUFFER_BYTES};
pub use tag::{DirEntry, Tag, TagData, TagHeader};
pub use tree::{build_tree, Block, BlockId, Child, Tree};
pub use types::{ChannelInfo, CoordTrans, DigPoint, FileId};
pub use writer::{FiffWriter, WriterOptions};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Open and parse a FIFF file
pub fn open_fiff(path: impl AsRef<Path>) -> Result<FiffFile> {
    FiffFile::open(path)
}

/// Open a raw recording for sample access
pub fn open_raw(path: impl AsRef<Path>) -> Result<RawData<BufReader<File>>> {
    RawData::open(path)
}

/// Create a FIFF file and write its header tags
pub fn start_file(path: impl AsRef<Path>) -> Result<FiffWriter<BufWriter<File>>> {
    FiffWriter::start_file(path)
}

/// Create a raw data file for the (optionally selected) channels of `info`
pub fn start_writing_raw(
    path: impl AsRef<Path>,
    info: &MeasInfo,
    selection: Option<&[usize]>,
    calibration: Option<&[f64]>,
) -> Result<RawWriter<BufWriter<File>>> {
    RawWriter::start_writing_raw(path, info, selection, calibration)
}
