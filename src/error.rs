//! Error type shared by the reader, the writer and the raw data stream.

use thiserror::Error;

/// Everything that can go wrong while decoding or emitting a FIFF file.
///
/// Every variant is returned to the caller as-is; nothing in the crate retries
/// or swallows a failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Fewer bytes than a full 16-byte tag header were available.
    #[error("malformed tag header at byte {pos}: only {available} of 16 header bytes available")]
    MalformedHeader { pos: u64, available: usize },

    /// The `(rows, cols)` trailer of a matrix tag disagrees with the tag size.
    #[error("invalid matrix dimensions {rows}x{cols} for a {size}-byte matrix tag")]
    InvalidMatrixDims { rows: i32, cols: i32, size: usize },

    /// A tag or a directory entry reaches outside the file, or the tag chain
    /// ends without a terminal tag.
    #[error("truncated file: tag chain breaks at byte {pos} of {file_len}")]
    TruncatedFile { pos: u64, file_len: u64 },

    /// The tag found on disk is not the one its directory entry describes.
    #[error("tag at byte {pos} is kind {found_kind}/type {found_type}/{found_size} bytes, directory says {kind}/{type_}/{size}")]
    EntryMismatch {
        pos: u64,
        kind: i32,
        type_: i32,
        size: i32,
        found_kind: i32,
        found_type: i32,
        found_size: i32,
    },

    /// A block end with no open block, or closing a different block kind.
    #[error("unmatched block end for kind {kind} (open block: {expected:?})")]
    UnmatchedBlockEnd { kind: i32, expected: Option<i32> },

    /// A block start that is never closed before the end of the directory.
    #[error("block of kind {kind} at depth {depth} is never closed")]
    UnclosedBlock { kind: i32, depth: usize },

    /// `end_file` was called while blocks were still open.
    #[error("cannot end file with open blocks {open:?}")]
    UnclosedBlocks { open: Vec<i32> },

    /// `end_block` was called with a kind other than the innermost open block.
    #[error("end_block({kind}) does not match the innermost open block {open:?}")]
    BlockStackMismatch { kind: i32, open: Option<i32> },

    /// Argument shapes disagree (matrix vs. names, samples vs. channels, ...).
    #[error("{what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A label that a colon separated name list cannot carry.
    #[error("name {name:?} cannot be stored in a name list")]
    InvalidName { name: String },

    /// No measurement info block or no channel records in it.
    #[error("no channel information found")]
    MissingChannelInfo,

    /// The number of channel records does not match the declared channel count.
    #[error("calibration available for {found} channels, expected {nchan}")]
    MissingCalibration { nchan: usize, found: usize },

    /// A sample request outside `[first_samp, last_samp]` or with `first > last`.
    #[error("samples {first}..={last} outside of recorded range {first_samp}..={last_samp}")]
    SampleRangeOutOfBounds {
        first: i64,
        last: i64,
        first_samp: i64,
        last_samp: i64,
    },

    /// The payload length cannot hold a whole number of elements of its type.
    #[error("payload of {size} bytes is not valid for tag type {type_}")]
    PayloadSize { type_: i32, size: usize },

    /// A tag was decoded under a type it does not carry.
    #[error("tag kind {kind} has type {actual}, expected {expected}")]
    TypeMismatch { kind: i32, expected: i32, actual: i32 },

    /// A mandatory tag is absent from its block.
    #[error("required tag kind {kind} not found")]
    MissingTag { kind: i32 },

    /// The first tag of the file is not a file id tag.
    #[error("not a FIFF file: first tag has kind {kind}")]
    NotFiff { kind: i32 },

    /// A zero or non-finite calibration factor on the write path.
    #[error("invalid calibration {value} for channel {channel}")]
    InvalidCalibration { channel: usize, value: f64 },

    /// A write was attempted after `end_file`.
    #[error("file has already been ended")]
    WriterFinished,

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
