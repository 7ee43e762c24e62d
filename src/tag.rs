use super::constants::*;
use super::error::{Error, Result};
use super::matrix::FloatMatrix;
use super::types::{ChannelInfo, CoordTrans, DigPoint, FileId};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
/// FIFF tag codec
///
/// A tag is a 16-byte big-endian header (`kind`, `type`, `size`, `next`)
/// followed by exactly `size` payload bytes.
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

/// Byte width of the tag header.
pub const TAG_HEADER_SIZE: usize = 16;

/// Fixed-width tag header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub kind: i32,
    pub type_: i32,
    pub size: i32,
    pub next: i32,
}

impl TagHeader {
    /// Decodes a header from the start of `bytes`; `pos` is only used for
    /// error reporting.
    pub fn decode(bytes: &[u8], pos: u64) -> Result<Self> {
        if bytes.len() < TAG_HEADER_SIZE {
            return Err(Error::MalformedHeader {
                pos,
                available: bytes.len(),
            });
        }
        let mut cursor = Cursor::new(bytes);
        Ok(TagHeader {
            kind: cursor.read_i32::<BigEndian>()?,
            type_: cursor.read_i32::<BigEndian>()?,
            size: cursor.read_i32::<BigEndian>()?,
            next: cursor.read_i32::<BigEndian>()?,
        })
    }

    /// Reads the header at `pos`, leaving the reader at the payload.
    pub fn read_at<R: Read + Seek>(reader: &mut R, pos: u64) -> Result<Self> {
        reader.seek(SeekFrom::Start(pos))?;
        let mut buf = [0u8; TAG_HEADER_SIZE];
        let mut filled = 0;
        while filled < TAG_HEADER_SIZE {
            let n = reader.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Self::decode(&buf[..filled], pos)
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(self.kind)?;
        writer.write_i32::<BigEndian>(self.type_)?;
        writer.write_i32::<BigEndian>(self.size)?;
        writer.write_i32::<BigEndian>(self.next)?;
        Ok(())
    }

    /// Payload length; a negative size cannot be skipped over.
    pub fn payload_len(&self, pos: u64) -> Result<usize> {
        usize::try_from(self.size).map_err(|_| Error::MalformedHeader {
            pos,
            available: TAG_HEADER_SIZE,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.next == FIFFV_NEXT_NONE
    }
}

/// FIFF directory entry: where a tag lives, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub kind: i32,
    pub type_: i32,
    pub size: i32,
    pub pos: u64,
}

impl DirEntry {
    pub const SIZE: usize = 16;

    /// Reads one on-disk directory record (position stored as unsigned 32-bit).
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(DirEntry {
            kind: reader.read_i32::<BigEndian>()?,
            type_: reader.read_i32::<BigEndian>()?,
            size: reader.read_i32::<BigEndian>()?,
            pos: reader.read_u32::<BigEndian>()? as u64,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(self.kind)?;
        writer.write_i32::<BigEndian>(self.type_)?;
        writer.write_i32::<BigEndian>(self.size)?;
        writer.write_u32::<BigEndian>(self.pos as u32)?;
        Ok(())
    }

    /// First byte past the tag's payload.
    pub fn end(&self) -> u64 {
        self.pos + TAG_HEADER_SIZE as u64 + self.size.max(0) as u64
    }

    pub fn is_matrix(&self) -> bool {
        self.type_ & FIFFT_MATRIX != 0
    }
}

/// Decoded tag payload, one variant per supported type.
#[derive(Debug, Clone, PartialEq)]
pub enum TagData {
    Void,
    Short(Vec<i16>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Double(Vec<f64>),
    Str(String),
    Matrix(FloatMatrix),
    Id(FileId),
    ChInfo(ChannelInfo),
    CoordTrans(CoordTrans),
    DigPoint(DigPoint),
    DirEntries(Vec<DirEntry>),
    /// Any type this crate does not interpret, kept byte-exact.
    Opaque { type_: i32, bytes: Vec<u8> },
}

impl TagData {
    /// FIFF type word this value is written with.
    pub fn fiff_type(&self) -> i32 {
        match self {
            TagData::Void => FIFFT_VOID,
            TagData::Short(_) => FIFFT_SHORT,
            TagData::Int32(_) => FIFFT_INT,
            TagData::Float32(_) => FIFFT_FLOAT,
            TagData::Double(_) => FIFFT_DOUBLE,
            TagData::Str(_) => FIFFT_STRING,
            TagData::Matrix(_) => FIFFT_MATRIX_FLOAT,
            TagData::Id(_) => FIFFT_ID_STRUCT,
            TagData::ChInfo(_) => FIFFT_CH_INFO_STRUCT,
            TagData::CoordTrans(_) => FIFFT_COORD_TRANS_STRUCT,
            TagData::DigPoint(_) => FIFFT_DIG_POINT_STRUCT,
            TagData::DirEntries(_) => FIFFT_DIR_ENTRY_STRUCT,
            TagData::Opaque { type_, .. } => *type_,
        }
    }

    /// Decodes `bytes` as a payload of `type_`. The byte count must be exact.
    pub fn decode(type_: i32, bytes: &[u8]) -> Result<Self> {
        let size = bytes.len();
        if type_ & FIFFT_MATRIX != 0 {
            return decode_matrix(type_, bytes).map(TagData::Matrix);
        }

        let elems = |width: usize| -> Result<usize> {
            if size % width != 0 {
                return Err(Error::PayloadSize { type_, size });
            }
            Ok(size / width)
        };
        let mut cursor = Cursor::new(bytes);

        let data = match type_ {
            FIFFT_VOID => {
                if size != 0 {
                    return Err(Error::PayloadSize { type_, size });
                }
                TagData::Void
            }
            FIFFT_SHORT => {
                let mut out = vec![0i16; elems(2)?];
                cursor.read_i16_into::<BigEndian>(&mut out)?;
                TagData::Short(out)
            }
            FIFFT_INT => {
                let mut out = vec![0i32; elems(4)?];
                cursor.read_i32_into::<BigEndian>(&mut out)?;
                TagData::Int32(out)
            }
            FIFFT_FLOAT => {
                let mut out = vec![0f32; elems(4)?];
                cursor.read_f32_into::<BigEndian>(&mut out)?;
                TagData::Float32(out)
            }
            FIFFT_DOUBLE => {
                let mut out = vec![0f64; elems(8)?];
                cursor.read_f64_into::<BigEndian>(&mut out)?;
                TagData::Double(out)
            }
            FIFFT_STRING => TagData::Str(String::from_utf8_lossy(bytes).into_owned()),
            FIFFT_ID_STRUCT => TagData::Id(FileId::from_bytes(bytes)?),
            FIFFT_CH_INFO_STRUCT => TagData::ChInfo(ChannelInfo::from_bytes(bytes)?),
            FIFFT_COORD_TRANS_STRUCT => TagData::CoordTrans(CoordTrans::from_bytes(bytes)?),
            FIFFT_DIG_POINT_STRUCT => TagData::DigPoint(DigPoint::from_bytes(bytes)?),
            FIFFT_DIR_ENTRY_STRUCT => {
                let n = elems(DirEntry::SIZE)?;
                let mut entries = Vec::with_capacity(n);
                for _ in 0..n {
                    entries.push(DirEntry::read(&mut cursor)?);
                }
                TagData::DirEntries(entries)
            }
            _ => TagData::Opaque {
                type_,
                bytes: bytes.to_vec(),
            },
        };
        Ok(data)
    }

    /// Serializes the payload; the exact inverse of [`TagData::decode`].
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            TagData::Void => {}
            TagData::Short(values) => {
                for v in values {
                    out.write_i16::<BigEndian>(*v)?;
                }
            }
            TagData::Int32(values) => {
                for v in values {
                    out.write_i32::<BigEndian>(*v)?;
                }
            }
            TagData::Float32(values) => {
                for v in values {
                    out.write_f32::<BigEndian>(*v)?;
                }
            }
            TagData::Double(values) => {
                for v in values {
                    out.write_f64::<BigEndian>(*v)?;
                }
            }
            TagData::Str(s) => out.extend_from_slice(s.as_bytes()),
            TagData::Matrix(m) => {
                for v in m.data() {
                    out.write_f32::<BigEndian>(*v)?;
                }
                out.write_i32::<BigEndian>(m.rows() as i32)?;
                out.write_i32::<BigEndian>(m.cols() as i32)?;
            }
            TagData::Id(id) => id.write_to(&mut out)?,
            TagData::ChInfo(ch) => ch.write_to(&mut out)?,
            TagData::CoordTrans(t) => t.write_to(&mut out)?,
            TagData::DigPoint(d) => d.write_to(&mut out)?,
            TagData::DirEntries(entries) => {
                for e in entries {
                    e.write(&mut out)?;
                }
            }
            TagData::Opaque { bytes, .. } => out.extend_from_slice(bytes),
        }
        Ok(out)
    }
}

/// Payload first, then the `(rows, cols)` trailer in the last 8 bytes.
fn decode_matrix(type_: i32, bytes: &[u8]) -> Result<FloatMatrix> {
    let size = bytes.len();
    if type_ & FIFFTS_BASE_MASK != FIFFT_FLOAT {
        return Err(Error::TypeMismatch {
            kind: 0,
            expected: FIFFT_MATRIX_FLOAT,
            actual: type_,
        });
    }
    if size < 8 {
        return Err(Error::InvalidMatrixDims {
            rows: 0,
            cols: 0,
            size,
        });
    }

    let mut trailer = Cursor::new(&bytes[size - 8..]);
    let rows = trailer.read_i32::<BigEndian>()?;
    let cols = trailer.read_i32::<BigEndian>()?;
    let expected = (rows as i64)
        .checked_mul(cols as i64)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(8));
    if rows < 0 || cols < 0 || expected != Some(size as i64) {
        return Err(Error::InvalidMatrixDims { rows, cols, size });
    }

    let mut data = vec![0f32; rows as usize * cols as usize];
    Cursor::new(&bytes[..size - 8]).read_f32_into::<BigEndian>(&mut data)?;
    FloatMatrix::new(rows as usize, cols as usize, data)
}

/// Encodes a complete tag: header followed by payload.
pub fn encode_tag(kind: i32, data: &TagData, next: i32) -> Result<Vec<u8>> {
    let payload = data.encode()?;
    let header = TagHeader {
        kind,
        type_: data.fiff_type(),
        size: payload_size(data.fiff_type(), payload.len())?,
        next,
    };
    let mut out = Vec::with_capacity(TAG_HEADER_SIZE + payload.len());
    header.write(&mut out)?;
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Payload length as stored in the header; sizes are signed 32-bit on disk.
fn payload_size(type_: i32, len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::PayloadSize { type_, size: len })
}

/// FIFF tag with its raw payload.
#[derive(Debug, Clone)]
pub struct Tag {
    pub kind: i32,
    pub type_: i32,
    pub size: i32,
    pub next: i32,
    pub data: Vec<u8>,
}

impl Tag {
    /// Read a tag from the file at `pos`.
    pub fn read_at<R: Read + Seek>(reader: &mut R, pos: u64) -> Result<Self> {
        let header = TagHeader::read_at(reader, pos)?;
        let mut data = vec![0u8; header.payload_len(pos)?];
        reader.read_exact(&mut data)?;

        Ok(Tag {
            kind: header.kind,
            type_: header.type_,
            size: header.size,
            next: header.next,
            data,
        })
    }

    /// Decode the payload according to the tag's type.
    pub fn decode(&self) -> Result<TagData> {
        TagData::decode(self.type_, &self.data).map_err(|err| match err {
            Error::TypeMismatch {
                expected, actual, ..
            } => Error::TypeMismatch {
                kind: self.kind,
                expected,
                actual,
            },
            other => other,
        })
    }

    fn expect_type(&self, expected: i32) -> Result<()> {
        if self.type_ != expected {
            return Err(Error::TypeMismatch {
                kind: self.kind,
                expected,
                actual: self.type_,
            });
        }
        Ok(())
    }

    /// First element of an int tag.
    pub fn as_i32(&self) -> Result<i32> {
        self.as_i32_vec()?
            .first()
            .copied()
            .ok_or(Error::PayloadSize {
                type_: self.type_,
                size: self.data.len(),
            })
    }

    pub fn as_i32_vec(&self) -> Result<Vec<i32>> {
        self.expect_type(FIFFT_INT)?;
        match self.decode()? {
            TagData::Int32(values) => Ok(values),
            _ => unreachable!("FIFFT_INT always decodes to Int32"),
        }
    }

    /// First element of a float tag (double tags are narrowed).
    pub fn as_f32(&self) -> Result<f32> {
        let values = match self.decode()? {
            TagData::Float32(values) => values,
            TagData::Double(values) => values.into_iter().map(|v| v as f32).collect(),
            _ => {
                return Err(Error::TypeMismatch {
                    kind: self.kind,
                    expected: FIFFT_FLOAT,
                    actual: self.type_,
                })
            }
        };
        values.first().copied().ok_or(Error::PayloadSize {
            type_: self.type_,
            size: self.data.len(),
        })
    }

    pub fn as_string(&self) -> Result<String> {
        self.expect_type(FIFFT_STRING)?;
        Ok(String::from_utf8_lossy(&self.data).into_owned())
    }

    pub fn as_matrix(&self) -> Result<FloatMatrix> {
        if self.type_ & FIFFT_MATRIX == 0 {
            return Err(Error::TypeMismatch {
                kind: self.kind,
                expected: FIFFT_MATRIX_FLOAT,
                actual: self.type_,
            });
        }
        match self.decode()? {
            TagData::Matrix(m) => Ok(m),
            _ => unreachable!("matrix-coded types always decode to Matrix"),
        }
    }

    pub fn as_channel_info(&self) -> Result<ChannelInfo> {
        self.expect_type(FIFFT_CH_INFO_STRUCT)?;
        ChannelInfo::from_bytes(&self.data)
    }

    pub fn as_coord_trans(&self) -> Result<CoordTrans> {
        self.expect_type(FIFFT_COORD_TRANS_STRUCT)?;
        CoordTrans::from_bytes(&self.data)
    }

    pub fn as_dig_point(&self) -> Result<DigPoint> {
        self.expect_type(FIFFT_DIG_POINT_STRUCT)?;
        DigPoint::from_bytes(&self.data)
    }

    pub fn as_file_id(&self) -> Result<FileId> {
        self.expect_type(FIFFT_ID_STRUCT)?;
        FileId::from_bytes(&self.data)
    }

    /// Raw data buffer as `[channel][sample]`; samples are stored
    /// interleaved, all channels of one sample after another.
    pub fn as_samples(&self, nchan: usize) -> Result<Vec<Vec<f64>>> {
        let width = type_size(self.type_).ok_or(Error::TypeMismatch {
            kind: self.kind,
            expected: FIFFT_FLOAT,
            actual: self.type_,
        })?;
        if nchan == 0 || self.data.len() % (width * nchan) != 0 {
            return Err(Error::PayloadSize {
                type_: self.type_,
                size: self.data.len(),
            });
        }

        let nsamp = self.data.len() / (width * nchan);
        let mut cursor = Cursor::new(&self.data);
        let mut samples = vec![vec![0.0f64; nsamp]; nchan];

        for samp_idx in 0..nsamp {
            for channel in samples.iter_mut() {
                channel[samp_idx] = match self.type_ {
                    FIFFT_SHORT | FIFFT_DAU_PACK16 => cursor.read_i16::<BigEndian>()? as f64,
                    FIFFT_INT => cursor.read_i32::<BigEndian>()? as f64,
                    FIFFT_FLOAT => cursor.read_f32::<BigEndian>()? as f64,
                    FIFFT_DOUBLE => cursor.read_f64::<BigEndian>()?,
                    _ => {
                        return Err(Error::TypeMismatch {
                            kind: self.kind,
                            expected: FIFFT_FLOAT,
                            actual: self.type_,
                        })
                    }
                };
            }
        }

        Ok(samples)
    }
}
