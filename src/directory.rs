use super::constants::*;
use super::error::{Error, Result};
use super::tag::{DirEntry, TagData, TagHeader, TAG_HEADER_SIZE};
/// FIFF directory building
///
/// Produces the flat, ordered list of tags in a file without touching their
/// payloads, either from the index tag the file points at or by following
/// the tag chain from the start of the file.
use std::io::{Read, Seek, SeekFrom};

/// How a directory was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryStrategy {
    /// Decoded from the `FIFF_DIR` tag referenced by `FIFF_DIR_POINTER`.
    Index,
    /// Reconstructed by walking the tag chain.
    Walk,
}

/// Build the directory of an open FIFF stream.
///
/// Uses the pre-built index when the file has one, otherwise walks the tags.
/// Files without an index (pointer `-1`) fall back to the walk silently.
pub fn build_directory<R: Read + Seek>(reader: &mut R) -> Result<(Vec<DirEntry>, DirectoryStrategy)> {
    let file_len = reader.seek(SeekFrom::End(0))?;

    let first = TagHeader::read_at(reader, 0)?;
    if first.kind != FIFF_FILE_ID {
        return Err(Error::NotFiff { kind: first.kind });
    }

    if let Some(dir_pos) = read_dir_pointer(reader, &first, file_len)? {
        if let Some(directory) = read_index(reader, dir_pos, file_len)? {
            log::debug!(
                "read {} directory entries from index at byte {}",
                directory.len(),
                dir_pos
            );
            return Ok((directory, DirectoryStrategy::Index));
        }
    }

    let directory = walk_tags(reader, file_len)?;
    log::debug!("built directory with {} entries by walking tags", directory.len());
    Ok((directory, DirectoryStrategy::Walk))
}

/// Position stored in the `FIFF_DIR_POINTER` tag that follows the file id.
fn read_dir_pointer<R: Read + Seek>(
    reader: &mut R,
    first: &TagHeader,
    file_len: u64,
) -> Result<Option<u64>> {
    let pos = TAG_HEADER_SIZE as u64 + first.payload_len(0)? as u64;
    if pos + TAG_HEADER_SIZE as u64 > file_len {
        return Err(Error::TruncatedFile { pos, file_len });
    }

    let header = TagHeader::read_at(reader, pos)?;
    if header.kind != FIFF_DIR_POINTER || header.type_ != FIFFT_INT || header.size != 4 {
        return Ok(None);
    }

    let mut payload = [0u8; 4];
    reader.read_exact(&mut payload)?;
    match TagData::decode(FIFFT_INT, &payload)? {
        TagData::Int32(values) if values.first().is_some_and(|&p| p > 0) => Ok(Some(values[0] as u64)),
        _ => Ok(None),
    }
}

/// Decode the `FIFF_DIR` tag at `pos`.
///
/// Returns `None` when the pointer does not lead to a directory tag, so the
/// caller can fall back to walking the file.
pub fn read_index<R: Read + Seek>(
    reader: &mut R,
    pos: u64,
    file_len: u64,
) -> Result<Option<Vec<DirEntry>>> {
    if pos + TAG_HEADER_SIZE as u64 > file_len {
        return Err(Error::TruncatedFile { pos, file_len });
    }

    let header = TagHeader::read_at(reader, pos)?;
    if header.kind != FIFF_DIR || header.type_ != FIFFT_DIR_ENTRY_STRUCT {
        log::warn!(
            "directory pointer {} leads to tag kind {} type {}, walking tags instead",
            pos,
            header.kind,
            header.type_
        );
        return Ok(None);
    }

    let size = header.payload_len(pos)?;
    let end = pos + (TAG_HEADER_SIZE + size) as u64;
    if end > file_len {
        return Err(Error::TruncatedFile { pos: end, file_len });
    }

    let mut payload = vec![0u8; size];
    reader.read_exact(&mut payload)?;
    let directory = match TagData::decode(FIFFT_DIR_ENTRY_STRUCT, &payload)? {
        TagData::DirEntries(entries) => entries,
        _ => return Ok(None),
    };

    // Every entry has to describe a tag inside the file.
    if let Some(bad) = directory.iter().find(|e| e.size < 0 || e.end() > file_len) {
        return Err(Error::TruncatedFile {
            pos: bad.pos,
            file_len,
        });
    }

    Ok(Some(directory))
}

/// Follow the tag chain from byte 0 up to and including the terminal tag.
///
/// A `next` of `FIFFV_NEXT_SEQ` continues right after the payload, a positive
/// `next` jumps forward, `FIFFV_NEXT_NONE` ends the chain. Running off the end
/// of the file before a terminal tag is a truncation.
pub fn walk_tags<R: Read + Seek>(reader: &mut R, file_len: u64) -> Result<Vec<DirEntry>> {
    let mut directory = Vec::new();
    let mut pos = 0u64;

    loop {
        if pos + TAG_HEADER_SIZE as u64 > file_len {
            return Err(Error::TruncatedFile { pos, file_len });
        }

        let header = TagHeader::read_at(reader, pos)?;
        let entry = DirEntry {
            kind: header.kind,
            type_: header.type_,
            size: header.size,
            pos,
        };
        if header.size < 0 || entry.end() > file_len {
            return Err(Error::TruncatedFile { pos, file_len });
        }
        directory.push(entry);

        pos = match header.next {
            FIFFV_NEXT_NONE => break,
            FIFFV_NEXT_SEQ => entry.end(),
            next if next as u64 > pos => next as u64,
            // A backwards link would loop forever.
            next => {
                return Err(Error::TruncatedFile {
                    pos: next as u32 as u64,
                    file_len,
                })
            }
        };
        log::trace!("tag kind {} at {}, next at {}", entry.kind, entry.pos, pos);
    }

    Ok(directory)
}
