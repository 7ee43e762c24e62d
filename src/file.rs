use super::constants::*;
use super::directory::{build_directory, DirectoryStrategy};
use super::error::{Error, Result};
use super::matrix::{split_name_list, FloatMatrix, NamedMatrix};
use super::tag::{DirEntry, Tag, TagData};
use super::tree::{build_tree, BlockId, Tree};
/// Opened FIFF file: directory, tree and tag access
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

/// A FIFF file opened for reading.
///
/// Directory and tree are immutable once built and can be handed to other
/// threads through [`FiffFile::shared_tree`]; reading payloads needs the
/// session itself, one reader at a time.
#[derive(Debug)]
pub struct FiffFile<R = BufReader<File>> {
    reader: R,
    directory: Arc<[DirEntry]>,
    tree: Arc<Tree>,
    strategy: DirectoryStrategy,
}

impl FiffFile<BufReader<File>> {
    /// Open and parse a FIFF file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("opening {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> FiffFile<R> {
    /// Build directory and tree over any seekable source.
    ///
    /// Any decode failure aborts the whole open; no partial tree is returned.
    pub fn from_reader(mut reader: R) -> Result<Self> {
        let (directory, strategy) = build_directory(&mut reader)?;
        let tree = build_tree(&mut reader, &directory)?;
        Ok(FiffFile {
            reader,
            directory: directory.into(),
            tree: Arc::new(tree),
            strategy,
        })
    }

    pub fn directory(&self) -> &[DirEntry] {
        &self.directory
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Shared handle on the tree for other threads or viewers.
    pub fn shared_tree(&self) -> Arc<Tree> {
        Arc::clone(&self.tree)
    }

    pub fn strategy(&self) -> DirectoryStrategy {
        self.strategy
    }

    /// Read the full tag a directory entry points at.
    ///
    /// The header on disk must agree with the entry in kind, type and size.
    pub fn read_tag(&mut self, entry: &DirEntry) -> Result<Tag> {
        let tag = Tag::read_at(&mut self.reader, entry.pos)?;
        if (tag.kind, tag.type_, tag.size) != (entry.kind, entry.type_, entry.size) {
            return Err(Error::EntryMismatch {
                pos: entry.pos,
                kind: entry.kind,
                type_: entry.type_,
                size: entry.size,
                found_kind: tag.kind,
                found_type: tag.type_,
                found_size: tag.size,
            });
        }
        Ok(tag)
    }

    pub fn read_data(&mut self, entry: &DirEntry) -> Result<TagData> {
        self.read_tag(entry)?.decode()
    }

    /// First tag of `kind` directly under `block`, if any.
    pub fn find_tag(&mut self, block: BlockId, kind: i32) -> Result<Option<Tag>> {
        match self.tree.first_tag(block, kind).copied() {
            Some(entry) => self.read_tag(&entry).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`FiffFile::find_tag`] but the tag is mandatory.
    pub fn require_tag(&mut self, block: BlockId, kind: i32) -> Result<Tag> {
        self.find_tag(block, kind)?.ok_or(Error::MissingTag { kind })
    }

    /// All tags of `kind` directly under `block`, in document order.
    pub fn read_tags(&mut self, block: BlockId, kind: i32) -> Result<Vec<Tag>> {
        let entries: Vec<DirEntry> = self.tree.tags(block, kind).copied().collect();
        entries.iter().map(|e| self.read_tag(e)).collect()
    }

    /// Read a named matrix stored under `block` with matrix tag `kind`.
    ///
    /// The matrix is looked up in a `FIFFB_MNE_NAMED_MATRIX` child holding
    /// `kind` first, then in `block` itself.
    pub fn read_named_matrix(&mut self, block: BlockId, kind: i32) -> Result<NamedMatrix> {
        let tree = Arc::clone(&self.tree);
        let node = tree
            .block(block)
            .blocks()
            .find(|&child| {
                tree.block(child).kind == FIFFB_MNE_NAMED_MATRIX
                    && tree.first_tag(child, kind).is_some()
            })
            .unwrap_or(block);

        let data: FloatMatrix = self.require_tag(node, kind)?.as_matrix()?;

        if let Some(tag) = self.find_tag(node, FIFF_MNE_NROW)? {
            let nrow = tag.as_i32()? as usize;
            if nrow != data.rows() {
                return Err(Error::DimensionMismatch {
                    what: "named matrix rows",
                    expected: nrow,
                    actual: data.rows(),
                });
            }
        }
        if let Some(tag) = self.find_tag(node, FIFF_MNE_NCOL)? {
            let ncol = tag.as_i32()? as usize;
            if ncol != data.cols() {
                return Err(Error::DimensionMismatch {
                    what: "named matrix columns",
                    expected: ncol,
                    actual: data.cols(),
                });
            }
        }

        let row_names = match self.find_tag(node, FIFF_MNE_ROW_NAMES)? {
            Some(tag) => split_name_list(&tag.as_string()?),
            None => Vec::new(),
        };
        let col_names = match self.find_tag(node, FIFF_MNE_COL_NAMES)? {
            Some(tag) => split_name_list(&tag.as_string()?),
            None => Vec::new(),
        };

        NamedMatrix::new(row_names, col_names, data)
    }

    /// Release the session, handing back the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}
