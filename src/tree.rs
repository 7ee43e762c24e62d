use super::constants::*;
use super::error::{Error, Result};
use super::tag::{DirEntry, TagHeader};
use byteorder::{BigEndian, ReadBytesExt};
/// FIFF block tree
///
/// Blocks live in an arena and refer to each other by index, so the tree can
/// be shared read-only once built.
use std::io::{Read, Seek};

/// Index of a block inside a [`Tree`].
pub type BlockId = usize;

/// One child of a block, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Block(BlockId),
    Tag(DirEntry),
}

/// FIFF block node
#[derive(Debug, Clone)]
pub struct Block {
    /// Kind carried by the block start marker (`FIFFB_ROOT` for the root).
    pub kind: i32,
    pub parent: Option<BlockId>,
    pub children: Vec<Child>,
}

impl Block {
    fn new(kind: i32, parent: Option<BlockId>) -> Self {
        Block {
            kind,
            parent,
            children: Vec::new(),
        }
    }

    /// Leaf tags directly under this block.
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.children.iter().filter_map(|child| match child {
            Child::Tag(entry) => Some(entry),
            Child::Block(_) => None,
        })
    }

    /// Sub-blocks directly under this block.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.children.iter().filter_map(|child| match child {
            Child::Block(id) => Some(*id),
            Child::Tag(_) => None,
        })
    }

    pub fn nent(&self) -> usize {
        self.entries().count()
    }
}

/// Reconstructed block tree; block `0` is the implicit root.
#[derive(Debug, Clone)]
pub struct Tree {
    blocks: Vec<Block>,
}

impl Tree {
    pub const ROOT: BlockId = 0;

    pub fn root(&self) -> &Block {
        &self.blocks[Self::ROOT]
    }

    /// Panics on an id that did not come from this tree.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Number of blocks, not counting the root.
    pub fn block_count(&self) -> usize {
        self.blocks.len() - 1
    }

    /// Depth-first, document-order search for blocks of `kind` below and
    /// including `from`.
    pub fn find_blocks(&self, from: BlockId, kind: i32) -> Vec<BlockId> {
        let mut results = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let block = &self.blocks[id];
            if block.kind == kind {
                results.push(id);
            }
            let children: Vec<BlockId> = block.blocks().collect();
            stack.extend(children.into_iter().rev());
        }
        results
    }

    /// First block of `kind` at any depth under `from`.
    pub fn find_block(&self, from: BlockId, kind: i32) -> Option<BlockId> {
        self.find_blocks(from, kind).into_iter().next()
    }

    /// All leaf tags of `kind` directly under `block`.
    pub fn tags(&self, block: BlockId, kind: i32) -> impl Iterator<Item = &DirEntry> {
        self.blocks[block].entries().filter(move |e| e.kind == kind)
    }

    pub fn first_tag(&self, block: BlockId, kind: i32) -> Option<&DirEntry> {
        self.tags(block, kind).next()
    }

    /// Walk up from `id` to the root.
    pub fn ancestors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        std::iter::successors(self.blocks[id].parent, move |&p| self.blocks[p].parent)
    }

    /// Nesting depth of a block; the root is at depth 0.
    pub fn depth(&self, id: BlockId) -> usize {
        self.ancestors(id).count()
    }
}

/// Block kind stored in a block marker payload, if it carries one.
fn marker_kind<R: Read + Seek>(reader: &mut R, entry: &DirEntry) -> Result<Option<i32>> {
    if entry.size < 4 {
        return Ok(None);
    }
    let header = TagHeader::read_at(reader, entry.pos)?;
    if header.type_ != FIFFT_INT {
        return Err(Error::TypeMismatch {
            kind: entry.kind,
            expected: FIFFT_INT,
            actual: header.type_,
        });
    }
    Ok(Some(reader.read_i32::<BigEndian>()?))
}

/// Build the block tree from a directory in one pass.
///
/// Only the four-byte payloads of block markers are read. A block end that
/// closes nothing, or names a different kind than the innermost open block,
/// fails with `UnmatchedBlockEnd`; blocks left open fail with `UnclosedBlock`.
pub fn build_tree<R: Read + Seek>(reader: &mut R, directory: &[DirEntry]) -> Result<Tree> {
    let mut blocks = vec![Block::new(FIFFB_ROOT, None)];
    let mut stack: Vec<BlockId> = vec![Tree::ROOT];

    for entry in directory {
        let top = *stack.last().unwrap_or(&Tree::ROOT);
        match entry.kind {
            FIFF_BLOCK_START => {
                let kind = marker_kind(reader, entry)?.unwrap_or(0);
                let id = blocks.len();
                blocks.push(Block::new(kind, Some(top)));
                blocks[top].children.push(Child::Block(id));
                stack.push(id);
            }
            FIFF_BLOCK_END => {
                let declared = marker_kind(reader, entry)?;
                if stack.len() == 1 {
                    return Err(Error::UnmatchedBlockEnd {
                        kind: declared.unwrap_or(0),
                        expected: None,
                    });
                }
                let open = blocks[top].kind;
                if let Some(kind) = declared {
                    if kind != open {
                        return Err(Error::UnmatchedBlockEnd {
                            kind,
                            expected: Some(open),
                        });
                    }
                }
                stack.pop();
            }
            _ => blocks[top].children.push(Child::Tag(*entry)),
        }
    }

    if stack.len() > 1 {
        let depth = stack.len() - 1;
        let kind = blocks[stack[depth]].kind;
        return Err(Error::UnclosedBlock { kind, depth });
    }

    let tree = Tree { blocks };
    log::debug!(
        "built tree with {} top-level entries and {} blocks",
        tree.root().nent(),
        tree.block_count()
    );
    Ok(tree)
}
