//! FIFF writer.
//!
//! [`FiffWriter`] emits well-formed tag sequences and tracks block nesting:
//!
//! 1. [`FiffWriter::start_file`] writes the file id, the directory pointer and
//!    the free list pointer.
//! 2. Blocks are opened and closed with [`FiffWriter::start_block`] /
//!    [`FiffWriter::end_block`]; closing anything but the innermost block is
//!    an error.
//! 3. Scalar, string, matrix and structure writers each emit one tag (named
//!    matrices emit a small block).
//! 4. [`FiffWriter::end_file`] refuses to run with open blocks, appends the
//!    directory index (unless disabled), the terminal tag, patches the
//!    directory pointer and flushes.
//!
//! A writer dropped before `end_file` leaves a file without terminal tag,
//! which readers reject as truncated.

use crate::constants::*;
use crate::error::{Error, Result};
use crate::info::{CtfComp, MeasInfo, Projection};
use crate::matrix::{check_list_name, FloatMatrix, NamedMatrix};
use crate::tag::{encode_tag, DirEntry, TagData, TAG_HEADER_SIZE};
use crate::types::{ChannelInfo, CoordTrans, DigPoint, FileId};
use byteorder::{BigEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Writer tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Append a `FIFF_DIR` index at `end_file` so readers can skip the tag walk.
    pub write_directory: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            write_directory: true,
        }
    }
}

pub struct FiffWriter<W: Write + Seek = BufWriter<File>> {
    writer: W,
    options: WriterOptions,
    file_id: FileId,
    /// Kinds of the currently open blocks, innermost last.
    blocks: Vec<i32>,
    pos: u64,
    directory: Vec<DirEntry>,
    dir_pointer_pos: u64,
    finished: bool,
}

impl FiffWriter<BufWriter<File>> {
    /// Create `path` and write the compulsory header tags.
    pub fn start_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::start_file_with_options(path, WriterOptions::default())
    }

    pub fn start_file_with_options(path: impl AsRef<Path>, options: WriterOptions) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("starting FIFF file {}", path.display());
        let file = File::create(path)?;
        Self::with_options(BufWriter::new(file), options)
    }
}

impl<W: Write + Seek> FiffWriter<W> {
    pub fn new(writer: W) -> Result<Self> {
        Self::with_options(writer, WriterOptions::default())
    }

    pub fn with_options(mut writer: W, options: WriterOptions) -> Result<Self> {
        writer.seek(SeekFrom::Start(0))?;
        let mut out = FiffWriter {
            writer,
            options,
            file_id: FileId::generate(),
            blocks: Vec::new(),
            pos: 0,
            directory: Vec::new(),
            dir_pointer_pos: 0,
            finished: false,
        };

        let id = out.file_id;
        out.write_id(FIFF_FILE_ID, Some(&id))?;
        out.dir_pointer_pos = out.pos + TAG_HEADER_SIZE as u64;
        out.write_int(FIFF_DIR_POINTER, &[-1])?;
        out.write_int(FIFF_FREE_LIST, &[-1])?;
        Ok(out)
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// Byte offset the next tag will be written at.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn open_blocks(&self) -> &[i32] {
        &self.blocks
    }

    /// Tags emitted so far, in order.
    pub fn directory(&self) -> &[DirEntry] {
        &self.directory
    }

    fn emit(&mut self, kind: i32, data: &TagData, next: i32) -> Result<DirEntry> {
        if self.finished {
            return Err(Error::WriterFinished);
        }
        let bytes = encode_tag(kind, data, next)?;
        self.writer.write_all(&bytes)?;

        let entry = DirEntry {
            kind,
            type_: data.fiff_type(),
            size: (bytes.len() - TAG_HEADER_SIZE) as i32,
            pos: self.pos,
        };
        self.directory.push(entry);
        self.pos += bytes.len() as u64;
        Ok(entry)
    }

    /// Emit one tag carrying `data`.
    pub fn write_tag(&mut self, kind: i32, data: &TagData) -> Result<DirEntry> {
        self.emit(kind, data, FIFFV_NEXT_SEQ)
    }

    pub fn start_block(&mut self, kind: i32) -> Result<()> {
        self.write_int(FIFF_BLOCK_START, &[kind])?;
        self.blocks.push(kind);
        log::trace!("start block {} at depth {}", kind, self.blocks.len());
        Ok(())
    }

    pub fn end_block(&mut self, kind: i32) -> Result<()> {
        let open = self.blocks.last().copied();
        if open != Some(kind) {
            return Err(Error::BlockStackMismatch { kind, open });
        }
        self.write_int(FIFF_BLOCK_END, &[kind])?;
        self.blocks.pop();
        log::trace!("end block {}", kind);
        Ok(())
    }

    pub fn write_int(&mut self, kind: i32, data: &[i32]) -> Result<()> {
        self.write_tag(kind, &TagData::Int32(data.to_vec())).map(drop)
    }

    pub fn write_float(&mut self, kind: i32, data: &[f32]) -> Result<()> {
        self.write_tag(kind, &TagData::Float32(data.to_vec())).map(drop)
    }

    pub fn write_double(&mut self, kind: i32, data: &[f64]) -> Result<()> {
        self.write_tag(kind, &TagData::Double(data.to_vec())).map(drop)
    }

    pub fn write_string(&mut self, kind: i32, data: &str) -> Result<()> {
        self.write_tag(kind, &TagData::Str(data.to_string())).map(drop)
    }

    /// Write an id structure; a fresh id is generated when none is given.
    pub fn write_id(&mut self, kind: i32, id: Option<&FileId>) -> Result<()> {
        let id = id.copied().unwrap_or_else(FileId::generate);
        self.write_tag(kind, &TagData::Id(id)).map(drop)
    }

    /// Row-major float32 payload followed by the `(rows, cols)` trailer.
    pub fn write_float_matrix(&mut self, kind: i32, matrix: &FloatMatrix) -> Result<()> {
        self.write_tag(kind, &TagData::Matrix(matrix.clone())).map(drop)
    }

    /// Colon separated list of names.
    pub fn write_name_list<S: AsRef<str>>(&mut self, kind: i32, names: &[S]) -> Result<()> {
        for name in names {
            check_list_name(name.as_ref())?;
        }
        let joined = names.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(":");
        self.write_string(kind, &joined)
    }

    /// Matrix plus its labels, wrapped in a `FIFFB_MNE_NAMED_MATRIX` block.
    pub fn write_named_matrix(&mut self, kind: i32, matrix: &NamedMatrix) -> Result<()> {
        matrix.validate()?;
        self.start_block(FIFFB_MNE_NAMED_MATRIX)?;
        self.write_int(FIFF_MNE_NROW, &[matrix.nrow() as i32])?;
        self.write_int(FIFF_MNE_NCOL, &[matrix.ncol() as i32])?;
        if !matrix.row_names.is_empty() {
            self.write_name_list(FIFF_MNE_ROW_NAMES, &matrix.row_names)?;
        }
        if !matrix.col_names.is_empty() {
            self.write_name_list(FIFF_MNE_COL_NAMES, &matrix.col_names)?;
        }
        self.write_float_matrix(kind, &matrix.data)?;
        self.end_block(FIFFB_MNE_NAMED_MATRIX)
    }

    pub fn write_ch_info(&mut self, ch: &ChannelInfo) -> Result<()> {
        self.write_tag(FIFF_CH_INFO, &TagData::ChInfo(ch.clone())).map(drop)
    }

    pub fn write_coord_trans(&mut self, trans: &CoordTrans) -> Result<()> {
        self.write_tag(FIFF_COORD_TRANS, &TagData::CoordTrans(trans.clone()))
            .map(drop)
    }

    pub fn write_dig_point(&mut self, point: &DigPoint) -> Result<()> {
        self.write_tag(FIFF_DIG_POINT, &TagData::DigPoint(*point)).map(drop)
    }

    /// SSP projection items inside one `FIFFB_PROJ` block.
    pub fn write_proj(&mut self, projs: &[Projection]) -> Result<()> {
        if projs.is_empty() {
            return Ok(());
        }
        for proj in projs {
            if proj.data.col_names.len() != proj.data.ncol() {
                return Err(Error::DimensionMismatch {
                    what: "projection channel names",
                    expected: proj.data.ncol(),
                    actual: proj.data.col_names.len(),
                });
            }
        }

        self.start_block(FIFFB_PROJ)?;
        for proj in projs {
            self.start_block(FIFFB_PROJ_ITEM)?;
            self.write_string(FIFF_NAME, &proj.desc)?;
            self.write_int(FIFF_PROJ_ITEM_KIND, &[proj.kind])?;
            if proj.kind == FIFFV_PROJ_ITEM_FIELD {
                self.write_float(FIFF_PROJ_ITEM_TIME, &[0.0])?;
            }
            self.write_int(FIFF_NCHAN, &[proj.data.ncol() as i32])?;
            self.write_int(FIFF_PROJ_ITEM_NVEC, &[proj.data.nrow() as i32])?;
            self.write_int(FIFF_MNE_PROJ_ITEM_ACTIVE, &[proj.active as i32])?;
            self.write_name_list(FIFF_PROJ_ITEM_CH_NAME_LIST, &proj.data.col_names)?;
            self.write_float_matrix(FIFF_PROJ_ITEM_VECTORS, &proj.data.data)?;
            self.end_block(FIFFB_PROJ_ITEM)?;
        }
        self.end_block(FIFFB_PROJ)
    }

    /// CTF compensation matrices inside one `FIFFB_MNE_CTF_COMP` block.
    pub fn write_ctf_comp(&mut self, comps: &[CtfComp]) -> Result<()> {
        if comps.is_empty() {
            return Ok(());
        }
        self.start_block(FIFFB_MNE_CTF_COMP)?;
        for comp in comps {
            self.start_block(FIFFB_MNE_CTF_COMP_DATA)?;
            self.write_int(FIFF_MNE_CTF_COMP_KIND, &[comp.kind])?;
            self.write_int(FIFF_MNE_CTF_COMP_CALIBRATED, &[comp.calibrated as i32])?;
            self.write_named_matrix(FIFF_MNE_CTF_COMP_DATA, &comp.data)?;
            self.end_block(FIFFB_MNE_CTF_COMP_DATA)?;
        }
        self.end_block(FIFFB_MNE_CTF_COMP)
    }

    /// Complete `FIFFB_MEAS_INFO` block.
    pub fn write_meas_info(&mut self, info: &MeasInfo) -> Result<()> {
        if info.channels.len() != info.nchan {
            return Err(Error::DimensionMismatch {
                what: "channel records",
                expected: info.nchan,
                actual: info.channels.len(),
            });
        }

        self.start_block(FIFFB_MEAS_INFO)?;

        if !info.bads.is_empty() {
            self.start_block(FIFFB_MNE_BAD_CHANNELS)?;
            self.write_name_list(FIFF_MNE_CH_NAME_LIST, &info.bads)?;
            self.end_block(FIFFB_MNE_BAD_CHANNELS)?;
        }

        if let Some(id) = &info.meas_id {
            self.write_id(FIFF_BLOCK_ID, Some(id))?;
        }
        if let Some(date) = info.meas_date {
            self.write_int(FIFF_MEAS_DATE, &date)?;
        }
        self.write_int(FIFF_NCHAN, &[info.nchan as i32])?;
        self.write_float(FIFF_SFREQ, &[info.sfreq as f32])?;
        if let Some(lowpass) = info.lowpass {
            self.write_float(FIFF_LOWPASS, &[lowpass as f32])?;
        }
        if let Some(highpass) = info.highpass {
            self.write_float(FIFF_HIGHPASS, &[highpass as f32])?;
        }
        if let Some(line_freq) = info.line_freq {
            self.write_float(FIFF_LINE_FREQ, &[line_freq as f32])?;
        }
        if let Some(experimenter) = &info.experimenter {
            self.write_string(FIFF_EXPERIMENTER, experimenter)?;
        }
        if let Some(description) = &info.description {
            self.write_string(FIFF_DESCRIPTION, description)?;
        }
        for trans in &info.coord_trans {
            self.write_coord_trans(trans)?;
        }
        for ch in &info.channels {
            self.write_ch_info(ch)?;
        }

        if !info.dig.is_empty() {
            self.start_block(FIFFB_ISOTRAK)?;
            for point in &info.dig {
                self.write_dig_point(point)?;
            }
            self.end_block(FIFFB_ISOTRAK)?;
        }
        self.write_proj(&info.projs)?;
        self.write_ctf_comp(&info.comps)?;

        self.end_block(FIFFB_MEAS_INFO)
    }

    /// Close the file: directory index, terminal tag, pointer patch, flush.
    pub fn end_file(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::WriterFinished);
        }
        if !self.blocks.is_empty() {
            return Err(Error::UnclosedBlocks {
                open: self.blocks.clone(),
            });
        }

        let dir_pos = self.pos;
        let with_directory = self.options.write_directory && dir_pos <= i32::MAX as u64;
        if self.options.write_directory && !with_directory {
            log::warn!("file exceeds 2 GiB, writing it without a directory index");
        }

        if with_directory {
            let dir_size = (self.directory.len() + 2) * DirEntry::SIZE;
            let mut entries = self.directory.clone();
            entries.push(DirEntry {
                kind: FIFF_DIR,
                type_: FIFFT_DIR_ENTRY_STRUCT,
                size: dir_size as i32,
                pos: dir_pos,
            });
            entries.push(DirEntry {
                kind: FIFF_NOP,
                type_: FIFFT_VOID,
                size: 0,
                pos: dir_pos + (TAG_HEADER_SIZE + dir_size) as u64,
            });
            self.write_tag(FIFF_DIR, &TagData::DirEntries(entries))?;
        }

        self.emit(FIFF_NOP, &TagData::Void, FIFFV_NEXT_NONE)?;

        if with_directory {
            self.writer.seek(SeekFrom::Start(self.dir_pointer_pos))?;
            self.writer.write_i32::<BigEndian>(dir_pos as i32)?;
            self.writer.seek(SeekFrom::Start(self.pos))?;
        }
        self.writer.flush()?;
        self.finished = true;
        log::debug!("ended file with {} tags", self.directory.len());
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Hand back the underlying writer. Without a prior `end_file` the
    /// output stays unterminated.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{build_directory, DirectoryStrategy};
    use crate::file::FiffFile;
    use crate::tree::Tree;
    use std::io::Cursor;

    fn writer() -> FiffWriter<Cursor<Vec<u8>>> {
        FiffWriter::new(Cursor::new(Vec::new())).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let mut w = writer();
        w.end_file().unwrap();
        let kinds: Vec<i32> = w.directory().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![FIFF_FILE_ID, FIFF_DIR_POINTER, FIFF_FREE_LIST, FIFF_DIR, FIFF_NOP]
        );
        assert_eq!(w.directory()[1].pos, 36);

        let bytes = w.into_inner().into_inner();
        // directory pointer patched to the FIFF_DIR tag after the three header tags
        assert_eq!(&bytes[52..56], &76i32.to_be_bytes());
        // terminal tag carries the NONE link
        let n = bytes.len();
        assert_eq!(&bytes[n - 4..], &FIFFV_NEXT_NONE.to_be_bytes());
    }

    #[test]
    fn test_end_block_mismatch() {
        let mut w = writer();
        w.start_block(FIFFB_MEAS).unwrap();
        w.start_block(FIFFB_MEAS_INFO).unwrap();
        assert!(matches!(
            w.end_block(FIFFB_MEAS),
            Err(Error::BlockStackMismatch {
                kind: FIFFB_MEAS,
                open: Some(FIFFB_MEAS_INFO)
            })
        ));
        // the failed call leaves the stack untouched
        assert_eq!(w.open_blocks(), &[FIFFB_MEAS, FIFFB_MEAS_INFO]);
    }

    #[test]
    fn test_end_block_on_empty_stack() {
        let mut w = writer();
        assert!(matches!(
            w.end_block(FIFFB_MEAS),
            Err(Error::BlockStackMismatch { open: None, .. })
        ));
    }

    #[test]
    fn test_end_file_with_open_blocks() {
        let mut w = writer();
        w.start_block(FIFFB_MEAS).unwrap();
        assert!(matches!(
            w.end_file(),
            Err(Error::UnclosedBlocks { ref open }) if open == &vec![FIFFB_MEAS]
        ));
        assert!(!w.is_finished());

        // nothing terminal was written, so the output does not parse
        let bytes = w.into_inner().into_inner();
        assert!(matches!(
            FiffFile::from_reader(Cursor::new(bytes)),
            Err(Error::TruncatedFile { .. })
        ));
    }

    #[test]
    fn test_writes_after_end_rejected() {
        let mut w = writer();
        w.end_file().unwrap();
        assert!(matches!(w.write_int(FIFF_NCHAN, &[1]), Err(Error::WriterFinished)));
        assert!(matches!(w.end_file(), Err(Error::WriterFinished)));
    }

    #[test]
    fn test_index_and_walk_agree() {
        let mut w = writer();
        w.start_block(FIFFB_MEAS).unwrap();
        w.write_string(FIFF_DESCRIPTION, "index test").unwrap();
        w.write_float_matrix(FIFF_PROJ_ITEM_VECTORS, &FloatMatrix::zeros(3, 4))
            .unwrap();
        w.end_block(FIFFB_MEAS).unwrap();
        w.end_file().unwrap();
        let written = w.directory().to_vec();
        let bytes = w.into_inner().into_inner();

        let (indexed, strategy) = build_directory(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(strategy, DirectoryStrategy::Index);
        assert_eq!(indexed, written);

        let walked = crate::directory::walk_tags(&mut Cursor::new(&bytes), bytes.len() as u64).unwrap();
        assert_eq!(walked, indexed);
    }

    #[test]
    fn test_without_directory_option() {
        let options = WriterOptions {
            write_directory: false,
        };
        let mut w = FiffWriter::with_options(Cursor::new(Vec::new()), options).unwrap();
        w.write_int(FIFF_NCHAN, &[5]).unwrap();
        w.end_file().unwrap();
        let bytes = w.into_inner().into_inner();

        let file = FiffFile::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(file.strategy(), DirectoryStrategy::Walk);
        assert_eq!(file.tree().first_tag(Tree::ROOT, FIFF_NCHAN).map(|e| e.size), Some(4));
    }

    #[test]
    fn test_named_matrix_label_mismatch() {
        let mut w = writer();
        let bad = NamedMatrix {
            row_names: vec!["only-one".into()],
            col_names: Vec::new(),
            data: FloatMatrix::zeros(2, 2),
        };
        assert!(matches!(
            w.write_named_matrix(FIFF_MNE_CTF_COMP_DATA, &bad),
            Err(Error::DimensionMismatch { expected: 2, actual: 1, .. })
        ));
        // validation happens before anything is emitted
        assert!(w.open_blocks().is_empty());
    }

    #[test]
    fn test_name_list_joined() {
        let mut w = writer();
        w.write_name_list(FIFF_MNE_CH_NAME_LIST, &["MEG 0111", "EEG 001"]).unwrap();
        w.end_file().unwrap();
        let bytes = w.into_inner().into_inner();

        let mut file = FiffFile::from_reader(Cursor::new(bytes)).unwrap();
        let tag = file.require_tag(Tree::ROOT, FIFF_MNE_CH_NAME_LIST).unwrap();
        assert_eq!(tag.as_string().unwrap(), "MEG 0111:EEG 001");
    }

    #[test]
    fn test_name_list_rejects_separator() {
        let mut w = writer();
        assert!(matches!(
            w.write_name_list(FIFF_MNE_CH_NAME_LIST, &["MEG 0111", "A:B"]),
            Err(Error::InvalidName { .. })
        ));
        assert!(w.directory().iter().all(|e| e.kind != FIFF_MNE_CH_NAME_LIST));
    }
}
