//! End-to-end writer/reader scenarios on real files.

use fiffio::directory::walk_tags;
use fiffio::*;
use std::fs::OpenOptions;
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::tempdir;

fn three_channel_info(cals: &[f32]) -> MeasInfo {
    let channels = cals
        .iter()
        .enumerate()
        .map(|(i, &cal)| {
            let mut ch = ChannelInfo::new(format!("EEG {:03}", i + 1), FIFFV_EEG_CH, i as i32 + 1);
            ch.cal = cal;
            ch.unit = FIFF_UNIT_V;
            ch
        })
        .collect();
    MeasInfo::new(1000.0, channels)
}

fn source_signal(nchan: usize, nsamp: usize) -> Vec<Vec<f64>> {
    (0..nchan)
        .map(|c| {
            (0..nsamp)
                .map(|s| ((s as f64) * 0.01 * (c + 1) as f64).sin() * 1e-4)
                .collect()
        })
        .collect()
}

fn assert_samples_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let tol = 1e-6 * e.abs().max(1e-9);
        assert!((a - e).abs() <= tol, "sample {}: {} vs {}", i, a, e);
    }
}

#[test]
fn single_block_with_int_tag() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("block.fif");

    let mut writer = start_file(&path).unwrap();
    writer.start_block(100).unwrap();
    writer.write_int(200, &[42]).unwrap();
    writer.end_block(100).unwrap();
    writer.end_file().unwrap();
    drop(writer);

    let mut file = open_fiff(&path).unwrap();
    let root = file.tree().root();
    let blocks: Vec<BlockId> = root.blocks().collect();
    assert_eq!(blocks.len(), 1);

    let block = blocks[0];
    assert_eq!(file.tree().block(block).kind, 100);
    let leaves: Vec<DirEntry> = file.tree().block(block).entries().copied().collect();
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].kind, 200);
    assert_eq!(file.read_data(&leaves[0]).unwrap(), TagData::Int32(vec![42]));
}

#[test]
fn raw_recording_read_back_in_range() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("raw.fif");
    let info = three_channel_info(&[1.0, 2.0, 0.5]);
    let data = source_signal(3, 1000);

    let mut writer = start_writing_raw(&path, &info, None, None).unwrap();
    for start in (0..1000).step_by(200) {
        let chunk: Vec<Vec<f64>> = data.iter().map(|row| row[start..start + 200].to_vec()).collect();
        writer.write_raw_buffer(&chunk).unwrap();
    }
    assert_eq!(writer.samples_written(), 1000);
    writer.finish_writing_raw().unwrap();

    let mut raw = open_raw(&path).unwrap();
    assert_eq!(raw.nchan(), 3);
    assert_eq!(raw.cals(), &[1.0, 2.0, 0.5]);
    assert_eq!(raw.buffers().len(), 5);
    assert_eq!((raw.first_samp(), raw.last_samp()), (0, 999));

    let out = raw.read_samples(150, 250).unwrap();
    assert_eq!(out.len(), 3);
    for (ch, row) in out.iter().enumerate() {
        assert_eq!(row.len(), 101);
        assert_samples_close(row, &data[ch][150..=250]);
    }
    raw.close();
}

#[test]
fn stored_values_are_divided_by_calibration() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stored.fif");
    let info = three_channel_info(&[1.0, 2.0, 0.5]);
    let data = vec![vec![3.0; 4], vec![3.0; 4], vec![3.0; 4]];

    let mut writer = start_writing_raw(&path, &info, None, None).unwrap();
    writer.write_raw_buffer(&data).unwrap();
    writer.finish_writing_raw().unwrap();

    let raw = open_raw(&path).unwrap();
    let entry = raw.buffers()[0].entry.unwrap();
    let mut file = raw.into_file();
    let stored = file.read_tag(&entry).unwrap().as_samples(3).unwrap();
    assert_eq!(stored[0], vec![3.0; 4]);
    assert_eq!(stored[1], vec![1.5; 4]);
    assert_eq!(stored[2], vec![6.0; 4]);
}

#[test]
fn corrupt_matrix_dimensions_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("matrix.fif");

    let matrix = FloatMatrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let mut writer = start_file(&path).unwrap();
    writer.write_float_matrix(FIFF_PROJ_ITEM_VECTORS, &matrix).unwrap();
    writer.end_file().unwrap();
    drop(writer);

    let entry = {
        let file = open_fiff(&path).unwrap();
        *file.tree().first_tag(Tree::ROOT, FIFF_PROJ_ITEM_VECTORS).unwrap()
    };
    assert_eq!(entry.size, 32);

    // claim 3 rows: 3 * 3 * 4 + 8 != 32
    let mut raw = OpenOptions::new().write(true).open(&path).unwrap();
    raw.seek(SeekFrom::Start(entry.pos + 16 + 24)).unwrap();
    raw.write_all(&3i32.to_be_bytes()).unwrap();
    drop(raw);

    let mut file = open_fiff(&path).unwrap();
    let err = file.read_tag(&entry).unwrap().as_matrix().unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidMatrixDims {
            rows: 3,
            cols: 3,
            size: 32
        }
    ));
}

#[test]
fn unfinished_raw_file_reads_as_truncated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("unfinished.fif");
    let info = three_channel_info(&[1.0, 1.0, 1.0]);

    let mut writer = start_writing_raw(&path, &info, None, None).unwrap();
    writer.write_raw_buffer(&source_signal(3, 50)).unwrap();
    drop(writer);

    assert!(matches!(open_fiff(&path), Err(Error::TruncatedFile { .. })));
    assert!(matches!(open_raw(&path), Err(Error::TruncatedFile { .. })));
}

#[test]
fn unbalanced_writer_leaves_file_unterminated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("open_block.fif");

    let mut writer = start_file(&path).unwrap();
    writer.start_block(FIFFB_MEAS).unwrap();
    assert!(matches!(writer.end_file(), Err(Error::UnclosedBlocks { .. })));
    drop(writer);

    assert!(matches!(open_fiff(&path), Err(Error::TruncatedFile { .. })));
}

fn directory_by_walk(path: &Path) -> Vec<DirEntry> {
    let mut reader = BufReader::new(std::fs::File::open(path).unwrap());
    let len = reader.seek(SeekFrom::End(0)).unwrap();
    walk_tags(&mut reader, len).unwrap()
}

#[test]
fn index_and_walk_give_the_same_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("indexed.fif");
    let info = three_channel_info(&[1.0, 2.0, 0.5]);

    let mut writer = start_writing_raw(&path, &info, None, None).unwrap();
    writer.write_raw_buffer(&source_signal(3, 100)).unwrap();
    writer.finish_writing_raw().unwrap();

    let file = open_fiff(&path).unwrap();
    assert_eq!(file.strategy(), DirectoryStrategy::Index);
    assert_eq!(file.directory(), directory_by_walk(&path).as_slice());
}

#[test]
fn file_without_index_is_walked() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("walked.fif");
    let info = three_channel_info(&[1.0, 1.0, 1.0]);
    let options = RawWriterOptions {
        writer: WriterOptions {
            write_directory: false,
        },
        ..Default::default()
    };

    let mut writer = RawWriter::start_writing_raw_with_options(&path, &info, None, None, options).unwrap();
    writer.write_raw_buffer(&source_signal(3, 10)).unwrap();
    writer.finish_writing_raw().unwrap();

    let mut raw = open_raw(&path).unwrap();
    assert_eq!(raw.read_all().unwrap()[0].len(), 10);
    assert_eq!(raw.into_file().strategy(), DirectoryStrategy::Walk);
}

#[test]
fn measurement_info_survives_raw_writing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("info.fif");
    let mut info = three_channel_info(&[1.0, 2.0, 0.5]);
    info.bads = vec!["EEG 002".into()];
    info.line_freq = Some(60.0);
    info.coord_trans.push(CoordTrans::identity(FIFFV_COORD_DEVICE, FIFFV_COORD_HEAD));

    let writer = start_writing_raw(&path, &info, Some(&[0, 1]), None).unwrap();
    writer.finish_writing_raw().unwrap();

    let mut file = open_fiff(&path).unwrap();
    let read = MeasInfo::read(&mut file).unwrap();
    assert_eq!(read.nchan, 2);
    assert_eq!(read.channel_names(), vec!["EEG 001", "EEG 002"]);
    assert_eq!(read.bads, vec!["EEG 002".to_string()]);
    assert_eq!(read.good_channels(), vec![0]);
    assert_eq!(read.line_freq, Some(60.0));
    assert!(read.dev_head_t().is_some());

    // an empty recording still opens, but has nothing to read
    let mut raw = open_raw(&path).unwrap();
    assert_eq!(raw.n_samples(), 0);
    assert!(matches!(
        raw.read_all(),
        Err(Error::SampleRangeOutOfBounds { .. })
    ));
}
