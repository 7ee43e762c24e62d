//! Raw continuous data.
//!
//! [`RawData`] indexes the `FIFF_DATA_BUFFER` tags of a recording by sample
//! range and decodes only the buffers a request touches. [`RawWriter`]
//! appends calibrated sample blocks as a sequence of data buffers.
//!
//! Stored values are converted to physical units by multiplying with each
//! channel's `range * cal`; the writer divides by the same factors, so a
//! write followed by a read returns the original values up to float32
//! rounding.

use crate::constants::*;
use crate::error::{Error, Result};
use crate::file::FiffFile;
use crate::info::MeasInfo;
use crate::tag::{DirEntry, TagData};
use crate::tree::{BlockId, Tree};
use crate::writer::{FiffWriter, WriterOptions};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

/// Default upper bound for the payload of one data buffer tag.
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 1 << 20;

/// One entry of the buffer directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBuffer {
    /// First absolute sample covered.
    pub first: i64,
    /// Last absolute sample covered (inclusive).
    pub last: i64,
    pub nsamp: usize,
    /// `None` for a gap declared by `FIFF_DATA_SKIP`; it reads as zeros.
    pub entry: Option<DirEntry>,
}

/// Open raw recording.
#[derive(Debug)]
pub struct RawData<R = BufReader<File>> {
    file: FiffFile<R>,
    info: MeasInfo,
    cals: Vec<f64>,
    first_samp: i64,
    last_samp: i64,
    buffers: Vec<RawBuffer>,
}

impl RawData<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file(FiffFile::open(path)?)
    }
}

impl<R: Read + Seek> RawData<R> {
    /// Read the measurement info and build the buffer directory.
    ///
    /// Only directory entries are inspected; no sample payload is decoded.
    pub fn from_file(mut file: FiffFile<R>) -> Result<Self> {
        let info = MeasInfo::read(&mut file)?;
        let cals = info.calibrations();
        let tree = file.shared_tree();

        let data_block = raw_data_block(&tree).ok_or(Error::MissingTag {
            kind: FIFF_DATA_BUFFER,
        })?;

        let first_samp = match file.find_tag(data_block, FIFF_FIRST_SAMPLE)? {
            Some(tag) => tag.as_i32()? as i64,
            None => 0,
        };

        let mut buffers: Vec<RawBuffer> = Vec::new();
        let mut next_samp = first_samp;
        let mut pending_skip = 0i64;

        for entry in tree.block(data_block).entries() {
            match entry.kind {
                FIFF_DATA_SKIP => {
                    pending_skip = file.read_tag(entry)?.as_i32()? as i64;
                }
                FIFF_DATA_BUFFER => {
                    let nsamp = buffer_samples(entry, info.nchan)?;
                    if pending_skip > 0 {
                        let gap = pending_skip * nsamp as i64;
                        buffers.push(RawBuffer {
                            first: next_samp,
                            last: next_samp + gap - 1,
                            nsamp: gap as usize,
                            entry: None,
                        });
                        next_samp += gap;
                        pending_skip = 0;
                    }
                    buffers.push(RawBuffer {
                        first: next_samp,
                        last: next_samp + nsamp as i64 - 1,
                        nsamp,
                        entry: Some(*entry),
                    });
                    next_samp += nsamp as i64;
                }
                _ => {}
            }
        }

        let last_samp = next_samp - 1;
        log::debug!(
            "raw data: {} buffers covering samples {}..={}",
            buffers.len(),
            first_samp,
            last_samp
        );

        Ok(RawData {
            file,
            info,
            cals,
            first_samp,
            last_samp,
            buffers,
        })
    }

    pub fn info(&self) -> &MeasInfo {
        &self.info
    }

    pub fn nchan(&self) -> usize {
        self.info.nchan
    }

    pub fn sfreq(&self) -> f64 {
        self.info.sfreq
    }

    /// Effective calibration per channel (`range * cal`).
    pub fn cals(&self) -> &[f64] {
        &self.cals
    }

    pub fn first_samp(&self) -> i64 {
        self.first_samp
    }

    pub fn last_samp(&self) -> i64 {
        self.last_samp
    }

    pub fn n_samples(&self) -> usize {
        (self.last_samp - self.first_samp + 1).max(0) as usize
    }

    pub fn buffers(&self) -> &[RawBuffer] {
        &self.buffers
    }

    pub fn tree(&self) -> &Tree {
        self.file.tree()
    }

    /// Calibrated samples `first..=last` as `[channel][sample]`.
    ///
    /// Sample indices are absolute, so valid requests lie within
    /// `first_samp..=last_samp`.
    pub fn read_samples(&mut self, first: i64, last: i64) -> Result<Vec<Vec<f64>>> {
        if first > last || first < self.first_samp || last > self.last_samp {
            return Err(Error::SampleRangeOutOfBounds {
                first,
                last,
                first_samp: self.first_samp,
                last_samp: self.last_samp,
            });
        }

        let nchan = self.info.nchan;
        let count = (last - first + 1) as usize;
        let mut data = vec![Vec::with_capacity(count); nchan];

        // Buffers are sorted and contiguous; skip those ending before `first`.
        let start = self.buffers.partition_point(|b| b.last < first);
        for buffer in &self.buffers[start..] {
            if buffer.first > last {
                break;
            }
            let lo = (first.max(buffer.first) - buffer.first) as usize;
            let hi = (last.min(buffer.last) - buffer.first) as usize;

            match &buffer.entry {
                Some(entry) => {
                    let samples = self.file.read_tag(entry)?.as_samples(nchan)?;
                    if let Some(channel) = samples.iter().find(|c| c.len() != buffer.nsamp) {
                        return Err(Error::DimensionMismatch {
                            what: "data buffer samples",
                            expected: buffer.nsamp,
                            actual: channel.len(),
                        });
                    }
                    for ((out, channel), cal) in data.iter_mut().zip(&samples).zip(&self.cals) {
                        out.extend(channel[lo..=hi].iter().map(|v| v * cal));
                    }
                }
                None => {
                    for out in data.iter_mut() {
                        out.extend(std::iter::repeat(0.0).take(hi - lo + 1));
                    }
                }
            }
        }

        log::trace!("read samples {}..={} from {} channels", first, last, nchan);
        Ok(data)
    }

    /// The whole recording.
    pub fn read_all(&mut self) -> Result<Vec<Vec<f64>>> {
        self.read_samples(self.first_samp, self.last_samp)
    }

    /// Samples in the half-open interval `[from_sec, to_sec)`, with times
    /// measured from the first recorded sample.
    pub fn read_times(&mut self, from_sec: f64, to_sec: f64) -> Result<Vec<Vec<f64>>> {
        let first = self.first_samp + (from_sec * self.info.sfreq).round() as i64;
        let last = self.first_samp + (to_sec * self.info.sfreq).round() as i64 - 1;
        self.read_samples(first, last)
    }

    /// Time in seconds of each absolute sample in `first..=last`.
    pub fn times(&self, first: i64, last: i64) -> Vec<f64> {
        (first..=last)
            .map(|s| (s - self.first_samp) as f64 / self.info.sfreq)
            .collect()
    }

    /// Release the handle; nothing is written.
    pub fn close(self) {}

    pub fn into_file(self) -> FiffFile<R> {
        self.file
    }
}

fn raw_data_block(tree: &Tree) -> Option<BlockId> {
    tree.find_block(Tree::ROOT, FIFFB_RAW_DATA)
        .or_else(|| tree.find_block(Tree::ROOT, FIFFB_CONTINUOUS_DATA))
}

/// Samples held by a data buffer, from its declared type and size.
fn buffer_samples(entry: &DirEntry, nchan: usize) -> Result<usize> {
    let width = match entry.type_ {
        FIFFT_SHORT | FIFFT_DAU_PACK16 => 2,
        FIFFT_INT | FIFFT_FLOAT => 4,
        FIFFT_DOUBLE => 8,
        other => {
            return Err(Error::TypeMismatch {
                kind: entry.kind,
                expected: FIFFT_FLOAT,
                actual: other,
            })
        }
    };
    let size = entry.size.max(0) as usize;
    if size == 0 || size % (width * nchan) != 0 {
        return Err(Error::PayloadSize {
            type_: entry.type_,
            size,
        });
    }
    Ok(size / (width * nchan))
}

/// Raw writer tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawWriterOptions {
    /// Upper bound for one data buffer payload; rounded down to whole
    /// samples, at least one sample per buffer.
    pub max_buffer_bytes: usize,
    /// Absolute index of the first sample written.
    pub first_samp: i64,
    pub writer: WriterOptions,
}

impl Default for RawWriterOptions {
    fn default() -> Self {
        RawWriterOptions {
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            first_samp: 0,
            writer: WriterOptions::default(),
        }
    }
}

/// Append-only raw data writer.
///
/// Dropping it without [`RawWriter::finish_writing_raw`] leaves the output
/// unterminated.
pub struct RawWriter<W: Write + Seek = BufWriter<File>> {
    writer: FiffWriter<W>,
    info: MeasInfo,
    /// Source channel indices for full-width input.
    selection: Option<Vec<usize>>,
    source_nchan: usize,
    cals: Vec<f64>,
    max_samples: usize,
    samples_written: u64,
}

impl RawWriter<BufWriter<File>> {
    /// Create `path` and write the measurement header.
    ///
    /// `selection` picks and orders the channels of `info` that are written.
    /// `calibration` overrides the effective calibration of each written
    /// channel; the stored `range` is kept and `cal` adjusted.
    pub fn start_writing_raw(
        path: impl AsRef<Path>,
        info: &MeasInfo,
        selection: Option<&[usize]>,
        calibration: Option<&[f64]>,
    ) -> Result<Self> {
        Self::start_writing_raw_with_options(path, info, selection, calibration, RawWriterOptions::default())
    }

    pub fn start_writing_raw_with_options(
        path: impl AsRef<Path>,
        info: &MeasInfo,
        selection: Option<&[usize]>,
        calibration: Option<&[f64]>,
        options: RawWriterOptions,
    ) -> Result<Self> {
        let writer = FiffWriter::start_file_with_options(path, options.writer)?;
        Self::start(writer, info, selection, calibration, options)
    }
}

impl<W: Write + Seek> RawWriter<W> {
    /// Raw writer over any seekable sink.
    pub fn new(
        inner: W,
        info: &MeasInfo,
        selection: Option<&[usize]>,
        calibration: Option<&[f64]>,
        options: RawWriterOptions,
    ) -> Result<Self> {
        let writer = FiffWriter::with_options(inner, options.writer)?;
        Self::start(writer, info, selection, calibration, options)
    }

    fn start(
        mut writer: FiffWriter<W>,
        info: &MeasInfo,
        selection: Option<&[usize]>,
        calibration: Option<&[f64]>,
        options: RawWriterOptions,
    ) -> Result<Self> {
        let mut out_info = match selection {
            Some(selection) => info.pick(selection)?,
            None => info.clone(),
        };
        if out_info.channels.is_empty() {
            return Err(Error::MissingChannelInfo);
        }

        if let Some(calibration) = calibration {
            if calibration.len() != out_info.nchan {
                return Err(Error::DimensionMismatch {
                    what: "calibration values",
                    expected: out_info.nchan,
                    actual: calibration.len(),
                });
            }
            for (channel, (ch, &value)) in out_info.channels.iter_mut().zip(calibration).enumerate() {
                if value == 0.0 || !value.is_finite() {
                    return Err(Error::InvalidCalibration { channel, value });
                }
                if ch.range == 0.0 || !ch.range.is_finite() {
                    return Err(Error::InvalidCalibration {
                        channel,
                        value: ch.range as f64,
                    });
                }
                ch.cal = (value / ch.range as f64) as f32;
            }
        }

        let cals = out_info.calibrations();
        if let Some((channel, &value)) = cals
            .iter()
            .enumerate()
            .find(|(_, c)| **c == 0.0 || !c.is_finite())
        {
            return Err(Error::InvalidCalibration { channel, value });
        }

        // FIFF_FIRST_SAMPLE is a 32-bit int on disk
        let first_samp = i32::try_from(options.first_samp).map_err(|_| Error::SampleRangeOutOfBounds {
            first: options.first_samp,
            last: options.first_samp,
            first_samp: i32::MIN.into(),
            last_samp: i32::MAX.into(),
        })?;

        let max_samples = (options.max_buffer_bytes / (4 * out_info.nchan)).max(1);

        writer.start_block(FIFFB_MEAS)?;
        writer.write_meas_info(&out_info)?;
        writer.start_block(FIFFB_RAW_DATA)?;
        if first_samp != 0 {
            writer.write_int(FIFF_FIRST_SAMPLE, &[first_samp])?;
        }

        log::debug!(
            "writing raw data for {} channels, up to {} samples per buffer",
            out_info.nchan,
            max_samples
        );

        Ok(RawWriter {
            writer,
            info: out_info,
            selection: selection.map(<[usize]>::to_vec),
            source_nchan: info.nchan,
            cals,
            max_samples,
            samples_written: 0,
        })
    }

    /// Measurement info as written to the file.
    pub fn info(&self) -> &MeasInfo {
        &self.info
    }

    /// Calibration the written values are divided by.
    pub fn cals(&self) -> &[f64] {
        &self.cals
    }

    pub fn max_samples_per_buffer(&self) -> usize {
        self.max_samples
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Append `[channel][sample]` data in physical units.
    ///
    /// Rows are either all source channels (the selection is applied) or
    /// exactly the written channels. The block is split into data buffers of
    /// at most `max_samples_per_buffer` samples.
    pub fn write_raw_buffer(&mut self, data: &[Vec<f64>]) -> Result<()> {
        let picks: Vec<usize> = match &self.selection {
            Some(selection) if data.len() == self.source_nchan => selection.clone(),
            _ if data.len() == self.info.nchan => (0..self.info.nchan).collect(),
            _ => {
                return Err(Error::DimensionMismatch {
                    what: "raw buffer channels",
                    expected: self.info.nchan,
                    actual: data.len(),
                })
            }
        };

        let nsamp = data.first().map_or(0, Vec::len);
        if let Some(row) = data.iter().find(|row| row.len() != nsamp) {
            return Err(Error::DimensionMismatch {
                what: "raw buffer samples",
                expected: nsamp,
                actual: row.len(),
            });
        }

        let mut start = 0;
        while start < nsamp {
            let end = (start + self.max_samples).min(nsamp);
            let mut values = Vec::with_capacity((end - start) * picks.len());
            for samp in start..end {
                for (&src, cal) in picks.iter().zip(&self.cals) {
                    values.push((data[src][samp] / cal) as f32);
                }
            }
            self.writer
                .write_tag(FIFF_DATA_BUFFER, &TagData::Float32(values))?;
            start = end;
        }

        self.samples_written += nsamp as u64;
        log::trace!("wrote {} samples, {} total", nsamp, self.samples_written);
        Ok(())
    }

    /// Close the data and measurement blocks and end the file.
    pub fn finish_writing_raw(mut self) -> Result<W> {
        self.writer.end_block(FIFFB_RAW_DATA)?;
        self.writer.end_block(FIFFB_MEAS)?;
        self.writer.end_file()?;
        log::debug!("finished raw data with {} samples", self.samples_written);
        Ok(self.writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelInfo;
    use std::io::Cursor;

    fn info_with_cals(cals: &[f32]) -> MeasInfo {
        let channels = cals
            .iter()
            .enumerate()
            .map(|(i, &cal)| {
                let mut ch = ChannelInfo::new(format!("CH {:03}", i + 1), FIFFV_MISC_CH, i as i32 + 1);
                ch.cal = cal;
                ch
            })
            .collect();
        MeasInfo::new(1000.0, channels)
    }

    fn ramp(nchan: usize, nsamp: usize) -> Vec<Vec<f64>> {
        (0..nchan)
            .map(|c| (0..nsamp).map(|s| (c * 10_000 + s) as f64 * 0.5).collect())
            .collect()
    }

    fn open(bytes: Vec<u8>) -> RawData<Cursor<Vec<u8>>> {
        RawData::from_file(FiffFile::from_reader(Cursor::new(bytes)).unwrap()).unwrap()
    }

    fn write_raw(info: &MeasInfo, data: &[Vec<f64>], options: RawWriterOptions) -> Vec<u8> {
        let mut w = RawWriter::new(Cursor::new(Vec::new()), info, None, None, options).unwrap();
        w.write_raw_buffer(data).unwrap();
        w.finish_writing_raw().unwrap().into_inner()
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() <= 1e-6 * y.abs().max(1.0), "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_chunking_respects_buffer_bound() {
        let info = info_with_cals(&[1.0, 1.0]);
        let options = RawWriterOptions {
            max_buffer_bytes: 2 * 4 * 64 + 5, // rounds down to 64 samples
            ..Default::default()
        };
        let bytes = write_raw(&info, &ramp(2, 200), options);
        let raw = open(bytes);

        let sizes: Vec<usize> = raw.buffers().iter().map(|b| b.nsamp).collect();
        assert_eq!(sizes, vec![64, 64, 64, 8]);
        assert_eq!(raw.first_samp(), 0);
        assert_eq!(raw.last_samp(), 199);
        assert_eq!(raw.buffers()[1].first, 64);
        assert_eq!(raw.buffers()[1].last, 127);
    }

    #[test]
    fn test_tiny_bound_still_one_sample() {
        let info = info_with_cals(&[1.0, 1.0, 1.0]);
        let mut w = RawWriter::new(
            Cursor::new(Vec::new()),
            &info,
            None,
            None,
            RawWriterOptions {
                max_buffer_bytes: 1,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(w.max_samples_per_buffer(), 1);
        w.write_raw_buffer(&ramp(3, 3)).unwrap();
        let raw = open(w.finish_writing_raw().unwrap().into_inner());
        assert_eq!(raw.buffers().len(), 3);
    }

    #[test]
    fn test_read_across_buffers_applies_calibration() {
        let info = info_with_cals(&[1.0, 2.0, 0.5]);
        let data = ramp(3, 300);
        let options = RawWriterOptions {
            max_buffer_bytes: 3 * 4 * 100,
            ..Default::default()
        };
        let mut raw = open(write_raw(&info, &data, options));
        assert_eq!(raw.cals(), &[1.0, 2.0, 0.5]);

        let out = raw.read_samples(95, 205).unwrap();
        assert_eq!(out.len(), 3);
        for (ch, row) in out.iter().enumerate() {
            assert_close(row, &data[ch][95..=205]);
        }
    }

    #[test]
    fn test_out_of_range_requests() {
        let info = info_with_cals(&[1.0]);
        let mut raw = open(write_raw(&info, &ramp(1, 50), RawWriterOptions::default()));

        for (first, last) in [(-1, 10), (0, 50), (20, 10)] {
            assert!(matches!(
                raw.read_samples(first, last),
                Err(Error::SampleRangeOutOfBounds {
                    first_samp: 0,
                    last_samp: 49,
                    ..
                })
            ));
        }
        assert_eq!(raw.read_samples(49, 49).unwrap()[0].len(), 1);
    }

    #[test]
    fn test_first_samp_offsets_indices() {
        let info = info_with_cals(&[1.0]);
        let options = RawWriterOptions {
            first_samp: 1000,
            ..Default::default()
        };
        let data = ramp(1, 20);
        let mut raw = open(write_raw(&info, &data, options));

        assert_eq!(raw.first_samp(), 1000);
        assert_eq!(raw.last_samp(), 1019);
        assert_eq!(raw.n_samples(), 20);
        assert_close(&raw.read_samples(1005, 1006).unwrap()[0], &data[0][5..7]);
        assert!(raw.read_samples(0, 5).is_err());
        assert_eq!(raw.times(1000, 1001), vec![0.0, 0.001]);
    }

    #[test]
    fn test_read_times_half_open() {
        let info = info_with_cals(&[1.0, 1.0]);
        let mut raw = open(write_raw(&info, &ramp(2, 2000), RawWriterOptions::default()));
        let second = raw.read_times(0.0, 1.0).unwrap();
        assert_eq!(second[0].len(), 1000);
        assert_eq!(raw.read_all().unwrap()[1].len(), 2000);
    }

    #[test]
    fn test_selection_and_calibration_override() {
        let info = info_with_cals(&[1.0, 1.0, 1.0, 1.0]);
        let selection = [3, 1];
        let calibration = [4.0, 0.25];
        let mut w = RawWriter::new(
            Cursor::new(Vec::new()),
            &info,
            Some(&selection),
            Some(&calibration),
            RawWriterOptions::default(),
        )
        .unwrap();
        assert_eq!(w.info().channel_names(), vec!["CH 004", "CH 002"]);
        assert_eq!(w.cals(), &[4.0, 0.25]);

        // full-width input goes through the selection
        let full = ramp(4, 10);
        w.write_raw_buffer(&full).unwrap();
        // already selected input is taken as-is
        let picked = vec![full[3].clone(), full[1].clone()];
        w.write_raw_buffer(&picked).unwrap();
        assert!(matches!(
            w.write_raw_buffer(&ramp(3, 10)),
            Err(Error::DimensionMismatch { expected: 2, actual: 3, .. })
        ));

        let mut raw = open(w.finish_writing_raw().unwrap().into_inner());
        assert_eq!(raw.nchan(), 2);
        assert_eq!(raw.cals(), &[4.0, 0.25]);
        let out = raw.read_all().unwrap();
        assert_close(&out[0][..10], &full[3]);
        assert_close(&out[0][10..], &full[3]);
        assert_close(&out[1][..10], &full[1]);
    }

    #[test]
    fn test_override_keeps_range() {
        let mut info = info_with_cals(&[1.0]);
        info.channels[0].range = 2.0;
        let w = RawWriter::new(Cursor::new(Vec::new()), &info, None, Some(&[3.0]), RawWriterOptions::default())
            .unwrap();
        assert_eq!(w.info().channels[0].range, 2.0);
        assert_eq!(w.info().channels[0].cal, 1.5);
        assert_eq!(w.cals(), &[3.0]);
    }

    #[test]
    fn test_zero_calibration_rejected() {
        let info = info_with_cals(&[1.0, 0.0]);
        assert!(matches!(
            RawWriter::new(Cursor::new(Vec::new()), &info, None, None, RawWriterOptions::default()),
            Err(Error::InvalidCalibration { channel: 1, .. })
        ));

        let info = info_with_cals(&[1.0, 1.0]);
        assert!(matches!(
            RawWriter::new(
                Cursor::new(Vec::new()),
                &info,
                None,
                Some(&[1.0, f64::NAN]),
                RawWriterOptions::default()
            ),
            Err(Error::InvalidCalibration { channel: 1, .. })
        ));
        assert!(matches!(
            RawWriter::new(Cursor::new(Vec::new()), &info, None, Some(&[1.0]), RawWriterOptions::default()),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let info = info_with_cals(&[1.0, 1.0]);
        let mut w = RawWriter::new(Cursor::new(Vec::new()), &info, None, None, RawWriterOptions::default())
            .unwrap();
        let rows = vec![vec![0.0; 5], vec![0.0; 4]];
        assert!(matches!(
            w.write_raw_buffer(&rows),
            Err(Error::DimensionMismatch { expected: 5, actual: 4, .. })
        ));
        assert_eq!(w.samples_written(), 0);
    }

    /// Hand-built continuous data block with integer buffers and a skip.
    fn mixed_file() -> Vec<u8> {
        let info = info_with_cals(&[2.0, 1.0]);
        let mut w = FiffWriter::new(Cursor::new(Vec::new())).unwrap();
        w.start_block(FIFFB_MEAS).unwrap();
        w.write_meas_info(&info).unwrap();
        w.start_block(FIFFB_CONTINUOUS_DATA).unwrap();
        w.write_int(FIFF_FIRST_SAMPLE, &[10]).unwrap();
        // 3 samples x 2 channels, interleaved
        w.write_tag(FIFF_DATA_BUFFER, &TagData::Short(vec![1, -1, 2, -2, 3, -3]))
            .unwrap();
        w.write_int(FIFF_DATA_SKIP, &[2]).unwrap();
        w.write_tag(FIFF_DATA_BUFFER, &TagData::Int32(vec![7, 8, 9, 10]))
            .unwrap();
        w.write_tag(FIFF_DATA_BUFFER, &TagData::Double(vec![0.5, 0.25]))
            .unwrap();
        w.end_block(FIFFB_CONTINUOUS_DATA).unwrap();
        w.end_block(FIFFB_MEAS).unwrap();
        w.end_file().unwrap();
        w.into_inner().into_inner()
    }

    #[test]
    fn test_element_types_and_skip() {
        let mut raw = open(mixed_file());
        let layout: Vec<(i64, i64, bool)> = raw
            .buffers()
            .iter()
            .map(|b| (b.first, b.last, b.entry.is_some()))
            .collect();
        // the skip spans two buffers of the following buffer's size (2 samples)
        assert_eq!(
            layout,
            vec![(10, 12, true), (13, 16, false), (17, 18, true), (19, 19, true)]
        );

        let out = raw.read_all().unwrap();
        assert_eq!(out[0], vec![2.0, 4.0, 6.0, 0.0, 0.0, 0.0, 0.0, 14.0, 18.0, 1.0]);
        assert_eq!(out[1], vec![-1.0, -2.0, -3.0, 0.0, 0.0, 0.0, 0.0, 8.0, 10.0, 0.25]);

        let gap = raw.read_samples(14, 17).unwrap();
        assert_eq!(gap[0], vec![0.0, 0.0, 0.0, 14.0]);
    }

    #[test]
    fn test_missing_data_block() {
        let info = info_with_cals(&[1.0]);
        let mut w = FiffWriter::new(Cursor::new(Vec::new())).unwrap();
        w.start_block(FIFFB_MEAS).unwrap();
        w.write_meas_info(&info).unwrap();
        w.end_block(FIFFB_MEAS).unwrap();
        w.end_file().unwrap();

        let file = FiffFile::from_reader(Cursor::new(w.into_inner().into_inner())).unwrap();
        assert!(matches!(
            RawData::from_file(file),
            Err(Error::MissingTag { kind: FIFF_DATA_BUFFER })
        ));
    }

    #[test]
    fn test_buffer_header_disagrees_with_directory() {
        let info = info_with_cals(&[1.0]);
        let mut bytes = write_raw(&info, &ramp(1, 4), RawWriterOptions::default());
        let entry = open(bytes.clone()).buffers()[0].entry.unwrap();
        assert_eq!(entry.size, 16);

        // header now claims a single sample, the index still says four
        let size_at = entry.pos as usize + 8;
        bytes[size_at..size_at + 4].copy_from_slice(&4i32.to_be_bytes());

        let mut raw = open(bytes);
        assert!(matches!(
            raw.read_samples(0, 3),
            Err(Error::EntryMismatch {
                size: 16,
                found_size: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_first_samp_must_fit_on_disk() {
        let info = info_with_cals(&[1.0]);
        for first_samp in [i64::from(i32::MAX) + 1, i64::from(i32::MIN) - 1] {
            let options = RawWriterOptions {
                first_samp,
                ..Default::default()
            };
            let result = RawWriter::new(Cursor::new(Vec::new()), &info, None, None, options);
            assert!(matches!(
                result,
                Err(Error::SampleRangeOutOfBounds { first, .. }) if first == first_samp
            ));
        }
    }
}
