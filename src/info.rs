use super::constants::*;
use super::error::{Error, Result};
use super::file::FiffFile;
use super::matrix::{split_name_list, NamedMatrix};
use super::tree::{BlockId, Tree};
use super::types::{ChannelInfo, CoordTrans, DigPoint, FileId};
/// Measurement info
///
/// Decoded contents of the `FIFFB_MEAS_INFO` block.
use std::io::{Read, Seek};

/// SSP/Signal Space Projection operator
/// Used for artifact removal (e.g., eye blinks, heartbeat, environmental noise)
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub kind: i32,    // Channel type this projection applies to
    pub active: bool, // Whether projection is currently applied
    pub desc: String,
    /// One row per projection vector, one column per named channel.
    pub data: NamedMatrix,
}

impl Projection {
    pub fn nvec(&self) -> usize {
        self.data.nrow()
    }

    /// Parse one `FIFFB_PROJ_ITEM` block
    fn read<R: Read + Seek>(file: &mut FiffFile<R>, item: BlockId) -> Result<Self> {
        let kind = file.require_tag(item, FIFF_PROJ_ITEM_KIND)?.as_i32()?;
        let nvec = file.require_tag(item, FIFF_PROJ_ITEM_NVEC)?.as_i32()? as usize;

        let desc = match file.find_tag(item, FIFF_NAME)? {
            Some(tag) => tag.as_string()?,
            None => match file.find_tag(item, FIFF_DESCRIPTION)? {
                Some(tag) => tag.as_string()?,
                None => String::new(),
            },
        };

        // Active status is optional, projections default to inactive
        let active = match file.find_tag(item, FIFF_MNE_PROJ_ITEM_ACTIVE)? {
            Some(tag) => tag.as_i32()? != 0,
            None => false,
        };

        let names = split_name_list(&file.require_tag(item, FIFF_PROJ_ITEM_CH_NAME_LIST)?.as_string()?);
        let vectors = file.require_tag(item, FIFF_PROJ_ITEM_VECTORS)?.as_matrix()?;

        if vectors.rows() != nvec {
            return Err(Error::DimensionMismatch {
                what: "projection vectors",
                expected: nvec,
                actual: vectors.rows(),
            });
        }
        if vectors.cols() != names.len() {
            return Err(Error::DimensionMismatch {
                what: "projection channel names",
                expected: vectors.cols(),
                actual: names.len(),
            });
        }

        Ok(Projection {
            kind,
            active,
            desc,
            data: NamedMatrix::new(Vec::new(), names, vectors)?,
        })
    }
}

/// CTF (Canadian Thin Films) MEG Compensation
/// CTF systems use reference channels to cancel environmental noise.
#[derive(Debug, Clone, PartialEq)]
pub struct CtfComp {
    pub kind: i32,        // Compensation grade
    pub calibrated: bool, // Whether data is already compensated
    /// Compensation channels x reference channels.
    pub data: NamedMatrix,
}

impl CtfComp {
    fn read<R: Read + Seek>(file: &mut FiffFile<R>, block: BlockId) -> Result<Self> {
        let kind = file.require_tag(block, FIFF_MNE_CTF_COMP_KIND)?.as_i32()?;

        let calibrated = match file.find_tag(block, FIFF_MNE_CTF_COMP_CALIBRATED)? {
            Some(tag) => tag.as_i32()? != 0,
            None => false,
        };

        let data = file.read_named_matrix(block, FIFF_MNE_CTF_COMP_DATA)?;
        Ok(CtfComp {
            kind,
            calibrated,
            data,
        })
    }

    /// Get human-readable compensation grade name
    pub fn grade_name(&self) -> &'static str {
        match self.kind {
            FIFFV_MNE_CTFV_COMP_NONE => "None",
            FIFFV_MNE_CTFV_COMP_G1BR => "G1BR",
            FIFFV_MNE_CTFV_COMP_G2BR => "G2BR",
            FIFFV_MNE_CTFV_COMP_G3BR => "G3BR",
            _ => "Unknown",
        }
    }
}

/// Measurement metadata
#[derive(Debug, Clone, PartialEq)]
pub struct MeasInfo {
    pub nchan: usize,
    pub sfreq: f64,
    pub channels: Vec<ChannelInfo>,

    // Filter information
    pub lowpass: Option<f64>,
    pub highpass: Option<f64>,
    pub line_freq: Option<f64>,

    pub meas_id: Option<FileId>,
    /// Seconds and microseconds since the epoch.
    pub meas_date: Option<[i32; 2]>,
    pub experimenter: Option<String>,
    pub description: Option<String>,

    pub bads: Vec<String>,
    pub projs: Vec<Projection>,
    pub comps: Vec<CtfComp>,
    pub coord_trans: Vec<CoordTrans>,
    pub dig: Vec<DigPoint>,
}

impl MeasInfo {
    /// Minimal info for writing: channel list and sampling rate.
    pub fn new(sfreq: f64, channels: Vec<ChannelInfo>) -> Self {
        MeasInfo {
            nchan: channels.len(),
            sfreq,
            channels,
            lowpass: None,
            highpass: None,
            line_freq: None,
            meas_id: None,
            meas_date: None,
            experimenter: None,
            description: None,
            bads: Vec::new(),
            projs: Vec::new(),
            comps: Vec::new(),
            coord_trans: Vec::new(),
            dig: Vec::new(),
        }
    }

    /// Read measurement info from an opened file
    ///
    /// Fails with `MissingChannelInfo` when there is no `FIFFB_MEAS_INFO`
    /// block or it holds no channel records, and with `MissingCalibration`
    /// when the number of records differs from `FIFF_NCHAN`.
    pub fn read<R: Read + Seek>(file: &mut FiffFile<R>) -> Result<Self> {
        let tree = file.shared_tree();
        let meas_info = tree
            .find_block(Tree::ROOT, FIFFB_MEAS_INFO)
            .ok_or(Error::MissingChannelInfo)?;

        // Parse channel info structures
        let channels = file
            .read_tags(meas_info, FIFF_CH_INFO)?
            .iter()
            .map(|tag| tag.as_channel_info())
            .collect::<Result<Vec<_>>>()?;
        if channels.is_empty() {
            return Err(Error::MissingChannelInfo);
        }

        let nchan = file.require_tag(meas_info, FIFF_NCHAN)?.as_i32()?;
        if nchan < 0 || channels.len() != nchan as usize {
            return Err(Error::MissingCalibration {
                nchan: nchan.max(0) as usize,
                found: channels.len(),
            });
        }
        let nchan = nchan as usize;

        let sfreq = file.require_tag(meas_info, FIFF_SFREQ)?.as_f32()? as f64;

        // Optional scalars
        let lowpass = Self::optional_f64(file, meas_info, FIFF_LOWPASS)?;
        let highpass = Self::optional_f64(file, meas_info, FIFF_HIGHPASS)?;
        let line_freq = Self::optional_f64(file, meas_info, FIFF_LINE_FREQ)?;

        let meas_id = match file.find_tag(meas_info, FIFF_BLOCK_ID)? {
            Some(tag) => Some(tag.as_file_id()?),
            None => None,
        };
        let meas_date = match file.find_tag(meas_info, FIFF_MEAS_DATE)? {
            Some(tag) => match tag.as_i32_vec()?.as_slice() {
                [secs, usecs, ..] => Some([*secs, *usecs]),
                [secs] => Some([*secs, 0]),
                [] => None,
            },
            None => None,
        };
        let experimenter = match file.find_tag(meas_info, FIFF_EXPERIMENTER)? {
            Some(tag) => Some(tag.as_string()?),
            None => None,
        };
        let description = match file.find_tag(meas_info, FIFF_DESCRIPTION)? {
            Some(tag) => Some(tag.as_string()?),
            None => None,
        };

        // Bad channels (colon-separated list)
        let mut bads = Vec::new();
        if let Some(block) = tree.find_block(meas_info, FIFFB_MNE_BAD_CHANNELS) {
            if let Some(tag) = file.find_tag(block, FIFF_MNE_CH_NAME_LIST)? {
                bads = split_name_list(&tag.as_string()?);
            }
        }

        let coord_trans = file
            .read_tags(meas_info, FIFF_COORD_TRANS)?
            .iter()
            .map(|tag| tag.as_coord_trans())
            .collect::<Result<Vec<_>>>()?;

        let mut dig = Vec::new();
        if let Some(isotrak) = tree.find_block(meas_info, FIFFB_ISOTRAK) {
            for tag in file.read_tags(isotrak, FIFF_DIG_POINT)? {
                dig.push(tag.as_dig_point()?);
            }
        }

        let mut projs = Vec::new();
        for item in tree.find_blocks(meas_info, FIFFB_PROJ_ITEM) {
            projs.push(Projection::read(file, item)?);
        }

        let mut comps = Vec::new();
        for block in tree.find_blocks(meas_info, FIFFB_MNE_CTF_COMP_DATA) {
            comps.push(CtfComp::read(file, block)?);
        }

        log::debug!(
            "measurement info: {} channels at {} Hz, {} bad, {} projections, {} compensations",
            nchan,
            sfreq,
            bads.len(),
            projs.len(),
            comps.len()
        );

        Ok(MeasInfo {
            nchan,
            sfreq,
            channels,
            lowpass,
            highpass,
            line_freq,
            meas_id,
            meas_date,
            experimenter,
            description,
            bads,
            projs,
            comps,
            coord_trans,
            dig,
        })
    }

    fn optional_f64<R: Read + Seek>(
        file: &mut FiffFile<R>,
        block: BlockId,
        kind: i32,
    ) -> Result<Option<f64>> {
        match file.find_tag(block, kind)? {
            Some(tag) => Ok(Some(tag.as_f32()? as f64)),
            None => Ok(None),
        }
    }

    /// Effective per-channel calibration (`range * cal`).
    pub fn calibrations(&self) -> Vec<f64> {
        self.channels.iter().map(ChannelInfo::calibration).collect()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|ch| ch.ch_name.as_str()).collect()
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|ch| ch.ch_name == name)
    }

    /// Indices of channels not marked bad
    pub fn good_channels(&self) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, ch)| !self.is_bad_channel(&ch.ch_name))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_bad_channel(&self, channel_name: &str) -> bool {
        self.bads.iter().any(|bad| bad == channel_name)
    }

    /// Transform from frame `from` to frame `to`; a stored transform in the
    /// opposite direction is inverted.
    pub fn coord_trans(&self, from: i32, to: i32) -> Option<CoordTrans> {
        if let Some(trans) = self.coord_trans.iter().find(|t| t.from == from && t.to == to) {
            return Some(trans.clone());
        }
        self.coord_trans
            .iter()
            .find(|t| t.from == to && t.to == from)
            .map(CoordTrans::inverse)
    }

    pub fn dev_head_t(&self) -> Option<CoordTrans> {
        self.coord_trans(FIFFV_COORD_DEVICE, FIFFV_COORD_HEAD)
    }

    /// Info restricted to `selection`, in the given order. Bad channels that
    /// are not selected are dropped.
    pub fn pick(&self, selection: &[usize]) -> Result<MeasInfo> {
        let mut channels = Vec::with_capacity(selection.len());
        for &idx in selection {
            let ch = self.channels.get(idx).ok_or(Error::DimensionMismatch {
                what: "channel selection index",
                expected: self.channels.len(),
                actual: idx,
            })?;
            channels.push(ch.clone());
        }

        let bads = self
            .bads
            .iter()
            .filter(|bad| channels.iter().any(|ch| &ch.ch_name == *bad))
            .cloned()
            .collect();

        Ok(MeasInfo {
            nchan: channels.len(),
            channels,
            bads,
            ..self.clone()
        })
    }
}
