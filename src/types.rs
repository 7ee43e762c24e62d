/// Fixed-layout FIFF structures: file ids, channel records, coordinate
/// transforms and digitizer points.
use super::constants::*;
use super::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::Utc;
use std::io::{Cursor, Read, Write};

/// File/block identifier (20 bytes on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileId {
    pub version: i32,
    pub machid: [i32; 2],
    pub secs: i32,
    pub usecs: i32,
}

impl FileId {
    pub const SIZE: usize = 20;

    /// Fresh id stamped with the current time and a random machine field.
    pub fn generate() -> Self {
        let now = Utc::now();
        let random = uuid::Uuid::new_v4();
        let bytes = random.as_bytes();
        let mut half = Cursor::new(&bytes[..8]);
        // Eight bytes are always available in a UUID.
        let m0 = half.read_i32::<BigEndian>().unwrap_or_default();
        let m1 = half.read_i32::<BigEndian>().unwrap_or_default();
        FileId {
            version: FIFFC_VERSION,
            machid: [m0, m1],
            secs: now.timestamp() as i32,
            usecs: now.timestamp_subsec_micros() as i32,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(Error::PayloadSize {
                type_: FIFFT_ID_STRUCT,
                size: data.len(),
            });
        }
        let mut cursor = Cursor::new(data);
        Ok(FileId {
            version: cursor.read_i32::<BigEndian>()?,
            machid: [
                cursor.read_i32::<BigEndian>()?,
                cursor.read_i32::<BigEndian>()?,
            ],
            secs: cursor.read_i32::<BigEndian>()?,
            usecs: cursor.read_i32::<BigEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(self.version)?;
        writer.write_i32::<BigEndian>(self.machid[0])?;
        writer.write_i32::<BigEndian>(self.machid[1])?;
        writer.write_i32::<BigEndian>(self.secs)?;
        writer.write_i32::<BigEndian>(self.usecs)?;
        Ok(())
    }
}

/// Channel information record (FIFFT_CH_INFO_STRUCT, 96 bytes).
///
/// The effective calibration of a channel is `range * cal`. Both factors are
/// kept separately because callers sometimes replace only one of them.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub scanno: i32,
    pub logno: i32,
    pub kind: i32,
    pub range: f32,
    pub cal: f32,
    pub coil_type: i32,
    /// Position (0..3) followed by three orientation vectors.
    pub loc: [f32; 12],
    pub unit: i32,
    pub unit_mul: i32,
    pub ch_name: String,
}

impl ChannelInfo {
    pub const SIZE: usize = 96;
    const NAME_LEN: usize = 16;

    /// Channel with unit calibration and no position.
    pub fn new(name: impl Into<String>, kind: i32, logno: i32) -> Self {
        ChannelInfo {
            scanno: logno,
            logno,
            kind,
            range: 1.0,
            cal: 1.0,
            coil_type: 0,
            loc: [0.0; 12],
            unit: FIFF_UNIT_NONE,
            unit_mul: 0,
            ch_name: name.into(),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(Error::PayloadSize {
                type_: FIFFT_CH_INFO_STRUCT,
                size: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let scanno = cursor.read_i32::<BigEndian>()?;
        let logno = cursor.read_i32::<BigEndian>()?;
        let kind = cursor.read_i32::<BigEndian>()?;
        let range = cursor.read_f32::<BigEndian>()?;
        let cal = cursor.read_f32::<BigEndian>()?;
        let coil_type = cursor.read_i32::<BigEndian>()?;
        let mut loc = [0.0f32; 12];
        cursor.read_f32_into::<BigEndian>(&mut loc)?;
        let unit = cursor.read_i32::<BigEndian>()?;
        let unit_mul = cursor.read_i32::<BigEndian>()?;

        let mut name = [0u8; Self::NAME_LEN];
        cursor.read_exact(&mut name)?;
        let end = name.iter().position(|&b| b == 0).unwrap_or(Self::NAME_LEN);
        let ch_name = String::from_utf8_lossy(&name[..end]).into_owned();

        Ok(ChannelInfo {
            scanno,
            logno,
            kind,
            range,
            cal,
            coil_type,
            loc,
            unit,
            unit_mul,
            ch_name,
        })
    }

    /// Names longer than 15 bytes are cut so the record stays NUL terminated.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(self.scanno)?;
        writer.write_i32::<BigEndian>(self.logno)?;
        writer.write_i32::<BigEndian>(self.kind)?;
        writer.write_f32::<BigEndian>(self.range)?;
        writer.write_f32::<BigEndian>(self.cal)?;
        writer.write_i32::<BigEndian>(self.coil_type)?;
        for value in self.loc {
            writer.write_f32::<BigEndian>(value)?;
        }
        writer.write_i32::<BigEndian>(self.unit)?;
        writer.write_i32::<BigEndian>(self.unit_mul)?;

        let mut name = [0u8; Self::NAME_LEN];
        let bytes = self.ch_name.as_bytes();
        let len = bytes.len().min(Self::NAME_LEN - 1);
        name[..len].copy_from_slice(&bytes[..len]);
        writer.write_all(&name)?;
        Ok(())
    }

    /// Effective calibration factor `range * cal`.
    pub fn calibration(&self) -> f64 {
        self.range as f64 * self.cal as f64
    }

    pub fn is_data_channel(&self) -> bool {
        is_data_channel(self.kind)
    }

    pub fn type_name(&self) -> &'static str {
        channel_type_name(self.kind)
    }
}

/// Rigid transform between two coordinate frames, stored together with its
/// inverse (FIFFT_COORD_TRANS_STRUCT, 104 bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct CoordTrans {
    pub from: i32,
    pub to: i32,
    /// Row-major 3x3 rotation.
    pub rot: [f32; 9],
    pub move_: [f32; 3],
    pub invrot: [f32; 9],
    pub invmove: [f32; 3],
}

impl CoordTrans {
    pub const SIZE: usize = 104;

    /// Builds the transform and derives the inverse (`R^T`, `-R^T t`).
    pub fn new(from: i32, to: i32, rot: [f32; 9], move_: [f32; 3]) -> Self {
        let mut invrot = [0.0f32; 9];
        for r in 0..3 {
            for c in 0..3 {
                invrot[r * 3 + c] = rot[c * 3 + r];
            }
        }
        let mut invmove = [0.0f32; 3];
        for (r, out) in invmove.iter_mut().enumerate() {
            *out = -(0..3).map(|c| invrot[r * 3 + c] * move_[c]).sum::<f32>();
        }
        CoordTrans {
            from,
            to,
            rot,
            move_,
            invrot,
            invmove,
        }
    }

    pub fn identity(from: i32, to: i32) -> Self {
        let rot = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        Self::new(from, to, rot, [0.0; 3])
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(Error::PayloadSize {
                type_: FIFFT_COORD_TRANS_STRUCT,
                size: data.len(),
            });
        }
        let mut cursor = Cursor::new(data);
        let from = cursor.read_i32::<BigEndian>()?;
        let to = cursor.read_i32::<BigEndian>()?;
        let mut rot = [0.0f32; 9];
        let mut move_ = [0.0f32; 3];
        let mut invrot = [0.0f32; 9];
        let mut invmove = [0.0f32; 3];
        cursor.read_f32_into::<BigEndian>(&mut rot)?;
        cursor.read_f32_into::<BigEndian>(&mut move_)?;
        cursor.read_f32_into::<BigEndian>(&mut invrot)?;
        cursor.read_f32_into::<BigEndian>(&mut invmove)?;
        Ok(CoordTrans {
            from,
            to,
            rot,
            move_,
            invrot,
            invmove,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(self.from)?;
        writer.write_i32::<BigEndian>(self.to)?;
        for value in self
            .rot
            .iter()
            .chain(&self.move_)
            .chain(&self.invrot)
            .chain(&self.invmove)
        {
            writer.write_f32::<BigEndian>(*value)?;
        }
        Ok(())
    }

    /// The same relationship seen from the other frame.
    pub fn inverse(&self) -> Self {
        CoordTrans {
            from: self.to,
            to: self.from,
            rot: self.invrot,
            move_: self.invmove,
            invrot: self.rot,
            invmove: self.move_,
        }
    }

    pub fn apply(&self, point: [f32; 3]) -> [f32; 3] {
        let mut out = self.move_;
        for (r, value) in out.iter_mut().enumerate() {
            *value += (0..3).map(|c| self.rot[r * 3 + c] * point[c]).sum::<f32>();
        }
        out
    }

    pub fn description(&self) -> String {
        format!(
            "{} -> {}",
            coord_frame_name(self.from),
            coord_frame_name(self.to)
        )
    }
}

/// Digitizer point (FIFFT_DIG_POINT_STRUCT, 20 bytes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigPoint {
    pub kind: i32,
    pub ident: i32,
    pub r: [f32; 3],
}

impl DigPoint {
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(Error::PayloadSize {
                type_: FIFFT_DIG_POINT_STRUCT,
                size: data.len(),
            });
        }
        let mut cursor = Cursor::new(data);
        let kind = cursor.read_i32::<BigEndian>()?;
        let ident = cursor.read_i32::<BigEndian>()?;
        let mut r = [0.0f32; 3];
        cursor.read_f32_into::<BigEndian>(&mut r)?;
        Ok(DigPoint { kind, ident, r })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(self.kind)?;
        writer.write_i32::<BigEndian>(self.ident)?;
        for value in self.r {
            writer.write_f32::<BigEndian>(value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meg_channel() -> ChannelInfo {
        ChannelInfo {
            scanno: 1,
            logno: 113,
            kind: FIFFV_MEG_CH,
            range: 3.2768e-10,
            cal: 1e-13,
            coil_type: 3012,
            loc: [0.1, 0.2, 0.3, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            unit: FIFF_UNIT_T_M,
            unit_mul: 0,
            ch_name: "MEG 0113".to_string(),
        }
    }

    #[test]
    fn test_channel_info_layout() {
        let mut bytes = Vec::new();
        meg_channel().write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), ChannelInfo::SIZE);

        // kind sits after scanno and logno
        assert_eq!(&bytes[8..12], &FIFFV_MEG_CH.to_be_bytes());
        // name is the trailing 16 bytes, NUL padded
        assert_eq!(&bytes[80..88], b"MEG 0113");
        assert!(bytes[88..].iter().all(|&b| b == 0));

        let parsed = ChannelInfo::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, meg_channel());
    }

    #[test]
    fn test_channel_info_wrong_size() {
        let err = ChannelInfo::from_bytes(&[0u8; 50]).unwrap_err();
        assert!(matches!(err, Error::PayloadSize { size: 50, .. }));
    }

    #[test]
    fn test_channel_info_long_name_truncated() {
        let mut ch = ChannelInfo::new("A-VERY-LONG-CHANNEL-NAME", FIFFV_EEG_CH, 1);
        ch.cal = 2.0;
        let mut bytes = Vec::new();
        ch.write_to(&mut bytes).unwrap();
        let parsed = ChannelInfo::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.ch_name, "A-VERY-LONG-CHA");
        assert_eq!(parsed.calibration(), 2.0);
        assert_eq!(parsed.type_name(), "EEG");
    }

    #[test]
    fn test_coord_trans_inverse() {
        // 90 degrees about z, then shift
        let rot = [0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let trans = CoordTrans::new(FIFFV_COORD_DEVICE, FIFFV_COORD_HEAD, rot, [1.0, 2.0, 3.0]);

        let p = [0.5, -0.25, 2.0];
        let there = trans.apply(p);
        let back = trans.inverse().apply(there);
        for i in 0..3 {
            assert!((back[i] - p[i]).abs() < 1e-6);
        }
        assert_eq!(trans.description(), "Device -> Head");
        assert_eq!(trans.inverse().from, FIFFV_COORD_HEAD);
    }

    #[test]
    fn test_coord_trans_bytes() {
        let trans = CoordTrans::identity(FIFFV_COORD_HEAD, FIFFV_COORD_MRI);
        let mut bytes = Vec::new();
        trans.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len(), CoordTrans::SIZE);
        assert_eq!(CoordTrans::from_bytes(&bytes).unwrap(), trans);
        assert!(CoordTrans::from_bytes(&bytes[..56]).is_err());
    }

    #[test]
    fn test_file_id_generate() {
        let id = FileId::generate();
        assert_eq!(id.version, FIFFC_VERSION);
        assert!(id.secs > 0);

        let mut bytes = Vec::new();
        id.write_to(&mut bytes).unwrap();
        assert_eq!(FileId::from_bytes(&bytes).unwrap(), id);
    }

    #[test]
    fn test_dig_point_bytes() {
        let point = DigPoint {
            kind: FIFFV_POINT_EEG,
            ident: 7,
            r: [0.01, -0.02, 0.03],
        };
        let mut bytes = Vec::new();
        point.write_to(&mut bytes).unwrap();
        assert_eq!(DigPoint::from_bytes(&bytes).unwrap(), point);
    }
}
