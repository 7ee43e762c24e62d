/// FIFF constants
/// Values follow the Neuromag FIFF definition as used by MNE.

// File structure tags
pub const FIFF_FILE_ID: i32 = 100;
pub const FIFF_DIR_POINTER: i32 = 101;
pub const FIFF_DIR: i32 = 102;
pub const FIFF_BLOCK_ID: i32 = 103;
pub const FIFF_BLOCK_START: i32 = 104;
pub const FIFF_BLOCK_END: i32 = 105;
pub const FIFF_FREE_LIST: i32 = 106;
pub const FIFF_NOP: i32 = 108;
pub const FIFF_PARENT_FILE_ID: i32 = 109;
pub const FIFF_PARENT_BLOCK_ID: i32 = 110;

/// Generic name tag (projection item descriptions).
pub const FIFF_NAME: i32 = 3;

// Next-pointer sentinels stored in the tag header
pub const FIFFV_NEXT_SEQ: i32 = 0; // next tag follows immediately
pub const FIFFV_NEXT_NONE: i32 = -1; // terminal tag

/// File format version written into the file id (1.3).
pub const FIFFC_VERSION: i32 = (1 << 16) | 3;

// Block kinds (payload of BLOCK_START / BLOCK_END)
pub const FIFFB_ROOT: i32 = 999;
pub const FIFFB_MEAS: i32 = 100;
pub const FIFFB_MEAS_INFO: i32 = 101;
pub const FIFFB_RAW_DATA: i32 = 102;
pub const FIFFB_PROCESSED_DATA: i32 = 103;
pub const FIFFB_EVOKED: i32 = 104;
pub const FIFFB_ISOTRAK: i32 = 107;
pub const FIFFB_HPI_MEAS: i32 = 108;
pub const FIFFB_CONTINUOUS_DATA: i32 = 112;
pub const FIFFB_PROJ: i32 = 313;
pub const FIFFB_PROJ_ITEM: i32 = 314;
pub const FIFFB_MNE_BAD_CHANNELS: i32 = 359;
pub const FIFFB_MNE_NAMED_MATRIX: i32 = 361;
pub const FIFFB_MNE_CTF_COMP: i32 = 3501;
pub const FIFFB_MNE_CTF_COMP_DATA: i32 = 3502;

// Data types
pub const FIFFT_VOID: i32 = 0;
pub const FIFFT_BYTE: i32 = 1;
pub const FIFFT_SHORT: i32 = 2;
pub const FIFFT_INT: i32 = 3;
pub const FIFFT_FLOAT: i32 = 4;
pub const FIFFT_DOUBLE: i32 = 5;
pub const FIFFT_JULIAN: i32 = 6;
pub const FIFFT_USHORT: i32 = 7;
pub const FIFFT_UINT: i32 = 8;
pub const FIFFT_STRING: i32 = 10;
pub const FIFFT_DAU_PACK16: i32 = 16;
pub const FIFFT_COMPLEX_FLOAT: i32 = 20;
pub const FIFFT_COMPLEX_DOUBLE: i32 = 21;
pub const FIFFT_CH_INFO_STRUCT: i32 = 30;
pub const FIFFT_ID_STRUCT: i32 = 31;
pub const FIFFT_DIR_ENTRY_STRUCT: i32 = 32;
pub const FIFFT_DIG_POINT_STRUCT: i32 = 33;
pub const FIFFT_COORD_TRANS_STRUCT: i32 = 35;

// Matrix coding: the high half of the type word, the element type in the low half
pub const FIFFT_MATRIX: i32 = 1 << 30;
pub const FIFFTS_MC_MASK: i32 = -65536; // 0xFFFF0000
pub const FIFFTS_BASE_MASK: i32 = 0xFFFF;
pub const FIFFT_MATRIX_FLOAT: i32 = FIFFT_MATRIX | FIFFT_FLOAT;

// Measurement info tags
pub const FIFF_NCHAN: i32 = 200;
pub const FIFF_SFREQ: i32 = 201;
pub const FIFF_CH_INFO: i32 = 203;
pub const FIFF_MEAS_DATE: i32 = 204;
pub const FIFF_DESCRIPTION: i32 = 206;
pub const FIFF_FIRST_SAMPLE: i32 = 208;
pub const FIFF_LAST_SAMPLE: i32 = 209;
pub const FIFF_EXPERIMENTER: i32 = 212;
pub const FIFF_DIG_POINT: i32 = 213;
pub const FIFF_LOWPASS: i32 = 219;
pub const FIFF_COORD_TRANS: i32 = 222;
pub const FIFF_HIGHPASS: i32 = 223;
pub const FIFF_LINE_FREQ: i32 = 235;

// Raw data tags
pub const FIFF_DATA_BUFFER: i32 = 300;
pub const FIFF_DATA_SKIP: i32 = 301;

// Projection items
pub const FIFF_PROJ_ITEM_KIND: i32 = 3411;
pub const FIFF_PROJ_ITEM_TIME: i32 = 3412;
pub const FIFF_PROJ_ITEM_NVEC: i32 = 3414;
pub const FIFF_PROJ_ITEM_VECTORS: i32 = 3415;
pub const FIFF_PROJ_ITEM_CH_NAME_LIST: i32 = 3417;
pub const FIFF_MNE_PROJ_ITEM_ACTIVE: i32 = 3560;

pub const FIFFV_PROJ_ITEM_NONE: i32 = 0;
pub const FIFFV_PROJ_ITEM_FIELD: i32 = 1;
pub const FIFFV_MNE_PROJ_ITEM_EEG_AVREF: i32 = 10;

// Named matrices and name lists
pub const FIFF_MNE_ROW_NAMES: i32 = 3502;
pub const FIFF_MNE_COL_NAMES: i32 = 3503;
pub const FIFF_MNE_NROW: i32 = 3504;
pub const FIFF_MNE_NCOL: i32 = 3505;
pub const FIFF_MNE_CH_NAME_LIST: i32 = 3507;

// CTF compensation
pub const FIFF_MNE_CTF_COMP_KIND: i32 = 3701;
pub const FIFF_MNE_CTF_COMP_DATA: i32 = 3702;
pub const FIFF_MNE_CTF_COMP_CALIBRATED: i32 = 3703;

pub const FIFFV_MNE_CTFV_COMP_NONE: i32 = 0;
pub const FIFFV_MNE_CTFV_COMP_G1BR: i32 = 0x4731_4252;
pub const FIFFV_MNE_CTFV_COMP_G2BR: i32 = 0x4732_4252;
pub const FIFFV_MNE_CTFV_COMP_G3BR: i32 = 0x4733_4252;

// Coordinate frames
pub const FIFFV_COORD_UNKNOWN: i32 = 0;
pub const FIFFV_COORD_DEVICE: i32 = 1;
pub const FIFFV_COORD_ISOTRAK: i32 = 2;
pub const FIFFV_COORD_HPI: i32 = 3;
pub const FIFFV_COORD_HEAD: i32 = 4;
pub const FIFFV_COORD_MRI: i32 = 5;

// Digitizer point kinds
pub const FIFFV_POINT_CARDINAL: i32 = 1;
pub const FIFFV_POINT_HPI: i32 = 2;
pub const FIFFV_POINT_EEG: i32 = 3;
pub const FIFFV_POINT_EXTRA: i32 = 4;

// Channel kinds
pub const FIFFV_MEG_CH: i32 = 1;
pub const FIFFV_EEG_CH: i32 = 2;
pub const FIFFV_STIM_CH: i32 = 3;
pub const FIFFV_MCG_CH: i32 = 201;
pub const FIFFV_EOG_CH: i32 = 202;
pub const FIFFV_REF_MEG_CH: i32 = 301;
pub const FIFFV_EMG_CH: i32 = 302;
pub const FIFFV_ECG_CH: i32 = 402;
pub const FIFFV_MISC_CH: i32 = 502;
pub const FIFFV_RESP_CH: i32 = 602;

// Units
pub const FIFF_UNIT_NONE: i32 = -1;
pub const FIFF_UNIT_V: i32 = 107;
pub const FIFF_UNIT_T: i32 = 112;
pub const FIFF_UNIT_T_M: i32 = 201;

/// Byte width of one element of a fixed-width FIFF type.
pub fn type_size(fiff_type: i32) -> Option<usize> {
    match fiff_type {
        FIFFT_BYTE => Some(1),
        FIFFT_SHORT | FIFFT_USHORT | FIFFT_DAU_PACK16 => Some(2),
        FIFFT_INT | FIFFT_UINT | FIFFT_FLOAT | FIFFT_JULIAN => Some(4),
        FIFFT_DOUBLE | FIFFT_COMPLEX_FLOAT => Some(8),
        FIFFT_COMPLEX_DOUBLE => Some(16),
        FIFFT_ID_STRUCT | FIFFT_DIG_POINT_STRUCT => Some(20),
        FIFFT_DIR_ENTRY_STRUCT => Some(16),
        FIFFT_CH_INFO_STRUCT => Some(96),
        FIFFT_COORD_TRANS_STRUCT => Some(104),
        _ => None,
    }
}

/// Short name of a FIFF type, `"matrix"` for any matrix-coded type.
pub fn type_name(fiff_type: i32) -> &'static str {
    if fiff_type & FIFFT_MATRIX != 0 {
        return "matrix";
    }
    match fiff_type {
        FIFFT_VOID => "void",
        FIFFT_BYTE => "byte",
        FIFFT_SHORT | FIFFT_DAU_PACK16 => "short",
        FIFFT_USHORT => "ushort",
        FIFFT_INT | FIFFT_JULIAN => "int",
        FIFFT_UINT => "uint",
        FIFFT_FLOAT => "float",
        FIFFT_DOUBLE => "double",
        FIFFT_STRING => "string",
        FIFFT_COMPLEX_FLOAT | FIFFT_COMPLEX_DOUBLE => "complex",
        FIFFT_CH_INFO_STRUCT => "ch_info",
        FIFFT_ID_STRUCT => "id",
        FIFFT_DIR_ENTRY_STRUCT => "dir_entry",
        FIFFT_DIG_POINT_STRUCT => "dig_point",
        FIFFT_COORD_TRANS_STRUCT => "coord_trans",
        _ => "unknown",
    }
}

/// Whether a channel kind carries physiological/sensor data.
pub fn is_data_channel(kind: i32) -> bool {
    matches!(
        kind,
        FIFFV_MEG_CH
            | FIFFV_REF_MEG_CH
            | FIFFV_EEG_CH
            | FIFFV_MCG_CH
            | FIFFV_EOG_CH
            | FIFFV_EMG_CH
            | FIFFV_ECG_CH
            | FIFFV_MISC_CH
            | FIFFV_RESP_CH
    )
}

pub fn channel_type_name(kind: i32) -> &'static str {
    match kind {
        FIFFV_MEG_CH => "MEG",
        FIFFV_REF_MEG_CH => "REF_MEG",
        FIFFV_EEG_CH => "EEG",
        FIFFV_MCG_CH => "MCG",
        FIFFV_STIM_CH => "STIM",
        FIFFV_EOG_CH => "EOG",
        FIFFV_EMG_CH => "EMG",
        FIFFV_ECG_CH => "ECG",
        FIFFV_MISC_CH => "MISC",
        FIFFV_RESP_CH => "RESP",
        _ => "UNKNOWN",
    }
}

pub fn coord_frame_name(frame: i32) -> &'static str {
    match frame {
        FIFFV_COORD_DEVICE => "Device",
        FIFFV_COORD_ISOTRAK => "Isotrak",
        FIFFV_COORD_HPI => "HPI",
        FIFFV_COORD_HEAD => "Head",
        FIFFV_COORD_MRI => "MRI",
        _ => "Unknown",
    }
}
