/// Contains lookup tables and reference data needed for encoding, such as
/// the per-version capacities, block structure and grid geometry, and the
/// value expansions of the triplet compaction charsets.
use crate::config::Version;

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Data capacity of the largest supported version; the codeword stream may
/// never grow past this before version selection rejects the input.
pub const MAX_DATA_CODEWORDS: usize = 1480;

#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub struct VersionInfo {
    pub data_length: usize, // data codewords (5-bit words for Version S)
    pub ecc_length: usize,  // error-correction codewords

    pub blocks: usize,         // interleaved Reed-Solomon blocks
    pub data_per_block: usize, // data codewords per block
    pub ecc_per_block: usize,  // ecc codewords per block

    pub width: u32,  // symbol width in modules
    pub height: u32, // symbol height in modules

    pub grid_width: usize,  // codewords per data-grid row (0: bit raster)
    pub grid_height: usize, // data-grid rows of two module rows each

    pub field_poly: u16, // primitive polynomial of the RS field
}

impl VersionInfo {
    pub const fn new(
        data_length: usize,
        ecc_length: usize,
        blocks: usize,
        data_per_block: usize,
        ecc_per_block: usize,
        width: u32,
        height: u32,
        grid_width: usize,
        grid_height: usize,
        field_poly: u16,
    ) -> VersionInfo {
        VersionInfo {
            data_length,
            ecc_length,
            blocks,
            data_per_block,
            ecc_per_block,
            width,
            height,
            grid_width,
            grid_height,
            field_poly,
        }
    }

    /// Total codeword count of the symbol (data plus ecc).
    pub fn total_length(&self) -> usize {
        self.data_length + self.ecc_length
    }
}

macro_rules! define_version_table {
    {$(
        $version:expr,
        $data:expr, $ecc:expr,
        $blocks:expr, $data_pb:expr, $ecc_pb:expr,
        $width:expr, $height:expr,
        $grid_w:expr, $grid_h:expr,
        $poly:expr;
    )*} => {
        lazy_static! {
            pub static ref VERSION_TABLE: HashMap<Version, VersionInfo> = [
                $(
                    ($version, VersionInfo::new($data, $ecc, $blocks, $data_pb, $ecc_pb,
                                                $width, $height, $grid_w, $grid_h, $poly)),
                )*
            ].iter().copied().collect();
        }
    }
}

define_version_table!(
    Version::A,   10,  10, 1,  10, 10,  18,  16,  4,  5, 0x12D;
    Version::B,   19,  16, 1,  19, 16,  22,  22,  5,  7, 0x12D;
    Version::C,   44,  26, 1,  44, 26,  32,  28,  7, 10, 0x12D;
    Version::D,   91,  44, 1,  91, 44,  42,  40,  9, 15, 0x12D;
    Version::E,  182,  70, 1, 182, 70,  54,  52, 12, 21, 0x12D;
    Version::F,  370, 140, 2, 185, 70,  76,  70, 17, 30, 0x12D;
    Version::G,  732, 280, 4, 183, 70,  98, 104, 22, 46, 0x12D;
    Version::H, 1480, 560, 8, 185, 70, 134, 148, 30, 68, 0x12D;

    Version::S(1),  4,  4, 1,  4,  4,  11,   8,  0,  0, 0x25;
    Version::S(2),  8,  8, 1,  8,  8,  21,   8,  0,  0, 0x25;
    Version::S(3), 12, 12, 1, 12, 12,  31,   8,  0,  0, 0x25;

    Version::T(1), 10, 10, 1, 10, 10,  16,  16,  4,  5, 0x12D;
    Version::T(2), 24, 16, 1, 24, 16,  32,  16,  8,  5, 0x12D;
    Version::T(3), 38, 22, 1, 38, 22,  48,  16, 12,  5, 0x12D;
);

/// Convenience function that just indexes into the static table
pub fn lookup_version(v: Version) -> VersionInfo {
    VERSION_TABLE[&v]
}

/// Digit capacity of a Version S sub-version.
pub fn s_digit_capacity(sub: u8) -> usize {
    6 * sub as usize
}

//-------------------------------------------------------------------------------------------------
// Triplet charset value expansions. Each source byte maps to 1-4 values of
// the 40-value alphabet; values 0-2 are the shift prefixes, value 30 after
// shift 2 is the upper shift for high-bit bytes.

/// C40 value 27 after shift 2 stands in for the GS1 separator.
const SHIFT2_FNC1: u8 = 27;
/// C40/TEXT value 30 after shift 2 prefixes a byte with the high bit set.
const SHIFT2_UPPER: u8 = 30;

/// Expand one byte into its C40 value sequence.
pub fn c40_values(b: u8, gs1: bool) -> Vec<u8> {
    if gs1 && b == 0x1D {
        return vec![1, SHIFT2_FNC1];
    }
    match b {
        b' ' => vec![3],
        b'0'..=b'9' => vec![b - b'0' + 4],
        b'A'..=b'Z' => vec![b - b'A' + 14],
        0..=31 => vec![0, b],
        33..=47 => vec![1, b - 33],
        58..=64 => vec![1, b - 58 + 15],
        91..=95 => vec![1, b - 91 + 22],
        96..=127 => vec![2, b - 96],
        _ => {
            let mut vals = vec![1, SHIFT2_UPPER];
            vals.extend(c40_values(b - 128, false));
            vals
        }
    }
}

/// Expand one byte into its TEXT value sequence. The basic set carries the
/// lower-case letters; upper case moves to the shift 3 set.
pub fn text_values(b: u8, gs1: bool) -> Vec<u8> {
    if gs1 && b == 0x1D {
        return vec![1, SHIFT2_FNC1];
    }
    match b {
        b' ' => vec![3],
        b'0'..=b'9' => vec![b - b'0' + 4],
        b'a'..=b'z' => vec![b - b'a' + 14],
        0..=31 => vec![0, b],
        33..=47 => vec![1, b - 33],
        58..=64 => vec![1, b - 58 + 15],
        91..=95 => vec![1, b - 91 + 22],
        96 => vec![2, 0],
        b'A'..=b'Z' => vec![2, b - b'A' + 1],
        123..=127 => vec![2, b - 123 + 27],
        _ => {
            let mut vals = vec![1, SHIFT2_UPPER];
            vals.extend(text_values(b - 128, false));
            vals
        }
    }
}

/// EDI value of a byte, or None when the byte has no EDI encoding and the
/// emitter has to fall back to ASCII.
pub fn edi_value(b: u8) -> Option<u8> {
    match b {
        13 => Some(0),
        b'*' => Some(1),
        b'>' => Some(2),
        b' ' => Some(3),
        b'0'..=b'9' => Some(b - b'0' + 4),
        b'A'..=b'Z' => Some(b - b'A' + 14),
        _ => None,
    }
}

/// True for bytes the EDI alphabet can represent natively.
pub fn is_edi(b: u8) -> bool {
    edi_value(b).is_some()
}

/// True for the EDI segment terminator characters used by the C40/EDI
/// tie-break in mode selection.
pub fn is_edi_terminator(b: u8) -> bool {
    matches!(b, 13 | b'*' | b'>')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table() {
        assert_eq!(lookup_version(Version::A).data_length, 10);
        assert_eq!(lookup_version(Version::H).data_length, MAX_DATA_CODEWORDS);
        assert_eq!(lookup_version(Version::G).blocks, 4);
        assert_eq!(lookup_version(Version::G).data_per_block, 183);
        assert_eq!(lookup_version(Version::S(2)).field_poly, 0x25);
        assert_eq!(lookup_version(Version::T(3)).total_length(), 60);
    }

    #[test]
    fn test_block_split_covers_capacity() {
        for (_, info) in VERSION_TABLE.iter() {
            assert_eq!(info.blocks * info.data_per_block, info.data_length);
            assert_eq!(info.blocks * info.ecc_per_block, info.ecc_length);
        }
    }

    #[test]
    fn test_grid_matches_codeword_count() {
        for (v, info) in VERSION_TABLE.iter() {
            if info.grid_width > 0 {
                assert_eq!(
                    info.grid_width * info.grid_height,
                    info.total_length(),
                    "grid of {} does not hold its codewords",
                    v
                );
            }
        }
    }

    #[test]
    fn test_c40_basic_set() {
        assert_eq!(c40_values(b' ', false), [3]);
        assert_eq!(c40_values(b'0', false), [4]);
        assert_eq!(c40_values(b'9', false), [13]);
        assert_eq!(c40_values(b'A', false), [14]);
        assert_eq!(c40_values(b'Z', false), [39]);
    }

    #[test]
    fn test_c40_shift_sets() {
        assert_eq!(c40_values(0x07, false), [0, 7]); // shift 1
        assert_eq!(c40_values(b'!', false), [1, 0]); // shift 2
        assert_eq!(c40_values(b':', false), [1, 15]);
        assert_eq!(c40_values(b'_', false), [1, 26]);
        assert_eq!(c40_values(b'a', false), [2, 1]); // shift 3
        assert_eq!(c40_values(0x1D, true), [1, 27]); // GS1 separator
        assert_eq!(c40_values(0xC1, false), [1, 30, 14]); // upper shift + 'A'
    }

    #[test]
    fn test_text_swaps_cases() {
        assert_eq!(text_values(b'a', false), [14]);
        assert_eq!(text_values(b'z', false), [39]);
        assert_eq!(text_values(b'A', false), [2, 1]);
        assert_eq!(text_values(b'`', false), [2, 0]);
        assert_eq!(text_values(b'~', false), [2, 30]);
    }

    #[test]
    fn test_edi_alphabet() {
        assert_eq!(edi_value(13), Some(0));
        assert_eq!(edi_value(b'*'), Some(1));
        assert_eq!(edi_value(b'>'), Some(2));
        assert_eq!(edi_value(b' '), Some(3));
        assert_eq!(edi_value(b'5'), Some(9));
        assert_eq!(edi_value(b'K'), Some(24));
        assert_eq!(edi_value(b'k'), None);
        assert!(is_edi_terminator(b'>'));
        assert!(!is_edi_terminator(b' '));
    }
}
