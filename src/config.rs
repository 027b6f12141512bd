/// Contains enums and structs that will also be exported as the public
/// API of this crate.
use itertools::Itertools;

use crate::error::{EncodeError, Result};
use crate::tables;

//-------------------------------------------------------------------------------------------------

/// A fixed physical size/shape of the symbol. Versions A through H are the
/// general-purpose sizes; S and T are the short compact variants, each in
/// three widths.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub enum Version {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    S(u8), // sub-versions S-1 through S-3
    T(u8), // sub-versions T-1 through T-3
}

/// The eight general-purpose versions in ascending data capacity, the order
/// automatic version selection searches.
pub const AUTO_VERSIONS: [Version; 8] = [
    Version::A,
    Version::B,
    Version::C,
    Version::D,
    Version::E,
    Version::F,
    Version::G,
    Version::H,
];

impl Version {
    /// Parse a version from the textual form used in the standard:
    /// `"A"` through `"H"` for the general sizes, `"S-1"` through `"S-3"`
    /// and `"T-1"` through `"T-3"` for the compact variants.
    pub fn from_str(decl: &str) -> Result<Version> {
        let v = match decl {
            "A" => Version::A,
            "B" => Version::B,
            "C" => Version::C,
            "D" => Version::D,
            "E" => Version::E,
            "F" => Version::F,
            "G" => Version::G,
            "H" => Version::H,
            _ => {
                let (family, sub) = decl.split('-').next_tuple().ok_or_else(|| {
                    EncodeError::InvalidOption(format!("unknown version {:?}", decl))
                })?;
                let i: u8 = sub.parse().map_err(|_| {
                    EncodeError::InvalidOption(format!("unknown version {:?}", decl))
                })?;
                match (family, i) {
                    ("S", 1..=3) => Version::S(i),
                    ("T", 1..=3) => Version::T(i),
                    _ => {
                        return Err(EncodeError::InvalidOption(format!(
                            "unknown version {:?}",
                            decl
                        )))
                    }
                }
            }
        };
        Ok(v)
    }

    /// turn compact (S/T) vs general into a boolean
    pub fn is_compact(self) -> bool {
        matches!(self, Version::S(_) | Version::T(_))
    }

    /// Number of data codewords this version carries. For Version S the
    /// count is in 5-bit words rather than bytes.
    pub fn data_capacity(self) -> usize {
        tables::lookup_version(self).data_length
    }

    /// Number of error-correction codewords appended for this version.
    pub fn ecc_length(self) -> usize {
        tables::lookup_version(self).ecc_length
    }

    /// Width & height of the symbol in modules.
    pub fn dimensions(self) -> (u32, u32) {
        let info = tables::lookup_version(self);
        (info.width, info.height)
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::A => write!(f, "A"),
            Version::B => write!(f, "B"),
            Version::C => write!(f, "C"),
            Version::D => write!(f, "D"),
            Version::E => write!(f, "E"),
            Version::F => write!(f, "F"),
            Version::G => write!(f, "G"),
            Version::H => write!(f, "H"),
            Version::S(i) => write!(f, "S-{}", i),
            Version::T(i) => write!(f, "T-{}", i),
        }
    }
}

//-------------------------------------------------------------------------------------------------

/// One run of input bytes, optionally tagged with the ECI that tells the
/// reader how to interpret them. Segments are borrowed for the duration of
/// a single encode call and concatenated into one symbol.
#[derive(Clone, Copy, Debug)]
pub struct Segment<'a> {
    pub data: &'a [u8],
    pub eci: Option<u32>,
}

impl<'a> Segment<'a> {
    pub fn new(data: &'a [u8]) -> Segment<'a> {
        Segment { data, eci: None }
    }

    pub fn with_eci(data: &'a [u8], eci: u32) -> Segment<'a> {
        Segment {
            data,
            eci: Some(eci),
        }
    }
}

//-------------------------------------------------------------------------------------------------

/// Position of one symbol within a structured-append set of 2 to 16
/// symbols sharing a file id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StructuredAppend {
    pub index: u8, // 1-based position within the set
    pub count: u8,
    pub id: u16,
}

impl StructuredAppend {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(2..=16).contains(&self.count) {
            return Err(EncodeError::InvalidOption(format!(
                "structured append count {} outside 2-16",
                self.count
            )));
        }
        if self.index < 1 || self.index > self.count {
            return Err(EncodeError::InvalidOption(format!(
                "structured append index {} outside 1-{}",
                self.index, self.count
            )));
        }
        if self.id > 64515 {
            return Err(EncodeError::InvalidOption(format!(
                "structured append id {} outside 0-64515",
                self.id
            )));
        }
        Ok(())
    }
}

/// Caller-facing knobs for one encode call.
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// Interpret the input per the GS1 General Specifications: a leading
    /// FNC1 is emitted and byte 0x1D separates application identifiers.
    pub gs1: bool,
    /// `None` selects the smallest fitting general version automatically;
    /// an explicit version is used exactly as requested.
    pub version: Option<Version>,
    pub structured_append: Option<StructuredAppend>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing() {
        assert_eq!(Version::from_str("A").unwrap(), Version::A);
        assert_eq!(Version::from_str("H").unwrap(), Version::H);
        assert_eq!(Version::from_str("S-2").unwrap(), Version::S(2));
        assert_eq!(Version::from_str("T-3").unwrap(), Version::T(3));
        assert!(Version::from_str("I").is_err());
        assert!(Version::from_str("S-4").is_err());
        assert!(Version::from_str("T-0").is_err());
        assert!(Version::from_str("S1").is_err());
    }

    #[test]
    fn test_version_display_round_trips() {
        for v in AUTO_VERSIONS.iter() {
            assert_eq!(Version::from_str(&v.to_string()).unwrap(), *v);
        }
        assert_eq!(Version::S(1).to_string(), "S-1");
        assert_eq!(Version::T(2).to_string(), "T-2");
    }

    #[test]
    fn test_structured_append_validation() {
        let ok = StructuredAppend {
            index: 2,
            count: 4,
            id: 100,
        };
        assert!(ok.validate().is_ok());
        assert!(StructuredAppend { index: 0, count: 4, id: 0 }.validate().is_err());
        assert!(StructuredAppend { index: 5, count: 4, id: 0 }.validate().is_err());
        assert!(StructuredAppend { index: 1, count: 17, id: 0 }.validate().is_err());
        assert!(StructuredAppend { index: 1, count: 2, id: 65000 }.validate().is_err());
    }
}
