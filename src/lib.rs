//! Encoder for the USS Code One two-dimensional matrix symbology.
//!
//! Input bytes are compacted across six encodation modes (ASCII, C40,
//! TEXT, EDI, DECIMAL, BYTE) chosen by a look-ahead cost race, extended
//! with Reed-Solomon error correction, and placed into the fixed module
//! grid of the selected version (A-H, plus the compact S and T variants).
//!
//! ```
//! use codeone_gen::{create_code_one, Version};
//!
//! let symbol = create_code_one("KICAD", None).unwrap();
//! assert_eq!(symbol.version(), Version::A);
//! assert_eq!((symbol.cols(), symbol.rows()), (18, 16));
//! ```

pub use config::{Options, Segment, StructuredAppend, Version};
pub use error::EncodeError;
pub use serialization::Symbol;

mod config;
mod error;
mod tables;

mod bitcoding;
mod rscoding;
mod serialization;

use error::Result;

/// Encode data segments into a finished symbol under the given options.
pub fn encode_segments(segments: &[Segment], options: &Options) -> Result<Symbol> {
    match options.version {
        Some(version @ Version::S(sub)) => {
            if options.gs1 {
                return Err(EncodeError::InvalidOption(
                    "Version S does not support GS1 mode".into(),
                ));
            }
            if options.structured_append.is_some() {
                return Err(EncodeError::InvalidOption(
                    "Version S does not support structured append".into(),
                ));
            }
            if segments.iter().any(|s| s.eci.is_some()) {
                return Err(EncodeError::InvalidOption(
                    "Version S does not support ECI".into(),
                ));
            }
            let data: Vec<u8> = segments.iter().flat_map(|s| s.data.iter().copied()).collect();
            let words = bitcoding::encode_version_s(&data, sub)?;
            let sealed = rscoding::construct_codewords(&words, version);
            Ok(serialization::build_symbol(&sealed, version))
        }
        _ => {
            let (codewords, version) = bitcoding::encode_codewords(segments, options)?;
            let sealed = rscoding::construct_codewords(&codewords, version);
            Ok(serialization::build_symbol(&sealed, version))
        }
    }
}

/// Encode a single byte string with the given options.
pub fn encode(data: &[u8], options: &Options) -> Result<Symbol> {
    encode_segments(&[Segment::new(data)], options)
}

/// Convenience entry point: encode text, auto-selecting the version
/// unless one is requested.
pub fn create_code_one(content: &str, version: Option<Version>) -> Result<Symbol> {
    encode(
        content.as_bytes(),
        &Options {
            version,
            ..Options::default()
        },
    )
}
