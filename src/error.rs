/// Failure taxonomy for symbol construction. Every error carries a stable
/// numeric code so front ends can report it alongside the message.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EncodeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// An option value outside the supported set, or a combination the
    /// symbology forbids (e.g. structured append together with GS1 mode).
    #[error("invalid option: {0}")]
    InvalidOption(String),

    /// A byte outside the alphabet required in the current context
    /// (Version S accepts digits only).
    #[error("invalid character {byte:#04x} at position {position}: {expected}")]
    InvalidCharacter {
        byte: u8,
        position: usize,
        expected: &'static str,
    },

    /// The produced codeword count does not fit the effective capacity.
    /// Both counts are part of the message so the caller can size up.
    #[error("input too long: requires {required} codewords, maximum is {maximum}")]
    TooLong { required: usize, maximum: usize },
}

impl EncodeError {
    /// Stable numeric code for each failure kind.
    pub fn code(&self) -> u16 {
        match self {
            EncodeError::InvalidOption(_) => 1,
            EncodeError::InvalidCharacter { .. } => 2,
            EncodeError::TooLong { .. } => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_long_message_names_both_counts() {
        let e = EncodeError::TooLong {
            required: 1532,
            maximum: 1480,
        };
        let msg = e.to_string();
        assert!(msg.contains("1532"));
        assert!(msg.contains("1480"));
        assert_eq!(e.code(), 3);
    }

    #[test]
    fn test_codes_are_distinct() {
        let a = EncodeError::InvalidOption("x".into()).code();
        let b = EncodeError::InvalidCharacter {
            byte: b'a',
            position: 0,
            expected: "digit",
        }
        .code();
        let c = EncodeError::TooLong {
            required: 1,
            maximum: 0,
        }
        .code();
        assert!(a != b && b != c && a != c);
    }
}
