/// Conversion of user data into the symbol's data codeword stream: framing
/// (structured append, FNC1, ECI escapes), the six-mode compaction state
/// machine, and version selection with padding.
use bitstream_io::{BigEndian, BitWrite, BitWriter};
use log::debug;

use crate::config::{Options, Segment, Version, AUTO_VERSIONS};
use crate::error::{EncodeError, Result};
use crate::tables::{self, lookup_version, MAX_DATA_CODEWORDS};

pub mod lookahead;
use lookahead::next_mode;

// Control codewords shared with the wider Data Matrix family.
pub const PAD: u8 = 129;
pub const LATCH_C40: u8 = 230;
pub const LATCH_BYTE: u8 = 231;
pub const FNC1: u8 = 232;
pub const STRUCT_APPEND: u8 = 233;
pub const UPPER_SHIFT: u8 = 235;
pub const LATCH_EDI: u8 = 238;
pub const LATCH_TEXT: u8 = 239;
pub const UNLATCH: u8 = 254;

/// GS1 application identifier separator in the input.
const GS: u8 = 0x1D;

/// The six encodation modes. DECIMAL never appears as a resting state of
/// the machine: its bit stream runs inline and always hands back to ASCII.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Ascii,
    C40,
    Text,
    Edi,
    Decimal,
    Byte,
}

fn two_digits_coming(rest: &[u8]) -> bool {
    match rest {
        [a, b, ..] => a.is_ascii_digit() && b.is_ascii_digit(),
        _ => false,
    }
}

/// Number of consecutive digits starting at each position, built by one
/// right-to-left scan. Entry `len` is the zero sentinel.
fn digit_runs(source: &[u8]) -> Vec<usize> {
    let mut runs = vec![0usize; source.len() + 1];
    for i in (0..source.len()).rev() {
        if source[i].is_ascii_digit() {
            runs[i] = runs[i + 1] + 1;
        }
    }
    runs
}

/// Digit-run condition under which ASCII hands over to decimal
/// compaction: 21 consecutive digits ahead, or an all-digit remainder of
/// at least 13.
fn decimal_run_ahead(runs: &[usize], sp: usize, len: usize) -> bool {
    runs[sp] >= 21 || (len - sp >= 13 && runs[sp] == len - sp)
}

/// Same decision right after a GS1 separator, where shorter runs already
/// pay off: 15 digits ahead, or an all-digit remainder of at least 7.
fn decimal_run_after_gs(runs: &[usize], sp: usize, len: usize) -> bool {
    runs[sp] >= 15 || (len - sp >= 7 && runs[sp] == len - sp)
}

/// Rewrite the caller's segments into the effective byte stream the state
/// machine runs over. When any segment carries an ECI, each such segment
/// is prefixed with backslash + six decimal digits and every literal
/// backslash in the data doubles.
fn build_effective_source(segments: &[Segment]) -> Result<Vec<u8>> {
    let eci_used = segments.iter().any(|s| s.eci.is_some());
    let mut out = Vec::new();
    for seg in segments {
        if let Some(eci) = seg.eci {
            if eci > 999_999 {
                return Err(EncodeError::InvalidOption(format!(
                    "ECI value {} outside 0-999999",
                    eci
                )));
            }
            out.push(b'\\');
            out.extend_from_slice(format!("{:06}", eci).as_bytes());
        }
        if eci_used {
            for &b in seg.data {
                out.push(b);
                if b == b'\\' {
                    out.push(b'\\');
                }
            }
        } else {
            out.extend_from_slice(seg.data);
        }
    }
    Ok(out)
}

//-------------------------------------------------------------------------------------------------

struct Encoder<'a> {
    source: &'a [u8],
    runs: &'a [usize],
    gs1: bool,
    sp: usize,
    target: Vec<u8>,
    mode: Mode,
    /// pending triplet values, at most 2 after every step
    triplet: Vec<u8>,
    /// rollback bookkeeping for the current latch: (source index, values)
    triplet_chars: Vec<(usize, usize)>,
    /// index of the reserved byte-count codeword while in byte mode
    byte_start: usize,
    /// mode just unlatched at a position; an immediate re-latch of the
    /// same mode there would loop forever emitting switch codewords
    unlatched_at: Option<(usize, Mode)>,
}

impl<'a> Encoder<'a> {
    fn new(source: &'a [u8], runs: &'a [usize], gs1: bool, header: Vec<u8>) -> Encoder<'a> {
        Encoder {
            source,
            runs,
            gs1,
            sp: 0,
            target: header,
            mode: Mode::Ascii,
            triplet: Vec::new(),
            triplet_chars: Vec::new(),
            byte_start: 0,
            unlatched_at: None,
        }
    }

    fn push(&mut self, cw: u8) {
        self.target.push(cw);
    }

    fn run(mut self) -> (Vec<u8>, Mode) {
        let len = self.source.len();
        loop {
            if self.sp >= len {
                match self.mode {
                    Mode::C40 | Mode::Text => self.flush_triplet(),
                    Mode::Edi => self.flush_edi(),
                    Mode::Byte => self.end_byte_run(),
                    _ => {}
                }
                if self.sp >= len {
                    break;
                }
                continue; // a rollback re-opened the tail in ASCII
            }
            match self.mode {
                Mode::Ascii => self.step_ascii(),
                Mode::C40 | Mode::Text | Mode::Edi => self.step_triplet(),
                Mode::Byte => self.step_byte(),
                Mode::Decimal => unreachable!("decimal runs inline"),
            }
        }
        (self.target, self.mode)
    }

    //---------------------------------------------------------------------
    // ASCII

    fn step_ascii(&mut self) {
        let len = self.source.len();
        let b = self.source[self.sp];

        if self.gs1 && b == GS {
            self.push(FNC1);
            self.sp += 1;
            if self.sp < len && decimal_run_after_gs(self.runs, self.sp, len) {
                self.run_decimal();
            }
            return;
        }

        if decimal_run_ahead(self.runs, self.sp, len) {
            self.run_decimal();
            return;
        }

        if two_digits_coming(&self.source[self.sp..]) {
            let d1 = self.source[self.sp] - b'0';
            let d2 = self.source[self.sp + 1] - b'0';
            self.push(10 * d1 + d2 + 130);
            self.sp += 2;
            return;
        }

        let mut m = next_mode(self.source, self.sp, Mode::Ascii, self.gs1);
        if let Some((pos, from)) = self.unlatched_at {
            if pos == self.sp && from == m {
                m = Mode::Ascii;
            }
        }

        match m {
            Mode::Ascii => {
                if b > 127 {
                    self.push(UPPER_SHIFT);
                    self.push(b - 127);
                } else {
                    self.push(b + 1);
                }
                self.sp += 1;
            }
            Mode::C40 => self.latch(LATCH_C40, Mode::C40),
            Mode::Text => self.latch(LATCH_TEXT, Mode::Text),
            Mode::Edi => self.latch(LATCH_EDI, Mode::Edi),
            Mode::Byte => {
                self.push(LATCH_BYTE);
                self.byte_start = self.target.len();
                self.push(0); // length field, patched when the run ends
                self.mode = Mode::Byte;
                debug!("latched byte mode at {}", self.sp);
            }
            Mode::Decimal => unreachable!("decimal entry is digit-run driven"),
        }
    }

    fn latch(&mut self, codeword: u8, mode: Mode) {
        self.push(codeword);
        self.mode = mode;
        self.triplet.clear();
        self.triplet_chars.clear();
        debug!("latched {:?} at {}", mode, self.sp);
    }

    //---------------------------------------------------------------------
    // C40 / TEXT / EDI

    fn step_triplet(&mut self) {
        let len = self.source.len();

        if self.triplet.is_empty() {
            // switch decisions only happen on clean value boundaries
            if decimal_run_ahead(self.runs, self.sp, len) {
                self.unlatch_to_ascii();
                return;
            }
            let m = next_mode(self.source, self.sp, self.mode, self.gs1);
            if m != self.mode {
                self.unlatch_to_ascii();
                return;
            }
        }

        let b = self.source[self.sp];
        let vals = match self.mode {
            Mode::C40 => tables::c40_values(b, self.gs1),
            Mode::Text => tables::text_values(b, self.gs1),
            Mode::Edi => match tables::edi_value(b) {
                Some(v) => vec![v],
                None => {
                    self.unlatch_to_ascii();
                    return;
                }
            },
            _ => unreachable!(),
        };

        // a final multi-value character that would strand a lone value in
        // the buffer is emitted in ASCII instead; rollback can only
        // re-encode whole characters
        if self.sp + 1 == len && vals.len() > 1 && (self.triplet.len() + vals.len()) % 3 == 1 {
            self.unlatch_to_ascii();
            return;
        }

        self.triplet_chars.push((self.sp, vals.len()));
        self.triplet.extend(vals);
        self.sp += 1;

        while self.triplet.len() >= 3 {
            self.pack_triplet();
        }
    }

    fn pack_triplet(&mut self) {
        let v = 1600 * self.triplet[0] as u32 + 40 * self.triplet[1] as u32
            + self.triplet[2] as u32
            + 1;
        self.push((v >> 8) as u8);
        self.push((v & 0xFF) as u8);
        self.triplet.drain(..3);
    }

    fn unlatch_to_ascii(&mut self) {
        self.push(UNLATCH);
        self.unlatched_at = Some((self.sp, self.mode));
        self.mode = Mode::Ascii;
        self.triplet.clear();
        self.triplet_chars.clear();
        debug!("unlatched to ascii at {}", self.sp);
    }

    /// End of data in C40/TEXT: two pending values take a pad value and
    /// pack; a lone pending value is always a whole character and rolls
    /// back out to be re-emitted in ASCII.
    fn flush_triplet(&mut self) {
        match self.triplet.len() {
            0 => {}
            2 => {
                self.triplet.push(0);
                self.pack_triplet();
            }
            1 => {
                let (pos, n) = *self.triplet_chars.last().unwrap();
                debug_assert_eq!(n, 1);
                self.sp = pos;
                self.unlatch_to_ascii();
            }
            _ => unreachable!("triplet buffer holds at most two values"),
        }
    }

    /// End of data in EDI: pending values never pad, they always roll
    /// back to ASCII.
    fn flush_edi(&mut self) {
        let pending = self.triplet.len();
        if pending > 0 {
            let first = self.triplet_chars[self.triplet_chars.len() - pending].0;
            self.sp = first;
            self.unlatch_to_ascii();
        }
    }

    //---------------------------------------------------------------------
    // DECIMAL

    /// Run the decimal bit stream from the current position: 4-bit latch
    /// marker, 10-bit digit triplets, 6-bit unlatch, then the final-byte
    /// fill which can carry one leftover digit. Whole bytes become
    /// codewords; the stream always hands back to ASCII.
    fn run_decimal(&mut self) {
        debug!("decimal compaction from {}", self.sp);
        self.mode = Mode::Decimal;
        let mut packed: Vec<u8> = Vec::new();
        let mut bits: u32 = 0;
        {
            let mut writer = BitWriter::endian(&mut packed, BigEndian);
            writer.write(4, 0b1111u32).unwrap(); // latch marker
            bits += 4;

            while self.runs[self.sp] >= 3 {
                let d = &self.source[self.sp..self.sp + 3];
                let value = 100 * (d[0] - b'0') as u32
                    + 10 * (d[1] - b'0') as u32
                    + (d[2] - b'0') as u32
                    + 1;
                writer.write(10, value).unwrap();
                bits += 10;
                self.sp += 3;
            }

            writer.write(6, 0b111111u32).unwrap(); // unlatch
            bits += 6;

            let spare = (8 - bits % 8) % 8;
            if spare == 4 || spare == 6 {
                if self.sp < self.source.len() && self.source[self.sp].is_ascii_digit() {
                    // one leftover digit rides along in the fill
                    let d = self.source[self.sp] - b'0';
                    writer.write(4, (d + 1) as u32).unwrap();
                    self.sp += 1;
                } else {
                    writer.write(4, 0b1111u32).unwrap();
                }
                bits += 4;
            }
            if (8 - bits % 8) % 8 == 2 {
                writer.write(2, 0b01u32).unwrap();
            }
        }
        self.target.extend_from_slice(&packed);
        self.mode = Mode::Ascii;
    }

    //---------------------------------------------------------------------
    // BYTE

    fn step_byte(&mut self) {
        let b = self.source[self.sp];

        if self.gs1 && b == GS {
            // the separator always forces ASCII
            self.end_byte_run();
            return;
        }
        if b <= 127 {
            let m = next_mode(self.source, self.sp, Mode::Byte, self.gs1);
            if m != Mode::Byte {
                self.end_byte_run();
                self.unlatched_at = Some((self.sp, Mode::Byte));
                return;
            }
        }

        self.push(b);
        self.sp += 1;
    }

    /// Patch the reserved length field once the run is over; runs past
    /// 249 bytes grow the field to two codewords.
    fn end_byte_run(&mut self) {
        let n = self.target.len() - self.byte_start - 1;
        if n <= 249 {
            self.target[self.byte_start] = n as u8;
        } else {
            self.target[self.byte_start] = (n / 250 + 249) as u8;
            self.target.insert(self.byte_start + 1, (n % 250) as u8);
        }
        self.mode = Mode::Ascii;
        debug!("byte run of {} finished at {}", n, self.sp);
    }
}

//-------------------------------------------------------------------------------------------------

/// Smallest general version that holds `count` data codewords, or the
/// exact requested version. Too little room either way is a length error
/// naming both counts.
fn select_version(count: usize, requested: Option<Version>) -> Result<Version> {
    match requested {
        Some(v) => {
            let capacity = lookup_version(v).data_length;
            if count <= capacity {
                Ok(v)
            } else {
                Err(EncodeError::TooLong {
                    required: count,
                    maximum: capacity,
                })
            }
        }
        None => AUTO_VERSIONS
            .iter()
            .copied()
            .find(|v| count <= v.data_capacity())
            .ok_or(EncodeError::TooLong {
                required: count,
                maximum: MAX_DATA_CODEWORDS,
            }),
    }
}

/// Pad the stream up to the version capacity: an unlatch first when the
/// stream did not end in ASCII or byte mode, then pad codewords.
fn pad_to_capacity(target: &mut Vec<u8>, final_mode: Mode, capacity: usize) {
    if target.len() < capacity {
        if matches!(final_mode, Mode::C40 | Mode::Text | Mode::Edi) {
            target.push(UNLATCH);
        }
        while target.len() < capacity {
            target.push(PAD);
        }
    }
}

/// Encode segments into the padded data codeword stream and the version
/// it landed on. Handles every version family except S, whose numeric
/// packing bypasses the mode state machine entirely.
pub fn encode_codewords(segments: &[Segment], options: &Options) -> Result<(Vec<u8>, Version)> {
    if let Some(sa) = &options.structured_append {
        if options.gs1 {
            return Err(EncodeError::InvalidOption(
                "structured append cannot be combined with GS1 mode".into(),
            ));
        }
        sa.validate()?;
    }

    let mut header = Vec::new();
    if let Some(sa) = &options.structured_append {
        header.push(STRUCT_APPEND);
        header.push(((sa.index - 1) << 4) | (17 - sa.count));
        header.push((sa.id / 254) as u8 + 1);
        header.push((sa.id % 254) as u8 + 1);
    }
    if options.gs1 {
        header.push(FNC1);
    }

    let source = build_effective_source(segments)?;
    let runs = digit_runs(&source);

    let (mut target, final_mode) = Encoder::new(&source, &runs, options.gs1, header).run();

    let version = select_version(target.len(), options.version)?;
    debug!("selected version {} for {} codewords", version, target.len());

    pad_to_capacity(&mut target, final_mode, version.data_capacity());
    Ok((target, version))
}

/// Version S numeric packing: the digit string becomes a binary value
/// spread over the sub-version's fixed complement of 5-bit words.
pub fn encode_version_s(data: &[u8], sub: u8) -> Result<Vec<u8>> {
    for (i, &b) in data.iter().enumerate() {
        if !b.is_ascii_digit() {
            return Err(EncodeError::InvalidCharacter {
                byte: b,
                position: i,
                expected: "digit (Version S carries numeric data only)",
            });
        }
    }

    let info = lookup_version(Version::S(sub));
    let capacity = tables::s_digit_capacity(sub);
    if data.len() > capacity {
        return Err(EncodeError::TooLong {
            required: 4 * ((data.len() + 5) / 6),
            maximum: info.data_length,
        });
    }

    let mut value: u64 = 0;
    for &b in data {
        value = value * 10 + (b - b'0') as u64;
    }

    let words = info.data_length;
    let mut out = vec![0u8; words];
    for (i, w) in out.iter_mut().rev().enumerate() {
        *w = ((value >> (5 * i)) & 0x1F) as u8;
    }
    Ok(out)
}
