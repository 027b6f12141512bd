use super::Mode;
use crate::tables::{is_edi, is_edi_terminator};

// The cost race runs in sixths of a codeword so that the fractional
// per-character prices (1/2 in ASCII, 2/3 and 4/3 in the triplet modes)
// stay exact integers. Tie comparisons depend on this exactness.
const MULT: i32 = 6;

/// Round a running cost up to the next whole codeword.
fn rnd(cost: i32) -> i32 {
    (cost + MULT - 1) / MULT * MULT
}

#[derive(Clone, Copy)]
struct Costs {
    ascii: i32,
    c40: i32,
    text: i32,
    edi: i32,
    byte: i32,
}

impl Costs {
    fn rounded(&self) -> Costs {
        Costs {
            ascii: rnd(self.ascii),
            c40: rnd(self.c40),
            text: rnd(self.text),
            edi: rnd(self.edi),
            byte: rnd(self.byte),
        }
    }
}

fn is_c40_native(b: u8) -> bool {
    b == b' ' || b.is_ascii_digit() || b.is_ascii_uppercase()
}

fn is_text_native(b: u8) -> bool {
    b == b' ' || b.is_ascii_digit() || b.is_ascii_lowercase()
}

/// Decide between C40 and EDI when their costs are exactly tied: EDI wins
/// only if one of its terminator characters shows up before any byte the
/// EDI alphabet cannot carry.
fn edi_tie_break(source: &[u8], position: usize) -> Mode {
    for &b in &source[position..] {
        if is_edi_terminator(b) {
            return Mode::Edi;
        }
        if !is_edi(b) {
            return Mode::C40;
        }
    }
    Mode::C40
}

/// Priority-ordered winner test over rounded costs. Mid-scan a candidate
/// must beat every rival by a full codeword; returns None while the race
/// is still open.
fn decide_rounded(c: &Costs, source: &[u8], position: usize) -> Option<Mode> {
    let r = c.rounded();
    if r.byte + MULT <= r.ascii.min(r.c40).min(r.text).min(r.edi) {
        return Some(Mode::Byte);
    }
    if r.ascii + MULT <= r.c40.min(r.text).min(r.edi).min(r.byte) {
        return Some(Mode::Ascii);
    }
    if r.text + MULT <= r.ascii.min(r.c40).min(r.edi).min(r.byte) {
        return Some(Mode::Text);
    }
    if r.c40 + MULT <= r.ascii.min(r.text).min(r.byte) {
        if r.c40 + MULT <= r.edi {
            return Some(Mode::C40);
        }
        if r.c40 == r.edi {
            return Some(edi_tie_break(source, position));
        }
    }
    if r.edi + MULT <= r.ascii.min(r.c40).min(r.text).min(r.byte) {
        return Some(Mode::Edi);
    }
    None
}

/// Winner test at end of input: same priority order, inclusive
/// comparisons on the unrounded costs, ASCII as the fallback. BYTE keeps
/// its one-codeword margin (its length field is already priced in, but a
/// tie should never drag the stream into byte mode).
fn decide_final(c: &Costs, source: &[u8], position: usize) -> Mode {
    if c.byte + MULT <= c.ascii.min(c.c40).min(c.text).min(c.edi) {
        return Mode::Byte;
    }
    if c.ascii <= c.c40.min(c.text).min(c.edi).min(c.byte) {
        return Mode::Ascii;
    }
    if c.text <= c.ascii.min(c.c40).min(c.edi).min(c.byte) {
        return Mode::Text;
    }
    if c.c40 <= c.ascii.min(c.text).min(c.byte) {
        if c.c40 < c.edi {
            return Mode::C40;
        }
        if c.c40 == c.edi {
            return edi_tie_break(source, position);
        }
    }
    if c.edi <= c.ascii.min(c.c40).min(c.text).min(c.byte) {
        return Mode::Edi;
    }
    Mode::Ascii
}

/// Estimate the cheapest encodation mode for the input from `position`
/// onward, given the mode currently latched. Costs are seeded with the
/// switch price (one codeword, two for byte mode's latch plus length
/// field, one more when an unlatch to ASCII has to come first), then race
/// character by character until one mode is a clear winner. The winner
/// test only arms after four characters; this threshold is pinned.
pub(super) fn next_mode(source: &[u8], position: usize, current: Mode, gs1: bool) -> Mode {
    let mut c = match current {
        Mode::Ascii | Mode::Decimal => Costs {
            ascii: 0,
            c40: MULT,
            text: MULT,
            edi: MULT,
            byte: 2 * MULT,
        },
        _ => Costs {
            ascii: MULT,
            c40: 2 * MULT,
            text: 2 * MULT,
            edi: 2 * MULT,
            byte: 3 * MULT,
        },
    };
    match current {
        Mode::C40 => c.c40 = 0,
        Mode::Text => c.text = 0,
        Mode::Edi => c.edi = 0,
        Mode::Byte => c.byte = 0,
        _ => {}
    }

    for sp in position..source.len() {
        let b = source[sp];
        let high = b > 127;
        let reduced = if high { b - 128 } else { b };

        if b.is_ascii_digit() {
            c.ascii += MULT / 2;
        } else {
            // a pending half-priced digit cannot pair with a non-digit
            c.ascii = rnd(c.ascii);
            c.ascii += if high { 2 * MULT } else { MULT };
        }

        c.c40 += if is_c40_native(reduced) { 4 } else { 8 };
        c.text += if is_text_native(reduced) { 4 } else { 8 };
        if gs1 && b == 0x1D {
            c.edi += 2 * MULT;
        } else {
            c.edi += if is_edi(reduced) { 4 } else { 8 };
        }
        if high {
            c.c40 += 8;
            c.text += 8;
            c.edi += 8;
        }

        c.byte += MULT;

        if sp >= position + 3 {
            if let Some(m) = decide_rounded(&c, source, sp + 1) {
                return m;
            }
        }
    }

    decide_final(&c, source, position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_stay_ascii() {
        assert_eq!(next_mode(b"12345678", 0, Mode::Ascii, false), Mode::Ascii);
    }

    #[test]
    fn test_short_upper_case_prefers_c40() {
        assert_eq!(next_mode(b"KICAD", 0, Mode::Ascii, false), Mode::C40);
    }

    #[test]
    fn test_long_upper_case_prefers_c40() {
        assert_eq!(
            next_mode(b"ABCDEFGHIJKLMNOP", 0, Mode::Ascii, false),
            Mode::C40
        );
    }

    #[test]
    fn test_lower_case_prefers_text() {
        assert_eq!(next_mode(b"hello there", 0, Mode::Ascii, false), Mode::Text);
    }

    #[test]
    fn test_high_bit_run_prefers_byte() {
        assert_eq!(
            next_mode(&[0x80, 0x90, 0xA0, 0xB0, 0xC0, 0xD0], 0, Mode::Ascii, false),
            Mode::Byte
        );
    }

    #[test]
    fn test_edi_wins_tie_with_terminator_ahead() {
        assert_eq!(next_mode(b"AB*CD*EF>", 0, Mode::Ascii, false), Mode::Edi);
    }

    #[test]
    fn test_latched_mode_keeps_winning_its_own_content() {
        assert_eq!(next_mode(b"UPPER ONLY", 2, Mode::C40, false), Mode::C40);
        assert_eq!(next_mode(b"lower only", 2, Mode::Text, false), Mode::Text);
    }

    #[test]
    fn test_ascii_recovers_from_c40_on_digits() {
        assert_eq!(
            next_mode(b"12345678901234567890", 0, Mode::C40, false),
            Mode::Ascii
        );
    }
}
