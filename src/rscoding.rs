/// Reed-Solomon error correction over configurable Galois fields.
///
/// The symbology needs two fields: GF(2^8) generated by 0x12D for the
/// general and T versions, and GF(2^5) generated by 0x25 for Version S.
/// Generator polynomials use consecutive roots starting at alpha^1.
use crate::config::Version;
use crate::tables::lookup_version;

use log::debug;

/// Log/antilog tables for one GF(2^m), m derived from the degree of the
/// primitive polynomial.
#[derive(Debug, Clone)]
pub struct GaloisField {
    size: usize, // field order (number of elements)
    log: Vec<usize>,
    alog: Vec<u8>,
}

impl GaloisField {
    pub fn new(prime_poly: u16) -> GaloisField {
        let degree = (15 - prime_poly.leading_zeros()) as usize;
        let size = 1usize << degree;

        let mut log = vec![0usize; size];
        let mut alog = vec![0u8; size - 1];

        let mut x: u16 = 1;
        for i in 0..size - 1 {
            alog[i] = x as u8;
            log[x as usize] = i;
            x <<= 1;
            if x & size as u16 != 0 {
                x ^= prime_poly;
            }
        }

        GaloisField { size, log, alog }
    }

    /// Field order (256 for GF(2^8), 32 for GF(2^5)).
    pub fn size(&self) -> usize {
        self.size
    }

    /// alpha^power
    pub fn exp(&self, power: usize) -> u8 {
        self.alog[power % (self.size - 1)]
    }

    pub fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        self.alog[(self.log[a as usize] + self.log[b as usize]) % (self.size - 1)]
    }
}

/// Fixed-parameter Reed-Solomon encoder: `nsym` check symbols from the
/// product generator (x - alpha^first_root)...(x - alpha^(first_root+nsym-1)).
#[derive(Debug, Clone)]
pub struct RsEncoder {
    gf: GaloisField,
    generator: Vec<u8>, // nsym + 1 coefficients, leading term first
    nsym: usize,
}

impl RsEncoder {
    pub fn new(prime_poly: u16, nsym: usize, first_root: usize) -> RsEncoder {
        let gf = GaloisField::new(prime_poly);

        let mut generator = vec![1u8];
        for i in 0..nsym {
            let root = gf.exp(first_root + i);
            let mut next = vec![0u8; generator.len() + 1];
            for (j, &g) in generator.iter().enumerate() {
                next[j] ^= g; // g * x
                next[j + 1] ^= gf.mul(g, root);
            }
            generator = next;
        }

        RsEncoder {
            gf,
            generator,
            nsym,
        }
    }

    /// Check symbols for `data`, computed as the remainder of the synthetic
    /// division of data(x) * x^nsym by the generator polynomial.
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let mut remainder = vec![0u8; self.nsym];
        for &d in data {
            let factor = d ^ remainder[0];
            remainder.rotate_left(1);
            remainder[self.nsym - 1] = 0;
            if factor != 0 {
                for j in 0..self.nsym {
                    remainder[j] ^= self.gf.mul(self.generator[j + 1], factor);
                }
            }
        }
        remainder
    }
}

/// Extend a full data codeword stream with its error correction per the
/// version's fixed block structure: the small versions use one block, the
/// three largest distribute data round-robin over 2/4/8 blocks and
/// re-interleave the per-block check symbols into the trailing region.
pub fn construct_codewords(data: &[u8], version: Version) -> Vec<u8> {
    let info = lookup_version(version);
    assert_eq!(
        data.len(),
        info.data_length,
        "data must be padded to the version capacity before ecc generation"
    );

    let rs = RsEncoder::new(info.field_poly, info.ecc_per_block, 1);
    debug!(
        "version {}: {} block(s) of {}+{} codewords",
        version, info.blocks, info.data_per_block, info.ecc_per_block
    );

    let mut out = data.to_vec();
    out.resize(info.total_length(), 0);

    for b in 0..info.blocks {
        let block: Vec<u8> = data.iter().skip(b).step_by(info.blocks).copied().collect();
        let ecc = rs.encode(&block);
        for (j, &e) in ecc.iter().enumerate() {
            out[info.data_length + j * info.blocks + b] = e;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Version;

    #[test]
    fn test_field_tables_round_trip() {
        for &poly in &[0x12Du16, 0x25u16] {
            let gf = GaloisField::new(poly);
            for v in 1..gf.size() {
                let l = gf.log[v];
                assert_eq!(gf.alog[l] as usize, v);
            }
        }
    }

    #[test]
    fn test_field_multiplication_basics() {
        let gf = GaloisField::new(0x12D);
        assert_eq!(gf.mul(0, 77), 0);
        assert_eq!(gf.mul(77, 1), 77);
        assert_eq!(gf.mul(3, 7), gf.mul(7, 3));
        // distributivity over a sample
        let (a, b, c) = (0x53, 0xCA, 0x0F);
        assert_eq!(gf.mul(a, b ^ c), gf.mul(a, b) ^ gf.mul(a, c));
    }

    #[test]
    fn test_small_field_stays_in_range() {
        let gf = GaloisField::new(0x25);
        assert_eq!(gf.size(), 32);
        for a in 0..32u8 {
            for b in 0..32u8 {
                assert!(gf.mul(a, b) < 32);
            }
        }
    }

    #[test]
    fn test_generator_polynomial_shape() {
        let rs = RsEncoder::new(0x12D, 10, 1);
        assert_eq!(rs.generator.len(), 11);
        assert_eq!(rs.generator[0], 1);
    }

    #[test]
    fn test_encode_deterministic() {
        let rs = RsEncoder::new(0x12D, 10, 1);
        let data = [142u8, 164, 186, 208, 230, 252, 129, 129, 129, 129];
        assert_eq!(rs.encode(&data), rs.encode(&data));
        assert_eq!(rs.encode(&data).len(), 10);
    }

    #[test]
    fn test_encode_is_linear() {
        // RS codes are linear: ecc(a ^ b) == ecc(a) ^ ecc(b)
        let rs = RsEncoder::new(0x12D, 16, 1);
        let a = [12u8, 0, 55, 200, 3, 9, 77, 31, 4, 254, 17, 60, 128, 1, 2, 3, 4, 5, 6];
        let b = [99u8, 45, 1, 0, 0, 88, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22];
        let x: Vec<u8> = a.iter().zip(b.iter()).map(|(p, q)| p ^ q).collect();
        let ea = rs.encode(&a);
        let eb = rs.encode(&b);
        let ex = rs.encode(&x);
        for i in 0..ea.len() {
            assert_eq!(ex[i], ea[i] ^ eb[i]);
        }
    }

    #[test]
    fn test_first_root_changes_code() {
        let a = RsEncoder::new(0x12D, 8, 0);
        let b = RsEncoder::new(0x12D, 8, 1);
        let data = [1u8, 2, 3, 4, 5];
        assert_ne!(a.encode(&data), b.encode(&data));
    }

    #[test]
    fn test_construct_codewords_single_block() {
        let data = vec![5u8; 10];
        let out = construct_codewords(&data, Version::A);
        assert_eq!(out.len(), 20);
        assert_eq!(&out[..10], &data[..]);
        // deterministic
        assert_eq!(out, construct_codewords(&data, Version::A));
    }

    #[test]
    fn test_construct_codewords_interleaved() {
        let data: Vec<u8> = (0..370).map(|i| (i % 251) as u8).collect();
        let out = construct_codewords(&data, Version::F);
        assert_eq!(out.len(), 510);

        // re-derive block 0 by hand and check its ecc sits at every
        // second trailing position
        let rs = RsEncoder::new(0x12D, 70, 1);
        let block0: Vec<u8> = data.iter().step_by(2).copied().collect();
        assert_eq!(block0.len(), 185);
        let ecc0 = rs.encode(&block0);
        for (j, &e) in ecc0.iter().enumerate() {
            assert_eq!(out[370 + j * 2], e);
        }
    }
}
