//! Fixed-width 160-bit ring arithmetic.
//!
//! Identifiers are positions on the ring: 20-byte big-endian unsigned
//! integers, the width of a SHA-1 digest. Lexicographic byte order equals
//! numeric order for this representation, so the derived `Ord` is the
//! numeric comparison. All arithmetic is modulo 2^160; overflow wraps
//! silently.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Width of an identifier in bytes. Matches the SHA-1 digest and is
/// load-bearing throughout: the finger table has one entry per bit.
pub const ID_BYTES: usize = 20;

/// Width of an identifier in bits.
pub const ID_BITS: u32 = 160;

/// A position on the 160-bit identifier ring.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier([u8; ID_BYTES]);

impl Identifier {
    /// The minimum identifier (all bits clear).
    pub fn zero() -> Self {
        Identifier([0u8; ID_BYTES])
    }

    /// The maximum identifier (all bits set).
    pub fn max_value() -> Self {
        Identifier([0xff; ID_BYTES])
    }

    /// Builds an identifier from a small integer, zero-extended on the left.
    pub fn from_u32(n: u32) -> Self {
        let mut bytes = [0u8; ID_BYTES];
        bytes[ID_BYTES - 4..].copy_from_slice(&n.to_be_bytes());
        Identifier(bytes)
    }

    /// Builds an identifier from its big-endian byte representation.
    pub fn from_bytes(bytes: [u8; ID_BYTES]) -> Self {
        Identifier(bytes)
    }

    /// Hashes a key string onto the ring.
    pub fn hash_key(key: &str) -> Self {
        let digest = Sha1::digest(key.as_bytes());
        let mut bytes = [0u8; ID_BYTES];
        bytes.copy_from_slice(&digest);
        Identifier(bytes)
    }

    /// Big-endian byte representation.
    pub fn as_bytes(&self) -> &[u8; ID_BYTES] {
        &self.0
    }

    /// `self + other` modulo 2^160. The carry out of the top byte is dropped.
    pub fn wrapping_add(self, other: Identifier) -> Self {
        let mut out = [0u8; ID_BYTES];
        let mut carry = 0u16;
        for i in (0..ID_BYTES).rev() {
            let sum = u16::from(self.0[i]) + u16::from(other.0[i]) + carry;
            out[i] = (sum & 0xff) as u8;
            carry = sum >> 8;
        }
        Identifier(out)
    }

    /// `self - other` modulo 2^160, via the two's complement of `other`.
    /// Exact only when `other <= self`; a larger subtrahend wraps.
    pub fn wrapping_sub(self, other: Identifier) -> Self {
        self.wrapping_add(other.complement().wrapping_add(Identifier::from_u32(1)))
    }

    /// The next identifier clockwise, wrapping at the top of the ring.
    pub fn next(self) -> Self {
        self.wrapping_add(Identifier::from_u32(1))
    }

    /// `self / 2`: logical right shift, carrying each byte's low bit into the
    /// byte below it.
    pub fn halve(self) -> Self {
        let mut out = [0u8; ID_BYTES];
        let mut carry = false;
        for (i, &byte) in self.0.iter().enumerate() {
            out[i] = if carry { 0x80 | (byte >> 1) } else { byte >> 1 };
            carry = byte & 1 != 0;
        }
        Identifier(out)
    }

    /// `2^i`, or zero when `i >= 160`.
    pub fn pow2(i: u32) -> Self {
        if i >= ID_BITS {
            return Identifier::zero();
        }
        let mut bytes = [0u8; ID_BYTES];
        let byte_i = ((ID_BITS - 1 - i) / 8) as usize;
        let bit_i = i % 8;
        bytes[byte_i] = 1 << bit_i;
        Identifier(bytes)
    }

    /// Non-wrapping inclusive range test: `lo <= self <= hi`. Requires
    /// `hi >= lo`; the wrap-aware predicates in [`crate::interval`] build on
    /// this.
    pub fn in_range(self, lo: Identifier, hi: Identifier) -> bool {
        lo <= self && self <= hi
    }

    fn complement(self) -> Self {
        let mut out = [0u8; ID_BYTES];
        for (i, &byte) in self.0.iter().enumerate() {
            out[i] = !byte;
        }
        Identifier(out)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
