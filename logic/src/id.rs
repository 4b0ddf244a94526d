use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

use rand::Rng;

use crate::consts::{ID_LEN, ID_LEN_BITS};
use crate::error::Error;

/// A 160-bit DHT identifier.
///
/// Stored as three limbs (`hi: u64, mid: u64, lo: u32`, most-significant
/// first) rather than a `[u8; 20]` so that [`Id::split_in_half`] is a direct
/// transliteration of the original implementation's per-limb bit arithmetic
/// (it hand-carries between the 64/64/32 boundaries the same way).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id {
    hi: u64,
    mid: u64,
    lo: u32,
}

impl Id {
    /// The smallest representable id (`0`).
    pub const MIN: Id = Id { hi: 0, mid: 0, lo: 0 };
    /// The largest representable id (`2^160 - 1`).
    pub const MAX: Id = Id {
        hi: u64::MAX,
        mid: u64::MAX,
        lo: u32::MAX,
    };
    /// Alias of [`Id::MIN`], used as a zero value / sentinel.
    pub const ZERO: Id = Id::MIN;

    pub fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        let hi = u64::from_be_bytes(bytes[0..8].try_into().unwrap());
        let mid = u64::from_be_bytes(bytes[8..16].try_into().unwrap());
        let lo = u32::from_be_bytes(bytes[16..20].try_into().unwrap());
        Id { hi, mid, lo }
    }

    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let arr: [u8; ID_LEN] = bytes
            .try_into()
            .map_err(|_| Error::InvalidArgument("id must be exactly 20 bytes"))?;
        Ok(Self::from_bytes(arr))
    }

    pub fn to_bytes(&self) -> [u8; ID_LEN] {
        let mut out = [0u8; ID_LEN];
        out[0..8].copy_from_slice(&self.hi.to_be_bytes());
        out[8..16].copy_from_slice(&self.mid.to_be_bytes());
        out[16..20].copy_from_slice(&self.lo.to_be_bytes());
        out
    }

    pub fn parse_hex(s: &str) -> Result<Self, Error> {
        if s.len() != ID_LEN * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidArgument("id hex string must be 40 lowercase hex chars"));
        }
        let mut bytes = [0u8; ID_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| Error::InvalidArgument("id hex string must be 40 lowercase hex chars"))?;
        Ok(Self::from_bytes(bytes))
    }

    /// Test-only convenience: panics instead of returning a `Result`.
    #[cfg(test)]
    pub(crate) fn from_hex(s: &str) -> Self {
        // Accept short, non-40-char hex in tests by left-padding with zeros,
        // mirroring the way fixtures in the teacher's tests write ids.
        let padded = format!("{:0>40}", s);
        Self::parse_hex(&padded).unwrap()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Trimmed hex, for compact human-readable logging (full ids in logs
    /// are rarely useful and dominate the line).
    pub fn as_short_hex(&self) -> String {
        let full = self.to_hex();
        let trimmed = full.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_owned()
        } else {
            trimmed.to_owned()
        }
    }

    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Id {
            hi: rng.gen(),
            mid: rng.gen(),
            lo: rng.gen(),
        }
    }

    pub fn xor(&self, rhs: &Id) -> Id {
        Id {
            hi: self.hi ^ rhs.hi,
            mid: self.mid ^ rhs.mid,
            lo: self.lo ^ rhs.lo,
        }
    }

    /// Number of leading zero bits over the full 160-bit representation.
    pub fn leading_zeros(&self) -> u32 {
        if self.hi != 0 {
            self.hi.leading_zeros()
        } else if self.mid != 0 {
            64 + self.mid.leading_zeros()
        } else {
            128 + self.lo.leading_zeros()
        }
    }

    /// A [`Id`] with a single bit set, at `pos` counted from the
    /// most-significant bit (`pos == 0` is the top bit of `hi`).
    fn single_bit(pos: u32) -> Id {
        debug_assert!(pos < ID_LEN_BITS as u32);
        if pos < 64 {
            Id { hi: 1u64 << (63 - pos), mid: 0, lo: 0 }
        } else if pos < 128 {
            Id { hi: 0, mid: 1u64 << (127 - pos), lo: 0 }
        } else {
            Id { hi: 0, mid: 0, lo: 1u32 << (159 - pos) }
        }
    }

    /// Subdivides the interval `[low, high]` at the first bit where `low`
    /// and `high` differ.
    ///
    /// Returns `None` when `low == high` (the interval already names a
    /// single id and cannot be split further). Otherwise returns
    /// `(mid_low, mid_high)` such that `low <= mid_low < mid_high <= high`,
    /// `mid_low` is the greatest id sharing the common prefix with trailing
    /// bits all `1`, and `mid_high` is the least id sharing the common
    /// prefix extended by the next bit with trailing bits all `0`.
    pub fn split_in_half(low: Id, high: Id) -> Option<(Id, Id)> {
        if low == high {
            return None;
        }
        let diff = low.xor(&high);
        let common_prefix_len = diff.leading_zeros();
        let mask = !diff;
        let new_bit = Id::single_bit(common_prefix_len);
        let prefix_and_bit = mask | new_bit;
        let trailing_ones = !prefix_and_bit;

        let mid_low = low | trailing_ones;
        let mid_high = high & prefix_and_bit;
        Some((mid_low, mid_high))
    }
}

impl BitXor for Id {
    type Output = Id;
    fn bitxor(self, rhs: Id) -> Id {
        self.xor(&rhs)
    }
}

impl BitOr for Id {
    type Output = Id;
    fn bitor(self, rhs: Id) -> Id {
        Id {
            hi: self.hi | rhs.hi,
            mid: self.mid | rhs.mid,
            lo: self.lo | rhs.lo,
        }
    }
}

impl BitAnd for Id {
    type Output = Id;
    fn bitand(self, rhs: Id) -> Id {
        Id {
            hi: self.hi & rhs.hi,
            mid: self.mid & rhs.mid,
            lo: self.lo & rhs.lo,
        }
    }
}

impl Not for Id {
    type Output = Id;
    fn not(self) -> Id {
        Id {
            hi: !self.hi,
            mid: !self.mid,
            lo: !self.lo,
        }
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.as_short_hex()).finish()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_short_hex())
    }
}
