//! Fixed-width two's-complement bit vectors.
//!
//! A [`BitVectorValue`] stores up to 128 bits. The width is fixed at
//! construction and no operation changes it; all arithmetic wraps inside it.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::{Rng, RngCore};

/// Largest supported width in bits.
pub const MAX_WIDTH: u32 = 128;

/// A bound initializes every bit of a vector from its index and the width.
///
/// Presets are expressed this way so the same symbolic name (e.g.
/// [`Signed::Min`]) works for any width.
pub trait Bound {
    fn initializer(&self, index: u32, width: u32) -> bool;
}

/// Exact fixed-width integer value.
#[derive(Clone)]
pub struct BitVectorValue {
    bits: u128,
    width: u32,
    mutated_from: Option<Arc<BitVectorValue>>,
    last_mutation: Option<BitVectorMutation>,
}

impl BitVectorValue {
    /// Build a vector of `width` bits from a bound.
    ///
    /// Panics if `width` is 0 or larger than [`MAX_WIDTH`]; widths come from
    /// type descriptions, never from generated data.
    pub fn new(width: u32, bound: impl Bound) -> Self {
        assert!(
            (1..=MAX_WIDTH).contains(&width),
            "bit vector width must be in 1..={MAX_WIDTH}, got {width}"
        );
        let mut bits = 0u128;
        for i in 0..width {
            if bound.initializer(i, width) {
                bits |= 1u128 << i;
            }
        }
        Self::from_raw(width, bits)
    }

    /// Build a vector from raw bits, truncated to `width`.
    pub fn from_raw(width: u32, bits: u128) -> Self {
        assert!(
            (1..=MAX_WIDTH).contains(&width),
            "bit vector width must be in 1..={MAX_WIDTH}, got {width}"
        );
        Self {
            bits: bits & mask(width),
            width,
            mutated_from: None,
            last_mutation: None,
        }
    }

    /// Copy `source` and remember it as the origin of the new value.
    pub fn derived(source: &BitVectorValue, mutation: Option<BitVectorMutation>) -> Self {
        Self {
            bits: source.bits,
            width: source.width,
            mutated_from: Some(Arc::new(source.clone())),
            last_mutation: mutation,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn raw_bits(&self) -> u128 {
        self.bits
    }

    pub fn mutated_from(&self) -> Option<&BitVectorValue> {
        self.mutated_from.as_deref()
    }

    pub fn last_mutation(&self) -> Option<BitVectorMutation> {
        self.last_mutation
    }

    pub fn get(&self, index: u32) -> bool {
        index < self.width && (self.bits >> index) & 1 == 1
    }

    pub fn set(&mut self, index: u32, value: bool) {
        if index >= self.width {
            return;
        }
        if value {
            self.bits |= 1u128 << index;
        } else {
            self.bits &= !(1u128 << index);
        }
    }

    pub fn flip(&mut self, index: u32) {
        let current = self.get(index);
        self.set(index, !current);
    }

    /// Increase the value by one.
    ///
    /// Returns `true` when the signed interpretation overflowed, i.e. the
    /// value went from `Signed::Max` to `Signed::Min`.
    pub fn inc(&mut self) -> bool {
        let wrapped = self.bits == signed_max_bits(self.width);
        self.bits = self.bits.wrapping_add(1) & mask(self.width);
        wrapped
    }

    /// Decrease the value by one.
    ///
    /// Returns `true` when the signed interpretation underflowed, i.e. the
    /// value went from `Signed::Min` to `Signed::Max`.
    pub fn dec(&mut self) -> bool {
        let wrapped = self.bits == signed_min_bits(self.width);
        self.bits = self.bits.wrapping_sub(1) & mask(self.width);
        wrapped
    }

    /// Signed interpretation, sign-extended to 128 bits.
    pub fn to_i128(&self) -> i128 {
        if self.width == MAX_WIDTH {
            return self.bits as i128;
        }
        let shift = MAX_WIDTH - self.width;
        ((self.bits << shift) as i128) >> shift
    }

    /// Unsigned interpretation.
    pub fn to_u128(&self) -> u128 {
        self.bits
    }

    pub fn to_bool(&self) -> bool {
        self.get(0)
    }

    pub fn to_i8(&self) -> i8 {
        self.to_i128() as i8
    }

    pub fn to_u8(&self) -> u8 {
        self.bits as u8
    }

    pub fn to_i16(&self) -> i16 {
        self.to_i128() as i16
    }

    pub fn to_u16(&self) -> u16 {
        self.bits as u16
    }

    pub fn to_i32(&self) -> i32 {
        self.to_i128() as i32
    }

    pub fn to_u32(&self) -> u32 {
        self.bits as u32
    }

    pub fn to_i64(&self) -> i64 {
        self.to_i128() as i64
    }

    pub fn to_u64(&self) -> u64 {
        self.bits as u64
    }

    /// The low 16 bits as a character, if they form a valid scalar value.
    pub fn to_char(&self) -> Option<char> {
        char::from_u32(self.to_u16() as u32)
    }

    pub fn from_bool(value: bool) -> Self {
        Self::new(1, if value { Bool::True } else { Bool::False })
    }

    pub fn from_i8(value: i8) -> Self {
        Self::from_raw(8, value as u8 as u128)
    }

    pub fn from_u8(value: u8) -> Self {
        Self::from_raw(8, value as u128)
    }

    pub fn from_i16(value: i16) -> Self {
        Self::from_raw(16, value as u16 as u128)
    }

    pub fn from_u16(value: u16) -> Self {
        Self::from_raw(16, value as u128)
    }

    pub fn from_char(value: char) -> Self {
        Self::from_raw(16, (value as u32 & 0xFFFF) as u128)
    }

    pub fn from_i32(value: i32) -> Self {
        Self::from_raw(32, value as u32 as u128)
    }

    pub fn from_u32(value: u32) -> Self {
        Self::from_raw(32, value as u128)
    }

    pub fn from_i64(value: i64) -> Self {
        Self::from_raw(64, value as u64 as u128)
    }

    pub fn from_u64(value: u64) -> Self {
        Self::from_raw(64, value as u128)
    }

    pub fn from_i128(value: i128) -> Self {
        Self::from_raw(128, value as u128)
    }

    pub fn from_u128(value: u128) -> Self {
        Self::from_raw(128, value)
    }

    /// Two's-complement encoding of `value` truncated to `width` bits.
    pub fn from_i128_with_width(width: u32, value: i128) -> Self {
        Self::from_raw(width, value as u128)
    }

    /// Render the value in `radix` (2..=36), signed unless `unsigned`.
    pub fn to_string_radix(&self, radix: u32, unsigned: bool) -> String {
        assert!((2..=36).contains(&radix), "radix must be in 2..=36");
        let (negative, mut magnitude) = if unsigned {
            (false, self.to_u128())
        } else {
            let v = self.to_i128();
            (v < 0, v.unsigned_abs())
        };
        if magnitude == 0 {
            return "0".to_string();
        }
        let mut digits = Vec::new();
        while magnitude > 0 {
            let d = (magnitude % radix as u128) as u32;
            digits.push(char::from_digit(d, radix).unwrap_or('?'));
            magnitude /= radix as u128;
        }
        if negative {
            digits.push('-');
        }
        digits.iter().rev().collect()
    }

    /// Bits from most significant to least significant.
    pub fn to_binary_string(&self) -> String {
        (0..self.width)
            .rev()
            .map(|i| if self.get(i) { '1' } else { '0' })
            .collect()
    }

    /// Mutations applicable to this value.
    pub fn mutations(&self) -> &'static [BitVectorMutation] {
        &[
            BitVectorMutation::SlightDifferent,
            BitVectorMutation::DifferentWithSameSign,
            BitVectorMutation::ChangeSign,
        ]
    }

    /// Flip one bit chosen from the range the mutation targets.
    pub fn mutate(&self, mutation: BitVectorMutation, rng: &mut dyn RngCore) -> Self {
        let (lo, hi) = mutation.range(self.width);
        let index = if lo < hi { rng.gen_range(lo..hi) } else { lo };
        let mut next = Self::derived(self, Some(mutation));
        next.flip(index);
        next
    }
}

impl PartialEq for BitVectorValue {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.bits == other.bits
    }
}

impl Eq for BitVectorValue {}

impl Hash for BitVectorValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.width.hash(state);
        self.bits.hash(state);
    }
}

impl fmt::Debug for BitVectorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVectorValue({}:{})", self.width, self.to_string_radix(10, false))
    }
}

impl fmt::Display for BitVectorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bound in Signed::ALL {
            if bound.test(self) {
                return f.write_str(bound.name());
            }
        }
        f.write_str(&self.to_string_radix(10, false))
    }
}

/// Bit flips that keep the width and change one bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitVectorMutation {
    /// Flip one of the lowest quarter of bits.
    SlightDifferent,
    /// Flip a higher bit but never the sign bit.
    DifferentWithSameSign,
    /// Flip the sign bit.
    ChangeSign,
}

impl BitVectorMutation {
    /// Half-open index range `[lo, hi)` the mutation may touch.
    fn range(self, width: u32) -> (u32, u32) {
        match self {
            BitVectorMutation::SlightDifferent => (0, (width / 4).max(1)),
            BitVectorMutation::DifferentWithSameSign => {
                let hi = width.saturating_sub(1).max(1);
                ((width / 4).min(hi - 1), hi)
            }
            BitVectorMutation::ChangeSign => (width - 1, width),
        }
    }
}

/// Signed boundary presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signed {
    Zero,
    Min,
    Negative,
    Positive,
    Max,
}

impl Signed {
    pub const ALL: [Signed; 5] = [
        Signed::Zero,
        Signed::Min,
        Signed::Negative,
        Signed::Positive,
        Signed::Max,
    ];

    pub fn value(self, width: u32) -> BitVectorValue {
        BitVectorValue::new(width, self)
    }

    /// Whether `value` is exactly this preset at its own width.
    pub fn test(self, value: &BitVectorValue) -> bool {
        (0..value.width()).all(|i| value.get(i) == self.initializer(i, value.width()))
    }

    pub fn name(self) -> &'static str {
        match self {
            Signed::Zero => "zero",
            Signed::Min => "min",
            Signed::Negative => "negative",
            Signed::Positive => "positive",
            Signed::Max => "max",
        }
    }
}

impl Bound for Signed {
    fn initializer(&self, index: u32, width: u32) -> bool {
        match self {
            Signed::Zero => false,
            Signed::Min => index == width - 1,
            Signed::Negative => true,
            Signed::Positive => index == 0,
            Signed::Max => index < width - 1,
        }
    }
}

/// Unsigned boundary presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unsigned {
    Zero,
    Positive,
    Max,
}

impl Unsigned {
    pub const ALL: [Unsigned; 3] = [Unsigned::Zero, Unsigned::Positive, Unsigned::Max];

    pub fn value(self, width: u32) -> BitVectorValue {
        BitVectorValue::new(width, self)
    }
}

impl Bound for Unsigned {
    fn initializer(&self, index: u32, _width: u32) -> bool {
        match self {
            Unsigned::Zero => false,
            Unsigned::Positive => index == 0,
            Unsigned::Max => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bool {
    False,
    True,
}

impl Bool {
    pub fn value(self) -> BitVectorValue {
        BitVectorValue::new(1, self)
    }
}

impl Bound for Bool {
    fn initializer(&self, _index: u32, _width: u32) -> bool {
        matches!(self, Bool::True)
    }
}

impl<F> Bound for F
where
    F: Fn(u32, u32) -> bool,
{
    fn initializer(&self, index: u32, width: u32) -> bool {
        self(index, width)
    }
}

fn mask(width: u32) -> u128 {
    if width >= MAX_WIDTH {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

fn signed_max_bits(width: u32) -> u128 {
    mask(width) >> 1
}

fn signed_min_bits(width: u32) -> u128 {
    1u128 << (width - 1)
}
