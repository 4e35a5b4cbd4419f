//! Generic IEEE 754 floating point values.
//!
//! Layout follows the standard encoding: one sign bit, `exponent_size`
//! exponent bits, then `mantissa_size` mantissa bits, most significant first.
//! `f32` is `(23, 8)` and `f64` is `(52, 11)`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::{Rng, RngCore};

pub const F32_LAYOUT: (u32, u32) = (23, 8);
pub const F64_LAYOUT: (u32, u32) = (52, 11);

/// Initializes sign, exponent and mantissa of a float preset.
///
/// Exponent and mantissa indices count from the most significant bit of the
/// respective field.
pub trait FloatBound {
    fn sign(&self) -> bool;
    fn exponent(&self, index: u32, size: u32) -> bool;
    fn mantissa(&self, index: u32, size: u32) -> bool;
}

#[derive(Clone)]
pub struct IEEE754Value {
    bits: u128,
    mantissa_size: u32,
    exponent_size: u32,
    mutated_from: Option<Arc<IEEE754Value>>,
    last_mutation: Option<FloatMutation>,
}

impl IEEE754Value {
    pub fn new(mantissa_size: u32, exponent_size: u32, bound: impl FloatBound) -> Self {
        let mut value = Self::from_raw(mantissa_size, exponent_size, 0);
        value.set_sign(bound.sign());
        for i in 0..exponent_size {
            value.set_exponent_bit(i, bound.exponent(i, exponent_size));
        }
        for i in 0..mantissa_size {
            value.set_mantissa_bit(i, bound.mantissa(i, mantissa_size));
        }
        value
    }

    pub fn from_raw(mantissa_size: u32, exponent_size: u32, bits: u128) -> Self {
        assert!(mantissa_size >= 1 && exponent_size >= 2, "float layout too small");
        assert!(1 + mantissa_size + exponent_size <= 128, "float layout too large");
        let total = 1 + mantissa_size + exponent_size;
        let mask = if total == 128 { u128::MAX } else { (1u128 << total) - 1 };
        Self {
            bits: bits & mask,
            mantissa_size,
            exponent_size,
            mutated_from: None,
            last_mutation: None,
        }
    }

    pub fn from_f32(value: f32) -> Self {
        Self::from_raw(F32_LAYOUT.0, F32_LAYOUT.1, value.to_bits() as u128)
    }

    pub fn from_f64(value: f64) -> Self {
        Self::from_raw(F64_LAYOUT.0, F64_LAYOUT.1, value.to_bits() as u128)
    }

    pub fn mantissa_size(&self) -> u32 {
        self.mantissa_size
    }

    pub fn exponent_size(&self) -> u32 {
        self.exponent_size
    }

    pub fn raw_bits(&self) -> u128 {
        self.bits
    }

    pub fn is_f32(&self) -> bool {
        (self.mantissa_size, self.exponent_size) == F32_LAYOUT
    }

    pub fn is_f64(&self) -> bool {
        (self.mantissa_size, self.exponent_size) == F64_LAYOUT
    }

    pub fn mutated_from(&self) -> Option<&IEEE754Value> {
        self.mutated_from.as_deref()
    }

    pub fn last_mutation(&self) -> Option<FloatMutation> {
        self.last_mutation
    }

    pub fn sign(&self) -> bool {
        self.bit(self.sign_index())
    }

    pub fn set_sign(&mut self, negative: bool) {
        let index = self.sign_index();
        self.set_bit(index, negative);
    }

    pub fn exponent_bit(&self, index: u32) -> bool {
        self.bit(self.exponent_index(index))
    }

    pub fn set_exponent_bit(&mut self, index: u32, value: bool) {
        let at = self.exponent_index(index);
        self.set_bit(at, value);
    }

    pub fn mantissa_bit(&self, index: u32) -> bool {
        self.bit(self.mantissa_index(index))
    }

    pub fn set_mantissa_bit(&mut self, index: u32, value: bool) {
        let at = self.mantissa_index(index);
        self.set_bit(at, value);
    }

    pub fn exponent_raw(&self) -> u128 {
        (self.bits >> self.mantissa_size) & ((1u128 << self.exponent_size) - 1)
    }

    pub fn mantissa_raw(&self) -> u128 {
        self.bits & ((1u128 << self.mantissa_size) - 1)
    }

    pub fn to_f32(&self) -> f32 {
        if self.is_f32() {
            f32::from_bits(self.bits as u32)
        } else {
            self.to_f64() as f32
        }
    }

    pub fn to_f64(&self) -> f64 {
        if self.is_f64() {
            return f64::from_bits(self.bits as u64);
        }
        if self.is_f32() {
            return f32::from_bits(self.bits as u32) as f64;
        }
        let sign = if self.sign() { -1.0 } else { 1.0 };
        let exponent_max = (1u128 << self.exponent_size) - 1;
        let bias = (1i64 << (self.exponent_size - 1)) - 1;
        let exponent = self.exponent_raw();
        let fraction = self.mantissa_raw() as f64 / 2f64.powi(self.mantissa_size as i32);
        if exponent == exponent_max {
            if self.mantissa_raw() == 0 {
                sign * f64::INFINITY
            } else {
                f64::NAN
            }
        } else if exponent == 0 {
            sign * fraction * 2f64.powi((1 - bias) as i32)
        } else {
            sign * (1.0 + fraction) * 2f64.powi((exponent as i64 - bias) as i32)
        }
    }

    pub fn mutations(&self) -> &'static [FloatMutation] {
        &[
            FloatMutation::ChangeSign,
            FloatMutation::Mantissa,
            FloatMutation::Exponent,
        ]
    }

    pub fn mutate(&self, mutation: FloatMutation, rng: &mut dyn RngCore) -> Self {
        let mut next = Self {
            mutated_from: Some(Arc::new(self.clone())),
            last_mutation: Some(mutation),
            ..self.clone()
        };
        match mutation {
            FloatMutation::ChangeSign => next.set_sign(!self.sign()),
            FloatMutation::Mantissa => {
                let i = rng.gen_range(0..self.mantissa_size);
                next.set_mantissa_bit(i, !self.mantissa_bit(i));
            }
            FloatMutation::Exponent => {
                let i = rng.gen_range(0..self.exponent_size);
                next.set_exponent_bit(i, !self.exponent_bit(i));
            }
        }
        next
    }

    fn sign_index(&self) -> u32 {
        self.mantissa_size + self.exponent_size
    }

    fn exponent_index(&self, index: u32) -> u32 {
        self.mantissa_size + self.exponent_size - 1 - index
    }

    fn mantissa_index(&self, index: u32) -> u32 {
        self.mantissa_size - 1 - index
    }

    fn bit(&self, index: u32) -> bool {
        (self.bits >> index) & 1 == 1
    }

    fn set_bit(&mut self, index: u32, value: bool) {
        if value {
            self.bits |= 1u128 << index;
        } else {
            self.bits &= !(1u128 << index);
        }
    }
}

impl PartialEq for IEEE754Value {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
            && self.mantissa_size == other.mantissa_size
            && self.exponent_size == other.exponent_size
    }
}

impl Eq for IEEE754Value {}

impl Hash for IEEE754Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits.hash(state);
        self.mantissa_size.hash(state);
        self.exponent_size.hash(state);
    }
}

impl fmt::Debug for IEEE754Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IEEE754Value({}:{}:{})",
            self.mantissa_size, self.exponent_size, self
        )
    }
}

impl fmt::Display for IEEE754Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_f32() {
            write!(f, "{}", self.to_f32())
        } else {
            write!(f, "{}", self.to_f64())
        }
    }
}

/// Bit flips inside one field of the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatMutation {
    ChangeSign,
    Mantissa,
    Exponent,
}

/// Presets that any layout can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefaultFloatBound {
    Zero,
    Nan,
    Positive,
    Negative,
    PositiveInfinity,
    NegativeInfinity,
}

impl DefaultFloatBound {
    pub const ALL: [DefaultFloatBound; 6] = [
        DefaultFloatBound::Zero,
        DefaultFloatBound::Nan,
        DefaultFloatBound::Positive,
        DefaultFloatBound::Negative,
        DefaultFloatBound::PositiveInfinity,
        DefaultFloatBound::NegativeInfinity,
    ];

    pub fn value(self, mantissa_size: u32, exponent_size: u32) -> IEEE754Value {
        IEEE754Value::new(mantissa_size, exponent_size, self)
    }
}

impl FloatBound for DefaultFloatBound {
    fn sign(&self) -> bool {
        matches!(
            self,
            DefaultFloatBound::Negative | DefaultFloatBound::NegativeInfinity
        )
    }

    fn exponent(&self, index: u32, _size: u32) -> bool {
        match self {
            DefaultFloatBound::Zero => false,
            DefaultFloatBound::Nan
            | DefaultFloatBound::PositiveInfinity
            | DefaultFloatBound::NegativeInfinity => true,
            // 0b0111..1 is the bias, which encodes 1.0
            DefaultFloatBound::Positive | DefaultFloatBound::Negative => index != 0,
        }
    }

    fn mantissa(&self, index: u32, size: u32) -> bool {
        match self {
            DefaultFloatBound::Nan => index == size - 1,
            _ => false,
        }
    }
}
