//! Known values: typed bit-level representations that mutate in place of
//! opaque host values.

pub mod bitvector;
pub mod ieee754;
pub mod string;

use std::fmt;

use rand::RngCore;

pub use bitvector::{Bool, Bound, BitVectorMutation, BitVectorValue, Signed, Unsigned};
pub use ieee754::{DefaultFloatBound, FloatBound, FloatMutation, IEEE754Value};
pub use string::{is_supported_pattern, RegexPattern, StringMutation, StringValue};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KnownValue {
    BitVector(BitVectorValue),
    Float(IEEE754Value),
    String(StringValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownMutation {
    BitVector(BitVectorMutation),
    Float(FloatMutation),
    String(StringMutation),
}

impl KnownValue {
    pub fn mutations(&self) -> Vec<KnownMutation> {
        match self {
            KnownValue::BitVector(v) => v.mutations().iter().copied().map(KnownMutation::BitVector).collect(),
            KnownValue::Float(v) => v.mutations().iter().copied().map(KnownMutation::Float).collect(),
            KnownValue::String(v) => v.mutations().iter().copied().map(KnownMutation::String).collect(),
        }
    }

    /// Apply `mutation` if it belongs to this kind of value.
    pub fn mutate(
        &self,
        mutation: KnownMutation,
        rng: &mut dyn RngCore,
        max_string_length: usize,
    ) -> Option<KnownValue> {
        match (self, mutation) {
            (KnownValue::BitVector(v), KnownMutation::BitVector(m)) => {
                Some(KnownValue::BitVector(v.mutate(m, rng)))
            }
            (KnownValue::Float(v), KnownMutation::Float(m)) => Some(KnownValue::Float(v.mutate(m, rng))),
            (KnownValue::String(v), KnownMutation::String(m)) => {
                Some(KnownValue::String(v.mutate(m, rng, max_string_length)))
            }
            _ => None,
        }
    }

    pub fn last_mutation(&self) -> Option<KnownMutation> {
        match self {
            KnownValue::BitVector(v) => v.last_mutation().map(KnownMutation::BitVector),
            KnownValue::Float(v) => v.last_mutation().map(KnownMutation::Float),
            KnownValue::String(v) => v.last_mutation().map(KnownMutation::String),
        }
    }

    pub fn is_mutated(&self) -> bool {
        self.last_mutation().is_some()
    }
}

impl fmt::Display for KnownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnownValue::BitVector(v) => v.fmt(f),
            KnownValue::Float(v) => v.fmt(f),
            KnownValue::String(v) => v.fmt(f),
        }
    }
}
