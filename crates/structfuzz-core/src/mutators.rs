//! Post-hoc mutators: small edits applied to already created values.
//!
//! Unlike the tree mutations inside the driver, these see only the final
//! value and the description it was produced for.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::description::{ConstantContext, ConstantValue, Description};
use crate::known::string::nearby_character;
use crate::known::{BitVectorValue, RegexPattern};
use crate::model::FuzzedValue;

pub trait Mutator<T, R> {
    /// A value derived from `value`, or `None` when this mutator does not
    /// apply to it.
    fn mutate(
        &self,
        description: &Description<T>,
        index: usize,
        value: &R,
        rng: &mut dyn RngCore,
    ) -> Option<R>;
}

/// Tries its mutators in a random order and returns the first result.
pub struct MutatorChain<T, R> {
    mutators: Vec<Box<dyn Mutator<T, R>>>,
}

impl<T, R> Default for MutatorChain<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R> MutatorChain<T, R> {
    pub fn new() -> Self {
        Self {
            mutators: Vec::new(),
        }
    }

    pub fn with(mut self, mutator: impl Mutator<T, R> + 'static) -> Self {
        self.mutators.push(Box::new(mutator));
        self
    }

    pub fn len(&self) -> usize {
        self.mutators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutators.is_empty()
    }

    pub fn mutate(
        &self,
        description: &Description<T>,
        index: usize,
        value: &R,
        rng: &mut dyn RngCore,
    ) -> Option<R> {
        let mut order: Vec<&dyn Mutator<T, R>> = self.mutators.iter().map(|m| m.as_ref()).collect();
        order.shuffle(rng);
        order
            .into_iter()
            .find_map(|m| m.mutate(description, index, value, rng))
    }
}

/// Bit-flip, string edit and pattern mutators for [`FuzzedValue`].
pub fn default_mutators<T: Clone + 'static>(max_string_length: usize) -> MutatorChain<T, FuzzedValue> {
    MutatorChain::new()
        .with(BitFlipMutator)
        .with(StringEditMutator { max_length: max_string_length })
        .with(PatternMutator)
}

/// Flips one random bit of a number's native representation.
pub struct BitFlipMutator;

fn flip(bits: BitVectorValue, rng: &mut dyn RngCore) -> BitVectorValue {
    let mut bits = bits;
    let index = rng.gen_range(0..bits.width());
    bits.flip(index);
    bits
}

impl<T> Mutator<T, FuzzedValue> for BitFlipMutator {
    fn mutate(
        &self,
        _description: &Description<T>,
        _index: usize,
        value: &FuzzedValue,
        rng: &mut dyn RngCore,
    ) -> Option<FuzzedValue> {
        let mutated = match value {
            FuzzedValue::Bool(b) => FuzzedValue::Bool(!b),
            FuzzedValue::I8(v) => FuzzedValue::I8(flip(BitVectorValue::from_i8(*v), rng).to_i8()),
            FuzzedValue::I16(v) => FuzzedValue::I16(flip(BitVectorValue::from_i16(*v), rng).to_i16()),
            FuzzedValue::I32(v) => FuzzedValue::I32(flip(BitVectorValue::from_i32(*v), rng).to_i32()),
            FuzzedValue::I64(v) => FuzzedValue::I64(flip(BitVectorValue::from_i64(*v), rng).to_i64()),
            FuzzedValue::U8(v) => FuzzedValue::U8(flip(BitVectorValue::from_u8(*v), rng).to_u8()),
            FuzzedValue::U16(v) => FuzzedValue::U16(flip(BitVectorValue::from_u16(*v), rng).to_u16()),
            FuzzedValue::U32(v) => FuzzedValue::U32(flip(BitVectorValue::from_u32(*v), rng).to_u32()),
            FuzzedValue::U64(v) => FuzzedValue::U64(flip(BitVectorValue::from_u64(*v), rng).to_u64()),
            FuzzedValue::F32(v) => {
                FuzzedValue::F32(f32::from_bits(v.to_bits() ^ (1u32 << rng.gen_range(0..32u32))))
            }
            FuzzedValue::F64(v) => {
                FuzzedValue::F64(f64::from_bits(v.to_bits() ^ (1u64 << rng.gen_range(0..64u32))))
            }
            // surrogate code points have no char
            FuzzedValue::Char(c) => FuzzedValue::Char(flip(BitVectorValue::from_char(*c), rng).to_char()?),
            _ => return None,
        };
        Some(mutated)
    }
}

/// Removes a character and/or inserts one close to an existing one, each
/// with an independent coin flip. The result may equal the input.
pub struct StringEditMutator {
    pub max_length: usize,
}

impl<T> Mutator<T, FuzzedValue> for StringEditMutator {
    fn mutate(
        &self,
        _description: &Description<T>,
        _index: usize,
        value: &FuzzedValue,
        rng: &mut dyn RngCore,
    ) -> Option<FuzzedValue> {
        let FuzzedValue::Str(s) = value else {
            return None;
        };
        let mut chars: Vec<char> = s.chars().collect();
        if !chars.is_empty() && rng.gen_bool(0.5) {
            let at = rng.gen_range(0..chars.len());
            chars.remove(at);
        }
        if chars.len() < self.max_length && rng.gen_bool(0.5) {
            if let Some(c) = nearby_character(&chars, rng) {
                let at = rng.gen_range(0..=chars.len());
                chars.insert(at, c);
            }
        }
        Some(FuzzedValue::Str(chars.into_iter().collect()))
    }
}

/// Replaces a string that matches one of the description's pattern
/// constants with a different witness of the same pattern.
pub struct PatternMutator;

impl<T: Clone> Mutator<T, FuzzedValue> for PatternMutator {
    fn mutate(
        &self,
        description: &Description<T>,
        _index: usize,
        value: &FuzzedValue,
        rng: &mut dyn RngCore,
    ) -> Option<FuzzedValue> {
        let FuzzedValue::Str(s) = value else {
            return None;
        };
        let pattern = description
            .constants()
            .iter()
            .filter(|c| c.context == ConstantContext::Pattern)
            .filter_map(|c| match &c.value {
                ConstantValue::Str(p) => RegexPattern::parse(p.as_str()).ok(),
                _ => None,
            })
            .find(|p| p.is_match(s))?;
        (0..16)
            .filter_map(|_| pattern.witness(rng).ok())
            .find(|w| w != s)
            .map(FuzzedValue::Str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::Constant;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn d() -> Description<&'static str> {
        Description::new(vec!["x"])
    }

    #[test]
    fn test_bit_flip_changes_one_bit() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let Some(FuzzedValue::I32(v)) = BitFlipMutator.mutate(&d(), 0, &FuzzedValue::I32(12345), &mut rng)
            else {
                panic!("expected i32");
            };
            assert_eq!((v ^ 12345).count_ones(), 1);

            let Some(FuzzedValue::F64(f)) = BitFlipMutator.mutate(&d(), 0, &FuzzedValue::F64(1.5), &mut rng)
            else {
                panic!("expected f64");
            };
            assert_eq!((f.to_bits() ^ 1.5f64.to_bits()).count_ones(), 1);
        }
        assert!(BitFlipMutator
            .mutate(&d(), 0, &FuzzedValue::Str("a".into()), &mut rng)
            .is_none());
    }

    #[test]
    fn test_string_edit_makes_at_most_two_edits() {
        let mut rng = StdRng::seed_from_u64(2);
        let mutator = StringEditMutator { max_length: 64 };
        let mut unchanged = 0;
        for _ in 0..200 {
            let Some(FuzzedValue::Str(s)) = mutator.mutate(&d(), 0, &FuzzedValue::Str("hello".into()), &mut rng)
            else {
                panic!("expected string");
            };
            let len = s.chars().count();
            assert!((4..=6).contains(&len), "{s:?}");
            if s == "hello" {
                unchanged += 1;
            }
        }
        // both coins land tails about a quarter of the time
        assert!(unchanged > 20);
    }

    #[test]
    fn test_pattern_mutator_keeps_matching() {
        let description = d().with_constants(vec![Constant::pattern("[a-z]{3}[0-9]")]);
        let pattern = RegexPattern::parse("[a-z]{3}[0-9]").unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut value = FuzzedValue::Str("abc1".into());
        for _ in 0..20 {
            let next = PatternMutator.mutate(&description, 0, &value, &mut rng).unwrap();
            let s = next.as_str().unwrap();
            assert!(pattern.is_match(s));
            assert_ne!(Some(s), value.as_str());
            value = next;
        }
        assert!(PatternMutator
            .mutate(&description, 0, &FuzzedValue::Str("nope".into()), &mut rng)
            .is_none());
    }

    #[test]
    fn test_chain_returns_first_applicable() {
        let chain: MutatorChain<&'static str, FuzzedValue> = default_mutators(64);
        assert_eq!(chain.len(), 3);
        let mut rng = StdRng::seed_from_u64(4);
        let mutated = chain.mutate(&d(), 0, &FuzzedValue::U8(0), &mut rng);
        assert!(matches!(mutated, Some(FuzzedValue::U8(v)) if v.count_ones() == 1));
        assert!(chain.mutate(&d(), 0, &FuzzedValue::Null, &mut rng).is_none());
    }
}
