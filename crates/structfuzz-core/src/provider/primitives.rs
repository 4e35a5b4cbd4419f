//! Providers for booleans, integers, floats and strings.
//!
//! All of them emit [`Seed::Known`] so the driver can mutate values at the
//! bit or character level. Constants mined from the target come first,
//! then boundary presets.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::{SeedIter, ValueProvider};
use crate::description::{Comparison, ConstantContext, ConstantValue, Description};
use crate::known::{
    BitVectorValue, Bool, DefaultFloatBound, IEEE754Value, KnownValue, RegexPattern, Signed,
    StringValue, Unsigned,
};
use crate::known::ieee754::{F32_LAYOUT, F64_LAYOUT};
use crate::model::FuzzedValue;
use crate::seed::Seed;
use crate::types::{FuzzedType, PrimitiveKind, TypeKind};

/// Strings that commonly trip up parsers and comparisons.
const DEFAULT_STRINGS: [&str; 7] = ["", "abc", "XZ", "#$\\\"'", "\n\t\r", "10", "-3"];

/// Convert a known value into the host value of a primitive kind.
pub fn cast(kind: PrimitiveKind, value: &KnownValue) -> FuzzedValue {
    match value {
        KnownValue::BitVector(v) => match kind {
            PrimitiveKind::Bool => FuzzedValue::Bool(v.to_bool()),
            PrimitiveKind::I8 => FuzzedValue::I8(v.to_i8()),
            PrimitiveKind::I16 => FuzzedValue::I16(v.to_i16()),
            PrimitiveKind::I32 => FuzzedValue::I32(v.to_i32()),
            PrimitiveKind::I64 => FuzzedValue::I64(v.to_i64()),
            PrimitiveKind::U8 => FuzzedValue::U8(v.to_u8()),
            PrimitiveKind::U16 => FuzzedValue::U16(v.to_u16()),
            PrimitiveKind::U32 => FuzzedValue::U32(v.to_u32()),
            PrimitiveKind::U64 => FuzzedValue::U64(v.to_u64()),
            PrimitiveKind::Char => {
                FuzzedValue::Char(v.to_char().unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            PrimitiveKind::F32 => FuzzedValue::F32(v.to_i32() as f32),
            PrimitiveKind::F64 => FuzzedValue::F64(v.to_i64() as f64),
        },
        KnownValue::Float(v) => match kind {
            PrimitiveKind::F32 => FuzzedValue::F32(v.to_f32()),
            _ => FuzzedValue::F64(v.to_f64()),
        },
        KnownValue::String(s) => FuzzedValue::Str(s.value().to_string()),
    }
}

fn known_seed(kind: PrimitiveKind, value: KnownValue) -> Seed<FuzzedType, FuzzedValue> {
    Seed::known(value, move |v| cast(kind, v))
}

pub struct BoolValueProvider;

impl ValueProvider<FuzzedType, FuzzedValue> for BoolValueProvider {
    fn accept(&self, ty: &FuzzedType) -> bool {
        ty.primitive() == Some(PrimitiveKind::Bool)
    }

    fn generate<'a>(
        &'a self,
        _description: &'a Description<FuzzedType>,
        _ty: &FuzzedType,
    ) -> SeedIter<'a, FuzzedType, FuzzedValue> {
        Box::new(
            [Bool::True, Bool::False]
                .into_iter()
                .map(|b| known_seed(PrimitiveKind::Bool, KnownValue::BitVector(b.value()))),
        )
    }
}

/// Integers and characters.
///
/// Each integer constant of a fitting width is emitted together with its
/// neighbour on the other side of the comparison it appears in.
pub struct IntegerValueProvider;

impl IntegerValueProvider {
    fn constants(description: &Description<FuzzedType>, width: u32) -> Vec<BitVectorValue> {
        let mut values = Vec::new();
        for constant in description.constants() {
            let ConstantValue::Int {
                width: constant_width,
                value,
            } = constant.value
            else {
                continue;
            };
            if constant_width > width {
                continue;
            }
            let v = BitVectorValue::from_i128_with_width(width, value);
            values.push(v.clone());
            if let ConstantContext::Compared(comparison) = constant.context {
                let mut neighbour = v;
                match comparison {
                    Comparison::Eq | Comparison::Ne | Comparison::Le | Comparison::Gt => {
                        neighbour.inc();
                    }
                    Comparison::Lt | Comparison::Ge => {
                        neighbour.dec();
                    }
                }
                values.push(neighbour);
            }
        }
        values
    }
}

impl ValueProvider<FuzzedType, FuzzedValue> for IntegerValueProvider {
    fn accept(&self, ty: &FuzzedType) -> bool {
        ty.primitive().is_some_and(PrimitiveKind::is_integer)
    }

    fn generate<'a>(
        &'a self,
        description: &'a Description<FuzzedType>,
        ty: &FuzzedType,
    ) -> SeedIter<'a, FuzzedType, FuzzedValue> {
        let Some(kind) = ty.primitive() else {
            return Box::new(std::iter::empty());
        };
        let Some(width) = kind.bit_width() else {
            return Box::new(std::iter::empty());
        };

        let mut values = Self::constants(description, width);
        if kind.is_signed() {
            values.extend(Signed::ALL.iter().map(|b| b.value(width)));
        } else {
            values.extend(Unsigned::ALL.iter().map(|b| b.value(width)));
            values.push(Signed::Max.value(width));
            values.push(Signed::Min.value(width));
        }
        let mut unique: Vec<BitVectorValue> = Vec::with_capacity(values.len());
        for v in values {
            if !unique.contains(&v) {
                unique.push(v);
            }
        }

        // single-bit powers of two, produced on demand
        let powers = (1..width.saturating_sub(1)).map(move |bit| {
            BitVectorValue::new(width, move |index: u32, _: u32| index == bit)
        });
        Box::new(
            unique
                .into_iter()
                .chain(powers)
                .map(move |v| known_seed(kind, KnownValue::BitVector(v))),
        )
    }
}

pub struct FloatValueProvider;

impl ValueProvider<FuzzedType, FuzzedValue> for FloatValueProvider {
    fn accept(&self, ty: &FuzzedType) -> bool {
        matches!(
            ty.primitive(),
            Some(PrimitiveKind::F32) | Some(PrimitiveKind::F64)
        )
    }

    fn generate<'a>(
        &'a self,
        description: &'a Description<FuzzedType>,
        ty: &FuzzedType,
    ) -> SeedIter<'a, FuzzedType, FuzzedValue> {
        let Some(kind) = ty.primitive() else {
            return Box::new(std::iter::empty());
        };
        let (mantissa, exponent) = if kind == PrimitiveKind::F32 {
            F32_LAYOUT
        } else {
            F64_LAYOUT
        };
        let constants = description.constants().iter().filter_map(move |c| match c.value {
            ConstantValue::Float(v) if kind == PrimitiveKind::F32 => {
                Some(IEEE754Value::from_f32(v as f32))
            }
            ConstantValue::Float(v) => Some(IEEE754Value::from_f64(v)),
            _ => None,
        });
        let presets = DefaultFloatBound::ALL
            .into_iter()
            .map(move |b| b.value(mantissa, exponent));
        Box::new(
            constants
                .chain(presets)
                .map(move |v| known_seed(kind, KnownValue::Float(v))),
        )
    }
}

/// Strings: constants, a fixed set of tricky literals, then witnesses of
/// every supported pattern constant.
pub struct StringValueProvider;

impl ValueProvider<FuzzedType, FuzzedValue> for StringValueProvider {
    fn accept(&self, ty: &FuzzedType) -> bool {
        matches!(ty.kind(), TypeKind::String)
    }

    fn generate<'a>(
        &'a self,
        description: &'a Description<FuzzedType>,
        _ty: &FuzzedType,
    ) -> SeedIter<'a, FuzzedType, FuzzedValue> {
        let strings = description.constants().iter().filter_map(|c| match &c.value {
            ConstantValue::Str(s) => Some(StringValue::new(s.clone())),
            _ => None,
        });
        let defaults = DEFAULT_STRINGS.into_iter().map(StringValue::new);

        let mut patterns: Vec<&str> = Vec::new();
        for c in description.constants() {
            if let (ConstantValue::Str(s), ConstantContext::Pattern) = (&c.value, c.context) {
                if !patterns.contains(&s.as_str()) {
                    patterns.push(s);
                }
            }
        }
        let witnesses = patterns.into_iter().filter_map(|p| {
            let pattern = match RegexPattern::parse(p) {
                Ok(pattern) => Arc::new(pattern),
                Err(e) => {
                    debug!(pattern = p, error = %e, "skipping pattern constant");
                    return None;
                }
            };
            let mut rng = StdRng::seed_from_u64(0);
            StringValue::from_pattern(pattern, &mut rng).ok()
        });

        Box::new(
            strings
                .chain(defaults)
                .chain(witnesses)
                .map(|s| Seed::known(KnownValue::String(s), |v| FuzzedValue::Str(v.to_string()))),
        )
    }
}
