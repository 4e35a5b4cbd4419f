//! Bit-vector and float value tests.
//!
//! Test coverage areas:
//! - Native round trips (exhaustive for 8/16-bit, property-based for 32/64-bit)
//! - Boundary presets for every common width
//! - Increment/decrement wraparound reporting
//! - Float presets and raw-bit conversions

use proptest::prelude::*;
use structfuzz_core::known::{BitVectorValue, DefaultFloatBound, IEEE754Value, Signed, Unsigned};

// =============================================================================
// Round Trips
// =============================================================================

mod round_trip_tests {
    use super::*;

    #[test]
    fn test_exhaustive_8_bit() {
        for v in i8::MIN..=i8::MAX {
            assert_eq!(BitVectorValue::from_i8(v).to_i8(), v);
        }
        for v in u8::MIN..=u8::MAX {
            assert_eq!(BitVectorValue::from_u8(v).to_u8(), v);
        }
    }

    #[test]
    fn test_exhaustive_16_bit() {
        for v in i16::MIN..=i16::MAX {
            assert_eq!(BitVectorValue::from_i16(v).to_i16(), v);
        }
        for v in u16::MIN..=u16::MAX {
            assert_eq!(BitVectorValue::from_u16(v).to_u16(), v);
        }
    }

    #[test]
    fn test_128_bit_extremes() {
        for v in [i128::MIN, -1, 0, 1, i128::MAX] {
            assert_eq!(BitVectorValue::from_i128(v).to_i128(), v);
        }
        assert_eq!(BitVectorValue::from_u128(u128::MAX).to_u128(), u128::MAX);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100_000))]

    #[test]
    fn i32_round_trip(v in any::<i32>()) {
        let bits = BitVectorValue::from_i32(v);
        prop_assert_eq!(bits.width(), 32);
        prop_assert_eq!(bits.to_i32(), v);
    }

    #[test]
    fn u32_round_trip(v in any::<u32>()) {
        prop_assert_eq!(BitVectorValue::from_u32(v).to_u32(), v);
    }

    #[test]
    fn i64_round_trip(v in any::<i64>()) {
        let bits = BitVectorValue::from_i64(v);
        prop_assert_eq!(bits.width(), 64);
        prop_assert_eq!(bits.to_i64(), v);
    }

    #[test]
    fn u64_round_trip(v in any::<u64>()) {
        prop_assert_eq!(BitVectorValue::from_u64(v).to_u64(), v);
    }
}

proptest! {
    /// inc/dec never change the width and move by exactly one unless they
    /// wrap.
    #[test]
    fn inc_dec_step_by_one(v in any::<i32>()) {
        let mut up = BitVectorValue::from_i32(v);
        let wrapped = up.inc();
        prop_assert_eq!(up.width(), 32);
        prop_assert_eq!(wrapped, v == i32::MAX);
        prop_assert_eq!(up.to_i32(), v.wrapping_add(1));

        let mut down = BitVectorValue::from_i32(v);
        let wrapped = down.dec();
        prop_assert_eq!(wrapped, v == i32::MIN);
        prop_assert_eq!(down.to_i32(), v.wrapping_sub(1));
    }
}

// =============================================================================
// Presets
// =============================================================================

mod preset_tests {
    use super::*;

    #[test]
    fn test_signed_presets_for_common_widths() {
        for width in [8u32, 16, 32, 64] {
            let min = -(1i128 << (width - 1));
            let max = (1i128 << (width - 1)) - 1;
            assert_eq!(Signed::Min.value(width).to_i128(), min, "width {width}");
            assert_eq!(Signed::Max.value(width).to_i128(), max, "width {width}");
            assert_eq!(Signed::Zero.value(width).to_i128(), 0);
            assert_eq!(Signed::Positive.value(width).to_i128(), 1);
            assert_eq!(Signed::Negative.value(width).to_i128(), -1);
            assert_eq!(Signed::Max.value(width).width(), width);
        }
        assert_eq!(Signed::Min.value(32).to_i32(), i32::MIN);
        assert_eq!(Signed::Max.value(64).to_i64(), i64::MAX);
        assert_eq!(Signed::Min.value(8).to_i8(), i8::MIN);
        assert_eq!(Signed::Max.value(16).to_i16(), i16::MAX);
    }

    #[test]
    fn test_unsigned_presets_for_common_widths() {
        for width in [8u32, 16, 32, 64] {
            assert_eq!(Unsigned::Zero.value(width).to_u128(), 0);
            assert_eq!(Unsigned::Positive.value(width).to_u128(), 1);
            assert_eq!(Unsigned::Max.value(width).to_u128(), (1u128 << width) - 1);
        }
        assert_eq!(Unsigned::Max.value(8).to_u8(), u8::MAX);
        assert_eq!(Unsigned::Max.value(64).to_u64(), u64::MAX);
    }

    #[test]
    fn test_preset_recognition() {
        for preset in Signed::ALL {
            let value = preset.value(32);
            assert!(preset.test(&value), "{} not recognized", preset.name());
        }
        assert!(!Signed::Max.test(&BitVectorValue::from_i32(7)));
    }
}

// =============================================================================
// Wraparound
// =============================================================================

mod wraparound_tests {
    use super::*;

    #[test]
    fn test_max_increments_to_min() {
        for width in [8u32, 16, 32, 64] {
            let mut v = Signed::Max.value(width);
            assert!(v.inc());
            assert_eq!(v, Signed::Min.value(width));
        }
    }

    #[test]
    fn test_min_decrements_to_max() {
        for width in [8u32, 16, 32, 64] {
            let mut v = Signed::Min.value(width);
            assert!(v.dec());
            assert_eq!(v, Signed::Max.value(width));
        }
    }

    #[test]
    fn test_every_other_16_bit_step_does_not_wrap() {
        for v in i16::MIN..=i16::MAX {
            let mut up = BitVectorValue::from_i16(v);
            assert_eq!(up.inc(), v == i16::MAX);
            assert_eq!(up.to_i16(), v.wrapping_add(1));

            let mut down = BitVectorValue::from_i16(v);
            assert_eq!(down.dec(), v == i16::MIN);
            assert_eq!(down.to_i16(), v.wrapping_sub(1));
        }
    }
}

// =============================================================================
// Floats
// =============================================================================

mod float_tests {
    use super::*;

    #[test]
    fn test_float_presets() {
        let (m, e) = (23, 8);
        assert_eq!(DefaultFloatBound::Zero.value(m, e).to_f32(), 0.0);
        assert!(DefaultFloatBound::Nan.value(m, e).to_f32().is_nan());
        assert_eq!(DefaultFloatBound::PositiveInfinity.value(m, e).to_f32(), f32::INFINITY);
        assert_eq!(DefaultFloatBound::NegativeInfinity.value(m, e).to_f32(), f32::NEG_INFINITY);
        assert!(DefaultFloatBound::Positive.value(m, e).to_f32() > 0.0);
        assert!(DefaultFloatBound::Negative.value(m, e).to_f32() < 0.0);
    }

    #[test]
    fn test_float_width_gates() {
        let single = IEEE754Value::from_f32(1.5);
        let double = IEEE754Value::from_f64(1.5);
        assert!(single.is_f32() && !single.is_f64());
        assert!(double.is_f64() && !double.is_f32());
        assert_eq!(single.to_f32(), 1.5);
        assert_eq!(double.to_f64(), 1.5);
    }
}

proptest! {
    #[test]
    fn f64_round_trip(bits in any::<u64>()) {
        let v = f64::from_bits(bits);
        let back = IEEE754Value::from_f64(v).to_f64();
        prop_assert_eq!(back.to_bits(), bits);
    }
}
