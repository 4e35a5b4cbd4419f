//! End-to-end tests for the fuzzing driver.
//!
//! Test coverage areas:
//! - Reproducibility for a fixed seed
//! - Recursive and self-referential types
//! - Executor control (stop, empty parameter lists)
//! - Seed generation caching
//! - Recursion depth bounds
//! - Boundary values for integers and string constants
//! - Types without any provider

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use structfuzz_core::provider::{IntegerValueProvider, NullValueProvider, ObjectValueProvider};
use structfuzz_core::types::{resolve_all, NativeKind, NativeRoutine, PrimitiveKind, TypeKind};
use structfuzz_core::*;

type Values = Vec<FuzzedValue>;

fn record_all(
    registry: &ProviderRegistry<FuzzedType, FuzzedValue>,
    description: &Description<FuzzedType>,
    config: FuzzConfig,
) -> (FuzzReport, Vec<Values>) {
    let mut seen = Vec::new();
    let report = run_fuzzing(
        description,
        registry,
        config,
        |_: Option<&FuzzedValue>, _: &Description<FuzzedType>, values: &[FuzzedValue]| {
            seen.push(values.to_vec());
            Feedback::<u8>::proceed()
        },
    )
    .unwrap();
    (report, seen)
}

fn count_objects(value: &FuzzedValue) -> usize {
    match value {
        FuzzedValue::Object { args, calls, .. } => {
            1 + args.iter().map(count_objects).sum::<usize>()
                + calls
                    .iter()
                    .flat_map(|c| c.args.iter())
                    .map(count_objects)
                    .sum::<usize>()
        }
        FuzzedValue::Sequence { elements, .. } => elements.iter().map(count_objects).sum(),
        _ => 0,
    }
}

// =============================================================================
// Reproducibility
// =============================================================================

mod determinism_tests {
    use super::*;

    /// `Point(new(i32, i32), set_label(String))` plus a bare `i64`.
    fn point_session(seed: u64) -> Vec<String> {
        let mut arena = TypeArena::new();
        let int = arena.primitive(PrimitiveKind::I32);
        let long = arena.primitive(PrimitiveKind::I64);
        let string = arena.string();
        let point = arena.record(
            "Point",
            vec![NativeRoutine::new("new", vec![int, int])],
            vec![NativeRoutine::new("set_label", vec![string])],
        );
        let types = resolve_all(&arena, &[point, long], &mut TypeCache::new());
        let description = Description::new(types).with_constants(vec![Constant::i32(42)]);
        let registry = default_value_providers(Arc::new(IdGenerator::new()));

        let mut seen = Vec::new();
        run_fuzzing(
            &description,
            &registry,
            FuzzConfig::default().with_seed(seed).with_max_runs(500),
            |_: Option<&FuzzedValue>, _: &Description<FuzzedType>, values: &[FuzzedValue]| {
                seen.push(format!("{values:?}"));
                let trace: Vec<u32> = values.iter().map(|v| v.depth() as u32).collect();
                Feedback::traced(trace)
            },
        )
        .unwrap();
        seen
    }

    #[test]
    fn test_same_seed_replays_exactly() {
        let first = point_session(7);
        let second = point_session(7);
        assert_eq!(first.len(), 500);
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_diverge() {
        assert_ne!(point_session(1), point_session(2));
    }

    #[test]
    fn test_setters_are_exercised() {
        let seen = point_session(3);
        assert!(seen.iter().any(|v| v.contains("set_label")));
        assert!(seen.iter().any(|v| v.contains("I32(42)")));
    }
}

// =============================================================================
// Recursive Types
// =============================================================================

mod recursive_type_tests {
    use super::*;

    /// `class Tree { Tree(List<Tree> children) }`
    fn tree_type() -> FuzzedType {
        let mut arena = TypeArena::new();
        let list = arena.class("List", NativeKind::List);
        let tree = arena.declare("Tree");
        let children = arena.parameterized(list, vec![tree]);
        arena.define_record(tree, vec![NativeRoutine::new("new", vec![children])], vec![]);
        resolve_all(&arena, &[tree], &mut TypeCache::new()).remove(0)
    }

    #[test]
    fn test_self_reference_through_generic_is_one_node() {
        let tree = tree_type();
        let TypeKind::Record { constructors, .. } = tree.kind() else {
            panic!("expected record");
        };
        let children = tree.at(constructors[0].params[0]);
        assert_eq!(children.kind(), &TypeKind::List);
        let element = children.generic(0).unwrap();
        assert_eq!(element, tree);
        assert!(Arc::ptr_eq(element.graph(), tree.graph()));

        let mut set = HashSet::new();
        set.insert(tree.clone());
        set.insert(element);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_fuzzing_recursive_type_terminates() {
        let tree = tree_type();
        let description = Description::new(vec![tree]);
        let registry = default_value_providers(Arc::new(IdGenerator::new()));
        let config = FuzzConfig {
            recursion_tree_depth: 3,
            ..FuzzConfig::default().with_max_runs(200)
        };
        let (report, seen) = record_all(&registry, &description, config);
        assert_eq!(report.executions, 200);
        assert_eq!(report.stop_reason, StopReason::RunBudget);
        // object, list, object, list, object: depth 3 caps the nesting
        assert!(seen.iter().all(|v| v[0].depth() <= 6), "too deep");
        assert!(seen.iter().any(|v| count_objects(&v[0]) > 1));
    }

    #[test]
    fn test_binary_tree_fills_every_level() {
        let mut arena = TypeArena::new();
        let node = arena.declare("Node");
        arena.define_record(node, vec![NativeRoutine::new("new", vec![node, node])], vec![]);
        let types = resolve_all(&arena, &[node], &mut TypeCache::new());
        let description = Description::new(types);
        let registry = ProviderRegistry::new().with(ObjectValueProvider::new(Arc::new(IdGenerator::new())));
        let config = FuzzConfig {
            recursion_tree_depth: 10,
            prob_reuse_value_for_same_type: 0.0,
            ..FuzzConfig::default()
        };

        let mut nodes = None;
        let report = run_fuzzing(
            &description,
            &registry,
            config,
            |_: Option<&FuzzedValue>, _: &Description<FuzzedType>, values: &[FuzzedValue]| {
                nodes = Some(count_objects(&values[0]));
                Feedback::<u8>::stop()
            },
        )
        .unwrap();
        assert_eq!(report.executions, 1);
        assert_eq!(nodes, Some(1023));
    }
}

// =============================================================================
// Executor Control
// =============================================================================

mod control_tests {
    use super::*;

    fn int_description() -> Description<FuzzedType> {
        let mut arena = TypeArena::new();
        let int = arena.primitive(PrimitiveKind::I32);
        Description::new(resolve_all(&arena, &[int], &mut TypeCache::new()))
    }

    #[test]
    fn test_empty_parameter_list_never_executes() {
        let registry = default_value_providers(Arc::new(IdGenerator::new()));
        let description: Description<FuzzedType> = Description::new(vec![]);
        let mut calls = 0;
        let report = run_fuzzing(
            &description,
            &registry,
            FuzzConfig::default(),
            |_: Option<&FuzzedValue>, _: &Description<FuzzedType>, _: &[FuzzedValue]| {
                calls += 1;
                Feedback::<u8>::proceed()
            },
        )
        .unwrap();
        assert_eq!(calls, 0);
        assert_eq!(report.executions, 0);
        assert_eq!(report.stop_reason, StopReason::NoParameters);
    }

    #[test]
    fn test_stop_after_first_execution() {
        let registry = default_value_providers(Arc::new(IdGenerator::new()));
        let description = int_description();
        let mut calls = 0;
        let report = run_fuzzing(
            &description,
            &registry,
            FuzzConfig::default(),
            |_: Option<&FuzzedValue>, _: &Description<FuzzedType>, _: &[FuzzedValue]| {
                calls += 1;
                Feedback::<u8>::stop()
            },
        )
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(report.stop_reason, StopReason::ExecutorStop);
    }

    #[test]
    fn test_stop_after_third_execution() {
        let registry = default_value_providers(Arc::new(IdGenerator::new()));
        let description = int_description();
        let mut calls = 0;
        let report = run_fuzzing(
            &description,
            &registry,
            FuzzConfig::default(),
            |_: Option<&FuzzedValue>, _: &Description<FuzzedType>, values: &[FuzzedValue]| {
                calls += 1;
                if calls == 3 {
                    Feedback::stop()
                } else {
                    Feedback::traced(vec![values[0].as_i64().unwrap_or(0)])
                }
            },
        )
        .unwrap();
        assert_eq!(calls, 3);
        assert_eq!(report.executions, 3);
    }
}

// =============================================================================
// Seed Generation
// =============================================================================

mod generation_tests {
    use super::*;

    struct Counting {
        calls: Rc<RefCell<HashMap<&'static str, usize>>>,
    }

    impl ValueProvider<&'static str, i64> for Counting {
        fn generate<'a>(
            &'a self,
            _description: &'a Description<&'static str>,
            ty: &&'static str,
        ) -> SeedIter<'a, &'static str, i64> {
            *self.calls.borrow_mut().entry(*ty).or_default() += 1;
            let base = if *ty == "small" { 0 } else { 1000 };
            Box::new((base..base + 5).map(Seed::simple))
        }
    }

    #[test]
    fn test_each_type_is_generated_once() {
        let calls = Rc::new(RefCell::new(HashMap::new()));
        let registry = ProviderRegistry::new().with(Counting {
            calls: Rc::clone(&calls),
        });
        let description = Description::new(vec!["small", "large", "small"]);
        let report = run_fuzzing(
            &description,
            &registry,
            FuzzConfig::default().with_max_runs(300),
            |_: Option<&i64>, _: &Description<&'static str>, values: &[i64]| {
                Feedback::traced(values.to_vec())
            },
        )
        .unwrap();
        assert_eq!(report.executions, 300);
        let calls = calls.borrow();
        assert_eq!(calls.get("small"), Some(&1));
        assert_eq!(calls.get("large"), Some(&1));
        assert_eq!(calls.len(), 2);
    }
}

// =============================================================================
// Boundary Values
// =============================================================================

mod boundary_tests {
    use super::*;

    /// Twenty unremarkable seeds ahead of the integer presets.
    struct Noise;

    impl ValueProvider<FuzzedType, FuzzedValue> for Noise {
        fn accept(&self, ty: &FuzzedType) -> bool {
            ty.primitive() == Some(PrimitiveKind::I32)
        }

        fn generate<'a>(
            &'a self,
            _description: &'a Description<FuzzedType>,
            _ty: &FuzzedType,
        ) -> SeedIter<'a, FuzzedType, FuzzedValue> {
            Box::new((100..120).map(|v| Seed::simple(FuzzedValue::I32(v))))
        }
    }

    fn i32_values(registry: &ProviderRegistry<FuzzedType, FuzzedValue>) -> HashSet<i32> {
        let mut arena = TypeArena::new();
        let int = arena.primitive(PrimitiveKind::I32);
        let description = Description::new(resolve_all(&arena, &[int], &mut TypeCache::new()));
        let (_, seen) = record_all(registry, &description, FuzzConfig::default().with_max_runs(1000));
        seen.iter()
            .filter_map(|v| match v[0] {
                FuzzedValue::I32(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_i32_boundaries_with_default_providers() {
        let registry = default_value_providers(Arc::new(IdGenerator::new()));
        let seen = i32_values(&registry);
        for expected in [0, i32::MIN, -1, 1, i32::MAX] {
            assert!(seen.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_i32_boundaries_behind_other_providers() {
        let registry = ProviderRegistry::new()
            .with(NullValueProvider)
            .with(Noise)
            .with(IntegerValueProvider);
        let seen = i32_values(&registry);
        for expected in [0, i32::MIN, -1, 1, i32::MAX] {
            assert!(seen.contains(&expected), "missing {expected}");
        }
        assert!(seen.contains(&100));
    }

    #[test]
    fn test_string_constants_are_tried_and_replayable() {
        fn session() -> (FuzzReport, Vec<String>) {
            let mut arena = TypeArena::new();
            let string = arena.string();
            let description = Description::new(resolve_all(&arena, &[string], &mut TypeCache::new()))
                .with_constants(vec![
                    Constant::string("Hello"),
                    Constant::string("World"),
                    Constant::string("!"),
                ]);
            let registry = default_value_providers(Arc::new(IdGenerator::new()));
            let mut seen = Vec::new();
            let report = run_fuzzing(
                &description,
                &registry,
                FuzzConfig::default().with_seed(11).with_max_runs(10_000),
                |_: Option<&FuzzedValue>, _: &Description<FuzzedType>, values: &[FuzzedValue]| {
                    let s = values[0].as_str().unwrap_or_default().to_string();
                    let trace: Vec<u8> = ["Hello", "World", "!"]
                        .iter()
                        .map(|word| u8::from(s.contains(word)))
                        .collect();
                    seen.push(s);
                    Feedback::traced(trace)
                },
            )
            .unwrap();
            (report, seen)
        }

        let (report, first) = session();
        let (_, second) = session();
        assert_eq!(report.executions, 10_000);
        assert_eq!(first, second);
        for word in ["Hello", "World", "!"] {
            assert!(first.iter().any(|s| s == word), "{word} never produced");
        }
        assert!(report.new_paths >= 3);
    }
}

// =============================================================================
// Missing Types
// =============================================================================

mod missing_type_tests {
    use super::*;

    #[test]
    fn test_top_level_type_without_provider_stops() {
        let mut arena = TypeArena::new();
        let string = arena.string();
        let description = Description::new(resolve_all(&arena, &[string], &mut TypeCache::new()));
        let registry = ProviderRegistry::new().with(IntegerValueProvider);
        let (report, seen) = record_all(&registry, &description, FuzzConfig::default().with_max_runs(10));
        assert!(seen.is_empty());
        assert_eq!(report.executions, 0);
        assert_eq!(
            report.stop_reason,
            StopReason::NoProducibleValue {
                type_name: "String".to_string()
            }
        );
        assert_eq!(report.missed_types, vec!["String".to_string()]);
    }

    #[test]
    fn test_nested_type_without_provider_uses_empty_form() {
        let mut arena = TypeArena::new();
        let socket = arena.class("Socket", NativeKind::Opaque);
        let holder = arena.record("Holder", vec![NativeRoutine::new("new", vec![socket])], vec![]);
        let description = Description::new(resolve_all(&arena, &[holder], &mut TypeCache::new()));
        let registry = ProviderRegistry::new().with(ObjectValueProvider::new(Arc::new(IdGenerator::new())));
        let (report, seen) = record_all(&registry, &description, FuzzConfig::default().with_max_runs(20));
        assert_eq!(report.executions, 20);
        assert!(seen.iter().all(|v| v[0].is_null()));
        assert_eq!(report.missed_types, vec!["Socket".to_string()]);
    }

    #[test]
    fn test_nested_missing_type_abandons_only_that_combination() {
        let mut arena = TypeArena::new();
        let socket = arena.class("Socket", NativeKind::Opaque);
        let holder = arena.record(
            "Holder",
            vec![
                NativeRoutine::new("new", vec![socket]),
                NativeRoutine::new("detached", vec![]),
            ],
            vec![],
        );
        let description = Description::new(resolve_all(&arena, &[holder], &mut TypeCache::new()));
        let registry = ProviderRegistry::new().with(ObjectValueProvider::new(Arc::new(IdGenerator::new())));
        let config = FuzzConfig {
            generate_empty_for_missed_types: false,
            ..FuzzConfig::default().with_max_runs(30)
        };
        let (report, seen) = record_all(&registry, &description, config);

        assert_eq!(report.stop_reason, StopReason::RunBudget);
        assert_eq!(report.executions, 30);
        assert!(report.abandoned > 0);
        assert_eq!(report.missed_types, vec!["Socket".to_string()]);
        assert!(seen.iter().all(|v| matches!(
            &v[0],
            FuzzedValue::Object { constructor, .. } if constructor == "detached"
        )));
    }
}
