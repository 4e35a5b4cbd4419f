//! Demo fuzz targets.
//!
//! Each target pairs a description of a callable with a stand-in for its
//! body that reports the basic blocks it would have executed. The block ids
//! serve as the coverage trace.

use std::sync::Arc;

use anyhow::{Context, Result};
use structfuzz_core::types::{resolve_all, NativeKind, NativeRoutine, PrimitiveKind};
use structfuzz_core::{
    default_mutators, default_value_providers, Comparison, Constant, Description, Feedback,
    FuzzConfig, FuzzReport, FuzzedType, FuzzedValue, Fuzzer, IdGenerator, MethodCall, TypeArena,
    TypeCache,
};
use tracing::debug;

pub struct Target {
    pub name: &'static str,
    pub about: &'static str,
    describe: fn() -> Description<FuzzedType>,
    execute: fn(Option<&FuzzedValue>, &[FuzzedValue]) -> Vec<u32>,
}

impl Target {
    pub fn description(&self) -> Description<FuzzedType> {
        (self.describe)()
    }

    /// Blocks visited when the target runs on these values.
    pub fn trace(&self, receiver: Option<&FuzzedValue>, values: &[FuzzedValue]) -> Vec<u32> {
        (self.execute)(receiver, values)
    }

    /// Parameter type names, receiver first.
    pub fn signature(&self) -> Vec<String> {
        self.description()
            .all_types()
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

pub const TARGETS: &[Target] = &[
    Target {
        name: "abc",
        about: "string state machine that only reaches its last state on the prefix \"abc\"",
        describe: abc_description,
        execute: abc,
    },
    Target {
        name: "classify",
        about: "classifier method branching on 32-bit integer boundaries",
        describe: classify_description,
        execute: classify,
    },
    Target {
        name: "tree",
        about: "walk over a recursive binary node",
        describe: tree_description,
        execute: tree,
    },
    Target {
        name: "pair_list",
        about: "list of records configured through setters",
        describe: pair_list_description,
        execute: pair_list,
    },
];

pub fn find(name: &str) -> Option<&'static Target> {
    TARGETS.iter().find(|t| t.name == name)
}

/// Run one fuzzing session against `target` with the default providers and
/// mutators.
pub fn fuzz(target: &Target, config: FuzzConfig) -> Result<FuzzReport> {
    let description = target.description();
    let registry = default_value_providers(Arc::new(IdGenerator::new()));
    let mutators = default_mutators(config.max_string_length_when_mutated);
    debug!(target_name = target.name, signature = ?target.signature(), "Fuzzing demo target");

    Fuzzer::new(&registry, config)
        .with_mutators(mutators)
        .run(
            &description,
            |receiver: Option<&FuzzedValue>, _: &Description<FuzzedType>, values: &[FuzzedValue]| {
                Feedback::traced(target.trace(receiver, values))
            },
        )
        .with_context(|| format!("Failed to fuzz target '{}'", target.name))
}

// =============================================================================
// abc
// =============================================================================

fn abc_description() -> Description<FuzzedType> {
    let mut arena = TypeArena::new();
    let string = arena.string();
    Description::new(resolve_all(&arena, &[string], &mut TypeCache::new())).with_constants(vec![
        Constant::string("a"),
        Constant::string("b"),
        Constant::string("c"),
    ])
}

fn abc(_: Option<&FuzzedValue>, values: &[FuzzedValue]) -> Vec<u32> {
    let input = values.first().and_then(FuzzedValue::as_str).unwrap_or_default();
    let mut trace = vec![0];
    let mut state = 0;
    for c in input.chars().take(16) {
        state = match (state, c) {
            (0, 'a') => 1,
            (1, 'b') => 2,
            (2, 'c') => 3,
            _ => 0,
        };
        trace.push(state + 1);
        if state == 3 {
            trace.push(99);
            break;
        }
    }
    trace
}

// =============================================================================
// classify
// =============================================================================

const CLASSIFY_THRESHOLD: i32 = 1000;

fn classify_description() -> Description<FuzzedType> {
    let mut arena = TypeArena::new();
    let int = arena.primitive(PrimitiveKind::I32);
    let classifier = arena.record("Classifier", vec![NativeRoutine::new("new", vec![])], vec![]);
    let mut types = resolve_all(&arena, &[classifier, int, int], &mut TypeCache::new());
    let receiver = types.remove(0);
    Description::new(types)
        .with_receiver(receiver)
        .with_constants(vec![Constant::i32(CLASSIFY_THRESHOLD).compared(Comparison::Gt)])
}

fn bucket(value: i32) -> u32 {
    match value {
        i32::MIN => 1,
        v if v < 0 => 2,
        0 => 3,
        i32::MAX => 4,
        v if v > CLASSIFY_THRESHOLD => 5,
        _ => 6,
    }
}

fn classify(receiver: Option<&FuzzedValue>, values: &[FuzzedValue]) -> Vec<u32> {
    // a null receiver would have thrown before the first branch
    if receiver.map_or(true, FuzzedValue::is_null) {
        return vec![10];
    }
    let mut trace = vec![11];
    for (slot, value) in (1u32..).zip(values) {
        let value = value.as_i64().and_then(|v| i32::try_from(v).ok()).unwrap_or(0);
        trace.push(20 * slot + bucket(value));
    }
    trace
}

// =============================================================================
// tree
// =============================================================================

fn tree_description() -> Description<FuzzedType> {
    let mut arena = TypeArena::new();
    let int = arena.primitive(PrimitiveKind::I32);
    let node = arena.declare("Node");
    arena.define_record(
        node,
        vec![NativeRoutine::new("new", vec![node, node])],
        vec![NativeRoutine::new("set_value", vec![int])],
    );
    Description::new(resolve_all(&arena, &[node], &mut TypeCache::new()))
}

fn walk(node: &FuzzedValue, depth: u32, trace: &mut Vec<u32>) {
    let FuzzedValue::Object { args, calls, .. } = node else {
        trace.push(depth * 10);
        return;
    };
    trace.push(depth * 10 + 1);
    let negative = calls
        .iter()
        .filter_map(|c| c.args.first().and_then(FuzzedValue::as_i64))
        .any(|v| v < 0);
    if negative {
        trace.push(depth * 10 + 2);
    }
    for child in args {
        walk(child, depth + 1, trace);
    }
}

fn tree(_: Option<&FuzzedValue>, values: &[FuzzedValue]) -> Vec<u32> {
    let mut trace = Vec::new();
    if let Some(root) = values.first() {
        walk(root, 1, &mut trace);
    }
    trace
}

// =============================================================================
// pair_list
// =============================================================================

fn pair_list_description() -> Description<FuzzedType> {
    let mut arena = TypeArena::new();
    let long = arena.primitive(PrimitiveKind::I64);
    let string = arena.string();
    let pair = arena.record(
        "Pair",
        vec![NativeRoutine::new("new", vec![])],
        vec![
            NativeRoutine::new("set_key", vec![string]),
            NativeRoutine::new("set_count", vec![long]),
        ],
    );
    let list = arena.class("List", NativeKind::List);
    let pairs = arena.parameterized(list, vec![pair]);
    Description::new(resolve_all(&arena, &[pairs], &mut TypeCache::new()))
        .with_constants(vec![Constant::string("key"), Constant::i64(-1)])
}

/// The argument of the last call to `setter`.
fn last_set<'a>(calls: &'a [MethodCall], setter: &str) -> Option<&'a FuzzedValue> {
    calls
        .iter()
        .rev()
        .find(|c| c.name == setter)
        .and_then(|c| c.args.first())
}

fn pair_list(_: Option<&FuzzedValue>, values: &[FuzzedValue]) -> Vec<u32> {
    let Some(FuzzedValue::Sequence { elements, .. }) = values.first() else {
        return vec![0];
    };
    let mut trace = vec![1];
    for pair in elements.iter().take(8) {
        let FuzzedValue::Object { calls, .. } = pair else {
            trace.push(2);
            continue;
        };
        let key = last_set(calls, "set_key").and_then(FuzzedValue::as_str);
        let count = last_set(calls, "set_count").and_then(FuzzedValue::as_i64);
        trace.push(match (key, count) {
            (None, None) => 3,
            (Some(""), _) => 4,
            (Some(_), None) => 5,
            (None, Some(_)) => 6,
            (Some(_), Some(c)) if c < 0 => 7,
            (Some(_), Some(_)) => 8,
        });
    }
    trace
}
