//! Providers for enums, records, abstract types and `null`.

use std::sync::Arc;

use rand::seq::SliceRandom;

use super::{SeedIter, ValueProvider};
use crate::description::{Description, Scope, ScopeProperty};
use crate::model::{FuzzedValue, IdGenerator, MethodCall};
use crate::seed::{Call, Create, Empty, Seed};
use crate::types::{FuzzedType, Member, TypeKind};

/// Number of methods a mock should stub, set by [`MockValueProvider::enrich`].
pub const MOCK_METHODS: ScopeProperty<usize> = ScopeProperty::new("mock-methods");

fn member_types(ty: &FuzzedType, member: &Member) -> Vec<FuzzedType> {
    member.params.iter().map(|id| ty.at(*id)).collect()
}

fn null() -> Empty<FuzzedValue> {
    Empty::new(|| FuzzedValue::Null)
}

fn recording_call(ty: &FuzzedType, member: &Member) -> Call<FuzzedType, FuzzedValue> {
    let name = member.name.to_string();
    Call::new(member_types(ty, member), move |target, args| match target {
        FuzzedValue::Object { calls, .. } | FuzzedValue::Mock { stubs: calls, .. } => {
            calls.push(MethodCall {
                name: name.clone(),
                args,
            })
        }
        _ => {}
    })
}

pub struct EnumValueProvider;

impl ValueProvider<FuzzedType, FuzzedValue> for EnumValueProvider {
    fn accept(&self, ty: &FuzzedType) -> bool {
        matches!(ty.kind(), TypeKind::Enum(_))
    }

    fn generate<'a>(
        &'a self,
        _description: &'a Description<FuzzedType>,
        ty: &FuzzedType,
    ) -> SeedIter<'a, FuzzedType, FuzzedValue> {
        let TypeKind::Enum(variants) = ty.kind() else {
            return Box::new(std::iter::empty());
        };
        let variants = Arc::clone(variants);
        let type_name = ty.name().to_string();
        let seeds: Vec<_> = variants
            .iter()
            .map(|variant| {
                let others = Arc::clone(&variants);
                let name = type_name.clone();
                Seed::simple_with_mutation(
                    FuzzedValue::Enum {
                        type_name: type_name.clone(),
                        variant: variant.to_string(),
                    },
                    move |current, rng| match others.choose(rng) {
                        Some(v) => FuzzedValue::Enum {
                            type_name: name.clone(),
                            variant: v.to_string(),
                        },
                        None => current.clone(),
                    },
                )
            })
            .collect();
        Box::new(seeds.into_iter())
    }
}

/// Records: one recursive seed per constructor, with every setter as a
/// possible modification.
pub struct ObjectValueProvider {
    ids: Arc<IdGenerator>,
}

impl ObjectValueProvider {
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self { ids }
    }
}

impl ValueProvider<FuzzedType, FuzzedValue> for ObjectValueProvider {
    fn accept(&self, ty: &FuzzedType) -> bool {
        matches!(ty.kind(), TypeKind::Record { .. })
    }

    fn generate<'a>(
        &'a self,
        _description: &'a Description<FuzzedType>,
        ty: &FuzzedType,
    ) -> SeedIter<'a, FuzzedType, FuzzedValue> {
        let TypeKind::Record {
            constructors,
            setters,
        } = ty.kind()
        else {
            return Box::new(std::iter::empty());
        };
        let seeds: Vec<_> = constructors
            .iter()
            .map(|constructor| {
                let ids = Arc::clone(&self.ids);
                let type_name = ty.name().to_string();
                let name = constructor.name.to_string();
                let construct = Create::new(member_types(ty, constructor), move |args| {
                    FuzzedValue::Object {
                        id: ids.next_id(),
                        type_name: type_name.clone(),
                        constructor: name.clone(),
                        args,
                        calls: Vec::new(),
                    }
                });
                Seed::recursive(construct)
                    .with_calls(setters.iter().map(|s| recording_call(ty, s)).collect())
                    .with_empty(null())
            })
            .collect();
        Box::new(seeds.into_iter())
    }
}

/// Abstract types with known implementations delegate to them.
pub struct AbstractValueProvider;

impl ValueProvider<FuzzedType, FuzzedValue> for AbstractValueProvider {
    fn accept(&self, ty: &FuzzedType) -> bool {
        matches!(ty.kind(), TypeKind::Abstract { implementations, .. } if !implementations.is_empty())
    }

    fn generate<'a>(
        &'a self,
        _description: &'a Description<FuzzedType>,
        ty: &FuzzedType,
    ) -> SeedIter<'a, FuzzedType, FuzzedValue> {
        let TypeKind::Abstract {
            implementations, ..
        } = ty.kind()
        else {
            return Box::new(std::iter::empty());
        };
        let seeds: Vec<_> = implementations
            .iter()
            .map(|id| {
                let construct = Create::new(vec![ty.at(*id)], |mut args: Vec<FuzzedValue>| {
                    args.pop().unwrap_or(FuzzedValue::Null)
                });
                Seed::recursive(construct).with_empty(null())
            })
            .collect();
        Box::new(seeds.into_iter())
    }
}

/// Abstract types without implementations get a mock whose methods are
/// stubbed with generated answers.
///
/// `enrich` records how many methods need stubs; seeds are generated from
/// that scope property, so mocks are rebuilt per request.
pub struct MockValueProvider {
    ids: Arc<IdGenerator>,
}

impl MockValueProvider {
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self { ids }
    }
}

impl ValueProvider<FuzzedType, FuzzedValue> for MockValueProvider {
    fn accept(&self, ty: &FuzzedType) -> bool {
        matches!(
            ty.kind(),
            TypeKind::Abstract { implementations, methods }
                if implementations.is_empty() && !methods.is_empty()
        )
    }

    fn enrich(&self, _description: &Description<FuzzedType>, ty: &FuzzedType, scope: &mut Scope) {
        if let TypeKind::Abstract { methods, .. } = ty.kind() {
            scope.put(&MOCK_METHODS, methods.len());
        }
    }

    fn generate<'a>(
        &'a self,
        description: &'a Description<FuzzedType>,
        ty: &FuzzedType,
    ) -> SeedIter<'a, FuzzedType, FuzzedValue> {
        let stubbed = description
            .scope()
            .and_then(|s| s.get(&MOCK_METHODS))
            .copied()
            .unwrap_or(0);
        let TypeKind::Abstract { methods, .. } = ty.kind() else {
            return Box::new(std::iter::empty());
        };
        let ids = Arc::clone(&self.ids);
        let type_name = ty.name().to_string();
        let construct = Create::new(Vec::new(), move |_| FuzzedValue::Mock {
            id: ids.next_id(),
            type_name: type_name.clone(),
            stubs: Vec::new(),
        });
        let calls = methods
            .iter()
            .take(stubbed)
            .map(|m| recording_call(ty, m))
            .collect();
        Box::new(std::iter::once(
            Seed::recursive(construct).with_calls(calls).with_empty(null()),
        ))
    }
}

pub struct NullValueProvider;

impl ValueProvider<FuzzedType, FuzzedValue> for NullValueProvider {
    fn accept(&self, ty: &FuzzedType) -> bool {
        ty.is_nullable()
    }

    fn generate<'a>(
        &'a self,
        _description: &'a Description<FuzzedType>,
        _ty: &FuzzedType,
    ) -> SeedIter<'a, FuzzedType, FuzzedValue> {
        Box::new(std::iter::once(Seed::simple(FuzzedValue::Null)))
    }
}
