use super::{SeedIter, ValueProvider};
use crate::description::Description;
use crate::model::FuzzedValue;
use crate::seed::{CollectionRoutine, ForEach, Seed};
use crate::types::{FuzzedType, TypeKind};

/// Arrays, lists, sets and maps.
///
/// Element types come from the type's generics; a missing generic becomes
/// whatever type the graph resolved it to (typically `any`, which only has
/// `null`).
pub struct CollectionValueProvider;

impl ValueProvider<FuzzedType, FuzzedValue> for CollectionValueProvider {
    fn accept(&self, ty: &FuzzedType) -> bool {
        matches!(
            ty.kind(),
            TypeKind::Array | TypeKind::List | TypeKind::Set | TypeKind::Map
        ) && !ty.node().generics.is_empty()
    }

    fn generate<'a>(
        &'a self,
        _description: &'a Description<FuzzedType>,
        ty: &FuzzedType,
    ) -> SeedIter<'a, FuzzedType, FuzzedValue> {
        let type_name = ty.to_string();
        let seed = match ty.kind() {
            TypeKind::Map => {
                let (Some(key), Some(value)) = (ty.generic(0), ty.generic(1)) else {
                    return Box::new(std::iter::empty());
                };
                let name = type_name;
                Seed::Collection {
                    construct: CollectionRoutine::new(move |size| FuzzedValue::Map {
                        type_name: name.clone(),
                        entries: Vec::with_capacity(size),
                    }),
                    modify: ForEach::new(vec![key, value], |map, _, args| {
                        let FuzzedValue::Map { entries, .. } = map else {
                            return;
                        };
                        let mut args = args.into_iter();
                        if let (Some(k), Some(v)) = (args.next(), args.next()) {
                            match entries.iter_mut().find(|(existing, _)| *existing == k) {
                                Some(entry) => entry.1 = v,
                                None => entries.push((k, v)),
                            }
                        }
                    }),
                }
            }
            kind => {
                let Some(element) = ty.generic(0) else {
                    return Box::new(std::iter::empty());
                };
                let unique = matches!(kind, TypeKind::Set);
                let name = type_name;
                Seed::collection_of(
                    element,
                    move |size| FuzzedValue::Sequence {
                        type_name: name.clone(),
                        elements: Vec::with_capacity(size),
                    },
                    move |sequence, _, args| {
                        let FuzzedValue::Sequence { elements, .. } = sequence else {
                            return;
                        };
                        for arg in args {
                            if !unique || !elements.contains(&arg) {
                                elements.push(arg);
                            }
                        }
                    },
                )
            }
        };
        Box::new(std::iter::once(seed))
    }
}
