//! An in-memory reflective type model.
//!
//! [`TypeArena`] plays the role of a host language's reflection API: front
//! ends and tests declare classes, generic applications, arrays and type
//! variables in it, then hand it to the resolver as a [`TypeSource`].

use std::collections::HashMap;
use std::sync::Arc;

use super::{NativeKind, NativeRoutine, NativeShape, PrimitiveKind, TypeSource};

/// Handle of a declaration inside a [`TypeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeId(u32);

#[derive(Debug, Clone)]
enum Decl {
    Class {
        name: Arc<str>,
        kind: NativeKind<NativeId>,
        type_params: Vec<NativeId>,
    },
    /// Declared by name, defined later. Lets records refer to themselves.
    Pending { name: Arc<str> },
    Parameterized { raw: NativeId, args: Vec<NativeId> },
    Array { component: NativeId },
    Variable { name: Arc<str>, bounds: Vec<NativeId> },
    Wildcard { upper: Vec<NativeId> },
    Unsupported,
}

#[derive(Debug, Clone, Default)]
pub struct TypeArena {
    decls: Vec<Decl>,
    primitives: HashMap<PrimitiveKind, NativeId>,
    string: Option<NativeId>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// The interned handle for a primitive.
    pub fn primitive(&mut self, kind: PrimitiveKind) -> NativeId {
        if let Some(id) = self.primitives.get(&kind) {
            return *id;
        }
        let id = self.class(kind.name(), NativeKind::Primitive(kind));
        self.primitives.insert(kind, id);
        id
    }

    /// The interned handle for the string type.
    pub fn string(&mut self) -> NativeId {
        if let Some(id) = self.string {
            return id;
        }
        let id = self.class("String", NativeKind::String);
        self.string = Some(id);
        id
    }

    pub fn class(&mut self, name: &str, kind: NativeKind<NativeId>) -> NativeId {
        self.generic_class(name, kind, Vec::new())
    }

    pub fn generic_class(
        &mut self,
        name: &str,
        kind: NativeKind<NativeId>,
        type_params: Vec<NativeId>,
    ) -> NativeId {
        self.push(Decl::Class {
            name: name.into(),
            kind,
            type_params,
        })
    }

    pub fn enumeration(&mut self, name: &str, variants: &[&str]) -> NativeId {
        let variants = variants.iter().map(|v| Arc::from(*v)).collect();
        self.class(name, NativeKind::Enum(variants))
    }

    /// Reserve a handle for a class whose definition refers to itself.
    pub fn declare(&mut self, name: &str) -> NativeId {
        self.push(Decl::Pending { name: name.into() })
    }

    /// Complete a declaration made with [`TypeArena::declare`].
    pub fn define(&mut self, id: NativeId, kind: NativeKind<NativeId>, type_params: Vec<NativeId>) {
        let name = match &self.decls[id.0 as usize] {
            Decl::Pending { name } | Decl::Class { name, .. } => name.clone(),
            _ => return,
        };
        self.decls[id.0 as usize] = Decl::Class {
            name,
            kind,
            type_params,
        };
    }

    pub fn define_record(
        &mut self,
        id: NativeId,
        constructors: Vec<NativeRoutine<NativeId>>,
        setters: Vec<NativeRoutine<NativeId>>,
    ) {
        self.define(
            id,
            NativeKind::Record {
                constructors,
                setters,
            },
            Vec::new(),
        );
    }

    pub fn record(
        &mut self,
        name: &str,
        constructors: Vec<NativeRoutine<NativeId>>,
        setters: Vec<NativeRoutine<NativeId>>,
    ) -> NativeId {
        self.class(
            name,
            NativeKind::Record {
                constructors,
                setters,
            },
        )
    }

    pub fn parameterized(&mut self, raw: NativeId, args: Vec<NativeId>) -> NativeId {
        self.push(Decl::Parameterized { raw, args })
    }

    pub fn array(&mut self, component: NativeId) -> NativeId {
        self.push(Decl::Array { component })
    }

    pub fn variable(&mut self, name: &str) -> NativeId {
        self.push(Decl::Variable {
            name: name.into(),
            bounds: Vec::new(),
        })
    }

    pub fn set_bounds(&mut self, variable: NativeId, new_bounds: Vec<NativeId>) {
        if let Decl::Variable { bounds, .. } = &mut self.decls[variable.0 as usize] {
            *bounds = new_bounds;
        }
    }

    pub fn wildcard(&mut self, upper: Vec<NativeId>) -> NativeId {
        self.push(Decl::Wildcard { upper })
    }

    pub fn unsupported(&mut self) -> NativeId {
        self.push(Decl::Unsupported)
    }

    fn push(&mut self, decl: Decl) -> NativeId {
        let id = NativeId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }
}

impl TypeSource for TypeArena {
    type Handle = NativeId;

    fn shape(&self, ty: &NativeId) -> NativeShape<NativeId> {
        match self.decls.get(ty.0 as usize) {
            Some(Decl::Class {
                name,
                kind,
                type_params,
            }) => NativeShape::Class {
                name: name.clone(),
                kind: kind.clone(),
                type_params: type_params.clone(),
            },
            Some(Decl::Parameterized { raw, args }) => NativeShape::Parameterized {
                raw: *raw,
                args: args.clone(),
            },
            Some(Decl::Array { component }) => NativeShape::Array {
                component: *component,
            },
            Some(Decl::Variable { name, bounds }) => NativeShape::Variable {
                name: name.clone(),
                bounds: bounds.clone(),
            },
            Some(Decl::Wildcard { upper }) => NativeShape::Wildcard {
                upper: upper.clone(),
            },
            Some(Decl::Pending { .. }) | Some(Decl::Unsupported) | None => NativeShape::Unsupported,
        }
    }
}
