//! Resolution of host type descriptions into a finite, possibly cyclic
//! type graph.
//!
//! Host types are read through a [`TypeSource`]. Resolution registers a
//! placeholder node for a type before resolving its generics and members,
//! so self-referential definitions (`Node<T>` holding `List<Node<T>>`)
//! terminate and re-use the node already in the cache.

pub mod reflect;

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

pub use reflect::{NativeId, TypeArena};

/// Index of a node inside a [`TypeGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
}

impl PrimitiveKind {
    /// Bit width of the integer encoding, `None` for floats.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            PrimitiveKind::Bool => Some(1),
            PrimitiveKind::I8 | PrimitiveKind::U8 => Some(8),
            PrimitiveKind::I16 | PrimitiveKind::U16 | PrimitiveKind::Char => Some(16),
            PrimitiveKind::I32 | PrimitiveKind::U32 => Some(32),
            PrimitiveKind::I64 | PrimitiveKind::U64 => Some(64),
            PrimitiveKind::F32 | PrimitiveKind::F64 => None,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PrimitiveKind::I8 | PrimitiveKind::I16 | PrimitiveKind::I32 | PrimitiveKind::I64
        )
    }

    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            PrimitiveKind::Bool | PrimitiveKind::F32 | PrimitiveKind::F64
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::I8 => "i8",
            PrimitiveKind::I16 => "i16",
            PrimitiveKind::I32 => "i32",
            PrimitiveKind::I64 => "i64",
            PrimitiveKind::U8 => "u8",
            PrimitiveKind::U16 => "u16",
            PrimitiveKind::U32 => "u32",
            PrimitiveKind::U64 => "u64",
            PrimitiveKind::F32 => "f32",
            PrimitiveKind::F64 => "f64",
            PrimitiveKind::Char => "char",
        }
    }
}

/// A named routine whose parameters are host types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeRoutine<H> {
    pub name: Arc<str>,
    pub params: Vec<H>,
}

impl<H> NativeRoutine<H> {
    pub fn new(name: &str, params: Vec<H>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// What a concrete (non-generic-application) host type is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeKind<H> {
    Primitive(PrimitiveKind),
    String,
    List,
    Set,
    Map,
    Enum(Vec<Arc<str>>),
    Record {
        constructors: Vec<NativeRoutine<H>>,
        setters: Vec<NativeRoutine<H>>,
    },
    /// An interface or abstract class: known implementations and the
    /// methods a mock would need to answer.
    Abstract {
        implementations: Vec<H>,
        methods: Vec<NativeRoutine<H>>,
    },
    /// A type nothing is known about beyond its name.
    Opaque,
}

/// The host's native shapes, as reported by a [`TypeSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeShape<H> {
    /// A plain class with its declared type parameters.
    Class {
        name: Arc<str>,
        kind: NativeKind<H>,
        type_params: Vec<H>,
    },
    /// A generic class applied to actual arguments.
    Parameterized { raw: H, args: Vec<H> },
    Array { component: H },
    /// A type variable with its upper bounds.
    Variable { name: Arc<str>, bounds: Vec<H> },
    Wildcard { upper: Vec<H> },
    Unsupported,
}

/// Read access to host type descriptions.
pub trait TypeSource {
    type Handle: Clone + Eq + Hash + fmt::Debug;

    fn shape(&self, ty: &Self::Handle) -> NativeShape<Self::Handle>;
}

/// A resolved member routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: Arc<str>,
    pub params: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    String,
    Array,
    List,
    Set,
    Map,
    Enum(Arc<[Arc<str>]>),
    Record {
        constructors: Vec<Member>,
        setters: Vec<Member>,
    },
    Abstract {
        implementations: Vec<TypeId>,
        methods: Vec<Member>,
    },
    Opaque,
    /// The universal fallback for unresolvable types.
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNode {
    pub name: Arc<str>,
    pub kind: TypeKind,
    pub generics: Vec<TypeId>,
}

/// A frozen, shareable view of resolved types.
#[derive(Debug, Default)]
pub struct TypeGraph {
    nodes: Vec<TypeNode>,
}

impl TypeGraph {
    pub fn node(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// A handle onto node `id` that compares by graph identity.
    pub fn fuzzed(self: &Arc<Self>, id: TypeId) -> FuzzedType {
        FuzzedType {
            graph: Arc::clone(self),
            id,
        }
    }
}

/// A resolved type: a node in a shared [`TypeGraph`].
///
/// Equality and hashing use the graph's identity and the node index, never
/// the structure, so cyclic types compare and hash in constant time.
#[derive(Clone)]
pub struct FuzzedType {
    graph: Arc<TypeGraph>,
    id: TypeId,
}

impl FuzzedType {
    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn graph(&self) -> &Arc<TypeGraph> {
        &self.graph
    }

    pub fn node(&self) -> &TypeNode {
        self.graph.node(self.id)
    }

    pub fn name(&self) -> &str {
        &self.node().name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.node().kind
    }

    pub fn generics(&self) -> Vec<FuzzedType> {
        self.node()
            .generics
            .iter()
            .map(|id| self.graph.fuzzed(*id))
            .collect()
    }

    pub fn generic(&self, index: usize) -> Option<FuzzedType> {
        self.node().generics.get(index).map(|id| self.graph.fuzzed(*id))
    }

    pub fn at(&self, id: TypeId) -> FuzzedType {
        self.graph.fuzzed(id)
    }

    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self.kind() {
            TypeKind::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Whether `null` is a legal value of this type.
    pub fn is_nullable(&self) -> bool {
        !matches!(self.kind(), TypeKind::Primitive(_))
    }
}

impl PartialEq for FuzzedType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.graph, &other.graph)
    }
}

impl Eq for FuzzedType {}

impl Hash for FuzzedType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.graph) as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for FuzzedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self, self.id.0)
    }
}

impl fmt::Display for FuzzedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // one level of generics; cycles make a full expansion infinite
        let node = self.node();
        f.write_str(&node.name)?;
        if !node.generics.is_empty() {
            let names: Vec<&str> = node
                .generics
                .iter()
                .map(|id| &*self.graph.node(*id).name)
                .collect();
            write!(f, "<{}>", names.join(", "))?;
        }
        Ok(())
    }
}

/// Memoized resolution of host handles into graph nodes.
///
/// The cache is append-only: a handle resolved once always maps to the same
/// node, and snapshots taken later contain every earlier node.
#[derive(Debug)]
pub struct TypeCache<H> {
    index: HashMap<H, TypeId>,
    nodes: Vec<TypeNode>,
    snapshot: Option<Arc<TypeGraph>>,
}

impl<H: Clone + Eq + Hash + fmt::Debug> Default for TypeCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Clone + Eq + Hash + fmt::Debug> TypeCache<H> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            nodes: Vec::new(),
            snapshot: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, handle: &H) -> Option<TypeId> {
        self.index.get(handle).copied()
    }

    /// Resolve `handle`, reusing nodes for handles seen before.
    pub fn resolve<S>(&mut self, source: &S, handle: &H) -> TypeId
    where
        S: TypeSource<Handle = H>,
    {
        let handle = self.unwrap_variables(source, handle);
        let Some(handle) = handle else {
            return self.any();
        };
        if let Some(id) = self.index.get(&handle) {
            return *id;
        }

        let (name, native_kind, generic_handles, is_array) = match source.shape(&handle) {
            NativeShape::Class {
                name,
                kind,
                type_params,
            } => (name, Some(kind), type_params, false),
            NativeShape::Parameterized { raw, args } => match source.shape(&raw) {
                NativeShape::Class { name, kind, .. } => (name, Some(kind), args, false),
                _ => (Arc::from("?"), None, args, false),
            },
            NativeShape::Array { component } => (Arc::from("[]"), None, vec![component], true),
            NativeShape::Variable { .. } | NativeShape::Wildcard { .. } | NativeShape::Unsupported => {
                (Arc::from("?"), None, Vec::new(), false)
            }
        };

        // placeholder first, so cycles through this handle find it
        let id = TypeId(self.nodes.len());
        self.nodes.push(TypeNode {
            name: name.clone(),
            kind: TypeKind::Any,
            generics: Vec::new(),
        });
        self.index.insert(handle.clone(), id);
        self.snapshot = None;
        trace!(?handle, id = id.0, name = %name, "registered type placeholder");

        let generics: Vec<TypeId> = generic_handles
            .iter()
            .map(|h| self.resolve(source, h))
            .collect();
        let kind = if is_array {
            TypeKind::Array
        } else {
            match native_kind {
                Some(kind) => self.resolve_kind(source, kind),
                None => TypeKind::Any,
            }
        };
        if is_array {
            if let Some(component) = generics.first() {
                let name = format!("[{}]", self.nodes[component.0].name);
                self.nodes[id.0].name = name.into();
            }
        }
        let node = &mut self.nodes[id.0];
        node.kind = kind;
        node.generics = generics;
        id
    }

    /// An immutable view of everything resolved so far.
    pub fn snapshot(&mut self) -> Arc<TypeGraph> {
        if let Some(graph) = &self.snapshot {
            return Arc::clone(graph);
        }
        let graph = Arc::new(TypeGraph {
            nodes: self.nodes.clone(),
        });
        self.snapshot = Some(Arc::clone(&graph));
        graph
    }

    fn resolve_kind<S>(&mut self, source: &S, kind: NativeKind<H>) -> TypeKind
    where
        S: TypeSource<Handle = H>,
    {
        match kind {
            NativeKind::Primitive(p) => TypeKind::Primitive(p),
            NativeKind::String => TypeKind::String,
            NativeKind::List => TypeKind::List,
            NativeKind::Set => TypeKind::Set,
            NativeKind::Map => TypeKind::Map,
            NativeKind::Enum(variants) => TypeKind::Enum(variants.into()),
            NativeKind::Record {
                constructors,
                setters,
            } => TypeKind::Record {
                constructors: self.resolve_members(source, constructors),
                setters: self.resolve_members(source, setters),
            },
            NativeKind::Abstract {
                implementations,
                methods,
            } => TypeKind::Abstract {
                implementations: implementations
                    .iter()
                    .map(|h| self.resolve(source, h))
                    .collect(),
                methods: self.resolve_members(source, methods),
            },
            NativeKind::Opaque => TypeKind::Opaque,
        }
    }

    fn resolve_members<S>(&mut self, source: &S, routines: Vec<NativeRoutine<H>>) -> Vec<Member>
    where
        S: TypeSource<Handle = H>,
    {
        routines
            .into_iter()
            .map(|r| Member {
                params: r.params.iter().map(|h| self.resolve(source, h)).collect(),
                name: r.name,
            })
            .collect()
    }

    /// Replace type variables with their first bound and wildcards with
    /// their upper bound. `None` means the universal fallback.
    fn unwrap_variables<S>(&self, source: &S, handle: &H) -> Option<H>
    where
        S: TypeSource<Handle = H>,
    {
        let mut current = handle.clone();
        let mut seen = Vec::new();
        loop {
            let next = match source.shape(&current) {
                NativeShape::Variable { bounds, .. } => bounds.into_iter().next(),
                NativeShape::Wildcard { upper } => upper.into_iter().next(),
                _ => return Some(current),
            };
            seen.push(current);
            match next {
                Some(next) if !seen.contains(&next) => current = next,
                _ => return None,
            }
        }
    }

    fn any(&mut self) -> TypeId {
        if let Some(id) = self
            .nodes
            .iter()
            .position(|n| n.kind == TypeKind::Any && &*n.name == "any")
        {
            return TypeId(id);
        }
        let id = TypeId(self.nodes.len());
        self.nodes.push(TypeNode {
            name: Arc::from("any"),
            kind: TypeKind::Any,
            generics: Vec::new(),
        });
        self.snapshot = None;
        id
    }
}

/// A [`TypeCache`] shared between concurrent resolvers.
///
/// Each resolution holds the lock for its whole recursive walk, so a handle
/// is never resolved twice and readers never see a half-built node.
#[derive(Debug)]
pub struct SharedTypeCache<H> {
    inner: Mutex<TypeCache<H>>,
}

impl<H: Clone + Eq + Hash + fmt::Debug> Default for SharedTypeCache<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Clone + Eq + Hash + fmt::Debug> SharedTypeCache<H> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TypeCache::new()),
        }
    }

    pub fn resolve<S>(&self, source: &S, handle: &H) -> TypeId
    where
        S: TypeSource<Handle = H>,
    {
        self.inner.lock().resolve(source, handle)
    }

    pub fn snapshot(&self) -> Arc<TypeGraph> {
        self.inner.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Resolve every handle and return the matching [`FuzzedType`]s, all backed
/// by one graph snapshot.
pub fn resolve_all<S>(source: &S, handles: &[S::Handle], cache: &mut TypeCache<S::Handle>) -> Vec<FuzzedType>
where
    S: TypeSource,
{
    let ids: Vec<TypeId> = handles.iter().map(|h| cache.resolve(source, h)).collect();
    let graph = cache.snapshot();
    ids.into_iter().map(|id| graph.fuzzed(id)).collect()
}
