//! Seeds and routines: the recipes providers hand to the driver.
//!
//! A seed never holds a finished composite value. It describes how to build
//! one from values of other types, which the driver produces recursively.
//! Routines are shared closures so a seed can be cloned into the per-type
//! cache and into the corpus without re-running its provider.

use std::fmt;
use std::rc::Rc;

use rand::RngCore;

use crate::known::KnownValue;

/// Changes a simple value in place of a known-value mutation.
pub type SimpleMutation<R> = Rc<dyn Fn(&R, &mut dyn RngCore) -> R>;

/// Turns a known value into a host value.
pub type KnownBuilder<R> = Rc<dyn Fn(&KnownValue) -> R>;

#[derive(Clone)]
pub enum Seed<T, R> {
    /// A ready-made value with an optional provider-supplied mutation.
    Simple {
        value: R,
        mutation: Option<SimpleMutation<R>>,
    },
    /// A known value and a function that turns it into the host value.
    Known { value: KnownValue, build: KnownBuilder<R> },
    /// An object built by a constructor, then modified by calls.
    Recursive {
        construct: Create<T, R>,
        modify: Vec<Call<T, R>>,
        empty: Option<Empty<R>>,
    },
    /// A container of a chosen size, filled element by element.
    Collection {
        construct: CollectionRoutine<R>,
        modify: ForEach<T, R>,
    },
    /// A placeholder built without producing any other value.
    Empty(Empty<R>),
}

impl<T, R> Seed<T, R> {
    pub fn simple(value: R) -> Self {
        Seed::Simple {
            value,
            mutation: None,
        }
    }

    pub fn simple_with_mutation(
        value: R,
        mutation: impl Fn(&R, &mut dyn RngCore) -> R + 'static,
    ) -> Self {
        Seed::Simple {
            value,
            mutation: Some(Rc::new(mutation)),
        }
    }

    pub fn known(value: KnownValue, build: impl Fn(&KnownValue) -> R + 'static) -> Self {
        Seed::Known {
            value,
            build: Rc::new(build),
        }
    }

    pub fn recursive(construct: Create<T, R>) -> Self {
        Seed::Recursive {
            construct,
            modify: Vec::new(),
            empty: None,
        }
    }

    pub fn empty(build: impl Fn() -> R + 'static) -> Self {
        Seed::Empty(Empty::new(build))
    }

    /// A collection whose elements are all of type `element`.
    pub fn collection_of(
        element: T,
        construct: impl Fn(usize) -> R + 'static,
        push: impl Fn(&mut R, usize, Vec<R>) + 'static,
    ) -> Self {
        Seed::Collection {
            construct: CollectionRoutine::new(construct),
            modify: ForEach::new(vec![element], push),
        }
    }

    /// Attach modification calls to a recursive seed.
    pub fn with_calls(self, calls: Vec<Call<T, R>>) -> Self {
        match self {
            Seed::Recursive {
                construct, empty, ..
            } => Seed::Recursive {
                construct,
                modify: calls,
                empty,
            },
            other => other,
        }
    }

    /// Attach the depth-overflow fallback to a recursive seed.
    pub fn with_empty(self, empty: Empty<R>) -> Self {
        match self {
            Seed::Recursive {
                construct, modify, ..
            } => Seed::Recursive {
                construct,
                modify,
                empty: Some(empty),
            },
            other => other,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Seed::Simple { .. } => "simple",
            Seed::Known { .. } => "known",
            Seed::Recursive { .. } => "recursive",
            Seed::Collection { .. } => "collection",
            Seed::Empty(_) => "empty",
        }
    }
}

impl<T: fmt::Debug, R: fmt::Debug> fmt::Debug for Seed<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::Simple { value, mutation } => f
                .debug_struct("Simple")
                .field("value", value)
                .field("mutable", &mutation.is_some())
                .finish(),
            Seed::Known { value, .. } => f.debug_tuple("Known").field(value).finish(),
            Seed::Recursive {
                construct,
                modify,
                empty,
            } => f
                .debug_struct("Recursive")
                .field("construct", &construct.types)
                .field("modify", &modify.len())
                .field("empty", &empty.is_some())
                .finish(),
            Seed::Collection { modify, .. } => f
                .debug_struct("Collection")
                .field("element", &modify.types)
                .finish(),
            Seed::Empty(_) => f.write_str("Empty"),
        }
    }
}

/// Builds an object from values of `types`.
#[derive(Clone)]
pub struct Create<T, R> {
    pub types: Vec<T>,
    builder: Rc<dyn Fn(Vec<R>) -> R>,
}

impl<T, R> Create<T, R> {
    pub fn new(types: Vec<T>, builder: impl Fn(Vec<R>) -> R + 'static) -> Self {
        Self {
            types,
            builder: Rc::new(builder),
        }
    }

    pub fn invoke(&self, arguments: Vec<R>) -> R {
        (self.builder)(arguments)
    }
}

/// Modifies an existing object with values of `types`.
#[derive(Clone)]
pub struct Call<T, R> {
    pub types: Vec<T>,
    callable: Rc<dyn Fn(&mut R, Vec<R>)>,
}

impl<T, R> Call<T, R> {
    pub fn new(types: Vec<T>, callable: impl Fn(&mut R, Vec<R>) + 'static) -> Self {
        Self {
            types,
            callable: Rc::new(callable),
        }
    }

    pub fn invoke(&self, instance: &mut R, arguments: Vec<R>) {
        (self.callable)(instance, arguments)
    }
}

/// Creates a container with room for `size` elements.
#[derive(Clone)]
pub struct CollectionRoutine<R> {
    builder: Rc<dyn Fn(usize) -> R>,
}

impl<R> CollectionRoutine<R> {
    pub fn new(builder: impl Fn(usize) -> R + 'static) -> Self {
        Self {
            builder: Rc::new(builder),
        }
    }

    pub fn invoke(&self, size: usize) -> R {
        (self.builder)(size)
    }
}

/// Stores one element, built from values of `types`, at an index.
#[derive(Clone)]
pub struct ForEach<T, R> {
    pub types: Vec<T>,
    callable: Rc<dyn Fn(&mut R, usize, Vec<R>)>,
}

impl<T, R> ForEach<T, R> {
    pub fn new(types: Vec<T>, callable: impl Fn(&mut R, usize, Vec<R>) + 'static) -> Self {
        Self {
            types,
            callable: Rc::new(callable),
        }
    }

    pub fn invoke(&self, instance: &mut R, index: usize, arguments: Vec<R>) {
        (self.callable)(instance, index, arguments)
    }
}

/// Builds a placeholder object without recursing.
#[derive(Clone)]
pub struct Empty<R> {
    builder: Rc<dyn Fn() -> R>,
}

impl<R> Empty<R> {
    pub fn new(builder: impl Fn() -> R + 'static) -> Self {
        Self {
            builder: Rc::new(builder),
        }
    }

    pub fn invoke(&self) -> R {
        (self.builder)()
    }
}
