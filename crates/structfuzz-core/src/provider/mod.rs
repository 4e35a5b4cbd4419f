//! Value providers: the source of seeds for each type.
//!
//! A provider declares which types it accepts, may enrich the request scope,
//! and yields a lazy, possibly infinite sequence of seeds. The registry
//! concatenates accepted providers in registration order; the driver alone
//! decides how many seeds to pull.

pub mod collections;
pub mod objects;
pub mod primitives;

use std::sync::Arc;

use crate::description::{Description, Scope};
use crate::model::{FuzzedValue, IdGenerator};
use crate::seed::Seed;
use crate::types::FuzzedType;

pub use collections::CollectionValueProvider;
pub use objects::{
    AbstractValueProvider, EnumValueProvider, MockValueProvider, NullValueProvider,
    ObjectValueProvider, MOCK_METHODS,
};
pub use primitives::{BoolValueProvider, FloatValueProvider, IntegerValueProvider, StringValueProvider};

/// A lazy stream of seeds.
pub type SeedIter<'a, T, R> = Box<dyn Iterator<Item = Seed<T, R>> + 'a>;

pub trait ValueProvider<T, R> {
    /// Whether this provider has seeds for `ty`.
    fn accept(&self, _ty: &T) -> bool {
        true
    }

    /// Add request-specific properties to `scope` before generation.
    fn enrich(&self, _description: &Description<T>, _ty: &T, _scope: &mut Scope) {}

    fn generate<'a>(&'a self, description: &'a Description<T>, ty: &T) -> SeedIter<'a, T, R>;
}

impl<T, R, P: ValueProvider<T, R> + ?Sized> ValueProvider<T, R> for Box<P> {
    fn accept(&self, ty: &T) -> bool {
        (**self).accept(ty)
    }

    fn enrich(&self, description: &Description<T>, ty: &T, scope: &mut Scope) {
        (**self).enrich(description, ty, scope)
    }

    fn generate<'a>(&'a self, description: &'a Description<T>, ty: &T) -> SeedIter<'a, T, R> {
        (**self).generate(description, ty)
    }
}

/// Provider combinators.
pub trait ValueProviderExt<T, R>: ValueProvider<T, R> + Sized {
    /// Drop seeds matching `predicate`.
    fn except<F>(self, predicate: F) -> Except<Self, F>
    where
        F: Fn(&Seed<T, R>) -> bool,
    {
        Except {
            inner: self,
            predicate,
        }
    }

    /// Use `fallback` when this provider does not accept a type or yields
    /// nothing for it.
    fn with_fallback<O>(self, fallback: O) -> WithFallback<Self, O>
    where
        O: ValueProvider<T, R>,
    {
        WithFallback {
            primary: self,
            fallback,
        }
    }
}

impl<T, R, P: ValueProvider<T, R>> ValueProviderExt<T, R> for P {}

pub struct Except<P, F> {
    inner: P,
    predicate: F,
}

impl<T: 'static, R: 'static, P, F> ValueProvider<T, R> for Except<P, F>
where
    P: ValueProvider<T, R>,
    F: Fn(&Seed<T, R>) -> bool,
{
    fn accept(&self, ty: &T) -> bool {
        self.inner.accept(ty)
    }

    fn enrich(&self, description: &Description<T>, ty: &T, scope: &mut Scope) {
        self.inner.enrich(description, ty, scope)
    }

    fn generate<'a>(&'a self, description: &'a Description<T>, ty: &T) -> SeedIter<'a, T, R> {
        Box::new(
            self.inner
                .generate(description, ty)
                .filter(move |seed| !(self.predicate)(seed)),
        )
    }
}

pub struct WithFallback<P, O> {
    primary: P,
    fallback: O,
}

impl<T: 'static, R: 'static, P, O> ValueProvider<T, R> for WithFallback<P, O>
where
    P: ValueProvider<T, R>,
    O: ValueProvider<T, R>,
{
    fn accept(&self, ty: &T) -> bool {
        self.primary.accept(ty) || self.fallback.accept(ty)
    }

    fn enrich(&self, description: &Description<T>, ty: &T, scope: &mut Scope) {
        if self.primary.accept(ty) {
            self.primary.enrich(description, ty, scope)
        } else {
            self.fallback.enrich(description, ty, scope)
        }
    }

    fn generate<'a>(&'a self, description: &'a Description<T>, ty: &T) -> SeedIter<'a, T, R> {
        if self.primary.accept(ty) {
            let mut seeds = self.primary.generate(description, ty).peekable();
            if seeds.peek().is_some() {
                return Box::new(seeds);
            }
        }
        if self.fallback.accept(ty) {
            self.fallback.generate(description, ty)
        } else {
            Box::new(std::iter::empty())
        }
    }
}

/// An ordered set of providers.
pub struct ProviderRegistry<T, R> {
    providers: Vec<Box<dyn ValueProvider<T, R>>>,
}

impl<T, R> Default for ProviderRegistry<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R> ProviderRegistry<T, R> {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn of(providers: Vec<Box<dyn ValueProvider<T, R>>>) -> Self {
        Self { providers }
    }

    pub fn with(mut self, provider: impl ValueProvider<T, R> + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn push(&mut self, provider: impl ValueProvider<T, R> + 'static) {
        self.providers.push(Box::new(provider));
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Let every accepting provider enrich `scope`.
    pub fn enrich(&self, description: &Description<T>, ty: &T, scope: &mut Scope) {
        for provider in self.providers.iter().filter(|p| p.accept(ty)) {
            provider.enrich(description, ty, scope);
        }
    }

    /// Seeds of every accepting provider, in registration order.
    pub fn generate<'a>(&'a self, description: &'a Description<T>, ty: &T) -> SeedIter<'a, T, R>
    where
        T: 'a,
        R: 'a,
    {
        let streams: Vec<SeedIter<'a, T, R>> = self
            .providers
            .iter()
            .filter(|p| p.accept(ty))
            .map(|p| p.generate(description, ty))
            .collect();
        Box::new(streams.into_iter().flatten())
    }
}

/// The providers for [`FuzzedType`] and [`FuzzedValue`], in the order
/// their seeds are preferred.
pub fn default_value_providers(ids: Arc<IdGenerator>) -> ProviderRegistry<FuzzedType, FuzzedValue> {
    ProviderRegistry::new()
        .with(BoolValueProvider)
        .with(IntegerValueProvider)
        .with(FloatValueProvider)
        .with(StringValueProvider)
        .with(EnumValueProvider)
        .with(ObjectValueProvider::new(Arc::clone(&ids)))
        .with(AbstractValueProvider)
        .with(MockValueProvider::new(ids))
        .with(CollectionValueProvider)
        .with(NullValueProvider)
}
