//! Turning seeds into value trees.
//!
//! A [`Produced`] tree records which seed was chosen for every slot and
//! which sub-trees were produced for its routines. Values are only created
//! from the tree at the end, so the same tree can be stored, mutated and
//! re-created later.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::config::FuzzConfig;
use crate::description::{Description, Scope};
use crate::known::KnownValue;
use crate::provider::{ProviderRegistry, SeedIter};
use crate::seed::{Call, CollectionRoutine, Create, Empty, ForEach, KnownBuilder, Seed, SimpleMutation};

/// One produced slot.
#[derive(Clone)]
pub enum Produced<T, R> {
    Simple {
        value: R,
        mutation: Option<SimpleMutation<R>>,
    },
    Known {
        value: KnownValue,
        build: KnownBuilder<R>,
    },
    Recursive {
        construct: Create<T, R>,
        args: Vec<Produced<T, R>>,
        calls: Vec<ProducedCall<T, R>>,
    },
    Collection {
        construct: CollectionRoutine<R>,
        modify: ForEach<T, R>,
        elements: Vec<Vec<Produced<T, R>>>,
    },
    Empty(Empty<R>),
    /// Same value as the earlier sibling at this index.
    Reused(usize),
}

/// A modification call with its produced arguments.
#[derive(Clone)]
pub struct ProducedCall<T, R> {
    pub call: Call<T, R>,
    pub args: Vec<Produced<T, R>>,
}

impl<T, R: Clone> Produced<T, R> {
    fn create(&self, siblings: &[R]) -> R {
        match self {
            Produced::Simple { value, .. } => value.clone(),
            Produced::Known { value, build } => build(value),
            Produced::Recursive {
                construct,
                args,
                calls,
            } => {
                let mut object = construct.invoke(create_all(args));
                for produced in calls {
                    produced.call.invoke(&mut object, create_all(&produced.args));
                }
                object
            }
            Produced::Collection {
                construct,
                modify,
                elements,
            } => {
                let mut collection = construct.invoke(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    modify.invoke(&mut collection, index, create_all(element));
                }
                collection
            }
            Produced::Empty(empty) => empty.invoke(),
            // reuse always points backwards
            Produced::Reused(index) => siblings[*index].clone(),
        }
    }

    /// Number of slots in this tree, counting reused slots once.
    pub fn size(&self) -> usize {
        match self {
            Produced::Recursive { args, calls, .. } => {
                1 + args.iter().map(Self::size).sum::<usize>()
                    + calls
                        .iter()
                        .flat_map(|c| c.args.iter())
                        .map(Self::size)
                        .sum::<usize>()
            }
            Produced::Collection { elements, .. } => {
                1 + elements.iter().flatten().map(Self::size).sum::<usize>()
            }
            Produced::Reused(_) => 0,
            _ => 1,
        }
    }
}

impl<T, R: fmt::Debug> fmt::Debug for Produced<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Produced::Simple { value, .. } => f.debug_tuple("Simple").field(value).finish(),
            Produced::Known { value, .. } => f.debug_tuple("Known").field(value).finish(),
            Produced::Recursive { args, calls, .. } => f
                .debug_struct("Recursive")
                .field("args", args)
                .field("calls", &calls.iter().map(|c| &c.args).collect::<Vec<_>>())
                .finish(),
            Produced::Collection { elements, .. } => {
                f.debug_tuple("Collection").field(elements).finish()
            }
            Produced::Empty(_) => f.write_str("Empty"),
            Produced::Reused(index) => f.debug_tuple("Reused").field(index).finish(),
        }
    }
}

/// Create the values of one argument list.
pub fn create_all<T, R: Clone>(produced: &[Produced<T, R>]) -> Vec<R> {
    let mut values = Vec::with_capacity(produced.len());
    for item in produced {
        let value = item.create(&values);
        values.push(value);
    }
    values
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProduceError {
    #[error("no seeds for {type_name}")]
    NoSeeds { type_name: String },
    #[error("recursion depth exceeded and no empty value")]
    DepthExceeded,
}

/// A top-level slot that could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotFailure {
    pub index: usize,
    pub error: ProduceError,
}

#[derive(Debug, Clone, Copy)]
struct State {
    depth: usize,
    iterations: Option<usize>,
    parameter_index: Option<usize>,
}

impl State {
    fn child(self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self
        }
    }
}

struct Slot<T, R> {
    seed: Seed<T, R>,
    tries: u64,
}

/// The seeds of one type: pulled lazily from the provider stream, each
/// remembered with how often it was chosen.
struct SeedPool<'a, T, R> {
    pending: Option<SeedIter<'a, T, R>>,
    slots: Vec<Slot<T, R>>,
}

impl<'a, T: Clone, R: Clone> SeedPool<'a, T, R> {
    fn new(seeds: SeedIter<'a, T, R>) -> Self {
        Self {
            pending: Some(seeds),
            slots: Vec::new(),
        }
    }

    /// Untried seeds first, in stream order; once the stream is exhausted
    /// or `cap` seeds are held, seeds tried least are preferred.
    fn select(&mut self, cap: usize, rng: &mut StdRng) -> Option<Seed<T, R>> {
        if self.slots.len() < cap {
            if let Some(stream) = self.pending.as_mut() {
                match stream.next() {
                    Some(seed) => {
                        self.slots.push(Slot { seed, tries: 1 });
                        return self.slots.last().map(|s| s.seed.clone());
                    }
                    None => self.pending = None,
                }
            }
        } else {
            self.pending = None;
        }
        let weights = self.slots.iter().map(|s| 1.0 / (1.0 + s.tries as f64));
        let index = WeightedIndex::new(weights).ok()?.sample(rng);
        let slot = &mut self.slots[index];
        slot.tries += 1;
        Some(slot.seed.clone())
    }

    fn is_exhausted(&self) -> bool {
        self.pending.is_none() && self.slots.is_empty()
    }
}

/// Produces value trees for one description.
///
/// Seeds are generated once per type and cached for the session; a request
/// whose scope was enriched by some provider is generated afresh.
pub struct Producer<'a, T, R> {
    registry: &'a ProviderRegistry<T, R>,
    description: &'a Description<T>,
    config: &'a FuzzConfig,
    pools: HashMap<T, SeedPool<'a, T, R>>,
    missed: Vec<String>,
}

impl<'a, T, R> Producer<'a, T, R>
where
    T: Clone + Eq + Hash + fmt::Display + 'a,
    R: Clone + 'a,
{
    pub fn new(
        registry: &'a ProviderRegistry<T, R>,
        description: &'a Description<T>,
        config: &'a FuzzConfig,
    ) -> Self {
        Self {
            registry,
            description,
            config,
            pools: HashMap::new(),
            missed: Vec::new(),
        }
    }

    /// Types that had no seeds, by name, in the order they were missed.
    pub fn missed_types(&self) -> &[String] {
        &self.missed
    }

    /// Whether `ty` was requested and its seed stream turned out empty.
    pub fn is_unproducible(&self, ty: &T) -> bool {
        self.pools.get(ty).is_some_and(SeedPool::is_exhausted)
    }

    /// Produce one tree per top-level type.
    pub fn fuzz_params(
        &mut self,
        types: &[T],
        rng: &mut StdRng,
    ) -> Result<Vec<Produced<T, R>>, SlotFailure> {
        let mut produced = Vec::with_capacity(types.len());
        for (index, ty) in types.iter().enumerate() {
            let state = State {
                depth: 1,
                iterations: None,
                parameter_index: Some(index),
            };
            let item = match self.reuse(&types[..index], ty, rng) {
                Some(earlier) => Produced::Reused(earlier),
                None => self
                    .produce(ty, state, rng)
                    .map_err(|error| SlotFailure { index, error })?,
            };
            produced.push(item);
        }
        Ok(produced)
    }

    fn fuzz_all(
        &mut self,
        types: &[T],
        state: State,
        rng: &mut StdRng,
    ) -> Result<Vec<Produced<T, R>>, ProduceError> {
        let mut produced = Vec::with_capacity(types.len());
        for (index, ty) in types.iter().enumerate() {
            let item = match self.reuse(&types[..index], ty, rng) {
                Some(earlier) => Produced::Reused(earlier),
                None => self.produce(ty, state, rng)?,
            };
            produced.push(item);
        }
        Ok(produced)
    }

    fn reuse(&self, earlier: &[T], ty: &T, rng: &mut StdRng) -> Option<usize> {
        let same: Vec<usize> = earlier
            .iter()
            .enumerate()
            .filter(|(_, t)| *t == ty)
            .map(|(i, _)| i)
            .collect();
        if same.is_empty() || !rng.gen_bool(self.config.prob_reuse_value_for_same_type) {
            return None;
        }
        same.choose(rng).copied()
    }

    fn produce(
        &mut self,
        ty: &T,
        state: State,
        rng: &mut StdRng,
    ) -> Result<Produced<T, R>, ProduceError> {
        let mut scope = Scope::new(state.parameter_index, state.depth);
        self.registry.enrich(self.description, ty, &mut scope);
        let cap = self.config.max_seeds_per_type;
        let seed = if scope.is_empty() {
            let (registry, description) = (self.registry, self.description);
            self.pools
                .entry(ty.clone())
                .or_insert_with(|| SeedPool::new(registry.generate(description, ty)))
                .select(cap, rng)
        } else {
            let scoped = self.description.with_scope(scope);
            let seeds: Vec<Seed<T, R>> = self.registry.generate(&scoped, ty).take(cap).collect();
            seeds.choose(rng).cloned()
        };
        let Some(seed) = seed else {
            let type_name = ty.to_string();
            if !self.missed.contains(&type_name) {
                debug!(type_name = %type_name, "no seeds for type");
                self.missed.push(type_name.clone());
            }
            return Err(ProduceError::NoSeeds { type_name });
        };
        self.reduce(seed, state, rng)
    }

    fn reduce(
        &mut self,
        seed: Seed<T, R>,
        state: State,
        rng: &mut StdRng,
    ) -> Result<Produced<T, R>, ProduceError> {
        match seed {
            Seed::Simple { value, mutation } => Ok(Produced::Simple { value, mutation }),
            Seed::Known { value, build } => Ok(Produced::Known { value, build }),
            Seed::Recursive {
                construct,
                modify,
                empty,
            } => self.reduce_recursive(construct, modify, empty, state, rng),
            Seed::Collection { construct, modify } => {
                self.reduce_collection(construct, modify, state, rng)
            }
            Seed::Empty(empty) => Ok(Produced::Empty(empty)),
        }
    }

    fn reduce_recursive(
        &mut self,
        construct: Create<T, R>,
        modify: Vec<Call<T, R>>,
        empty: Option<Empty<R>>,
        state: State,
        rng: &mut StdRng,
    ) -> Result<Produced<T, R>, ProduceError> {
        if state.depth > self.config.recursion_tree_depth {
            return empty.map(Produced::Empty).ok_or(ProduceError::DepthExceeded);
        }
        // an object's own collections are sized independently of any outer one
        let child = State {
            iterations: None,
            ..state.child()
        };
        let result = self.construct_and_modify(construct, modify, child, rng);
        match (result, empty) {
            (Err(ProduceError::NoSeeds { .. }), Some(empty))
                if self.config.generate_empty_for_missed_types =>
            {
                Ok(Produced::Empty(empty))
            }
            (result, _) => result,
        }
    }

    fn construct_and_modify(
        &mut self,
        construct: Create<T, R>,
        mut modify: Vec<Call<T, R>>,
        child: State,
        rng: &mut StdRng,
    ) -> Result<Produced<T, R>, ProduceError> {
        let args = self.fuzz_all(&construct.types, child, rng)?;
        modify.shuffle(rng);
        modify.truncate(self.config.max_recursive_modifications);
        let mut calls = Vec::with_capacity(modify.len());
        for call in modify {
            let args = self.fuzz_all(&call.types, child, rng)?;
            calls.push(ProducedCall { call, args });
        }
        Ok(Produced::Recursive {
            construct,
            args,
            calls,
        })
    }

    fn reduce_collection(
        &mut self,
        construct: CollectionRoutine<R>,
        modify: ForEach<T, R>,
        state: State,
        rng: &mut StdRng,
    ) -> Result<Produced<T, R>, ProduceError> {
        let config = self.config;
        if state.depth > config.recursion_tree_depth {
            return Ok(Produced::Collection {
                construct,
                modify,
                elements: Vec::new(),
            });
        }
        let iterations = match state.iterations {
            Some(parent) if rng.gen_bool(config.prob_rectangle_collection) => parent,
            _ if rng.gen_bool(config.prob_empty_collection) => 0,
            _ => rng.gen_range(1..=config.collection_iterations),
        };
        let child = State {
            depth: state.depth + 1,
            iterations: Some(iterations),
            ..state
        };
        let elements = match self.elements(&modify.types, iterations, child, rng) {
            Ok(elements) => elements,
            Err(ProduceError::NoSeeds { .. }) if config.generate_empty_for_missed_types => Vec::new(),
            Err(e) => return Err(e),
        };
        Ok(Produced::Collection {
            construct,
            modify,
            elements,
        })
    }

    fn elements(
        &mut self,
        types: &[T],
        iterations: usize,
        child: State,
        rng: &mut StdRng,
    ) -> Result<Vec<Vec<Produced<T, R>>>, ProduceError> {
        if iterations > 0 && rng.gen_bool(self.config.prob_collection_duplication) {
            let element = self.fuzz_all(types, child, rng)?;
            return Ok(vec![element; iterations]);
        }
        (0..iterations)
            .map(|_| self.fuzz_all(types, child, rng))
            .collect()
    }
}
