//! Structural mutation of produced trees.

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use super::config::FuzzConfig;
use super::produce::{Produced, ProducedCall};
use crate::known::KnownValue;

/// How eagerly a slot of this shape is picked for mutation.
fn rate<T, R>(produced: &Produced<T, R>) -> f64 {
    match produced {
        Produced::Simple {
            mutation: Some(_), ..
        } => 2.0,
        Produced::Known {
            value: KnownValue::String(_),
            ..
        } => 2.0,
        Produced::Known { .. } => 1.2,
        Produced::Collection { elements, .. } if !elements.is_empty() => 0.7,
        Produced::Recursive { args, calls, .. } if !args.is_empty() || !calls.is_empty() => 0.5,
        _ => 0.0,
    }
}

/// Mutate one slot of `node`, chosen by [`rate`]. A node with nothing
/// mutable is returned unchanged.
pub fn mutate<T: Clone, R: Clone>(
    node: &[Produced<T, R>],
    rng: &mut dyn RngCore,
    config: &FuzzConfig,
) -> Vec<Produced<T, R>> {
    let mut node = node.to_vec();
    let Ok(weights) = WeightedIndex::new(node.iter().map(rate)) else {
        return node;
    };
    let index = weights.sample(rng);
    node[index] = mutate_one(&node[index], rng, config);
    node
}

fn mutate_one<T: Clone, R: Clone>(
    produced: &Produced<T, R>,
    rng: &mut dyn RngCore,
    config: &FuzzConfig,
) -> Produced<T, R> {
    match produced {
        Produced::Simple {
            value,
            mutation: Some(mutation),
        } => Produced::Simple {
            value: mutation(value, rng),
            mutation: Some(mutation.clone()),
        },
        Produced::Known { value, build } => {
            let mutations = value.mutations();
            let mutated = mutations
                .choose(rng)
                .and_then(|m| value.mutate(*m, rng, config.max_string_length_when_mutated));
            match mutated {
                Some(value) => Produced::Known {
                    value,
                    build: build.clone(),
                },
                None => produced.clone(),
            }
        }
        Produced::Recursive {
            construct,
            args,
            calls,
        } => {
            let (args, calls) = if calls.is_empty() || rng.gen_bool(config.prob_constructor_mutation) {
                (mutate(args, rng, config), calls.clone())
            } else if rng.gen_bool(config.prob_shuffle_and_cut_modifications) {
                let mut calls = calls.clone();
                calls.shuffle(rng);
                let keep = rng.gen_range(1..=calls.len());
                calls.truncate(keep);
                (args.clone(), calls)
            } else {
                let mut calls = calls.clone();
                let i = rng.gen_range(0..calls.len());
                calls[i] = ProducedCall {
                    call: calls[i].call.clone(),
                    args: mutate(&calls[i].args, rng, config),
                };
                (args.clone(), calls)
            };
            Produced::Recursive {
                construct: construct.clone(),
                args,
                calls,
            }
        }
        Produced::Collection {
            construct,
            modify,
            elements,
        } if !elements.is_empty() => {
            let mut elements = elements.clone();
            if rng.gen_bool(config.prob_collection_shuffle) {
                elements.shuffle(rng);
            } else {
                let i = rng.gen_range(0..elements.len());
                elements[i] = mutate(&elements[i], rng, config);
            }
            Produced::Collection {
                construct: construct.clone(),
                modify: modify.clone(),
                elements,
            }
        }
        _ => produced.clone(),
    }
}
