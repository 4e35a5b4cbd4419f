//! Minset corpus: a few value trees per coverage node.

use std::collections::{BTreeMap, VecDeque};

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::RngCore;

use super::produce::Produced;
use crate::trie::NodeId;

struct Entry<T, R> {
    hits: u64,
    seeds: VecDeque<Vec<Produced<T, R>>>,
}

/// Stores the trees that reached each trie node, at most `minset_size` per
/// node, dropping the oldest first.
pub struct Corpus<T, R> {
    entries: BTreeMap<NodeId, Entry<T, R>>,
    minset_size: usize,
}

impl<T: Clone, R: Clone> Corpus<T, R> {
    pub fn new(minset_size: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            minset_size,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of nodes with stored trees.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn put(&mut self, node: NodeId, seed: Vec<Produced<T, R>>) {
        let entry = self.entries.entry(node).or_insert_with(|| Entry {
            hits: 0,
            seeds: VecDeque::new(),
        });
        entry.hits += 1;
        entry.seeds.push_back(seed);
        while entry.seeds.len() > self.minset_size {
            entry.seeds.pop_front();
        }
    }

    /// A stored tree, preferring nodes that were reached least often.
    pub fn pick(&self, rng: &mut dyn RngCore) -> Option<&[Produced<T, R>]> {
        let entries: Vec<&Entry<T, R>> = self.entries.values().collect();
        let weights = entries.iter().map(|e| 1.0 / e.hits.max(1) as f64);
        let index = WeightedIndex::new(weights).ok()?.sample(rng);
        entries[index]
            .seeds
            .iter()
            .collect::<Vec<_>>()
            .choose(rng)
            .map(|seed| seed.as_slice())
    }
}
