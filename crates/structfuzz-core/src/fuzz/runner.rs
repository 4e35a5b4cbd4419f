//! Fuzzing execution loop.
//!
//! Each iteration either re-runs a mutated corpus entry or produces a fresh
//! combination, creates its values, hands them to the executor and feeds
//! the returned trace into the coverage trie.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use super::config::FuzzConfig;
use super::mutation::mutate;
use super::produce::{create_all, Producer};
use super::report::{FuzzReport, InterestingCase, StopReason, TraceProfile};
use super::statistic::Corpus;
use crate::description::Description;
use crate::error::Result;
use crate::feedback::{Control, Feedback};
use crate::mutators::MutatorChain;
use crate::provider::ProviderRegistry;
use crate::trie::Trie;

/// Runs one combination of values and reports what happened.
///
/// The receiver, when the description has one, is passed separately from
/// the parameter values.
pub trait Executor<T, R, K> {
    fn execute(&mut self, receiver: Option<&R>, description: &Description<T>, values: &[R]) -> Feedback<K>;
}

impl<T, R, K, F> Executor<T, R, K> for F
where
    F: FnMut(Option<&R>, &Description<T>, &[R]) -> Feedback<K>,
{
    fn execute(&mut self, receiver: Option<&R>, description: &Description<T>, values: &[R]) -> Feedback<K> {
        self(receiver, description, values)
    }
}

/// Drives fuzzing sessions over one provider registry.
pub struct Fuzzer<'a, T, R> {
    registry: &'a ProviderRegistry<T, R>,
    config: FuzzConfig,
    cancel: Option<Arc<AtomicBool>>,
    mutators: Option<MutatorChain<T, R>>,
}

impl<'a, T, R> Fuzzer<'a, T, R>
where
    T: Clone + Eq + Hash + fmt::Display + 'a,
    R: Clone + fmt::Debug + 'a,
{
    pub fn new(registry: &'a ProviderRegistry<T, R>, config: FuzzConfig) -> Self {
        Self {
            registry,
            config,
            cancel: None,
            mutators: None,
        }
    }

    /// End the session at the next iteration once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Apply `mutators` to one created parameter value with
    /// `prob_post_mutation`. Runs changed this way are not stored in the
    /// corpus.
    pub fn with_mutators(mut self, mutators: MutatorChain<T, R>) -> Self {
        self.mutators = Some(mutators);
        self
    }

    pub fn config(&self) -> &FuzzConfig {
        &self.config
    }

    /// Run a session with a fresh coverage trie.
    pub fn run<K, E>(&self, description: &Description<T>, executor: E) -> Result<FuzzReport>
    where
        K: Clone + Eq + Hash,
        E: Executor<T, R, K>,
    {
        let mut trie = Trie::new();
        self.run_with_trie(description, &mut trie, executor)
    }

    /// Run a session that records coverage into `trie`.
    ///
    /// Fails only when the configuration is invalid; everything that goes
    /// wrong during the session ends up in the report.
    pub fn run_with_trie<K, E>(
        &self,
        description: &Description<T>,
        trie: &mut Trie<K>,
        mut executor: E,
    ) -> Result<FuzzReport>
    where
        K: Clone + Eq + Hash,
        E: Executor<T, R, K>,
    {
        self.config.validate()?;
        let config = &self.config;
        let start = Instant::now();
        let types = description.all_types();
        let has_receiver = description.receiver().is_some();

        info!(
            parameters = types.len(),
            seed = config.seed,
            "Starting fuzzing session"
        );

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut producer = Producer::new(self.registry, description, config);
        let mut corpus = Corpus::new(config.minset_size);
        let mut stats = SessionStats::default();
        let mut consecutive_failures = 0u64;

        let stop_reason = loop {
            if types.is_empty() {
                break StopReason::NoParameters;
            }
            if let Some(reason) = self.budget_exhausted(&stats, start) {
                break reason;
            }
            stats.iterations += 1;

            let retrieved = if !corpus.is_empty() && rng.gen_bool(config.prob_seed_retrieving) {
                corpus.pick(&mut rng).map(|node| mutate(node, &mut rng, config))
            } else {
                None
            };
            let node = match retrieved {
                Some(node) => node,
                None => match producer.fuzz_params(&types, &mut rng) {
                    Ok(node) if rng.gen_bool(config.prob_mutation_rate) => mutate(&node, &mut rng, config),
                    Ok(node) => node,
                    Err(failure) => {
                        stats.abandoned += 1;
                        consecutive_failures += 1;
                        trace!(
                            iteration = stats.iterations,
                            slot = failure.index,
                            error = %failure.error,
                            "Combination abandoned"
                        );
                        if producer.is_unproducible(&types[failure.index]) {
                            break StopReason::NoProducibleValue {
                                type_name: types[failure.index].to_string(),
                            };
                        }
                        if consecutive_failures >= config.max_consecutive_failures {
                            break StopReason::TooManyFailures;
                        }
                        continue;
                    }
                },
            };
            consecutive_failures = 0;

            let mut values = create_all(&node);
            let mut post_mutated = false;
            if let Some(mutators) = &self.mutators {
                // mutator indices count parameters only, never the receiver
                let offset = usize::from(has_receiver);
                let parameters = values.len().saturating_sub(offset);
                if parameters > 0 && rng.gen_bool(config.prob_post_mutation) {
                    let index = rng.gen_range(0..parameters);
                    let slot = offset + index;
                    if let Some(value) = mutators.mutate(description, index, &values[slot], &mut rng) {
                        values[slot] = value;
                        post_mutated = true;
                    }
                }
            }

            let (receiver, params) = match values.split_first() {
                Some((first, rest)) if has_receiver => (Some(first), rest),
                _ => (None, values.as_slice()),
            };
            stats.executions += 1;
            let feedback = executor.execute(receiver, description, params);
            trace!(
                iteration = stats.iterations,
                run = stats.executions,
                control = ?feedback.control,
                "Executed"
            );

            let inserted = feedback.trace.as_ref().map(|keys| {
                let inserted = trie.insert(keys.iter().cloned());
                stats.record_trace(keys.len(), &values);
                inserted
            });
            if let Some(inserted) = inserted.filter(|i| i.is_new) {
                stats.new_paths += 1;
                if stats.interesting_cases.len() < config.interesting_cases_limit {
                    stats.interesting_cases.push(InterestingCase {
                        iteration: stats.iterations,
                        run: stats.executions,
                        control: feedback.control,
                        inputs_human: values.iter().map(|v| format!("{v:?}")).collect(),
                        trace_len: trie.trace(inserted.node).len(),
                    });
                }
            }

            match feedback.control {
                Control::Continue => {
                    // the stored tree would not recreate a post-mutated run
                    if let Some(inserted) = inserted.filter(|_| !post_mutated) {
                        corpus.put(inserted.node, node);
                    }
                }
                Control::Pass => stats.passes += 1,
                Control::Timeout => stats.timeouts += 1,
                Control::Stop => break StopReason::ExecutorStop,
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            runs = stats.executions,
            new_paths = stats.new_paths,
            elapsed_ms,
            stop_reason = ?stop_reason,
            "Fuzzing session finished"
        );
        if !producer.missed_types().is_empty() {
            debug!(missed = ?producer.missed_types(), "Types without seeds");
        }

        let trace_profile = TraceProfile::from_values(&mut stats.trace_lengths, stats.longest_input);
        Ok(FuzzReport {
            seed: config.seed,
            iterations: stats.iterations,
            executions: stats.executions,
            abandoned: stats.abandoned,
            new_paths: stats.new_paths,
            timeouts: stats.timeouts,
            passes: stats.passes,
            stop_reason,
            missed_types: producer.missed_types().to_vec(),
            elapsed_ms,
            trie_nodes: trie.len(),
            trace_profile,
            interesting_cases: stats.interesting_cases,
        })
    }

    fn budget_exhausted(&self, stats: &SessionStats, start: Instant) -> Option<StopReason> {
        let config = &self.config;
        if self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Some(StopReason::Cancelled);
        }
        if config.max_iterations.is_some_and(|max| stats.iterations >= max) {
            return Some(StopReason::IterationBudget);
        }
        if config.max_runs.is_some_and(|max| stats.executions >= max) {
            return Some(StopReason::RunBudget);
        }
        if config
            .time_budget_ms
            .is_some_and(|ms| start.elapsed().as_millis() >= u128::from(ms))
        {
            return Some(StopReason::TimeBudget);
        }
        None
    }
}

#[derive(Default)]
struct SessionStats {
    iterations: u64,
    executions: u64,
    abandoned: u64,
    new_paths: u64,
    timeouts: u64,
    passes: u64,
    trace_lengths: Vec<usize>,
    longest: Option<usize>,
    longest_input: Vec<String>,
    interesting_cases: Vec<InterestingCase>,
}

impl SessionStats {
    fn record_trace<R: fmt::Debug>(&mut self, len: usize, values: &[R]) {
        if self.longest.map_or(true, |longest| len > longest) {
            self.longest = Some(len);
            self.longest_input = values.iter().map(|v| format!("{v:?}")).collect();
        }
        self.trace_lengths.push(len);
    }
}

/// Run one session over `registry` with a fresh trie.
pub fn run_fuzzing<T, R, K, E>(
    description: &Description<T>,
    registry: &ProviderRegistry<T, R>,
    config: FuzzConfig,
    executor: E,
) -> Result<FuzzReport>
where
    T: Clone + Eq + Hash + fmt::Display,
    R: Clone + fmt::Debug,
    K: Clone + Eq + Hash,
    E: Executor<T, R, K>,
{
    Fuzzer::new(registry, config).run(description, executor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{SeedIter, ValueProvider};
    use crate::seed::Seed;

    struct Ints;

    impl ValueProvider<&'static str, i32> for Ints {
        fn accept(&self, ty: &&'static str) -> bool {
            *ty == "int"
        }

        fn generate<'a>(
            &'a self,
            _description: &'a Description<&'static str>,
            _ty: &&'static str,
        ) -> SeedIter<'a, &'static str, i32> {
            Box::new((0..10).map(Seed::simple))
        }
    }

    #[test]
    fn test_run_budget() {
        let registry = ProviderRegistry::new().with(Ints);
        let d = Description::new(vec!["int"]);
        let config = FuzzConfig {
            prob_seed_retrieving: 0.0,
            ..FuzzConfig::default().with_max_runs(25)
        };
        let report = Fuzzer::new(&registry, config)
            .run(&d, |_: Option<&i32>, _: &Description<&'static str>, v: &[i32]| {
                Feedback::traced(vec![v[0]])
            })
            .unwrap();
        assert_eq!(report.executions, 25);
        assert_eq!(report.stop_reason, StopReason::RunBudget);
        assert_eq!(report.new_paths, 10);
        assert_eq!(report.trie_nodes, 11);
    }

    #[test]
    fn test_receiver_is_passed_separately() {
        let registry = ProviderRegistry::new().with(Ints);
        let d = Description::new(vec!["int", "int"]).with_receiver("int");
        let mut seen = Vec::new();
        Fuzzer::new(&registry, FuzzConfig::default().with_max_runs(5))
            .run(&d, |receiver: Option<&i32>, _: &Description<&'static str>, v: &[i32]| {
                seen.push((receiver.is_some(), v.len()));
                Feedback::<u8>::proceed()
            })
            .unwrap();
        assert_eq!(seen, vec![(true, 2); 5]);
    }

    #[test]
    fn test_cancel_flag_stops_before_first_run() {
        let registry = ProviderRegistry::new().with(Ints);
        let d = Description::new(vec!["int"]);
        let flag = Arc::new(AtomicBool::new(true));
        let report = Fuzzer::new(&registry, FuzzConfig::default())
            .with_cancel_flag(flag)
            .run(&d, |_: Option<&i32>, _: &Description<&'static str>, _: &[i32]| {
                Feedback::<u8>::proceed()
            })
            .unwrap();
        assert_eq!(report.stop_reason, StopReason::Cancelled);
        assert_eq!(report.executions, 0);
    }

    #[test]
    fn test_timeouts_and_passes_are_counted() {
        let registry = ProviderRegistry::new().with(Ints);
        let d = Description::new(vec!["int"]);
        let report = Fuzzer::new(&registry, FuzzConfig::default().with_max_runs(20))
            .run(&d, |_: Option<&i32>, _: &Description<&'static str>, v: &[i32]| {
                if v[0] % 2 == 0 {
                    Feedback::timeout()
                } else {
                    Feedback::<u8>::pass()
                }
            })
            .unwrap();
        assert_eq!(report.timeouts + report.passes, 20);
        assert!(report.timeouts > 0 && report.passes > 0);
    }

    struct Shift;

    impl crate::mutators::Mutator<&'static str, i32> for Shift {
        fn mutate(
            &self,
            _description: &Description<&'static str>,
            _index: usize,
            value: &i32,
            _rng: &mut dyn rand::RngCore,
        ) -> Option<i32> {
            Some(value + 1000)
        }
    }

    #[test]
    fn test_post_mutation_applies_chain() {
        let registry = ProviderRegistry::new().with(Ints);
        let d = Description::new(vec!["int"]);
        let config = FuzzConfig {
            prob_post_mutation: 1.0,
            ..FuzzConfig::default().with_max_runs(30)
        };
        let mut seen = Vec::new();
        Fuzzer::new(&registry, config)
            .with_mutators(MutatorChain::new().with(Shift))
            .run(&d, |_: Option<&i32>, _: &Description<&'static str>, v: &[i32]| {
                seen.push(v[0]);
                Feedback::<u8>::proceed()
            })
            .unwrap();
        assert_eq!(seen.len(), 30);
        assert!(seen.iter().all(|v| (1000..1010).contains(v)));
    }

    #[test]
    fn test_post_mutated_runs_are_not_stored() {
        let registry = ProviderRegistry::new().with(Ints);
        let d = Description::new(vec!["int"]);
        let config = FuzzConfig {
            prob_post_mutation: 1.0,
            prob_seed_retrieving: 1.0,
            ..FuzzConfig::default().with_max_runs(10)
        };
        let mut seen = Vec::new();
        Fuzzer::new(&registry, config)
            .with_mutators(MutatorChain::new().with(Shift))
            .run(&d, |_: Option<&i32>, _: &Description<&'static str>, v: &[i32]| {
                seen.push(v[0]);
                Feedback::traced(vec![v[0]])
            })
            .unwrap();
        // nothing to retrieve, so every run is a fresh seed
        assert_eq!(seen, (1000..1010).collect::<Vec<_>>());
    }

    struct Recording(std::rc::Rc<std::cell::RefCell<Vec<usize>>>);

    impl crate::mutators::Mutator<&'static str, i32> for Recording {
        fn mutate(
            &self,
            _description: &Description<&'static str>,
            index: usize,
            value: &i32,
            _rng: &mut dyn rand::RngCore,
        ) -> Option<i32> {
            self.0.borrow_mut().push(index);
            Some(value + 1000)
        }
    }

    #[test]
    fn test_post_mutation_skips_receiver() {
        let registry = ProviderRegistry::new().with(Ints);
        let d = Description::new(vec!["int"]).with_receiver("int");
        let config = FuzzConfig {
            prob_post_mutation: 1.0,
            ..FuzzConfig::default().with_max_runs(30)
        };
        let indices = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut seen = Vec::new();
        Fuzzer::new(&registry, config)
            .with_mutators(MutatorChain::new().with(Recording(std::rc::Rc::clone(&indices))))
            .run(&d, |receiver: Option<&i32>, _: &Description<&'static str>, v: &[i32]| {
                seen.push((receiver.copied(), v[0]));
                Feedback::<u8>::proceed()
            })
            .unwrap();
        assert_eq!(seen.len(), 30);
        assert!(seen.iter().all(|(r, v)| matches!(r, Some(0..=9)) && (1000..1010).contains(v)));
        assert_eq!(*indices.borrow(), vec![0; 30]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let registry = ProviderRegistry::new().with(Ints);
        let d = Description::new(vec!["int"]);
        let config = FuzzConfig {
            minset_size: 0,
            ..Default::default()
        };
        let result = Fuzzer::new(&registry, config)
            .run(&d, |_: Option<&i32>, _: &Description<&'static str>, _: &[i32]| {
                Feedback::<u8>::proceed()
            });
        assert!(result.is_err());
    }
}
