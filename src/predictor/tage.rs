//! Implementations of a "Tagged GEometric history length" (TAGE) predictor.

pub mod component;
pub mod stat;
pub mod config;

pub use component::*;
pub use stat::*;
pub use config::*;

use rand::Rng;
use rand::rngs::StdRng;

use crate::history::*;
use crate::Outcome;
use crate::predictor::*;

/// Identifies a particular component in a [`TAGEPredictor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TAGEProvider {
    /// The base component
    Base,

    /// A tagged component
    Tagged(usize),
}

/// Container for output from [`TAGEPredictor::lookup`], including the
/// predicted outcome and other metadata about how the prediction was made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TAGEPrediction {
    /// The component providing the prediction
    pub provider: TAGEProvider,

    /// A predicted direction
    pub outcome: Outcome,

    /// The index identifying the entry used to make this prediction
    pub idx: usize,

    /// The tag matching the entry used to make this prediction
    /// (always zero for the base component)
    pub tag: usize,

    /// Alternate component used to provide a prediction
    pub alt_provider: TAGEProvider,

    /// Predicted direction from the alternate component
    pub alt_outcome: Outcome,
}


/// The "TAgged GEometric history length" predictor.
///
/// See the following:
///  - "A case for (partially) TAgged GEometric history length branch prediction"
///  (Seznec, 2006).
///
/// Tagged components are kept in order of increasing history length, so the
/// component with the longest history is always the last one.
///
/// The predictor owns its global history: every call to
/// [`TAGEPredictor::train`] shifts the resolved outcome into global history.
/// Callers are expected to train each branch exactly once, after predicting
/// it and before predicting the next one.
pub struct TAGEPredictor<R = StdRng> {
    /// The configuration used to create this object
    pub cfg: TAGEConfig,

    pub stat: TAGEStats,

    /// Base component
    pub base: TAGEBaseComponent,

    /// Tagged components
    pub comp: Vec<TAGEComponent>,

    /// Global history register
    pub ghr: HistoryRegister,

    /// Source of randomness for choosing between allocation candidates
    rng: R,
}

impl<R: Rng> TAGEPredictor<R> {
    /// Given a program counter value and the provider of an incorrect
    /// prediction, try to allocate a new entry in one of the components with
    /// a longer associated history length.
    ///
    /// When every candidate entry is still marked as useful, nothing is
    /// allocated and the 'useful' counters for all of them are decremented.
    fn alloc(&mut self, pc: u32, provider: TAGEProvider) {
        // Get the indexes of all components whose associated history length
        // is longer than the provider. When the provider is the component
        // with the longest history, there's nowhere to allocate.
        let longer = match provider {
            TAGEProvider::Base => 0..self.comp.len(),
            TAGEProvider::Tagged(idx) => (idx + 1)..self.comp.len(),
        };
        if longer.is_empty() {
            return;
        }

        // A component is only eligible when the entry associated with this
        // program counter has its 'useful' bits set to zero.
        let candidates: Vec<usize> = longer.clone()
            .filter(|&idx| {
                let index = self.comp[idx].get_index(pc);
                self.comp[idx].get_entry(index).is_replaceable()
            })
            .collect();

        if candidates.is_empty() {
            for idx in longer.clone() {
                let index = self.comp[idx].get_index(pc);
                self.comp[idx].get_entry_mut(index).useful.decrement();
            }
            self.stat.failed_alcs += 1;
            log::debug!("pc={:08x}: no free entry, aged components {:?}",
                pc, longer
            );
            return;
        }

        // Walk the candidates from shortest to longest history, consuming
        // one bit of a random value per candidate and stopping on the first
        // zero bit. The value is always less than 2^n - 1 (for n candidates),
        // so one of the low n bits must be zero.
        let mut draw = self.rng.gen_range(0..(1u64 << candidates.len()) - 1);
        let mut selected = None;
        for idx in candidates {
            if draw & 1 == 0 {
                selected = Some(idx);
                break;
            }
            draw >>= 1;
        }
        let Some(idx) = selected else {
            unreachable!("allocation draw selected no candidate");
        };

        let comp = &mut self.comp[idx];
        let new_index = comp.get_index(pc);
        let new_tag = comp.get_tag(pc);
        comp.get_entry_mut(new_index).allocate(new_tag);
        self.stat.alcs += 1;
        log::trace!("pc={:08x}: allocated comp{}[{:#x}] tag={:#x}",
            pc, idx, new_index, new_tag
        );
    }

    /// Shift an outcome into global history, and then use global history to
    /// update the folded history registers in each tagged component.
    fn update_history(&mut self, outcome: Outcome) {
        self.ghr.push(outcome);
        for comp in self.comp.iter_mut() {
            comp.update_history(&self.ghr);
        }
    }
}

/// The public interface to a [`TAGEPredictor`].
impl<R: Rng> TAGEPredictor<R> {
    /// Return the number of tagged components.
    pub fn num_tagged_components(&self) -> usize {
        self.comp.len()
    }

    /// Return the index of the tagged component with the longest associated
    /// history length.
    pub fn longest_tagged_component(&self) -> usize {
        self.num_tagged_components() - 1
    }

    /// Make a prediction for the branch at 'pc', recording which components
    /// were involved.
    pub fn lookup(&self, pc: u32) -> TAGEPrediction {
        // The base component provides the default predicted outcome
        // for cases where we miss in all tagged components
        let base_idx = self.base.get_index(pc);
        let default_outcome = self.base.get_entry(base_idx).predict();
        let mut result = TAGEPrediction {
            provider: TAGEProvider::Base,
            outcome: default_outcome,
            idx: base_idx,
            tag: 0,
            alt_provider: TAGEProvider::Base,
            alt_outcome: default_outcome,
        };

        // Find the two longest-length tagged components that yield a match
        let mut hits = self.comp.iter().enumerate().rev()
            .filter_map(|(comp_idx, comp)| {
                let index = comp.get_index(pc);
                let tag = comp.get_tag(pc);
                let entry = comp.get_entry(index);
                entry.tag_matches(tag)
                    .then(|| (comp_idx, index, tag, entry.predict()))
            });

        if let Some((comp_idx, index, tag, outcome)) = hits.next() {
            result.provider = TAGEProvider::Tagged(comp_idx);
            result.outcome = outcome;
            result.idx = index;
            result.tag = tag;
            if let Some((alt_idx, _, _, alt_outcome)) = hits.next() {
                result.alt_provider = TAGEProvider::Tagged(alt_idx);
                result.alt_outcome = alt_outcome;
            }
        }
        result
    }

    /// Return the predicted outcome for the branch at 'pc'.
    pub fn predict(&self, pc: u32) -> Outcome {
        self.lookup(pc).outcome
    }

    /// Given the resolved outcome for the branch at 'pc', update the state
    /// of the predictor and global history.
    pub fn train(&mut self, pc: u32, outcome: Outcome) {
        let prediction = self.lookup(pc);
        let misprediction = prediction.outcome != outcome;

        // Update the entry in the component that provided the prediction
        match prediction.provider {
            TAGEProvider::Base => {
                self.base.get_entry_mut(prediction.idx).update(outcome);
                if misprediction {
                    self.stat.base_miss += 1;
                } else {
                    self.stat.base_hits += 1;
                }
            },
            TAGEProvider::Tagged(idx) => {
                let entry = self.comp[idx].get_entry_mut(prediction.idx);

                // The 'useful' counter only moves when the alternate
                // prediction disagrees with the provider
                if prediction.alt_outcome != prediction.outcome {
                    if misprediction {
                        entry.useful.decrement();
                    } else {
                        entry.useful.increment();
                    }
                }
                entry.ctr.update(outcome);

                if misprediction {
                    self.stat.comp_miss[idx] += 1;
                } else {
                    self.stat.comp_hits[idx] += 1;
                }
            },
        }

        if misprediction {
            self.alloc(pc, prediction.provider);
        }

        self.update_history(outcome);
        self.stat.clk += 1;
    }

    /// Tear down the predictor, returning the statistics it collected.
    pub fn shutdown(self) -> TAGEStats {
        log::info!("TAGE shutdown after {} updates: {} hits, {} misses, \
            {} allocations, {} failed allocations",
            self.stat.clk, self.stat.hits(), self.stat.misses(),
            self.stat.alcs, self.stat.failed_alcs
        );
        self.stat
    }
}

impl<R: Rng> BranchPredictor for TAGEPredictor<R> {
    fn name(&self) -> &'static str { "TAGEPredictor" }

    fn predict(&self, pc: u32) -> Outcome {
        TAGEPredictor::predict(self, pc)
    }

    fn train(&mut self, pc: u32, outcome: Outcome) {
        TAGEPredictor::train(self, pc, outcome)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::mock::StepRng;

    const PC: u32 = 0x1000;

    fn build() -> TAGEPredictor {
        TAGEConfig::default().build().unwrap()
    }

    /// Index and tag for every tagged component, using the current history.
    fn resolve<R: Rng>(tage: &TAGEPredictor<R>, pc: u32) -> Vec<(usize, usize)> {
        tage.comp.iter().map(|c| (c.get_index(pc), c.get_tag(pc))).collect()
    }

    /// Force an entry to hit for 'pc' with the given counter value.
    fn plant<R: Rng>(tage: &mut TAGEPredictor<R>, comp: usize, pc: u32, ctr: u8) {
        let (index, tag) = resolve(tage, pc)[comp];
        let entry = tage.comp[comp].get_entry_mut(index);
        entry.tag = Some(tag);
        entry.ctr.set(ctr);
    }

    #[test]
    fn fresh_predictor_uses_base() {
        let mut tage = build();
        let p = tage.lookup(PC);
        assert_eq!(p.provider, TAGEProvider::Base);
        assert_eq!(p.outcome, Outcome::N);
        assert_eq!(tage.predict(PC), Outcome::N);

        for _ in 0..3 {
            tage.train(PC, Outcome::T);
        }
        assert_eq!(tage.predict(PC), Outcome::T);
        assert_eq!(tage.base.get_entry(tage.base.get_index(PC)).value(), 3);
        assert_eq!(tage.stat.clk, 3);
    }

    #[test]
    fn predict_has_no_side_effects() {
        let mut tage = build();
        tage.train(PC, Outcome::T);
        let first = tage.lookup(PC);
        for _ in 0..4 {
            assert_eq!(tage.lookup(PC), first);
        }
        assert_eq!(tage.stat.clk, 1);
    }

    #[test]
    fn deterministic_for_a_fixed_seed() {
        let run = |seed: u64| -> Vec<Outcome> {
            let mut cfg = TAGEConfig::default();
            cfg.seed = seed;
            let mut tage = cfg.build().unwrap();
            let mut trace_rng = StdRng::seed_from_u64(1234);
            let mut res = Vec::new();
            for _ in 0..5000 {
                let pc = 0x4000 + 4 * trace_rng.gen_range(0..64u32);
                let outcome = Outcome::from(trace_rng.gen_bool(0.7));
                res.push(tage.predict(pc));
                tage.train(pc, outcome);
            }
            res
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn folded_history_matches_recomputed_fold() {
        let mut tage = build();
        let mut rng = StdRng::seed_from_u64(99);
        for n in 1..=256 {
            let pc = rng.gen::<u32>();
            tage.train(pc, rng.gen::<bool>().into());
            for comp in tage.comp.iter() {
                for csr in comp.csr.iter() {
                    let len = csr.history_len();
                    let width = csr.output_size();
                    assert_eq!(csr.output_usize(), tage.ghr.fold(0..=len-1, width),
                        "n={} len={} width={}", n, len, width);
                }
            }
        }
    }

    #[test]
    fn longest_match_provides() {
        let mut tage = build();
        let l15 = tage.cfg.history_lengths.iter().position(|l| *l == 15).unwrap();
        let l44 = tage.cfg.history_lengths.iter().position(|l| *l == 44).unwrap();

        plant(&mut tage, l15, PC, 0);
        plant(&mut tage, l44, PC, 7);
        let p = tage.lookup(PC);
        assert_eq!(p.provider, TAGEProvider::Tagged(l44));
        assert_eq!(p.alt_provider, TAGEProvider::Tagged(l15));
        assert_eq!(p.outcome, Outcome::T);
        assert_eq!(p.alt_outcome, Outcome::N);

        plant(&mut tage, l15, PC, 7);
        plant(&mut tage, l44, PC, 0);
        assert_eq!(tage.predict(PC), Outcome::N);
    }

    #[test]
    fn useful_moves_when_alternate_disagrees() {
        let mut tage = build();
        plant(&mut tage, 2, PC, 0);
        plant(&mut tage, 4, PC, 7);
        let (index, _) = resolve(&tage, PC)[4];
        tage.train(PC, Outcome::T);
        assert_eq!(tage.comp[4].data[index].useful.value(), 1);
        assert_eq!(tage.comp[4].data[index].ctr.value(), 7);
        assert_eq!(tage.stat.comp_hits[4], 1);

        let mut tage = build();
        plant(&mut tage, 2, PC, 0);
        plant(&mut tage, 4, PC, 7);
        let (index, _) = resolve(&tage, PC)[4];
        tage.comp[4].data[index].useful.set(2);
        tage.train(PC, Outcome::N);
        assert_eq!(tage.comp[4].data[index].useful.value(), 1);
        assert_eq!(tage.comp[4].data[index].ctr.value(), 6);
        assert_eq!(tage.stat.comp_miss[4], 1);
    }

    #[test]
    fn useful_holds_when_alternate_agrees() {
        let mut tage = build();
        // The alternate is the base component, which predicts 'not-taken'
        plant(&mut tage, 3, PC, 0);
        let (index, _) = resolve(&tage, PC)[3];
        tage.train(PC, Outcome::N);
        assert_eq!(tage.comp[3].data[index].useful.value(), 0);
        assert_eq!(tage.comp[3].data[index].ctr.value(), 0);
    }

    #[test]
    fn misprediction_allocates_in_longer_component() {
        let mut tage = build();
        plant(&mut tage, 2, PC, 0);
        let before = resolve(&tage, PC);
        tage.train(PC, Outcome::T);
        assert_eq!(tage.stat.alcs, 1);
        assert_eq!(tage.stat.failed_alcs, 0);

        let allocated: Vec<usize> = (0..tage.comp.len())
            .filter(|&c| c != 2)
            .filter(|&c| {
                let (index, tag) = before[c];
                tage.comp[c].data[index].tag == Some(tag)
            })
            .collect();
        assert_eq!(allocated.len(), 1);
        let c = allocated[0];
        assert!(c > 2);
        assert_eq!(tage.comp[c].data[before[c].0].ctr.value(), 4);
        assert_eq!(tage.comp[c].data[before[c].0].useful.value(), 0);
    }

    /// Build a predictor whose allocation draw is always 'draw' when choosing
    /// between 'candidates' components.
    ///
    /// [`StepRng`] yields the same word every time, and the integer sampler
    /// maps a word 'v' onto `(v * range) >> 64`, so we pick the smallest word
    /// landing on 'draw'.
    fn build_with_draw(draw: u64, candidates: u32) -> TAGEPredictor<StepRng> {
        let range = (1u128 << candidates) - 1;
        assert!((draw as u128) < range);
        let word = (((draw as u128) << 64) + range - 1) / range;
        TAGEConfig::default()
            .build_with_rng(StepRng::new(word as u64, 0))
            .unwrap()
    }

    /// Mispredict 'PC' in the base component, and return the tagged
    /// components that were allocated.
    fn allocate_from_base<R: Rng>(tage: &mut TAGEPredictor<R>) -> Vec<usize> {
        let before = resolve(tage, PC);
        assert_eq!(tage.lookup(PC).provider, TAGEProvider::Base);
        tage.train(PC, Outcome::T);
        (0..tage.comp.len())
            .filter(|&c| {
                let (index, tag) = before[c];
                tage.comp[c].data[index].tag == Some(tag)
            })
            .collect()
    }

    #[test]
    fn allocation_walks_from_shortest_history() {
        // Every tagged component is a candidate
        let n = TAGEConfig::default().num_components() as u32;
        for (draw, expected) in [(0b0, 0), (0b01, 1), (0b011, 2), (0b0111, 3)] {
            let mut tage = build_with_draw(draw, n);
            assert_eq!(allocate_from_base(&mut tage), vec![expected],
                "draw={:#b}", draw);
            assert_eq!(tage.stat.alcs, 1);
        }

        // Only the lowest zero bit matters
        let mut tage = build_with_draw(0b1010, n);
        assert_eq!(allocate_from_base(&mut tage), vec![0]);
        let mut tage = build_with_draw(0b0101, n);
        assert_eq!(allocate_from_base(&mut tage), vec![1]);

        // All but the last candidate skipped
        let last = n as usize - 1;
        let mut tage = build_with_draw((1 << last) - 1, n);
        assert_eq!(allocate_from_base(&mut tage), vec![last]);
    }

    #[test]
    fn useful_entries_do_not_consume_draw_bits() {
        // Component 1 is still useful, so the candidates are 0, 2, 3, ...
        let n = TAGEConfig::default().num_components() as u32 - 1;
        for (draw, expected) in [(0b0, 0), (0b01, 2), (0b101, 2), (0b011, 3)] {
            let mut tage = build_with_draw(draw, n);
            let (index, _) = resolve(&tage, PC)[1];
            tage.comp[1].data[index].useful.set(1);

            assert_eq!(allocate_from_base(&mut tage), vec![expected],
                "draw={:#b}", draw);
            assert_eq!(tage.comp[1].data[index].useful.value(), 1);
            assert_eq!(tage.comp[1].data[index].tag, None);
        }
    }

    #[test]
    fn saturated_components_are_aged() {
        let mut tage = build();
        plant(&mut tage, 2, PC, 0);
        let before = resolve(&tage, PC);
        for c in 3..tage.comp.len() {
            tage.comp[c].data[before[c].0].useful.set(3);
        }

        tage.train(PC, Outcome::T);
        assert_eq!(tage.stat.alcs, 0);
        assert_eq!(tage.stat.failed_alcs, 1);

        let provider = &tage.comp[2].data[before[2].0];
        assert_eq!(provider.tag, Some(before[2].1));
        assert_eq!(provider.ctr.value(), 1);
        assert_eq!(provider.useful.value(), 0);
        for c in 3..tage.comp.len() {
            let entry = &tage.comp[c].data[before[c].0];
            assert_eq!(entry.useful.value(), 2);
            assert_eq!(entry.tag, None);
        }
    }

    #[test]
    fn longest_provider_never_allocates() {
        let mut tage = build();
        let longest = tage.longest_tagged_component();
        plant(&mut tage, longest, PC, 0);
        tage.train(PC, Outcome::T);
        assert_eq!(tage.stat.alcs, 0);
        assert_eq!(tage.stat.failed_alcs, 0);
        assert_eq!(tage.stat.comp_miss[longest], 1);
    }

    #[test]
    fn allocation_never_targets_a_useful_entry() {
        let mut cfg = TAGEConfig::default();
        cfg.comp.index_bits = 4;
        cfg.seed = 7;
        let mut tage = cfg.build().unwrap();
        let mut rng = StdRng::seed_from_u64(0xa110c);
        for _ in 0..20_000 {
            let pc = 0x8000 + 4 * rng.gen_range(0..512u32);
            let outcome = Outcome::from(rng.gen_bool(0.5));
            let before: Vec<Vec<TAGEEntry>> = tage.comp.iter()
                .map(|c| c.data.clone())
                .collect();

            tage.predict(pc);
            tage.train(pc, outcome);

            for (old, new) in before.iter().zip(tage.comp.iter()) {
                for (o, n) in old.iter().zip(new.data.iter()) {
                    if o.tag != n.tag {
                        assert!(o.is_replaceable());
                    }
                }
            }
        }
        assert!(tage.stat.alcs > 0);
    }

    #[test]
    fn learns_a_periodic_branch() {
        let mut tage = build();
        let pattern = [Outcome::T, Outcome::T, Outcome::T, Outcome::N];
        let mut hits = 0;
        for i in 0..4000 {
            let outcome = pattern[i % pattern.len()];
            if tage.predict(PC) == outcome && i >= 3000 {
                hits += 1;
            }
            tage.train(PC, outcome);
        }
        assert!(hits >= 950, "only {} hits", hits);
    }

    #[test]
    fn independent_instances() {
        let mut a = build();
        let b = build();
        for _ in 0..8 {
            a.train(PC, Outcome::T);
        }
        assert_eq!(a.predict(PC), Outcome::T);
        assert_eq!(b.predict(PC), Outcome::N);
        assert_eq!(b.stat.clk, 0);
    }

    #[test]
    fn usable_through_trait_object() {
        let mut p: Box<dyn BranchPredictor> = Box::new(build());
        assert_eq!(p.name(), "TAGEPredictor");
        p.train(PC, Outcome::T);
        assert_eq!(p.predict(PC), Outcome::T);
    }

    #[test]
    fn shutdown_returns_stats() {
        let mut tage = build();
        tage.train(PC, Outcome::T);
        tage.train(PC, Outcome::T);
        let stat = tage.shutdown();
        assert_eq!(stat.clk, 2);
        assert_eq!(stat.hits() + stat.misses(), 2);
    }
}
