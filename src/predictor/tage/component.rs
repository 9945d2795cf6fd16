//! Tables making up a [`TAGEPredictor`](crate::TAGEPredictor).

use crate::Outcome;
use crate::history::*;
use crate::predictor::*;

/// A base component in the TAGE predictor.
///
/// This is an untagged table of counters indexed directly by the program
/// counter. It always provides a prediction.
#[derive(Clone, Debug)]
pub struct TAGEBaseComponent {
    pub cfg: TAGEBaseConfig,

    /// A table of saturating counters
    pub data: Vec<SaturatingCounter>,
}

impl PredictorTable for TAGEBaseComponent {
    type Entry = SaturatingCounter;

    fn size(&self) -> usize { self.data.len() }

    fn get_index(&self, pc: u32) -> usize {
        pc as usize & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &SaturatingCounter {
        let index = idx & self.index_mask();
        &self.data[index]
    }
    fn get_entry_mut(&mut self, idx: usize) -> &mut SaturatingCounter {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}

/// An entry in some [TAGEComponent].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TAGEEntry {
    /// State machine tracking a branch outcome
    pub ctr: SaturatingCounter,

    /// The 'useful' counter, used to determine when the entry is
    /// eligible to be replaced
    pub useful: SaturatingCounter,

    /// Tag associated with this entry, or [None] if the entry has never
    /// been allocated
    pub tag: Option<usize>,
}
impl TAGEEntry {
    pub fn new(ctr: SaturatingCounter, useful: SaturatingCounter) -> Self {
        Self { ctr, useful, tag: None }
    }

    /// Get the current predicted outcome.
    pub fn predict(&self) -> Outcome {
        self.ctr.predict()
    }

    /// Returns true if the provided tag matches this entry.
    pub fn tag_matches(&self, tag: usize) -> bool {
        self.tag == Some(tag)
    }

    /// Returns true if this entry may be replaced by a new allocation.
    pub fn is_replaceable(&self) -> bool {
        self.useful.value() == 0
    }

    /// Replace the contents of this entry with a newly-allocated branch.
    /// The prediction starts out in the weakly-taken state, and the 'useful'
    /// counter is left alone.
    pub fn allocate(&mut self, tag: usize) {
        self.ctr.set(self.ctr.midpoint());
        self.tag = Some(tag);
    }
}

/// A tagged component in the TAGE predictor.
#[derive(Clone, Debug)]
pub struct TAGEComponent {
    pub cfg: TAGEComponentConfig,

    /// Table of entries
    pub data: Vec<TAGEEntry>,

    /// Number of global history bits associated with this component
    pub history_len: usize,

    /// Folded global history used to form the index [0], and the two
    /// halves of the tag [1] and [2]
    pub csr: [FoldedHistoryRegister; 3],
}
impl TAGEComponent {
    pub fn tag_mask(&self) -> usize {
        (1 << self.cfg.tag_bits) - 1
    }

    /// Return the number of entries with a nonzero 'useful' counter.
    pub fn num_useful_entries(&self) -> usize {
        self.data.iter().filter(|e| !e.is_replaceable()).count()
    }

    /// Calculate what percentage of entries have been allocated.
    pub fn utilization(&self) -> f64 {
        let used = self.data.iter().filter(|e| e.tag.is_some()).count();
        used as f64 / self.data.len() as f64 * 100.0
    }

    /// Using some [HistoryRegister], update all of the folded history
    /// registers in this component.
    pub fn update_history(&mut self, ghr: &HistoryRegister) {
        for csr in self.csr.iter_mut() {
            csr.update(ghr);
        }
    }
}

impl PredictorTable for TAGEComponent {
    type Entry = TAGEEntry;

    fn size(&self) -> usize { self.data.len() }

    // NOTE: The program counter is 32 bits wide, so shifting by any history
    // length past that leaves nothing.
    fn get_index(&self, pc: u32) -> usize {
        let shifted = pc.checked_shr(self.history_len as u32).unwrap_or(0);
        let ghist_bits = self.csr[0].output_usize();
        (shifted as usize ^ pc as usize ^ ghist_bits) & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &TAGEEntry {
        let index = idx & self.index_mask();
        &self.data[index]
    }
    fn get_entry_mut(&mut self, idx: usize) -> &mut TAGEEntry {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}

impl TaggedPredictorTable for TAGEComponent {
    fn get_tag(&self, pc: u32) -> usize {
        let ghist0_bits = self.csr[1].output_usize();
        let ghist1_bits = self.csr[2].output_usize() << 1;
        (pc as usize ^ ghist0_bits ^ ghist1_bits) & self.tag_mask()
    }
}
