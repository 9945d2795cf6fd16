//! Parameters for building a [`TAGEPredictor`](crate::TAGEPredictor).

use itertools::Itertools;
use rand::{ Rng, SeedableRng };
use rand::rngs::StdRng;
use serde::{ Deserialize, Serialize };

use crate::error::ConfigError;
use crate::history::*;
use crate::predictor::*;

/// Configuration for a [`TAGEBaseComponent`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TAGEBaseConfig {
    /// Number of program counter bits used to index the table
    pub index_bits: usize,

    /// Parameters for the saturating counters
    pub ctr: SaturatingCounterConfig,
}
impl TAGEBaseConfig {
    pub fn size(&self) -> usize { 1 << self.index_bits }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        self.ctr.storage_bits() * self.size()
    }

    /// Use this configuration to create a new [`TAGEBaseComponent`].
    pub fn build(self) -> TAGEBaseComponent {
        TAGEBaseComponent {
            data: vec![self.ctr.build(); self.size()],
            cfg: self,
        }
    }
}
impl Default for TAGEBaseConfig {
    fn default() -> Self {
        Self {
            index_bits: 11,
            ctr: SaturatingCounterConfig { bits: 2, init: 1 },
        }
    }
}

/// Configuration shared by every [`TAGEComponent`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TAGEComponentConfig {
    /// Number of bits used to index the table
    pub index_bits: usize,

    /// Number of tag bits
    pub tag_bits: usize,

    /// Parameters for the prediction counters
    pub ctr: SaturatingCounterConfig,

    /// Parameters for the 'useful' counters
    pub useful: SaturatingCounterConfig,
}
impl TAGEComponentConfig {
    pub fn size(&self) -> usize { 1 << self.index_bits }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        let entry_size = self.ctr.storage_bits()
            + self.useful.storage_bits()
            + self.tag_bits;
        entry_size * self.size()
    }

    /// Use this configuration to create a new [`TAGEComponent`] associated
    /// with the newest 'history_len' bits of global history.
    pub fn build(&self, history_len: usize) -> TAGEComponent {
        let entry = TAGEEntry::new(self.ctr.build(), self.useful.build());
        TAGEComponent {
            cfg: self.clone(),
            data: vec![entry; self.size()],
            history_len,
            csr: [
                FoldedHistoryRegister::new(self.index_bits, history_len),
                FoldedHistoryRegister::new(self.tag_bits, history_len),
                FoldedHistoryRegister::new(self.tag_bits - 1, history_len),
            ],
        }
    }
}
impl Default for TAGEComponentConfig {
    fn default() -> Self {
        Self {
            index_bits: 8,
            tag_bits: 11,
            ctr: SaturatingCounterConfig { bits: 3, init: 4 },
            useful: SaturatingCounterConfig { bits: 2, init: 0 },
        }
    }
}

/// Configuration for a [`TAGEPredictor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TAGEConfig {
    /// Base component configuration
    pub base: TAGEBaseConfig,

    /// Tagged component configuration
    pub comp: TAGEComponentConfig,

    /// History length associated with each tagged component, from shortest
    /// to longest. There is one tagged component per entry.
    pub history_lengths: Vec<usize>,

    /// Seed for the generator used to choose between allocation candidates
    pub seed: u64,
}
impl Default for TAGEConfig {
    fn default() -> Self {
        Self {
            base: TAGEBaseConfig::default(),
            comp: TAGEComponentConfig::default(),
            history_lengths: vec![4, 9, 15, 25, 44, 76, 150],
            seed: 0,
        }
    }
}
impl TAGEConfig {
    /// Allocation draws a random value with one bit per candidate component.
    pub const MAX_COMPONENTS: usize = 32;

    /// Global history is kept as a flat bit vector, 1024 bits at most.
    pub const MAX_HISTORY_LEN: usize = 1024;

    /// Parse a configuration from JSON. Missing fields take default values.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn num_components(&self) -> usize { self.history_lengths.len() }

    /// The longest history length used by any tagged component.
    pub fn max_history_len(&self) -> usize {
        self.history_lengths.iter().copied().max().unwrap_or(0)
    }

    pub fn total_entries(&self) -> usize {
        self.base.size() + self.comp.size() * self.num_components()
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        self.base.storage_bits()
            + self.comp.storage_bits() * self.num_components()
    }

    /// Check that this configuration describes a predictor we can build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let num_comp = self.num_components();
        if num_comp == 0 {
            return Err(ConfigError::NoComponents);
        }
        if num_comp > Self::MAX_COMPONENTS {
            return Err(ConfigError::TooManyComponents(num_comp));
        }
        if self.history_lengths[0] == 0 {
            return Err(ConfigError::ZeroHistoryLength);
        }
        let unordered = self.history_lengths.iter()
            .tuple_windows()
            .find(|(prev, next)| prev >= next);
        if let Some((&prev, &next)) = unordered {
            return Err(ConfigError::HistoryLengthsNotIncreasing { prev, next });
        }
        let max_len = self.max_history_len();
        if max_len > Self::MAX_HISTORY_LEN {
            return Err(ConfigError::HistoryLengthTooLong(max_len));
        }

        for (name, ctr) in [
            ("base", &self.base.ctr),
            ("prediction", &self.comp.ctr),
            ("useful", &self.comp.useful),
        ] {
            if !(1..=8).contains(&ctr.bits) {
                return Err(ConfigError::CounterWidth { name, bits: ctr.bits });
            }
            if !ctr.is_valid() {
                return Err(ConfigError::CounterInit {
                    name, init: ctr.init, bits: ctr.bits
                });
            }
        }

        for (name, bits) in [
            ("base", self.base.index_bits),
            ("tagged", self.comp.index_bits),
        ] {
            if !(1..=24).contains(&bits) {
                return Err(ConfigError::IndexBits { name, bits });
            }
        }
        if !(2..=24).contains(&self.comp.tag_bits) {
            return Err(ConfigError::TagBits(self.comp.tag_bits));
        }
        Ok(())
    }

    /// Use this configuration to create a new [`TAGEPredictor`], seeding the
    /// allocation policy with [`TAGEConfig::seed`].
    pub fn build(self) -> Result<TAGEPredictor<StdRng>, ConfigError> {
        let rng = StdRng::seed_from_u64(self.seed);
        self.build_with_rng(rng)
    }

    /// Use this configuration to create a new [`TAGEPredictor`] which draws
    /// from the provided random number generator.
    pub fn build_with_rng<R: Rng>(self, rng: R)
        -> Result<TAGEPredictor<R>, ConfigError>
    {
        self.validate()?;
        let comp = self.history_lengths.iter()
            .map(|len| self.comp.build(*len))
            .collect::<Vec<TAGEComponent>>();
        let base = self.base.clone().build();
        // One extra bit holds the outcome leaving the longest window
        let ghr = HistoryRegister::new(self.max_history_len() + 1);
        let stat = TAGEStats::new(comp.len());

        log::debug!("Built TAGE predictor: {} tagged components, {} entries, {} storage bits",
            comp.len(), self.total_entries(), self.storage_bits()
        );
        Ok(TAGEPredictor {
            cfg: self,
            stat,
            base,
            comp,
            ghr,
            rng,
        })
    }
}
