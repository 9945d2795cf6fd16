/// Container for [`TAGEPredictor`](crate::TAGEPredictor) runtime stats.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TAGEStats {
    /// Successful allocations
    pub alcs: usize,

    /// Failed allocations (each one causes the 'useful' counters in longer
    /// components to be aged)
    pub failed_alcs: usize,

    /// Correct predictions provided by the base component
    pub base_hits: usize,

    /// Misses in the base component
    pub base_miss: usize,

    /// Correct predictions provided by each tagged component
    pub comp_hits: Vec<usize>,

    /// Misses in the tagged components
    pub comp_miss: Vec<usize>,

    /// Number of updates
    pub clk: usize,
}
impl TAGEStats {
    pub fn new(num_comp: usize) -> Self {
        Self {
            comp_hits: vec![0; num_comp],
            comp_miss: vec![0; num_comp],
            ..Default::default()
        }
    }

    /// Total number of mispredictions.
    pub fn misses(&self) -> usize {
        self.base_miss + self.comp_miss.iter().sum::<usize>()
    }

    /// Total number of correct predictions.
    pub fn hits(&self) -> usize {
        self.base_hits + self.comp_hits.iter().sum::<usize>()
    }
}
