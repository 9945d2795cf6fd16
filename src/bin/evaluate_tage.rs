//! Evaluate a [`TAGEPredictor`] against a synthetic stream of branches.
//!
//! usage: evaluate_tage [config.json] [iterations]

use anyhow::Context;
use itertools::*;
use rand::prelude::*;
use std::env;
use std::time::Instant;
use bpred::*;

/// A pre-determined pattern of outcomes associated with a conditional branch.
#[derive(Clone, Copy, Debug, PartialEq)]
enum BranchPattern {
    /// A branch whose outcome is always 'taken'.
    AlwaysTaken,

    /// A branch whose outcome is always 'not-taken'.
    NeverTaken,

    /// A branch whose outcome is only periodically "taken".
    /// Otherwise, the branch is "not-taken" by default.
    TakenPeriodic(usize),

    /// A branch whose outcome is only periodically "not-taken".
    /// Otherwise, the branch is "taken" by default.
    NotTakenPeriodic(usize),

    /// A branch which repeats the outcome of the branch resolved 'n'
    /// branches ago.
    Correlated(usize),

    /// A branch which is taken with some probability.
    Random(f64),
}

struct SyntheticBranch {
    pc: u32,
    pattern: BranchPattern,
    occ: usize,
}
impl SyntheticBranch {
    fn new(pc: u32, pattern: BranchPattern) -> Self {
        Self { pc, pattern, occ: 0 }
    }

    fn resolve(&mut self, ghr: &HistoryRegister, rng: &mut StdRng) -> Outcome {
        let occ = self.occ;
        self.occ += 1;
        match self.pattern {
            BranchPattern::AlwaysTaken => Outcome::T,
            BranchPattern::NeverTaken => Outcome::N,
            BranchPattern::TakenPeriodic(n) => Outcome::from(occ % n == n - 1),
            BranchPattern::NotTakenPeriodic(n) => Outcome::from(occ % n != n - 1),
            BranchPattern::Correlated(n) => Outcome::from(ghr.get(n - 1)),
            BranchPattern::Random(p) => Outcome::from(rng.gen_bool(p)),
        }
    }
}

fn build_workload() -> Vec<SyntheticBranch> {
    vec![
        SyntheticBranch::new(0x0040_1000, BranchPattern::NotTakenPeriodic(8)),
        SyntheticBranch::new(0x0040_1010, BranchPattern::TakenPeriodic(3)),
        SyntheticBranch::new(0x0040_1024, BranchPattern::Correlated(2)),
        SyntheticBranch::new(0x0040_1040, BranchPattern::AlwaysTaken),
        SyntheticBranch::new(0x0040_2000, BranchPattern::NotTakenPeriodic(24)),
        SyntheticBranch::new(0x0040_2008, BranchPattern::Random(0.9)),
        SyntheticBranch::new(0x0040_2010, BranchPattern::Correlated(5)),
        SyntheticBranch::new(0x0040_3000, BranchPattern::NeverTaken),
    ]
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let cfg = match args.get(1) {
        Some(path) => {
            let s = std::fs::read_to_string(path)
                .with_context(|| format!("couldn't read {}", path))?;
            TAGEConfig::from_json(&s)
                .with_context(|| format!("invalid configuration in {}", path))?
        },
        None => TAGEConfig::default(),
    };
    let iterations: usize = match args.get(2) {
        Some(s) => s.parse().context("iterations must be an integer")?,
        None => 100_000,
    };

    println!("[*] TAGE configuration:");
    println!("      Entries (in total): {}", cfg.total_entries());
    println!("        {} entries (base component)", cfg.base.size());
    println!("        {} entries x {} (tagged components)",
        cfg.comp.size(), cfg.num_components()
    );
    println!("      History lengths: {}", cfg.history_lengths.iter().join(", "));
    let storage_bits = cfg.storage_bits();
    println!("      Storage bits: {}b, {:.2}KiB",
        storage_bits, storage_bits as f64 / 1024.0 / 8.0
    );

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut tage = cfg.build()?;
    let mut workload = build_workload();

    // The workload keeps its own copy of global history, which is only used
    // to generate correlated outcomes
    let mut ghr = HistoryRegister::new(64);

    let mut hits = 0;
    let mut brns = 0;
    let start = Instant::now();
    for _ in 0..iterations {
        for branch in workload.iter_mut() {
            let prediction = tage.predict(branch.pc);
            let outcome = branch.resolve(&ghr, &mut rng);
            if prediction == outcome {
                hits += 1;
            }
            brns += 1;
            tage.train(branch.pc, outcome);
            ghr.push(outcome);
        }
    }
    let done = start.elapsed();
    println!("[*] ... simulated in {:.3?}", done);
    println!();

    let hit_rate = hits as f64 / brns as f64;
    println!("[*] Global statistics:");
    println!("      Global hit rate: {}/{} ({:.2}% correct) ({} misses)",
        hits, brns, hit_rate * 100.0, brns - hits
    );
    println!("      Misses per 1000 branches: {:.2}",
        (brns - hits) as f64 * 1000.0 / brns as f64
    );
    println!();

    println!("[*] Per-component statistics:");
    println!("      Base component:");
    println!("        {} misses, {} hits",
        tage.stat.base_miss, tage.stat.base_hits
    );
    for (idx, comp) in tage.comp.iter().enumerate() {
        println!("      Component[{:1}] (GHR[0..{:03}]):", idx, comp.history_len);
        println!("        {} misses, {} hits",
            tage.stat.comp_miss[idx], tage.stat.comp_hits[idx]
        );
        println!("        {:.2}% utilization, {} useful entries",
            comp.utilization(), comp.num_useful_entries()
        );
    }

    let stat = tage.shutdown();
    println!("      {} allocations, {} failed allocations",
        stat.alcs, stat.failed_alcs
    );
    Ok(())
}
