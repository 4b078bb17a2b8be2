use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::experiment::variables::{LevelTables, StimulusParams, Variable};

/// Indices into the four level tables, ordered as `Variable::ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrialDescriptor {
    pub levels: [usize; 4],
}

impl TrialDescriptor {
    pub fn level(&self, var: Variable) -> usize {
        self.levels[var.index()]
    }

    pub fn params(&self, tables: &LevelTables) -> StimulusParams {
        StimulusParams::from_indices(tables, &self.levels)
    }
}

/// One block of the design: the variables it crosses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub vary: Vec<Variable>,
}

impl BlockSpec {
    /// Varied variables without duplicates, in declaration order.
    pub fn varied(&self) -> Vec<Variable> {
        let mut out: Vec<Variable> = Vec::with_capacity(self.vary.len());
        for &v in &self.vary {
            if !out.contains(&v) {
                out.push(v);
            }
        }
        out
    }
}

/// Full factorial over `vary`; every other variable stays at `fixed`.
/// The first varied variable changes slowest.
pub fn combinations(
    vary: &[Variable],
    tables: &LevelTables,
    fixed: [usize; 4],
) -> Vec<TrialDescriptor> {
    let mut out = vec![TrialDescriptor { levels: fixed }];
    for &var in vary {
        let n = tables.len(var);
        let mut next = Vec::with_capacity(out.len() * n);
        for base in &out {
            for level in 0..n {
                let mut d = *base;
                d.levels[var.index()] = level;
                next.push(d);
            }
        }
        out = next;
    }
    out
}

/// `reps` independently shuffled series of `combos`, concatenated.
///
/// A series never opens with the trial that closed the previous one unless
/// there is only a single combination.
pub fn shuffled_series<R: Rng + ?Sized>(
    combos: &[TrialDescriptor],
    reps: usize,
    rng: &mut R,
) -> Vec<TrialDescriptor> {
    let mut out: Vec<TrialDescriptor> = Vec::with_capacity(combos.len() * reps);
    for _ in 0..reps {
        let mut series = combos.to_vec();
        series.shuffle(rng);
        if let Some(prev) = out.last()
            && series.len() > 1
            && series[0] == *prev
        {
            let j = rng.random_range(1..series.len());
            series.swap(0, j);
        }
        out.extend(series);
    }
    out
}

/// First `n` trials of back-to-back shuffles of `combos`.
pub fn practice_series<R: Rng + ?Sized>(
    combos: &[TrialDescriptor],
    n: usize,
    rng: &mut R,
) -> Vec<TrialDescriptor> {
    if combos.is_empty() || n == 0 {
        return Vec::new();
    }
    let reps = n.div_ceil(combos.len());
    let mut out = shuffled_series(combos, reps, rng);
    out.truncate(n);
    out
}

/// How the block order differs between participants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counterbalance {
    /// Configured order for everyone.
    #[default]
    Fixed,
    /// Configured order rotated by the participant number.
    Rotate,
    /// Random order per session.
    Shuffle,
}

pub fn block_order<R: Rng + ?Sized>(
    n_blocks: usize,
    scheme: Counterbalance,
    participant: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n_blocks).collect();
    if n_blocks == 0 {
        return order;
    }
    match scheme {
        Counterbalance::Fixed => {}
        Counterbalance::Rotate => order.rotate_left(participant % n_blocks),
        Counterbalance::Shuffle => order.shuffle(rng),
    }
    order
}

/// Trials of one sub-phase, consumed front to back.
#[derive(Debug, Clone, Default)]
pub struct TrialQueue {
    trials: Vec<TrialDescriptor>,
    cursor: usize,
}

impl TrialQueue {
    pub fn new(trials: Vec<TrialDescriptor>) -> Self {
        Self { trials, cursor: 0 }
    }

    pub fn current(&self) -> Option<&TrialDescriptor> {
        self.trials.get(self.cursor)
    }

    /// Move past the current trial. Returns `true` while trials remain.
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.trials.len() {
            self.cursor += 1;
        }
        self.cursor < self.trials.len()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn factorial_covers_every_pair_once() {
        let tables = LevelTables::default();
        let combos = combinations(
            &[Variable::LineLength, Variable::StimRadius],
            &tables,
            [2, 3, 2, 2],
        );
        assert_eq!(combos.len(), 25);
        for a in 0..5 {
            for b in 0..5 {
                let n = combos
                    .iter()
                    .filter(|d| d.level(Variable::LineLength) == a && d.level(Variable::StimRadius) == b)
                    .count();
                assert_eq!(n, 1);
            }
        }
        assert!(combos.iter().all(|d| d.level(Variable::LineAngle) == 3));
        assert!(combos.iter().all(|d| d.level(Variable::StimPeriod) == 2));
    }

    #[test]
    fn duplicate_varied_variables_collapse() {
        let spec = BlockSpec {
            vary: vec![Variable::LineAngle, Variable::LineAngle],
        };
        assert_eq!(spec.varied(), vec![Variable::LineAngle]);
    }

    #[test]
    fn series_boundaries_do_not_repeat() {
        let tables = LevelTables::default();
        let combos = combinations(&[Variable::StimPeriod], &tables, [0; 4]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let trials = shuffled_series(&combos, 6, &mut rng);
            for w in trials.windows(2) {
                assert_ne!(w[0], w[1], "seed {seed}");
            }
        }
    }

    #[test]
    fn single_combination_repeats_without_looping() {
        let combos = vec![TrialDescriptor { levels: [0; 4] }];
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(shuffled_series(&combos, 4, &mut rng).len(), 4);
    }

    #[test]
    fn practice_wraps_past_one_series() {
        let tables = LevelTables::default();
        let combos = combinations(&[Variable::LineLength], &tables, [0; 4]);
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(practice_series(&combos, 3, &mut rng).len(), 3);
        assert_eq!(practice_series(&combos, 12, &mut rng).len(), 12);
        assert!(practice_series(&combos, 0, &mut rng).is_empty());
    }

    #[test]
    fn rotation_follows_participant_number() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(block_order(4, Counterbalance::Fixed, 3, &mut rng), vec![0, 1, 2, 3]);
        assert_eq!(block_order(4, Counterbalance::Rotate, 1, &mut rng), vec![1, 2, 3, 0]);
        assert_eq!(block_order(4, Counterbalance::Rotate, 6, &mut rng), vec![2, 3, 0, 1]);
        let mut shuffled = block_order(4, Counterbalance::Shuffle, 0, &mut rng);
        shuffled.sort_unstable();
        assert_eq!(shuffled, vec![0, 1, 2, 3]);
    }

    #[test]
    fn queue_walks_to_exhaustion() {
        let d = |i| TrialDescriptor { levels: [i, 0, 0, 0] };
        let mut q = TrialQueue::new(vec![d(0), d(1)]);
        assert_eq!(q.current(), Some(&d(0)));
        assert!(q.advance());
        assert_eq!(q.current(), Some(&d(1)));
        assert!(!q.advance());
        assert!(q.current().is_none());
        assert!(!q.advance());
        assert_eq!(q.position(), 2);
    }
}
