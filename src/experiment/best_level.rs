use crate::experiment::trials::TrialDescriptor;
use crate::experiment::variables::Variable;

/// Cumulative rating per level index, kept in first-encounter order.
#[derive(Debug, Clone, Default)]
pub struct BestLevelMap {
    sums: Vec<(usize, u64)>,
}

impl BestLevelMap {
    pub fn record(&mut self, level: usize, rating: u8) {
        match self.sums.iter_mut().find(|(l, _)| *l == level) {
            Some((_, sum)) => *sum += rating as u64,
            None => self.sums.push((level, rating as u64)),
        }
    }

    pub fn sum(&self, level: usize) -> Option<u64> {
        self.sums.iter().find(|(l, _)| *l == level).map(|(_, s)| *s)
    }

    /// Level with the largest sum; the earliest encountered wins ties.
    pub fn best(&self) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for &(level, sum) in &self.sums {
            match best {
                Some((_, top)) if sum <= top => {}
                _ => best = Some((level, sum)),
            }
        }
        best.map(|(level, _)| level)
    }
}

/// Best-level maps for every variable a block varies.
#[derive(Debug, Clone, Default)]
pub struct BlockTally {
    maps: Vec<(Variable, BestLevelMap)>,
}

impl BlockTally {
    pub fn new(varied: &[Variable]) -> Self {
        Self {
            maps: varied
                .iter()
                .map(|&v| (v, BestLevelMap::default()))
                .collect(),
        }
    }

    pub fn record(&mut self, trial: &TrialDescriptor, rating: u8) {
        for (var, map) in &mut self.maps {
            map.record(trial.level(*var), rating);
        }
    }

    pub fn map(&self, var: Variable) -> Option<&BestLevelMap> {
        self.maps.iter().find(|(v, _)| *v == var).map(|(_, m)| m)
    }

    /// Winning level per varied variable; variables with no ratings are
    /// left out.
    pub fn best_levels(&self) -> Vec<(Variable, usize)> {
        self.maps
            .iter()
            .filter_map(|(var, map)| map.best().map(|level| (*var, level)))
            .collect()
    }
}
