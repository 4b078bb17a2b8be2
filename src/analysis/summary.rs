//! Descriptive aggregation of ratings per parameter level.

use std::collections::BTreeMap;

use crate::config::AppConfig;
use crate::error::{IllusionError, Result};
use crate::experiment::results::ResultRecord;
use crate::experiment::variables::Variable;

#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    pub level: u32,
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1).
    pub sd: f64,
    pub sem: f64,
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn sum_sq_dev(xs: &[f64]) -> f64 {
    let m = mean(xs);
    xs.iter().map(|x| (x - m) * (x - m)).sum()
}

pub fn sample_sd(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    (sum_sq_dev(xs) / (xs.len() - 1) as f64).sqrt()
}

pub fn population_sd(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    (sum_sq_dev(xs) / xs.len() as f64).sqrt()
}

/// Ratings grouped by the value of `var`, levels ascending.
pub fn ratings_by_level(records: &[ResultRecord], var: Variable) -> Vec<(u32, Vec<f64>)> {
    let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for r in records {
        groups.entry(r.value(var)).or_default().push(r.rating as f64);
    }
    groups.into_iter().collect()
}

pub fn summarize_by_level(records: &[ResultRecord], var: Variable) -> Vec<LevelSummary> {
    ratings_by_level(records, var)
        .into_iter()
        .map(|(level, ratings)| {
            let sd = sample_sd(&ratings);
            let n = ratings.len();
            LevelSummary {
                level,
                n,
                mean: mean(&ratings),
                sd,
                sem: if n > 1 { sd / (n as f64).sqrt() } else { 0.0 },
            }
        })
        .collect()
}

/// Level with the highest mean rating; the lowest such level on ties.
pub fn best_level(summaries: &[LevelSummary]) -> Option<u32> {
    let mut best: Option<&LevelSummary> = None;
    for s in summaries {
        match best {
            Some(b) if s.mean <= b.mean => {}
            _ => best = Some(s),
        }
    }
    best.map(|s| s.level)
}

/// Shape of one block inside a single participant's file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    pub variable: Variable,
    pub levels: usize,
}

impl BlockLayout {
    /// One entry per configured block, in configured order. Every block must
    /// vary a single variable.
    pub fn from_design(cfg: &AppConfig) -> Result<Vec<BlockLayout>> {
        cfg.design
            .block_specs()
            .iter()
            .enumerate()
            .map(|(i, spec)| match spec.varied().as_slice() {
                [variable] => Ok(BlockLayout {
                    variable: *variable,
                    levels: cfg.levels.len(*variable),
                }),
                _ => Err(IllusionError::Layout(format!(
                    "design.blocks[{i}] crosses several variables"
                ))),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockSummary {
    pub variable: Variable,
    pub levels: Vec<u32>,
    pub means: Vec<f64>,
    /// Population SD over repetitions divided by sqrt(repetitions).
    pub errors: Vec<f64>,
}

impl BlockSummary {
    pub fn best(&self) -> Option<u32> {
        let mut best: Option<(u32, f64)> = None;
        for (&level, &m) in self.levels.iter().zip(&self.means) {
            match best {
                Some((_, top)) if m <= top => {}
                _ => best = Some((level, m)),
            }
        }
        best.map(|(level, _)| level)
    }
}

/// Cut a single session's rows into consecutive blocks of
/// `reps * layout.levels` rows and aggregate each by its own variable.
pub fn split_blocks(
    records: &[ResultRecord],
    reps: usize,
    layout: &[BlockLayout],
) -> Result<Vec<BlockSummary>> {
    let needed: usize = layout.iter().map(|b| b.levels * reps).sum();
    if records.len() < needed {
        return Err(IllusionError::EmptyData(format!(
            "layout needs {needed} rows but the data has {}",
            records.len()
        )));
    }
    let mut offset = 0usize;
    let mut out = Vec::with_capacity(layout.len());
    for (i, block) in layout.iter().enumerate() {
        let rows = &records[offset..offset + block.levels * reps];
        offset += rows.len();
        let groups = ratings_by_level(rows, block.variable);
        if groups.len() != block.levels {
            return Err(IllusionError::Layout(format!(
                "block {} ({}) has {} distinct levels, expected {}",
                i + 1,
                block.variable,
                groups.len(),
                block.levels
            )));
        }
        out.push(BlockSummary {
            variable: block.variable,
            levels: groups.iter().map(|(l, _)| *l).collect(),
            means: groups.iter().map(|(_, r)| mean(r)).collect(),
            errors: groups
                .iter()
                .map(|(_, r)| population_sd(r) / (r.len() as f64).sqrt())
                .collect(),
        });
    }
    Ok(out)
}

/// Mean rating over a grid of two variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub x: Variable,
    pub y: Variable,
    pub x_levels: Vec<u32>,
    pub y_levels: Vec<u32>,
    /// `cells[i][j]` belongs to `x_levels[i]`, `y_levels[j]`.
    pub cells: Vec<Vec<Option<f64>>>,
}

impl Surface {
    pub fn at(&self, x_level: u32, y_level: u32) -> Option<f64> {
        let i = self.x_levels.iter().position(|&v| v == x_level)?;
        let j = self.y_levels.iter().position(|&v| v == y_level)?;
        self.cells[i][j]
    }

    pub fn filled_cells(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }
}

pub fn surface(records: &[ResultRecord], x: Variable, y: Variable) -> Surface {
    let mut sums: BTreeMap<(u32, u32), (f64, usize)> = BTreeMap::new();
    for r in records {
        let e = sums.entry((r.value(x), r.value(y))).or_insert((0.0, 0));
        e.0 += r.rating as f64;
        e.1 += 1;
    }
    let mut x_levels: Vec<u32> = sums.keys().map(|(a, _)| *a).collect();
    x_levels.dedup();
    let mut y_levels: Vec<u32> = sums.keys().map(|(_, b)| *b).collect();
    y_levels.sort_unstable();
    y_levels.dedup();
    let cells = x_levels
        .iter()
        .map(|&a| {
            y_levels
                .iter()
                .map(|&b| sums.get(&(a, b)).map(|(s, n)| s / *n as f64))
                .collect()
        })
        .collect();
    Surface {
        x,
        y,
        x_levels,
        y_levels,
        cells,
    }
}
