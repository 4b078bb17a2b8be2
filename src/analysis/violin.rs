//! Kernel density profiles for violin plots.

use std::f64::consts::PI;

use crate::analysis::summary::{mean, sample_sd};

#[derive(Debug, Clone, PartialEq)]
pub struct ViolinProfile {
    /// Evaluation points from min to max of the samples.
    pub ys: Vec<f64>,
    /// Density at each point, scaled so the widest point is 1.
    pub widths: Vec<f64>,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

pub fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut v = xs.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    }
}

/// Scott's rule bandwidth: sd * n^(-1/5).
pub fn scott_bandwidth(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    sample_sd(xs) * (xs.len() as f64).powf(-0.2)
}

pub fn gaussian_kde(xs: &[f64], bandwidth: f64, at: f64) -> f64 {
    if xs.is_empty() || bandwidth <= 0.0 {
        return 0.0;
    }
    let norm = 1.0 / (xs.len() as f64 * bandwidth * (2.0 * PI).sqrt());
    xs.iter()
        .map(|x| {
            let u = (at - x) / bandwidth;
            (-0.5 * u * u).exp()
        })
        .sum::<f64>()
        * norm
}

/// `None` when there are no samples. Constant samples collapse to a single
/// full-width point.
pub fn violin_profile(samples: &[f64], points: usize) -> Option<ViolinProfile> {
    if samples.is_empty() {
        return None;
    }
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bw = scott_bandwidth(samples);
    let (ys, mut widths): (Vec<f64>, Vec<f64>) = if bw <= 0.0 || max <= min || points < 2 {
        (vec![min], vec![1.0])
    } else {
        (0..points)
            .map(|i| {
                let y = min + (max - min) * i as f64 / (points - 1) as f64;
                (y, gaussian_kde(samples, bw, y))
            })
            .unzip()
    };
    let peak = widths.iter().copied().fold(0.0f64, f64::max);
    if peak > 0.0 {
        for w in &mut widths {
            *w /= peak;
        }
    }
    Some(ViolinProfile {
        ys,
        widths,
        mean: mean(samples),
        median: median(samples),
        min,
        max,
    })
}
