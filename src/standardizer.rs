//! Per-task standardization
//!
//! Every metric is turned into a z-score against the athletes who attempted
//! the same task in the same module. A group with no spread (all values equal,
//! a single member under sample dispersion, or no members) standardizes to
//! exactly 0 so no NaN can reach the composite.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// Threshold below which a standard deviation is treated as zero
const STDEV_EPSILON: f64 = 1e-12;

/// Denominator used for the standard deviation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dispersion {
    /// Divide by N: the group is the whole comparison population
    #[default]
    Population,
    /// Divide by N - 1
    Sample,
}

/// Mean and standard deviation of one comparison group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationStats {
    pub mean: f64,
    pub stdev: f64,
    pub count: usize,
}

impl PopulationStats {
    /// Compute stats over `values`; empty input gives mean 0 and stdev 0
    pub fn compute(values: &[f64], dispersion: Dispersion) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                mean: 0.0,
                stdev: 0.0,
                count,
            };
        }

        let n = count as f64;
        let mean = values.iter().sum::<f64>() / n;
        let sum_sq = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        let denom = match dispersion {
            Dispersion::Population => n,
            Dispersion::Sample => n - 1.0,
        };
        let stdev = if denom > 0.0 { (sum_sq / denom).sqrt() } else { 0.0 };

        Self { mean, stdev, count }
    }

    /// True when every z-score of this group collapses to 0
    pub fn is_degenerate(&self) -> bool {
        !(self.stdev.is_finite() && self.stdev > STDEV_EPSILON)
    }

    /// z-score of `value` within this group
    pub fn z_score(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        (value - self.mean) / self.stdev
    }
}

/// Standardize a whole group
pub fn standardize(values: &[f64], dispersion: Dispersion) -> Vec<f64> {
    let stats = PopulationStats::compute(values, dispersion);
    values.iter().map(|v| stats.z_score(*v)).collect()
}

/// Result of a grouped standardization
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedZScores {
    /// One z-score per input position; 0.0 where the input value was missing
    pub z: Vec<f64>,
    /// Number of groups whose spread was zero
    pub degenerate_groups: usize,
}

/// Standardize `values` within groups sharing the same key.
///
/// Missing values (`None`) neither join their group's population nor receive
/// a non-zero score. Groups are evaluated in first-appearance order.
pub fn standardize_by_group<K>(keys: &[K], values: &[Option<f64>], dispersion: Dispersion) -> GroupedZScores
where
    K: Eq + Hash,
{
    debug_assert_eq!(keys.len(), values.len());

    let mut order: Vec<&K> = Vec::new();
    let mut members: HashMap<&K, Vec<usize>> = HashMap::new();
    for (idx, key) in keys.iter().enumerate() {
        members
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(idx);
    }

    let mut z = vec![0.0; values.len()];
    let mut degenerate_groups = 0;

    for key in order {
        let indices = &members[key];
        let present: Vec<(usize, f64)> = indices
            .iter()
            .filter_map(|&i| values[i].map(|v| (i, v)))
            .collect();
        let population: Vec<f64> = present.iter().map(|(_, v)| *v).collect();
        let stats = PopulationStats::compute(&population, dispersion);

        if stats.is_degenerate() {
            degenerate_groups += 1;
            continue;
        }
        for (i, v) in present {
            z[i] = stats.z_score(v);
        }
    }

    GroupedZScores {
        z,
        degenerate_groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    fn pop_stdev(values: &[f64]) -> f64 {
        let m = mean(values);
        (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
    }

    #[test]
    fn test_standardized_mean_zero_stdev_one() {
        let z = standardize(&[0.2, 0.5, 0.9, 0.4, 0.75], Dispersion::Population);
        assert!(mean(&z).abs() < 1e-9);
        assert!((pop_stdev(&z) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sample_dispersion_unit_sample_stdev() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let z = standardize(&values, Dispersion::Sample);
        let m = mean(&z);
        let sample_sd = (z.iter().map(|v| (v - m).powi(2)).sum::<f64>() / 3.0).sqrt();
        assert!((sample_sd - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_variance_gives_exact_zero() {
        let z = standardize(&[0.7, 0.7, 0.7], Dispersion::Population);
        assert_eq!(z, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_single_member_sample_is_degenerate() {
        let z = standardize(&[0.7], Dispersion::Sample);
        assert_eq!(z, vec![0.0]);
        assert!(z.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_empty_population() {
        let stats = PopulationStats::compute(&[], Dispersion::Population);
        assert!(stats.is_degenerate());
        assert_eq!(stats.z_score(3.0), 0.0);
    }

    #[test]
    fn test_groups_are_independent() {
        let keys = ["a", "b", "a", "b", "a"];
        let values = [Some(1.0), Some(5.0), Some(3.0), Some(5.0), Some(2.0)];
        let grouped = standardize_by_group(&keys, &values, Dispersion::Population);

        // group "b" has no spread
        assert_eq!(grouped.z[1], 0.0);
        assert_eq!(grouped.z[3], 0.0);
        assert_eq!(grouped.degenerate_groups, 1);

        let group_a = [grouped.z[0], grouped.z[2], grouped.z[4]];
        assert!(mean(&group_a).abs() < 1e-9);
        assert!((pop_stdev(&group_a) - 1.0).abs() < 1e-9);
        assert!(grouped.z[2] > grouped.z[4]);
    }

    #[test]
    fn test_missing_values_skipped() {
        let keys = ["a", "a", "a"];
        let values = [Some(1.0), None, Some(3.0)];
        let grouped = standardize_by_group(&keys, &values, Dispersion::Population);

        assert_eq!(grouped.z[1], 0.0);
        assert!((grouped.z[0] + 1.0).abs() < 1e-9);
        assert!((grouped.z[2] - 1.0).abs() < 1e-9);
    }
}
