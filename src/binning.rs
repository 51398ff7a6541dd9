//! Discretisation of numeric attributes prior to aggregation.
//!
//! Numeric traits (`number`, `boost_*`, `date`) rarely repeat exactly, so scoring raw values
//! would make nearly every value maximally rare. Values are grouped into bins first; the
//! strategy is pluggable through [`BinningStrategy`] and defaults to
//! [`NumericBinning::EqualFrequency`] with [`DEFAULT_BIN_COUNT`] bins.

use std::collections::BTreeMap;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::token::{BinRange, TokenAttribute};

/// Bin count used by [`NumericBinning::default`].
pub const DEFAULT_BIN_COUNT: usize = 10;

/// Policy assigning numeric attribute values to bins.
pub trait BinningStrategy: Send + Sync {
    /// Returns the bin of every value, index-aligned with `values`.
    ///
    /// `None` leaves the values ungrouped, so each distinct value scores as its own group
    /// ([`NumericBinning::Distinct`]).
    fn bins(&self, values: &[f64]) -> Option<Vec<BinRange>>;
}

/// Built-in binning policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum NumericBinning {
    /// Every distinct value is its own group.
    Distinct,
    /// `[min, max]` split into `bins` intervals of equal width.
    EqualWidth {
        /// Number of intervals.
        bins: usize,
    },
    /// Sorted values split into `bins` groups of roughly equal size; equal values share a bin.
    EqualFrequency {
        /// Number of groups.
        bins: usize,
    },
}

impl Default for NumericBinning {
    fn default() -> Self {
        Self::EqualFrequency {
            bins: DEFAULT_BIN_COUNT,
        }
    }
}

impl BinningStrategy for NumericBinning {
    fn bins(&self, values: &[f64]) -> Option<Vec<BinRange>> {
        match *self {
            Self::Distinct => None,
            Self::EqualWidth { bins } => Some(equal_width(values, bins.max(1))),
            Self::EqualFrequency { bins } => Some(equal_frequency(values, bins.max(1))),
        }
    }
}

fn equal_width(values: &[f64], bins: usize) -> Vec<BinRange> {
    let Some((min, max)) = values.iter().fold(None, |acc: Option<(f64, f64)>, &value| {
        Some(acc.map_or((value, value), |(lo, hi)| (lo.min(value), hi.max(value))))
    }) else {
        return Vec::new();
    };
    if min == max {
        return vec![BinRange::new(min, max); values.len()];
    }

    let width = (max - min) / bins as f64;
    values
        .iter()
        .map(|&value| {
            let idx = (((value - min) / width).floor() as usize).min(bins - 1);
            let lower = min + width * idx as f64;
            let upper = if idx == bins - 1 {
                max
            } else {
                min + width * (idx + 1) as f64
            };
            BinRange::new(lower, upper)
        })
        .collect()
}

fn equal_frequency(values: &[f64], bins: usize) -> Vec<BinRange> {
    let n = values.len();
    // More bins than values would only leave empty bins.
    let bins = bins.min(n.max(1));
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    // Index of the bin each distinct value lands in, keyed by bit pattern.
    let mut bin_of: FxHashMap<u64, usize> = FxHashMap::default();
    let mut ranges: Vec<Option<BinRange>> = vec![None; bins];
    for (position, &value) in sorted.iter().enumerate() {
        let idx = *bin_of
            .entry(value.to_bits())
            .or_insert_with(|| (position * bins / n).min(bins - 1));
        let range = ranges[idx].get_or_insert(BinRange::new(value, value));
        range.upper = value;
    }

    values
        .iter()
        .map(|value| {
            let idx = bin_of[&value.to_bits()];
            ranges[idx].unwrap_or_else(|| BinRange::new(*value, *value))
        })
        .collect()
}

/// Assigns bins to every non-null numeric row, returning the number of rows binned.
///
/// Attribute names are binned independently in parallel; each partition reads its own rows and
/// the assignments are written back in attribute name order.
pub fn apply_binning<S>(rows: &mut [TokenAttribute], strategy: &S) -> usize
where
    S: BinningStrategy + ?Sized,
{
    let partitions: Vec<Vec<usize>> = {
        let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, row) in rows.iter().enumerate() {
            let numeric = row.display_type.is_some_and(|display| display.is_numeric());
            if numeric && row.value.as_f64().is_some() {
                by_name.entry(row.name.as_str()).or_default().push(idx);
            }
        }
        by_name.into_values().collect()
    };

    let shared: &[TokenAttribute] = rows;
    let assignments: Vec<Option<Vec<BinRange>>> = partitions
        .par_iter()
        .map(|indices| {
            let values: Vec<f64> = indices
                .iter()
                .filter_map(|&idx| shared[idx].value.as_f64())
                .collect();
            strategy.bins(&values)
        })
        .collect();

    let mut binned = 0usize;
    for (indices, bins) in partitions.iter().zip(assignments) {
        let Some(bins) = bins else {
            continue;
        };
        for (&idx, range) in indices.iter().zip(bins) {
            rows[idx].bin = Some(range);
            binned += 1;
        }
    }
    binned
}
